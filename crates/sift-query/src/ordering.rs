//! Ordering types for query result sorting.
//!
//! Provides [`Dir`] for sort direction and [`Sort`] for field-based ordering.
//! Unlike filter comparison, sort comparison is a total order so that any mix
//! of record values sorts deterministically.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sift_filter::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Returns `true` if this is ascending order.
    pub fn is_asc(self) -> bool {
        matches!(self, Dir::Asc)
    }

    /// Returns `true` if this is descending order.
    pub fn is_desc(self) -> bool {
        matches!(self, Dir::Desc)
    }

    /// Applies this direction to an ordering.
    ///
    /// For `Asc`, returns the ordering unchanged.
    /// For `Desc`, reverses the ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }

    /// Returns the display name of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Dir::Asc => "asc",
            Dir::Desc => "desc",
        }
    }
}

impl std::fmt::Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Dir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Dir::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Dir::Desc)
        } else {
            Err(format!("unknown sort direction '{s}', expected 'asc' or 'desc'"))
        }
    }
}

impl Serialize for Dir {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Dir {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A single sort key: a field and its direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// The field to sort by.
    pub field: String,
    /// The sort direction.
    #[serde(default)]
    pub dir: Dir,
}

impl Sort {
    /// Creates a new ascending sort on the given field.
    pub fn asc(field: impl Into<String>) -> Self {
        Sort {
            field: field.into(),
            dir: Dir::Asc,
        }
    }

    /// Creates a new descending sort on the given field.
    pub fn desc(field: impl Into<String>) -> Self {
        Sort {
            field: field.into(),
            dir: Dir::Desc,
        }
    }

    /// Creates a new sort with the given direction.
    pub fn new(field: impl Into<String>, dir: Dir) -> Self {
        Sort {
            field: field.into(),
            dir,
        }
    }

    /// Compares two values according to this sort key.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        self.dir.apply(compare_values(a, b))
    }
}

/// Position of a value's type in mixed-type sorting.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::Timestamp(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Null | Value::Absent => 5,
    }
}

/// Compares two values for sorting.
///
/// This is a total order:
/// - null and absent values are equal to each other and sort last
/// - values of the same type compare natively (NaN after other numbers)
/// - numbers compare numerically across integer and float representations
/// - arrays compare element by element, then by length
/// - otherwise values sort by type: booleans, numbers, timestamps, strings, arrays
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a.total_cmp(*b),
        (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b)
            .map(|(x, y)| compare_values(x, y))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Compares two key lists using a list of sort clauses.
///
/// `a` and `b` hold one key per sort, in the same order as `sorts`. The first
/// sort is the primary key, the second breaks its ties, and so on. If every
/// key compares equal, returns `Equal`.
pub fn compare_by_sorts(a: &[Value], b: &[Value], sorts: &[Sort]) -> Ordering {
    sorts
        .iter()
        .zip(a.iter().zip(b))
        .map(|(sort, (x, y))| sort.compare(x, y))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_filter::{Number, Timestamp};

    #[test]
    fn dir_apply() {
        assert_eq!(Dir::Asc.apply(Ordering::Less), Ordering::Less);
        assert_eq!(Dir::Asc.apply(Ordering::Greater), Ordering::Greater);
        assert_eq!(Dir::Asc.apply(Ordering::Equal), Ordering::Equal);

        assert_eq!(Dir::Desc.apply(Ordering::Less), Ordering::Greater);
        assert_eq!(Dir::Desc.apply(Ordering::Greater), Ordering::Less);
        assert_eq!(Dir::Desc.apply(Ordering::Equal), Ordering::Equal);
    }

    #[test]
    fn dir_display_and_parse() {
        assert_eq!(Dir::Asc.to_string(), "asc");
        assert_eq!(Dir::Desc.to_string(), "desc");
        assert_eq!("DESC".parse::<Dir>(), Ok(Dir::Desc));
        assert_eq!("Asc".parse::<Dir>(), Ok(Dir::Asc));
        assert!("up".parse::<Dir>().is_err());
    }

    #[test]
    fn sort_serde() {
        let sort: Sort = serde_json::from_str(r#"{"field": "Age", "dir": "DESC"}"#).unwrap();
        assert_eq!(sort, Sort::desc("Age"));

        let sort: Sort = serde_json::from_str(r#"{"field": "Age"}"#).unwrap();
        assert_eq!(sort, Sort::asc("Age"));

        assert_eq!(
            serde_json::to_string(&Sort::desc("Age")).unwrap(),
            r#"{"field":"Age","dir":"desc"}"#
        );
        assert!(serde_json::from_str::<Sort>(r#"{"field": "Age", "dir": "sideways"}"#).is_err());
    }

    #[test]
    fn compare_strings() {
        let a = Value::from("apple");
        let b = Value::from("banana");

        assert_eq!(compare_values(&a, &b), Ordering::Less);
        assert_eq!(compare_values(&b, &a), Ordering::Greater);
        assert_eq!(compare_values(&a, &a.clone()), Ordering::Equal);
    }

    #[test]
    fn compare_numbers_across_types() {
        let i = Value::Number(Number::I64(-1));
        let u = Value::Number(Number::U64(u64::MAX));
        let f = Value::Number(Number::F64(2.5));

        assert_eq!(compare_values(&i, &f), Ordering::Less);
        assert_eq!(compare_values(&f, &u), Ordering::Less);
        assert_eq!(compare_values(&i, &u), Ordering::Less);
        assert_eq!(
            compare_values(&Value::from(2), &Value::from(2.0)),
            Ordering::Equal
        );
    }

    #[test]
    fn nan_sorts_after_numbers() {
        let nan = Value::Number(Number::F64(f64::NAN));
        let num = Value::from(1.0);

        assert_eq!(compare_values(&nan, &num), Ordering::Greater);
        assert_eq!(compare_values(&num, &nan), Ordering::Less);
        assert_eq!(compare_values(&nan, &nan), Ordering::Equal);
    }

    #[test]
    fn compare_timestamps() {
        let a = Value::from(Timestamp::from_millis(1000).unwrap());
        let b = Value::from(Timestamp::from_millis(2000).unwrap());

        assert_eq!(compare_values(&a, &b), Ordering::Less);
    }

    #[test]
    fn compare_bools() {
        // false < true in Rust's bool ordering
        assert_eq!(
            compare_values(&Value::Bool(false), &Value::Bool(true)),
            Ordering::Less
        );
    }

    #[test]
    fn nullish_values_sort_last() {
        let some = Value::from("test");

        assert_eq!(compare_values(&Value::Absent, &some), Ordering::Greater);
        assert_eq!(compare_values(&some, &Value::Null), Ordering::Less);
        assert_eq!(compare_values(&Value::Null, &Value::Absent), Ordering::Equal);

        // Descending puts them first
        assert_eq!(Sort::desc("f").compare(&Value::Null, &some), Ordering::Less);
    }

    #[test]
    fn mixed_types_sort_by_rank() {
        let values = [
            Value::from(vec![1]),
            Value::from("a"),
            Value::from(Timestamp::from_millis(0).unwrap()),
            Value::from(7),
            Value::Bool(true),
        ];
        let mut sorted = values.to_vec();
        sorted.sort_by(compare_values);
        let names: Vec<_> = sorted.iter().map(Value::type_name).collect();
        assert_eq!(names, ["bool", "number", "timestamp", "string", "array"]);
    }

    #[test]
    fn compare_arrays() {
        let short = Value::from(vec![1, 2]);
        let long = Value::from(vec![1, 2, 0]);
        let bigger = Value::from(vec![1, 3]);

        assert_eq!(compare_values(&short, &long), Ordering::Less);
        assert_eq!(compare_values(&long, &bigger), Ordering::Less);
    }

    #[test]
    fn compare_by_multiple_sorts() {
        let sorts = [Sort::asc("group"), Sort::desc("score")];
        let a = [Value::from("x"), Value::from(1)];
        let b = [Value::from("x"), Value::from(5)];
        let c = [Value::from("y"), Value::from(9)];

        assert_eq!(compare_by_sorts(&a, &b, &sorts), Ordering::Greater);
        assert_eq!(compare_by_sorts(&b, &c, &sorts), Ordering::Less);
        assert_eq!(compare_by_sorts(&a, &a, &sorts), Ordering::Equal);
        assert_eq!(compare_by_sorts(&a, &b, &[]), Ordering::Equal);
    }
}
