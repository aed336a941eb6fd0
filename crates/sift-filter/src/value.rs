//! Typed domain values.
//!
//! [`Value`] is what literals coerce to and what record fields resolve to.
//! Comparison between values is *loose* but explicit: every cross-type pair
//! that compares is listed in [`Value::loose_eq`] and [`Value::loose_cmp`],
//! everything else is unequal and unordered.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::coerce::{parse_number, parse_timestamp};

/// A typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value present (a missing field, or the `undefined` keyword).
    Absent,
    /// Explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(Number),
    /// Point in time.
    Timestamp(Timestamp),
    /// Text value.
    String(String),
    /// Flat list of values.
    Array(Vec<Value>),
}

impl Value {
    /// Returns `true` if this is the absence marker.
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Returns `true` if this is an explicit null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for null or absent.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Absent)
    }

    /// Returns `true` for absent, null, the empty string and the empty array.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Absent | Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Extracts the string value, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the number value, if present.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts the boolean value, if present.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extracts the timestamp value, if present.
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Extracts the array elements, if present.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the name of this value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Timestamp(_) => "timestamp",
            Value::String(_) => "string",
            Value::Array(_) => "array",
        }
    }

    /// Renders this value as plain text, as used by the text operators.
    ///
    /// Absent and null render as the empty string; arrays join their elements
    /// with commas.
    pub fn to_text(&self) -> String {
        match self {
            Value::Absent | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Timestamp(t) => t.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Loose equality.
    ///
    /// | left | right | rule |
    /// |------|-------|------|
    /// | null/absent | null/absent | equal |
    /// | number | number | numeric |
    /// | number | string | string parsed as a numeric literal |
    /// | bool | bool | exact |
    /// | bool | number | `true` is 1, `false` is 0 |
    /// | bool | string | `"true"`/`"false"`, case-insensitive |
    /// | timestamp | timestamp | same instant |
    /// | timestamp | string | string parsed as an ISO-8601 timestamp |
    /// | timestamp | number | epoch milliseconds |
    /// | string | string | exact |
    /// | array | array | same length, element-wise loose equality |
    ///
    /// Every other pair is unequal.
    pub fn loose_eq(&self, other: &Value) -> bool {
        use Value::*;

        match (self, other) {
            (Absent | Null, Absent | Null) => true,
            (Absent | Null, _) | (_, Absent | Null) => false,
            (Number(a), Number(b)) => a.compare(*b) == Some(Ordering::Equal),
            (Number(n), String(s)) | (String(s), Number(n)) => {
                parse_number(s.trim()).is_some_and(|m| n.compare(m) == Some(Ordering::Equal))
            }
            (Bool(a), Bool(b)) => a == b,
            (Bool(b), Number(n)) | (Number(n), Bool(b)) => {
                n.compare(self::Number::I64(i64::from(*b))) == Some(Ordering::Equal)
            }
            (Bool(b), String(s)) | (String(s), Bool(b)) => {
                s.trim().eq_ignore_ascii_case(if *b { "true" } else { "false" })
            }
            (Timestamp(a), Timestamp(b)) => a == b,
            (Timestamp(t), String(s)) | (String(s), Timestamp(t)) => {
                parse_timestamp(s.trim()).is_some_and(|u| u == *t)
            }
            (Timestamp(t), Number(n)) | (Number(n), Timestamp(t)) => {
                n.compare(self::Number::I64(t.as_millis())) == Some(Ordering::Equal)
            }
            (String(a), String(b)) => a == b,
            (Array(a), Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => false,
        }
    }

    /// Loose ordering of `self` relative to `other`.
    ///
    /// Uses the same cross-type pairs as [`Value::loose_eq`], minus arrays and
    /// the bool/number and bool/string pairs. Returns `None` when the pair is
    /// not ordered (including any null or absent side, and NaN).
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        use Value::*;

        match (self, other) {
            (Number(a), Number(b)) => a.compare(*b),
            (Number(n), String(s)) => parse_number(s.trim()).and_then(|m| n.compare(m)),
            (String(s), Number(n)) => parse_number(s.trim()).and_then(|m| m.compare(*n)),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Timestamp(t), String(s)) => parse_timestamp(s.trim()).map(|u| t.cmp(&u)),
            (String(s), Timestamp(t)) => parse_timestamp(s.trim()).map(|u| u.cmp(t)),
            (Timestamp(t), Number(n)) => self::Number::I64(t.as_millis()).compare(*n),
            (Number(n), Timestamp(t)) => n.compare(self::Number::I64(t.as_millis())),
            (String(a), String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Converts a JSON value into a domain value.
    ///
    /// JSON objects have no domain counterpart and become their compact JSON
    /// text.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(Number::from_json(n)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(_) => Value::String(json.to_string()),
        }
    }

    /// Converts this value into JSON.
    ///
    /// Absent becomes `null`, timestamps become RFC 3339 strings and
    /// non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Absent | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => n.to_json(),
            Value::Timestamp(t) => serde_json::Value::String(t.to_string()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

/// Canonical literal form, as written in filter text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Timestamp(t) => write!(f, "{t}"),
            Value::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
            Value::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Numeric value.
///
/// Numbers are stored in one of three variants to preserve precision:
/// - `I64` for signed integers
/// - `U64` for unsigned integers beyond `i64::MAX`
/// - `F64` for floating point
///
/// Comparisons between different numeric types are handled by converting
/// to the appropriate common type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 64-bit floating point.
    F64(f64),
}

impl Number {
    /// Converts the number to f64 for comparison.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::U64(n) => n as f64,
            Number::F64(n) => n,
        }
    }

    /// Compares two numbers, handling mixed types.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::I64(a), Number::I64(b)) => Some(a.cmp(&b)),
            (Number::U64(a), Number::U64(b)) => Some(a.cmp(&b)),
            (Number::F64(a), Number::F64(b)) => a.partial_cmp(&b),

            // Integers of different signedness compare exactly.
            (Number::I64(a), Number::U64(b)) => Some(i128::from(a).cmp(&i128::from(b))),
            (Number::U64(a), Number::I64(b)) => Some(i128::from(a).cmp(&i128::from(b))),

            (Number::I64(a), Number::F64(b)) => int_float_cmp(i128::from(a), b),
            (Number::U64(a), Number::F64(b)) => int_float_cmp(i128::from(a), b),
            (Number::F64(a), Number::I64(b)) => {
                int_float_cmp(i128::from(b), a).map(Ordering::reverse)
            }
            (Number::F64(a), Number::U64(b)) => {
                int_float_cmp(i128::from(b), a).map(Ordering::reverse)
            }
        }
    }

    /// Total ordering used for sorting: NaN sorts after every other number.
    pub fn total_cmp(self, other: Number) -> Ordering {
        match self.compare(other) {
            Some(ordering) => ordering,
            None => self.to_f64().total_cmp(&other.to_f64()),
        }
    }

    fn from_json(n: &serde_json::Number) -> Number {
        if let Some(i) = n.as_i64() {
            Number::I64(i)
        } else if let Some(u) = n.as_u64() {
            Number::U64(u)
        } else {
            Number::F64(n.as_f64().unwrap_or(f64::NAN))
        }
    }

    fn to_json(self) -> serde_json::Value {
        match self {
            Number::I64(n) => serde_json::Value::from(n),
            Number::U64(n) => serde_json::Value::from(n),
            Number::F64(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Exact comparison of an integer with a float.
fn int_float_cmp(i: i128, f: f64) -> Option<Ordering> {
    match (i as f64).partial_cmp(&f)? {
        // The float is integral here, so the cast back is exact.
        Ordering::Equal => Some(i.cmp(&(f as i128))),
        ordering => Some(ordering),
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(*other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(n) => write!(f, "{n}"),
            Number::U64(n) => write!(f, "{n}"),
            // Integral floats keep a fractional digit so they read back as floats.
            Number::F64(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{n:.1}"),
            Number::F64(n) => write!(f, "{n}"),
        }
    }
}

impl From<i32> for Number {
    fn from(n: i32) -> Self {
        Number::I64(i64::from(n))
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::I64(n)
    }
}

impl From<u32> for Number {
    fn from(n: u32) -> Self {
        Number::I64(i64::from(n))
    }
}

impl From<u64> for Number {
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or(Number::U64(n), Number::I64)
    }
}

impl From<usize> for Number {
    fn from(n: usize) -> Self {
        Number::from(n as u64)
    }
}

impl From<f32> for Number {
    fn from(n: f32) -> Self {
        Number::F64(f64::from(n))
    }
}

impl From<f64> for Number {
    fn from(n: f64) -> Self {
        Number::F64(n)
    }
}

/// A point in time, keeping the zone offset it was written with.
///
/// Equality and ordering compare instants, so `2024-01-01T01:00:00+01:00`
/// equals `2024-01-01T00:00:00Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<FixedOffset>);

impl Timestamp {
    /// Wraps a chrono datetime.
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Timestamp(at)
    }

    /// Creates a UTC timestamp from milliseconds since the Unix epoch.
    ///
    /// Returns `None` when out of chrono's representable range.
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(|at| Timestamp(at.fixed_offset()))
    }

    /// Returns milliseconds since the Unix epoch.
    pub fn as_millis(self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Returns the underlying chrono datetime.
    pub fn datetime(self) -> DateTime<FixedOffset> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(at: DateTime<FixedOffset>) -> Self {
        Timestamp(at)
    }
}

// Conversions from common types to Value

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Value::Timestamp(t)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(text: &str) -> Timestamp {
        Timestamp(DateTime::parse_from_rfc3339(text).unwrap())
    }

    #[test]
    fn value_extractors() {
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::from(42).as_number(), Some(Number::I64(42)));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::from(vec![1, 2]).as_array().map(<[_]>::len), Some(2));

        // Wrong type returns None
        assert_eq!(Value::from("test").as_number(), None);
        assert_eq!(Value::Null.as_str(), None);
    }

    #[test]
    fn blank_values() {
        assert!(Value::Absent.is_blank());
        assert!(Value::Null.is_blank());
        assert!(Value::from("").is_blank());
        assert!(Value::Array(vec![]).is_blank());
        assert!(!Value::from(" ").is_blank());
        assert!(!Value::from(0).is_blank());
        assert!(!Value::Bool(false).is_blank());
    }

    #[test]
    fn number_comparisons_mixed_types() {
        assert_eq!(
            Number::I64(5).compare(Number::U64(10)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Number::I64(5).compare(Number::F64(5.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Number::I64(-1).compare(Number::U64(u64::MAX)),
            Some(Ordering::Less)
        );
        assert_eq!(Number::F64(f64::NAN).compare(Number::F64(1.0)), None);
        assert_eq!(Number::I64(1).compare(Number::F64(f64::NAN)), None);

        // Exact beyond f64 integer precision
        let big = 9_007_199_254_740_993i64;
        assert_eq!(
            Number::I64(big).compare(Number::F64(9_007_199_254_740_992.0)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Number::F64(9_007_199_254_740_992.0).compare(Number::I64(big)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Number::F64(2.5).compare(Number::U64(u64::MAX)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Number::F64(f64::NAN).total_cmp(Number::F64(1.0)),
            Ordering::Greater
        );
    }

    #[test]
    fn u64_narrows_when_it_fits() {
        assert_eq!(Number::from(7u64), Number::I64(7));
        assert_eq!(Number::from(u64::MAX), Number::U64(u64::MAX));
    }

    #[test]
    fn loose_eq_null_and_absent() {
        assert!(Value::Null.loose_eq(&Value::Absent));
        assert!(Value::Absent.loose_eq(&Value::Absent));
        assert!(!Value::Null.loose_eq(&Value::from("")));
        assert!(!Value::from(0).loose_eq(&Value::Absent));
    }

    #[test]
    fn loose_eq_numeric_text() {
        assert!(Value::from(42).loose_eq(&Value::from("42")));
        assert!(Value::from("2.5").loose_eq(&Value::from(2.5)));
        assert!(!Value::from(42).loose_eq(&Value::from("42abc")));
        assert!(!Value::from(0).loose_eq(&Value::from("")));
    }

    #[test]
    fn loose_eq_bools() {
        assert!(Value::Bool(true).loose_eq(&Value::from(1)));
        assert!(Value::Bool(false).loose_eq(&Value::from(0)));
        assert!(Value::Bool(true).loose_eq(&Value::from("TRUE")));
        assert!(!Value::Bool(true).loose_eq(&Value::from("yes")));
    }

    #[test]
    fn loose_eq_timestamps() {
        let utc = ts("2024-01-01T00:00:00Z");
        let shifted = ts("2024-01-01T01:00:00+01:00");
        assert!(Value::from(utc).loose_eq(&Value::from(shifted)));
        assert!(Value::from(utc).loose_eq(&Value::from("2024-01-01T00:00:00Z")));
        assert!(Value::from(utc).loose_eq(&Value::from(utc.as_millis())));
        assert!(!Value::from(utc).loose_eq(&Value::from("2024-01-01")));
    }

    #[test]
    fn loose_eq_arrays() {
        let a = Value::from(vec![Value::from(1), Value::from("x")]);
        let b = Value::from(vec![Value::from("1"), Value::from("x")]);
        assert!(a.loose_eq(&b));
        assert!(!a.loose_eq(&Value::from(vec![1])));
    }

    #[test]
    fn loose_cmp_pairs() {
        assert_eq!(
            Value::from(10).loose_cmp(&Value::from("9")),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::from("10").loose_cmp(&Value::from("9")),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::from("2024-02-01T00:00:00Z").loose_cmp(&Value::from(ts("2024-01-01T00:00:00Z"))),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Null.loose_cmp(&Value::from(1)), None);
        assert_eq!(Value::from(1).loose_cmp(&Value::Absent), None);
        assert_eq!(Value::from(true).loose_cmp(&Value::from(1)), None);
    }

    #[test]
    fn text_rendering() {
        assert_eq!(Value::Absent.to_text(), "");
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::from(2.5).to_text(), "2.5");
        assert_eq!(Value::Bool(false).to_text(), "false");
        assert_eq!(Value::from(vec!["a", "b"]).to_text(), "a,b");
        assert_eq!(
            Value::from(ts("2024-01-01T00:00:00Z")).to_text(),
            "2024-01-01T00:00:00Z"
        );
    }

    #[test]
    fn canonical_literals() {
        assert_eq!(Value::from("say \"hi\"").to_string(), r#""say \"hi\"""#);
        assert_eq!(Value::from(r"back\slash").to_string(), r#""back\\slash""#);
        assert_eq!(
            Value::Array(vec![Value::from(1), Value::Absent, Value::from("c")]).to_string(),
            r#"{1,undefined,"c"}"#
        );
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(3.0).to_string(), "3.0");
        assert_eq!(Value::from(-0.0).to_string(), "-0.0");
        assert_eq!(Value::from(0.125).to_string(), "0.125");
        assert_eq!(Value::from(1e20).to_string(), "100000000000000000000.0");
        assert_eq!(
            Value::from(ts("2024-01-01T10:30:00.250+02:00")).to_string(),
            "2024-01-01T10:30:00.250+02:00"
        );
    }

    #[test]
    fn json_conversions() {
        let json = serde_json::json!({"a": 1});
        assert_eq!(Value::from_json(&json), Value::from(r#"{"a":1}"#));
        assert_eq!(
            Value::from_json(&serde_json::json!([1, null, "x", 2.5])),
            Value::Array(vec![
                Value::from(1),
                Value::Null,
                Value::from("x"),
                Value::from(2.5)
            ])
        );
        assert_eq!(Value::Absent.to_json(), serde_json::Value::Null);
        assert_eq!(
            Value::from(ts("2024-01-01T00:00:00Z")).to_json(),
            serde_json::json!("2024-01-01T00:00:00Z")
        );
        assert_eq!(Value::from(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn timestamp_millis() {
        let t = Timestamp::from_millis(1_706_500_000_000).unwrap();
        assert_eq!(t.as_millis(), 1_706_500_000_000);
        assert!(Timestamp::from_millis(1000) < Timestamp::from_millis(2000));
    }
}
