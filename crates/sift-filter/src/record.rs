//! Field access on records.
//!
//! The evaluator reads fields through the [`Resolve`] trait, so any record
//! shape can be filtered. Implementations are provided for JSON objects and
//! for plain maps of [`Value`]s.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::value::Value;

/// Trait for records whose fields can be filtered on.
///
/// # Manual Implementation
///
/// ```
/// use sift_filter::{Filter, Resolve, Value};
///
/// struct Task {
///     name: String,
///     priority: u8,
/// }
///
/// impl Resolve for Task {
///     fn resolve(&self, field: &str) -> Value {
///         match field {
///             "name" => Value::from(self.name.as_str()),
///             "priority" => Value::from(u32::from(self.priority)),
///             _ => Value::Absent,
///         }
///     }
/// }
///
/// let filter: Filter = "[priority] GTE 3".parse().unwrap();
/// assert!(filter.matches(&Task { name: "Fix bug".into(), priority: 5 }));
/// ```
pub trait Resolve {
    /// Returns the value of a top-level field, or [`Value::Absent`] if the
    /// record has no such field.
    fn resolve(&self, field: &str) -> Value;

    /// Returns the value at a dotted path (`address.city`, `tags.0`).
    ///
    /// Defaults to a literal lookup of the whole path.
    fn resolve_path(&self, path: &str) -> Value {
        self.resolve(path)
    }
}

impl Resolve for serde_json::Map<String, serde_json::Value> {
    fn resolve(&self, field: &str) -> Value {
        self.get(field).map_or(Value::Absent, Value::from_json)
    }

    fn resolve_path(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = match self.get(first) {
            Some(json) => json,
            None => return Value::Absent,
        };
        for segment in segments {
            current = match step(current, segment) {
                Some(next) => next,
                None => return Value::Absent,
            };
        }
        Value::from_json(current)
    }
}

impl Resolve for serde_json::Value {
    fn resolve(&self, field: &str) -> Value {
        match self {
            serde_json::Value::Object(map) => map.resolve(field),
            _ => Value::Absent,
        }
    }

    fn resolve_path(&self, path: &str) -> Value {
        match self {
            serde_json::Value::Object(map) => map.resolve_path(path),
            _ => Value::Absent,
        }
    }
}

impl Resolve for BTreeMap<String, Value> {
    fn resolve(&self, field: &str) -> Value {
        self.get(field).cloned().unwrap_or(Value::Absent)
    }
}

impl<S: BuildHasher> Resolve for HashMap<String, Value, S> {
    fn resolve(&self, field: &str) -> Value {
        self.get(field).cloned().unwrap_or(Value::Absent)
    }
}

/// One step of a dotted path: object key or array index.
fn step<'a>(json: &'a serde_json::Value, segment: &str) -> Option<&'a serde_json::Value> {
    match json {
        serde_json::Value::Object(map) => map.get(segment),
        serde_json::Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}
