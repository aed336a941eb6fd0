//! Sift filter - a textual filter language for record collections.
//!
//! Filters are boolean condition trees written as text:
//!
//! ```text
//! [Age] GTE 18 AND ([Name] CONTAINS "Jo" OR [Name] CONTAINS 'Ann')
//! ```
//!
//! The crate tokenizes and parses that text into a [`Filter`], builds the same
//! trees through a fluent API, serializes them back to canonical text or to a
//! structured JSON tree, and evaluates them against records.
//!
//! # Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use sift_filter::{Filter, Op};
//!
//! let records = vec![
//!     json!({"Name": "John", "Age": 31}),
//!     json!({"Name": "Annie", "Age": 17}),
//!     json!({"Name": "Bob", "Age": 40}),
//! ];
//!
//! let parsed: Filter = r#"[Age] GTE 18 AND ([Name] CONTAINS "Jo" OR [Name] CONTAINS 'Ann')"#
//!     .parse()
//!     .unwrap();
//!
//! let built = Filter::new()
//!     .and("Age", Op::Gte, 18)?
//!     .and_group(|g| g.or("Name", Op::Contains, "Jo")?.or("Name", Op::Contains, "Ann"))?;
//!
//! assert_eq!(parsed, built);
//!
//! let names: Vec<_> = records
//!     .iter()
//!     .filter(|r| parsed.matches(*r))
//!     .map(|r| r["Name"].as_str().unwrap())
//!     .collect();
//! assert_eq!(names, ["John"]);
//! # Ok::<(), sift_filter::FilterError>(())
//! ```
//!
//! # Grammar
//!
//! | Element | Form |
//! |---------|------|
//! | Field | `[name]` |
//! | Operator | `EQ NEQ LT LTE GT GTE STARTSWITH ENDSWITH CONTAINS DOESNOTCONTAIN IN NIN` take a value; `ISNULL ISNOTNULL ISEMPTY ISNOTEMPTY` do not |
//! | Literal | bare word, `"double"`, `'single'`, or array `{a,"b",3}` |
//! | Joiner | `AND`, `OR` |
//! | Group | `( ... )` |
//!
//! Keywords and operators are case-insensitive. At one nesting level the first
//! joiner decides the logic; mixing AND and OR requires parentheses.
//!
//! # Literal Types
//!
//! Literals are typed by [`coerce`]: numbers, `true`/`false`, `null`,
//! `undefined` (absent), ISO-8601 timestamps, and text. Quoting forces text, so
//! `"42"` is a string while `42` is a number.
//!
//! # Comparison
//!
//! Evaluation compares loosely but by an explicit rule table (see
//! [`Value::loose_eq`]): `42` equals `"42"`, `true` equals `1`, null equals a
//! missing field. Ordering operators are false for incomparable pairs.

mod coerce;
mod error;
mod eval;
mod filter;
mod op;
mod parser;
mod record;
pub mod token;
mod tree;
mod value;

// Re-export public API
pub use coerce::{coerce, parse_number, parse_timestamp};
pub use error::{FilterError, Quote, Result, SyntaxError, ValidationError};
pub use eval::{EvalOptions, Evaluator};
pub use filter::{Condition, Filter, Group, Item, Node, NodeId, MAX_DEPTH};
pub use op::{Logic, Op};
pub use parser::{parse, parse_tokens};
pub use record::Resolve;
pub use value::{Number, Timestamp, Value};
