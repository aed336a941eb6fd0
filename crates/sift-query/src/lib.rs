//! Sift query - run filter queries over record collections.
//!
//! A [`Query`] pairs a [`Filter`](sift_filter::Filter) with result options:
//! distinct, multi-key sorting, paging, count-only and field projection.
//! Records are JSON objects ([`Record`]); an [`Engine`] serves named
//! collections of them.
//!
//! # Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use sift_query::{Query, Record};
//!
//! let records: Vec<Record> = (1..=100)
//!     .map(|id| json!({"ID": id, "even": id % 2 == 0}))
//!     .filter_map(|r| r.as_object().cloned())
//!     .collect();
//!
//! let result = Query::new()
//!     .where_text("[ID] GTE 3 AND [ID] LT 50")?
//!     .order_desc("even")
//!     .order_asc("ID")
//!     .skip(2)
//!     .take(5)
//!     .select(["ID"])
//!     .build()
//!     .execute(&records);
//!
//! assert_eq!(result.total, 47);
//! assert_eq!(result.returned, 5);
//! assert_eq!(result.items[0]["ID"], json!(8));
//! # Ok::<(), sift_query::QueryError>(())
//! ```
//!
//! # Pipeline
//!
//! ```text
//! filter → distinct → sort → total → skip/take → count | projection
//! ```
//!
//! `total` counts matches before paging, `returned` after. A count-only query
//! skips sorting and returns no items. Non-positive `skip` and `take` are
//! ignored.
//!
//! # Sorting
//!
//! Sort keys apply in order, each with its own [`Dir`]; ties fall through to
//! the next key and full ties keep their original order. Missing and null
//! values sort last in ascending order. Values of different types sort by
//! type: booleans, numbers, timestamps, strings, then arrays.

mod engine;
mod error;
mod ordering;
mod query;

// Re-export public API
pub use engine::{Engine, MemoryEngine, QueryRequest};
pub use error::{QueryError, Result};
pub use ordering::{compare_by_sorts, compare_values, Dir, Sort};
pub use query::{Query, QueryResult, Record};

// Re-export the filter language for convenience
pub use sift_filter::{EvalOptions, Filter, FilterError, Logic, Op, Value};
