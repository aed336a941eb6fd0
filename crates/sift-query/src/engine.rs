//! Named collections and request dispatch.
//!
//! An [`Engine`] owns record collections and runs queries against them by
//! name. [`MemoryEngine`] keeps everything in memory:
//!
//! ```
//! use serde_json::json;
//! use sift_query::{Engine, MemoryEngine, QueryRequest};
//!
//! let engine = MemoryEngine::from_json(&json!({
//!     "people": [
//!         {"Name": "John", "Age": 31},
//!         {"Name": "Annie", "Age": 17}
//!     ]
//! }))?;
//!
//! let request: QueryRequest = serde_json::from_value(json!({
//!     "collection": "people",
//!     "where": "[Age] GTE 18",
//!     "properties": ["Name"]
//! }))?;
//!
//! let result = engine.handle(&request)?;
//! assert_eq!(result.total, 1);
//! assert_eq!(result.items[0]["Name"], json!("John"));
//! # Ok::<(), sift_query::QueryError>(())
//! ```

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::query::{Query, QueryResult, Record};

/// A source of named record collections that can execute queries.
pub trait Engine: Send + Sync {
    /// Returns the names of the available collections.
    fn collections(&self) -> Vec<String>;

    /// Runs `query` against the named collection.
    fn execute(&self, collection: &str, query: &Query) -> Result<QueryResult>;

    /// Runs a decoded request.
    fn handle(&self, request: &QueryRequest) -> Result<QueryResult> {
        self.execute(&request.collection, &request.query)
    }
}

/// A query addressed to a collection.
///
/// Decodes from a flat JSON object: `collection` alongside the query options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Name of the collection to query.
    pub collection: String,
    /// The query options.
    #[serde(flatten)]
    pub query: Query,
}

impl QueryRequest {
    /// Creates a request for `query` against `collection`.
    pub fn new(collection: impl Into<String>, query: Query) -> Self {
        QueryRequest {
            collection: collection.into(),
            query,
        }
    }

    /// Decodes a request from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// An engine over in-memory collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    collections: BTreeMap<String, Vec<Record>>,
}

impl MemoryEngine {
    /// Creates an engine with no collections.
    pub fn new() -> Self {
        MemoryEngine::default()
    }

    /// Adds a collection, replacing any existing one with the same name.
    pub fn with_collection(mut self, name: impl Into<String>, records: Vec<Record>) -> Self {
        self.insert_collection(name, records);
        self
    }

    /// Adds a collection in place, returning the one it replaced.
    pub fn insert_collection(
        &mut self,
        name: impl Into<String>,
        records: Vec<Record>,
    ) -> Option<Vec<Record>> {
        self.collections.insert(name.into(), records)
    }

    /// Loads collections from a JSON object of arrays of objects.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let object = json.as_object().ok_or_else(|| {
            QueryError::Json(serde_json::Error::custom(
                "collections must be a JSON object of arrays",
            ))
        })?;

        let mut engine = MemoryEngine::new();
        for (name, entries) in object {
            let entries = entries.as_array().ok_or_else(|| {
                QueryError::Json(serde_json::Error::custom(format!(
                    "collection '{name}' must be an array"
                )))
            })?;
            let records = entries
                .iter()
                .enumerate()
                .map(|(index, entry)| {
                    entry
                        .as_object()
                        .cloned()
                        .ok_or_else(|| QueryError::InvalidRecord {
                            collection: name.clone(),
                            index,
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            engine.insert_collection(name.clone(), records);
        }
        Ok(engine)
    }

    /// Returns the records of a collection.
    pub fn collection(&self, name: &str) -> Option<&[Record]> {
        self.collections.get(name).map(Vec::as_slice)
    }
}

impl Engine for MemoryEngine {
    fn collections(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    fn execute(&self, collection: &str, query: &Query) -> Result<QueryResult> {
        let records = self
            .collection(collection)
            .ok_or_else(|| QueryError::UnknownCollection {
                name: collection.to_string(),
            })?;
        debug!(collection, records = records.len(), "querying collection");
        Ok(query.execute(records))
    }
}
