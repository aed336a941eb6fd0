//! Error types for the query crate.

use sift_filter::FilterError;
use thiserror::Error;

/// Errors that can occur when building queries or looking up collections.
///
/// Executing a [`Query`](crate::Query) never fails; these come from decoding
/// options, parsing filter text, and engine lookups.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The requested collection is not registered with the engine.
    #[error("unknown collection '{name}'")]
    UnknownCollection { name: String },

    /// A collection entry is not a JSON object.
    #[error("record {index} of collection '{collection}' is not an object")]
    InvalidRecord { collection: String, index: usize },

    /// The filter text or tree is invalid.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The request or collection payload is not valid JSON for its shape.
    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
