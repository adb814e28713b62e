//! Shared API request/response types
//!
//! Types exchanged on the HTTP enqueue surface, used by the server
//! handlers and by clients building requests.

use serde::{Deserialize, Serialize};

use crate::model::Movie;

/// Acknowledgement returned by every enqueue endpoint
///
/// The only synchronous contract is "accepted": results arrive later
/// on the stream, correlated by `query_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueAck {
    #[serde(rename = "queryId")]
    pub query_id: String,

    pub status: String,

    pub message: String,
}

impl EnqueueAck {
    /// Standard "accepted" acknowledgement for a queued job
    pub fn queued(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            status: "queued".to_string(),
            message: "Query started. Listen via SSE.".to_string(),
        }
    }
}

/// Body of POST /favorite-movie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFavoriteRequest {
    pub movie: Movie,
}
