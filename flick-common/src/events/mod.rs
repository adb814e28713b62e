//! Event types for the Flickstream event system
//!
//! Provides the shared event taxonomy, the wire format pushed over the
//! SSE stream, and the EventBus used to fan events out to every stream
//! subscriber.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::Movie;

/// Terminal pipeline events
///
/// One success and one failure variant per job kind. Every variant
/// carries the correlation id (`query_id`) minted by the caller that
/// enqueued the job; the stream endpoint broadcasts all of them
/// unfiltered and clients match on the id.
///
/// Success variants carry the operation result and the worker-measured
/// elapsed time. Failure variants carry a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Plain keyword search finished
    MovieSearchComplete {
        query_id: String,
        movies: Vec<Movie>,
        duration_ms: u64,
    },

    /// Plain keyword search failed (provider error, bad input)
    MovieSearchFailed { query_id: String, message: String },

    /// Semantic search finished (ranked candidates, or the plain-search
    /// fallback when the suggestion step produced nothing)
    SemanticSearchComplete {
        query_id: String,
        movies: Vec<Movie>,
        duration_ms: u64,
    },

    /// Semantic search failed (no candidate resolved, provider error)
    SemanticSearchFailed { query_id: String, message: String },

    /// Recommendations finished
    RecommendationsComplete {
        query_id: String,
        movies: Vec<Movie>,
        duration_ms: u64,
    },

    /// Recommendations failed
    RecommendationsFailed { query_id: String, message: String },

    /// Favorite stored (payload is the full favorites list)
    AddFavoriteComplete {
        query_id: String,
        favorites: Vec<Movie>,
        duration_ms: u64,
    },

    /// Favorite could not be stored (validation failure)
    AddFavoriteFailed { query_id: String, message: String },

    /// Favorite removed (payload is the remaining favorites list)
    RemoveFavoriteComplete {
        query_id: String,
        favorites: Vec<Movie>,
        duration_ms: u64,
    },

    /// Favorite could not be removed
    RemoveFavoriteFailed { query_id: String, message: String },

    /// Favorites listed
    ListFavoritesComplete {
        query_id: String,
        favorites: Vec<Movie>,
        duration_ms: u64,
    },

    /// Favorites could not be listed
    ListFavoritesFailed { query_id: String, message: String },
}

impl PipelineEvent {
    /// Wire discriminant for this event
    pub fn event_kind(&self) -> EventKind {
        match self {
            PipelineEvent::MovieSearchComplete { .. } => EventKind::MovieSearchSuccess,
            PipelineEvent::MovieSearchFailed { .. } => EventKind::MovieSearchFailure,
            PipelineEvent::SemanticSearchComplete { .. } => EventKind::SemanticSearchSuccess,
            PipelineEvent::SemanticSearchFailed { .. } => EventKind::SemanticSearchFailure,
            PipelineEvent::RecommendationsComplete { .. } => EventKind::RecommendationsSuccess,
            PipelineEvent::RecommendationsFailed { .. } => EventKind::RecommendationsFailure,
            PipelineEvent::AddFavoriteComplete { .. } => EventKind::AddFavoriteSuccess,
            PipelineEvent::AddFavoriteFailed { .. } => EventKind::AddFavoriteFailure,
            PipelineEvent::RemoveFavoriteComplete { .. } => EventKind::RemoveFavoriteSuccess,
            PipelineEvent::RemoveFavoriteFailed { .. } => EventKind::RemoveFavoriteFailure,
            PipelineEvent::ListFavoritesComplete { .. } => EventKind::GetFavoritesSuccess,
            PipelineEvent::ListFavoritesFailed { .. } => EventKind::GetFavoritesFailure,
        }
    }

    /// Correlation id carried by this event
    pub fn query_id(&self) -> &str {
        match self {
            PipelineEvent::MovieSearchComplete { query_id, .. }
            | PipelineEvent::MovieSearchFailed { query_id, .. }
            | PipelineEvent::SemanticSearchComplete { query_id, .. }
            | PipelineEvent::SemanticSearchFailed { query_id, .. }
            | PipelineEvent::RecommendationsComplete { query_id, .. }
            | PipelineEvent::RecommendationsFailed { query_id, .. }
            | PipelineEvent::AddFavoriteComplete { query_id, .. }
            | PipelineEvent::AddFavoriteFailed { query_id, .. }
            | PipelineEvent::RemoveFavoriteComplete { query_id, .. }
            | PipelineEvent::RemoveFavoriteFailed { query_id, .. }
            | PipelineEvent::ListFavoritesComplete { query_id, .. }
            | PipelineEvent::ListFavoritesFailed { query_id, .. } => query_id,
        }
    }

    /// Convert to the message shape pushed over the stream.
    ///
    /// Single exhaustive mapping from the internal taxonomy to the
    /// `{type, status, queryId, data|error, duration}` wire format.
    pub fn to_wire(&self) -> WireEvent {
        fn success(
            kind: EventKind,
            query_id: &str,
            payload: &[Movie],
            duration_ms: u64,
        ) -> WireEvent {
            WireEvent {
                kind,
                status: EventStatus::Success,
                query_id: query_id.to_string(),
                data: Some(serde_json::to_value(payload).unwrap_or_default()),
                error: None,
                duration: Some(duration_ms),
            }
        }

        fn failure(kind: EventKind, query_id: &str, message: &str) -> WireEvent {
            WireEvent {
                kind,
                status: EventStatus::Failure,
                query_id: query_id.to_string(),
                data: None,
                error: Some(message.to_string()),
                duration: None,
            }
        }

        match self {
            PipelineEvent::MovieSearchComplete {
                query_id,
                movies,
                duration_ms,
            } => success(EventKind::MovieSearchSuccess, query_id, movies, *duration_ms),
            PipelineEvent::MovieSearchFailed { query_id, message } => {
                failure(EventKind::MovieSearchFailure, query_id, message)
            }
            PipelineEvent::SemanticSearchComplete {
                query_id,
                movies,
                duration_ms,
            } => success(
                EventKind::SemanticSearchSuccess,
                query_id,
                movies,
                *duration_ms,
            ),
            PipelineEvent::SemanticSearchFailed { query_id, message } => {
                failure(EventKind::SemanticSearchFailure, query_id, message)
            }
            PipelineEvent::RecommendationsComplete {
                query_id,
                movies,
                duration_ms,
            } => success(
                EventKind::RecommendationsSuccess,
                query_id,
                movies,
                *duration_ms,
            ),
            PipelineEvent::RecommendationsFailed { query_id, message } => {
                failure(EventKind::RecommendationsFailure, query_id, message)
            }
            PipelineEvent::AddFavoriteComplete {
                query_id,
                favorites,
                duration_ms,
            } => success(
                EventKind::AddFavoriteSuccess,
                query_id,
                favorites,
                *duration_ms,
            ),
            PipelineEvent::AddFavoriteFailed { query_id, message } => {
                failure(EventKind::AddFavoriteFailure, query_id, message)
            }
            PipelineEvent::RemoveFavoriteComplete {
                query_id,
                favorites,
                duration_ms,
            } => success(
                EventKind::RemoveFavoriteSuccess,
                query_id,
                favorites,
                *duration_ms,
            ),
            PipelineEvent::RemoveFavoriteFailed { query_id, message } => {
                failure(EventKind::RemoveFavoriteFailure, query_id, message)
            }
            PipelineEvent::ListFavoritesComplete {
                query_id,
                favorites,
                duration_ms,
            } => success(
                EventKind::GetFavoritesSuccess,
                query_id,
                favorites,
                *duration_ms,
            ),
            PipelineEvent::ListFavoritesFailed { query_id, message } => {
                failure(EventKind::GetFavoritesFailure, query_id, message)
            }
        }
    }
}

/// Wire discriminants for stream messages
///
/// Serialized as the SCREAMING_SNAKE_CASE strings the stream carries
/// (`MOVIE_SEARCH_SUCCESS`, ...). Job kinds map 1:1 onto a
/// success/failure pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    MovieSearchSuccess,
    MovieSearchFailure,
    SemanticSearchSuccess,
    SemanticSearchFailure,
    RecommendationsSuccess,
    RecommendationsFailure,
    AddFavoriteSuccess,
    AddFavoriteFailure,
    RemoveFavoriteSuccess,
    RemoveFavoriteFailure,
    GetFavoritesSuccess,
    GetFavoritesFailure,
}

impl EventKind {
    /// Wire string for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MovieSearchSuccess => "MOVIE_SEARCH_SUCCESS",
            EventKind::MovieSearchFailure => "MOVIE_SEARCH_FAILURE",
            EventKind::SemanticSearchSuccess => "SEMANTIC_SEARCH_SUCCESS",
            EventKind::SemanticSearchFailure => "SEMANTIC_SEARCH_FAILURE",
            EventKind::RecommendationsSuccess => "RECOMMENDATIONS_SUCCESS",
            EventKind::RecommendationsFailure => "RECOMMENDATIONS_FAILURE",
            EventKind::AddFavoriteSuccess => "ADD_FAVORITE_SUCCESS",
            EventKind::AddFavoriteFailure => "ADD_FAVORITE_FAILURE",
            EventKind::RemoveFavoriteSuccess => "REMOVE_FAVORITE_SUCCESS",
            EventKind::RemoveFavoriteFailure => "REMOVE_FAVORITE_FAILURE",
            EventKind::GetFavoritesSuccess => "GET_FAVORITES_SUCCESS",
            EventKind::GetFavoritesFailure => "GET_FAVORITES_FAILURE",
        }
    }
}

/// Success/failure marker on wire messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Failure,
}

/// Message shape pushed over the SSE stream
///
/// Built from [`PipelineEvent`] on the server, parsed back on the
/// client. `data` holds the kind-specific result payload on success;
/// `error` holds the message on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,

    pub status: EventStatus,

    #[serde(rename = "queryId")]
    pub query_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// Shared between the worker (publisher) and every open stream
/// connection (subscribers).
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after
    /// subscription. Events emitted before subscription are not
    /// received, and there is no replay: a subscriber that attaches
    /// late has permanently missed earlier events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber
    /// exists, `Err` otherwise.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Terminal events must be published exactly once whether or not
    /// anyone is connected, so the worker uses this variant.
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
