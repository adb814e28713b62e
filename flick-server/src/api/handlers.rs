//! HTTP request handlers
//!
//! Every pipeline endpoint does the same three things: read the
//! caller-supplied correlation id, enqueue a job carrying it, and
//! return the "queued" acknowledgement. Results never flow through
//! these handlers; they arrive on the stream.

use axum::extract::{Path, Query, State};
use axum::Json;
use flick_common::api::{AddFavoriteRequest, EnqueueAck};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::queue::{Job, JobPayload};
use crate::state::AppContext;

/// Default page for keyword search
const DEFAULT_PAGE: u32 = 1;

/// Default page size for keyword search
const DEFAULT_LIMIT: u32 = 10;

/// Query parameters for GET /movie/search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "queryId")]
    pub query_id: Option<String>,
}

/// Query parameters for endpoints that only need a correlation id
#[derive(Debug, Deserialize)]
pub struct CorrelatedQuery {
    #[serde(rename = "queryId")]
    pub query_id: Option<String>,
}

/// Query parameters for GET /movie/semantic-search
#[derive(Debug, Deserialize)]
pub struct SemanticSearchQuery {
    pub query: String,
    #[serde(rename = "queryId")]
    pub query_id: Option<String>,
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "service": "flick-server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /movie/search - enqueue a keyword search
pub async fn search(
    State(ctx): State<AppContext>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<EnqueueAck>> {
    let job = Job::new(
        params.query_id.unwrap_or_default(),
        JobPayload::MovieSearch {
            query: params.query,
            page: params.page.unwrap_or(DEFAULT_PAGE),
            limit: params.limit.unwrap_or(DEFAULT_LIMIT),
        },
    );

    let ack = ctx.movie_queue.enqueue(job).await?;
    Ok(Json(ack))
}

/// GET /movie/semantic-search - enqueue an AI-assisted search
pub async fn semantic_search(
    State(ctx): State<AppContext>,
    Query(params): Query<SemanticSearchQuery>,
) -> Result<Json<EnqueueAck>> {
    let job = Job::new(
        params.query_id.unwrap_or_default(),
        JobPayload::SemanticSearch {
            query: params.query,
        },
    );

    let ack = ctx.movie_queue.enqueue(job).await?;
    Ok(Json(ack))
}

/// GET /movie/recommendations - enqueue a recommendations run
pub async fn recommendations(
    State(ctx): State<AppContext>,
    Query(params): Query<CorrelatedQuery>,
) -> Result<Json<EnqueueAck>> {
    let job = Job::new(
        params.query_id.unwrap_or_default(),
        JobPayload::Recommendations,
    );

    let ack = ctx.movie_queue.enqueue(job).await?;
    Ok(Json(ack))
}

/// POST /favorite-movie - enqueue storing a favorite
///
/// The payload shape is validated synchronously (400) so a malformed
/// record is rejected before it ever reaches the queue; semantic
/// failures after acceptance arrive as failure events.
pub async fn add_favorite(
    State(ctx): State<AppContext>,
    Query(params): Query<CorrelatedQuery>,
    Json(request): Json<AddFavoriteRequest>,
) -> Result<Json<EnqueueAck>> {
    let movie = request.movie;

    if !movie.has_valid_id() {
        return Err(Error::BadRequest(format!(
            "invalid imdbID: {:?}",
            movie.imdb_id
        )));
    }
    let year_digits = movie.year.chars().take(4).filter(|c| c.is_ascii_digit());
    if year_digits.count() != 4 {
        return Err(Error::BadRequest(format!("invalid year: {:?}", movie.year)));
    }

    let job = Job::new(
        params.query_id.unwrap_or_default(),
        JobPayload::AddFavorite { movie },
    );

    let ack = ctx.favorites_queue.enqueue(job).await?;
    Ok(Json(ack))
}

/// DELETE /favorite-movie/:imdb_id - enqueue removing a favorite
pub async fn remove_favorite(
    State(ctx): State<AppContext>,
    Path(imdb_id): Path<String>,
    Query(params): Query<CorrelatedQuery>,
) -> Result<Json<EnqueueAck>> {
    let job = Job::new(
        params.query_id.unwrap_or_default(),
        JobPayload::RemoveFavorite { imdb_id },
    );

    let ack = ctx.favorites_queue.enqueue(job).await?;
    Ok(Json(ack))
}

/// GET /favorite-movie - enqueue listing favorites
pub async fn list_favorites(
    State(ctx): State<AppContext>,
    Query(params): Query<CorrelatedQuery>,
) -> Result<Json<EnqueueAck>> {
    let job = Job::new(
        params.query_id.unwrap_or_default(),
        JobPayload::ListFavorites,
    );

    let ack = ctx.favorites_queue.enqueue(job).await?;
    Ok(Json(ack))
}
