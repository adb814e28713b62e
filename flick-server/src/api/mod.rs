//! HTTP API
//!
//! Sets up the Axum router: enqueue endpoints, the shared SSE stream,
//! and health.

pub mod handlers;
pub mod sse;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppContext;

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(handlers::health))
        // Movie pipeline
        .route("/movie/search", get(handlers::search))
        .route("/movie/semantic-search", get(handlers::semantic_search))
        .route("/movie/recommendations", get(handlers::recommendations))
        // Favorites pipeline
        .route(
            "/favorite-movie",
            post(handlers::add_favorite).get(handlers::list_favorites),
        )
        .route("/favorite-movie/:imdb_id", delete(handlers::remove_favorite))
        // Shared SSE event stream
        .route("/stream", get(sse::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
