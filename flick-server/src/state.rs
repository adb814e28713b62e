//! Shared application context
//!
//! One context instance is built at startup and cloned into every
//! handler. Ownership is explicit: components reach the bus and the
//! queues through this struct, never through globals.

use flick_common::events::EventBus;

use crate::queue::JobQueue;

/// Shared application context passed to all handlers
///
/// **Note:** AppContext implements Clone, which gives us
/// `FromRef<AppContext>` for free via Axum's blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    /// Event bus carrying terminal events to the stream endpoint
    pub bus: EventBus,
    /// Queue for search/semantic-search/recommendations jobs
    pub movie_queue: JobQueue,
    /// Queue for favorites jobs
    pub favorites_queue: JobQueue,
}
