//! Flickstream client library
//!
//! Maintains a single shared connection to the server's SSE stream and
//! routes incoming events to per-request subscriptions. Callers mint a
//! correlation id, enqueue a job over plain HTTP, and register a
//! subscription here to receive the job's terminal event.
//!
//! The connection manager is an explicit handle constructed once and
//! passed to whatever needs stream access; there is no process-wide
//! singleton. It connects lazily on the first subscription, reconnects
//! with exponential backoff when the transport drops, and tears the
//! connection down eagerly when the last subscription is removed.
//!
//! ```rust,ignore
//! use flick_client::{StreamClient, StreamConfig};
//! use flick_common::events::EventKind;
//!
//! let client = StreamClient::new(StreamConfig::new("http://localhost:3000"));
//! client.subscribe(
//!     "sub-1",
//!     "query-42",
//!     vec![EventKind::MovieSearchSuccess, EventKind::MovieSearchFailure],
//!     |event| println!("terminal event: {:?}", event.kind),
//! );
//! ```

pub mod backoff;
pub mod connection;
pub mod error;
pub mod sse;
pub mod subscription;

pub use backoff::BackoffPolicy;
pub use connection::{ConnectionState, StreamClient, StreamConfig};
pub use error::{Error, Result};
pub use subscription::{EventHandler, SubscriptionRegistry};
