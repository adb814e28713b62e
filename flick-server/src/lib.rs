//! Flickstream server library
//!
//! Exposes the pipeline pieces (queues, worker, providers, HTTP API)
//! so integration tests can assemble a server in-process.

pub mod api;
pub mod error;
pub mod providers;
pub mod queue;
pub mod state;
pub mod worker;

pub use error::{Error, Result};
