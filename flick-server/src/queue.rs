//! Job queues
//!
//! In-process queues carrying jobs from the HTTP handlers to the
//! worker. Two queues mirror the two job families: `movie` (search,
//! semantic search, recommendations) and `favorites` (add, remove,
//! list). Each queue is a bounded mpsc channel: senders get a
//! synchronous error when the consuming worker is gone, which the
//! handlers surface as HTTP 503 before any job runs.

use flick_common::api::EnqueueAck;
use flick_common::model::Movie;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default queue depth per job family
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// A unit of work flowing from a request handler to the worker
///
/// `query_id` is the caller-minted correlation id; it is echoed on the
/// terminal event so the caller can pick its result out of the shared
/// stream. An empty id is accepted (fire-and-forget) but produces an
/// event no subscriber can address.
#[derive(Debug, Clone)]
pub struct Job {
    pub query_id: String,
    pub payload: JobPayload,
}

impl Job {
    pub fn new(query_id: impl Into<String>, payload: JobPayload) -> Self {
        let query_id = query_id.into();
        if query_id.is_empty() {
            warn!(kind = %payload.kind(), "enqueueing job without query id; its event will be unaddressable");
        }
        Self { query_id, payload }
    }
}

/// Kind-specific job payloads
#[derive(Debug, Clone)]
pub enum JobPayload {
    MovieSearch {
        query: String,
        page: u32,
        limit: u32,
    },
    SemanticSearch {
        query: String,
    },
    Recommendations,
    AddFavorite {
        movie: Movie,
    },
    RemoveFavorite {
        imdb_id: String,
    },
    ListFavorites,
}

impl JobPayload {
    /// Enumerated operation this payload requests
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::MovieSearch { .. } => JobKind::MovieSearch,
            JobPayload::SemanticSearch { .. } => JobKind::SemanticSearch,
            JobPayload::Recommendations => JobKind::Recommendations,
            JobPayload::AddFavorite { .. } => JobKind::AddFavorite,
            JobPayload::RemoveFavorite { .. } => JobKind::RemoveFavorite,
            JobPayload::ListFavorites => JobKind::ListFavorites,
        }
    }
}

/// Enumerated job kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    MovieSearch,
    SemanticSearch,
    Recommendations,
    AddFavorite,
    RemoveFavorite,
    ListFavorites,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::MovieSearch => "MOVIE_SEARCH",
            JobKind::SemanticSearch => "SEMANTIC_SEARCH",
            JobKind::Recommendations => "RECOMMENDATIONS",
            JobKind::AddFavorite => "ADD_FAVORITE",
            JobKind::RemoveFavorite => "REMOVE_FAVORITE",
            JobKind::ListFavorites => "GET_FAVORITES",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Producer handle for one job queue
///
/// Cloneable; handlers share it via the application context. Delivery
/// is at-least-once to the worker side: once `enqueue` returns an ack
/// the job sits in the channel until a worker takes it.
#[derive(Clone)]
pub struct JobQueue {
    name: &'static str,
    tx: mpsc::Sender<Job>,
}

impl JobQueue {
    /// Create a queue and its consuming end
    pub fn channel(name: &'static str, capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { name, tx }, rx)
    }

    /// Submit a job, suspending until the queue accepts it.
    ///
    /// Returns the 202-style acknowledgement. Fails synchronously with
    /// [`Error::QueueUnavailable`] when the worker side has shut down;
    /// the job never ran and never will, which is distinct from an
    /// asynchronous failure event.
    pub async fn enqueue(&self, job: Job) -> Result<EnqueueAck> {
        let query_id = job.query_id.clone();
        let kind = job.payload.kind();

        self.tx.send(job).await.map_err(|_| {
            warn!(queue = self.name, %kind, "enqueue failed: queue closed");
            Error::QueueUnavailable
        })?;

        debug!(queue = self.name, %kind, query_id = %query_id, "job enqueued");
        Ok(EnqueueAck::queued(query_id))
    }

    /// Queue name, for logs
    pub fn name(&self) -> &'static str {
        self.name
    }
}
