//! Job worker
//!
//! Consumes jobs from a queue, invokes the domain collaborators, and
//! publishes exactly one terminal event per job on the EventBus. A
//! failing job becomes a failure event; nothing escapes the worker
//! loop, so one bad job never blocks the jobs behind it.

use std::sync::Arc;
use std::time::Instant;

use flick_common::events::{EventBus, PipelineEvent};
use flick_common::model::Movie;
use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::providers::{
    rank_by_similarity, AiProvider, EmbeddingProvider, FavoritesStore, MetadataProvider,
};
use crate::queue::{Job, JobKind, JobPayload};

/// Result count for ranked semantic search
const SEMANTIC_TOP_K: usize = 10;

/// Page size for the semantic-search keyword fallback
const FALLBACK_LIMIT: u32 = 10;

/// Job processor
///
/// Owns handles to every collaborator plus the event bus. Cheap to
/// share: spawn as many loops over one instance as the deployment
/// wants (one per queue keeps FIFO within that queue's kinds).
pub struct Worker {
    bus: EventBus,
    metadata: Arc<dyn MetadataProvider>,
    ai: Arc<dyn AiProvider>,
    embedding: Arc<dyn EmbeddingProvider>,
    favorites: Arc<FavoritesStore>,
}

impl Worker {
    pub fn new(
        bus: EventBus,
        metadata: Arc<dyn MetadataProvider>,
        ai: Arc<dyn AiProvider>,
        embedding: Arc<dyn EmbeddingProvider>,
        favorites: Arc<FavoritesStore>,
    ) -> Self {
        Self {
            bus,
            metadata,
            ai,
            embedding,
            favorites,
        }
    }

    /// Spawn `count` worker loops over one queue receiver.
    ///
    /// One loop preserves FIFO for the queue's kinds; more than one
    /// trades ordering for throughput. Loops exit when the queue's
    /// sender side is dropped.
    pub fn spawn(
        worker: Arc<Worker>,
        rx: mpsc::Receiver<Job>,
        count: usize,
    ) -> Vec<JoinHandle<()>> {
        let rx = Arc::new(Mutex::new(rx));

        (0..count.max(1))
            .map(|worker_id| {
                let worker = Arc::clone(&worker);
                let rx = Arc::clone(&rx);
                tokio::spawn(async move {
                    loop {
                        // Hold the lock only while waiting for one job
                        let job = rx.lock().await.recv().await;
                        match job {
                            Some(job) => worker.process(job).await,
                            None => break,
                        }
                    }
                    debug!(worker_id, "worker loop stopped: queue closed");
                })
            })
            .collect()
    }

    /// Process one job: run the operation, publish the terminal event.
    pub async fn process(&self, job: Job) {
        let start = Instant::now();
        let Job { query_id, payload } = job;
        let kind = payload.kind();

        debug!(%kind, query_id = %query_id, "processing job");
        let result = self.run(payload).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let event = match &result {
            Ok(movies) => {
                info!(%kind, query_id = %query_id, results = movies.len(), duration_ms, "job succeeded");
                success_event(kind, query_id, movies.clone(), duration_ms)
            }
            Err(e) => {
                error!(%kind, query_id = %query_id, error = %e, "job failed");
                failure_event(kind, query_id, e.to_string())
            }
        };

        // Lossy on purpose: the terminal event is published exactly
        // once whether or not anyone is connected to hear it.
        self.bus.emit_lossy(event);
    }

    /// Dispatch to the operation for this payload
    async fn run(&self, payload: JobPayload) -> Result<Vec<Movie>> {
        match payload {
            JobPayload::MovieSearch { query, page, limit } => {
                self.movie_search(&query, page, limit).await
            }
            JobPayload::SemanticSearch { query } => self.semantic_search(&query).await,
            JobPayload::Recommendations => self.recommendations().await,
            JobPayload::AddFavorite { movie } => {
                self.favorites.add(movie)?;
                Ok(self.favorites.all())
            }
            JobPayload::RemoveFavorite { imdb_id } => {
                self.favorites.remove(&imdb_id);
                Ok(self.favorites.all())
            }
            JobPayload::ListFavorites => Ok(self.favorites.all()),
        }
    }

    async fn movie_search(&self, query: &str, page: u32, limit: u32) -> Result<Vec<Movie>> {
        let response = self.metadata.search(query, page, limit, None).await?;
        Ok(response.movies)
    }

    /// Semantic search: AI title suggestions, resolved against the
    /// metadata provider, ranked by embedding similarity.
    ///
    /// When the suggestion step yields nothing the job degrades to a
    /// plain keyword search instead of failing; a suggestion list that
    /// resolves to zero movies is a failure.
    async fn semantic_search(&self, query: &str) -> Result<Vec<Movie>> {
        let titles = self.ai.suggest_titles(query).await?;

        if titles.is_empty() {
            debug!(query = %query, "no title suggestions, falling back to keyword search");
            let response = self.metadata.search(query, 1, FALLBACK_LIMIT, None).await?;
            return Ok(response.movies);
        }

        let candidates = self.lookup_titles(&titles).await;
        if candidates.is_empty() {
            return Err(Error::NotFound(
                "no movies found for suggested titles".to_string(),
            ));
        }

        rank_by_similarity(self.embedding.as_ref(), query, candidates, SEMANTIC_TOP_K).await
    }

    async fn recommendations(&self) -> Result<Vec<Movie>> {
        let favorites = self.favorites.all();
        let titles = self.ai.recommend(&favorites).await?;
        Ok(self.lookup_titles(&titles).await)
    }

    /// Resolve titles to movie records with concurrent single-result
    /// lookups. Lookups that fail or come back empty are dropped.
    async fn lookup_titles(&self, titles: &[String]) -> Vec<Movie> {
        let lookups = titles.iter().map(|title| async move {
            match self.metadata.search(title, 1, 1, None).await {
                Ok(response) => response.movies.into_iter().next(),
                Err(e) => {
                    debug!(title = %title, error = %e, "dropping failed title lookup");
                    None
                }
            }
        });

        join_all(lookups).await.into_iter().flatten().collect()
    }
}

/// Build the success event for a job kind
fn success_event(
    kind: JobKind,
    query_id: String,
    movies: Vec<Movie>,
    duration_ms: u64,
) -> PipelineEvent {
    match kind {
        JobKind::MovieSearch => PipelineEvent::MovieSearchComplete {
            query_id,
            movies,
            duration_ms,
        },
        JobKind::SemanticSearch => PipelineEvent::SemanticSearchComplete {
            query_id,
            movies,
            duration_ms,
        },
        JobKind::Recommendations => PipelineEvent::RecommendationsComplete {
            query_id,
            movies,
            duration_ms,
        },
        JobKind::AddFavorite => PipelineEvent::AddFavoriteComplete {
            query_id,
            favorites: movies,
            duration_ms,
        },
        JobKind::RemoveFavorite => PipelineEvent::RemoveFavoriteComplete {
            query_id,
            favorites: movies,
            duration_ms,
        },
        JobKind::ListFavorites => PipelineEvent::ListFavoritesComplete {
            query_id,
            favorites: movies,
            duration_ms,
        },
    }
}

/// Build the failure event for a job kind
fn failure_event(kind: JobKind, query_id: String, message: String) -> PipelineEvent {
    match kind {
        JobKind::MovieSearch => PipelineEvent::MovieSearchFailed { query_id, message },
        JobKind::SemanticSearch => PipelineEvent::SemanticSearchFailed { query_id, message },
        JobKind::Recommendations => PipelineEvent::RecommendationsFailed { query_id, message },
        JobKind::AddFavorite => PipelineEvent::AddFavoriteFailed { query_id, message },
        JobKind::RemoveFavorite => PipelineEvent::RemoveFavoriteFailed { query_id, message },
        JobKind::ListFavorites => PipelineEvent::ListFavoritesFailed { query_id, message },
    }
}
