//! Test helpers for flick-server integration tests
//!
//! Fake collaborators plus a programmatically controllable in-process
//! server with event monitoring.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::Router;
use serde_json::Value;
use tokio::sync::broadcast;

use flick_common::events::{EventBus, EventKind, PipelineEvent};
use flick_common::model::{Movie, SearchParams, SearchResponse};
use flick_server::error::{Error, Result};
use flick_server::providers::{
    AiProvider, EmbeddingProvider, FavoritesStore, MetadataProvider,
};
use flick_server::queue::JobQueue;
use flick_server::state::AppContext;
use flick_server::worker::Worker;

/// Build a movie record for tests
pub fn movie(id: &str, title: &str) -> Movie {
    Movie {
        imdb_id: id.to_string(),
        title: title.to_string(),
        kind: "movie".to_string(),
        year: "2005".to_string(),
        poster: "https://example.com/p.jpg".to_string(),
    }
}

/// Metadata fake backed by an exact-match catalog
///
/// Unknown queries return an empty page (OMDb's "Movie not found!"
/// behavior); `fail_all` turns every call into a provider error.
#[derive(Default)]
pub struct FakeMetadata {
    pub catalog: HashMap<String, Vec<Movie>>,
    pub fail_all: bool,
}

impl FakeMetadata {
    pub fn with(entries: &[(&str, Vec<Movie>)]) -> Self {
        Self {
            catalog: entries
                .iter()
                .map(|(q, m)| (q.to_string(), m.clone()))
                .collect(),
            fail_all: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            catalog: HashMap::new(),
            fail_all: true,
        }
    }
}

#[async_trait]
impl MetadataProvider for FakeMetadata {
    async fn search(
        &self,
        query: &str,
        page: u32,
        limit: u32,
        _year: Option<&str>,
    ) -> Result<SearchResponse> {
        if self.fail_all {
            return Err(Error::Metadata("metadata backend down".to_string()));
        }

        let movies: Vec<Movie> = self
            .catalog
            .get(query)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(limit as usize)
            .collect();
        let total = movies.len() as u64;

        Ok(SearchResponse {
            movies,
            total_results: total,
            current_page: page,
            total_pages: if limit == 0 { 0 } else { 1 },
        })
    }
}

/// AI fake with canned answers
#[derive(Default)]
pub struct FakeAi {
    pub suggestions: Vec<String>,
    pub recommendations: Vec<String>,
    pub fail_all: bool,
}

#[async_trait]
impl AiProvider for FakeAi {
    async fn parse_query(&self, text: &str) -> Result<SearchParams> {
        Ok(SearchParams {
            search_term: Some(text.to_string()),
            year: None,
            confidence: 0.9,
        })
    }

    async fn suggest_titles(&self, _text: &str) -> Result<Vec<String>> {
        if self.fail_all {
            return Err(Error::Ai("AI backend down".to_string()));
        }
        Ok(self.suggestions.clone())
    }

    async fn recommend(&self, favorites: &[Movie]) -> Result<Vec<String>> {
        if self.fail_all {
            return Err(Error::Ai("AI backend down".to_string()));
        }
        if favorites.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.recommendations.clone())
    }
}

/// Embedding fake with a fixed lookup table and a fallback vector
#[derive(Default)]
pub struct FakeEmbeddings {
    pub table: HashMap<String, Vec<f32>>,
}

impl FakeEmbeddings {
    pub fn with(entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(t, v)| (t.to_string(), v.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.table.get(text).cloned().unwrap_or(vec![1.0, 0.0]))
    }
}

/// Assembled pipeline with fakes, ready to process jobs
pub struct TestPipeline {
    pub bus: EventBus,
    pub worker: Arc<Worker>,
    pub favorites: Arc<FavoritesStore>,
}

impl TestPipeline {
    pub fn new(metadata: FakeMetadata, ai: FakeAi, embeddings: FakeEmbeddings) -> Self {
        let bus = EventBus::new(64);
        let favorites = Arc::new(FavoritesStore::new());
        let worker = Arc::new(Worker::new(
            bus.clone(),
            Arc::new(metadata),
            Arc::new(ai),
            Arc::new(embeddings),
            Arc::clone(&favorites),
        ));

        Self {
            bus,
            worker,
            favorites,
        }
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream {
            receiver: self.bus.subscribe(),
            start_time: Instant::now(),
        }
    }
}

/// Test server exposing the full router over the in-process pipeline
pub struct TestServer {
    pub router: Router,
    pub bus: EventBus,
    pub favorites: Arc<FavoritesStore>,
}

impl TestServer {
    /// Start a test server with fakes and running workers
    pub fn start(metadata: FakeMetadata, ai: FakeAi, embeddings: FakeEmbeddings) -> Self {
        let pipeline = TestPipeline::new(metadata, ai, embeddings);
        let (movie_queue, movie_rx) = JobQueue::channel("movie", 16);
        let (favorites_queue, favorites_rx) = JobQueue::channel("favorites", 16);

        Worker::spawn(Arc::clone(&pipeline.worker), movie_rx, 1);
        Worker::spawn(Arc::clone(&pipeline.worker), favorites_rx, 1);

        let ctx = AppContext {
            bus: pipeline.bus.clone(),
            movie_queue,
            favorites_queue,
        };

        Self {
            router: flick_server::api::create_router(ctx),
            bus: pipeline.bus,
            favorites: pipeline.favorites,
        }
    }

    /// Start a test server whose queues have no workers: every enqueue
    /// fails synchronously
    pub fn start_with_dead_queues() -> Self {
        let bus = EventBus::new(16);
        let (movie_queue, movie_rx) = JobQueue::channel("movie", 16);
        let (favorites_queue, favorites_rx) = JobQueue::channel("favorites", 16);
        drop(movie_rx);
        drop(favorites_rx);

        let ctx = AppContext {
            bus: bus.clone(),
            movie_queue,
            favorites_queue,
        };

        Self {
            router: flick_server::api::create_router(ctx),
            bus,
            favorites: Arc::new(FavoritesStore::new()),
        }
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream {
            receiver: self.bus.subscribe(),
            start_time: Instant::now(),
        }
    }

    /// Make an HTTP request against the in-process router
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> (axum::http::StatusCode, Option<Value>) {
        use axum::body::Body;
        use axum::http::{Method, Request};
        use tower::Service;

        let method = match method {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "DELETE" => Method::DELETE,
            other => panic!("unsupported method: {other}"),
        };

        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }

        let request = match body {
            Some(json_body) => builder
                .body(Body::from(json_body.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        let response = self
            .router
            .clone()
            .call(request)
            .await
            .expect("router call");
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = (!bytes.is_empty())
            .then(|| serde_json::from_slice(&bytes).ok())
            .flatten();

        (status, json)
    }
}

/// Event stream wrapper with timeout helpers
pub struct EventStream {
    pub receiver: broadcast::Receiver<PipelineEvent>,
    pub start_time: Instant,
}

impl EventStream {
    /// Wait for next event with timeout
    pub async fn next_timeout(&mut self, timeout: Duration) -> Option<PipelineEvent> {
        tokio::time::timeout(timeout, self.receiver.recv())
            .await
            .ok()
            .and_then(|r| r.ok())
    }

    /// Wait for the next event of a specific kind
    pub async fn wait_for(&mut self, kind: EventKind, timeout: Duration) -> Option<PipelineEvent> {
        let deadline = Instant::now() + timeout;

        loop {
            if Instant::now() > deadline {
                return None;
            }

            let remaining = deadline.duration_since(Instant::now());
            match self.next_timeout(remaining).await {
                Some(event) if event.event_kind() == kind => return Some(event),
                Some(_) => continue,
                None => return None,
            }
        }
    }

    /// Assert no further event arrives within the window
    pub async fn assert_quiet(&mut self, window: Duration) {
        if let Some(event) = self.next_timeout(window).await {
            panic!("expected no further events, got {:?}", event.event_kind());
        }
    }
}
