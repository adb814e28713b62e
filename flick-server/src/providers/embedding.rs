//! Embedding client and similarity ranking
//!
//! Fetches fixed-length text embeddings from an OpenAI-compatible
//! endpoint, caching them by exact text so repeated ranking passes do
//! not re-embed the same movie. Ranking itself is pure vector math.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use flick_common::model::Movie;
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// Default timeout for embedding requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Text-to-vector provider
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text into a fixed-length vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Configuration for [`EmbeddingsClient`]
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Embeddings client with an exact-text cache
pub struct EmbeddingsClient {
    http_client: Client,
    config: EmbeddingConfig,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl EmbeddingsClient {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Embedding(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
            cache: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingsClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.lock().await.get(text) {
            return Ok(cached.clone());
        }

        let url = format!("{}/embeddings", self.config.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({ "model": self.config.model, "input": text }))
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Embedding(format!(
                "embedding request returned {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("invalid embedding response: {e}")))?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Embedding("embedding response had no data".to_string()))?;

        debug!(text_len = text.len(), dims = embedding.len(), "embedding fetched");
        self.cache
            .lock()
            .await
            .insert(text.to_string(), embedding.clone());
        Ok(embedding)
    }
}

/// Cosine similarity of two equal-length vectors
///
/// Zero-magnitude input yields 0.0 rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Rank movies by embedding similarity to the query, best first,
/// truncated to `top_k`.
pub async fn rank_by_similarity(
    provider: &dyn EmbeddingProvider,
    query: &str,
    movies: Vec<Movie>,
    top_k: usize,
) -> Result<Vec<Movie>> {
    let query_embedding = provider.embed(query).await?;

    let embeddings = try_join_all(movies.iter().map(|movie| {
        let text = format!("{} {} {}", movie.title, movie.year, movie.kind);
        async move { provider.embed(&text).await }
    }))
    .await?;

    let mut scored: Vec<(Movie, f32)> = movies
        .into_iter()
        .zip(embeddings)
        .map(|(movie, embedding)| {
            let score = cosine_similarity(&query_embedding, &embedding);
            (movie, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    Ok(scored.into_iter().take(top_k).map(|(m, _)| m).collect())
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
