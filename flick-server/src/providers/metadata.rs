//! OMDb metadata client
//!
//! Queries the OMDb API for movie records by free-text search term.
//! Responses are normalized (trimmed, lowercased ids) and deduplicated
//! by `imdbID` before they reach the pipeline.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use flick_common::model::{Movie, SearchResponse};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// OMDb API base URL
const OMDB_API_URL: &str = "http://www.omdbapi.com/";

/// Default timeout for OMDb API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Movie metadata lookup by free-text query
///
/// The worker's only view of the metadata backend; tests substitute a
/// fake, production wires in [`OmdbClient`].
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search for movies matching `query`.
    ///
    /// `page` is 1-based; `limit` bounds the page slice; `year`
    /// optionally narrows the search.
    async fn search(
        &self,
        query: &str,
        page: u32,
        limit: u32,
        year: Option<&str>,
    ) -> Result<SearchResponse>;
}

/// OMDb client
///
/// A search term with no matches is an empty result, not an error:
/// OMDb reports "Movie not found!" as a soft failure and the pipeline
/// treats it as zero rows. Only transport and decode problems surface
/// as [`Error::Metadata`].
pub struct OmdbClient {
    http_client: Client,
    api_key: String,
}

impl OmdbClient {
    /// Create a new OMDb client with the given API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Metadata(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
        })
    }

    /// Normalize a raw OMDb page: drop rows without an id, canonicalize
    /// ids, dedupe, and cut to `limit`.
    fn normalize(raw: Vec<OmdbMovie>, limit: u32) -> Vec<Movie> {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter(|m| !m.imdb_id.trim().is_empty())
            .filter_map(|m| {
                let id = m.imdb_id.trim().to_lowercase();
                seen.insert(id.clone()).then_some(Movie {
                    imdb_id: id,
                    title: m.title,
                    kind: m.kind,
                    year: m.year,
                    poster: m.poster,
                })
            })
            .take(limit as usize)
            .collect()
    }
}

#[async_trait]
impl MetadataProvider for OmdbClient {
    async fn search(
        &self,
        query: &str,
        page: u32,
        limit: u32,
        year: Option<&str>,
    ) -> Result<SearchResponse> {
        debug!(query = %query, page, limit, "querying OMDb");

        let mut params = vec![
            ("s", query.to_string()),
            ("page", page.to_string()),
            ("apikey", self.api_key.clone()),
        ];
        if let Some(year) = year {
            params.push(("y", year.to_string()));
        }

        let response = self
            .http_client
            .get(OMDB_API_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::Metadata(format!("OMDb request failed: {e}")))?;

        let body: OmdbSearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Metadata(format!("invalid OMDb response: {e}")))?;

        let total_results: u64 = body
            .total_results
            .as_deref()
            .unwrap_or("0")
            .parse()
            .unwrap_or(0);

        let movies = Self::normalize(body.search.unwrap_or_default(), limit);
        let total_pages = if limit == 0 {
            0
        } else {
            total_results.div_ceil(limit as u64) as u32
        };

        Ok(SearchResponse {
            movies,
            total_results,
            current_page: page,
            total_pages,
        })
    }
}

/// Raw OMDb search envelope
#[derive(Debug, Deserialize)]
struct OmdbSearchResponse {
    #[serde(rename = "Search")]
    search: Option<Vec<OmdbMovie>>,

    #[serde(rename = "totalResults")]
    total_results: Option<String>,
}

/// Raw OMDb movie row
#[derive(Debug, Deserialize)]
struct OmdbMovie {
    #[serde(rename = "Title", default)]
    title: String,

    #[serde(rename = "Year", default)]
    year: String,

    #[serde(rename = "imdbID", default)]
    imdb_id: String,

    #[serde(rename = "Type", default)]
    kind: String,

    #[serde(rename = "Poster", default)]
    poster: String,
}
