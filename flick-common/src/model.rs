//! Domain model shared by the server and client crates
//!
//! Field names follow the external JSON wire format (`imdbID`,
//! `totalResults`, ...) so the same types serialize on both sides of
//! the stream.

use serde::{Deserialize, Serialize};

/// A single movie record as returned by the metadata provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// Stable identifier (`tt` followed by 7-8 digits)
    #[serde(rename = "imdbID")]
    pub imdb_id: String,

    pub title: String,

    /// Record type reported by the provider ("movie", "series", ...)
    #[serde(rename = "type")]
    pub kind: String,

    /// Release year as reported ("2005", "2019–2023", ...)
    pub year: String,

    /// Poster image URL
    pub poster: String,
}

impl Movie {
    /// Check that the fields required for storage are present.
    ///
    /// Returns the list of missing field names, empty when valid.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.imdb_id.is_empty() {
            missing.push("imdbID");
        }
        if self.title.is_empty() {
            missing.push("title");
        }
        if self.year.is_empty() {
            missing.push("year");
        }
        if self.poster.is_empty() {
            missing.push("poster");
        }
        missing
    }

    /// Validate the identifier shape: `tt` followed by 7 or 8 digits.
    pub fn has_valid_id(&self) -> bool {
        let Some(digits) = self.imdb_id.strip_prefix("tt") else {
            return false;
        };
        (7..=8).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
    }
}

/// Paginated result of a metadata search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub movies: Vec<Movie>,
    pub total_results: u64,
    pub current_page: u32,
    pub total_pages: u32,
}

/// Structured parameters extracted from a natural-language query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,

    /// Provider confidence in the extraction, 0.0-1.0
    pub confidence: f32,
}
