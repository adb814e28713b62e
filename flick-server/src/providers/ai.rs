//! Chat-completions AI client
//!
//! Turns free text into structured search parameters, candidate movie
//! titles, and recommendations by prompting an OpenAI-compatible
//! chat-completions endpoint. All three operations are prompt-in,
//! JSON-out; the completion text is parsed after stripping any
//! markdown code fences the model wraps around it.

use std::time::Duration;

use async_trait::async_trait;
use flick_common::model::{Movie, SearchParams};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default timeout for completion requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Completion token budget
const MAX_TOKENS: u32 = 1024;

/// AI-backed query understanding
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Convert a natural-language query into structured search
    /// parameters. Degrades to `{search_term: <raw query>, confidence:
    /// 0.5}` when the provider is unreachable.
    async fn parse_query(&self, text: &str) -> Result<SearchParams>;

    /// Suggest concrete movie titles matching a free-text description.
    /// An empty list is a meaningful answer (the pipeline falls back to
    /// keyword search), so provider failures are errors here.
    async fn suggest_titles(&self, text: &str) -> Result<Vec<String>>;

    /// Suggest titles similar to the given favorites. Empty favorites
    /// yield an empty list without calling the provider.
    async fn recommend(&self, favorites: &[Movie]) -> Result<Vec<String>>;
}

/// Configuration for [`ChatCompletionsClient`]
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Client for an OpenAI-compatible chat-completions API
pub struct ChatCompletionsClient {
    http_client: Client,
    config: AiConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: AiConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Ai(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Send one prompt, return the completion text
    async fn invoke_model(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let payload = json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Ai(format!("completion request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Ai(format!(
                "completion request returned {}",
                response.status()
            )));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Ai(format!("invalid completion response: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Ai("completion response had no choices".to_string()))
    }
}

#[async_trait]
impl AiProvider for ChatCompletionsClient {
    async fn parse_query(&self, text: &str) -> Result<SearchParams> {
        let prompt = format!(
            r#"You are a movie search assistant. Convert this natural language query into structured search parameters.

User query: "{text}"

Return JSON with these fields (all optional):
{{
  "searchTerm": "string",
  "year": "string",
  "confidence": 0.0-1.0
}}

Examples:
"batman movies" -> {{"searchTerm": "batman", "confidence": 0.9}}
"90s action films" -> {{"searchTerm": "action", "year": "1990", "confidence": 0.8}}
"recent comedies" -> {{"searchTerm": "comedy", "year": "2020", "confidence": 0.7}}

Only return valid JSON, no explanation."#
        );

        match self.invoke_model(&prompt).await {
            Ok(completion) => parse_completion_json(&completion),
            Err(e) => {
                // Keyword search still works without the parser
                warn!(error = %e, "query parsing unavailable, using raw query");
                Ok(SearchParams {
                    search_term: Some(text.to_string()),
                    year: None,
                    confidence: 0.5,
                })
            }
        }
    }

    async fn suggest_titles(&self, text: &str) -> Result<Vec<String>> {
        let prompt = format!(
            r#"You are a movie expert. Based on this search query, suggest 8-10 specific movie TITLES that match what the user is looking for.

User query: "{text}"

Consider:
- Genre/themes mentioned
- Time period (if specified)
- Style/mood
- Popular and well-known movies that fit

Return ONLY a JSON array of movie titles (just the title, no year):
["Movie Title 1", "Movie Title 2", "Movie Title 3", ...]

Only return the JSON array, nothing else."#
        );

        let completion = self.invoke_model(&prompt).await?;
        let titles: Vec<String> = parse_completion_json(&completion)?;
        debug!(count = titles.len(), "title suggestions received");
        Ok(titles)
    }

    async fn recommend(&self, favorites: &[Movie]) -> Result<Vec<String>> {
        if favorites.is_empty() {
            return Ok(Vec::new());
        }

        let favorite_titles = favorites
            .iter()
            .map(|m| m.title.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let prompt = format!(
            r#"Based on these favorite movies: {favorite_titles}

Suggest 5 similar movies the user would enjoy. Consider:
- Genre similarities
- Era/time period
- Director style
- Themes

Return ONLY a JSON array of movie titles:
["Movie 1", "Movie 2", "Movie 3", "Movie 4", "Movie 5"]"#
        );

        let completion = self.invoke_model(&prompt).await?;
        parse_completion_json(&completion)
    }
}

/// Parse JSON out of a completion, tolerating markdown code fences
fn parse_completion_json<T: serde::de::DeserializeOwned>(completion: &str) -> Result<T> {
    let trimmed = strip_code_fences(completion);
    serde_json::from_str(trimmed)
        .map_err(|e| Error::Ai(format!("completion was not the expected JSON: {e}")))
}

fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    // Opening fence may carry a language tag ("```json")
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim().strip_suffix("```").unwrap_or(inner).trim()
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}
