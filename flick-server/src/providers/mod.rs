//! External collaborators invoked by the worker
//!
//! Each collaborator sits behind a trait so the pipeline can be tested
//! without network access.

pub mod ai;
pub mod embedding;
pub mod favorites;
pub mod metadata;

pub use ai::{AiConfig, AiProvider, ChatCompletionsClient};
pub use embedding::{
    cosine_similarity, rank_by_similarity, EmbeddingConfig, EmbeddingProvider, EmbeddingsClient,
};
pub use favorites::FavoritesStore;
pub use metadata::{MetadataProvider, OmdbClient};
