//! Flickstream server - main entry point
//!
//! Asynchronous movie-search service: HTTP requests enqueue jobs, a
//! worker processes them against the metadata/AI/embedding providers,
//! and terminal events stream back to clients over a shared SSE
//! channel.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flick_common::config::{resolve_setting, Settings};
use flick_common::events::EventBus;
use flick_server::api;
use flick_server::providers::{
    AiConfig, ChatCompletionsClient, EmbeddingConfig, EmbeddingsClient, FavoritesStore, OmdbClient,
};
use flick_server::queue::{JobQueue, DEFAULT_QUEUE_CAPACITY};
use flick_server::state::AppContext;
use flick_server::worker::Worker;

/// Default event bus capacity
const DEFAULT_BUS_CAPACITY: usize = 1000;

/// Command-line arguments for flick-server
#[derive(Parser, Debug)]
#[command(name = "flick-server")]
#[command(about = "Asynchronous movie search service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "FLICK_PORT")]
    port: u16,

    /// OMDb API key
    #[arg(long)]
    omdb_api_key: Option<String>,

    /// AI provider API key
    #[arg(long)]
    ai_api_key: Option<String>,

    /// AI provider base URL
    #[arg(long)]
    ai_base_url: Option<String>,

    /// Chat model for parsing/suggestions/recommendations
    #[arg(long)]
    ai_model: Option<String>,

    /// Embedding model for semantic ranking
    #[arg(long)]
    embedding_model: Option<String>,

    /// Worker loops per job queue (more than 1 drops FIFO ordering
    /// within a queue)
    #[arg(long, default_value = "1", env = "FLICK_WORKERS")]
    workers: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flick_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings = Settings::load().context("Failed to load config file")?;

    let omdb_api_key = resolve_setting(
        args.omdb_api_key.as_deref(),
        "OMDB_API_KEY",
        settings.omdb_api_key.as_deref(),
    )
    .context("OMDb API key not configured (--omdb-api-key / OMDB_API_KEY)")?;

    let ai_api_key = resolve_setting(
        args.ai_api_key.as_deref(),
        "FLICK_AI_API_KEY",
        settings.ai_api_key.as_deref(),
    )
    .context("AI API key not configured (--ai-api-key / FLICK_AI_API_KEY)")?;

    let ai_base_url = resolve_setting(
        args.ai_base_url.as_deref(),
        "FLICK_AI_BASE_URL",
        settings.ai_base_url.as_deref(),
    )
    .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

    let ai_model = resolve_setting(
        args.ai_model.as_deref(),
        "FLICK_AI_MODEL",
        settings.ai_model.as_deref(),
    )
    .unwrap_or_else(|| "gpt-4o-mini".to_string());

    let embedding_model = resolve_setting(
        args.embedding_model.as_deref(),
        "FLICK_EMBEDDING_MODEL",
        settings.embedding_model.as_deref(),
    )
    .unwrap_or_else(|| "text-embedding-3-small".to_string());

    info!("Starting Flickstream server on port {}", args.port);

    // Collaborators
    let metadata = Arc::new(OmdbClient::new(omdb_api_key).context("Failed to create OMDb client")?);
    let ai = Arc::new(
        ChatCompletionsClient::new(AiConfig {
            base_url: ai_base_url.clone(),
            api_key: ai_api_key.clone(),
            model: ai_model,
        })
        .context("Failed to create AI client")?,
    );
    let embedding = Arc::new(
        EmbeddingsClient::new(EmbeddingConfig {
            base_url: ai_base_url,
            api_key: ai_api_key,
            model: embedding_model,
        })
        .context("Failed to create embeddings client")?,
    );
    let favorites = Arc::new(FavoritesStore::new());

    // Pipeline: queues -> worker -> event bus -> stream
    let bus = EventBus::new(DEFAULT_BUS_CAPACITY);
    let (movie_queue, movie_rx) = JobQueue::channel("movie", DEFAULT_QUEUE_CAPACITY);
    let (favorites_queue, favorites_rx) = JobQueue::channel("favorites", DEFAULT_QUEUE_CAPACITY);

    let worker = Arc::new(Worker::new(
        bus.clone(),
        metadata,
        ai,
        embedding,
        favorites,
    ));
    Worker::spawn(Arc::clone(&worker), movie_rx, args.workers);
    Worker::spawn(worker, favorites_rx, args.workers);
    info!("Workers started ({} per queue)", args.workers);

    let ctx = AppContext {
        bus,
        movie_queue,
        favorites_queue,
    };
    let app = api::create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
