//! First-response chat server
//!
//! Serves a single-page chat whose gate lets each conversation record
//! exactly one model reply until the user resets it.

mod api;
mod llm;
mod runtime;
mod session;
mod state_machine;

use api::{create_router, AppState};
use llm::{LlmConfig, LoggingService, OpenAIService};
use runtime::{CompletionSettings, SessionManager};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "first_response_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let llm_config = LlmConfig::from_env();
    let port = llm::parse_or("CHAT_PORT", std::env::var("CHAT_PORT").ok(), DEFAULT_PORT);
    let idle_secs = llm::parse_or(
        "CHAT_SESSION_IDLE_SECS",
        std::env::var("CHAT_SESSION_IDLE_SECS").ok(),
        runtime::DEFAULT_IDLE_TIMEOUT.as_secs(),
    );

    // Completion collaborator; credentials arrive per session
    let openai: Arc<dyn llm::LlmService> = Arc::new(OpenAIService::new(&llm_config)?);
    let llm_service = Arc::new(LoggingService::new(openai));
    tracing::info!(
        model = %llm_config.model,
        base_url = %llm_config.base_url,
        max_tokens = llm_config.max_tokens,
        temperature = llm_config.temperature,
        "Completion service initialized"
    );

    // Create application state
    let sessions = SessionManager::new(llm_service, CompletionSettings::from(&llm_config))
        .with_idle_timeout((idle_secs > 0).then(|| Duration::from_secs(idle_secs)));
    let state = AppState::new(sessions);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("First-response chat listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
