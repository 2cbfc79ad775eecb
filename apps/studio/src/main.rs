mod config;
mod credentials;
mod errors;
mod gemini_client;
mod generation;
mod jobs;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::credentials::ApiKeyGate;
use crate::gemini_client::GeminiClient;
use crate::jobs::{JobTracker, TrackerConfig};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Studio API v{}", env!("CARGO_PKG_VERSION"));

    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; select a key via /api/v1/credentials/select");
    }
    let credentials = Arc::new(ApiKeyGate::new(config.gemini_api_key.clone()));

    let gemini = GeminiClient::new(config.gemini_base_url.clone(), credentials.clone())?;
    info!(
        "Gemini client initialized (text: {}, image: {}, video: {})",
        gemini_client::TEXT_MODEL,
        gemini_client::IMAGE_MODEL,
        gemini_client::VIDEO_MODEL
    );

    let video = JobTracker::new(
        Arc::new(gemini.clone()),
        credentials.clone(),
        TrackerConfig {
            poll_interval: config.video_poll_interval,
            progress_interval: config.video_progress_interval,
        },
    );
    info!(
        "Video tracker initialized (poll every {:?}, progress every {:?})",
        config.video_poll_interval, config.video_progress_interval
    );

    let state = AppState {
        gemini,
        credentials,
        video,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
