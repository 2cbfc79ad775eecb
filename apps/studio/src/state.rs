use std::sync::Arc;

use crate::credentials::ApiKeyGate;
use crate::gemini_client::GeminiClient;
use crate::jobs::JobTracker;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub gemini: GeminiClient,
    /// Selected API key. Shared with `gemini` and consulted by `video`.
    pub credentials: Arc<ApiKeyGate>,
    /// The single video job tracker. One job at a time, service-wide.
    pub video: JobTracker,
}
