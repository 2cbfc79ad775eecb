use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gemini_client::GeminiError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Video job failures never surface here: they are terminal job states and
/// travel inside the job snapshot instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No API key selected")]
    CredentialRequired,

    /// A one-shot generation call failed. The string is the user-facing
    /// message; the underlying cause is logged where the error is built.
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps a Gemini failure onto the user-facing message of a tool.
    pub fn generation(tool_message: &str, err: GeminiError) -> Self {
        match err {
            GeminiError::MissingApiKey => AppError::CredentialRequired,
            other => {
                tracing::warn!("{tool_message}: {other}");
                AppError::Generation(tool_message.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::CredentialRequired => (
                StatusCode::UNAUTHORIZED,
                "CREDENTIAL_REQUIRED",
                "An API key must be selected before generating".to_string(),
            ),
            AppError::Generation(msg) => {
                (StatusCode::BAD_GATEWAY, "GENERATION_ERROR", msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
