//! Axum route handlers for the video job tracker and the API key gate.
//!
//! Job failures are not HTTP errors: every job endpoint answers `200` with the
//! snapshot, and the client renders `state` / `last_error` from it.

use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::credentials::CredentialGate;
use crate::errors::AppError;
use crate::generation::handlers::require_prompt;
use crate::jobs::model::{Attachment, JobSnapshot};
use crate::state::AppState;

const ARTIFACT_FILENAME: &str = "generated_video.mp4";

#[derive(Debug, Deserialize)]
pub struct SelectCredentialRequest {
    /// Explicit key. When absent the configured key is re-selected.
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialStatus {
    pub has_usable_credential: bool,
}

fn invalid_multipart(err: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {err}"))
}

/// Reads the `prompt` and optional `image` fields of the submit form.
async fn read_submission(
    mut multipart: Multipart,
) -> Result<(String, Option<Attachment>), AppError> {
    let mut prompt = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" => prompt = Some(field.text().await.map_err(invalid_multipart)?),
            "image" => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(invalid_multipart)?;
                // Browsers send an empty part when no file was picked.
                if bytes.is_empty() {
                    continue;
                }
                if !mime_type.starts_with("image/") {
                    return Err(AppError::Validation(format!(
                        "Starting image must be an image, got '{mime_type}'"
                    )));
                }
                image = Some(Attachment { bytes, mime_type });
            }
            _ => {}
        }
    }

    let prompt = require_prompt(prompt.as_deref().unwrap_or_default())?.to_string();
    Ok((prompt, image))
}

/// POST /api/v1/video/jobs
///
/// Multipart form: `prompt`, optional `image`. Supersedes any active job.
/// Returns once the remote submit has settled.
pub async fn handle_submit_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<JobSnapshot>, AppError> {
    let (prompt, image) = read_submission(multipart).await?;
    Ok(Json(state.video.submit(prompt, image).await))
}

/// GET /api/v1/video/jobs/current
pub async fn handle_get_video_job(State(state): State<AppState>) -> Json<JobSnapshot> {
    Json(state.video.snapshot())
}

/// DELETE /api/v1/video/jobs/current
pub async fn handle_cancel_video_job(State(state): State<AppState>) -> Json<JobSnapshot> {
    Json(state.video.cancel())
}

/// GET /api/v1/video/jobs/current/artifact
pub async fn handle_get_video_artifact(State(state): State<AppState>) -> Result<Response, AppError> {
    let artifact = state
        .video
        .artifact()
        .ok_or_else(|| AppError::NotFound("No completed video is available".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, artifact.mime_type),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{ARTIFACT_FILENAME}\""),
            ),
        ],
        artifact.bytes,
    )
        .into_response())
}

/// GET /api/v1/credentials
pub async fn handle_credential_status(State(state): State<AppState>) -> Json<CredentialStatus> {
    Json(CredentialStatus {
        has_usable_credential: state.credentials.has_usable_credential().await,
    })
}

/// POST /api/v1/credentials/select
pub async fn handle_select_credential(
    State(state): State<AppState>,
    Json(request): Json<SelectCredentialRequest>,
) -> Result<Json<CredentialStatus>, AppError> {
    match request.api_key.as_deref() {
        Some(key) => {
            if !state.credentials.select(key) {
                return Err(AppError::Validation("api_key cannot be empty".to_string()));
            }
        }
        None => {
            info!("Credential selection requested");
            state.credentials.request_credential_selection().await;
        }
    }

    Ok(Json(CredentialStatus {
        has_usable_credential: state.credentials.has_usable_credential().await,
    }))
}
