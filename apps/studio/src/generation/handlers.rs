//! Axum route handlers for the one-shot generation tools.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::generation::code::{generate_code, CodeLanguage};
use crate::generation::csv::{generate_csv, CSV_CONTENT_TYPE, CSV_FILENAME};
use crate::generation::resume::{generate_resume, resume_filename, RESUME_CONTENT_TYPE};
use crate::generation::tools::{ToolInfo, ToolKind, DEFAULT_TOOL, TOOLS};
use crate::models::resume::ResumeData;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub prompt: String,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToolCatalogResponse {
    pub default_tool: ToolKind,
    pub tools: &'static [ToolInfo],
}

#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    /// `data:` URLs, ready for an `<img src>`.
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CsvResponse {
    pub csv: String,
    pub filename: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub code: String,
    pub language: CodeLanguage,
}

#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    pub markdown: String,
    pub filename: String,
}

/// Trims the prompt and rejects it when blank.
pub fn require_prompt(prompt: &str) -> Result<&str, AppError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation("Please enter a prompt.".to_string()));
    }
    Ok(prompt)
}

fn attachment(content_type: &str, filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/tools
pub async fn handle_list_tools() -> Json<ToolCatalogResponse> {
    Json(ToolCatalogResponse {
        default_tool: DEFAULT_TOOL,
        tools: &TOOLS,
    })
}

/// POST /api/v1/images
pub async fn handle_generate_images(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<ImagesResponse>, AppError> {
    let prompt = require_prompt(&request.prompt)?;

    let images = state
        .gemini
        .generate_images(prompt)
        .await
        .map_err(|e| AppError::generation("Failed to generate images. Please try again.", e))?;

    Ok(Json(ImagesResponse {
        images: images.iter().map(|img| img.data_url()).collect(),
    }))
}

/// POST /api/v1/csv
pub async fn handle_generate_csv(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<CsvResponse>, AppError> {
    let prompt = require_prompt(&request.prompt)?;
    let csv = generate_csv(&state.gemini, prompt)
        .await
        .map_err(|e| AppError::generation("Failed to generate CSV data. Please try again.", e))?;

    Ok(Json(CsvResponse {
        csv,
        filename: CSV_FILENAME,
    }))
}

/// POST /api/v1/csv/download
///
/// Same as `/api/v1/csv` but answers with the file itself.
pub async fn handle_download_csv(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Response, AppError> {
    let Json(response) = handle_generate_csv(State(state), Json(request)).await?;
    Ok(attachment(CSV_CONTENT_TYPE, CSV_FILENAME, response.csv))
}

/// POST /api/v1/code
pub async fn handle_generate_code(
    State(state): State<AppState>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<CodeResponse>, AppError> {
    let prompt = require_prompt(&request.prompt)?;
    let language = match request.language.as_deref() {
        Some(raw) => raw.parse::<CodeLanguage>().map_err(AppError::Validation)?,
        None => CodeLanguage::default(),
    };

    let code = generate_code(&state.gemini, prompt, language)
        .await
        .map_err(|e| AppError::generation("Failed to generate code. Please try again.", e))?;

    Ok(Json(CodeResponse { code, language }))
}

/// GET /api/v1/resumes/template
pub async fn handle_resume_template() -> Json<ResumeData> {
    Json(ResumeData::sample())
}

/// POST /api/v1/resumes
pub async fn handle_generate_resume(
    State(state): State<AppState>,
    Json(data): Json<ResumeData>,
) -> Result<Json<ResumeResponse>, AppError> {
    let markdown = generate_resume(&state.gemini, &data).await?;
    Ok(Json(ResumeResponse {
        markdown,
        filename: resume_filename(&data.full_name),
    }))
}

/// POST /api/v1/resumes/download
pub async fn handle_download_resume(
    State(state): State<AppState>,
    Json(data): Json<ResumeData>,
) -> Result<Response, AppError> {
    let markdown = generate_resume(&state.gemini, &data).await?;
    Ok(attachment(
        RESUME_CONTENT_TYPE,
        &resume_filename(&data.full_name),
        markdown,
    ))
}
