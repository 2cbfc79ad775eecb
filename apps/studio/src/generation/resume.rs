//! Resume drafting: turns the form data into a Markdown resume.
//!
//! The model only rephrases what the user entered; the prompt forbids
//! inventing facts. Output is Markdown, downloadable as a `.md` file.

use tracing::info;

use crate::errors::AppError;
use crate::gemini_client::prompts::RESUME_PROMPT_TEMPLATE;
use crate::gemini_client::{strip_code_fences, GeminiClient};
use crate::models::resume::ResumeData;

pub const RESUME_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

/// Rejects forms that cannot produce a meaningful resume.
pub fn validate_resume(data: &ResumeData) -> Result<(), AppError> {
    if data.full_name.trim().is_empty() {
        return Err(AppError::Validation("full_name cannot be empty".to_string()));
    }
    Ok(())
}

/// Fills the resume template with the form data as pretty JSON.
/// Skills are sent as a list rather than the raw comma-separated string.
pub fn build_resume_prompt(data: &ResumeData) -> Result<String, AppError> {
    let mut value = serde_json::to_value(data)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize resume: {e}")))?;
    value["skills"] = serde_json::json!(data.skill_list());

    let resume_json = serde_json::to_string_pretty(&value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize resume: {e}")))?;

    Ok(RESUME_PROMPT_TEMPLATE.replace("{resume_json}", &resume_json))
}

/// `Jane Doe` → `Jane_Doe_Resume.md`. Characters unsafe in a filename are dropped.
pub fn resume_filename(full_name: &str) -> String {
    let stem: String = full_name
        .split_whitespace()
        .map(|part| {
            part.chars()
                .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '.')
                .collect::<String>()
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if stem.is_empty() {
        "Resume.md".to_string()
    } else {
        format!("{stem}_Resume.md")
    }
}

pub async fn generate_resume(client: &GeminiClient, data: &ResumeData) -> Result<String, AppError> {
    validate_resume(data)?;
    let prompt = build_resume_prompt(data)?;

    info!("Generating resume for {}", data.full_name);
    let markdown = client
        .generate_text(&prompt)
        .await
        .map_err(|e| AppError::generation("Failed to generate resume. Please try again.", e))?;

    // Models sometimes wrap the whole document in a ```markdown fence.
    Ok(strip_code_fences(&markdown).to_string())
}
