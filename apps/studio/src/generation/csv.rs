//! CSV data generation.

use tracing::info;

use crate::gemini_client::prompts::{CSV_PROMPT_TEMPLATE, RAW_OUTPUT_INSTRUCTION};
use crate::gemini_client::{strip_code_fences, GeminiClient, GeminiError};

/// Filename offered when the user downloads the generated data.
pub const CSV_FILENAME: &str = "generated_data.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub fn build_csv_prompt(prompt: &str) -> String {
    CSV_PROMPT_TEMPLATE
        .replace("{instruction}", RAW_OUTPUT_INSTRUCTION)
        .replace("{prompt}", prompt)
}

pub async fn generate_csv(client: &GeminiClient, prompt: &str) -> Result<String, GeminiError> {
    let reply = client.generate_text(&build_csv_prompt(prompt)).await?;
    let csv = strip_code_fences(&reply).to_string();
    info!("Generated CSV with {} lines", csv.lines().count());
    Ok(csv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_prompt_embeds_user_prompt() {
        let prompt = build_csv_prompt("10 sci-fi movies with director and year");
        assert!(prompt.ends_with("Prompt: 10 sci-fi movies with director and year"));
        assert!(prompt.contains("code fences"));
        assert!(!prompt.contains("{instruction}"));
    }
}
