//! Code snippet generation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::gemini_client::prompts::{CODE_PROMPT_TEMPLATE, RAW_OUTPUT_INSTRUCTION};
use crate::gemini_client::{strip_code_fences, GeminiClient, GeminiError};

/// Languages offered by the code assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CodeLanguage {
    JavaScript,
    Python,
    #[default]
    TypeScript,
    Java,
    Go,
    #[serde(rename = "HTML")]
    Html,
    #[serde(rename = "CSS")]
    Css,
}

impl CodeLanguage {
    pub const ALL: [CodeLanguage; 7] = [
        CodeLanguage::JavaScript,
        CodeLanguage::Python,
        CodeLanguage::TypeScript,
        CodeLanguage::Java,
        CodeLanguage::Go,
        CodeLanguage::Html,
        CodeLanguage::Css,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CodeLanguage::JavaScript => "JavaScript",
            CodeLanguage::Python => "Python",
            CodeLanguage::TypeScript => "TypeScript",
            CodeLanguage::Java => "Java",
            CodeLanguage::Go => "Go",
            CodeLanguage::Html => "HTML",
            CodeLanguage::Css => "CSS",
        }
    }
}

impl fmt::Display for CodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodeLanguage {
    type Err = String;

    /// Case-insensitive match on the display name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let supported: Vec<&str> = Self::ALL.iter().map(|l| l.name()).collect();
                format!(
                    "Unsupported language '{s}'. Supported: {}",
                    supported.join(", ")
                )
            })
    }
}

pub fn build_code_prompt(prompt: &str, language: CodeLanguage) -> String {
    CODE_PROMPT_TEMPLATE
        .replace("{language}", language.name())
        .replace("{instruction}", RAW_OUTPUT_INSTRUCTION)
        .replace("{prompt}", prompt)
}

pub async fn generate_code(
    client: &GeminiClient,
    prompt: &str,
    language: CodeLanguage,
) -> Result<String, GeminiError> {
    let reply = client
        .generate_text(&build_code_prompt(prompt, language))
        .await?;
    Ok(strip_code_fences(&reply).to_string())
}
