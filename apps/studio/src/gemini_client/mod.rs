//! Gemini Client: the single point of entry for all Google generative API calls.
//!
//! ARCHITECTURAL RULE: No other module may call the Gemini REST API directly.
//! Tools and the video job tracker go through this module.
//!
//! The API key is read from the shared [`ApiKeyGate`] on every call, so a key
//! selected or invalidated at runtime takes effect immediately.
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::credentials::ApiKeyGate;

pub mod prompts;
pub mod video;

/// Model used for text tools (CSV, code, resume).
pub const TEXT_MODEL: &str = "gemini-2.5-pro";
/// Model used for still images.
pub const IMAGE_MODEL: &str = "imagen-4.0-generate-001";
/// Model used for long-running video generation.
pub const VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

const API_KEY_HEADER: &str = "x-goog-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const IMAGE_COUNT: u32 = 4;
const IMAGE_MIME_TYPE: &str = "image/jpeg";
const IMAGE_ASPECT_RATIO: &str = "1:1";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gemini returned empty content")]
    EmptyContent,

    #[error("No API key selected")]
    MissingApiKey,
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageParameters<'a> {
    sample_count: u32,
    output_mime_type: &'a str,
    aspect_ratio: &'a str,
}

#[derive(Debug, Serialize)]
struct PredictRequest<I: Serialize, P: Serialize> {
    instances: Vec<I>,
    parameters: P,
}

#[derive(Debug, Serialize)]
struct PromptInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImagePredictResponse {
    #[serde(default)]
    predictions: Vec<ImagePrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagePrediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

/// A generated still image, still base64-encoded as returned by Imagen.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub base64_data: String,
}

impl GeneratedImage {
    /// Renders the image as a `data:` URL that a browser can display directly.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single Gemini client used by all services.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    keys: Arc<ApiKeyGate>,
}

impl GeminiClient {
    pub fn new(base_url: String, keys: Arc<ApiKeyGate>) -> Result<Self, GeminiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            keys,
        })
    }

    /// Sends a single-turn text prompt to the text model and returns the reply.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };
        let url = self.model_url(TEXT_MODEL, "generateContent");
        let response: GenerateContentResponse = self.send(Method::POST, &url, Some(&body)).await?;
        response.text().ok_or(GeminiError::EmptyContent)
    }

    /// Generates a batch of square JPEG images for the prompt.
    /// Predictions filtered by the service (no bytes) are dropped.
    pub async fn generate_images(&self, prompt: &str) -> Result<Vec<GeneratedImage>, GeminiError> {
        let body = PredictRequest {
            instances: vec![PromptInstance { prompt }],
            parameters: ImageParameters {
                sample_count: IMAGE_COUNT,
                output_mime_type: IMAGE_MIME_TYPE,
                aspect_ratio: IMAGE_ASPECT_RATIO,
            },
        };
        let url = self.model_url(IMAGE_MODEL, "predict");
        let response: ImagePredictResponse = self.send(Method::POST, &url, Some(&body)).await?;

        let images: Vec<GeneratedImage> = response
            .predictions
            .into_iter()
            .filter_map(|p| {
                Some(GeneratedImage {
                    mime_type: p.mime_type.unwrap_or_else(|| IMAGE_MIME_TYPE.to_string()),
                    base64_data: p.bytes_base64_encoded?,
                })
            })
            .collect();

        if images.is_empty() {
            return Err(GeminiError::EmptyContent);
        }
        debug!("Imagen returned {} images", images.len());
        Ok(images)
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, action)
    }

    fn api_key(&self) -> Result<String, GeminiError> {
        self.keys.current_key().ok_or(GeminiError::MissingApiKey)
    }

    /// Sends an authenticated JSON request and decodes the JSON reply.
    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<T, GeminiError> {
        let mut request = self
            .client
            .request(method, url)
            .header(API_KEY_HEADER, self.api_key()?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = Self::ensure_success(request.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(GeminiError::Parse)
    }

    /// Returns the response unchanged on a 2xx status, otherwise an
    /// [`GeminiError::Api`] carrying the Google error message when present.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GeminiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GeminiError::Api {
            status: status.as_u16(),
            message: extract_error_message(&body),
        })
    }
}

/// Pulls `error.message` out of a Google error body, falling back to the raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<GoogleError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Strips a leading ```lang / ``` fence pair from model output.
///
/// Prompts ask for raw output, but models still wrap it occasionally.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `csv`, `python`) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .map(|s| s.trim())
        .unwrap_or(body.trim())
}
