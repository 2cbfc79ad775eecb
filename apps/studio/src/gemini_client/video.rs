//! Veo long-running video operations, and the [`GenerationClient`] adapter the
//! job tracker drives them through.
//!
//! Remote flow: `:predictLongRunning` returns an operation name → `GET
//! /{name}` until `done` → download the sample URI with the API key.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GeminiClient, GeminiError, PredictRequest, API_KEY_HEADER, VIDEO_MODEL};
use crate::jobs::client::{GenerationClient, PollStatus, RemoteError};
use crate::jobs::model::{Artifact, Attachment, JobHandle};

const VIDEO_SAMPLE_COUNT: u32 = 1;
const VIDEO_RESOLUTION: &str = "720p";
const VIDEO_ASPECT_RATIO: &str = "16:9";
const DEFAULT_VIDEO_MIME_TYPE: &str = "video/mp4";

#[derive(Debug, Serialize)]
struct VideoInstance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InlineImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters<'a> {
    sample_count: u32,
    resolution: &'a str,
    aspect_ratio: &'a str,
}

#[derive(Debug, Deserialize)]
struct OperationStarted {
    name: String,
}

/// A Veo long-running operation as returned by `GET /{operation name}`.
#[derive(Debug, Deserialize)]
pub struct VideoOperation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    pub response: Option<VideoOperationResponse>,
    pub error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOperationResponse {
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    pub rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeneratedSample {
    pub video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
pub struct VideoRef {
    pub uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OperationError {
    pub message: String,
}

impl VideoOperation {
    /// Download URI of the first generated sample, if any.
    pub fn video_uri(&self) -> Option<&str> {
        self.generated()?
            .generated_samples
            .first()?
            .video
            .as_ref()?
            .uri
            .as_deref()
    }

    fn generated(&self) -> Option<&GenerateVideoResponse> {
        self.response.as_ref()?.generate_video_response.as_ref()
    }

    /// Collapses the operation into the tracker's status view. The operation
    /// error, or the safety-filter reasons, become `error_info`.
    pub fn into_poll_status(self) -> PollStatus {
        let result_ref = self.video_uri().map(str::to_string);
        let filtered = self
            .generated()
            .map(|g| g.rai_media_filtered_reasons.join("; "))
            .filter(|reasons| !reasons.is_empty());
        let error_info = self.error.map(|e| e.message).or(filtered);

        PollStatus {
            done: self.done,
            result_ref,
            error_info,
        }
    }
}

impl GeminiClient {
    /// Starts a video generation and returns the operation name to poll.
    pub async fn start_video(
        &self,
        prompt: &str,
        image: Option<&Attachment>,
    ) -> Result<String, GeminiError> {
        let body = PredictRequest {
            instances: vec![VideoInstance {
                prompt,
                image: image.map(|a| InlineImage {
                    bytes_base64_encoded: STANDARD.encode(&a.bytes),
                    mime_type: a.mime_type.clone(),
                }),
            }],
            parameters: VideoParameters {
                sample_count: VIDEO_SAMPLE_COUNT,
                resolution: VIDEO_RESOLUTION,
                aspect_ratio: VIDEO_ASPECT_RATIO,
            },
        };
        let url = self.model_url(VIDEO_MODEL, "predictLongRunning");
        let started: OperationStarted = self.send(Method::POST, &url, Some(&body)).await?;
        debug!("Video operation started: {}", started.name);
        Ok(started.name)
    }

    pub async fn get_video_operation(&self, name: &str) -> Result<VideoOperation, GeminiError> {
        let url = format!("{}/{}", self.base_url, name.trim_start_matches('/'));
        self.send::<(), _>(Method::GET, &url, None).await
    }

    /// Downloads a generated file. Redirects to the storage host are followed.
    pub async fn download(&self, uri: &str) -> Result<(Bytes, String), GeminiError> {
        let response = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_VIDEO_MIME_TYPE.to_string());
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(GeminiError::EmptyContent);
        }
        Ok((bytes, mime_type))
    }
}

impl From<GeminiError> for RemoteError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::Api { status, message } => RemoteError::new(Some(status), message),
            GeminiError::MissingApiKey => {
                RemoteError::new(Some(401), GeminiError::MissingApiKey.to_string())
            }
            GeminiError::Http(e) => RemoteError::new(e.status().map(|s| s.as_u16()), e.to_string()),
            other => RemoteError::new(None, other.to_string()),
        }
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn submit(
        &self,
        prompt: &str,
        input: Option<&Attachment>,
    ) -> Result<JobHandle, RemoteError> {
        let name = self.start_video(prompt, input).await?;
        Ok(JobHandle(name))
    }

    async fn poll_status(&self, handle: &JobHandle) -> Result<PollStatus, RemoteError> {
        let operation = self.get_video_operation(handle.as_str()).await?;
        Ok(operation.into_poll_status())
    }

    async fn fetch_artifact(&self, result_ref: &str) -> Result<Artifact, RemoteError> {
        let (bytes, mime_type) = self.download(result_ref).await?;
        Ok(Artifact {
            result_ref: result_ref.to_string(),
            bytes,
            mime_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(json: serde_json::Value) -> VideoOperation {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_pending_operation() {
        let status = operation(serde_json::json!({
            "name": "models/veo-3.1-fast-generate-preview/operations/abc"
        }))
        .into_poll_status();
        assert_eq!(status, PollStatus::pending());
    }

    #[test]
    fn test_finished_operation_exposes_uri() {
        let status = operation(serde_json::json!({
            "name": "models/veo/operations/abc",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [
                        {"video": {"uri": "https://example.test/files/v1:download?alt=media"}}
                    ]
                }
            }
        }))
        .into_poll_status();
        assert!(status.done);
        assert_eq!(
            status.result_ref.as_deref(),
            Some("https://example.test/files/v1:download?alt=media")
        );
        assert!(status.error_info.is_none());
    }

    #[test]
    fn test_finished_operation_with_error() {
        let status = operation(serde_json::json!({
            "done": true,
            "error": {"code": 3, "message": "Unsupported image format"}
        }))
        .into_poll_status();
        assert!(status.done);
        assert!(status.result_ref.is_none());
        assert_eq!(status.error_info.as_deref(), Some("Unsupported image format"));
    }

    #[test]
    fn test_filtered_operation_reports_reasons() {
        let status = operation(serde_json::json!({
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "raiMediaFilteredReasons": ["blocked by safety filter"]
                }
            }
        }))
        .into_poll_status();
        assert!(status.result_ref.is_none());
        assert_eq!(status.error_info.as_deref(), Some("blocked by safety filter"));
    }

    #[test]
    fn test_video_request_inlines_image() {
        let attachment = Attachment {
            bytes: Bytes::from_static(b"png"),
            mime_type: "image/png".to_string(),
        };
        let instance = VideoInstance {
            prompt: "a dragon",
            image: Some(InlineImage {
                bytes_base64_encoded: STANDARD.encode(&attachment.bytes),
                mime_type: attachment.mime_type.clone(),
            }),
        };
        let json = serde_json::to_value(&instance).unwrap();
        assert_eq!(json["image"]["bytesBase64Encoded"], "cG5n");
        assert_eq!(json["image"]["mimeType"], "image/png");
    }

    #[test]
    fn test_video_request_without_image_omits_field() {
        let json = serde_json::to_value(VideoInstance {
            prompt: "a dragon",
            image: None,
        })
        .unwrap();
        assert!(json.get("image").is_none());
    }

    #[test]
    fn test_api_error_keeps_status_for_classification() {
        let remote: RemoteError = GeminiError::Api {
            status: 404,
            message: "Requested entity was not found.".to_string(),
        }
        .into();
        assert_eq!(remote.status, Some(404));
        assert!(remote.is_credential_rejection());
    }

    #[test]
    fn test_missing_key_is_credential_rejection() {
        let remote: RemoteError = GeminiError::MissingApiKey.into();
        assert!(remote.is_credential_rejection());
    }

    #[test]
    fn test_empty_content_is_not_credential_rejection() {
        let remote: RemoteError = GeminiError::EmptyContent.into();
        assert_eq!(remote.status, None);
        assert!(!remote.is_credential_rejection());
    }
}
