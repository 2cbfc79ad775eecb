pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::generation::handlers as tools;
use crate::jobs::handlers as video;
use crate::state::AppState;

/// Upper bound for the video submit form (prompt plus starting image).
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/tools", get(tools::handle_list_tools))
        // One-shot tools
        .route("/api/v1/images", post(tools::handle_generate_images))
        .route("/api/v1/csv", post(tools::handle_generate_csv))
        .route("/api/v1/csv/download", post(tools::handle_download_csv))
        .route("/api/v1/code", post(tools::handle_generate_code))
        .route("/api/v1/resumes", post(tools::handle_generate_resume))
        .route("/api/v1/resumes/template", get(tools::handle_resume_template))
        .route("/api/v1/resumes/download", post(tools::handle_download_resume))
        // Video jobs
        .route(
            "/api/v1/video/jobs",
            post(video::handle_submit_video).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/v1/video/jobs/current",
            get(video::handle_get_video_job).delete(video::handle_cancel_video_job),
        )
        .route(
            "/api/v1/video/jobs/current/artifact",
            get(video::handle_get_video_artifact),
        )
        // API key gate
        .route("/api/v1/credentials", get(video::handle_credential_status))
        .route(
            "/api/v1/credentials/select",
            post(video::handle_select_credential),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::credentials::ApiKeyGate;
    use crate::gemini_client::GeminiClient;
    use crate::jobs::{
        Artifact, Attachment, GenerationClient, JobHandle, JobTracker, PollStatus, RemoteError,
        TrackerConfig,
    };

    const BOUNDARY: &str = "studio-test-boundary";

    #[derive(Default)]
    struct StubVideoClient {
        submits: AtomicUsize,
    }

    #[async_trait]
    impl GenerationClient for StubVideoClient {
        async fn submit(
            &self,
            _prompt: &str,
            _input: Option<&Attachment>,
        ) -> Result<JobHandle, RemoteError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            Ok(JobHandle("H1".to_string()))
        }

        async fn poll_status(&self, _handle: &JobHandle) -> Result<PollStatus, RemoteError> {
            Ok(PollStatus::pending())
        }

        async fn fetch_artifact(&self, _result_ref: &str) -> Result<Artifact, RemoteError> {
            Err(RemoteError::new(Some(403), "not in tests"))
        }
    }

    fn app(api_key: Option<&str>) -> (Router, Arc<StubVideoClient>) {
        let credentials = Arc::new(ApiKeyGate::new(api_key.map(str::to_string)));
        // Unroutable: nothing in these tests may reach the network.
        let gemini = GeminiClient::new("http://127.0.0.1:9".to_string(), credentials.clone())
            .expect("http client");
        let stub = Arc::new(StubVideoClient::default());
        let video = JobTracker::new(stub.clone(), credentials.clone(), TrackerConfig::default());
        let state = AppState {
            gemini,
            credentials,
            video,
        };
        (build_router(state), stub)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn multipart_request(parts: &[String]) -> Request<Body> {
        let mut body = parts.concat();
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/video/jobs")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn file_part(name: &str, content_type: &str, data: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\n\
             Content-Type: {content_type}\r\n\r\n{data}\r\n"
        )
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(None);
        let response = app.oneshot(empty_request(Method::GET, "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["service"], "studio");
    }

    #[tokio::test]
    async fn test_tool_catalog() {
        let (app, _) = app(None);
        let response = app
            .oneshot(empty_request(Method::GET, "/api/v1/tools"))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["default_tool"], "IMAGE");
        assert_eq!(json["tools"].as_array().map(Vec::len), Some(5));
        assert_eq!(json["tools"][1]["kind"], "VIDEO");
    }

    #[tokio::test]
    async fn test_blank_prompt_is_rejected() {
        let (app, _) = app(Some("k1"));
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/csv",
                serde_json::json!({"prompt": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "Please enter a prompt.");
    }

    #[tokio::test]
    async fn test_unknown_code_language_is_rejected() {
        let (app, _) = app(Some("k1"));
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/code",
                serde_json::json!({"prompt": "hello world", "language": "Cobol"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tool_without_key_requires_credential() {
        let (app, _) = app(None);
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/images",
                serde_json::json!({"prompt": "a futuristic skyline"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "CREDENTIAL_REQUIRED");
    }

    #[tokio::test]
    async fn test_resume_without_name_is_rejected() {
        let (app, _) = app(Some("k1"));
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/resumes",
                serde_json::json!({"full_name": ""}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_resume_template() {
        let (app, _) = app(None);
        let response = app
            .oneshot(empty_request(Method::GET, "/api/v1/resumes/template"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["full_name"], "Jane Doe");
    }

    #[tokio::test]
    async fn test_submit_video_starts_polling() {
        let (app, stub) = app(Some("k1"));
        let response = app
            .clone()
            .oneshot(multipart_request(&[
                text_part("prompt", "A majestic dragon flying through a stormy sky."),
                file_part("image", "image/png", "png-bytes"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["state"], "POLLING");
        assert_eq!(json["id"], "H1");
        assert_eq!(json["has_attached_input"], true);
        assert_eq!(stub.submits.load(Ordering::SeqCst), 1);

        let response = app
            .clone()
            .oneshot(empty_request(Method::GET, "/api/v1/video/jobs/current"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["state"], "POLLING");

        let response = app
            .oneshot(empty_request(Method::DELETE, "/api/v1/video/jobs/current"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["state"], "CANCELLED");
    }

    #[tokio::test]
    async fn test_submit_video_without_key_fails_in_snapshot() {
        let (app, stub) = app(None);
        let response = app
            .oneshot(multipart_request(&[text_part("prompt", "a red circle")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["state"], "FAILED");
        assert_eq!(json["last_error"]["kind"], "CREDENTIAL_REQUIRED");
        assert_eq!(stub.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_video_rejects_non_image_attachment() {
        let (app, stub) = app(Some("k1"));
        let response = app
            .oneshot(multipart_request(&[
                text_part("prompt", "a red circle"),
                file_part("image", "application/pdf", "%PDF"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(stub.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_video_requires_prompt() {
        let (app, _) = app(Some("k1"));
        let response = app
            .oneshot(multipart_request(&[text_part("prompt", "")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cancel_video_job() {
        let (app, _) = app(Some("k1"));
        let response = app
            .clone()
            .oneshot(empty_request(Method::DELETE, "/api/v1/video/jobs/current"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["state"], "IDLE");

        app.clone()
            .oneshot(multipart_request(&[text_part("prompt", "a red circle")]))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(empty_request(Method::DELETE, "/api/v1/video/jobs/current"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["state"], "CANCELLED");
        assert!(json["progress_message"].is_null());

        let response = app
            .oneshot(empty_request(Method::GET, "/api/v1/video/jobs/current"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["state"], "CANCELLED");
    }

    #[tokio::test]
    async fn test_artifact_missing_until_completed() {
        let (app, _) = app(Some("k1"));
        let response = app
            .oneshot(empty_request(
                Method::GET,
                "/api/v1/video/jobs/current/artifact",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_select_credential() {
        let (app, _) = app(None);
        let response = app
            .clone()
            .oneshot(empty_request(Method::GET, "/api/v1/credentials"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["has_usable_credential"], false);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/credentials/select",
                serde_json::json!({"api_key": "k2"}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["has_usable_credential"], true);

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/credentials/select",
                serde_json::json!({"api_key": "  "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_select_without_key_uses_configured_key() {
        let (app, _) = app(None);
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/credentials/select",
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["has_usable_credential"], false);
    }
}
