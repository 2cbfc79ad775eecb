//! Contract between the job tracker and the remote generation service.
//!
//! The tracker only ever sees [`GenerationClient`] and [`RemoteError`]; how the
//! remote side is reached (HTTP, encoding, model choice) lives behind the trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::jobs::model::{Artifact, Attachment, JobHandle};

/// Message fragments the remote service uses when it rejects the API key.
const CREDENTIAL_REJECTION_SIGNATURES: [&str; 3] = [
    "Requested entity was not found",
    "API_KEY_INVALID",
    "API key not valid",
];

/// Transport-agnostic failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    /// HTTP status, when the failure came with one.
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// True when the failure says the credential itself was rejected, as
    /// opposed to a transient or request-specific problem.
    pub fn is_credential_rejection(&self) -> bool {
        self.status == Some(401)
            || CREDENTIAL_REJECTION_SIGNATURES
                .iter()
                .any(|sig| self.message.contains(sig))
    }
}

/// Result of one status check on a submitted job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStatus {
    pub done: bool,
    pub result_ref: Option<String>,
    /// Remote-side failure description attached to a finished operation.
    pub error_info: Option<String>,
}

impl PollStatus {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn finished(result_ref: impl Into<String>) -> Self {
        Self {
            done: true,
            result_ref: Some(result_ref.into()),
            error_info: None,
        }
    }
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn submit(
        &self,
        prompt: &str,
        input: Option<&Attachment>,
    ) -> Result<JobHandle, RemoteError>;

    /// Idempotent read of the job's status; safe to call repeatedly.
    async fn poll_status(&self, handle: &JobHandle) -> Result<PollStatus, RemoteError>;

    async fn fetch_artifact(&self, result_ref: &str) -> Result<Artifact, RemoteError>;
}
