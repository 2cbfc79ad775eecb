//! Job record and snapshot types for the video job tracker.
//!
//! A [`Job`] is mutated only through its transition methods, which refuse to
//! touch a job once it is terminal. That keeps `result` and `last_error`
//! mutually exclusive and set only in `Completed` / `Failed` respectively.

use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::progress::PROGRESS_MESSAGES;

/// Opaque handle returned by the remote service for a submitted job
/// (for Veo, the long-running operation name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(pub String);

impl JobHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional binary input sent along with the prompt, e.g. a starting image.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub bytes: Bytes,
    pub mime_type: String,
}

/// The materialized result of a completed job.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Remote reference the bytes were fetched from.
    pub result_ref: String,
    pub bytes: Bytes,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }

    /// `Submitting` or `Polling`: at most one job per tracker is ever active.
    pub fn is_active(self) -> bool {
        matches!(self, JobState::Submitting | JobState::Polling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobErrorKind {
    CredentialRequired,
    CredentialInvalid,
    SubmissionError,
    PollError,
    FetchError,
    MissingResult,
}

/// Classified failure of a job, reported verbatim in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn credential_required() -> Self {
        Self::new(
            JobErrorKind::CredentialRequired,
            "An API key must be selected before generating a video.",
        )
    }

    pub fn credential_invalid() -> Self {
        Self::new(
            JobErrorKind::CredentialInvalid,
            "API Key is invalid. Please select a valid key.",
        )
    }
}

/// One submitted generation request and its lifecycle state.
#[derive(Debug, Clone)]
pub struct Job {
    pub(crate) generation: u64,
    pub(crate) handle: Option<JobHandle>,
    pub(crate) state: JobState,
    pub(crate) submitted_prompt: String,
    pub(crate) attached_input: Option<Attachment>,
    pub(crate) result: Option<Artifact>,
    pub(crate) last_error: Option<JobError>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_polled_at: Option<DateTime<Utc>>,
    pub(crate) poll_count: u32,
    pub(crate) progress_message: Option<&'static str>,
}

impl Job {
    /// Placeholder held by a tracker that has never been submitted to.
    pub fn idle() -> Self {
        Self {
            generation: 0,
            handle: None,
            state: JobState::Idle,
            submitted_prompt: String::new(),
            attached_input: None,
            result: None,
            last_error: None,
            created_at: Utc::now(),
            last_polled_at: None,
            poll_count: 0,
            progress_message: None,
        }
    }

    /// A freshly submitted job, starting in `Submitting`.
    pub fn submitting(generation: u64, prompt: String, input: Option<Attachment>) -> Self {
        Self {
            generation,
            state: JobState::Submitting,
            submitted_prompt: prompt,
            attached_input: input,
            progress_message: Some(PROGRESS_MESSAGES[0]),
            ..Self::idle()
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn result(&self) -> Option<&Artifact> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&JobError> {
        self.last_error.as_ref()
    }

    pub(crate) fn start_polling(&mut self, handle: JobHandle) -> bool {
        if self.state != JobState::Submitting {
            return false;
        }
        self.handle = Some(handle);
        self.state = JobState::Polling;
        true
    }

    /// Records a settled poll that did not end the job.
    pub(crate) fn record_poll(&mut self) -> bool {
        if self.state != JobState::Polling {
            return false;
        }
        self.poll_count += 1;
        self.last_polled_at = Some(next_stamp(self.last_polled_at, Utc::now()));
        true
    }

    pub(crate) fn complete(&mut self, artifact: Artifact) -> bool {
        if self.state != JobState::Polling {
            return false;
        }
        self.result = Some(artifact);
        self.finish(JobState::Completed);
        true
    }

    pub(crate) fn fail(&mut self, error: JobError) -> bool {
        if !self.state.is_active() {
            return false;
        }
        self.last_error = Some(error);
        self.finish(JobState::Failed);
        true
    }

    pub(crate) fn cancel(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }
        self.finish(JobState::Cancelled);
        true
    }

    fn finish(&mut self, terminal: JobState) {
        self.state = terminal;
        self.progress_message = None;
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            generation: self.generation,
            id: self.handle.clone(),
            state: self.state,
            submitted_prompt: self.submitted_prompt.clone(),
            has_attached_input: self.attached_input.is_some(),
            result: self.result.as_ref().map(|a| ArtifactInfo {
                result_ref: a.result_ref.clone(),
                mime_type: a.mime_type.clone(),
                size_bytes: a.bytes.len(),
            }),
            last_error: self.last_error.clone(),
            created_at: self.created_at,
            last_polled_at: self.last_polled_at,
            poll_count: self.poll_count,
            progress_message: self.progress_message.map(str::to_string),
        }
    }
}

/// Strictly increasing poll timestamp: the wall clock can repeat a value
/// between two fast ticks, so a repeat is bumped by one microsecond.
fn next_stamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + ChronoDuration::microseconds(1),
        _ => now,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub result_ref: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

/// Read-only view of the current job handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub generation: u64,
    pub id: Option<JobHandle>,
    pub state: JobState,
    pub submitted_prompt: String,
    pub has_attached_input: bool,
    pub result: Option<ArtifactInfo>,
    pub last_error: Option<JobError>,
    pub created_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub poll_count: u32,
    pub progress_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> Artifact {
        Artifact {
            result_ref: "R1".to_string(),
            bytes: Bytes::from_static(b"video"),
            mime_type: "video/mp4".to_string(),
        }
    }

    #[test]
    fn test_terminal_job_is_immutable() {
        let mut job = Job::submitting(1, "a red circle".to_string(), None);
        assert!(job.start_polling(JobHandle("H1".to_string())));
        assert!(job.complete(artifact()));

        assert!(!job.fail(JobError::credential_invalid()));
        assert!(!job.cancel());
        assert!(!job.record_poll());
        assert_eq!(job.state(), JobState::Completed);
        assert!(job.last_error().is_none());
    }

    #[test]
    fn test_result_only_set_from_polling() {
        let mut job = Job::submitting(1, "p".to_string(), None);
        assert!(!job.complete(artifact()));
        assert!(job.result().is_none());
        assert_eq!(job.state(), JobState::Submitting);
    }

    #[test]
    fn test_failed_job_has_no_result() {
        let mut job = Job::submitting(1, "p".to_string(), None);
        assert!(job.fail(JobError::new(JobErrorKind::SubmissionError, "boom")));
        let snapshot = job.snapshot();
        assert_eq!(snapshot.state, JobState::Failed);
        assert!(snapshot.result.is_none());
        assert_eq!(
            snapshot.last_error.map(|e| e.kind),
            Some(JobErrorKind::SubmissionError)
        );
        assert!(snapshot.progress_message.is_none());
    }

    #[test]
    fn test_idle_job_cannot_be_cancelled() {
        let mut job = Job::idle();
        assert!(!job.cancel());
        assert_eq!(job.state(), JobState::Idle);
    }

    #[test]
    fn test_next_stamp_is_strictly_increasing() {
        let now = Utc::now();
        assert_eq!(next_stamp(None, now), now);
        let bumped = next_stamp(Some(now), now);
        assert!(bumped > now);
        let earlier = now - ChronoDuration::seconds(1);
        assert!(next_stamp(Some(now), earlier) > now);
    }

    #[test]
    fn test_snapshot_serializes_state_codes() {
        let job = Job::submitting(3, "p".to_string(), None);
        let json = serde_json::to_value(job.snapshot()).unwrap();
        assert_eq!(json["state"], "SUBMITTING");
        assert_eq!(json["generation"], 3);
        assert_eq!(json["progress_message"], PROGRESS_MESSAGES[0]);
    }
}
