// Video generation jobs: one long-running remote operation at a time,
// submitted, polled on a timer, and materialized into a downloadable blob.

pub mod client;
pub mod handlers;
pub mod model;
pub mod progress;
pub mod tracker;

pub use client::{GenerationClient, PollStatus, RemoteError};
pub use model::{Artifact, Attachment, JobErrorKind, JobHandle, JobSnapshot, JobState};
pub use tracker::{JobTracker, TrackerConfig};
