//! Async Job Tracker: drives one long-running video job from submission to a
//! terminal state.
//!
//! Flow: credential check → remote submit → poll on a fixed cadence →
//!       fetch artifact → `Completed` (or `Failed` / `Cancelled` on the way).
//!
//! Concurrency model:
//! - The job record lives behind a mutex that is only held for synchronous
//!   transitions, never across an `.await`.
//! - Each job gets its own [`CancellationToken`]. The poll loop and the
//!   progress-message loop both stop when it fires; every terminal transition
//!   fires it.
//! - A cancelled job cannot abort a call already on the wire. Every response
//!   is applied only if the job it was issued for is still the current
//!   generation and still in the state that issued it; anything else is
//!   dropped.
//! - The poll loop is sequential, so at most one status call is outstanding.
//!   A tick that falls due while a call is in flight is skipped, not queued.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::credentials::CredentialGate;
use crate::jobs::client::{GenerationClient, PollStatus, RemoteError};
use crate::jobs::model::{
    Artifact, Attachment, Job, JobError, JobErrorKind, JobHandle, JobSnapshot, JobState,
};
use crate::jobs::progress::ProgressRotation;

/// Timer periods for one tracker.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// Cadence of remote status checks while `Polling`.
    pub poll_interval: Duration,
    /// Cadence of the cosmetic progress-message rotation.
    pub progress_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            progress_interval: Duration::from_secs(5),
        }
    }
}

/// What the poll loop does after a status response has been applied.
#[derive(Debug, PartialEq)]
enum PollStep {
    Continue,
    Fetch(String),
    Stop,
}

struct Slot {
    job: Job,
    last_generation: u64,
    /// Stops the timers of the current job. `None` once it is terminal.
    timers: Option<CancellationToken>,
}

impl Slot {
    fn is_current(&self, generation: u64, state: JobState) -> bool {
        self.job.generation == generation && self.job.state == state
    }

    /// Replaces the job record with a fresh `Submitting` job.
    fn begin(&mut self, prompt: String, input: Option<Attachment>) -> u64 {
        self.last_generation += 1;
        self.job = Job::submitting(self.last_generation, prompt, input);
        self.last_generation
    }

    fn stop_timers(&mut self) {
        if let Some(token) = self.timers.take() {
            token.cancel();
        }
    }

    fn fail(&mut self, error: JobError) {
        if self.job.fail(error) {
            self.stop_timers();
        }
    }

    fn cancel_active(&mut self) -> bool {
        if self.job.cancel() {
            self.stop_timers();
            true
        } else {
            false
        }
    }
}

struct Shared {
    client: Arc<dyn GenerationClient>,
    gate: Arc<dyn CredentialGate>,
    config: TrackerConfig,
    slot: Mutex<Slot>,
}

/// Tracks a single video job at a time. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct JobTracker {
    shared: Arc<Shared>,
}

impl JobTracker {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        gate: Arc<dyn CredentialGate>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                gate,
                config,
                slot: Mutex::new(Slot {
                    job: Job::idle(),
                    last_generation: 0,
                    timers: None,
                }),
            }),
        }
    }

    /// Starts a new job and returns its snapshot once the remote submit has
    /// settled (`Polling` or `Failed`).
    ///
    /// An active job is cancelled first: only one job is tracked at a time.
    /// Without a usable credential the job fails with `CREDENTIAL_REQUIRED`
    /// and the remote service is never contacted.
    ///
    /// The remote call runs on a tracker-owned task, so dropping the returned
    /// future does not strand the job in `Submitting`. If this job is
    /// cancelled or superseded before the call settles, the snapshot is of
    /// this job in `Cancelled`, never of its successor.
    pub async fn submit(&self, prompt: String, input: Option<Attachment>) -> JobSnapshot {
        let has_credential = self.shared.gate.has_usable_credential().await;

        let (pending, token) = {
            let mut slot = self.shared.lock();
            let previous = slot.job.generation;
            if slot.cancel_active() {
                info!(generation = previous, "Superseding active video job");
            }

            let generation = slot.begin(prompt, input);
            if !has_credential {
                warn!(generation, "Video job rejected: no API key selected");
                slot.fail(JobError::credential_required());
                return slot.job.snapshot();
            }

            let token = CancellationToken::new();
            slot.timers = Some(token.clone());
            (slot.job.clone(), token)
        };

        let generation = pending.generation;
        info!(generation, "Submitting video job");
        tokio::spawn(run_progress(self.shared.clone(), generation, token.clone()));

        let shared = self.shared.clone();
        let settle = tokio::spawn(async move {
            let outcome = shared
                .client
                .submit(&pending.submitted_prompt, pending.attached_input.as_ref())
                .await;
            shared.apply_submit(pending, token, outcome)
        });

        match settle.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(generation, error = %e, "Video submit task aborted");
                self.shared.abandon_submit(generation, &e.to_string())
            }
        }
    }

    /// Cancels the active job. Outside `Submitting` / `Polling` this is a
    /// no-op that reports the current snapshot.
    pub fn cancel(&self) -> JobSnapshot {
        let mut slot = self.shared.lock();
        if slot.cancel_active() {
            info!(generation = slot.job.generation, "Video job cancelled");
        }
        slot.job.snapshot()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.shared.lock().job.snapshot()
    }

    /// The materialized artifact, once the current job has completed.
    pub fn artifact(&self) -> Option<Artifact> {
        self.shared.lock().job.result().cloned()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies the remote submit outcome to `pending`, the record the
    /// submit was issued for.
    fn apply_submit(
        self: &Arc<Self>,
        pending: Job,
        token: CancellationToken,
        outcome: Result<JobHandle, RemoteError>,
    ) -> JobSnapshot {
        let generation = pending.generation;
        let mut invalidate = false;
        let snapshot = {
            let mut slot = self.lock();
            if !slot.is_current(generation, JobState::Submitting) {
                debug!(generation, "Discarding submit response for a cancelled job");
                if slot.job.generation == generation {
                    return slot.job.snapshot();
                }
                // Superseded: the slot now holds a newer job.
                let mut superseded = pending;
                superseded.cancel();
                return superseded.snapshot();
            }

            match outcome {
                Ok(handle) => {
                    info!(generation, handle = %handle, "Video job accepted, polling");
                    slot.job.start_polling(handle.clone());
                    tokio::spawn(run_polling(self.clone(), generation, handle, token));
                }
                Err(e) if e.is_credential_rejection() => {
                    warn!(generation, error = %e, "Video submission rejected the API key");
                    slot.fail(JobError::credential_invalid());
                    invalidate = true;
                }
                Err(e) => {
                    warn!(generation, error = %e, "Video submission failed");
                    slot.fail(JobError::new(
                        JobErrorKind::SubmissionError,
                        format!("Failed to start video generation: {e}"),
                    ));
                }
            }
            slot.job.snapshot()
        };

        if invalidate {
            self.gate.invalidate();
        }
        snapshot
    }

    /// Fails a job whose submit task died before settling.
    fn abandon_submit(&self, generation: u64, reason: &str) -> JobSnapshot {
        let mut slot = self.lock();
        if slot.is_current(generation, JobState::Submitting) {
            slot.fail(JobError::new(
                JobErrorKind::SubmissionError,
                format!("Failed to start video generation: {reason}"),
            ));
        }
        slot.job.snapshot()
    }

    fn apply_poll(&self, generation: u64, outcome: Result<PollStatus, RemoteError>) -> PollStep {
        let mut invalidate = false;
        let step = {
            let mut slot = self.lock();
            if !slot.is_current(generation, JobState::Polling) {
                debug!(generation, "Discarding stale poll response");
                return PollStep::Stop;
            }

            match outcome {
                Err(e) if e.is_credential_rejection() => {
                    warn!(generation, error = %e, "Polling rejected the API key");
                    slot.fail(JobError::credential_invalid());
                    invalidate = true;
                    PollStep::Stop
                }
                Err(e) => {
                    warn!(generation, error = %e, "Polling failed");
                    slot.fail(JobError::new(
                        JobErrorKind::PollError,
                        format!("An error occurred while polling: {e}"),
                    ));
                    PollStep::Stop
                }
                Ok(status) => {
                    slot.job.record_poll();
                    match status {
                        PollStatus { done: false, .. } => PollStep::Continue,
                        PollStatus {
                            result_ref: Some(result_ref),
                            ..
                        } => PollStep::Fetch(result_ref),
                        PollStatus { error_info, .. } => {
                            let message = match error_info {
                                Some(info) => {
                                    format!("Video generation finished without a result: {info}")
                                }
                                None => "Video generation finished, but no URI was found."
                                    .to_string(),
                            };
                            warn!(generation, "{message}");
                            slot.fail(JobError::new(JobErrorKind::MissingResult, message));
                            PollStep::Stop
                        }
                    }
                }
            }
        };

        if invalidate {
            self.gate.invalidate();
        }
        step
    }

    fn apply_fetch(&self, generation: u64, outcome: Result<Artifact, RemoteError>) {
        let mut slot = self.lock();
        if !slot.is_current(generation, JobState::Polling) {
            debug!(generation, "Discarding artifact for a cancelled job");
            return;
        }

        match outcome {
            Ok(artifact) => {
                info!(
                    generation,
                    size_bytes = artifact.bytes.len(),
                    "Video job completed"
                );
                slot.job.complete(artifact);
                slot.stop_timers();
            }
            Err(e) => {
                warn!(generation, error = %e, "Video download failed");
                slot.fail(JobError::new(
                    JobErrorKind::FetchError,
                    format!("Failed to download the generated video: {e}"),
                ));
            }
        }
    }
}

async fn run_polling(
    shared: Arc<Shared>,
    generation: u64,
    handle: JobHandle,
    token: CancellationToken,
) {
    let period = shared.config.poll_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(generation, "Poll loop stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        debug!(generation, handle = %handle, "Polling video job");
        let started = Instant::now();
        let outcome = shared.client.poll_status(&handle).await;

        match shared.apply_poll(generation, outcome) {
            PollStep::Continue => {
                // Overran the period: drop the tick that fell due meanwhile.
                if started.elapsed() >= period {
                    ticker.reset();
                }
            }
            PollStep::Stop => return,
            PollStep::Fetch(result_ref) => {
                let fetched = shared.client.fetch_artifact(&result_ref).await;
                shared.apply_fetch(generation, fetched);
                return;
            }
        }
    }
}

async fn run_progress(shared: Arc<Shared>, generation: u64, token: CancellationToken) {
    let period = shared.config.progress_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut rotation = ProgressRotation::default();

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let mut slot = shared.lock();
        if slot.job.generation != generation || !slot.job.state.is_active() {
            return;
        }
        slot.job.progress_message = Some(rotation.advance());
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
