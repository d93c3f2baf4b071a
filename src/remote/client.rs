//! Submit/poll state machine for one remote job.
//!
//! ```text
//! SUBMITTED ──▶ POLLING ──▶ SUCCEEDED
//!                  │  ├───▶ FAILED
//!                  │  └───▶ TIMED_OUT
//!                  └─(sleep interval, check status)─┐
//!                  ▲────────────────────────────────┘
//! ```
//!
//! Every provider call (submission or status check) consumes one attempt from
//! a single ceiling, and every call after the first is preceded by one poll
//! interval. A job therefore reaches a terminal state within
//! `max_attempts × interval` of virtual time, plus provider latency, and
//! [`RemoteClient::enhance`] puts a hard wall-clock cap on top of that.
//!
//! Transient errors are retried inside the ceiling. A failed submission is
//! retried as a brand new job; the client never assumes submission is
//! idempotent. The client never switches providers.

use super::{EnhancementProvider, JobSpec, ProviderStatus};
use crate::config::RemoteConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Timing limits for one remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub task_timeout: Duration,
}

impl From<&RemoteConfig> for PollPolicy {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_poll_attempts,
            task_timeout: Duration::from_secs(config.task_timeout_secs),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&RemoteConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

/// Book-keeping for one submitted job. Owned by exactly one task.
#[derive(Debug, Clone)]
pub struct RemoteJob {
    pub job_id: String,
    pub state: JobState,
    /// Provider calls spent so far, submissions included.
    pub attempts: u32,
    pub created_at: Instant,
}

/// A submitted job together with the provider that owns it.
pub struct JobHandle {
    pub job: RemoteJob,
    pub platform: String,
    provider: Arc<dyn EnhancementProvider>,
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("job", &self.job)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

/// How a remote job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOutcome {
    Succeeded(Vec<u8>),
    Failed(String),
    TimedOut,
}

impl TerminalOutcome {
    /// Short reason used when the caller falls back to local processing.
    pub fn reason(&self) -> String {
        match self {
            TerminalOutcome::Succeeded(_) => "succeeded".to_string(),
            TerminalOutcome::Failed(error) => error.clone(),
            TerminalOutcome::TimedOut => "timed out".to_string(),
        }
    }
}

/// Drives remote jobs to a terminal state under a [`PollPolicy`].
#[derive(Debug, Clone)]
pub struct RemoteClient {
    policy: PollPolicy,
}

impl RemoteClient {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Submit a job, retrying transient failures with fresh submissions.
    ///
    /// `Err` carries the terminal outcome when submission itself ended the job.
    pub async fn submit(
        &self,
        job: &JobSpec,
        provider: Arc<dyn EnhancementProvider>,
    ) -> Result<JobHandle, TerminalOutcome> {
        let mut attempts = 0;
        loop {
            if attempts > 0 {
                tokio::time::sleep(self.policy.interval).await;
            }
            attempts += 1;

            match provider.submit(job).await {
                Ok(job_id) => {
                    tracing::debug!(platform = %job.platform, %job_id, attempts, "remote job submitted");
                    return Ok(JobHandle {
                        job: RemoteJob {
                            job_id,
                            state: JobState::Submitted,
                            attempts,
                            created_at: Instant::now(),
                        },
                        platform: job.platform.clone(),
                        provider,
                    });
                }
                Err(e) if e.is_transient() && attempts < self.policy.max_attempts => {
                    tracing::warn!(platform = %job.platform, attempts, error = %e, "submission failed, retrying as a new job");
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(platform = %job.platform, attempts, error = %e, "submission attempts exhausted");
                    return Err(TerminalOutcome::TimedOut);
                }
                Err(e) => return Err(TerminalOutcome::Failed(e.to_string())),
            }
        }
    }

    /// Poll a submitted job until it succeeds, fails or runs out of attempts.
    pub async fn poll(&self, handle: &mut JobHandle) -> TerminalOutcome {
        handle.job.state = JobState::Polling;

        while handle.job.attempts < self.policy.max_attempts {
            tokio::time::sleep(self.policy.interval).await;
            handle.job.attempts += 1;
            let attempt = handle.job.attempts;

            let outcome = match handle.provider.status(&handle.job.job_id).await {
                Ok(ProviderStatus::Succeeded { output_url }) => {
                    match handle.provider.fetch(&output_url).await {
                        Ok(bytes) => TerminalOutcome::Succeeded(bytes),
                        Err(e) => TerminalOutcome::Failed(format!("result download failed: {e}")),
                    }
                }
                Ok(ProviderStatus::Failed { error }) => TerminalOutcome::Failed(error),
                Ok(ProviderStatus::Canceled) => {
                    TerminalOutcome::Failed("job canceled by provider".to_string())
                }
                Ok(status) => {
                    tracing::debug!(platform = %handle.platform, job_id = %handle.job.job_id, attempt, ?status, "job still running");
                    continue;
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!(platform = %handle.platform, job_id = %handle.job.job_id, attempt, error = %e, "status check failed, will retry");
                    continue;
                }
                Err(e) => TerminalOutcome::Failed(e.to_string()),
            };

            handle.job.state = match outcome {
                TerminalOutcome::Succeeded(_) => JobState::Succeeded,
                _ => JobState::Failed,
            };
            tracing::debug!(
                platform = %handle.platform,
                job_id = %handle.job.job_id,
                attempts = attempt,
                state = ?handle.job.state,
                "remote job finished"
            );
            return outcome;
        }

        handle.job.state = JobState::TimedOut;
        tracing::warn!(
            platform = %handle.platform,
            job_id = %handle.job.job_id,
            attempts = handle.job.attempts,
            "remote job hit the poll ceiling"
        );
        TerminalOutcome::TimedOut
    }

    /// Submit and poll under the overall task timeout.
    pub async fn enhance(
        &self,
        job: &JobSpec,
        provider: Arc<dyn EnhancementProvider>,
    ) -> TerminalOutcome {
        let run = async {
            match self.submit(job, provider).await {
                Ok(mut handle) => self.poll(&mut handle).await,
                Err(outcome) => outcome,
            }
        };
        match tokio::time::timeout(self.policy.task_timeout, run).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    platform = %job.platform,
                    timeout_secs = self.policy.task_timeout.as_secs(),
                    "remote task timed out"
                );
                TerminalOutcome::TimedOut
            }
        }
    }
}
