//! Remote AI enhancement.
//!
//! A remote provider is an asynchronous job service: submit an image and a
//! prompt, get a job id back, poll the job until it reaches a terminal state,
//! then download the result. [`EnhancementProvider`] is the seam between the
//! polling logic in [`client`] and the wire protocol in [`http`]; tests swap in
//! scripted providers.

pub mod client;
pub mod http;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use client::{JobHandle, JobState, PollPolicy, RemoteClient, RemoteJob, TerminalOutcome};
pub use http::HttpProvider;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network failure, 5xx or 429; worth retrying.
    #[error("transient provider error: {0}")]
    Transient(String),
    /// The provider refused the request; retrying will not help.
    #[error("provider rejected request: {0}")]
    Rejected(String),
    #[error("unreadable provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// Everything a provider needs to start one job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub prompt: String,
    pub platform: String,
    pub image: Arc<[u8]>,
    pub mime_type: String,
}

/// Provider-reported job status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Queued,
    Starting,
    Processing,
    Succeeded { output_url: String },
    Failed { error: String },
    Canceled,
}

impl ProviderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProviderStatus::Succeeded { .. } | ProviderStatus::Failed { .. } | ProviderStatus::Canceled
        )
    }
}

/// A remote job service.
#[async_trait]
pub trait EnhancementProvider: Send + Sync {
    /// Start a job and return its id. Never assumed idempotent.
    async fn submit(&self, job: &JobSpec) -> Result<String, ProviderError>;

    async fn status(&self, job_id: &str) -> Result<ProviderStatus, ProviderError>;

    /// Download a finished result.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}
