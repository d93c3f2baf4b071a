//! JSON-over-HTTP job provider.
//!
//! | Call | Request | Response |
//! |---|---|---|
//! | submit | `POST {base}/jobs` `{prompt, platform, image_base64, mime_type}` | `{id}` |
//! | status | `GET {base}/jobs/{id}` | `{status, output_url?, error?}` |
//! | fetch | `GET {output_url}` | raw bytes |
//!
//! Every request carries `Authorization: Bearer <key>`. Network errors, 5xx
//! and 429 map to [`ProviderError::Transient`]; any other non-success status
//! maps to [`ProviderError::Rejected`].

use super::{EnhancementProvider, JobSpec, ProviderError, ProviderStatus};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("omnishot/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct SubmitRequest<'a> {
    prompt: &'a str,
    platform: &'a str,
    image_base64: String,
    mime_type: &'a str,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum WireStatus {
    Queued,
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: WireStatus,
    #[serde(default)]
    output_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl StatusResponse {
    fn into_status(self) -> Result<ProviderStatus, ProviderError> {
        Ok(match self.status {
            WireStatus::Queued => ProviderStatus::Queued,
            WireStatus::Starting => ProviderStatus::Starting,
            WireStatus::Processing => ProviderStatus::Processing,
            WireStatus::Succeeded => ProviderStatus::Succeeded {
                output_url: self.output_url.ok_or_else(|| {
                    ProviderError::Decode("succeeded job has no output_url".to_string())
                })?,
            },
            WireStatus::Failed => ProviderStatus::Failed {
                error: self
                    .error
                    .unwrap_or_else(|| "provider reported failure".to_string()),
            },
            WireStatus::Canceled => ProviderStatus::Canceled,
        })
    }
}

/// Classify a non-success HTTP status.
fn status_error(status: StatusCode, body: &str) -> ProviderError {
    let message = format!("HTTP {}: {}", status.as_u16(), body.trim());
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ProviderError::Transient(message)
    } else {
        ProviderError::Rejected(message)
    }
}

fn network_error(e: reqwest::Error) -> ProviderError {
    ProviderError::Transient(e.to_string())
}

/// One configured HTTP job service.
pub struct HttpProvider {
    id: String,
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(
        id: impl Into<String>,
        base_url: &str,
        api_key: String,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::Rejected(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            id: id.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http_client,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn jobs_url(&self) -> String {
        format!("{}/jobs", self.base_url)
    }

    fn job_url(&self, job_id: &str) -> String {
        format!("{}/jobs/{}", self.base_url, job_id)
    }

    async fn checked(&self, response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

#[async_trait]
impl EnhancementProvider for HttpProvider {
    async fn submit(&self, job: &JobSpec) -> Result<String, ProviderError> {
        let body = SubmitRequest {
            prompt: &job.prompt,
            platform: &job.platform,
            image_base64: BASE64.encode(&*job.image),
            mime_type: &job.mime_type,
        };

        tracing::debug!(provider = %self.id, platform = %job.platform, "submitting job");
        let response = self
            .http_client
            .post(self.jobs_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let parsed: SubmitResponse = self
            .checked(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(parsed.id)
    }

    async fn status(&self, job_id: &str) -> Result<ProviderStatus, ProviderError> {
        let response = self
            .http_client
            .get(self.job_url(job_id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(network_error)?;

        let parsed: StatusResponse = self
            .checked(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        parsed.into_status()
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(network_error)?;

        let bytes = self
            .checked(response)
            .await?
            .bytes()
            .await
            .map_err(network_error)?;
        Ok(bytes.to_vec())
    }
}
