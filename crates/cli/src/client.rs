//! Thin HTTP client for the job server's REST API.

use std::time::Duration;

use qgjob_core::job::JobPayload;
use qgjob_core::status::StatusRecord;
use reqwest::Url;
use serde::Deserialize;

/// HTTP request timeout for a single call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for calls against the job server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server base URL could not be parsed or cannot carry a path.
    #[error("Invalid server URL '{0}'")]
    InvalidUrl(String),

    /// The underlying HTTP request failed (connection refused, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server has no job with this id.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// The server answered with an unexpected non-2xx status.
    #[error("Server returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

pub struct JobClient {
    base_url: Url,
    client: reqwest::Client,
}

impl JobClient {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        let raw = base_url.as_ref();
        let base_url = Url::parse(raw).map_err(|_| ClientError::InvalidUrl(raw.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(raw.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { base_url, client })
    }

    /// Append `segments` to the base URL path, percent-encoding each one so
    /// that user input such as a job id can never change the route.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `POST /jobs`. Returns the server-assigned job id.
    pub async fn submit(&self, payload: &JobPayload) -> Result<String, ClientError> {
        let url = self.endpoint(&["jobs"])?;
        tracing::debug!(%url, "Submitting job");

        let response = self.client.post(url).json(payload).send().await?;
        let response = error_for_status(response).await?;
        let body: SubmitResponse = response.json().await?;
        Ok(body.job_id)
    }

    /// `GET /jobs/{job_id}`.
    pub async fn status(&self, job_id: &str) -> Result<StatusRecord, ClientError> {
        let url = self.endpoint(&["jobs", job_id])?;
        tracing::debug!(%url, "Fetching job status");

        let response = self.client.get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::JobNotFound(job_id.to_string()));
        }
        let response = error_for_status(response).await?;
        Ok(response.json().await?)
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::HttpStatus {
        status: status.as_u16(),
        body,
    })
}
