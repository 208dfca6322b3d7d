//! Single-attempt delivery of a batch to the collection endpoint.

use crate::assembler::Batch;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Success,
    Error,
}

/// Terminal result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub status: SubmissionStatus,
    pub message: String,
}

impl SubmissionOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: SubmissionStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SubmissionStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SubmissionStatus::Success
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerReply {
    message: Option<String>,
}

/// Posts a batch as a JSON array and classifies the reply.
///
/// - no response: `network error: <cause>`
/// - non-2xx: `Server Error (<code>): <body message or reason phrase>`
/// - 2xx: the body message, or the reason phrase when there is none
///
/// There are no retries; callers re-run the whole pipeline instead.
#[derive(Debug, Clone)]
pub struct SubmissionClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl SubmissionClient {
    pub fn new(endpoint: Url, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn submit(&self, batch: &Batch) -> SubmissionOutcome {
        tracing::debug!(endpoint = %self.endpoint, samples = batch.len(), "submitting batch");

        let response = match self
            .http
            .post(self.endpoint.clone())
            .json(batch)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let cause = anyhow::Error::from(e);
                tracing::warn!("submission failed before a response: {:#}", cause);
                return SubmissionOutcome::error(format!("network error: {:#}", cause));
            }
        };

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("Unknown Status");
        let message = match response.text().await {
            Ok(body) => serde_json::from_str::<ServerReply>(&body)
                .ok()
                .and_then(|reply| reply.message),
            Err(e) => {
                tracing::debug!("failed to read response body: {}", e);
                None
            }
        };

        if status.is_success() {
            let outcome = SubmissionOutcome::success(message.as_deref().unwrap_or(reason));
            tracing::info!(status = status.as_u16(), reply = %outcome.message, "batch accepted");
            outcome
        } else {
            let outcome = SubmissionOutcome::error(format!(
                "Server Error ({}): {}",
                status.as_u16(),
                message.as_deref().unwrap_or(reason)
            ));
            tracing::warn!(status = status.as_u16(), reply = %outcome.message, "batch rejected");
            outcome
        }
    }
}
