//! HTTP oracle adapter.
//!
//! Submits a complete assignment to an evaluation endpoint and returns the
//! raw result for interpretation. The endpoint wraps whatever actually
//! scores the assignment (in the original deployment, a browser-driven
//! exam session); from the engine's point of view it is just a slow,
//! occasionally flaky HTTP service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::domain::models::Assignment;
use crate::domain::ports::{Oracle, OracleError, RawEvaluation};

#[derive(Debug, Serialize)]
struct EvaluateRequest<'a> {
    answers: &'a [u8],
}

#[derive(Debug, Deserialize)]
struct EvaluateResponse {
    status: String,
    raw_score: Option<String>,
}

/// Oracle adapter speaking JSON over HTTP.
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOracle {
    /// Create an adapter for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| OracleError::Fatal(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Map an HTTP status code to the oracle error taxonomy.
    ///
    /// - 429: rate limited (retryable)
    /// - 408, 5xx: transient (retryable)
    /// - remaining 4xx: fatal (the session is gone or the request is wrong)
    fn error_from_status(status: StatusCode, body: String) -> OracleError {
        match status.as_u16() {
            429 => OracleError::RateLimited,
            408 => OracleError::Timeout,
            500..=599 => OracleError::Transient(format!("HTTP {status}: {body}")),
            _ => OracleError::Fatal(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn evaluate(&self, assignment: &Assignment) -> Result<RawEvaluation, OracleError> {
        let request = EvaluateRequest {
            answers: assignment.options(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    OracleError::Timeout
                } else {
                    OracleError::Transient(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::error_from_status(status, body));
        }

        let parsed: EvaluateResponse = response
            .json()
            .await
            .map_err(|err| OracleError::Transient(format!("malformed response body: {err}")))?;

        Ok(RawEvaluation {
            status: parsed.status,
            raw_score: parsed.raw_score,
        })
    }
}
