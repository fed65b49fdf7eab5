//! HTTP answer advisor adapter.
//!
//! Posts a question with its options to an advisory endpoint (typically a
//! local LLM wrapper) and reads back a single option index. Advisors are
//! best-effort: any failure is reported as unavailability and the vote is
//! simply dropped by the panel.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::AdvisorConfig;
use crate::domain::ports::{AnswerAdvisor, QuestionPrompt};

#[derive(Debug, Serialize)]
struct AdviseRequest<'a> {
    question: &'a str,
    options: &'a [String],
}

#[derive(Debug, Deserialize)]
struct AdviseResponse {
    choice: u8,
}

/// Advisor speaking JSON over HTTP.
pub struct HttpAdvisor {
    client: reqwest::Client,
    name: String,
    endpoint: String,
    weight: f64,
}

impl HttpAdvisor {
    /// Create an advisor from its configuration entry.
    pub fn new(config: &AdvisorConfig, timeout: Duration) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                DomainError::AdvisorUnavailable(format!(
                    "failed to build HTTP client for {}: {err}",
                    config.name
                ))
            })?;

        Ok(Self {
            client,
            name: config.name.clone(),
            endpoint: config.endpoint.clone(),
            weight: config.weight,
        })
    }
}

#[async_trait]
impl AnswerAdvisor for HttpAdvisor {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    async fn advise(&self, prompt: &QuestionPrompt) -> DomainResult<u8> {
        let request = AdviseRequest {
            question: &prompt.text,
            options: &prompt.options,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| DomainError::AdvisorUnavailable(format!("{}: {err}", self.name)))?;

        if !response.status().is_success() {
            return Err(DomainError::AdvisorUnavailable(format!(
                "{}: HTTP {}",
                self.name,
                response.status()
            )));
        }

        let parsed: AdviseResponse = response.json().await.map_err(|err| {
            DomainError::AdvisorUnavailable(format!("{}: malformed response: {err}", self.name))
        })?;

        let num_options = prompt.options.len() as u8;
        if parsed.choice == 0 || parsed.choice > num_options {
            return Err(DomainError::AdvisorUnavailable(format!(
                "{}: vote {} outside 1..={num_options}",
                self.name, parsed.choice
            )));
        }

        Ok(parsed.choice)
    }
}
