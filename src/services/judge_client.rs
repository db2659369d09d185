//! HTTP client for the external judge.
//!
//! A dispatch only confirms the judge accepted the job. Results arrive later
//! through the webhook. Accept failures that look transient (network errors,
//! timeouts, 429, 5xx) are retried with exponential backoff; anything else
//! fails immediately.

use std::time::Duration;

use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{DispatchSettings, JudgeSettings};
use crate::error::{AppError, AppResult};
use crate::models::{JudgeAcceptResponse, JudgeSubmissionRequest};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Calculate exponential backoff delay with jitter.
///
/// Formula: `min(base_ms * 2^(attempt-1) + jitter, max_ms)` (0-25% jitter)
pub fn calculate_backoff(attempt: u8, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exp_factor = 2u64.saturating_pow(u32::from(attempt - 1));
    let delay_ms = base_ms.saturating_mul(exp_factor);

    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter).min(max_ms))
}

/// Failure of a single accept attempt.
#[derive(Debug)]
enum AttemptError {
    Retryable(String),
    Fatal(String),
}

/// Judge0 API client.
#[derive(Clone)]
pub struct JudgeClient {
    http_client: reqwest::Client,
    submissions_url: String,
    rapidapi_host: Option<String>,
    rapidapi_key: Option<SecretString>,
    webhook_url: String,
    webhook_secret: Option<SecretString>,
    retry: DispatchSettings,
}

impl JudgeClient {
    pub fn new(settings: &JudgeSettings, retry: DispatchSettings) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build judge HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            submissions_url: format!(
                "{}/submissions?base64_encoded=false&wait=false",
                settings.base_url.trim_end_matches('/')
            ),
            rapidapi_host: settings.rapidapi_host.clone(),
            rapidapi_key: settings.rapidapi_key.clone(),
            webhook_url: settings.webhook_url.trim_end_matches('/').to_string(),
            webhook_secret: settings.webhook_secret.clone(),
            retry,
        })
    }

    /// Callback address for one result.
    pub fn callback_url(&self, result_id: Uuid) -> String {
        match self.webhook_secret {
            Some(ref secret) => format!(
                "{}/{}?secret={}",
                self.webhook_url,
                result_id,
                urlencoding::encode(secret.expose_secret())
            ),
            None => format!("{}/{}", self.webhook_url, result_id),
        }
    }

    /// Send one test case to the judge, retrying transient failures.
    ///
    /// Returns `AppError::Dispatch` once attempts are exhausted or the judge
    /// rejects the request outright.
    pub async fn dispatch(&self, request: &JudgeSubmissionRequest) -> AppResult<JudgeAcceptResponse> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt: u8 = 1;

        loop {
            match self.submit_once(request).await {
                Ok(accepted) => {
                    debug!(
                        "Judge accepted job (attempt {}, token {:?})",
                        attempt, accepted.token
                    );
                    return Ok(accepted);
                }
                Err(AttemptError::Fatal(msg)) => {
                    return Err(AppError::Dispatch(msg));
                }
                Err(AttemptError::Retryable(msg)) if attempt >= max_attempts => {
                    return Err(AppError::Dispatch(format!(
                        "{} (after {} attempts)",
                        msg, attempt
                    )));
                }
                Err(AttemptError::Retryable(msg)) => {
                    let delay = calculate_backoff(
                        attempt,
                        self.retry.backoff_base_ms,
                        self.retry.backoff_max_ms,
                    );
                    warn!(
                        "Judge dispatch attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, max_attempts, msg, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn submit_once(
        &self,
        request: &JudgeSubmissionRequest,
    ) -> Result<JudgeAcceptResponse, AttemptError> {
        let mut builder = self.http_client.post(&self.submissions_url).json(request);
        if let Some(ref host) = self.rapidapi_host {
            builder = builder.header("x-rapidapi-host", host);
        }
        if let Some(ref key) = self.rapidapi_key {
            builder = builder.header("x-rapidapi-key", key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(format!("Judge request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            // A 2xx without a readable token still means the job was accepted.
            let accepted = response.json::<JudgeAcceptResponse>().await.unwrap_or_default();
            return Ok(accepted);
        }

        let body = response.text().await.unwrap_or_default();
        let msg = format!("Judge returned {}: {}", status, truncate(&body, 200));
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(AttemptError::Retryable(msg))
        } else {
            Err(AttemptError::Fatal(msg))
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
