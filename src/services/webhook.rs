//! Judge callback ingestion.
//!
//! Callbacks arrive in any order, possibly more than once, possibly after the
//! submission was finalized. Each one becomes a conditional write via
//! `DbPool::apply_result`; the finalization check runs after every write that
//! left the result terminal.

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{ApplyOutcome, DbPool, ResultUpdate};
use crate::error::{AppError, AppResult};
use crate::models::{JudgeCallback, SubmissionStatus, WebhookAck};

use super::orchestrator::SubmissionOrchestrator;

/// Shared secret the judge must echo back in the callback URL.
///
/// `Debug` never prints the value.
#[derive(Clone)]
pub struct WebhookSecret(Option<SecretString>);

impl WebhookSecret {
    pub fn new(secret: Option<SecretString>) -> Self {
        Self(secret)
    }

    /// Whether a secret is configured at all.
    pub fn is_required(&self) -> bool {
        self.0.is_some()
    }

    /// Constant-time comparison against the configured secret.
    ///
    /// With no secret configured every request passes.
    pub fn verify(&self, provided: Option<&str>) -> bool {
        match (&self.0, provided) {
            (None, _) => true,
            (Some(secret), Some(provided)) => secret
                .expose_secret()
                .as_bytes()
                .ct_eq(provided.as_bytes())
                .into(),
            (Some(_), None) => false,
        }
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(_) => write!(f, "WebhookSecret([REDACTED])"),
            None => write!(f, "WebhookSecret(None)"),
        }
    }
}

/// Applies judge callbacks to the result store.
#[derive(Clone)]
pub struct WebhookIngestor {
    pool: DbPool,
    orchestrator: SubmissionOrchestrator,
    secret: WebhookSecret,
}

impl WebhookIngestor {
    pub fn new(orchestrator: SubmissionOrchestrator, secret: WebhookSecret) -> Self {
        Self {
            pool: orchestrator.pool().clone(),
            orchestrator,
            secret,
        }
    }

    /// Reject callbacks that do not carry the configured secret.
    pub fn authorize(&self, provided: Option<&str>) -> AppResult<()> {
        if self.secret.verify(provided) {
            Ok(())
        } else {
            Err(AppError::Unauthorized(
                "Webhook secret missing or invalid".to_string(),
            ))
        }
    }

    /// Apply one callback.
    ///
    /// Callbacks for a finalized submission are acknowledged without effect so
    /// the judge does not keep retrying them.
    pub async fn ingest(&self, result_id: Uuid, callback: JudgeCallback) -> AppResult<WebhookAck> {
        callback.validate().map_err(AppError::Validation)?;

        let update = ResultUpdate::from(callback);
        let applied = self.pool.apply_result(result_id, &update).await?;
        let submission_id = applied.submission_id();

        match applied {
            ApplyOutcome::Applied { .. } => info!(
                "Result {} of submission {} is {} ({})",
                result_id,
                submission_id,
                update.outcome.as_str(),
                update.status_text
            ),
            ApplyOutcome::Duplicate { .. } => {
                debug!("Duplicate callback for result {}", result_id)
            }
            ApplyOutcome::Replaced { previous, .. } => warn!(
                "Result {} of submission {} changed from {} to {} ({})",
                result_id,
                submission_id,
                previous.as_str(),
                update.outcome.as_str(),
                update.status_text
            ),
            ApplyOutcome::Progress { .. } => debug!(
                "Result {} still running: {}",
                result_id, update.status_text
            ),
            ApplyOutcome::Ignored { reason, .. } => warn!(
                "Ignored callback for result {} of submission {}: {}",
                result_id,
                submission_id,
                reason.as_str()
            ),
        }

        let status = if applied.wrote_terminal() {
            self.orchestrator.try_finalize(submission_id).await?.status
        } else {
            let submission = self.pool.get_submission(submission_id).await?.ok_or_else(|| {
                AppError::NotFound(format!("Submission {}", submission_id))
            })?;
            SubmissionStatus::parse(&submission.status).ok_or_else(|| {
                AppError::Internal(format!(
                    "Submission {} has unknown status '{}'",
                    submission_id, submission.status
                ))
            })?
        };

        Ok(WebhookAck {
            result_id,
            disposition: applied.as_str().to_string(),
            submission_status: status,
        })
    }
}
