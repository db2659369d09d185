//! Database queries for per-test-case results.
//!
//! Every mutation here is one conditional UPDATE. Terminal writes are guarded
//! on the outcome the writer observed and on the owning submission still
//! processing, so a late callback can never touch a finalized submission.

use chrono::Utc;
use sea_orm::sea_query::{Expr, SelectStatement};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect, QueryTrait};
use uuid::Uuid;

use crate::entity::submission::{self, Entity as Submission};
use crate::entity::test_case_result::{self, Entity as TestCaseResult};
use crate::error::{AppError, AppResult};
use crate::models::{JudgeCallback, SubmissionStatus, TestCaseOutcome};

use super::DbPool;

/// Status text stored when the judge never accepted a test case.
pub const DISPATCH_FAILED: &str = "dispatch failed";

/// Normalized judge report for one test case.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultUpdate {
    pub outcome: TestCaseOutcome,
    pub status_code: i32,
    pub status_text: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
    pub time_seconds: Option<f64>,
    pub memory_kb: Option<i64>,
    pub token: Option<String>,
}

impl From<JudgeCallback> for ResultUpdate {
    fn from(callback: JudgeCallback) -> Self {
        Self {
            outcome: callback.outcome(),
            status_code: callback.status.id,
            status_text: callback.status_text(),
            stdout: callback.stdout,
            stderr: callback.stderr,
            compile_output: callback.compile_output,
            message: callback.message,
            time_seconds: callback.time,
            memory_kb: callback.memory,
            token: callback.token,
        }
    }
}

/// Why an update was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The owning submission is not processing (usually: already finalized).
    SubmissionNotProcessing,
    /// A non-terminal status arrived after a terminal one.
    AlreadyTerminal,
    /// Concurrent callbacks for the same result kept winning the write.
    Superseded,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmissionNotProcessing => "submission_not_processing",
            Self::AlreadyTerminal => "already_terminal",
            Self::Superseded => "superseded",
        }
    }
}

/// What `apply_result` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Pending result moved to a terminal outcome.
    Applied { submission_id: Uuid },
    /// Same terminal outcome delivered again; descriptive fields refreshed.
    Duplicate { submission_id: Uuid },
    /// A different terminal outcome replaced the stored one.
    Replaced {
        submission_id: Uuid,
        previous: TestCaseOutcome,
    },
    /// Non-terminal status recorded on a pending result.
    Progress { submission_id: Uuid },
    /// Nothing written.
    Ignored {
        submission_id: Uuid,
        reason: IgnoreReason,
    },
}

impl ApplyOutcome {
    pub fn submission_id(&self) -> Uuid {
        match *self {
            Self::Applied { submission_id }
            | Self::Duplicate { submission_id }
            | Self::Replaced { submission_id, .. }
            | Self::Progress { submission_id }
            | Self::Ignored { submission_id, .. } => submission_id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Duplicate { .. } => "duplicate",
            Self::Replaced { .. } => "replaced",
            Self::Progress { .. } => "progress",
            Self::Ignored { .. } => "ignored",
        }
    }

    /// Whether the stored result is terminal after this update.
    pub fn wrote_terminal(&self) -> bool {
        matches!(
            self,
            Self::Applied { .. } | Self::Duplicate { .. } | Self::Replaced { .. }
        )
    }
}

/// Compare-and-swap rounds before a contended terminal write gives up.
const MAX_WRITE_ROUNDS: usize = 8;

/// `SELECT id FROM submissions WHERE id = ? AND status = 'processing'`
fn processing_submission(submission_id: Uuid) -> SelectStatement {
    Submission::find()
        .select_only()
        .column(submission::Column::Id)
        .filter(submission::Column::Id.eq(submission_id))
        .filter(submission::Column::Status.eq(SubmissionStatus::Processing.as_str()))
        .into_query()
}

impl DbPool {
    /// Get a single result by ID.
    pub async fn get_result(&self, id: Uuid) -> AppResult<Option<test_case_result::Model>> {
        let result = TestCaseResult::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get result: {}", e)))?;

        Ok(result)
    }

    /// Apply a judge report to a result.
    ///
    /// While the owning submission is processing the judge is authoritative:
    /// a terminal report moves a pending result to its outcome, and a later
    /// terminal report replaces the stored one (last write wins). Each write is
    /// a compare-and-swap on the outcome it observed, so concurrent deliveries
    /// for one result serialize. Once the submission is finalized every report
    /// is ignored.
    pub async fn apply_result(&self, id: Uuid, update: &ResultUpdate) -> AppResult<ApplyOutcome> {
        let current = self
            .get_result(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test case result {}", id)))?;
        let submission_id = current.submission_id;

        if !update.outcome.is_terminal() {
            let rows = self.write_progress(id, submission_id, update).await?;
            if rows == 1 {
                return Ok(ApplyOutcome::Progress { submission_id });
            }
            let reason = if self.submission_processing(submission_id).await? {
                IgnoreReason::AlreadyTerminal
            } else {
                IgnoreReason::SubmissionNotProcessing
            };
            return Ok(ApplyOutcome::Ignored {
                submission_id,
                reason,
            });
        }

        let mut observed =
            TestCaseOutcome::parse(&current.outcome).unwrap_or(TestCaseOutcome::Pending);
        for _ in 0..MAX_WRITE_ROUNDS {
            let rows = self
                .write_result(id, submission_id, update, observed)
                .await?;
            if rows == 1 {
                return Ok(match observed {
                    TestCaseOutcome::Pending => ApplyOutcome::Applied { submission_id },
                    stored if stored == update.outcome => {
                        ApplyOutcome::Duplicate { submission_id }
                    }
                    previous => ApplyOutcome::Replaced {
                        submission_id,
                        previous,
                    },
                });
            }

            if !self.submission_processing(submission_id).await? {
                return Ok(ApplyOutcome::Ignored {
                    submission_id,
                    reason: IgnoreReason::SubmissionNotProcessing,
                });
            }

            // Another callback changed the outcome in between; retry against it
            observed = self
                .get_result(id)
                .await?
                .and_then(|r| TestCaseOutcome::parse(&r.outcome))
                .unwrap_or(TestCaseOutcome::Pending);
        }

        Ok(ApplyOutcome::Ignored {
            submission_id,
            reason: IgnoreReason::Superseded,
        })
    }

    /// Conditional write of a report onto a result whose stored outcome is `expected`.
    async fn write_result(
        &self,
        id: Uuid,
        submission_id: Uuid,
        update: &ResultUpdate,
        expected: TestCaseOutcome,
    ) -> AppResult<u64> {
        let mut query = TestCaseResult::update_many().col_expr(
            test_case_result::Column::Outcome,
            Expr::value(update.outcome.as_str()),
        );
        if let Some(ref token) = update.token {
            query = query.col_expr(
                test_case_result::Column::JudgeToken,
                Expr::value(token.clone()),
            );
        }

        let result = query
            .col_expr(
                test_case_result::Column::JudgeStatusCode,
                Expr::value(Some(update.status_code)),
            )
            .col_expr(
                test_case_result::Column::JudgeStatusText,
                Expr::value(Some(update.status_text.clone())),
            )
            .col_expr(
                test_case_result::Column::Stdout,
                Expr::value(update.stdout.clone()),
            )
            .col_expr(
                test_case_result::Column::Stderr,
                Expr::value(update.stderr.clone()),
            )
            .col_expr(
                test_case_result::Column::CompileOutput,
                Expr::value(update.compile_output.clone()),
            )
            .col_expr(
                test_case_result::Column::Message,
                Expr::value(update.message.clone()),
            )
            .col_expr(
                test_case_result::Column::TimeSeconds,
                Expr::value(update.time_seconds),
            )
            .col_expr(
                test_case_result::Column::MemoryKb,
                Expr::value(update.memory_kb),
            )
            .col_expr(test_case_result::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(test_case_result::Column::Id.eq(id))
            .filter(test_case_result::Column::Outcome.eq(expected.as_str()))
            .filter(
                test_case_result::Column::SubmissionId
                    .in_subquery(processing_submission(submission_id)),
            )
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to apply result: {}", e)))?;

        Ok(result.rows_affected)
    }

    /// Record a non-terminal judge status on a pending result.
    async fn write_progress(
        &self,
        id: Uuid,
        submission_id: Uuid,
        update: &ResultUpdate,
    ) -> AppResult<u64> {
        let mut query = TestCaseResult::update_many();
        if let Some(ref token) = update.token {
            query = query.col_expr(
                test_case_result::Column::JudgeToken,
                Expr::value(token.clone()),
            );
        }

        let result = query
            .col_expr(
                test_case_result::Column::JudgeStatusCode,
                Expr::value(Some(update.status_code)),
            )
            .col_expr(
                test_case_result::Column::JudgeStatusText,
                Expr::value(Some(update.status_text.clone())),
            )
            .col_expr(test_case_result::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(test_case_result::Column::Id.eq(id))
            .filter(test_case_result::Column::Outcome.eq(TestCaseOutcome::Pending.as_str()))
            .filter(
                test_case_result::Column::SubmissionId
                    .in_subquery(processing_submission(submission_id)),
            )
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to record progress: {}", e)))?;

        Ok(result.rows_affected)
    }

    async fn submission_processing(&self, submission_id: Uuid) -> AppResult<bool> {
        Ok(self
            .get_submission(submission_id)
            .await?
            .is_some_and(|s| s.status == SubmissionStatus::Processing.as_str()))
    }

    /// Store the token the judge returned when accepting a test case.
    ///
    /// Does not overwrite a token already delivered by a callback.
    pub async fn record_judge_token(&self, id: Uuid, token: &str) -> AppResult<bool> {
        let result = TestCaseResult::update_many()
            .col_expr(
                test_case_result::Column::JudgeToken,
                Expr::value(Some(token.to_string())),
            )
            .filter(test_case_result::Column::Id.eq(id))
            .filter(test_case_result::Column::JudgeToken.is_null())
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to record judge token: {}", e)))?;

        Ok(result.rows_affected == 1)
    }

    /// Degrade a pending result to failed after dispatch gave up.
    ///
    /// Returns false if the result already left pending or its submission
    /// is no longer processing.
    pub async fn mark_dispatch_failed(&self, id: Uuid, reason: &str) -> AppResult<bool> {
        let Some(current) = self.get_result(id).await? else {
            return Err(AppError::NotFound(format!("Test case result {}", id)));
        };

        let result = TestCaseResult::update_many()
            .col_expr(
                test_case_result::Column::Outcome,
                Expr::value(TestCaseOutcome::Failed.as_str()),
            )
            .col_expr(
                test_case_result::Column::JudgeStatusText,
                Expr::value(Some(DISPATCH_FAILED.to_string())),
            )
            .col_expr(
                test_case_result::Column::Message,
                Expr::value(Some(reason.to_string())),
            )
            .col_expr(test_case_result::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(test_case_result::Column::Id.eq(id))
            .filter(test_case_result::Column::Outcome.eq(TestCaseOutcome::Pending.as_str()))
            .filter(
                test_case_result::Column::SubmissionId
                    .in_subquery(processing_submission(current.submission_id)),
            )
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark dispatch failed: {}", e)))?;

        Ok(result.rows_affected == 1)
    }
}
