//! Database queries for submissions.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::submission::{self, Entity as Submission};
use crate::entity::test_case_result::{self, Entity as TestCaseResult};
use crate::error::{AppError, AppResult};
use crate::models::{
    ListSubmissionsParams, PageRequest, SubmissionKind, SubmissionStatus, TestCaseOutcome,
};

use super::DbPool;

/// Fields needed to store a new submission.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub user_id: String,
    pub problem_slug: String,
    pub language_id: i32,
    pub source_code: String,
    pub kind: SubmissionKind,
}

/// Filters for listing submissions.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub user_id: Option<String>,
    pub problem_slug: Option<String>,
    pub status: Option<SubmissionStatus>,
}

impl From<&ListSubmissionsParams> for SubmissionFilter {
    fn from(params: &ListSubmissionsParams) -> Self {
        Self {
            user_id: params.user_id.clone(),
            problem_slug: params.problem_slug.clone(),
            status: params.status,
        }
    }
}

impl DbPool {
    /// Insert a queued submission together with one pending result per test case.
    ///
    /// Runs in a single transaction: a submission is never visible with a
    /// partial placeholder set.
    pub async fn create_submission(
        &self,
        new: NewSubmission,
        test_case_count: usize,
    ) -> AppResult<(submission::Model, Vec<test_case_result::Model>)> {
        let now = Utc::now();
        let submission_id = Uuid::now_v7();

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let submission = submission::ActiveModel {
            id: Set(submission_id),
            user_id: Set(new.user_id),
            problem_slug: Set(new.problem_slug),
            language_id: Set(new.language_id),
            source_code: Set(new.source_code),
            kind: Set(new.kind.as_str().to_string()),
            status: Set(SubmissionStatus::Queued.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            finalized_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert submission: {}", e)))?;

        let mut results = Vec::with_capacity(test_case_count);
        for position in 0..test_case_count {
            let position = i32::try_from(position)
                .map_err(|_| AppError::Validation("Too many test cases".to_string()))?;
            let result = Self::pending_result(submission_id, position, now)
                .insert(&txn)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to insert pending result: {}", e))
                })?;
            results.push(result);
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit submission: {}", e)))?;

        Ok((submission, results))
    }

    fn pending_result(
        submission_id: Uuid,
        position: i32,
        now: DateTime<Utc>,
    ) -> test_case_result::ActiveModel {
        test_case_result::ActiveModel {
            id: Set(Uuid::now_v7()),
            submission_id: Set(submission_id),
            position: Set(position),
            outcome: Set(TestCaseOutcome::Pending.as_str().to_string()),
            judge_status_code: Set(None),
            judge_status_text: Set(None),
            judge_token: Set(None),
            stdout: Set(None),
            stderr: Set(None),
            compile_output: Set(None),
            message: Set(None),
            time_seconds: Set(None),
            memory_kb: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    /// Move a submission from queued to processing.
    ///
    /// Returns false if the submission was not queued.
    pub async fn mark_processing(&self, id: Uuid) -> AppResult<bool> {
        let result = Submission::update_many()
            .col_expr(
                submission::Column::Status,
                Expr::value(SubmissionStatus::Processing.as_str()),
            )
            .col_expr(submission::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(submission::Column::Id.eq(id))
            .filter(submission::Column::Status.eq(SubmissionStatus::Queued.as_str()))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark processing: {}", e)))?;

        Ok(result.rows_affected == 1)
    }

    /// Atomically move a processing submission to a final status.
    ///
    /// A single `UPDATE ... WHERE status = 'processing'`. Returns true only for
    /// the caller that performed the transition; every other caller gets false
    /// and should read the stored verdict.
    pub async fn finalize_if_processing(
        &self,
        id: Uuid,
        final_status: SubmissionStatus,
    ) -> AppResult<bool> {
        if !final_status.is_final() {
            return Err(AppError::Internal(format!(
                "Cannot finalize submission {} to non-final status {}",
                id, final_status
            )));
        }

        let now = Utc::now();
        let result = Submission::update_many()
            .col_expr(submission::Column::Status, Expr::value(final_status.as_str()))
            .col_expr(submission::Column::FinalizedAt, Expr::value(Some(now)))
            .col_expr(submission::Column::UpdatedAt, Expr::value(now))
            .filter(submission::Column::Id.eq(id))
            .filter(submission::Column::Status.eq(SubmissionStatus::Processing.as_str()))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to finalize submission: {}", e)))?;

        Ok(result.rows_affected == 1)
    }

    /// Get a submission by ID.
    pub async fn get_submission(&self, id: Uuid) -> AppResult<Option<submission::Model>> {
        let result = Submission::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get submission: {}", e)))?;

        Ok(result)
    }

    /// Get a submission and all of its results, ordered by position.
    pub async fn get_submission_with_results(
        &self,
        id: Uuid,
    ) -> AppResult<Option<(submission::Model, Vec<test_case_result::Model>)>> {
        let Some(submission) = self.get_submission(id).await? else {
            return Ok(None);
        };
        let results = self.get_results_for_submission(id).await?;

        Ok(Some((submission, results)))
    }

    /// Get all results of a submission, ordered by position.
    pub async fn get_results_for_submission(
        &self,
        submission_id: Uuid,
    ) -> AppResult<Vec<test_case_result::Model>> {
        let results = TestCaseResult::find()
            .filter(test_case_result::Column::SubmissionId.eq(submission_id))
            .order_by_asc(test_case_result::Column::Position)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get results: {}", e)))?;

        Ok(results)
    }

    /// List submissions, newest first. Returns the page and the total count.
    pub async fn list_submissions(
        &self,
        filter: &SubmissionFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<submission::Model>, u64)> {
        let mut query = Submission::find();

        if let Some(ref user_id) = filter.user_id {
            query = query.filter(submission::Column::UserId.eq(user_id.as_str()));
        }
        if let Some(ref slug) = filter.problem_slug {
            query = query.filter(submission::Column::ProblemSlug.eq(slug.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(submission::Column::Status.eq(status.as_str()));
        }

        let total = query
            .clone()
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count submissions: {}", e)))?;

        let submissions = query
            .order_by_desc(submission::Column::CreatedAt)
            .order_by_desc(submission::Column::Id)
            .offset(page.offset())
            .limit(u64::from(page.limit))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list submissions: {}", e)))?;

        Ok((submissions, total))
    }

    /// Unfinalized submissions created before `cutoff`, oldest first.
    ///
    /// Includes queued rows whose create committed but never reached processing.
    pub async fn find_stale_unfinished(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<submission::Model>> {
        let result = Submission::find()
            .filter(submission::Column::Status.is_in([
                SubmissionStatus::Queued.as_str(),
                SubmissionStatus::Processing.as_str(),
            ]))
            .filter(submission::Column::CreatedAt.lt(cutoff))
            .order_by_asc(submission::Column::CreatedAt)
            .limit(limit)
            .all(self.connection())
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to find stale submissions: {}", e))
            })?;

        Ok(result)
    }
}
