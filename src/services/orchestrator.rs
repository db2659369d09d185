//! Submission orchestration: creation, judge fan-out, and finalization.
//!
//! Finalization can be triggered from several places at once (a poll, the
//! last webhook, a failed dispatch, the sweeper). All of them go through
//! [`SubmissionOrchestrator::try_finalize`], which computes the verdict from
//! stored results and relies on `finalize_if_processing` to let exactly one
//! caller perform the transition. Losers re-read the stored verdict.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::{DbPool, NewSubmission, SubmissionFilter};
use crate::entity::test_case_result;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateSubmissionRequest, CreateSubmissionResponse, JudgeSubmissionRequest,
    ListSubmissionsParams, PageRequest, Pagination, RunStatusResponse, SubmissionKind,
    SubmissionListResponse, SubmissionStatus, SubmissionSummary, TestCaseOutcome,
    TestCasePlaceholder,
};

use super::judge_client::JudgeClient;
use super::problems::{ProblemCatalog, TestCase};

/// One test case ready to be sent to the judge.
#[derive(Debug, Clone)]
struct DispatchJob {
    result_id: Uuid,
    test_case: TestCase,
}

/// Coordinates the lifecycle of submissions.
#[derive(Clone)]
pub struct SubmissionOrchestrator {
    pool: DbPool,
    catalog: Arc<dyn ProblemCatalog>,
    judge: JudgeClient,
    run_sample_size: usize,
}

impl SubmissionOrchestrator {
    pub fn new(
        pool: DbPool,
        catalog: Arc<dyn ProblemCatalog>,
        judge: JudgeClient,
        run_sample_size: usize,
    ) -> Self {
        Self {
            pool,
            catalog,
            judge,
            run_sample_size: run_sample_size.max(1),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create a run or submission and start dispatching it.
    ///
    /// Nothing is stored when the corpus or boilerplate is missing. Dispatch
    /// happens in the background; the returned placeholders let the client
    /// poll immediately.
    pub async fn create_submission(
        &self,
        kind: SubmissionKind,
        request: CreateSubmissionRequest,
    ) -> AppResult<CreateSubmissionResponse> {
        request.validate().map_err(AppError::Validation)?;

        let mut test_cases = self.catalog.test_cases(&request.problem_slug).await?;
        if kind == SubmissionKind::Run {
            test_cases.truncate(self.run_sample_size);
        }
        if test_cases.is_empty() {
            return Err(AppError::NotFound(format!(
                "Test cases for problem '{}'",
                request.problem_slug
            )));
        }

        let boilerplate = self
            .catalog
            .boilerplate(&request.problem_slug, request.language_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Boilerplate for problem '{}' and language {}",
                    request.problem_slug, request.language_id
                ))
            })?;
        let full_source = boilerplate.splice(&request.code).ok_or_else(|| {
            AppError::NotFound(format!(
                "Usable boilerplate for problem '{}' and language {}",
                request.problem_slug, request.language_id
            ))
        })?;

        let language_id = request.language_id;
        let (submission, results) = self
            .pool
            .create_submission(
                NewSubmission {
                    user_id: request.user_id,
                    problem_slug: request.problem_slug,
                    language_id,
                    source_code: request.code,
                    kind,
                },
                test_cases.len(),
            )
            .await?;

        if !self.pool.mark_processing(submission.id).await? {
            return Err(AppError::Internal(format!(
                "Submission {} left queued before dispatch",
                submission.id
            )));
        }

        info!(
            "Created {} {} for problem '{}' with {} test case(s)",
            kind.as_str(),
            submission.id,
            submission.problem_slug,
            results.len()
        );

        let jobs: Vec<DispatchJob> = results
            .iter()
            .zip(test_cases)
            .map(|(result, test_case)| DispatchJob {
                result_id: result.id,
                test_case,
            })
            .collect();

        let placeholders = jobs
            .iter()
            .zip(&results)
            .map(|(job, result)| TestCasePlaceholder {
                result_id: job.result_id,
                position: result.position,
                input: job.test_case.input.clone(),
                expected_output: job.test_case.output.clone(),
            })
            .collect();

        let orchestrator = self.clone();
        let submission_id = submission.id;
        tokio::spawn(async move {
            orchestrator
                .dispatch_all(submission_id, language_id, full_source, jobs)
                .await;
        });

        Ok(CreateSubmissionResponse {
            submission_id,
            kind,
            status: SubmissionStatus::Processing,
            test_cases: placeholders,
        })
    }

    /// Dispatch every test case concurrently.
    async fn dispatch_all(
        &self,
        submission_id: Uuid,
        language_id: i32,
        source_code: String,
        jobs: Vec<DispatchJob>,
    ) {
        let total = jobs.len();
        let dispatches = jobs
            .into_iter()
            .map(|job| self.dispatch_one(submission_id, language_id, &source_code, job));
        let accepted = join_all(dispatches).await.into_iter().filter(|ok| *ok).count();

        if accepted == total {
            debug!("Dispatched {}/{} test cases for {}", accepted, total, submission_id);
        } else {
            warn!(
                "Dispatched {}/{} test cases for {}; the rest were marked failed",
                accepted, total, submission_id
            );
        }
    }

    /// Send one test case. Returns whether the judge accepted it.
    async fn dispatch_one(
        &self,
        submission_id: Uuid,
        language_id: i32,
        source_code: &str,
        job: DispatchJob,
    ) -> bool {
        let request = JudgeSubmissionRequest {
            source_code: source_code.to_string(),
            language_id,
            stdin: job.test_case.input,
            expected_output: job.test_case.output,
            callback_url: self.judge.callback_url(job.result_id),
        };

        match self.judge.dispatch(&request).await {
            Ok(accepted) => {
                if let Some(token) = accepted.token
                    && let Err(e) = self.pool.record_judge_token(job.result_id, &token).await
                {
                    warn!("Failed to record judge token for {}: {}", job.result_id, e);
                }
                true
            }
            Err(e) => {
                error!(
                    "Dispatch of result {} (submission {}) failed: {}",
                    job.result_id, submission_id, e
                );
                match self
                    .pool
                    .mark_dispatch_failed(job.result_id, &e.to_string())
                    .await
                {
                    Ok(true) => {
                        if let Err(e) = self.try_finalize(submission_id).await {
                            error!("Finalize after dispatch failure of {}: {}", submission_id, e);
                        }
                    }
                    Ok(false) => {
                        debug!("Result {} already resolved; dispatch failure ignored", job.result_id)
                    }
                    Err(e) => error!("Failed to mark result {} failed: {}", job.result_id, e),
                }
                false
            }
        }
    }

    /// Finalize the submission if every result has reported, then return its state.
    ///
    /// Safe to call any number of times from any number of tasks.
    pub async fn try_finalize(&self, submission_id: Uuid) -> AppResult<RunStatusResponse> {
        let (submission, results) = self.load(submission_id).await?;

        if submission.status != SubmissionStatus::Processing.as_str() || has_pending(&results) {
            return Ok(RunStatusResponse::from_models(submission, results));
        }

        let passed = results
            .iter()
            .filter(|r| r.outcome == TestCaseOutcome::Passed.as_str())
            .count();
        let verdict = SubmissionStatus::verdict(passed, results.len());

        if self.pool.finalize_if_processing(submission_id, verdict).await? {
            info!(
                "Submission {} finalized as {} ({}/{} passed)",
                submission_id,
                verdict,
                passed,
                results.len()
            );
        } else {
            debug!("Submission {} was finalized concurrently", submission_id);
        }

        let (submission, results) = self.load(submission_id).await?;
        Ok(RunStatusResponse::from_models(submission, results))
    }

    /// Polling entry point: opportunistic finalize, then current state.
    pub async fn get_run_status(&self, submission_id: Uuid) -> AppResult<RunStatusResponse> {
        self.try_finalize(submission_id).await
    }

    /// Resolve a submission that has been unfinalized for too long.
    ///
    /// Fully reported submissions get their normal verdict; the rest are
    /// finalized as errored. A submission left queued (its create never
    /// reached processing) is moved to processing first and then resolved
    /// the same way. Returns the resulting status.
    pub async fn expire(&self, submission_id: Uuid) -> AppResult<SubmissionStatus> {
        let (submission, _) = self.load(submission_id).await?;
        if submission.status == SubmissionStatus::Queued.as_str()
            && self.pool.mark_processing(submission_id).await?
        {
            warn!("Submission {} was left queued; resolving it", submission_id);
        }

        let status = self.try_finalize(submission_id).await?.status;
        if status != SubmissionStatus::Processing {
            return Ok(status);
        }

        if self
            .pool
            .finalize_if_processing(submission_id, SubmissionStatus::Errored)
            .await?
        {
            warn!(
                "Submission {} expired with missing judge results",
                submission_id
            );
            return Ok(SubmissionStatus::Errored);
        }

        let (submission, _) = self.load(submission_id).await?;
        Ok(SubmissionStatus::parse(&submission.status).unwrap_or(SubmissionStatus::Errored))
    }

    /// List submissions newest first.
    pub async fn list_submissions(
        &self,
        params: &ListSubmissionsParams,
    ) -> AppResult<SubmissionListResponse> {
        let page = PageRequest::new(params.page, params.limit);
        let (submissions, total) = self
            .pool
            .list_submissions(&SubmissionFilter::from(params), page)
            .await?;

        Ok(SubmissionListResponse {
            submissions: submissions.into_iter().map(SubmissionSummary::from).collect(),
            pagination: Pagination::new(page.page, page.limit, total),
        })
    }

    async fn load(
        &self,
        submission_id: Uuid,
    ) -> AppResult<(crate::entity::submission::Model, Vec<test_case_result::Model>)> {
        self.pool
            .get_submission_with_results(submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {}", submission_id)))
    }
}

fn has_pending(results: &[test_case_result::Model]) -> bool {
    results
        .iter()
        .any(|r| r.outcome == TestCaseOutcome::Pending.as_str())
}
