//! Submission domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entity::{submission, test_case_result};

use super::Pagination;

/// Aggregate status of a submission.
///
/// Moves only queued -> processing -> {accepted | wrong_answer | errored}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Stored, placeholders created, dispatch not started.
    Queued,
    /// Dispatched; waiting for judge callbacks.
    Processing,
    /// Every test case passed.
    Accepted,
    /// At least one test case failed.
    WrongAnswer,
    /// Resolved without a full set of results.
    Errored,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Accepted => "accepted",
            Self::WrongAnswer => "wrong_answer",
            Self::Errored => "errored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "accepted" => Some(Self::Accepted),
            "wrong_answer" => Some(Self::WrongAnswer),
            "errored" => Some(Self::Errored),
            _ => None,
        }
    }

    /// Whether this is a verdict (no further transitions allowed).
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Accepted | Self::WrongAnswer | Self::Errored)
    }

    /// Verdict for a fully reported submission.
    pub fn verdict(passed_count: usize, total: usize) -> Self {
        if total > 0 && passed_count == total {
            Self::Accepted
        } else {
            Self::WrongAnswer
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the submission runs the sample prefix or the whole corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Run,
    Submit,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Submit => "submit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "run" => Some(Self::Run),
            "submit" => Some(Self::Submit),
            _ => None,
        }
    }
}

/// Tri-state outcome of one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TestCaseOutcome {
    Pending,
    Passed,
    Failed,
}

impl TestCaseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Request body for creating a run or a submission.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSubmissionRequest {
    pub user_id: String,
    /// Problem identifier used to address the test-case corpus.
    pub problem_slug: String,
    /// Judge language id.
    pub language_id: i32,
    /// User code; spliced into the problem's boilerplate.
    pub code: String,
}

impl CreateSubmissionRequest {
    /// Validate the request shape. Returns a message describing the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("user_id must not be empty".to_string());
        }
        if self.problem_slug.is_empty()
            || !self
                .problem_slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!(
                "problem_slug '{}' must match [A-Za-z0-9_-]+",
                self.problem_slug
            ));
        }
        if self.language_id <= 0 {
            return Err("language_id must be a positive integer".to_string());
        }
        if self.code.trim().is_empty() {
            return Err("code must not be empty".to_string());
        }
        Ok(())
    }
}

/// Placeholder returned to the client for each dispatched test case.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TestCasePlaceholder {
    pub result_id: Uuid,
    pub position: i32,
    pub input: String,
    pub expected_output: String,
}

/// Response for a created run or submission (HTTP 202).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSubmissionResponse {
    pub submission_id: Uuid,
    pub kind: SubmissionKind,
    pub status: SubmissionStatus,
    pub test_cases: Vec<TestCasePlaceholder>,
}

/// Stored state of one test case as reported to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TestCaseResultView {
    pub result_id: Uuid,
    pub position: i32,
    pub outcome: TestCaseOutcome,
    pub judge_status_code: Option<i32>,
    pub judge_status_text: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
    pub time_seconds: Option<f64>,
    pub memory_kb: Option<i64>,
}

impl From<test_case_result::Model> for TestCaseResultView {
    fn from(m: test_case_result::Model) -> Self {
        Self {
            result_id: m.id,
            position: m.position,
            outcome: TestCaseOutcome::parse(&m.outcome).unwrap_or(TestCaseOutcome::Pending),
            judge_status_code: m.judge_status_code,
            judge_status_text: m.judge_status_text,
            stdout: m.stdout,
            stderr: m.stderr,
            compile_output: m.compile_output,
            message: m.message,
            time_seconds: m.time_seconds,
            memory_kb: m.memory_kb,
        }
    }
}

/// Polling response: aggregate status plus per-test-case detail.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunStatusResponse {
    pub submission_id: Uuid,
    pub kind: SubmissionKind,
    pub status: SubmissionStatus,
    /// Test cases that left the pending state.
    pub finished_count: usize,
    pub passed_count: usize,
    pub total: usize,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub test_cases: Vec<TestCaseResultView>,
}

impl RunStatusResponse {
    pub fn from_models(
        submission: submission::Model,
        results: Vec<test_case_result::Model>,
    ) -> Self {
        let test_cases: Vec<TestCaseResultView> =
            results.into_iter().map(TestCaseResultView::from).collect();
        let finished_count = test_cases
            .iter()
            .filter(|r| r.outcome.is_terminal())
            .count();
        let passed_count = test_cases
            .iter()
            .filter(|r| r.outcome == TestCaseOutcome::Passed)
            .count();

        Self {
            submission_id: submission.id,
            kind: SubmissionKind::parse(&submission.kind).unwrap_or(SubmissionKind::Submit),
            status: SubmissionStatus::parse(&submission.status)
                .unwrap_or(SubmissionStatus::Processing),
            finished_count,
            passed_count,
            total: test_cases.len(),
            created_at: submission.created_at,
            finalized_at: submission.finalized_at,
            test_cases,
        }
    }
}

/// Submission row without source code or results.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionSummary {
    pub submission_id: Uuid,
    pub user_id: String,
    pub problem_slug: String,
    pub language_id: i32,
    pub kind: SubmissionKind,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl From<submission::Model> for SubmissionSummary {
    fn from(m: submission::Model) -> Self {
        Self {
            submission_id: m.id,
            kind: SubmissionKind::parse(&m.kind).unwrap_or(SubmissionKind::Submit),
            status: SubmissionStatus::parse(&m.status).unwrap_or(SubmissionStatus::Processing),
            user_id: m.user_id,
            problem_slug: m.problem_slug,
            language_id: m.language_id,
            created_at: m.created_at,
            finalized_at: m.finalized_at,
        }
    }
}

/// Query parameters for listing submissions.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSubmissionsParams {
    pub user_id: Option<String>,
    pub problem_slug: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Paginated submission list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionListResponse {
    pub submissions: Vec<SubmissionSummary>,
    pub pagination: Pagination,
}
