//! Domain models for the submission orchestrator.

use utoipa::ToSchema;

pub mod judge;
pub mod submission;

// Re-export commonly used types
pub use judge::{
    JudgeAcceptResponse, JudgeCallback, JudgeCallbackStatus, JudgeSubmissionRequest, WebhookAck,
};
pub use submission::{
    CreateSubmissionRequest, CreateSubmissionResponse, ListSubmissionsParams, RunStatusResponse,
    SubmissionKind, SubmissionListResponse, SubmissionStatus, SubmissionSummary,
    TestCaseOutcome, TestCasePlaceholder, TestCaseResultView,
};

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// Page/limit pair with the server's clamping rules applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(default_page()).max(1),
            limit: limit.unwrap_or(default_limit()).clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries.
    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.limit as u64
    }
}

/// Pagination metadata for responses.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    /// Create pagination metadata.
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(limit.max(1) as u64) as u32
        };

        Pagination {
            page,
            limit,
            total,
            total_pages,
        }
    }
}
