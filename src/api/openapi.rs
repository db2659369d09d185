//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Judge Orchestrator",
        version = "0.1.0",
        description = "Submission orchestration for a competitive-programming judge: dispatches test cases to a Judge0-compatible engine, ingests its callbacks and computes verdicts"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Submission endpoints
        api::submissions::create_submission,
        api::submissions::create_run,
        api::submissions::get_submission,
        api::submissions::list_submissions,
        // Webhook endpoints
        api::webhook::judge_callback,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            models::Pagination,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Submissions
            models::SubmissionStatus,
            models::SubmissionKind,
            models::TestCaseOutcome,
            models::CreateSubmissionRequest,
            models::CreateSubmissionResponse,
            models::TestCasePlaceholder,
            models::TestCaseResultView,
            models::RunStatusResponse,
            models::SubmissionSummary,
            models::SubmissionListResponse,
            // Webhooks
            models::JudgeCallback,
            models::JudgeCallbackStatus,
            models::WebhookAck,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Submissions", description = "Create and poll runs and submissions"),
        (name = "Webhooks", description = "Judge completion callbacks")
    )
)]
pub struct ApiDoc;
