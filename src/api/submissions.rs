//! Client-facing submission endpoints: create, poll, list.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    CreateSubmissionRequest, CreateSubmissionResponse, ListSubmissionsParams, RunStatusResponse,
    SubmissionKind, SubmissionListResponse,
};
use crate::services::SubmissionOrchestrator;

/// Submit code against the full test-case corpus.
///
/// Returns as soon as the test cases are stored; poll the submission for the verdict.
#[utoipa::path(
    post,
    path = "/api/v1/submissions",
    tag = "Submissions",
    request_body = CreateSubmissionRequest,
    responses(
        (status = 202, description = "Submission accepted and dispatched", body = CreateSubmissionResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Problem corpus or boilerplate not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_submission(
    orchestrator: web::Data<SubmissionOrchestrator>,
    body: web::Json<CreateSubmissionRequest>,
) -> AppResult<HttpResponse> {
    let response = orchestrator
        .create_submission(SubmissionKind::Submit, body.into_inner())
        .await?;
    Ok(HttpResponse::Accepted().json(response))
}

/// Run code against the sample test cases only.
#[utoipa::path(
    post,
    path = "/api/v1/runs",
    tag = "Submissions",
    request_body = CreateSubmissionRequest,
    responses(
        (status = 202, description = "Run accepted and dispatched", body = CreateSubmissionResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Problem corpus or boilerplate not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_run(
    orchestrator: web::Data<SubmissionOrchestrator>,
    body: web::Json<CreateSubmissionRequest>,
) -> AppResult<HttpResponse> {
    let response = orchestrator
        .create_submission(SubmissionKind::Run, body.into_inner())
        .await?;
    Ok(HttpResponse::Accepted().json(response))
}

/// Poll a submission.
///
/// Finalizes the submission first if every test case has reported. Returns
/// 200 while processing too; give-up policy belongs to the client, and a
/// submission stays pollable after the client stops waiting.
#[utoipa::path(
    get,
    path = "/api/v1/submissions/{submission_id}",
    tag = "Submissions",
    params(
        ("submission_id" = Uuid, Path, description = "Submission UUID")
    ),
    responses(
        (status = 200, description = "Current submission state", body = RunStatusResponse),
        (status = 400, description = "Malformed submission id", body = crate::error::ErrorResponse),
        (status = 404, description = "Submission not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_submission(
    orchestrator: web::Data<SubmissionOrchestrator>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let submission_id = Uuid::parse_str(&path.into_inner())?;
    let status = orchestrator.get_run_status(submission_id).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// List submissions, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/submissions",
    tag = "Submissions",
    params(ListSubmissionsParams),
    responses(
        (status = 200, description = "Page of submissions", body = SubmissionListResponse),
        (status = 400, description = "Invalid query", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_submissions(
    orchestrator: web::Data<SubmissionOrchestrator>,
    query: web::Query<ListSubmissionsParams>,
) -> AppResult<HttpResponse> {
    let response = orchestrator.list_submissions(&query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Configure submission routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/submissions")
            .route(web::get().to(list_submissions))
            .route(web::post().to(create_submission)),
    )
    .service(web::resource("/submissions/{submission_id}").route(web::get().to(get_submission)))
    .service(web::resource("/runs").route(web::post().to(create_run)));
}
