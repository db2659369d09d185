//! Judge callback endpoint.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{JudgeCallback, WebhookAck};
use crate::services::WebhookIngestor;

/// Query string the judge echoes back from the callback URL.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WebhookQuery {
    /// Shared secret, required when the server has one configured
    pub secret: Option<String>,
}

/// Receive a judge completion event for one test case.
///
/// Duplicate and late callbacks are acknowledged with 200 and have no effect.
#[utoipa::path(
    put,
    path = "/api/v1/webhooks/judge/{result_id}",
    tag = "Webhooks",
    params(
        ("result_id" = Uuid, Path, description = "Test case result UUID"),
        WebhookQuery
    ),
    request_body = JudgeCallback,
    responses(
        (status = 200, description = "Callback processed", body = WebhookAck),
        (status = 400, description = "Malformed callback or result id", body = crate::error::ErrorResponse),
        (status = 401, description = "Webhook secret missing or invalid", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown result id", body = crate::error::ErrorResponse),
    )
)]
pub async fn judge_callback(
    ingestor: web::Data<WebhookIngestor>,
    path: web::Path<String>,
    query: web::Query<WebhookQuery>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    ingestor.authorize(query.secret.as_deref())?;

    let result_id = Uuid::parse_str(&path.into_inner())?;
    if body.is_empty() {
        return Err(AppError::Validation("Empty callback body".to_string()));
    }
    let callback: JudgeCallback = serde_json::from_slice(&body)?;

    let ack = ingestor.ingest(result_id, callback).await?;
    Ok(HttpResponse::Ok().json(ack))
}

/// Configure webhook routes. Judge0 uses PUT; POST is accepted as well.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/webhooks/judge/{result_id}")
            .route(web::put().to(judge_callback))
            .route(web::post().to(judge_callback)),
    );
}
