//! API endpoint modules.

pub mod health;
pub mod openapi;
pub mod submissions;
pub mod webhook;

pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use submissions::configure_routes as configure_submission_routes;
pub use webhook::configure_routes as configure_webhook_routes;

use actix_web::web;

use crate::error::AppError;

/// Register every `/api/v1` route. Mount inside `web::scope("/api/v1")`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_submission_routes)
        .configure(configure_webhook_routes);
}

/// JSON extractor config rendering body errors as validation errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(err.to_string()).into()
    })
}

/// Query extractor config rendering query errors as validation errors.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::Validation(err.to_string()).into()
    })
}
