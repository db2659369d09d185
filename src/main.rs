//! Judge orchestrator - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use judge_orchestrator_lib::api::{self, ApiDoc};
use judge_orchestrator_lib::config::Config;
use judge_orchestrator_lib::db::DbPool;
use judge_orchestrator_lib::middleware::RequestLogger;
use judge_orchestrator_lib::services::{
    self, JudgeClient, ProblemCatalog, Storage, SubmissionOrchestrator, WebhookIngestor,
    WebhookSecret,
};

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    Config::from_env().is_ok()
}

fn exit_on_startup_error(what: &str, e: impl std::fmt::Display) -> ! {
    error!("{}: {}", what, e);
    std::process::exit(1);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL, WEBHOOK_URL and S3 credentials must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Judge Orchestrator");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = DbPool::new(&config)
        .await
        .unwrap_or_else(|e| exit_on_startup_error("Failed to initialize database", e));
    info!("Database connection established");

    if let Err(e) = pool.run_migrations().await {
        exit_on_startup_error("Failed to run migrations", e);
    }

    let storage = Storage::new(&config.storage)
        .await
        .unwrap_or_else(|e| exit_on_startup_error("Failed to initialize S3 storage", e));
    let catalog: Arc<dyn ProblemCatalog> = Arc::new(storage);

    let judge = JudgeClient::new(&config.judge, config.dispatch)
        .unwrap_or_else(|e| exit_on_startup_error("Failed to initialize judge client", e));
    info!(
        "Judge client targeting {} (callbacks to {})",
        config.judge.base_url, config.judge.webhook_url
    );

    let orchestrator =
        SubmissionOrchestrator::new(pool.clone(), catalog, judge, config.run_sample_size);
    let secret = WebhookSecret::new(config.judge.webhook_secret.clone());
    if !secret.is_required() {
        warn!("WEBHOOK_SECRET is not set; judge callbacks are not authenticated");
    }
    let ingestor = WebhookIngestor::new(orchestrator.clone(), secret);

    if config.sweep.is_enabled() {
        services::start_sweep_task(orchestrator.clone(), config.sweep);
    } else {
        info!("Stale submission sweep disabled");
    }

    let bind_address = config.bind_address();
    let is_development = config.is_development();

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!("Starting server at http://{} ({} workers)", bind_address, cpus);
        cpus
    };

    let openapi = ApiDoc::openapi();

    let server = HttpServer::new(move || {
        let cors = if is_development {
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                .max_age(3600)
        } else {
            // Same-origin only
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                .max_age(3600)
        };

        App::new()
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(orchestrator.clone()))
            .app_data(web::Data::new(ingestor.clone()))
            .app_data(api::json_config())
            .app_data(api::query_config())
            .service(web::scope("/api/v1").configure(api::configure_routes))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    });

    server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await
}
