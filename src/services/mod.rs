//! Business logic services.

pub mod judge_client;
pub mod orchestrator;
pub mod problems;
pub mod storage;
pub mod sweeper;
pub mod webhook;

pub use judge_client::JudgeClient;
pub use orchestrator::SubmissionOrchestrator;
pub use problems::{Boilerplate, ProblemCatalog, TestCase};
pub use storage::Storage;
pub use sweeper::{SweepReport, run_sweep, start_sweep_task};
pub use webhook::{WebhookIngestor, WebhookSecret};
