//! Judge orchestrator library.
//!
//! Submission orchestration for a competitive-programming judge: stores
//! submissions and per-test-case results, dispatches test cases to a
//! Judge0-compatible engine, ingests its callbacks and computes verdicts.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
