//! Orchestration test suite.
//!
//! Runs the full submission lifecycle against an in-memory SQLite store and
//! a wiremock judge. No external services required.
//!
//! Run with: cargo test --test orchestration


mod test_api;
mod test_finalize;
mod test_sweeper;
mod test_webhooks;
