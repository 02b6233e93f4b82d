//! judgeflow - Judge orchestrator for an online-judge platform
//!
//! Takes source submitted against a problem, runs it against the problem's
//! test cases in disposable Docker sandboxes, and records a verdict per case
//! and per submission.
//!
//! # Architecture
//!
//! - **Services**: admission of new submissions, test runs and exam sweeps
//! - **Queue**: two-priority Redis job queue between admission and judging
//! - **Judge**: language recipes, keyword gate, verdict mapping, worker pool
//! - **Sandbox**: container lifecycle and resource confinement
//! - **Repositories**: database access
//! - **Models**: domain models

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod handlers;
pub mod judge;
pub mod models;
pub mod queue;
pub mod sandbox;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
