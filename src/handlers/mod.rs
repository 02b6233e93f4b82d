//! HTTP request handlers
//!
//! The worker process only serves its health probe.

pub mod health;

use axum::Router;

use crate::state::AppState;

/// Create all routes
pub fn routes() -> Router<AppState> {
    Router::new().merge(health::routes())
}
