//! Application state management
//!
//! Shared handles of the worker process, passed to the health probe via
//! Axum's State extractor.

use std::sync::Arc;

use sqlx::PgPool;

use crate::sandbox::DockerSandbox;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    db: PgPool,
    sandbox: Arc<DockerSandbox>,
}

impl AppState {
    pub fn new(db: PgPool, sandbox: Arc<DockerSandbox>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { db, sandbox }),
        }
    }

    /// Get a reference to the database pool
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Docker-backed sandbox shared by all workers
    pub fn sandbox(&self) -> Arc<DockerSandbox> {
        self.inner.sandbox.clone()
    }
}
