//! Health probe of the worker process

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::{db::connection::check_connection, state::AppState};

/// Health check response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub docker: &'static str,
    pub database: &'static str,
}

impl HealthResponse {
    pub fn from_checks(docker_up: bool, database_up: bool) -> Self {
        let label = |up: bool| if up { "up" } else { "down" };
        Self {
            status: if docker_up && database_up {
                "healthy"
            } else {
                "unhealthy"
            },
            version: env!("CARGO_PKG_VERSION"),
            docker: label(docker_up),
            database: label(database_up),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let docker_up = match state.sandbox().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Docker health check failed: {}", e);
            false
        }
    };

    let database_up = match check_connection(state.db()).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            false
        }
    };

    let response = HealthResponse::from_checks(docker_up, database_up);
    let code = if response.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(response))
}

/// Health routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_up_is_healthy() {
        let response = HealthResponse::from_checks(true, true);
        assert!(response.is_healthy());
        assert_eq!(response.docker, "up");
        assert_eq!(response.database, "up");
    }

    #[test]
    fn test_any_down_is_unhealthy() {
        let response = HealthResponse::from_checks(false, true);
        assert_eq!(response.status, "unhealthy");
        assert_eq!(response.docker, "down");

        let json = serde_json::to_value(HealthResponse::from_checks(true, false)).unwrap();
        assert_eq!(json["database"], "down");
        assert_eq!(json["status"], "unhealthy");
    }
}
