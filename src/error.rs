//! Custom error types and handling
//!
//! This module defines the judge's error types: admission rejections that the
//! HTTP layer maps to 4xx responses, sandbox faults that end up as `SE`
//! verdicts, and the application-wide error with its Axum response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Reasons a submission is refused before anything is persisted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("Test runs must use the test-run endpoint")]
    TestFieldsOnSubmitPath,

    #[error("A submission cannot belong to both a contest and a lab")]
    MutuallyExclusiveContestAndLab,

    #[error("Problem not found")]
    ProblemNotFound,

    #[error("Contest not found")]
    ContestNotFound,

    #[error("Contest is not published")]
    ContestNotPublished,

    #[error("Contest has not started yet")]
    ContestNotStarted,

    #[error("Contest has ended")]
    ContestEnded,

    #[error("You are not registered for this contest")]
    NotRegistered,

    #[error("You have already finished this exam")]
    ExamFinished,

    #[error("Your exam is paused; resume it before submitting")]
    ExamPaused,

    #[error("Your exam is locked")]
    ExamLocked,

    #[error("Unsupported language: {0}")]
    LanguageUnsupported(String),

    #[error("Source code exceeds {0} bytes")]
    SourceTooLarge(usize),
}

impl AdmissionError {
    /// Stable reason code for clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::TestFieldsOnSubmitPath => "test_fields_on_submit_path",
            Self::MutuallyExclusiveContestAndLab => "mutually_exclusive_contest_and_lab",
            Self::ProblemNotFound => "problem_not_found",
            Self::ContestNotFound => "contest_not_found",
            Self::ContestNotPublished => "contest_not_published",
            Self::ContestNotStarted => "contest_not_started",
            Self::ContestEnded => "contest_ended",
            Self::NotRegistered => "not_registered",
            Self::ExamFinished => "exam_finished",
            Self::ExamPaused => "exam_paused",
            Self::ExamLocked => "exam_locked",
            Self::LanguageUnsupported(_) => "language_unsupported",
            Self::SourceTooLarge(_) => "source_too_large",
        }
    }

    /// HTTP status the API layer should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TestFieldsOnSubmitPath
            | Self::MutuallyExclusiveContestAndLab
            | Self::LanguageUnsupported(_)
            | Self::SourceTooLarge(_) => StatusCode::BAD_REQUEST,
            Self::ProblemNotFound | Self::ContestNotFound => StatusCode::NOT_FOUND,
            Self::ContestNotPublished
            | Self::ContestNotStarted
            | Self::ContestEnded
            | Self::NotRegistered
            | Self::ExamFinished
            | Self::ExamPaused
            | Self::ExamLocked => StatusCode::FORBIDDEN,
        }
    }
}

/// Classification of sandbox faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxErrorKind {
    DaemonUnavailable,
    ImageMissing,
    Api,
    Cleanup,
}

impl SandboxErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DaemonUnavailable => "daemon_unavailable",
            Self::ImageMissing => "image_missing",
            Self::Api => "api",
            Self::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for SandboxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infrastructure fault raised by the sandbox driver
#[derive(Debug, Clone, thiserror::Error)]
#[error("sandbox {kind}: {message}")]
pub struct SandboxError {
    pub kind: SandboxErrorKind,
    pub message: String,
}

impl SandboxError {
    pub fn new(kind: SandboxErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    // Infrastructure errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in response
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl AppError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Admission(e) => e.code(),
            Self::Database(_) => "DATABASE_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Sandbox(_) => "SANDBOX_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Scheduler(_) => "SCHEDULER_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Admission(e) => e.status_code(),
            Self::Sandbox(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_)
            | Self::Redis(_)
            | Self::Serialization(_)
            | Self::Scheduler(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log internal errors but don't expose details to clients
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "An internal error occurred".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "A database error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code: self.error_code().to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Redis(err.to_string())
    }
}

impl From<bollard::errors::Error> for AppError {
    fn from(err: bollard::errors::Error) -> Self {
        AppError::Sandbox(crate::sandbox::classify_docker_error(&err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<tokio_cron_scheduler::JobSchedulerError> for AppError {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        AppError::Scheduler(err.to_string())
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_codes_are_distinct() {
        let all = [
            AdmissionError::ContestNotPublished,
            AdmissionError::ContestNotStarted,
            AdmissionError::ContestEnded,
            AdmissionError::NotRegistered,
            AdmissionError::ExamFinished,
            AdmissionError::ExamPaused,
            AdmissionError::ExamLocked,
            AdmissionError::LanguageUnsupported("cobol".into()),
            AdmissionError::MutuallyExclusiveContestAndLab,
        ];
        let mut codes: Vec<_> = all.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_admission_errors_map_to_4xx() {
        let err = AppError::from(AdmissionError::ExamPaused);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.error_code(), "exam_paused");

        let err = AppError::from(AdmissionError::LanguageUnsupported("cobol".into()));
        assert!(err.status_code().is_client_error());
    }

    #[test]
    fn test_missing_row_is_a_database_fault() {
        // Lookups use fetch_optional; a RowNotFound here is unexpected
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_sandbox_kind_names() {
        let names: Vec<_> = [
            SandboxErrorKind::DaemonUnavailable,
            SandboxErrorKind::ImageMissing,
            SandboxErrorKind::Api,
            SandboxErrorKind::Cleanup,
        ]
        .iter()
        .map(|k| k.as_str())
        .collect();
        assert_eq!(names, ["daemon_unavailable", "image_missing", "api", "cleanup"]);
    }
}
