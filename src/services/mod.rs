//! Business logic services

pub mod exam_service;
pub mod submission_service;
pub mod test_run_service;

pub use exam_service::{ExamService, SweepStats};
pub use submission_service::{SubmissionRequest, SubmissionService};
pub use test_run_service::{TestRunRequest, TestRunResponse, TestRunService};
