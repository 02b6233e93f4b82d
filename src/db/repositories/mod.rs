//! Database repositories
//!
//! Repositories handle all direct database interactions. The judge and the
//! admission controller talk to storage only through the traits below, so
//! every query a component issues is visible in one place.

pub mod contest_repo;
pub mod problem_repo;
pub mod submission_repo;
pub mod user_stats_repo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        Contest, ContestParticipant, FinalVerdict, NewSubmission, NewSubmissionResult, Problem,
        Submission, SubmissionResult, TestCase,
    },
};

pub use contest_repo::ContestRepository;
pub use problem_repo::ProblemRepository;
pub use submission_repo::SubmissionRepository;
pub use user_stats_repo::UserStatsRepository;

/// Submission storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionRepo: Send + Sync {
    /// Insert a submission row as given
    async fn create(&self, submission: &NewSubmission) -> AppResult<Submission>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Submission>>;

    /// Move a pending submission to `judging`; false if it is already terminal
    async fn mark_judging(&self, id: i64) -> AppResult<bool>;

    /// Results of a submission in the order they were written
    async fn results_for(&self, submission_id: i64) -> AppResult<Vec<SubmissionResult>>;

    /// Replace the submission's results with `results`, in order, then write
    /// the terminal state and, for non-test submissions, bump problem counters
    /// and refresh user statistics, all in one transaction.
    ///
    /// Returns false, writing nothing, when the submission was already
    /// terminal. Of two workers judging the same submission only the first
    /// to finalize leaves rows behind.
    async fn finalize(
        &self,
        submission: &Submission,
        verdict: &FinalVerdict,
        results: &[NewSubmissionResult],
    ) -> AppResult<bool>;
}

/// Problem and test case storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProblemRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Problem>>;

    /// All test cases of a problem in declared order
    async fn test_cases(&self, problem_id: i64) -> AppResult<Vec<TestCase>>;

    /// Visible sample cases of a problem in declared order
    async fn sample_cases(&self, problem_id: i64) -> AppResult<Vec<TestCase>>;
}

/// Contest and participant storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContestRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Contest>>;

    /// Check if the user belongs to the contest's admin set
    async fn is_contest_admin(&self, contest_id: i64, user_id: i64) -> AppResult<bool>;

    async fn find_participant(
        &self,
        contest_id: i64,
        user_id: i64,
    ) -> AppResult<Option<ContestParticipant>>;

    /// Participants of ended exam-mode contests still holding an open exam
    async fn participants_to_auto_submit(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ContestParticipant>>;

    /// Close an open exam; false if the participant was not open anymore
    async fn submit_participant(
        &self,
        contest_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Locked participants of running contests whose lock predates `locked_before`
    async fn participants_to_unlock(
        &self,
        now: DateTime<Utc>,
        locked_before: DateTime<Utc>,
    ) -> AppResult<Vec<ContestParticipant>>;

    /// Return a locked participant to `in_progress`; false if not locked anymore
    async fn unlock_participant(&self, contest_id: i64, user_id: i64) -> AppResult<bool>;
}
