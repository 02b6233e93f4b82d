//! Submission admission
//!
//! Validates a submit request against the problem, the contest window and the
//! caller's exam state, persists the row and hands it to the judge queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    constants::MAX_SOURCE_CODE_SIZE,
    db::repositories::{ContestRepo, ProblemRepo, SubmissionRepo},
    error::{AdmissionError, AppError, AppResult},
    judge::{KeywordGate, LanguageHandler},
    models::{
        Caller, CustomTestCase, ExamStatus, NewSubmission, Problem, SourceType, Submission,
        Verdict,
    },
    queue::{JobQueue, JudgeJob, QueuePriority},
    utils::now_utc,
};

/// Submit request as received from the HTTP layer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionRequest {
    pub problem_id: i64,
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub contest_id: Option<i64>,
    #[serde(default)]
    pub lab_id: Option<i64>,
    /// Only valid on the test-run path
    #[serde(default)]
    pub is_test: bool,
    #[serde(default)]
    pub custom_test_cases: Option<Vec<CustomTestCase>>,
}

pub struct SubmissionService {
    submissions: Arc<dyn SubmissionRepo>,
    problems: Arc<dyn ProblemRepo>,
    contests: Arc<dyn ContestRepo>,
    queue: Arc<dyn JobQueue>,
}

impl SubmissionService {
    pub fn new(
        submissions: Arc<dyn SubmissionRepo>,
        problems: Arc<dyn ProblemRepo>,
        contests: Arc<dyn ContestRepo>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            submissions,
            problems,
            contests,
            queue,
        }
    }

    /// Admit, persist and enqueue a submission
    ///
    /// A keyword violation is not a rejection: the row is stored as `KR` and
    /// returned without being queued.
    pub async fn create_submission(
        &self,
        caller: Caller,
        request: SubmissionRequest,
    ) -> AppResult<Submission> {
        let problem = match self.admit(&caller, &request, now_utc()).await {
            Ok(problem) => problem,
            Err(e) => {
                if let AppError::Admission(reason) = &e {
                    tracing::info!(
                        user_id = caller.user_id,
                        problem_id = request.problem_id,
                        contest_id = ?request.contest_id,
                        reason = reason.code(),
                        "Submission rejected"
                    );
                }
                return Err(e);
            }
        };

        let source_type = SourceType::for_contest(request.contest_id);
        let violation = KeywordGate::for_problem(&problem).check(&request.code).err();

        let new = NewSubmission {
            user_id: caller.user_id,
            problem_id: problem.id,
            contest_id: request.contest_id,
            lab_id: request.lab_id,
            source_type,
            language: request.language.trim().to_string(),
            code: request.code,
            is_test: false,
            custom_test_cases: None,
            status: if violation.is_some() {
                Verdict::KeywordRestricted
            } else {
                Verdict::Pending
            },
            score: 0,
            error_message: violation.as_ref().map(|v| v.message()),
        };

        let submission = self.submissions.create(&new).await?;

        if let Some(violation) = violation {
            tracing::info!(
                submission_id = submission.id,
                problem_id = problem.id,
                reason = %violation,
                "Submission keyword restricted"
            );
            return Ok(submission);
        }

        let priority = QueuePriority::for_source(source_type);
        self.queue
            .enqueue(
                JudgeJob {
                    submission_id: submission.id,
                },
                priority,
            )
            .await?;

        tracing::info!(
            submission_id = submission.id,
            problem_id = problem.id,
            queue = priority.queue_name(),
            "Submission queued"
        );

        Ok(submission)
    }

    /// Run every admission check in order; returns the target problem
    async fn admit(
        &self,
        caller: &Caller,
        request: &SubmissionRequest,
        now: DateTime<Utc>,
    ) -> AppResult<Problem> {
        let problem = self
            .problems
            .find_by_id(request.problem_id)
            .await?
            .ok_or(AdmissionError::ProblemNotFound)?;

        if request.is_test || request.custom_test_cases.is_some() {
            return Err(AdmissionError::TestFieldsOnSubmitPath.into());
        }

        if request.contest_id.is_some() && request.lab_id.is_some() {
            return Err(AdmissionError::MutuallyExclusiveContestAndLab.into());
        }

        if let Some(contest_id) = request.contest_id {
            self.check_contest(caller, contest_id, now).await?;
        }

        LanguageHandler::for_language(&request.language)?;

        if request.code.len() > MAX_SOURCE_CODE_SIZE {
            return Err(AdmissionError::SourceTooLarge(MAX_SOURCE_CODE_SIZE).into());
        }

        Ok(problem)
    }

    async fn check_contest(
        &self,
        caller: &Caller,
        contest_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let contest = self
            .contests
            .find_by_id(contest_id)
            .await?
            .ok_or(AdmissionError::ContestNotFound)?;

        let privileged = caller.is_staff()
            || contest.owner_id == caller.user_id
            || self
                .contests
                .is_contest_admin(contest_id, caller.user_id)
                .await?;

        if privileged {
            return Ok(());
        }

        if !contest.is_published() {
            return Err(AdmissionError::ContestNotPublished.into());
        }
        if contest.is_before_start(now) {
            return Err(AdmissionError::ContestNotStarted.into());
        }
        if contest.is_after_end(now) {
            return Err(AdmissionError::ContestEnded.into());
        }

        let participant = self
            .contests
            .find_participant(contest_id, caller.user_id)
            .await?
            .ok_or(AdmissionError::NotRegistered)?;

        match participant.exam_status() {
            ExamStatus::Submitted => Err(AdmissionError::ExamFinished.into()),
            ExamStatus::Paused => Err(AdmissionError::ExamPaused.into()),
            ExamStatus::Locked => Err(AdmissionError::ExamLocked.into()),
            ExamStatus::NotStarted | ExamStatus::InProgress => Ok(()),
        }
    }
}
