//! Judge worker
//!
//! Produces the terminal state of one submission: it re-reads everything from
//! storage, runs each case in order through the sandbox and collects one result
//! row per case. The rows and the final verdict are written together, verdict
//! last, so a job delivered twice cannot leave a second set of rows behind.

use std::sync::Arc;
use std::time::Instant;

use crate::{
    constants::SNAPSHOT_CAP_BYTES,
    db::repositories::{ProblemRepo, SubmissionRepo},
    error::AppResult,
    judge::{
        keywords::KeywordGate,
        languages::LanguageHandler,
        runner::CaseRunner,
        verdict::{clamp_i32, CaseLimits, CaseOutcome, VerdictAccumulator},
    },
    models::{
        CaseSource, CustomTestCase, FinalVerdict, JudgeCase, NewSubmissionResult, Submission,
        Verdict,
    },
    utils::{format_milliseconds, truncate_utf8},
};

pub struct JudgeWorker {
    submissions: Arc<dyn SubmissionRepo>,
    problems: Arc<dyn ProblemRepo>,
    runner: CaseRunner,
}

impl JudgeWorker {
    pub fn new(
        submissions: Arc<dyn SubmissionRepo>,
        problems: Arc<dyn ProblemRepo>,
        runner: CaseRunner,
    ) -> Self {
        Self {
            submissions,
            problems,
            runner,
        }
    }

    /// Judge a submission to completion
    ///
    /// Returns the verdict written, or `None` when the submission was missing
    /// or already terminal.
    pub async fn process_submission(&self, submission_id: i64) -> AppResult<Option<Verdict>> {
        let Some(submission) = self.submissions.find_by_id(submission_id).await? else {
            tracing::warn!(submission_id, "Submission not found, dropping job");
            return Ok(None);
        };

        match submission.verdict() {
            Some(verdict) if verdict.is_terminal() => {
                tracing::debug!(submission_id, status = %submission.status, "Submission already judged");
                return Ok(None);
            }
            None => {
                tracing::warn!(submission_id, status = %submission.status, "Submission has unknown status");
                return Ok(None);
            }
            Some(_) => {}
        }

        if !self.submissions.mark_judging(submission_id).await? {
            return Ok(None);
        }

        tracing::info!(
            submission_id,
            problem_id = submission.problem_id,
            language = %submission.language,
            is_test = submission.is_test,
            "Judging submission"
        );

        let started = Instant::now();
        let (verdict, results) = self.judge(&submission).await?;

        if !self
            .submissions
            .finalize(&submission, &verdict, &results)
            .await?
        {
            tracing::warn!(submission_id, "Submission finalized concurrently, result discarded");
            return Ok(None);
        }

        tracing::info!(
            submission_id,
            status = verdict.status.as_str(),
            score = verdict.score,
            exec_time_ms = verdict.exec_time,
            memory_kb = verdict.memory_usage,
            elapsed = %format_milliseconds(started.elapsed().as_millis() as u64),
            "Submission judged"
        );

        Ok(Some(verdict.status))
    }

    /// Best-effort `SE` for a submission whose judging failed outside the case loop
    pub async fn mark_system_error(&self, submission_id: i64, message: &str) -> AppResult<bool> {
        let Some(submission) = self.submissions.find_by_id(submission_id).await? else {
            return Ok(false);
        };

        tracing::error!(submission_id, error = message, "Marking submission as system error");
        self.submissions
            .finalize(&submission, &FinalVerdict::system_error(message), &[])
            .await
    }

    /// Verdict and per-case result rows of one judging run
    async fn judge(
        &self,
        submission: &Submission,
    ) -> AppResult<(FinalVerdict, Vec<NewSubmissionResult>)> {
        let Some(problem) = self.problems.find_by_id(submission.problem_id).await? else {
            let verdict =
                FinalVerdict::system_error(format!("Problem {} not found", submission.problem_id));
            return Ok((verdict, Vec::new()));
        };

        if let Err(violation) = KeywordGate::for_problem(&problem).check(&submission.code) {
            return Ok((FinalVerdict::keyword_restricted(violation.message()), Vec::new()));
        }

        let handler = match LanguageHandler::for_language(&submission.language) {
            Ok(handler) => handler,
            Err(e) => {
                tracing::error!(submission_id = submission.id, error = %e, "Cannot judge submission");
                return Ok((FinalVerdict::system_error(e.to_string()), Vec::new()));
            }
        };

        let custom = match submission.custom_cases() {
            Ok(custom) => custom,
            Err(e) if submission.is_test => {
                tracing::error!(submission_id = submission.id, error = %e, "Malformed custom test cases");
                let verdict = FinalVerdict::system_error(format!("Malformed custom test cases: {e}"));
                return Ok((verdict, Vec::new()));
            }
            Err(_) => Vec::new(),
        };

        let cases = self.materialize_cases(submission, &custom).await?;
        let limits = CaseLimits {
            time_limit_ms: problem.time_limit(),
            memory_limit_mb: problem.memory_limit(),
        };

        let mut acc = VerdictAccumulator::new();
        let mut results = Vec::with_capacity(cases.len());
        for (index, case) in cases.iter().enumerate() {
            let outcome = self
                .runner
                .run(&handler, &submission.code, case, limits)
                .await;

            tracing::debug!(
                submission_id = submission.id,
                case = index + 1,
                verdict = outcome.verdict.as_str(),
                time_ms = outcome.time_ms,
                "Case judged"
            );

            results.push(result_row(submission.id, case, &outcome));

            if !acc.record(&outcome, case.score) {
                break;
            }
        }

        Ok((acc.finish(), results))
    }

    /// Samples plus custom cases for test submissions, every case otherwise
    async fn materialize_cases(
        &self,
        submission: &Submission,
        custom: &[CustomTestCase],
    ) -> AppResult<Vec<JudgeCase>> {
        if submission.is_test {
            let mut cases: Vec<JudgeCase> = self
                .problems
                .sample_cases(submission.problem_id)
                .await?
                .iter()
                .map(|c| JudgeCase::from_test_case(c, CaseSource::Sample))
                .collect();
            cases.extend(custom.iter().map(JudgeCase::from_custom));
            return Ok(cases);
        }

        Ok(self
            .problems
            .test_cases(submission.problem_id)
            .await?
            .iter()
            .map(|c| JudgeCase::from_test_case(c, CaseSource::Problem))
            .collect())
    }
}

fn result_row(submission_id: i64, case: &JudgeCase, outcome: &CaseOutcome) -> NewSubmissionResult {
    NewSubmissionResult {
        submission_id,
        test_case_id: case.test_case_id,
        status: outcome.verdict,
        exec_time: clamp_i32(outcome.time_ms),
        memory: clamp_i32(outcome.memory_kb),
        output: outcome.output.clone(),
        error: outcome.error.clone(),
        input_snapshot: Some(truncate_utf8(&case.input, SNAPSHOT_CAP_BYTES)),
        expected_snapshot: case
            .expected
            .as_deref()
            .map(|e| truncate_utf8(e, SNAPSHOT_CAP_BYTES)),
    }
}
