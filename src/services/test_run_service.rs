//! Test runs against sample and user-supplied cases
//!
//! Shares recipes, sandbox and verdict mapping with the judge but never
//! writes submission rows or touches the queue.

use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use crate::{
    constants::{MAX_SOURCE_CODE_SIZE, SNAPSHOT_CAP_BYTES},
    db::repositories::ProblemRepo,
    error::{AdmissionError, AppResult},
    judge::{CaseLimits, CaseOutcome, CaseRunner, KeywordGate, LanguageHandler, VerdictAccumulator},
    models::{CaseSource, CustomTestCase, JudgeCase, Verdict},
    utils::truncate_utf8,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestRunRequest {
    pub problem_id: i64,
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub use_samples: bool,
    #[serde(default)]
    pub custom_cases: Vec<CustomTestCase>,
}

/// Status reported for a test-run case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Judged(Verdict),
    /// Ran cleanly with nothing to compare against
    Info,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Judged(verdict) => verdict.as_str(),
            Self::Info => "info",
        }
    }

    fn of(outcome: &CaseOutcome) -> Self {
        if outcome.verdict.is_accepted() && !outcome.checked {
            Self::Info
        } else {
            Self::Judged(outcome.verdict)
        }
    }
}

impl Serialize for RunStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestRunCaseResult {
    pub source: CaseSource,
    pub status: RunStatus,
    pub time_ms: u64,
    pub memory_kb: u64,
    pub output: Option<String>,
    pub error: Option<String>,
    pub input: String,
    pub expected: Option<String>,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestRunResponse {
    pub overall_status: RunStatus,
    pub max_time_ms: u64,
    pub max_memory_kb: u64,
    pub error_message: Option<String>,
    pub results: Vec<TestRunCaseResult>,
}

pub struct TestRunService {
    problems: Arc<dyn ProblemRepo>,
    runner: CaseRunner,
}

impl TestRunService {
    pub fn new(problems: Arc<dyn ProblemRepo>, runner: CaseRunner) -> Self {
        Self { problems, runner }
    }

    pub async fn test_run(&self, request: TestRunRequest) -> AppResult<TestRunResponse> {
        let problem = self
            .problems
            .find_by_id(request.problem_id)
            .await?
            .ok_or(AdmissionError::ProblemNotFound)?;
        let handler = LanguageHandler::for_language(&request.language)?;

        if request.code.len() > MAX_SOURCE_CODE_SIZE {
            return Err(AdmissionError::SourceTooLarge(MAX_SOURCE_CODE_SIZE).into());
        }

        if let Err(violation) = KeywordGate::for_problem(&problem).check(&request.code) {
            return Ok(TestRunResponse {
                overall_status: RunStatus::Judged(Verdict::KeywordRestricted),
                max_time_ms: 0,
                max_memory_kb: 0,
                error_message: Some(violation.message()),
                results: Vec::new(),
            });
        }

        let mut cases = Vec::new();
        if request.use_samples {
            cases.extend(
                self.problems
                    .sample_cases(problem.id)
                    .await?
                    .iter()
                    .filter(|c| !c.is_hidden)
                    .map(|c| JudgeCase::from_test_case(c, CaseSource::Sample)),
            );
        }
        cases.extend(request.custom_cases.iter().map(JudgeCase::from_custom));

        let limits = CaseLimits {
            time_limit_ms: problem.time_limit(),
            memory_limit_mb: problem.memory_limit(),
        };

        let mut acc = VerdictAccumulator::new();
        let mut results = Vec::with_capacity(cases.len());
        let mut all_info = !cases.is_empty();

        for case in &cases {
            let outcome = self.runner.run(&handler, &request.code, case, limits).await;
            let status = RunStatus::of(&outcome);
            all_info &= status == RunStatus::Info;

            results.push(TestRunCaseResult {
                source: case.source,
                status,
                time_ms: outcome.time_ms,
                memory_kb: outcome.memory_kb,
                output: outcome.output.clone(),
                error: outcome.error.clone(),
                input: truncate_utf8(&case.input, SNAPSHOT_CAP_BYTES),
                expected: case
                    .expected
                    .as_deref()
                    .map(|e| truncate_utf8(e, SNAPSHOT_CAP_BYTES)),
                is_hidden: case.is_hidden,
            });

            if !acc.record(&outcome, case.score) {
                break;
            }
        }

        let overall_status = if all_info {
            RunStatus::Info
        } else {
            RunStatus::Judged(acc.status())
        };
        let (max_time_ms, max_memory_kb) = (acc.max_time_ms(), acc.max_memory_kb());
        let error_message = acc.finish().error_message;

        tracing::debug!(
            problem_id = problem.id,
            cases = results.len(),
            status = overall_status.as_str(),
            "Test run finished"
        );

        Ok(TestRunResponse {
            overall_status,
            max_time_ms,
            max_memory_kb,
            error_message,
            results,
        })
    }
}
