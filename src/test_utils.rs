//! In-memory fakes for orchestrator tests
//!
//! `MemoryStore` implements every repository trait over plain collections and
//! mirrors the guarded updates of the PostgreSQL repositories, so the judge and
//! the admission controller can be driven end to end without a database.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{
    db::repositories::{ContestRepo, ProblemRepo, SubmissionRepo},
    error::{AppResult, SandboxError},
    models::{
        Contest, ContestParticipant, ContestStatus, ExamStatus, FinalVerdict, NewSubmission,
        NewSubmissionResult, Problem, Submission, SubmissionResult, TestCase, Verdict,
    },
    queue::{JobQueue, JudgeJob, QueuePriority},
    sandbox::{ExecRequest, ExecResult, Sandbox},
    utils::now_utc,
};

#[derive(Default)]
struct StoreState {
    problems: HashMap<i64, Problem>,
    test_cases: Vec<TestCase>,
    contests: HashMap<i64, Contest>,
    contest_admins: Vec<(i64, i64)>,
    participants: Vec<ContestParticipant>,
    submissions: BTreeMap<i64, Submission>,
    results: Vec<SubmissionResult>,
    next_id: i64,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn push_result(&mut self, result: &NewSubmissionResult) {
        let row = SubmissionResult {
            id: self.next_id(),
            submission_id: result.submission_id,
            test_case_id: result.test_case_id,
            status: result.status.as_str().to_string(),
            exec_time: result.exec_time,
            memory: result.memory,
            output: result.output.clone(),
            error: result.error.clone(),
            input_snapshot: result.input_snapshot.clone(),
            expected_snapshot: result.expected_snapshot.clone(),
            created_at: now_utc(),
        };
        self.results.push(row);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_problem(&self, problem: Problem) {
        self.state.lock().unwrap().problems.insert(problem.id, problem);
    }

    /// Add a test case; its id is assigned by the store
    pub fn insert_test_case(&self, mut case: TestCase) -> i64 {
        let mut state = self.state.lock().unwrap();
        case.id = state.next_id();
        let id = case.id;
        state.test_cases.push(case);
        id
    }

    pub fn delete_test_case(&self, id: i64) {
        let mut state = self.state.lock().unwrap();
        state.test_cases.retain(|c| c.id != id);
        for result in state.results.iter_mut().filter(|r| r.test_case_id == Some(id)) {
            result.test_case_id = None;
        }
    }

    pub fn insert_contest(&self, contest: Contest) {
        self.state.lock().unwrap().contests.insert(contest.id, contest);
    }

    pub fn add_contest_admin(&self, contest_id: i64, user_id: i64) {
        self.state.lock().unwrap().contest_admins.push((contest_id, user_id));
    }

    pub fn add_participant(&self, participant: ContestParticipant) {
        self.state.lock().unwrap().participants.push(participant);
    }

    pub fn problem(&self, id: i64) -> Problem {
        self.state.lock().unwrap().problems[&id].clone()
    }

    pub fn submission(&self, id: i64) -> Submission {
        self.state.lock().unwrap().submissions[&id].clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().unwrap().submissions.len()
    }

    pub fn results(&self, submission_id: i64) -> Vec<SubmissionResult> {
        self.state
            .lock()
            .unwrap()
            .results
            .iter()
            .filter(|r| r.submission_id == submission_id)
            .cloned()
            .collect()
    }

    pub fn participant(&self, contest_id: i64, user_id: i64) -> ContestParticipant {
        self.state
            .lock()
            .unwrap()
            .participants
            .iter()
            .find(|p| p.contest_id == contest_id && p.user_id == user_id)
            .cloned()
            .unwrap()
    }

    /// Write a result row directly, as a crashed judging run might have
    pub fn insert_result(&self, result: &NewSubmissionResult) {
        self.state.lock().unwrap().push_result(result);
    }

    /// Overwrite a stored submission status, bypassing the guards
    pub fn force_status(&self, id: i64, status: Verdict) {
        if let Some(s) = self.state.lock().unwrap().submissions.get_mut(&id) {
            s.status = status.as_str().to_string();
        }
    }
}

#[async_trait]
impl SubmissionRepo for MemoryStore {
    async fn create(&self, new: &NewSubmission) -> AppResult<Submission> {
        let mut state = self.state.lock().unwrap();
        let now = now_utc();
        let submission = Submission {
            id: state.next_id(),
            user_id: new.user_id,
            problem_id: new.problem_id,
            contest_id: new.contest_id,
            lab_id: new.lab_id,
            source_type: new.source_type.as_str().to_string(),
            language: new.language.clone(),
            code: new.code.clone(),
            is_test: new.is_test,
            custom_test_cases: new.custom_test_cases.clone(),
            status: new.status.as_str().to_string(),
            score: new.score,
            exec_time: None,
            memory_usage: None,
            error_message: new.error_message.clone(),
            created_at: now,
            updated_at: now,
        };
        state.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Submission>> {
        Ok(self.state.lock().unwrap().submissions.get(&id).cloned())
    }

    async fn mark_judging(&self, id: i64) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state.submissions.get_mut(&id) {
            Some(s) if s.status == "pending" || s.status == "judging" => {
                s.status = Verdict::Judging.as_str().to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn results_for(&self, submission_id: i64) -> AppResult<Vec<SubmissionResult>> {
        Ok(self.results(submission_id))
    }

    async fn finalize(
        &self,
        submission: &Submission,
        verdict: &FinalVerdict,
        results: &[NewSubmissionResult],
    ) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state.submissions.get(&submission.id) {
            Some(s) if s.status == "pending" || s.status == "judging" => {}
            _ => return Ok(false),
        }

        state.results.retain(|r| r.submission_id != submission.id);
        for result in results {
            state.push_result(result);
        }

        let Some(stored) = state.submissions.get_mut(&submission.id) else {
            return Ok(false);
        };
        stored.status = verdict.status.as_str().to_string();
        stored.score = verdict.score;
        stored.exec_time = Some(verdict.exec_time);
        stored.memory_usage = Some(verdict.memory_usage);
        stored.error_message = verdict.error_message.clone();
        stored.updated_at = now_utc();

        if !submission.is_test && verdict.status.counts_towards_problem() {
            if let Some(problem) = state.problems.get_mut(&submission.problem_id) {
                problem.submission_count += 1;
                match verdict.status {
                    Verdict::Accepted => problem.accepted_count += 1,
                    Verdict::WrongAnswer => problem.wa_count += 1,
                    Verdict::TimeLimitExceeded => problem.tle_count += 1,
                    Verdict::MemoryLimitExceeded => problem.mle_count += 1,
                    Verdict::RuntimeError => problem.re_count += 1,
                    Verdict::CompileError => problem.ce_count += 1,
                    _ => {}
                }
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl ProblemRepo for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Problem>> {
        Ok(self.state.lock().unwrap().problems.get(&id).cloned())
    }

    async fn test_cases(&self, problem_id: i64) -> AppResult<Vec<TestCase>> {
        let state = self.state.lock().unwrap();
        let mut cases: Vec<TestCase> = state
            .test_cases
            .iter()
            .filter(|c| c.problem_id == problem_id)
            .cloned()
            .collect();
        cases.sort_by_key(|c| (c.order_index, c.id));
        Ok(cases)
    }

    async fn sample_cases(&self, problem_id: i64) -> AppResult<Vec<TestCase>> {
        let cases = ProblemRepo::test_cases(self, problem_id).await?;
        Ok(cases
            .into_iter()
            .filter(|c| c.is_sample && !c.is_hidden)
            .collect())
    }
}

#[async_trait]
impl ContestRepo for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Contest>> {
        Ok(self.state.lock().unwrap().contests.get(&id).cloned())
    }

    async fn is_contest_admin(&self, contest_id: i64, user_id: i64) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .contest_admins
            .contains(&(contest_id, user_id)))
    }

    async fn find_participant(
        &self,
        contest_id: i64,
        user_id: i64,
    ) -> AppResult<Option<ContestParticipant>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .participants
            .iter()
            .find(|p| p.contest_id == contest_id && p.user_id == user_id)
            .cloned())
    }

    async fn participants_to_auto_submit(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ContestParticipant>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .participants
            .iter()
            .filter(|p| {
                state.contests.get(&p.contest_id).is_some_and(|c| {
                    c.exam_mode_enabled && c.end_time.is_some_and(|end| end <= now)
                }) && p.exam_status().is_open()
            })
            .cloned()
            .collect())
    }

    async fn submit_participant(
        &self,
        contest_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .participants
            .iter_mut()
            .find(|p| p.contest_id == contest_id && p.user_id == user_id)
        {
            Some(p) if p.exam_status().is_open() => {
                p.exam_status = ExamStatus::Submitted.as_str().to_string();
                p.left_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn participants_to_unlock(
        &self,
        now: DateTime<Utc>,
        locked_before: DateTime<Utc>,
    ) -> AppResult<Vec<ContestParticipant>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .participants
            .iter()
            .filter(|p| {
                p.exam_status() == ExamStatus::Locked
                    && p.locked_at.is_some_and(|at| at <= locked_before)
                    && state
                        .contests
                        .get(&p.contest_id)
                        .is_some_and(|c| c.end_time.is_none_or(|end| end > now))
            })
            .cloned()
            .collect())
    }

    async fn unlock_participant(&self, contest_id: i64, user_id: i64) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .participants
            .iter_mut()
            .find(|p| p.contest_id == contest_id && p.user_id == user_id)
        {
            Some(p) if p.exam_status() == ExamStatus::Locked => {
                p.exam_status = ExamStatus::InProgress.as_str().to_string();
                p.locked_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Queue that keeps jobs in memory and records every enqueue
#[derive(Default)]
pub struct MemoryQueue {
    high: Mutex<VecDeque<JudgeJob>>,
    default: Mutex<VecDeque<JudgeJob>>,
    log: Mutex<Vec<(JudgeJob, QueuePriority)>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every enqueue in call order
    pub fn enqueued(&self) -> Vec<(JudgeJob, QueuePriority)> {
        self.log.lock().unwrap().clone()
    }

    fn list(&self, priority: QueuePriority) -> &Mutex<VecDeque<JudgeJob>> {
        match priority {
            QueuePriority::High => &self.high,
            QueuePriority::Default => &self.default,
        }
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: JudgeJob, priority: QueuePriority) -> AppResult<()> {
        self.list(priority).lock().unwrap().push_back(job);
        self.log.lock().unwrap().push((job, priority));
        Ok(())
    }

    async fn dequeue(&self) -> AppResult<Option<JudgeJob>> {
        if let Some(job) = self.high.lock().unwrap().pop_front() {
            return Ok(Some(job));
        }
        Ok(self.default.lock().unwrap().pop_front())
    }
}

type Script = Box<dyn Fn(&ExecRequest) -> Result<ExecResult, SandboxError> + Send + Sync>;

/// Sandbox answering every request through a closure
pub struct ScriptedSandbox {
    script: Script,
    requests: Mutex<Vec<ExecRequest>>,
}

impl ScriptedSandbox {
    pub fn new(
        script: impl Fn(&ExecRequest) -> Result<ExecResult, SandboxError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Program that sums or multiplies the two integers on stdin
    pub fn arithmetic(op: fn(i64, i64) -> i64) -> Self {
        Self::new(move |req| {
            let input = String::from_utf8_lossy(&req.stdin);
            let nums: Vec<i64> = input
                .split_whitespace()
                .filter_map(|n| n.parse().ok())
                .collect();
            let answer = match nums.as_slice() {
                [a, b] => op(*a, *b).to_string(),
                _ => String::new(),
            };
            Ok(exited(0, &format!("{answer}\n"), 5))
        })
    }

    pub fn requests(&self) -> Vec<ExecRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Sandbox for ScriptedSandbox {
    async fn run(&self, request: ExecRequest) -> Result<ExecResult, SandboxError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.script)(&request)
    }
}

/// Execution that finished by itself
pub fn exited(exit_code: i64, stdout: &str, run_ms: u64) -> ExecResult {
    ExecResult {
        exit_code,
        stdout: stdout.as_bytes().to_vec(),
        wall_time_ms: run_ms + 150,
        reported_run_ms: Some(run_ms),
        approx_memory_kb: 2_048,
        ..Default::default()
    }
}

pub fn problem(id: i64, time_limit_ms: i32) -> Problem {
    let now = now_utc();
    Problem {
        id,
        title: format!("Problem {id}"),
        difficulty: None,
        time_limit_ms,
        memory_limit_mb: 256,
        submission_count: 0,
        accepted_count: 0,
        wa_count: 0,
        tle_count: 0,
        mle_count: 0,
        re_count: 0,
        ce_count: 0,
        forbidden_keywords: Vec::new(),
        required_keywords: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn test_case(problem_id: i64, input: &str, expected: &str, score: i32) -> TestCase {
    TestCase {
        id: 0,
        problem_id,
        input: input.to_string(),
        expected_output: expected.to_string(),
        score,
        is_sample: false,
        is_hidden: false,
        order_index: 0,
        created_at: now_utc(),
    }
}

/// Published contest that started an hour ago and ends in an hour
pub fn running_contest(id: i64, owner_id: i64) -> Contest {
    let now = now_utc();
    Contest {
        id,
        owner_id,
        title: format!("Contest {id}"),
        status: ContestStatus::Published.as_str().to_string(),
        start_time: Some(now - Duration::hours(1)),
        end_time: Some(now + Duration::hours(1)),
        exam_mode_enabled: false,
        anonymous_mode_enabled: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn participant(contest_id: i64, user_id: i64, status: ExamStatus) -> ContestParticipant {
    ContestParticipant {
        contest_id,
        user_id,
        nickname: None,
        exam_status: status.as_str().to_string(),
        started_at: None,
        left_at: None,
        locked_at: None,
        violation_count: 0,
    }
}
