//! Verdict determination for single cases and whole submissions

use crate::{
    constants::{
        COMPILE_ERROR_EXIT_CODE, COMPILE_ERROR_MARKER, ERROR_CAP_BYTES, KILLED_EXIT_CODE,
        OUTPUT_CAP_BYTES,
    },
    error::SandboxError,
    models::{FinalVerdict, Verdict},
    sandbox::ExecResult,
    utils::{text::truncate_lossy, truncate_utf8},
};

/// Limits a case is judged against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseLimits {
    pub time_limit_ms: u64,
    pub memory_limit_mb: u64,
}

/// Result of judging one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub verdict: Verdict,
    pub time_ms: u64,
    pub memory_kb: u64,
    /// Program output, capped
    pub output: Option<String>,
    /// Diagnostic, capped
    pub error: Option<String>,
    /// False when no expected output was available to compare against
    pub checked: bool,
}

impl CaseOutcome {
    pub fn accepted(time_ms: u64, memory_kb: u64, output: String) -> Self {
        Self {
            verdict: Verdict::Accepted,
            time_ms,
            memory_kb,
            output: Some(output),
            error: None,
            checked: true,
        }
    }

    pub fn wrong_answer(time_ms: u64, memory_kb: u64, output: String) -> Self {
        Self {
            verdict: Verdict::WrongAnswer,
            ..Self::accepted(time_ms, memory_kb, output)
        }
    }

    /// Time is recorded as the limit itself
    pub fn time_limit_exceeded(time_limit_ms: u64, memory_kb: u64, output: String) -> Self {
        Self {
            verdict: Verdict::TimeLimitExceeded,
            time_ms: time_limit_ms,
            memory_kb,
            output: Some(output),
            error: Some(format!("Time limit exceeded ({time_limit_ms} ms)")),
            checked: true,
        }
    }

    pub fn memory_limit_exceeded(time_ms: u64, memory_limit_kb: u64, output: String) -> Self {
        Self {
            verdict: Verdict::MemoryLimitExceeded,
            time_ms,
            memory_kb: memory_limit_kb,
            output: Some(output),
            error: Some("Memory limit exceeded".to_string()),
            checked: true,
        }
    }

    pub fn runtime_error(time_ms: u64, memory_kb: u64, exit_code: i64, output: String) -> Self {
        Self {
            verdict: Verdict::RuntimeError,
            time_ms,
            memory_kb,
            output: Some(output),
            error: Some(format!("Runtime error (exit code {exit_code})")),
            checked: true,
        }
    }

    pub fn compile_error(compiler_output: &str) -> Self {
        let message = if compiler_output.trim().is_empty() {
            "Compilation failed".to_string()
        } else {
            compiler_output.to_string()
        };

        Self {
            verdict: Verdict::CompileError,
            time_ms: 0,
            memory_kb: 0,
            output: None,
            error: Some(truncate_utf8(&message, ERROR_CAP_BYTES)),
            checked: true,
        }
    }

    pub fn system_error(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::SystemError,
            time_ms: 0,
            memory_kb: 0,
            output: None,
            error: Some(truncate_utf8(&message.into(), ERROR_CAP_BYTES)),
            checked: true,
        }
    }

    /// Map a sandbox fault to a case outcome
    pub fn from_sandbox_error(err: &SandboxError) -> Self {
        Self::system_error(format!("System error ({}): {}", err.kind, err.message))
    }
}

/// Whole-output equality after stripping trailing whitespace on both sides
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim_end() == expected.trim_end()
}

/// Map one execution record to a case outcome
pub fn evaluate(exec: &ExecResult, expected: Option<&str>, limits: CaseLimits) -> CaseOutcome {
    let stdout = String::from_utf8_lossy(&exec.stdout);

    if exec.exit_code == COMPILE_ERROR_EXIT_CODE {
        if let Some(rest) = stdout.strip_prefix(COMPILE_ERROR_MARKER) {
            return CaseOutcome::compile_error(rest.trim_start_matches(['\r', '\n']));
        }
    }

    let time_ms = exec.reported_run_ms.unwrap_or(exec.wall_time_ms);
    let memory_kb = exec.approx_memory_kb;
    let memory_limit_kb = limits.memory_limit_mb * 1024;
    let output = truncate_lossy(&exec.stdout, OUTPUT_CAP_BYTES);

    if exec.oom_killed
        || (!exec.timed_out && exec.exit_code == KILLED_EXIT_CODE && memory_kb >= memory_limit_kb)
    {
        return CaseOutcome::memory_limit_exceeded(time_ms, memory_limit_kb, output);
    }

    if exec.timed_out {
        return CaseOutcome::time_limit_exceeded(limits.time_limit_ms, memory_kb, output);
    }

    if exec.exit_code != 0 {
        return CaseOutcome::runtime_error(time_ms, memory_kb, exec.exit_code, output);
    }

    match expected {
        Some(expected) if outputs_match(&stdout, expected) => {
            CaseOutcome::accepted(time_ms, memory_kb, output)
        }
        Some(_) => CaseOutcome::wrong_answer(time_ms, memory_kb, output),
        None => CaseOutcome {
            checked: false,
            ..CaseOutcome::accepted(time_ms, memory_kb, output)
        },
    }
}

/// Running aggregate over the cases of one submission
#[derive(Debug, Clone)]
pub struct VerdictAccumulator {
    status: Verdict,
    score: i32,
    max_time_ms: u64,
    max_memory_kb: u64,
    error_message: Option<String>,
}

impl Default for VerdictAccumulator {
    fn default() -> Self {
        Self {
            status: Verdict::Accepted,
            score: 0,
            max_time_ms: 0,
            max_memory_kb: 0,
            error_message: None,
        }
    }
}

impl VerdictAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one case; returns false when judging must stop
    pub fn record(&mut self, outcome: &CaseOutcome, case_score: i32) -> bool {
        self.max_time_ms = self.max_time_ms.max(outcome.time_ms);
        self.max_memory_kb = self.max_memory_kb.max(outcome.memory_kb);

        if outcome.verdict.is_accepted() {
            self.score += case_score.max(0);
            return true;
        }

        if outcome.verdict.stops_judging() {
            self.status = outcome.verdict;
            self.error_message = outcome.error.clone();
            return false;
        }

        // First failing case decides the reported verdict
        if self.status.is_accepted() {
            self.status = outcome.verdict;
        }
        true
    }

    pub fn status(&self) -> Verdict {
        self.status
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn max_time_ms(&self) -> u64 {
        self.max_time_ms
    }

    pub fn max_memory_kb(&self) -> u64 {
        self.max_memory_kb
    }

    pub fn finish(self) -> FinalVerdict {
        FinalVerdict {
            status: self.status,
            score: self.score,
            exec_time: clamp_i32(self.max_time_ms),
            memory_usage: clamp_i32(self.max_memory_kb),
            error_message: self.error_message,
        }
    }
}

/// Saturating conversion for storage columns
pub fn clamp_i32(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
