//! Submission model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::CustomTestCase;
use crate::{constants::ERROR_CAP_BYTES, utils::truncate_utf8};

/// Submission database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    pub problem_id: i64,
    pub contest_id: Option<i64>,
    pub lab_id: Option<i64>,
    pub source_type: String,
    pub language: String,
    #[serde(skip_serializing)]
    pub code: String,
    pub is_test: bool,
    pub custom_test_cases: Option<serde_json::Value>,
    pub status: String,
    pub score: i32,
    pub exec_time: Option<i32>,
    pub memory_usage: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// Parsed status, `None` for a value the judge does not know
    pub fn verdict(&self) -> Option<Verdict> {
        self.status.parse().ok()
    }

    /// Custom cases attached to a test submission
    pub fn custom_cases(&self) -> Result<Vec<CustomTestCase>, serde_json::Error> {
        match &self.custom_test_cases {
            Some(value) => serde_json::from_value(value.clone()),
            None => Ok(Vec::new()),
        }
    }
}

/// Row written by the admission controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub user_id: i64,
    pub problem_id: i64,
    pub contest_id: Option<i64>,
    pub lab_id: Option<i64>,
    pub source_type: SourceType,
    pub language: String,
    pub code: String,
    pub is_test: bool,
    pub custom_test_cases: Option<serde_json::Value>,
    pub status: Verdict,
    pub score: i32,
    pub error_message: Option<String>,
}

/// Whether a submission counts towards a contest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Practice,
    Contest,
}

impl SourceType {
    pub fn for_contest(contest_id: Option<i64>) -> Self {
        if contest_id.is_some() {
            Self::Contest
        } else {
            Self::Practice
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Practice => "practice",
            Self::Contest => "contest",
        }
    }
}

/// Submission status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "judging")]
    Judging,
    #[serde(rename = "AC")]
    Accepted,
    #[serde(rename = "WA")]
    WrongAnswer,
    #[serde(rename = "TLE")]
    TimeLimitExceeded,
    #[serde(rename = "MLE")]
    MemoryLimitExceeded,
    #[serde(rename = "RE")]
    RuntimeError,
    #[serde(rename = "CE")]
    CompileError,
    #[serde(rename = "KR")]
    KeywordRestricted,
    #[serde(rename = "SE")]
    SystemError,
}

impl Verdict {
    /// Get verdict as its stored code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Judging => "judging",
            Self::Accepted => "AC",
            Self::WrongAnswer => "WA",
            Self::TimeLimitExceeded => "TLE",
            Self::MemoryLimitExceeded => "MLE",
            Self::RuntimeError => "RE",
            Self::CompileError => "CE",
            Self::KeywordRestricted => "KR",
            Self::SystemError => "SE",
        }
    }

    /// Check if judging of the submission is complete
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Judging)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Verdicts that end the judging loop for the whole submission
    pub fn stops_judging(&self) -> bool {
        matches!(self, Self::CompileError | Self::SystemError)
    }

    /// Keyword-restricted submissions never reach the problem counters
    pub fn counts_towards_problem(&self) -> bool {
        self.is_terminal() && !matches!(self, Self::KeywordRestricted)
    }

    /// Problem counter column bumped for this verdict, if any
    pub fn counter_column(&self) -> Option<&'static str> {
        match self {
            Self::Accepted => Some("accepted_count"),
            Self::WrongAnswer => Some("wa_count"),
            Self::TimeLimitExceeded => Some("tle_count"),
            Self::MemoryLimitExceeded => Some("mle_count"),
            Self::RuntimeError => Some("re_count"),
            Self::CompileError => Some("ce_count"),
            _ => None,
        }
    }
}

/// Error returned when a stored status code is not a verdict
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown verdict code: {0}")]
pub struct UnknownVerdict(pub String);

impl std::str::FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "judging" => Ok(Self::Judging),
            "AC" => Ok(Self::Accepted),
            "WA" => Ok(Self::WrongAnswer),
            "TLE" => Ok(Self::TimeLimitExceeded),
            "MLE" => Ok(Self::MemoryLimitExceeded),
            "RE" => Ok(Self::RuntimeError),
            "CE" => Ok(Self::CompileError),
            "KR" => Ok(Self::KeywordRestricted),
            "SE" => Ok(Self::SystemError),
            other => Err(UnknownVerdict(other.to_string())),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-case result row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub id: i64,
    pub submission_id: i64,
    pub test_case_id: Option<i64>,
    pub status: String,
    pub exec_time: i32,
    pub memory: i32,
    pub output: Option<String>,
    pub error: Option<String>,
    pub input_snapshot: Option<String>,
    pub expected_snapshot: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-case result as produced by the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmissionResult {
    pub submission_id: i64,
    pub test_case_id: Option<i64>,
    pub status: Verdict,
    pub exec_time: i32,
    pub memory: i32,
    pub output: Option<String>,
    pub error: Option<String>,
    pub input_snapshot: Option<String>,
    pub expected_snapshot: Option<String>,
}

/// Terminal state written once judging completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalVerdict {
    pub status: Verdict,
    pub score: i32,
    pub exec_time: i32,
    pub memory_usage: i32,
    pub error_message: Option<String>,
}

impl FinalVerdict {
    /// Verdict with no measurements, used when nothing was executed
    pub fn without_run(status: Verdict, message: impl Into<String>) -> Self {
        Self {
            status,
            score: 0,
            exec_time: 0,
            memory_usage: 0,
            error_message: Some(truncate_utf8(&message.into(), ERROR_CAP_BYTES)),
        }
    }

    pub fn system_error(message: impl Into<String>) -> Self {
        Self::without_run(Verdict::SystemError, message)
    }

    pub fn keyword_restricted(message: impl Into<String>) -> Self {
        Self::without_run(Verdict::KeywordRestricted, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_codes_parse_back() {
        for code in ["pending", "judging", "AC", "WA", "TLE", "MLE", "RE", "CE", "KR", "SE"] {
            let verdict: Verdict = code.parse().unwrap();
            assert_eq!(verdict.as_str(), code);
        }
        assert!("accepted".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_terminal_verdicts() {
        assert!(!Verdict::Pending.is_terminal());
        assert!(!Verdict::Judging.is_terminal());
        assert!(Verdict::KeywordRestricted.is_terminal());
        assert!(Verdict::SystemError.is_terminal());
    }

    #[test]
    fn test_counter_columns() {
        assert_eq!(Verdict::Accepted.counter_column(), Some("accepted_count"));
        assert_eq!(Verdict::CompileError.counter_column(), Some("ce_count"));
        assert_eq!(Verdict::SystemError.counter_column(), None);
        assert_eq!(Verdict::KeywordRestricted.counter_column(), None);
        assert!(Verdict::SystemError.counts_towards_problem());
        assert!(!Verdict::KeywordRestricted.counts_towards_problem());
        assert!(!Verdict::Pending.counts_towards_problem());
    }

    fn test_submission(custom_test_cases: Option<serde_json::Value>) -> Submission {
        let now = Utc::now();
        Submission {
            id: 1,
            user_id: 1,
            problem_id: 1,
            contest_id: None,
            lab_id: None,
            source_type: "practice".to_string(),
            language: "python".to_string(),
            code: "print(1)".to_string(),
            is_test: true,
            custom_test_cases,
            status: "pending".to_string(),
            score: 0,
            exec_time: None,
            memory_usage: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_custom_cases_parse() {
        assert!(test_submission(None).custom_cases().unwrap().is_empty());

        let cases = test_submission(Some(serde_json::json!([{ "input": "1 2", "expected": "3" }])))
            .custom_cases()
            .unwrap();
        assert_eq!(cases[0].expected.as_deref(), Some("3"));

        let malformed = test_submission(Some(serde_json::json!({ "input": "1 2" })));
        assert!(malformed.custom_cases().is_err());
    }

    #[test]
    fn test_serde_uses_short_codes() {
        let json = serde_json::to_string(&Verdict::TimeLimitExceeded).unwrap();
        assert_eq!(json, "\"TLE\"");
    }
}
