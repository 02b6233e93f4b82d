//! Test case model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Test case database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub problem_id: i64,
    pub input: String,
    pub expected_output: String,
    pub score: i32,
    pub is_sample: bool,
    pub is_hidden: bool,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

/// A case supplied by the user alongside a test run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTestCase {
    pub input: String,
    #[serde(default)]
    pub expected: Option<String>,
}

/// Where a judged case came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseSource {
    Problem,
    Sample,
    Custom,
}

/// A case as the judge runs it, detached from storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeCase {
    /// Backing test case, `None` for custom cases
    pub test_case_id: Option<i64>,
    pub source: CaseSource,
    pub input: String,
    pub expected: Option<String>,
    pub score: i32,
    pub is_hidden: bool,
}

impl JudgeCase {
    pub fn from_test_case(case: &TestCase, source: CaseSource) -> Self {
        Self {
            test_case_id: Some(case.id),
            source,
            input: case.input.clone(),
            expected: Some(case.expected_output.clone()),
            score: case.score.max(0),
            is_hidden: case.is_hidden,
        }
    }

    pub fn from_custom(case: &CustomTestCase) -> Self {
        Self {
            test_case_id: None,
            source: CaseSource::Custom,
            input: case.input.clone(),
            expected: case.expected.clone(),
            score: 0,
            is_hidden: false,
        }
    }
}
