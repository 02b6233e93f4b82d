//! Problem model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Problem database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub title: String,
    pub difficulty: Option<String>,
    pub time_limit_ms: i32,
    pub memory_limit_mb: i32,
    pub submission_count: i64,
    pub accepted_count: i64,
    pub wa_count: i64,
    pub tle_count: i64,
    pub mle_count: i64,
    pub re_count: i64,
    pub ce_count: i64,
    pub forbidden_keywords: Vec<String>,
    pub required_keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Problem {
    /// Time limit as an unsigned millisecond count
    pub fn time_limit(&self) -> u64 {
        self.time_limit_ms.max(0) as u64
    }

    /// Memory limit in megabytes, never below 1
    pub fn memory_limit(&self) -> u64 {
        self.memory_limit_mb.max(1) as u64
    }
}
