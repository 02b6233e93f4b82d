//! Contest model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Contest database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Contest {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub exam_mode_enabled: bool,
    pub anonymous_mode_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contest {
    /// Parsed publication status; unknown values read as draft
    pub fn status(&self) -> ContestStatus {
        self.status.parse().unwrap_or(ContestStatus::Draft)
    }

    pub fn is_published(&self) -> bool {
        self.status() == ContestStatus::Published
    }

    /// Check if the contest has not opened yet at `now`
    pub fn is_before_start(&self, now: DateTime<Utc>) -> bool {
        self.start_time.is_some_and(|start| now < start)
    }

    /// Check if the contest window closed before `now`
    pub fn is_after_end(&self, now: DateTime<Utc>) -> bool {
        self.end_time.is_some_and(|end| now > end)
    }

    /// Check if the contest has reached its end time at `now`
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time.is_some_and(|end| end <= now)
    }
}

/// Contest publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Draft,
    Published,
    Archived,
}

impl ContestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl std::str::FromStr for ContestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown contest status: {other}")),
        }
    }
}

impl std::fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Participant progress through an exam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    NotStarted,
    InProgress,
    Paused,
    Locked,
    Submitted,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Locked => "locked",
            Self::Submitted => "submitted",
        }
    }

    /// States the auto-submit sweep closes once the contest ends
    pub fn is_open(&self) -> bool {
        matches!(self, Self::InProgress | Self::Paused | Self::Locked)
    }
}

impl std::str::FromStr for ExamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "paused" => Ok(Self::Paused),
            "locked" => Ok(Self::Locked),
            "submitted" => Ok(Self::Submitted),
            other => Err(format!("unknown exam status: {other}")),
        }
    }
}

impl std::fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contest participant model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContestParticipant {
    pub contest_id: i64,
    pub user_id: i64,
    pub nickname: Option<String>,
    pub exam_status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub locked_at: Option<DateTime<Utc>>,
    pub violation_count: i32,
}

impl ContestParticipant {
    /// Parsed exam status; unknown values read as not started
    pub fn exam_status(&self) -> ExamStatus {
        self.exam_status.parse().unwrap_or(ExamStatus::NotStarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn contest(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Contest {
        let now = Utc::now();
        Contest {
            id: 1,
            owner_id: 1,
            title: "Weekly".to_string(),
            status: "published".to_string(),
            start_time: start,
            end_time: end,
            exam_mode_enabled: false,
            anonymous_mode_enabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_open_window_without_bounds() {
        let c = contest(None, None);
        let now = Utc::now();
        assert!(!c.is_before_start(now));
        assert!(!c.is_after_end(now));
        assert!(!c.has_ended(now));
    }

    #[test]
    fn test_window_bounds() {
        let now = Utc::now();
        let c = contest(Some(now + Duration::hours(1)), Some(now + Duration::hours(2)));
        assert!(c.is_before_start(now));
        assert!(c.is_after_end(now + Duration::hours(3)));
        assert!(c.has_ended(now + Duration::hours(2)));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("paused".parse::<ExamStatus>(), Ok(ExamStatus::Paused));
        assert!("resting".parse::<ExamStatus>().is_err());
        assert!(contest(None, None).is_published());
    }
}
