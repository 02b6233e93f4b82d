//! Exam sweeps
//!
//! Side-band maintenance of exam participants. Both sweeps only touch
//! participant rows and are safe to repeat.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    db::repositories::ContestRepo,
    error::AppResult,
    utils::cooldown_cutoff,
};

/// Statistics from one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: u64,
    pub updated: u64,
    pub errors: u64,
}

pub struct ExamService {
    contests: Arc<dyn ContestRepo>,
}

impl ExamService {
    pub fn new(contests: Arc<dyn ContestRepo>) -> Self {
        Self { contests }
    }

    /// Close every open exam of exam-mode contests that have ended
    pub async fn auto_submit_ended_exams(&self, now: DateTime<Utc>) -> AppResult<SweepStats> {
        let mut stats = SweepStats::default();

        for participant in self.contests.participants_to_auto_submit(now).await? {
            stats.scanned += 1;

            match self
                .contests
                .submit_participant(participant.contest_id, participant.user_id, now)
                .await
            {
                Ok(true) => {
                    stats.updated += 1;
                    tracing::debug!(
                        contest_id = participant.contest_id,
                        user_id = participant.user_id,
                        "Exam auto-submitted"
                    );
                }
                Ok(false) => {}
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(
                        contest_id = participant.contest_id,
                        user_id = participant.user_id,
                        "Failed to auto-submit exam: {}",
                        e
                    );
                }
            }
        }

        tracing::info!(
            "Exam auto-submit: scanned={}, updated={}, errors={}",
            stats.scanned,
            stats.updated,
            stats.errors
        );
        Ok(stats)
    }

    /// Return locked participants to their exam once the cooldown has passed
    pub async fn auto_unlock_participants(
        &self,
        now: DateTime<Utc>,
        cooldown_minutes: i64,
    ) -> AppResult<SweepStats> {
        let mut stats = SweepStats::default();
        let locked_before = cooldown_cutoff(now, cooldown_minutes);

        for participant in self
            .contests
            .participants_to_unlock(now, locked_before)
            .await?
        {
            stats.scanned += 1;

            match self
                .contests
                .unlock_participant(participant.contest_id, participant.user_id)
                .await
            {
                Ok(true) => {
                    stats.updated += 1;
                    tracing::debug!(
                        contest_id = participant.contest_id,
                        user_id = participant.user_id,
                        "Participant unlocked"
                    );
                }
                Ok(false) => {}
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(
                        contest_id = participant.contest_id,
                        user_id = participant.user_id,
                        "Failed to unlock participant: {}",
                        e
                    );
                }
            }
        }

        tracing::info!(
            "Exam auto-unlock: scanned={}, updated={}, errors={}",
            stats.scanned,
            stats.updated,
            stats.errors
        );
        Ok(stats)
    }
}
