//! Contest repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ContestRepo;
use crate::{
    error::AppResult,
    models::{Contest, ContestParticipant, ExamStatus},
};

/// PostgreSQL-backed contest repository
#[derive(Clone)]
pub struct ContestRepository {
    pool: PgPool,
}

impl ContestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContestRepo for ContestRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Contest>> {
        let contest = sqlx::query_as::<_, Contest>(r#"SELECT * FROM contests WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(contest)
    }

    async fn is_contest_admin(&self, contest_id: i64, user_id: i64) -> AppResult<bool> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM contest_admins WHERE contest_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(contest_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }

    async fn find_participant(
        &self,
        contest_id: i64,
        user_id: i64,
    ) -> AppResult<Option<ContestParticipant>> {
        let participant = sqlx::query_as::<_, ContestParticipant>(
            r#"
            SELECT contest_id, user_id, nickname, exam_status, started_at, left_at,
                   locked_at, violation_count
            FROM contest_participants
            WHERE contest_id = $1 AND user_id = $2
            "#,
        )
        .bind(contest_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn participants_to_auto_submit(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ContestParticipant>> {
        let participants = sqlx::query_as::<_, ContestParticipant>(
            r#"
            SELECT p.contest_id, p.user_id, p.nickname, p.exam_status, p.started_at,
                   p.left_at, p.locked_at, p.violation_count
            FROM contest_participants p
            JOIN contests c ON c.id = p.contest_id
            WHERE c.exam_mode_enabled = TRUE
              AND c.end_time IS NOT NULL
              AND c.end_time <= $1
              AND p.exam_status IN ('in_progress', 'paused', 'locked')
            ORDER BY p.contest_id, p.user_id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn submit_participant(
        &self,
        contest_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contest_participants
            SET exam_status = $3, left_at = $4
            WHERE contest_id = $1 AND user_id = $2
              AND exam_status IN ('in_progress', 'paused', 'locked')
            "#,
        )
        .bind(contest_id)
        .bind(user_id)
        .bind(ExamStatus::Submitted.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn participants_to_unlock(
        &self,
        now: DateTime<Utc>,
        locked_before: DateTime<Utc>,
    ) -> AppResult<Vec<ContestParticipant>> {
        let participants = sqlx::query_as::<_, ContestParticipant>(
            r#"
            SELECT p.contest_id, p.user_id, p.nickname, p.exam_status, p.started_at,
                   p.left_at, p.locked_at, p.violation_count
            FROM contest_participants p
            JOIN contests c ON c.id = p.contest_id
            WHERE p.exam_status = 'locked'
              AND p.locked_at IS NOT NULL
              AND p.locked_at <= $2
              AND (c.end_time IS NULL OR c.end_time > $1)
            ORDER BY p.contest_id, p.user_id
            "#,
        )
        .bind(now)
        .bind(locked_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn unlock_participant(&self, contest_id: i64, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contest_participants
            SET exam_status = $3, locked_at = NULL
            WHERE contest_id = $1 AND user_id = $2 AND exam_status = 'locked'
            "#,
        )
        .bind(contest_id)
        .bind(user_id)
        .bind(ExamStatus::InProgress.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
