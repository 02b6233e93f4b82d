//! User statistics repository

use sqlx::{PgExecutor, PgPool};

use crate::error::AppResult;

/// Repository for the denormalized `user_stats` table
pub struct UserStatsRepository;

impl UserStatsRepository {
    /// Recompute a user's statistics from their judged, non-test submissions
    pub async fn recompute<'e, E>(executor: E, user_id: i64) -> AppResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO user_stats (user_id, total_submissions, accepted_submissions, solved_problems, updated_at)
            SELECT
                $1,
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'AC'),
                COUNT(DISTINCT problem_id) FILTER (WHERE status = 'AC'),
                NOW()
            FROM submissions
            WHERE user_id = $1
              AND is_test = FALSE
              AND status NOT IN ('pending', 'judging')
            ON CONFLICT (user_id) DO UPDATE SET
                total_submissions = EXCLUDED.total_submissions,
                accepted_submissions = EXCLUDED.accepted_submissions,
                solved_problems = EXCLUDED.solved_problems,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(())
    }
}
