//! Problem repository

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};

use super::ProblemRepo;
use crate::{
    error::AppResult,
    models::{Problem, TestCase, Verdict},
};

/// PostgreSQL-backed problem repository
#[derive(Clone)]
pub struct ProblemRepository {
    pool: PgPool,
}

impl ProblemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bump the submission counter and the verdict's counter in one statement
    pub async fn increment_counters<'e, E>(
        executor: E,
        problem_id: i64,
        verdict: Verdict,
    ) -> AppResult<()>
    where
        E: PgExecutor<'e>,
    {
        let sql = match verdict.counter_column() {
            Some(column) => format!(
                "UPDATE problems SET submission_count = submission_count + 1, \
                 {column} = {column} + 1, updated_at = NOW() WHERE id = $1"
            ),
            None => "UPDATE problems SET submission_count = submission_count + 1, \
                     updated_at = NOW() WHERE id = $1"
                .to_string(),
        };

        sqlx::query(&sql).bind(problem_id).execute(executor).await?;

        Ok(())
    }
}

#[async_trait]
impl ProblemRepo for ProblemRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Problem>> {
        let problem = sqlx::query_as::<_, Problem>(r#"SELECT * FROM problems WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(problem)
    }

    async fn test_cases(&self, problem_id: i64) -> AppResult<Vec<TestCase>> {
        let test_cases = sqlx::query_as::<_, TestCase>(
            r#"
            SELECT * FROM test_cases
            WHERE problem_id = $1
            ORDER BY order_index ASC, id ASC
            "#,
        )
        .bind(problem_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(test_cases)
    }

    async fn sample_cases(&self, problem_id: i64) -> AppResult<Vec<TestCase>> {
        let test_cases = sqlx::query_as::<_, TestCase>(
            r#"
            SELECT * FROM test_cases
            WHERE problem_id = $1 AND is_sample = TRUE AND is_hidden = FALSE
            ORDER BY order_index ASC, id ASC
            "#,
        )
        .bind(problem_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(test_cases)
    }
}
