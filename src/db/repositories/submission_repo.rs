//! Submission repository

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};

use super::{ProblemRepository, SubmissionRepo, UserStatsRepository};
use crate::{
    error::AppResult,
    models::{
        FinalVerdict, NewSubmission, NewSubmissionResult, Submission, SubmissionResult, Verdict,
    },
};

/// PostgreSQL-backed submission repository
#[derive(Clone)]
pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_result<'e, E>(executor: E, new: &NewSubmissionResult) -> AppResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO submission_results (
                submission_id, test_case_id, status, exec_time, memory,
                output, error, input_snapshot, expected_snapshot
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(new.submission_id)
        .bind(new.test_case_id)
        .bind(new.status.as_str())
        .bind(new.exec_time)
        .bind(new.memory)
        .bind(&new.output)
        .bind(&new.error)
        .bind(&new.input_snapshot)
        .bind(&new.expected_snapshot)
        .execute(executor)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SubmissionRepo for SubmissionRepository {
    async fn create(&self, new: &NewSubmission) -> AppResult<Submission> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (
                user_id, problem_id, contest_id, lab_id, source_type, language, code,
                is_test, custom_test_cases, status, score, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.problem_id)
        .bind(new.contest_id)
        .bind(new.lab_id)
        .bind(new.source_type.as_str())
        .bind(&new.language)
        .bind(&new.code)
        .bind(new.is_test)
        .bind(&new.custom_test_cases)
        .bind(new.status.as_str())
        .bind(new.score)
        .bind(&new.error_message)
        .fetch_one(&self.pool)
        .await?;

        Ok(submission)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Submission>> {
        let submission =
            sqlx::query_as::<_, Submission>(r#"SELECT * FROM submissions WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(submission)
    }

    async fn mark_judging(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'judging')
            "#,
        )
        .bind(id)
        .bind(Verdict::Judging.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn results_for(&self, submission_id: i64) -> AppResult<Vec<SubmissionResult>> {
        let results = sqlx::query_as::<_, SubmissionResult>(
            r#"SELECT * FROM submission_results WHERE submission_id = $1 ORDER BY id"#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }

    async fn finalize(
        &self,
        submission: &Submission,
        verdict: &FinalVerdict,
        results: &[NewSubmissionResult],
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // The row lock serializes concurrent finalizers of one submission
        let status: Option<String> =
            sqlx::query_scalar(r#"SELECT status FROM submissions WHERE id = $1 FOR UPDATE"#)
                .bind(submission.id)
                .fetch_optional(&mut *tx)
                .await?;

        let judgeable = status
            .and_then(|s| s.parse::<Verdict>().ok())
            .is_some_and(|v| !v.is_terminal());
        if !judgeable {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(r#"DELETE FROM submission_results WHERE submission_id = $1"#)
            .bind(submission.id)
            .execute(&mut *tx)
            .await?;

        for result in results {
            Self::insert_result(&mut *tx, result).await?;
        }

        sqlx::query(
            r#"
            UPDATE submissions
            SET
                status = $2,
                score = $3,
                exec_time = $4,
                memory_usage = $5,
                error_message = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(submission.id)
        .bind(verdict.status.as_str())
        .bind(verdict.score)
        .bind(verdict.exec_time)
        .bind(verdict.memory_usage)
        .bind(&verdict.error_message)
        .execute(&mut *tx)
        .await?;

        if !submission.is_test && verdict.status.counts_towards_problem() {
            ProblemRepository::increment_counters(&mut *tx, submission.problem_id, verdict.status)
                .await?;
            UserStatsRepository::recompute(&mut *tx, submission.user_id).await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}
