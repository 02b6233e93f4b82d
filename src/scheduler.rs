//! Cron scheduler for exam sweeps

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{
    config::ExamConfig,
    error::AppResult,
    services::ExamService,
    utils::now_utc,
};

/// Scheduler that runs the exam sweeps on cron schedules
///
/// A single instance runs per deployment; the sweeps are idempotent but not
/// coordinated across processes.
pub struct SweepScheduler {
    config: ExamConfig,
    exams: Arc<ExamService>,
    scheduler: JobScheduler,
}

impl SweepScheduler {
    pub async fn new(config: ExamConfig, exams: Arc<ExamService>) -> AppResult<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            config,
            exams,
            scheduler,
        })
    }

    /// Add all sweep jobs to the scheduler
    pub async fn setup_jobs(&mut self) -> AppResult<()> {
        self.add_auto_submit_job().await?;
        self.add_auto_unlock_job().await?;
        Ok(())
    }

    pub async fn start(&self) -> AppResult<()> {
        self.scheduler.start().await?;
        Ok(())
    }

    /// Shutdown the scheduler gracefully
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    async fn add_auto_submit_job(&self) -> AppResult<()> {
        let exams = self.exams.clone();
        let cron_expr = self.config.sweep_cron.clone();

        tracing::info!("Adding exam auto-submit job: {}", cron_expr);

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let exams = exams.clone();

            Box::pin(async move {
                if let Err(e) = exams.auto_submit_ended_exams(now_utc()).await {
                    tracing::error!("Exam auto-submit failed: {}", e);
                }
            })
        })?;

        self.scheduler.add(job).await?;
        Ok(())
    }

    async fn add_auto_unlock_job(&self) -> AppResult<()> {
        let exams = self.exams.clone();
        let cron_expr = self.config.unlock_cron.clone();
        let cooldown = self.config.unlock_cooldown_minutes;

        tracing::info!(
            "Adding exam auto-unlock job: {} (cooldown {} min)",
            cron_expr,
            cooldown
        );

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let exams = exams.clone();

            Box::pin(async move {
                if let Err(e) = exams.auto_unlock_participants(now_utc(), cooldown).await {
                    tracing::error!("Exam auto-unlock failed: {}", e);
                }
            })
        })?;

        self.scheduler.add(job).await?;
        Ok(())
    }
}
