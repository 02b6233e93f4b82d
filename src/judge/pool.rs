//! Pool of judge workers draining the job queue

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::{
    judge::worker::JudgeWorker,
    queue::{JobQueue, JudgeJob},
};

/// N independent consumers sharing one worker definition
///
/// Each consumer owns its queue handle because a blocking pop holds the
/// connection it runs on.
pub struct WorkerPool {
    worker: Arc<JudgeWorker>,
    queues: Vec<Arc<dyn JobQueue>>,
}

impl WorkerPool {
    pub fn new(worker: Arc<JudgeWorker>, queues: Vec<Arc<dyn JobQueue>>) -> Self {
        Self { worker, queues }
    }

    pub fn size(&self) -> usize {
        self.queues.len()
    }

    /// Run every consumer until `shutdown` is set; in-flight submissions finish first
    pub async fn run(self, shutdown: Arc<AtomicBool>) {
        tracing::info!(workers = self.queues.len(), "Starting judge worker pool");

        let mut tasks = JoinSet::new();
        for (index, queue) in self.queues.into_iter().enumerate() {
            let worker = self.worker.clone();
            let shutdown = shutdown.clone();
            tasks.spawn(consume(index, worker, queue, shutdown));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Judge worker task failed: {}", e);
            }
        }

        tracing::info!("Judge worker pool stopped");
    }
}

async fn consume(
    index: usize,
    worker: Arc<JudgeWorker>,
    queue: Arc<dyn JobQueue>,
    shutdown: Arc<AtomicBool>,
) {
    tracing::debug!(worker = index, "Judge worker started");

    while !shutdown.load(Ordering::SeqCst) {
        match queue.dequeue().await {
            Ok(Some(job)) => handle_job(&worker, job).await,
            Ok(None) => tokio::task::yield_now().await,
            Err(e) => {
                tracing::error!(worker = index, "Error polling judge queue: {}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }

    tracing::debug!(worker = index, "Judge worker stopped");
}

/// Judge one job; an error that escaped the case loop is recorded as `SE`
pub async fn handle_job(worker: &JudgeWorker, job: JudgeJob) {
    let submission_id = job.submission_id;

    if let Err(e) = worker.process_submission(submission_id).await {
        tracing::error!(submission_id, "Judging failed: {}", e);

        if let Err(mark_err) = worker.mark_system_error(submission_id, &e.to_string()).await {
            tracing::error!(
                submission_id,
                "Could not record system error: {}",
                mark_err
            );
        }
    }
}
