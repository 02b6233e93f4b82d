//! Judge job queue
//!
//! Jobs are JSON messages on two Redis lists, one per priority class.
//! Producers `LPUSH`; consumers `BRPOP` both lists with the high-priority list
//! first, so a waiting contest job is always taken before any practice job.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{Deserialize, Serialize};

use crate::{constants::queues, error::AppResult, models::SourceType};

/// Message carried on the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeJob {
    pub submission_id: i64,
}

/// Priority class of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePriority {
    High,
    Default,
}

impl QueuePriority {
    /// Contest submissions go to the high-priority queue
    pub fn for_source(source_type: SourceType) -> Self {
        match source_type {
            SourceType::Contest => Self::High,
            SourceType::Practice => Self::Default,
        }
    }

    pub fn queue_name(&self) -> &'static str {
        match self {
            Self::High => queues::HIGH_PRIORITY,
            Self::Default => queues::DEFAULT,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: JudgeJob, priority: QueuePriority) -> AppResult<()>;

    /// Wait up to the poll timeout for the next job, high priority first
    async fn dequeue(&self) -> AppResult<Option<JudgeJob>>;
}

/// Redis list-backed queue
///
/// `BRPOP` holds its connection while it waits, so every consumer needs its
/// own instance.
#[derive(Clone)]
pub struct RedisJobQueue {
    conn: ConnectionManager,
    key_prefix: String,
    poll_timeout_secs: u64,
}

impl RedisJobQueue {
    pub fn new(conn: ConnectionManager, key_prefix: &str, poll_timeout_secs: u64) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.to_string(),
            poll_timeout_secs,
        }
    }

    /// Open a dedicated connection for one queue handle
    pub async fn connect(
        client: &redis::Client,
        key_prefix: &str,
        poll_timeout_secs: u64,
    ) -> Result<Self, redis::RedisError> {
        let conn = ConnectionManager::new(client.clone()).await?;
        Ok(Self::new(conn, key_prefix, poll_timeout_secs))
    }

    /// Full Redis key of a priority's list
    pub fn key(&self, priority: QueuePriority) -> String {
        format!("{}{}", self.key_prefix, priority.queue_name())
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: JudgeJob, priority: QueuePriority) -> AppResult<()> {
        let payload = serde_json::to_string(&job)?;
        let mut conn = self.conn.clone();

        conn.lpush::<_, _, ()>(self.key(priority), payload).await?;

        tracing::debug!(
            submission_id = job.submission_id,
            queue = priority.queue_name(),
            "Judge job enqueued"
        );
        Ok(())
    }

    async fn dequeue(&self) -> AppResult<Option<JudgeJob>> {
        let mut conn = self.conn.clone();

        let keys = vec![self.key(QueuePriority::High), self.key(QueuePriority::Default)];
        let popped: Option<(String, String)> =
            conn.brpop(keys, self.poll_timeout_secs as f64).await?;

        let Some((queue, payload)) = popped else {
            return Ok(None);
        };

        match serde_json::from_str::<JudgeJob>(&payload) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                tracing::warn!(queue = %queue, payload = %payload, error = %e, "Dropping malformed judge job");
                Ok(None)
            }
        }
    }
}
