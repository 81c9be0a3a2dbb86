use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::Serialize;
use uuid::Uuid;

use super::parse_redis_url;
use super::types::{Task, TaskKind};

/// Producer-side task submission, abstracted so the API layer can be tested
/// without a broker.
#[async_trait]
pub(crate) trait TaskSubmitter: Send + Sync {
    async fn submit(&self, kind: TaskKind, payload: serde_json::Value) -> Result<Uuid>;
}

pub(crate) const PENDING_LIST: &str = "recipe_worker:tasks:pending";
pub(crate) const PROCESSING_LIST: &str = "recipe_worker:tasks:processing";
pub(crate) const DEAD_LIST: &str = "recipe_worker:tasks:dead";

/// Producer/consumer handle on the broker lists.
#[derive(Clone)]
pub(crate) struct QueueClient {
    conn: ConnectionManager,
}

impl QueueClient {
    pub(crate) async fn connect(redis_url: &str) -> Result<Self> {
        // validate scheme, host and credentials up front for a clear error
        let target = parse_redis_url(redis_url).context("invalid REDIS_URL")?;

        let client = redis::Client::open(target.connection_string())
            .context("failed to create redis client")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to redis")?;

        tracing::info!(host = %target.host, port = target.port, tls = target.tls, "connected to task broker");

        Ok(Self { conn })
    }

    /// Serialize and push a new task onto the pending list.
    pub(crate) async fn enqueue<P: Serialize>(
        &self,
        kind: TaskKind,
        payload: &P,
    ) -> Result<Uuid> {
        let task = Task::new(
            kind,
            serde_json::to_value(payload).context("failed to serialize task payload")?,
        );
        self.push_task(&task).await?;
        tracing::debug!(task_id = %task.id, kind = kind.as_str(), "task enqueued");
        Ok(task.id)
    }

    /// Push an existing envelope back onto the pending list (redelivery).
    pub(crate) async fn push_task(&self, task: &Task) -> Result<()> {
        let raw = serde_json::to_string(task).context("failed to serialize task")?;
        let mut conn = self.conn.clone();
        redis::cmd("LPUSH")
            .arg(PENDING_LIST)
            .arg(raw)
            .query_async::<i64>(&mut conn)
            .await
            .context("failed to enqueue task")?;
        Ok(())
    }

    /// Atomically move the next task to the processing list.
    ///
    /// The raw string is returned alongside the parsed task so completion
    /// can remove exactly this entry.
    pub(crate) async fn pop_task(&self) -> Result<Option<(Task, String)>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("RPOPLPUSH")
            .arg(PENDING_LIST)
            .arg(PROCESSING_LIST)
            .query_async(&mut conn)
            .await
            .context("failed to pop task")?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let task: Task = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse task envelope: {raw}"))?;

        Ok(Some((task, raw)))
    }

    /// Drop a delivered entry from the processing list.
    pub(crate) async fn ack(&self, raw: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("LREM")
            .arg(PROCESSING_LIST)
            .arg(1)
            .arg(raw)
            .query_async::<i64>(&mut conn)
            .await
            .context("failed to ack task")?;
        Ok(())
    }

    /// Park an exhausted task on the dead list for operator inspection.
    pub(crate) async fn bury(&self, task: &Task) -> Result<()> {
        let raw = serde_json::to_string(task).context("failed to serialize task")?;
        let mut conn = self.conn.clone();
        redis::cmd("LPUSH")
            .arg(DEAD_LIST)
            .arg(raw)
            .query_async::<i64>(&mut conn)
            .await
            .context("failed to bury task")?;
        Ok(())
    }
}

#[async_trait]
impl TaskSubmitter for QueueClient {
    async fn submit(&self, kind: TaskKind, payload: serde_json::Value) -> Result<Uuid> {
        let task = Task::new(kind, payload);
        self.push_task(&task).await?;
        tracing::debug!(task_id = %task.id, kind = kind.as_str(), "task submitted");
        Ok(task.id)
    }
}
