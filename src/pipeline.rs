pub(crate) mod cleanup;
pub(crate) mod embedding;
pub(crate) mod persist;
pub(crate) mod processor;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::queue::{GenerateEmbeddingPayload, QueueClient, TaskKind};

pub(crate) use processor::{ProcessorDeps, RecipeProcessor};

/// Follow-up work the pipeline schedules for itself.
#[async_trait]
pub(crate) trait TaskQueue: Send + Sync {
    async fn enqueue_embedding(&self, payload: &GenerateEmbeddingPayload) -> Result<Uuid>;
}

#[async_trait]
impl TaskQueue for QueueClient {
    async fn enqueue_embedding(&self, payload: &GenerateEmbeddingPayload) -> Result<Uuid> {
        self.enqueue(TaskKind::GenerateEmbedding, payload).await
    }
}
