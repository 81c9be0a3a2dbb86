use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The three durable task types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum TaskKind {
    #[serde(rename = "process:recipe")]
    ProcessRecipe,
    #[serde(rename = "generate:embedding")]
    GenerateEmbedding,
    #[serde(rename = "cleanup:jobs")]
    CleanupJobs,
}

impl TaskKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            TaskKind::ProcessRecipe => "process:recipe",
            TaskKind::GenerateEmbedding => "generate:embedding",
            TaskKind::CleanupJobs => "cleanup:jobs",
        }
    }
}

/// Payload of a `process:recipe` task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ProcessRecipePayload {
    pub(crate) job_id: Uuid,
    pub(crate) url: String,
    pub(crate) user_id: Uuid,
}

/// Payload of a `generate:embedding` task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GenerateEmbeddingPayload {
    pub(crate) recipe_id: Uuid,
}

/// Wire envelope stored on the broker lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Task {
    pub(crate) id: Uuid,
    pub(crate) kind: TaskKind,
    #[serde(default)]
    pub(crate) payload: Value,
    /// 1-based delivery attempt.
    pub(crate) attempt: u32,
}

impl Task {
    pub(crate) fn new(kind: TaskKind, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            payload,
            attempt: 1,
        }
    }
}
