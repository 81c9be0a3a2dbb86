use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::util::AppError;

const MODEL: &str = "text-embedding-ada-002";

/// Text to vector, used by the embedding task.
#[async_trait]
pub(crate) trait EmbeddingProvider: Send + Sync {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, AppError>;
}

pub(crate) struct OpenAiEmbeddings {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAiEmbeddings {
    pub(crate) fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1")
    }

    pub(crate) fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with static config"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({"model": MODEL, "input": text}))
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("embedding request failed: {error}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| AppError::Internal(format!("failed to read embedding response: {error}")))?;

        if status >= 400 {
            return Err(AppError::Internal(format!(
                "embedding API error (status {status}): {body}"
            )));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|error| AppError::Internal(format!("failed to parse embedding response: {error}")))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|datum| datum.embedding)
            .unwrap_or_default();

        if embedding.is_empty() {
            return Err(AppError::Internal("no embedding returned".to_string()));
        }

        Ok(embedding)
    }
}
