use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::util::AppError;

use super::{post_transcription, TranscriptionProvider};

const MODEL: &str = "gpt-4o-mini-transcribe";

pub(crate) struct OpenAiTranscription {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAiTranscription {
    pub(crate) fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1")
    }

    pub(crate) fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(180))
                .build()
                .expect("reqwest client builds with static config"),
        }
    }
}

#[async_trait]
impl TranscriptionProvider for OpenAiTranscription {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<String, AppError> {
        post_transcription(
            &self.client,
            &self.base_url,
            &self.api_key,
            MODEL,
            audio_path,
            "audio.mp3",
        )
        .await
    }
}
