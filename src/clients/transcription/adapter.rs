//! Bridges a video URL to the file-based transcription providers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::util::AppError;

use super::{extractor, TranscriptionProvider};

/// URL-level transcription as the pipeline sees it.
#[async_trait]
pub(crate) trait VideoTranscription: Send + Sync {
    async fn transcribe_video(&self, video_url: &str) -> Result<String, AppError>;
}

pub(crate) struct VideoTranscriber {
    client: Client,
    provider: Arc<dyn TranscriptionProvider>,
}

impl VideoTranscriber {
    pub(crate) fn new(provider: Arc<dyn TranscriptionProvider>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(180))
                .build()
                .expect("reqwest client builds with static config"),
            provider,
        }
    }

    async fn download_video(&self, video_url: &str) -> Result<tempfile::NamedTempFile, AppError> {
        let mut response = self.client.get(video_url).send().await.map_err(|error| {
            AppError::transcription(format!("failed to fetch video: {error}"), 502)
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(AppError::transcription(
                format!("failed to fetch video: status {status}"),
                status,
            ));
        }

        let video_file = tempfile::Builder::new()
            .prefix("video-")
            .suffix(".mp4")
            .tempfile()
            .map_err(|error| {
                AppError::transcription(format!("failed to create temp video file: {error}"), 500)
            })?;

        let mut writer = tokio::fs::OpenOptions::new()
            .write(true)
            .open(video_file.path())
            .await
            .map_err(|error| {
                AppError::transcription(format!("failed to open temp video file: {error}"), 500)
            })?;

        while let Some(chunk) = response.chunk().await.map_err(|error| {
            AppError::transcription(format!("failed to read video stream: {error}"), 502)
        })? {
            writer.write_all(&chunk).await.map_err(|error| {
                AppError::transcription(format!("failed to write video chunk: {error}"), 500)
            })?;
        }
        writer.flush().await.map_err(|error| {
            AppError::transcription(format!("failed to flush video file: {error}"), 500)
        })?;

        Ok(video_file)
    }
}

#[async_trait]
impl VideoTranscription for VideoTranscriber {
    /// Download the video, extract its audio track and transcribe it.
    ///
    /// When audio extraction fails (codec quirks, missing ffmpeg) the raw
    /// video is submitted instead; the providers accept both. Temp files are
    /// removed on every path via their drop guards.
    async fn transcribe_video(&self, video_url: &str) -> Result<String, AppError> {
        let video_file = self.download_video(video_url).await?;

        match extractor::extract_audio(video_file.path()).await {
            Ok(audio_file) => self.provider.transcribe(audio_file.path()).await,
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "audio extraction failed, submitting raw video"
                );
                self.provider.transcribe(video_file.path()).await
            }
        }
    }
}
