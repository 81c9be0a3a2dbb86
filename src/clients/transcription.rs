pub(crate) mod adapter;
pub(crate) mod extractor;
pub(crate) mod groq;
pub(crate) mod openai;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::clients::recipe::errors::{classify, is_retryable_class};
use crate::config::ProviderChoice;
use crate::observability::metrics::Metrics;
use crate::util::AppError;

/// Speech-to-text over a local audio (or video) file.
#[async_trait]
pub(crate) trait TranscriptionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn transcribe(&self, audio_path: &Path) -> Result<String, AppError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Shared POST for the OpenAI-compatible `/audio/transcriptions` endpoints.
///
/// The file is streamed into the multipart body instead of being buffered;
/// recordings easily run to tens of megabytes.
async fn post_transcription(
    client: &Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    audio_path: &Path,
    form_file_name: &str,
) -> Result<String, AppError> {
    let file = tokio::fs::File::open(audio_path)
        .await
        .map_err(|error| AppError::transcription(format!("failed to open audio file: {error}"), 500))?;

    let part = Part::stream(Body::wrap_stream(ReaderStream::new(file)))
        .file_name(form_file_name.to_string())
        .mime_str("application/octet-stream")
        .map_err(|error| AppError::transcription(format!("invalid mime type: {error}"), 500))?;

    let form = Form::new()
        .part("file", part)
        .text("model", model.to_string());

    let response = client
        .post(format!("{base_url}/audio/transcriptions"))
        .bearer_auth(api_key)
        .multipart(form)
        .send()
        .await
        .map_err(|error| AppError::transcription(format!("transcription request failed: {error}"), 502))?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|error| AppError::transcription(format!("failed to read response: {error}"), 502))?;

    if status >= 400 {
        return Err(AppError::transcription(body, status));
    }

    let parsed: TranscriptionResponse = serde_json::from_str(&body)
        .map_err(|error| AppError::transcription(format!("failed to parse response: {error}"), 502))?;

    Ok(parsed.text)
}

/// Composite that reroutes to a secondary provider when the primary fails
/// with a retryable class (rate limit, credit exhaustion, server error).
pub(crate) struct FallbackTranscription {
    primary: Arc<dyn TranscriptionProvider>,
    secondary: Arc<dyn TranscriptionProvider>,
    metrics: Arc<Metrics>,
}

impl FallbackTranscription {
    pub(crate) fn new(
        primary: Arc<dyn TranscriptionProvider>,
        secondary: Arc<dyn TranscriptionProvider>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            primary,
            secondary,
            metrics,
        }
    }
}

#[async_trait]
impl TranscriptionProvider for FallbackTranscription {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<String, AppError> {
        let primary_error = match self.primary.transcribe(audio_path).await {
            Ok(text) => return Ok(text),
            Err(error) => error,
        };

        let class = classify(&primary_error, self.primary.name());
        if !is_retryable_class(class.class) {
            tracing::info!(
                provider = self.primary.name(),
                class = class.class.as_str(),
                error = %primary_error,
                "primary transcription failed with non-retryable error, not attempting fallback"
            );
            return Err(primary_error);
        }

        tracing::info!(
            from_provider = self.primary.name(),
            to_provider = self.secondary.name(),
            reason = class.class.as_str(),
            "primary transcription failed, attempting fallback"
        );
        self.metrics
            .provider_fallback_total
            .with_label_values(&[self.primary.name(), self.secondary.name(), class.class.as_str()])
            .inc();

        match self.secondary.transcribe(audio_path).await {
            Ok(text) => Ok(text),
            Err(secondary_error) => {
                tracing::error!(
                    primary_error = %primary_error,
                    fallback_error = %secondary_error,
                    "both transcription providers failed"
                );
                Err(AppError::transcription(
                    format!("PROVIDER_FALLBACK_FAILED: {primary_error}"),
                    primary_error.upstream_status().unwrap_or(500),
                ))
            }
        }
    }
}

/// Assemble the transcription provider stack from configuration.
pub(crate) fn build_provider(
    choice: &ProviderChoice,
    openai_api_key: &str,
    groq_api_key: &str,
    metrics: Arc<Metrics>,
) -> Arc<dyn TranscriptionProvider> {
    let make = |name: &str| -> Arc<dyn TranscriptionProvider> {
        match name {
            "openai" => Arc::new(openai::OpenAiTranscription::new(openai_api_key)),
            _ => Arc::new(groq::GroqTranscription::new(groq_api_key)),
        }
    };

    let primary = make(&choice.provider);
    if !choice.fallback_enabled {
        return primary;
    }

    let secondary = make(&choice.fallback_provider);
    Arc::new(FallbackTranscription::new(primary, secondary, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        name: &'static str,
        calls: AtomicUsize,
        outcome: Result<&'static str, (u16, &'static str)>,
    }

    impl StubProvider {
        fn ok(name: &'static str, text: &'static str) -> Self {
            Self {
                name,
                calls: AtomicUsize::new(0),
                outcome: Ok(text),
            }
        }

        fn err(name: &'static str, status: u16, message: &'static str) -> Self {
            Self {
                name,
                calls: AtomicUsize::new(0),
                outcome: Err((status, message)),
            }
        }
    }

    #[async_trait]
    impl TranscriptionProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn transcribe(&self, _audio_path: &Path) -> Result<String, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Ok(text) => Ok(text.to_string()),
                Err((status, message)) => Err(AppError::transcription(message, status)),
            }
        }
    }

    fn metrics() -> Arc<Metrics> {
        Arc::new(Metrics::new(&Registry::new()).expect("metrics register"))
    }

    #[tokio::test]
    async fn fallback_engages_on_server_error() {
        let primary = Arc::new(StubProvider::err("groq", 503, "overloaded"));
        let secondary = Arc::new(StubProvider::ok("openai", "chop the garlic"));
        let wrapper = FallbackTranscription::new(primary.clone(), secondary.clone(), metrics());

        let text = wrapper.transcribe(Path::new("/tmp/a.mp3")).await.unwrap();

        assert_eq!(text, "chop the garlic");
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fallback_skipped_on_client_error() {
        let primary = Arc::new(StubProvider::err("groq", 400, "unsupported format"));
        let secondary = Arc::new(StubProvider::ok("openai", "unused"));
        let wrapper = FallbackTranscription::new(primary, secondary.clone(), metrics());

        let error = wrapper
            .transcribe(Path::new("/tmp/a.mp3"))
            .await
            .expect_err("should fail");

        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
        assert!(error.to_string().contains("unsupported format"));
    }

    #[tokio::test]
    async fn both_failing_yields_fallback_failed_error() {
        let primary = Arc::new(StubProvider::err("groq", 500, "down"));
        let secondary = Arc::new(StubProvider::err("openai", 500, "also down"));
        let wrapper = FallbackTranscription::new(primary, secondary, metrics());

        let error = wrapper
            .transcribe(Path::new("/tmp/a.mp3"))
            .await
            .expect_err("should fail");

        assert!(error.to_string().contains("PROVIDER_FALLBACK_FAILED"));
    }

    #[test]
    fn factory_honours_configuration() {
        let choice = ProviderChoice {
            provider: "openai".to_string(),
            fallback_enabled: false,
            fallback_provider: "groq".to_string(),
        };
        let provider = build_provider(&choice, "sk", "gsk", metrics());
        assert_eq!(provider.name(), "openai");

        let with_fallback = ProviderChoice {
            provider: "groq".to_string(),
            fallback_enabled: true,
            fallback_provider: "openai".to_string(),
        };
        let provider = build_provider(&with_fallback, "sk", "gsk", metrics());
        assert_eq!(provider.name(), "groq");
    }
}
