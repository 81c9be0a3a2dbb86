pub(crate) mod chat;
pub(crate) mod errors;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProviderChoice;
use crate::observability::metrics::Metrics;
use crate::prompts;
use crate::schema::GeneratedRecipe;
use crate::store::models::Platform;
use crate::util::AppError;

use chat::{ChatCompletionsClient, ProviderKind};
use errors::{classify, is_retryable_class};

/// Structured recipe extraction from caption + transcript.
#[async_trait]
pub(crate) trait RecipeProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate_recipe(
        &self,
        caption: &str,
        transcript: &str,
        platform: Platform,
    ) -> Result<GeneratedRecipe, AppError>;
}

/// A generation provider backed by one chat-completions endpoint.
pub(crate) struct ChatRecipeProvider {
    chat: ChatCompletionsClient,
}

impl ChatRecipeProvider {
    pub(crate) fn new(chat: ChatCompletionsClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl RecipeProvider for ChatRecipeProvider {
    fn name(&self) -> &'static str {
        self.chat.kind().name()
    }

    async fn generate_recipe(
        &self,
        caption: &str,
        transcript: &str,
        platform: Platform,
    ) -> Result<GeneratedRecipe, AppError> {
        let system_prompt = prompts::build_recipe_prompt(platform.as_str());

        let mut user_content = caption.to_string();
        if !transcript.is_empty() {
            user_content.push_str("\n\nVideo Transcript:\n");
            user_content.push_str(transcript);
        }

        let content = self.chat.complete(&system_prompt, &user_content).await?;

        serde_json::from_str(&content).map_err(|error| {
            AppError::Internal(format!(
                "failed to parse generated recipe from {}: {error}",
                self.name()
            ))
        })
    }
}

/// Composite that reroutes to a secondary provider on classifier-retryable
/// primary failures.
pub(crate) struct FallbackRecipeProvider {
    primary: Arc<dyn RecipeProvider>,
    secondary: Arc<dyn RecipeProvider>,
    metrics: Arc<Metrics>,
}

impl FallbackRecipeProvider {
    pub(crate) fn new(
        primary: Arc<dyn RecipeProvider>,
        secondary: Arc<dyn RecipeProvider>,
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
impl RecipeProvider for FallbackRecipeProvider {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn generate_recipe(
        &self,
        caption: &str,
        transcript: &str,
        platform: Platform,
    ) -> Result<GeneratedRecipe, AppError> {
        let primary_error = match self
            .primary
            .generate_recipe(caption, transcript, platform)
            .await
        {
            Ok(recipe) => return Ok(recipe),
            Err(error) => error,
        };

        let classified = classify(&primary_error, self.primary.name());
        if !is_retryable_class(classified.class) {
            tracing::info!(
                provider = self.primary.name(),
                class = classified.class.as_str(),
                error = %primary_error,
                platform = platform.as_str(),
                "primary generation failed with non-retryable error, not attempting fallback"
            );
            return Err(primary_error);
        }

        tracing::info!(
            from_provider = self.primary.name(),
            to_provider = self.secondary.name(),
            reason = classified.class.as_str(),
            platform = platform.as_str(),
            "primary generation failed, attempting fallback"
        );
        self.metrics
            .provider_fallback_total
            .with_label_values(&[
                self.primary.name(),
                self.secondary.name(),
                classified.class.as_str(),
            ])
            .inc();

        match self
            .secondary
            .generate_recipe(caption, transcript, platform)
            .await
        {
            Ok(recipe) => Ok(recipe),
            Err(secondary_error) => {
                tracing::error!(
                    primary_error = %primary_error,
                    fallback_error = %secondary_error,
                    "both generation providers failed"
                );
                Err(AppError::generation(
                    format!("PROVIDER_FALLBACK_FAILED: {primary_error}"),
                    primary_error.upstream_status().unwrap_or(500),
                ))
            }
        }
    }
}

/// Assemble the generation provider stack from configuration.
pub(crate) fn build_provider(
    choice: &ProviderChoice,
    groq_api_key: &str,
    cerebras_api_key: Option<&str>,
    openai_api_key: &str,
    metrics: Arc<Metrics>,
) -> Arc<dyn RecipeProvider> {
    let make = |name: &str| -> Arc<dyn RecipeProvider> {
        let kind = ProviderKind::from_name(name);
        let api_key = match kind {
            ProviderKind::Groq => groq_api_key,
            ProviderKind::Cerebras => cerebras_api_key.unwrap_or_default(),
            ProviderKind::OpenAi => openai_api_key,
        };
        Arc::new(ChatRecipeProvider::new(ChatCompletionsClient::new(
            kind, api_key,
        )))
    };

    let primary = make(&choice.provider);
    if !choice.fallback_enabled {
        return primary;
    }

    let secondary = make(&choice.fallback_provider);
    Arc::new(FallbackRecipeProvider::new(primary, secondary, metrics))
}
