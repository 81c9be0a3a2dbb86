//! The import state machine: one dequeued job in, one terminal status out.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use uuid::Uuid;

use crate::clients::broadcaster::{ProgressBroadcaster, ProgressUpdate};
use crate::clients::embedding::EmbeddingProvider;
use crate::clients::recipe::RecipeProvider;
use crate::clients::scraper::{detect_platform, PostScraper};
use crate::clients::storage::StorageClient;
use crate::clients::transcription::adapter::VideoTranscription;
use crate::observability::metrics::Metrics;
use crate::queue::{GenerateEmbeddingPayload, ProcessRecipePayload, Task, TaskKind};
use crate::queue::worker::TaskHandler;
use crate::store::dao::ImportStore;
use crate::store::models::{JobStatus, NewRecipe, Platform};
use crate::util::AppError;
use crate::validation::content::ContentJudge;
use crate::validation::{validate_content, validate_recipe, OutputValidationConfig};

use super::persist;
use super::TaskQueue;

/// Everything the processor needs, wired once at boot.
pub(crate) struct ProcessorDeps {
    pub(crate) store: Arc<dyn ImportStore>,
    pub(crate) instagram: Arc<dyn PostScraper>,
    pub(crate) tiktok: Arc<dyn PostScraper>,
    pub(crate) transcriber: Arc<dyn VideoTranscription>,
    pub(crate) recipe_provider: Arc<dyn RecipeProvider>,
    pub(crate) embedding_provider: Arc<dyn EmbeddingProvider>,
    pub(crate) storage: StorageClient,
    pub(crate) broadcaster: Option<Arc<ProgressBroadcaster>>,
    pub(crate) queue: Option<Arc<dyn TaskQueue>>,
    pub(crate) content_judge: Option<Arc<dyn ContentJudge>>,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) retention_days: i64,
    pub(crate) staleness_hours: i64,
}

pub(crate) struct RecipeProcessor {
    pub(super) store: Arc<dyn ImportStore>,
    instagram: Arc<dyn PostScraper>,
    tiktok: Arc<dyn PostScraper>,
    transcriber: Arc<dyn VideoTranscription>,
    recipe_provider: Arc<dyn RecipeProvider>,
    pub(super) embedding_provider: Arc<dyn EmbeddingProvider>,
    storage: StorageClient,
    broadcaster: Option<Arc<ProgressBroadcaster>>,
    queue: Option<Arc<dyn TaskQueue>>,
    content_judge: Option<Arc<dyn ContentJudge>>,
    metrics: Arc<Metrics>,
    http: Client,
    pub(super) retention_days: i64,
    pub(super) staleness_hours: i64,
}

impl RecipeProcessor {
    pub(crate) fn new(deps: ProcessorDeps) -> Self {
        Self {
            store: deps.store,
            instagram: deps.instagram,
            tiktok: deps.tiktok,
            transcriber: deps.transcriber,
            recipe_provider: deps.recipe_provider,
            embedding_provider: deps.embedding_provider,
            storage: deps.storage,
            broadcaster: deps.broadcaster,
            queue: deps.queue,
            content_judge: deps.content_judge,
            metrics: deps.metrics,
            http: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with static config"),
            retention_days: deps.retention_days,
            staleness_hours: deps.staleness_hours,
        }
    }

    /// Drive one import job through scrape → validate → transcribe →
    /// generate → validate → persist. Returning an error hands the task back
    /// to the queue; the terminal `failed` status has been written by then
    /// so API consumers see it promptly.
    pub(crate) async fn handle_process_recipe(
        &self,
        payload: ProcessRecipePayload,
    ) -> Result<()> {
        let job_id = payload.job_id;
        let user_id = payload.user_id;
        let url = payload.url.as_str();

        tracing::info!(job_id = %job_id, url, "processing recipe import");

        // redelivery guard: the job row is the outer idempotency key
        if let Ok(Some(job)) = self.store.get_import_job(job_id).await {
            if job.status == JobStatus::Completed {
                tracing::info!(job_id = %job_id, "job already completed, skipping redelivery");
                return Ok(());
            }
        }

        self.update_progress(job_id, user_id, JobStatus::Executing, "Fetching post content...")
            .await;

        let Some(platform) = detect_platform(url) else {
            self.mark_failed(job_id, user_id, "Invalid URL: must be Instagram or TikTok")
                .await;
            return Err(anyhow!("invalid URL"));
        };

        let scraper: &Arc<dyn PostScraper> = match platform {
            Platform::Instagram => &self.instagram,
            Platform::TikTok => &self.tiktok,
        };

        let post = match scraper.scrape(url).await {
            Ok(post) => {
                self.metrics
                    .scrapes_total
                    .with_label_values(&[platform.as_str(), "success"])
                    .inc();
                post
            }
            Err(error) => {
                self.metrics
                    .scrapes_total
                    .with_label_values(&[platform.as_str(), "failure"])
                    .inc();
                self.mark_failed(
                    job_id,
                    user_id,
                    &format!("{} scrape failed: {error}", platform.as_str()),
                )
                .await;
                return Err(error.into());
            }
        };

        // A sparse caption alone is not a verdict when there is a video:
        // the gate re-runs with the transcript before anything is generated.
        let verdict = validate_content(
            &post.caption,
            "",
            platform,
            self.content_judge.as_deref(),
        )
        .await;
        if !verdict.is_valid && post.video_url.is_none() {
            let message = format!("CONTENT_NOT_RECIPE: {}", verdict.reason);
            self.mark_failed(job_id, user_id, &message).await;
            return Err(AppError::validation(message, "CONTENT_NOT_RECIPE").into());
        }
        tracing::info!(
            job_id = %job_id,
            is_valid = verdict.is_valid,
            confidence = ?verdict.confidence,
            reason = %verdict.reason,
            "content validation on caption"
        );

        let mut transcript = String::new();
        if let Some(video_url) = post.video_url.as_deref() {
            self.update_progress(
                job_id,
                user_id,
                JobStatus::Executing,
                "Transcribing video content...",
            )
            .await;

            transcript = match self.transcriber.transcribe_video(video_url).await {
                Ok(text) => text,
                Err(error) => {
                    self.mark_failed(job_id, user_id, &format!("Transcription failed: {error}"))
                        .await;
                    return Err(error.into());
                }
            };
        }

        if !verdict.is_valid {
            let second_look = validate_content(
                &post.caption,
                &transcript,
                platform,
                self.content_judge.as_deref(),
            )
            .await;
            if !second_look.is_valid {
                let message = format!("CONTENT_NOT_RECIPE: {}", second_look.reason);
                self.mark_failed(job_id, user_id, &message).await;
                return Err(AppError::validation(message, "CONTENT_NOT_RECIPE").into());
            }
            tracing::info!(
                job_id = %job_id,
                confidence = ?second_look.confidence,
                "content validation passed via transcript"
            );
        }

        self.update_progress(
            job_id,
            user_id,
            JobStatus::Executing,
            "Generating recipe with AI...",
        )
        .await;

        let generated = match self
            .recipe_provider
            .generate_recipe(&post.caption, &transcript, platform)
            .await
        {
            Ok(generated) => generated,
            Err(error) => {
                self.mark_failed(job_id, user_id, &format!("Recipe generation failed: {error}"))
                    .await;
                return Err(error.into());
            }
        };

        let quality = validate_recipe(&generated, OutputValidationConfig::default());
        if !quality.is_valid {
            let message = format!(
                "LOW_QUALITY_RECIPE: quality score {}: {}",
                quality.quality_score,
                quality.issues.join(", ")
            );
            self.mark_failed(job_id, user_id, &message).await;
            return Err(AppError::validation(message, "LOW_QUALITY_RECIPE").into());
        }
        tracing::info!(
            job_id = %job_id,
            quality_score = quality.quality_score,
            has_placeholders = quality.has_placeholders,
            "recipe validation passed"
        );

        self.update_progress(
            job_id,
            user_id,
            JobStatus::Executing,
            "Saving recipe to database...",
        )
        .await;

        let mut owner_id = None;
        if post.owner_id.is_some() {
            self.update_progress(job_id, user_id, JobStatus::Executing, "Saving recipe owner...")
                .await;
            owner_id =
                persist::resolve_owner(&self.store, &self.storage, &self.http, &post, platform)
                    .await;
        }

        let recipe_id = Uuid::new_v4();
        let header = &generated.recipe;
        let new_recipe = NewRecipe {
            id: recipe_id,
            created_by: user_id,
            recipe_name: header.recipe_name.clone(),
            description: {
                let trimmed = header.description.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            },
            prep_time: header.prep_time,
            cooking_time: header.cooking_time,
            original_serving_size: header.original_servings,
            difficulty_rating: header.difficulty_rating,
            origin: platform,
            url: url.to_string(),
            owner_id,
        };

        if let Err(error) = self.store.insert_recipe(new_recipe).await {
            self.mark_failed(job_id, user_id, &format!("Failed to save recipe: {error}"))
                .await;
            return Err(error);
        }

        persist::persist_children(&self.store, recipe_id, &generated).await;

        if let Some(image_url) = post.image_url.as_deref() {
            self.update_progress(
                job_id,
                user_id,
                JobStatus::Executing,
                "Processing recipe image...",
            )
            .await;
            persist::attach_thumbnail(&self.store, &self.storage, &self.http, recipe_id, image_url)
                .await;
        }

        if let Some(queue) = &self.queue {
            match queue
                .enqueue_embedding(&GenerateEmbeddingPayload { recipe_id })
                .await
            {
                Ok(task_id) => {
                    tracing::info!(recipe_id = %recipe_id, task_id = %task_id, "enqueued embedding task");
                }
                Err(error) => {
                    tracing::error!(recipe_id = %recipe_id, error = %error, "failed to enqueue embedding task");
                }
            }
        }

        self.update_progress(
            job_id,
            user_id,
            JobStatus::Completed,
            "Recipe saved successfully!",
        )
        .await;

        Ok(())
    }

    pub(super) async fn update_progress(
        &self,
        job_id: Uuid,
        user_id: Uuid,
        status: JobStatus,
        message: &str,
    ) {
        tracing::info!(job_id = %job_id, status = status.as_str(), message, "progress update");

        if let Err(error) = self
            .store
            .update_import_job_status(job_id, status, message, None)
            .await
        {
            tracing::error!(job_id = %job_id, error = %error, "failed to update job status");
        }

        self.broadcast(job_id, user_id, status, message).await;
    }

    pub(super) async fn mark_failed(&self, job_id: Uuid, user_id: Uuid, error_message: &str) {
        tracing::error!(job_id = %job_id, error = error_message, "job failed");

        if let Err(error) = self
            .store
            .update_import_job_status(job_id, JobStatus::Failed, "Failed", Some(error_message))
            .await
        {
            tracing::error!(job_id = %job_id, error = %error, "failed to persist failed status");
        }

        self.broadcast(job_id, user_id, JobStatus::Failed, error_message)
            .await;
    }

    async fn broadcast(&self, job_id: Uuid, user_id: Uuid, status: JobStatus, message: &str) {
        let Some(broadcaster) = &self.broadcaster else {
            return;
        };

        let update = ProgressUpdate {
            job_id: job_id.to_string(),
            status,
            message: message.to_string(),
        };

        if let Err(error) = broadcaster.broadcast(&user_id.to_string(), update).await {
            tracing::warn!(job_id = %job_id, error = %error, "progress broadcast dropped");
            self.metrics.broadcast_failures_total.inc();
        }
    }
}

#[async_trait]
impl TaskHandler for RecipeProcessor {
    async fn handle(&self, task: &Task) -> Result<()> {
        match task.kind {
            TaskKind::ProcessRecipe => {
                let payload: ProcessRecipePayload = serde_json::from_value(task.payload.clone())
                    .map_err(|error| anyhow!("failed to unmarshal payload: {error}"))?;
                self.handle_process_recipe(payload).await
            }
            TaskKind::GenerateEmbedding => {
                let payload: GenerateEmbeddingPayload =
                    serde_json::from_value(task.payload.clone())
                        .map_err(|error| anyhow!("failed to unmarshal payload: {error}"))?;
                self.handle_generate_embedding(payload).await
            }
            TaskKind::CleanupJobs => self.handle_cleanup().await,
        }
    }
}
