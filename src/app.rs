use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinHandle;

use crate::{
    api,
    auth::AuthConfig,
    clients::broadcaster::ProgressBroadcaster,
    clients::embedding::{EmbeddingProvider, OpenAiEmbeddings},
    clients::recipe::{self, chat::ChatCompletionsClient, chat::LlmContentGate, chat::ProviderKind},
    clients::scraper::{instagram::InstagramScraper, tiktok::TikTokScraper, PostScraper},
    clients::storage::StorageClient,
    clients::transcription::{self, adapter::VideoTranscriber, adapter::VideoTranscription},
    config::Config,
    observability::Telemetry,
    pipeline::{ProcessorDeps, RecipeProcessor, TaskQueue},
    queue::worker::{QueueWorker, TaskHandler},
    queue::{QueueClient, TaskSubmitter},
    scheduler::spawn_cleanup_daemon,
    store::dao::{ImportStore, PgImportStore},
    validation::content::ContentJudge,
};

/// Shared request state for the API layer.
#[derive(Clone)]
pub(crate) struct AppState {
    store: Arc<dyn ImportStore>,
    queue: Arc<dyn TaskSubmitter>,
    auth: AuthConfig,
    telemetry: Telemetry,
}

impl AppState {
    pub(crate) fn for_parts(
        store: Arc<dyn ImportStore>,
        queue: Arc<dyn TaskSubmitter>,
        auth: AuthConfig,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            store,
            queue,
            auth,
            telemetry,
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn ImportStore> {
        &self.store
    }

    pub(crate) fn queue(&self) -> &Arc<dyn TaskSubmitter> {
        &self.queue
    }

    pub(crate) fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}

/// 構成情報と依存をまとめて初期化し、アプリケーションの共有レジストリを構築する。
pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    state: AppState,
    processor: Arc<RecipeProcessor>,
    queue_client: QueueClient,
}

impl ComponentRegistry {
    /// # Errors
    /// Telemetry の初期化、ブローカー接続、HTTP クライアント構築が失敗した
    /// 場合はエラーを返す。
    pub async fn build(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let telemetry = Telemetry::new()?;
        let metrics = telemetry.metrics_arc();

        let pool = PgPoolOptions::new()
            .max_connections(25)
            .min_connections(5)
            .max_lifetime(Some(Duration::from_secs(300)))
            .test_before_acquire(true)
            .connect_lazy(config.database_url())
            .context("failed to configure database connection pool")?;
        let store: Arc<dyn ImportStore> = Arc::new(PgImportStore::new(pool));

        let queue_client = QueueClient::connect(config.redis_url())
            .await
            .context("failed to connect to the task broker")?;

        let instagram: Arc<dyn PostScraper> = Arc::new(InstagramScraper::new(
            config.proxy_server_url().unwrap_or_default(),
            config.proxy_api_key().unwrap_or_default(),
        ));
        let tiktok: Arc<dyn PostScraper> = Arc::new(TikTokScraper::new(
            config.apify_api_key().unwrap_or_default(),
        ));

        let transcription_provider = transcription::build_provider(
            config.transcription(),
            config.openai_api_key(),
            config.groq_api_key(),
            Arc::clone(&metrics),
        );
        let transcriber: Arc<dyn VideoTranscription> =
            Arc::new(VideoTranscriber::new(transcription_provider));

        let recipe_provider = recipe::build_provider(
            config.recipe_generation(),
            config.groq_api_key(),
            config.cerebras_api_key(),
            config.openai_api_key(),
            Arc::clone(&metrics),
        );

        let embedding_provider: Arc<dyn EmbeddingProvider> =
            Arc::new(OpenAiEmbeddings::new(config.openai_api_key()));

        let storage = StorageClient::new(
            config.supabase_url(),
            config.supabase_service_role_key(),
            Some(Arc::clone(&metrics)),
        );

        let broadcaster = Arc::new(ProgressBroadcaster::new(
            config.supabase_url(),
            config.supabase_service_role_key(),
        ));

        let content_judge: Arc<dyn ContentJudge> = Arc::new(LlmContentGate::new(
            ChatCompletionsClient::new(ProviderKind::Groq, config.groq_api_key()),
        ));

        let processor = Arc::new(RecipeProcessor::new(ProcessorDeps {
            store: Arc::clone(&store),
            instagram,
            tiktok,
            transcriber,
            recipe_provider,
            embedding_provider,
            storage,
            broadcaster: Some(broadcaster),
            queue: Some(Arc::new(queue_client.clone()) as Arc<dyn TaskQueue>),
            content_judge: Some(content_judge),
            metrics: Arc::clone(&metrics),
            retention_days: config.job_retention_days(),
            staleness_hours: config.job_staleness_hours(),
        }));

        let state = AppState::for_parts(
            store,
            Arc::new(queue_client.clone()) as Arc<dyn TaskSubmitter>,
            AuthConfig {
                jwt_secret: config.supabase_jwt_secret().to_string(),
                issuer: config.jwt_issuer(),
            },
            telemetry.clone(),
        );

        Ok(Self {
            config,
            telemetry,
            state,
            processor,
            queue_client,
        })
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    pub(crate) fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Start the queue worker and the cleanup daemon.
    pub fn spawn_background(&self) -> Vec<JoinHandle<()>> {
        let worker = QueueWorker::new(
            self.queue_client.clone(),
            Arc::clone(&self.processor) as Arc<dyn TaskHandler>,
            self.telemetry.metrics_arc(),
            self.config.worker_concurrency(),
        );

        vec![
            worker.spawn(),
            spawn_cleanup_daemon(self.queue_client.clone(), self.config.cleanup_interval()),
        ]
    }
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    api::router(registry.state())
}
