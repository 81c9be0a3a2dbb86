//! The follow-up task that gives a saved recipe its semantic vector.

use anyhow::{Context, Result};

use crate::clients::embedding::EmbeddingProvider;
use crate::queue::GenerateEmbeddingPayload;
use crate::store::dao::ImportStore;

use super::processor::RecipeProcessor;

impl RecipeProcessor {
    /// Load the recipe, compose the embedding input and write the vector.
    ///
    /// Any error fails the task; the queue's redelivery retries the whole
    /// step.
    pub(crate) async fn handle_generate_embedding(
        &self,
        payload: GenerateEmbeddingPayload,
    ) -> Result<()> {
        let recipe_id = payload.recipe_id;

        let recipe = self
            .store
            .get_recipe(recipe_id)
            .await?
            .with_context(|| format!("recipe not found: {recipe_id}"))?;

        let mut text = recipe.recipe_name.clone();
        if let Some(description) = recipe.description.as_deref() {
            text.push(' ');
            text.push_str(description);
        }
        for name in self.store.get_ingredient_names(recipe_id).await? {
            text.push(' ');
            text.push_str(&name);
        }

        let embedding = self
            .embedding_provider
            .generate_embedding(&text)
            .await
            .context("failed to generate embedding")?;

        self.store
            .update_recipe_embedding(recipe_id, &embedding)
            .await
            .context("failed to save embedding")?;

        tracing::info!(
            recipe_id = %recipe_id,
            dimensions = embedding.len(),
            "embedding generated and saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use prometheus::Registry;
    use uuid::Uuid;

    use crate::clients::embedding::EmbeddingProvider;
    use crate::clients::storage::StorageClient;
    use crate::observability::metrics::Metrics;
    use crate::pipeline::processor::tests::{five_step_recipe, StubRecipeProvider};
    use crate::pipeline::processor::{ProcessorDeps, RecipeProcessor};
    use crate::pipeline::persist;
    use crate::queue::GenerateEmbeddingPayload;
    use crate::store::dao::mock::RecordingStore;
    use crate::store::dao::ImportStore;
    use crate::store::models::{NewRecipe, Platform};
    use crate::util::AppError;

    struct RecordingEmbeddings {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingEmbeddings {
        async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, AppError> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(vec![1.0, 2.0, 3.0])
        }
    }

    struct NeverScrapes;

    #[async_trait]
    impl crate::clients::scraper::PostScraper for NeverScrapes {
        async fn scrape(
            &self,
            _post_url: &str,
        ) -> Result<crate::clients::scraper::ScrapedPost, AppError> {
            Err(AppError::scraper("unused", 500))
        }
    }

    struct NeverTranscribes;

    #[async_trait]
    impl crate::clients::transcription::adapter::VideoTranscription for NeverTranscribes {
        async fn transcribe_video(&self, _video_url: &str) -> Result<String, AppError> {
            Err(AppError::transcription("unused", 500))
        }
    }

    fn processor_with(
        store: Arc<RecordingStore>,
        embeddings: Arc<RecordingEmbeddings>,
    ) -> RecipeProcessor {
        RecipeProcessor::new(ProcessorDeps {
            store,
            instagram: Arc::new(NeverScrapes),
            tiktok: Arc::new(NeverScrapes),
            transcriber: Arc::new(NeverTranscribes),
            recipe_provider: StubRecipeProvider::ok("groq", five_step_recipe()),
            embedding_provider: embeddings,
            storage: StorageClient::new("http://127.0.0.1:1", "unused", None),
            broadcaster: None,
            queue: None,
            content_judge: None,
            metrics: Arc::new(Metrics::new(&Registry::new()).expect("metrics register")),
            retention_days: 30,
            staleness_hours: 2,
        })
    }

    #[tokio::test]
    async fn embedding_input_concatenates_name_description_and_ingredients() {
        let store = Arc::new(RecordingStore::new());
        let recipe_id = Uuid::new_v4();
        store
            .insert_recipe(NewRecipe {
                id: recipe_id,
                created_by: Uuid::new_v4(),
                recipe_name: "Miso Soup".to_string(),
                description: Some("Light dashi broth".to_string()),
                prep_time: None,
                cooking_time: None,
                original_serving_size: None,
                difficulty_rating: None,
                origin: Platform::TikTok,
                url: "https://vm.tiktok.com/abc".to_string(),
                owner_id: None,
            })
            .await
            .unwrap();
        store
            .insert_ingredients(
                recipe_id,
                &persist::build_ingredients(&five_step_recipe()),
            )
            .await
            .unwrap();

        let embeddings = Arc::new(RecordingEmbeddings {
            seen: Mutex::new(Vec::new()),
        });
        let processor = processor_with(store.clone(), embeddings.clone());

        processor
            .handle_generate_embedding(GenerateEmbeddingPayload { recipe_id })
            .await
            .expect("embedding task succeeds");

        let seen = embeddings.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("Miso Soup Light dashi broth"));
        assert!(seen[0].contains("rigatoni"));

        let state = store.state.lock().unwrap();
        assert_eq!(state.embeddings[&recipe_id], vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn missing_recipe_fails_the_task() {
        let store = Arc::new(RecordingStore::new());
        let embeddings = Arc::new(RecordingEmbeddings {
            seen: Mutex::new(Vec::new()),
        });
        let processor = processor_with(store, embeddings);

        let error = processor
            .handle_generate_embedding(GenerateEmbeddingPayload {
                recipe_id: Uuid::new_v4(),
            })
            .await
            .expect_err("unknown recipe fails");

        assert!(error.to_string().contains("recipe not found"));
    }
}
