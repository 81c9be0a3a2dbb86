// テスト用のモックImportStore実装
// DB接続なしでパイプラインの書き込みを記録し、後で検証できるようにする

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::dao_trait::ImportStore;
use crate::store::models::{
    CategoryKind, ImageKind, ImportJob, JobStatus, NewImportJob, NewIngredient, NewInstruction,
    NewRecipe, NewSocialMediaOwner, NutritionFacts, Platform, RecipeRecord, SocialMediaOwner,
};

#[derive(Debug, Default)]
pub(crate) struct RecordedState {
    pub(crate) jobs: HashMap<Uuid, ImportJob>,
    pub(crate) status_updates: Vec<(Uuid, JobStatus, String, Option<String>)>,
    pub(crate) recipes: Vec<NewRecipe>,
    pub(crate) ingredients: HashMap<Uuid, Vec<NewIngredient>>,
    pub(crate) instructions: HashMap<Uuid, Vec<NewInstruction>>,
    pub(crate) nutrition: HashMap<Uuid, NutritionFacts>,
    pub(crate) category_ids: HashMap<(CategoryKind, String), Uuid>,
    pub(crate) category_links: Vec<(Uuid, CategoryKind, String)>,
    pub(crate) owners: Vec<SocialMediaOwner>,
    pub(crate) recipe_images: Vec<(Uuid, Uuid, ImageKind)>,
    pub(crate) thumbnails: Vec<(Uuid, Uuid)>,
    pub(crate) embeddings: HashMap<Uuid, Vec<f32>>,
    pub(crate) retention_deletes: Vec<i64>,
    pub(crate) staleness_sweeps: Vec<i64>,
}

/// Records every write so tests can assert on the resulting rows.
#[derive(Debug, Default)]
pub(crate) struct RecordingStore {
    pub(crate) state: Mutex<RecordedState>,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Seed a job row the way the API layer would before enqueueing.
    pub(crate) fn seed_job(&self, id: Uuid, user_id: Uuid, url: &str) {
        let now = Utc::now();
        self.state.lock().unwrap().jobs.insert(
            id,
            ImportJob {
                id,
                user_id,
                url: url.to_string(),
                status: JobStatus::Pending,
                progress_step: None,
                error: None,
                created_at: now,
                updated_at: now,
            },
        );
    }
}

#[async_trait]
impl ImportStore for RecordingStore {
    async fn create_import_job(&self, new_job: NewImportJob) -> Result<ImportJob> {
        self.seed_job(new_job.id, new_job.user_id, &new_job.url);
        Ok(self
            .state
            .lock()
            .unwrap()
            .jobs
            .get(&new_job.id)
            .cloned()
            .expect("job just inserted"))
    }

    async fn get_import_job(&self, id: Uuid) -> Result<Option<ImportJob>> {
        Ok(self.state.lock().unwrap().jobs.get(&id).cloned())
    }

    async fn get_import_jobs_by_user(&self, user_id: Uuid) -> Result<Vec<ImportJob>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .jobs
            .values()
            .filter(|job| job.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_import_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
        progress_step: &str,
        error: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .status_updates
            .push((id, status, progress_step.to_string(), error.map(String::from)));
        if let Some(job) = state.jobs.get_mut(&id) {
            job.status = status;
            job.progress_step = Some(progress_step.to_string());
            job.error = error.map(String::from);
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_import_jobs_older_than(&self, retention_days: i64) -> Result<u64> {
        self.state
            .lock()
            .unwrap()
            .retention_deletes
            .push(retention_days);
        Ok(0)
    }

    async fn fail_stale_import_jobs(&self, staleness_hours: i64) -> Result<u64> {
        self.state
            .lock()
            .unwrap()
            .staleness_sweeps
            .push(staleness_hours);
        Ok(0)
    }

    async fn insert_recipe(&self, new_recipe: NewRecipe) -> Result<Uuid> {
        let id = new_recipe.id;
        self.state.lock().unwrap().recipes.push(new_recipe);
        Ok(id)
    }

    async fn get_recipe(&self, id: Uuid) -> Result<Option<RecipeRecord>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .recipes
            .iter()
            .find(|recipe| recipe.id == id)
            .map(|recipe| RecipeRecord {
                id: recipe.id,
                recipe_name: recipe.recipe_name.clone(),
                description: recipe.description.clone(),
            }))
    }

    async fn insert_ingredients(
        &self,
        recipe_id: Uuid,
        ingredients: &[NewIngredient],
    ) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .ingredients
            .entry(recipe_id)
            .or_default()
            .extend_from_slice(ingredients);
        Ok(())
    }

    async fn insert_instructions(
        &self,
        recipe_id: Uuid,
        instructions: &[NewInstruction],
    ) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .instructions
            .entry(recipe_id)
            .or_default()
            .extend_from_slice(instructions);
        Ok(())
    }

    async fn insert_nutrition(&self, recipe_id: Uuid, nutrition: NutritionFacts) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .nutrition
            .insert(recipe_id, nutrition);
        Ok(())
    }

    async fn get_ingredient_names(&self, recipe_id: Uuid) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .ingredients
            .get(&recipe_id)
            .map(|list| list.iter().map(|i| i.name.clone()).collect())
            .unwrap_or_default())
    }

    async fn update_recipe_thumbnail(&self, recipe_id: Uuid, recipe_image_id: Uuid) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .thumbnails
            .push((recipe_id, recipe_image_id));
        Ok(())
    }

    async fn update_recipe_embedding(&self, recipe_id: Uuid, embedding: &[f32]) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .embeddings
            .insert(recipe_id, embedding.to_vec());
        Ok(())
    }

    async fn get_owner_by_origin(
        &self,
        origin_id: &str,
        platform: Platform,
    ) -> Result<Option<SocialMediaOwner>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .owners
            .iter()
            .find(|owner| owner.origin_id == origin_id && owner.platform == platform)
            .cloned())
    }

    async fn insert_owner(&self, owner: NewSocialMediaOwner) -> Result<SocialMediaOwner> {
        let stored = SocialMediaOwner {
            id: Uuid::new_v4(),
            username: owner.username,
            origin_id: owner.origin_id,
            platform: owner.platform,
        };
        self.state.lock().unwrap().owners.push(stored.clone());
        Ok(stored)
    }

    async fn link_category(
        &self,
        recipe_id: Uuid,
        kind: CategoryKind,
        name: &str,
    ) -> Result<Uuid> {
        let normalized = name.trim().to_lowercase();
        let mut state = self.state.lock().unwrap();
        let id = *state
            .category_ids
            .entry((kind, normalized.clone()))
            .or_insert_with(Uuid::new_v4);
        state.category_links.push((recipe_id, kind, normalized));
        Ok(id)
    }

    async fn insert_recipe_image(
        &self,
        recipe_id: Uuid,
        stored_image_id: Uuid,
        image_type: ImageKind,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.state
            .lock()
            .unwrap()
            .recipe_images
            .push((id, recipe_id, image_type));
        let _ = stored_image_id;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn link_category_is_idempotent_per_name() {
        let store = RecordingStore::new();
        let recipe_id = Uuid::new_v4();

        let first = store
            .link_category(recipe_id, CategoryKind::Cuisine, "Italian")
            .await
            .unwrap();
        let second = store
            .link_category(recipe_id, CategoryKind::Cuisine, " italian ")
            .await
            .unwrap();

        assert_eq!(first, second);
    }
}
