/// PgImportStore - ImportStoreトレイトのPostgres実装
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::dao_trait::ImportStore;
use super::{job, media, recipe};
use crate::store::models::{
    CategoryKind, ImageKind, ImportJob, JobStatus, NewImportJob, NewIngredient, NewInstruction,
    NewRecipe, NewSocialMediaOwner, NutritionFacts, Platform, RecipeRecord, SocialMediaOwner,
};

#[derive(Debug, Clone)]
pub(crate) struct PgImportStore {
    pool: PgPool,
}

impl PgImportStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportStore for PgImportStore {
    async fn create_import_job(&self, new_job: NewImportJob) -> anyhow::Result<ImportJob> {
        job::create_import_job(&self.pool, new_job).await
    }

    async fn get_import_job(&self, id: Uuid) -> anyhow::Result<Option<ImportJob>> {
        job::get_import_job(&self.pool, id).await
    }

    async fn get_import_jobs_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<ImportJob>> {
        job::get_import_jobs_by_user(&self.pool, user_id).await
    }

    async fn update_import_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
        progress_step: &str,
        error: Option<&str>,
    ) -> anyhow::Result<()> {
        job::update_import_job_status(&self.pool, id, status, progress_step, error).await
    }

    async fn delete_import_jobs_older_than(&self, retention_days: i64) -> anyhow::Result<u64> {
        job::delete_import_jobs_older_than(&self.pool, retention_days).await
    }

    async fn fail_stale_import_jobs(&self, staleness_hours: i64) -> anyhow::Result<u64> {
        job::fail_stale_import_jobs(&self.pool, staleness_hours).await
    }

    async fn insert_recipe(&self, new_recipe: NewRecipe) -> anyhow::Result<Uuid> {
        recipe::insert_recipe(&self.pool, new_recipe).await
    }

    async fn get_recipe(&self, id: Uuid) -> anyhow::Result<Option<RecipeRecord>> {
        recipe::get_recipe(&self.pool, id).await
    }

    async fn insert_ingredients(
        &self,
        recipe_id: Uuid,
        ingredients: &[NewIngredient],
    ) -> anyhow::Result<()> {
        recipe::insert_ingredients(&self.pool, recipe_id, ingredients).await
    }

    async fn insert_instructions(
        &self,
        recipe_id: Uuid,
        instructions: &[NewInstruction],
    ) -> anyhow::Result<()> {
        recipe::insert_instructions(&self.pool, recipe_id, instructions).await
    }

    async fn insert_nutrition(
        &self,
        recipe_id: Uuid,
        nutrition: NutritionFacts,
    ) -> anyhow::Result<()> {
        recipe::insert_nutrition(&self.pool, recipe_id, nutrition).await
    }

    async fn get_ingredient_names(&self, recipe_id: Uuid) -> anyhow::Result<Vec<String>> {
        recipe::get_ingredient_names(&self.pool, recipe_id).await
    }

    async fn update_recipe_thumbnail(
        &self,
        recipe_id: Uuid,
        recipe_image_id: Uuid,
    ) -> anyhow::Result<()> {
        recipe::update_recipe_thumbnail(&self.pool, recipe_id, recipe_image_id).await
    }

    async fn update_recipe_embedding(
        &self,
        recipe_id: Uuid,
        embedding: &[f32],
    ) -> anyhow::Result<()> {
        recipe::update_recipe_embedding(&self.pool, recipe_id, embedding).await
    }

    async fn get_owner_by_origin(
        &self,
        origin_id: &str,
        platform: Platform,
    ) -> anyhow::Result<Option<SocialMediaOwner>> {
        media::get_owner_by_origin(&self.pool, origin_id, platform).await
    }

    async fn insert_owner(&self, owner: NewSocialMediaOwner) -> anyhow::Result<SocialMediaOwner> {
        media::insert_owner(&self.pool, owner).await
    }

    async fn link_category(
        &self,
        recipe_id: Uuid,
        kind: CategoryKind,
        name: &str,
    ) -> anyhow::Result<Uuid> {
        recipe::link_category(&self.pool, recipe_id, kind, name).await
    }

    async fn insert_recipe_image(
        &self,
        recipe_id: Uuid,
        stored_image_id: Uuid,
        image_type: ImageKind,
    ) -> anyhow::Result<Uuid> {
        media::insert_recipe_image(&self.pool, recipe_id, stored_image_id, image_type).await
    }
}
