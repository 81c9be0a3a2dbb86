/// ImportStoreトレイト - データアクセス層の抽象化
use async_trait::async_trait;
use uuid::Uuid;

use crate::store::models::{
    CategoryKind, ImageKind, ImportJob, JobStatus, NewImportJob, NewIngredient, NewInstruction,
    NewRecipe, NewSocialMediaOwner, NutritionFacts, Platform, RecipeRecord, SocialMediaOwner,
};

#[async_trait]
pub(crate) trait ImportStore: Send + Sync {
    // Import jobs
    async fn create_import_job(&self, job: NewImportJob) -> anyhow::Result<ImportJob>;

    async fn get_import_job(&self, id: Uuid) -> anyhow::Result<Option<ImportJob>>;

    async fn get_import_jobs_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<ImportJob>>;

    /// Overwrites status, progress step and error text in one statement so
    /// redelivered tasks stay idempotent on the job row.
    async fn update_import_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
        progress_step: &str,
        error: Option<&str>,
    ) -> anyhow::Result<()>;

    async fn delete_import_jobs_older_than(&self, retention_days: i64) -> anyhow::Result<u64>;

    async fn fail_stale_import_jobs(&self, staleness_hours: i64) -> anyhow::Result<u64>;

    // Recipes and children
    async fn insert_recipe(&self, recipe: NewRecipe) -> anyhow::Result<Uuid>;

    async fn get_recipe(&self, id: Uuid) -> anyhow::Result<Option<RecipeRecord>>;

    async fn insert_ingredients(
        &self,
        recipe_id: Uuid,
        ingredients: &[NewIngredient],
    ) -> anyhow::Result<()>;

    async fn insert_instructions(
        &self,
        recipe_id: Uuid,
        instructions: &[NewInstruction],
    ) -> anyhow::Result<()>;

    async fn insert_nutrition(
        &self,
        recipe_id: Uuid,
        nutrition: NutritionFacts,
    ) -> anyhow::Result<()>;

    async fn get_ingredient_names(&self, recipe_id: Uuid) -> anyhow::Result<Vec<String>>;

    async fn update_recipe_thumbnail(
        &self,
        recipe_id: Uuid,
        recipe_image_id: Uuid,
    ) -> anyhow::Result<()>;

    async fn update_recipe_embedding(
        &self,
        recipe_id: Uuid,
        embedding: &[f32],
    ) -> anyhow::Result<()>;

    // Social media owners
    async fn get_owner_by_origin(
        &self,
        origin_id: &str,
        platform: Platform,
    ) -> anyhow::Result<Option<SocialMediaOwner>>;

    async fn insert_owner(&self, owner: NewSocialMediaOwner) -> anyhow::Result<SocialMediaOwner>;

    // Category dictionaries
    /// Get-or-create the dictionary entry for a normalized name and link it
    /// to the recipe. Returns the dictionary id.
    async fn link_category(
        &self,
        recipe_id: Uuid,
        kind: CategoryKind,
        name: &str,
    ) -> anyhow::Result<Uuid>;

    // Recipe images
    async fn insert_recipe_image(
        &self,
        recipe_id: Uuid,
        stored_image_id: Uuid,
        image_type: ImageKind,
    ) -> anyhow::Result<Uuid>;
}
