use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Source platform of an imported post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Platform {
    Instagram,
    TikTok,
}

impl Platform {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
        }
    }

    pub(crate) fn from_str(s: &str) -> Option<Self> {
        match s {
            "instagram" => Some(Platform::Instagram),
            "tiktok" => Some(Platform::TikTok),
            _ => None,
        }
    }
}

/// Lifecycle of an import job. Terminal states are `completed` and `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum JobStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl JobStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Executing => "executing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub(crate) fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "executing" => Some(JobStatus::Executing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    #[allow(dead_code)]
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ImportJob {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    #[allow(dead_code)]
    pub(crate) url: String,
    pub(crate) status: JobStatus,
    pub(crate) progress_step: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewImportJob {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) url: String,
}

#[derive(Debug, Clone)]
pub(crate) struct NewRecipe {
    pub(crate) id: Uuid,
    pub(crate) created_by: Uuid,
    pub(crate) recipe_name: String,
    pub(crate) description: Option<String>,
    pub(crate) prep_time: Option<i32>,
    pub(crate) cooking_time: Option<i32>,
    pub(crate) original_serving_size: Option<i32>,
    pub(crate) difficulty_rating: Option<i16>,
    pub(crate) origin: Platform,
    pub(crate) url: String,
    pub(crate) owner_id: Option<Uuid>,
}

/// The slice of a recipe row the embedding task needs.
#[derive(Debug, Clone)]
pub(crate) struct RecipeRecord {
    pub(crate) id: Uuid,
    pub(crate) recipe_name: String,
    pub(crate) description: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewIngredient {
    pub(crate) name: String,
    pub(crate) quantity: Option<String>,
    pub(crate) unit: Option<String>,
    pub(crate) original_quantity: Option<String>,
    pub(crate) original_unit: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct NewInstruction {
    pub(crate) step_number: i32,
    pub(crate) instruction: String,
}

/// Grams, persisted at scale 2.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NutritionFacts {
    pub(crate) protein: f64,
    pub(crate) carbs: f64,
    pub(crate) fat: f64,
    pub(crate) fiber: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct SocialMediaOwner {
    pub(crate) id: Uuid,
    #[allow(dead_code)]
    pub(crate) username: String,
    #[allow(dead_code)]
    pub(crate) origin_id: String,
    pub(crate) platform: Platform,
}

#[derive(Debug, Clone)]
pub(crate) struct NewSocialMediaOwner {
    pub(crate) username: String,
    pub(crate) profile_pic_stored_image_id: Option<String>,
    pub(crate) origin_id: String,
    pub(crate) platform: Platform,
}

/// The five interned category dictionaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CategoryKind {
    Cuisine,
    MealType,
    Occasion,
    DietaryRestriction,
    Equipment,
}

impl CategoryKind {
    pub(crate) const ALL: [CategoryKind; 5] = [
        CategoryKind::Cuisine,
        CategoryKind::MealType,
        CategoryKind::Occasion,
        CategoryKind::DietaryRestriction,
        CategoryKind::Equipment,
    ];

    pub(crate) fn table(self) -> &'static str {
        match self {
            CategoryKind::Cuisine => "cuisine_categories",
            CategoryKind::MealType => "meal_types",
            CategoryKind::Occasion => "occasions",
            CategoryKind::DietaryRestriction => "dietary_restrictions",
            CategoryKind::Equipment => "equipment",
        }
    }

    pub(crate) fn join_table(self) -> &'static str {
        match self {
            CategoryKind::Cuisine => "recipe_cuisine_categories",
            CategoryKind::MealType => "recipe_meal_types",
            CategoryKind::Occasion => "recipe_occasions",
            CategoryKind::DietaryRestriction => "recipe_dietary_restrictions",
            CategoryKind::Equipment => "recipe_equipment",
        }
    }

    pub(crate) fn join_column(self) -> &'static str {
        match self {
            CategoryKind::Cuisine => "cuisine_category_id",
            CategoryKind::MealType => "meal_type_id",
            CategoryKind::Occasion => "occasion_id",
            CategoryKind::DietaryRestriction => "dietary_restriction_id",
            CategoryKind::Equipment => "equipment_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageKind {
    Full,
    #[allow(dead_code)]
    Thumbnail,
}

impl ImageKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ImageKind::Full => "full",
            ImageKind::Thumbnail => "thumbnail",
        }
    }
}
