//! Persistence helpers turning a validated `GeneratedRecipe` into rows.

use std::sync::Arc;

use reqwest::Client;
use uuid::Uuid;

use crate::clients::scraper::ScrapedPost;
use crate::clients::storage::{StorageClient, USER_AVATARS_PREFIX, POST_IMAGES_PREFIX, RECIPES_BUCKET};
use crate::schema::GeneratedRecipe;
use crate::store::dao::ImportStore;
use crate::store::models::{
    CategoryKind, ImageKind, NewIngredient, NewInstruction, NewSocialMediaOwner, NutritionFacts,
    Platform,
};
use crate::util::parallel::run_parallel;
use crate::util::AppError;
use crate::validation::recipe::is_placeholder;

/// Map generated ingredients to rows.
///
/// Placeholder names are dropped (they passed the ratio gate but must not be
/// persisted), whole quantities render without decimals, and a zero quantity
/// leaves both quantity and unit empty.
pub(super) fn build_ingredients(generated: &GeneratedRecipe) -> Vec<NewIngredient> {
    generated
        .ingredients
        .iter()
        .filter(|ingredient| !is_placeholder(&ingredient.name))
        .map(|ingredient| {
            let quantity_value = ingredient
                .quantity
                .as_ref()
                .map(crate::schema::QuantityValue::as_f64)
                .unwrap_or(0.0);
            let quantity = (quantity_value > 0.0)
                .then(|| crate::schema::generated_recipe::format_number(quantity_value));
            let unit = quantity
                .is_some()
                .then(|| ingredient.unit.trim())
                .filter(|unit| !unit.is_empty())
                .map(ToString::to_string);

            let original_quantity = ingredient
                .original_quantity
                .as_ref()
                .filter(|value| !value.is_empty())
                .map(crate::schema::QuantityValue::as_text);
            let original_unit = {
                let trimmed = ingredient.original_unit.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            };

            NewIngredient {
                name: ingredient.name.trim().to_string(),
                quantity,
                unit,
                original_quantity,
                original_unit,
            }
        })
        .collect()
}

/// Instructions get dense 1-based step numbers regardless of what the model
/// emitted.
pub(super) fn build_instructions(generated: &GeneratedRecipe) -> Vec<NewInstruction> {
    generated
        .instructions
        .iter()
        .enumerate()
        .map(|(index, instruction)| NewInstruction {
            step_number: index as i32 + 1,
            instruction: instruction.instruction.clone(),
        })
        .collect()
}

/// Insert children and category joins. Individual failures are logged and
/// skipped; the recipe row already exists.
pub(super) async fn persist_children(
    store: &Arc<dyn ImportStore>,
    recipe_id: Uuid,
    generated: &GeneratedRecipe,
) {
    let ingredients = build_ingredients(generated);
    if let Err(error) = store.insert_ingredients(recipe_id, &ingredients).await {
        tracing::error!(recipe_id = %recipe_id, error = %error, "failed to save ingredients");
    }

    let instructions = build_instructions(generated);
    if let Err(error) = store.insert_instructions(recipe_id, &instructions).await {
        tracing::error!(recipe_id = %recipe_id, error = %error, "failed to save instructions");
    }

    let nutrition = generated.nutrition;
    if nutrition.protein > 0.0 || nutrition.carbs > 0.0 {
        let facts = NutritionFacts {
            protein: nutrition.protein,
            carbs: nutrition.carbs,
            fat: nutrition.fat,
            fiber: nutrition.fiber,
        };
        if let Err(error) = store.insert_nutrition(recipe_id, facts).await {
            tracing::error!(recipe_id = %recipe_id, error = %error, "failed to save nutrition");
        }
    }

    persist_categories(store, recipe_id, generated).await;
}

/// The five dictionaries are independent, so their joins are issued
/// concurrently.
async fn persist_categories(
    store: &Arc<dyn ImportStore>,
    recipe_id: Uuid,
    generated: &GeneratedRecipe,
) {
    let mut operations = Vec::new();

    for kind in CategoryKind::ALL {
        let names = match kind {
            CategoryKind::Cuisine => &generated.cuisine_categories,
            CategoryKind::MealType => &generated.meal_types,
            CategoryKind::Occasion => &generated.occasions,
            CategoryKind::DietaryRestriction => &generated.dietary_restrictions,
            CategoryKind::Equipment => &generated.equipment,
        };

        for name in names {
            let store = Arc::clone(store);
            let name = name.clone();
            operations.push(async move {
                store
                    .link_category(recipe_id, kind, &name)
                    .await
                    .map(|_| ())
            });
        }
    }

    for error in run_parallel(operations).await {
        tracing::error!(recipe_id = %recipe_id, error = %error, "failed to link category");
    }
}

pub(super) async fn download_image(http: &Client, url: &str) -> Result<Vec<u8>, AppError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|error| AppError::Internal(format!("failed to download image: {error}")))?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(AppError::Internal(format!(
            "failed to download image: status {status}"
        )));
    }

    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|error| AppError::Internal(format!("failed to read image body: {error}")))
}

/// Look up the post's author, creating the row (with a best-effort avatar)
/// on first sight. Any failure just means the recipe carries no owner.
pub(super) async fn resolve_owner(
    store: &Arc<dyn ImportStore>,
    storage: &StorageClient,
    http: &Client,
    post: &ScrapedPost,
    platform: Platform,
) -> Option<Uuid> {
    let origin_id = post.owner_id.as_deref()?;

    match store.get_owner_by_origin(origin_id, platform).await {
        Ok(Some(owner)) => return Some(owner.id),
        Ok(None) => {}
        Err(error) => {
            tracing::error!(error = %error, "owner lookup failed");
            return None;
        }
    }

    let mut profile_pic_stored_image_id = None;
    if let Some(avatar_url) = post.owner_avatar_url.as_deref() {
        match download_image(http, avatar_url).await {
            Ok(bytes) => {
                let hash = crate::clients::storage::hash_content(&bytes);
                let path = format!("{USER_AVATARS_PREFIX}/{hash}");
                match storage
                    .upload_with_hash(RECIPES_BUCKET, &path, avatar_url, &bytes)
                    .await
                {
                    Ok(_) => match storage.get_by_hash(&hash).await {
                        Ok(Some(record)) => profile_pic_stored_image_id = Some(record.id),
                        Ok(None) => {}
                        Err(error) => {
                            tracing::warn!(error = %error, "stored avatar lookup failed");
                        }
                    },
                    Err(error) => {
                        tracing::warn!(error = %error, "avatar upload failed");
                    }
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "avatar download failed");
            }
        }
    }

    let new_owner = NewSocialMediaOwner {
        username: post.owner_username.clone().unwrap_or_default(),
        profile_pic_stored_image_id,
        origin_id: origin_id.to_string(),
        platform,
    };

    match store.insert_owner(new_owner).await {
        Ok(owner) => Some(owner.id),
        Err(error) => {
            tracing::error!(error = %error, "failed to create social media owner");
            None
        }
    }
}

/// Store the post image, link it and point the recipe's thumbnail at the
/// join row. Every step is best-effort.
pub(super) async fn attach_thumbnail(
    store: &Arc<dyn ImportStore>,
    storage: &StorageClient,
    http: &Client,
    recipe_id: Uuid,
    image_url: &str,
) {
    let bytes = match download_image(http, image_url).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!(url = image_url, error = %error, "failed to download post image");
            return;
        }
    };

    let hash = crate::clients::storage::hash_content(&bytes);
    let path = format!("{POST_IMAGES_PREFIX}/{hash}");
    if let Err(error) = storage
        .upload_with_hash(RECIPES_BUCKET, &path, image_url, &bytes)
        .await
    {
        tracing::error!(error = %error, "failed to upload post image");
        return;
    }

    let stored = match storage.get_by_hash(&hash).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::error!("stored image missing right after upload");
            return;
        }
        Err(error) => {
            tracing::error!(error = %error, "failed to read back stored image");
            return;
        }
    };

    let Ok(stored_image_id) = Uuid::parse_str(&stored.id) else {
        tracing::error!(id = %stored.id, "stored image id is not a uuid");
        return;
    };

    match store
        .insert_recipe_image(recipe_id, stored_image_id, ImageKind::Full)
        .await
    {
        Ok(recipe_image_id) => {
            if let Err(error) = store.update_recipe_thumbnail(recipe_id, recipe_image_id).await {
                tracing::error!(error = %error, "failed to update recipe thumbnail");
            }
        }
        Err(error) => {
            tracing::error!(error = %error, "failed to create recipe image record");
        }
    }
}
