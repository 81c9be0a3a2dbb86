use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::store::models::{
    CategoryKind, NewIngredient, NewInstruction, NewRecipe, NutritionFacts, RecipeRecord,
};

pub(super) async fn insert_recipe(pool: &PgPool, recipe: NewRecipe) -> Result<Uuid> {
    let row = sqlx::query(
        r"
        INSERT INTO recipes
            (id, created_by, recipe_name, description, prep_time, cooking_time,
             original_serving_size, difficulty_rating, origin, url, owner_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id
        ",
    )
    .bind(recipe.id)
    .bind(recipe.created_by)
    .bind(&recipe.recipe_name)
    .bind(recipe.description.as_deref())
    .bind(recipe.prep_time)
    .bind(recipe.cooking_time)
    .bind(recipe.original_serving_size)
    .bind(recipe.difficulty_rating)
    .bind(recipe.origin.as_str())
    .bind(&recipe.url)
    .bind(recipe.owner_id)
    .fetch_one(pool)
    .await
    .context("failed to insert recipe")?;

    row.try_get("id").context("failed to get recipe id")
}

pub(super) async fn get_recipe(pool: &PgPool, id: Uuid) -> Result<Option<RecipeRecord>> {
    let row = sqlx::query(
        r"
        SELECT id, recipe_name, description
        FROM recipes
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to get recipe")?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(RecipeRecord {
        id: row.try_get("id").context("failed to get id")?,
        recipe_name: row
            .try_get("recipe_name")
            .context("failed to get recipe_name")?,
        description: row.try_get("description").ok().flatten(),
    }))
}

pub(super) async fn insert_ingredients(
    pool: &PgPool,
    recipe_id: Uuid,
    ingredients: &[NewIngredient],
) -> Result<()> {
    for ingredient in ingredients {
        sqlx::query(
            r"
            INSERT INTO recipe_ingredients
                (id, recipe_id, name, quantity, unit, original_quantity, original_unit)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(Uuid::new_v4())
        .bind(recipe_id)
        .bind(&ingredient.name)
        .bind(ingredient.quantity.as_deref())
        .bind(ingredient.unit.as_deref())
        .bind(ingredient.original_quantity.as_deref())
        .bind(ingredient.original_unit.as_deref())
        .execute(pool)
        .await
        .with_context(|| format!("failed to insert ingredient {}", ingredient.name))?;
    }

    Ok(())
}

pub(super) async fn insert_instructions(
    pool: &PgPool,
    recipe_id: Uuid,
    instructions: &[NewInstruction],
) -> Result<()> {
    for instruction in instructions {
        sqlx::query(
            r"
            INSERT INTO recipe_instructions (id, recipe_id, step_number, instruction)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(Uuid::new_v4())
        .bind(recipe_id)
        .bind(instruction.step_number)
        .bind(&instruction.instruction)
        .execute(pool)
        .await
        .with_context(|| format!("failed to insert instruction {}", instruction.step_number))?;
    }

    Ok(())
}

/// 栄養素はスケール2のNUMERICで保存する。
pub(super) async fn insert_nutrition(
    pool: &PgPool,
    recipe_id: Uuid,
    nutrition: NutritionFacts,
) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO recipe_nutrition (recipe_id, protein, carbs, fat, fiber)
        VALUES ($1, $2::numeric, $3::numeric, $4::numeric, $5::numeric)
        ",
    )
    .bind(recipe_id)
    .bind(format!("{:.2}", nutrition.protein))
    .bind(format!("{:.2}", nutrition.carbs))
    .bind(format!("{:.2}", nutrition.fat))
    .bind(format!("{:.2}", nutrition.fiber))
    .execute(pool)
    .await
    .context("failed to insert nutrition")?;

    Ok(())
}

pub(super) async fn get_ingredient_names(pool: &PgPool, recipe_id: Uuid) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r"
        SELECT name
        FROM recipe_ingredients
        WHERE recipe_id = $1
        ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .context("failed to list ingredient names")?;

    rows.iter()
        .map(|row| row.try_get("name").context("failed to get ingredient name"))
        .collect()
}

pub(super) async fn update_recipe_thumbnail(
    pool: &PgPool,
    recipe_id: Uuid,
    recipe_image_id: Uuid,
) -> Result<()> {
    sqlx::query(
        r"
        UPDATE recipes
        SET thumbnail_id = $2,
            updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(recipe_id)
    .bind(recipe_image_id)
    .execute(pool)
    .await
    .context("failed to update recipe thumbnail")?;

    Ok(())
}

pub(super) async fn update_recipe_embedding(
    pool: &PgPool,
    recipe_id: Uuid,
    embedding: &[f32],
) -> Result<()> {
    // pgvector text form: [0.1,0.2,...]
    let literal = format!(
        "[{}]",
        embedding
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    );

    sqlx::query(
        r"
        UPDATE recipes
        SET embedding = $2::vector,
            updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(recipe_id)
    .bind(literal)
    .execute(pool)
    .await
    .context("failed to update recipe embedding")?;

    Ok(())
}

/// 正規化した名前で辞書エントリをget-or-createし、レシピと結び付ける。
pub(super) async fn link_category(
    pool: &PgPool,
    recipe_id: Uuid,
    kind: CategoryKind,
    name: &str,
) -> Result<Uuid> {
    let normalized = name.trim().to_lowercase();

    let upsert = format!(
        "INSERT INTO {table} (id, name) VALUES ($1, $2)
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
         RETURNING id",
        table = kind.table()
    );
    let row = sqlx::query(&upsert)
        .bind(Uuid::new_v4())
        .bind(&normalized)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to get or create {} entry", kind.table()))?;
    let category_id: Uuid = row.try_get("id").context("failed to get category id")?;

    let join = format!(
        "INSERT INTO {join_table} (recipe_id, {join_column}) VALUES ($1, $2)
         ON CONFLICT DO NOTHING",
        join_table = kind.join_table(),
        join_column = kind.join_column()
    );
    sqlx::query(&join)
        .bind(recipe_id)
        .bind(category_id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to link {} to recipe", kind.table()))?;

    Ok(category_id)
}
