use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::store::models::{ImageKind, NewSocialMediaOwner, Platform, SocialMediaOwner};

pub(super) async fn get_owner_by_origin(
    pool: &PgPool,
    origin_id: &str,
    platform: Platform,
) -> Result<Option<SocialMediaOwner>> {
    let row = sqlx::query(
        r"
        SELECT id, username, origin_id, platform
        FROM social_media_owners
        WHERE origin_id = $1 AND platform = $2
        ",
    )
    .bind(origin_id)
    .bind(platform.as_str())
    .fetch_optional(pool)
    .await
    .context("failed to look up social media owner")?;

    row.map(|row| row_to_owner(&row)).transpose()
}

pub(super) async fn insert_owner(
    pool: &PgPool,
    owner: NewSocialMediaOwner,
) -> Result<SocialMediaOwner> {
    let row = sqlx::query(
        r"
        INSERT INTO social_media_owners
            (id, username, profile_pic_stored_image_id, origin_id, platform)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, username, origin_id, platform
        ",
    )
    .bind(Uuid::new_v4())
    .bind(&owner.username)
    .bind(owner.profile_pic_stored_image_id.as_deref())
    .bind(&owner.origin_id)
    .bind(owner.platform.as_str())
    .fetch_one(pool)
    .await
    .context("failed to insert social media owner")?;

    row_to_owner(&row)
}

pub(super) async fn insert_recipe_image(
    pool: &PgPool,
    recipe_id: Uuid,
    stored_image_id: Uuid,
    image_type: ImageKind,
) -> Result<Uuid> {
    let row = sqlx::query(
        r"
        INSERT INTO recipe_images (id, recipe_id, stored_image_id, image_type)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        ",
    )
    .bind(Uuid::new_v4())
    .bind(recipe_id)
    .bind(stored_image_id)
    .bind(image_type.as_str())
    .fetch_one(pool)
    .await
    .context("failed to insert recipe image")?;

    row.try_get("id").context("failed to get recipe image id")
}

fn row_to_owner(row: &sqlx::postgres::PgRow) -> Result<SocialMediaOwner> {
    let platform_str: String = row.try_get("platform").context("failed to get platform")?;
    let platform = Platform::from_str(&platform_str)
        .with_context(|| format!("invalid platform: {platform_str}"))?;

    Ok(SocialMediaOwner {
        id: row.try_get("id").context("failed to get id")?,
        username: row.try_get("username").context("failed to get username")?,
        origin_id: row.try_get("origin_id").context("failed to get origin_id")?,
        platform,
    })
}
