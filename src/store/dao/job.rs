use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::store::models::{ImportJob, JobStatus, NewImportJob};

pub(super) async fn create_import_job(pool: &PgPool, job: NewImportJob) -> Result<ImportJob> {
    let row = sqlx::query(
        r"
        INSERT INTO import_jobs (id, user_id, url, status)
        VALUES ($1, $2, $3, 'pending')
        RETURNING id, user_id, url, status, progress_step, error, created_at, updated_at
        ",
    )
    .bind(job.id)
    .bind(job.user_id)
    .bind(&job.url)
    .fetch_one(pool)
    .await
    .context("failed to insert import job")?;

    row_to_job(&row)
}

pub(super) async fn get_import_job(pool: &PgPool, id: Uuid) -> Result<Option<ImportJob>> {
    let row = sqlx::query(
        r"
        SELECT id, user_id, url, status, progress_step, error, created_at, updated_at
        FROM import_jobs
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to get import job")?;

    row.as_ref().map(row_to_job).transpose()
}

pub(super) async fn get_import_jobs_by_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ImportJob>> {
    let rows = sqlx::query(
        r"
        SELECT id, user_id, url, status, progress_step, error, created_at, updated_at
        FROM import_jobs
        WHERE user_id = $1
        ORDER BY created_at DESC
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list import jobs for user")?;

    rows.iter().map(row_to_job).collect()
}

pub(super) async fn update_import_job_status(
    pool: &PgPool,
    id: Uuid,
    status: JobStatus,
    progress_step: &str,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r"
        UPDATE import_jobs
        SET status = $2,
            progress_step = $3,
            error = $4,
            updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(progress_step)
    .bind(error.map(str::as_bytes))
    .execute(pool)
    .await
    .context("failed to update import job status")?;

    Ok(())
}

/// 保持期間を過ぎた終了済みジョブを削除する。
pub(super) async fn delete_import_jobs_older_than(
    pool: &PgPool,
    retention_days: i64,
) -> Result<u64> {
    let result = sqlx::query(
        r"
        DELETE FROM import_jobs
        WHERE status IN ('completed', 'failed')
          AND updated_at < NOW() - make_interval(days => $1)
        ",
    )
    .bind(retention_days as f64)
    .execute(pool)
    .await
    .context("failed to delete old import jobs")?;

    Ok(result.rows_affected())
}

/// 放置された非終了ジョブを failed に倒す。
pub(super) async fn fail_stale_import_jobs(pool: &PgPool, staleness_hours: i64) -> Result<u64> {
    let result = sqlx::query(
        r"
        UPDATE import_jobs
        SET status = 'failed',
            progress_step = 'Failed',
            error = $2,
            updated_at = NOW()
        WHERE status IN ('pending', 'executing')
          AND updated_at < NOW() - make_interval(hours => $1)
        ",
    )
    .bind(staleness_hours as f64)
    .bind("Job timed out".as_bytes())
    .execute(pool)
    .await
    .context("failed to sweep stale import jobs")?;

    Ok(result.rows_affected())
}

fn row_to_job(row: &sqlx::postgres::PgRow) -> Result<ImportJob> {
    let status_str: String = row.try_get("status").context("failed to get status")?;
    let status = JobStatus::from_str(&status_str)
        .with_context(|| format!("invalid job status: {status_str}"))?;
    let error_bytes: Option<Vec<u8>> = row.try_get("error").ok().flatten();
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .context("failed to get created_at")?;
    let updated_at: DateTime<Utc> = row
        .try_get("updated_at")
        .context("failed to get updated_at")?;

    Ok(ImportJob {
        id: row.try_get("id").context("failed to get id")?,
        user_id: row.try_get("user_id").context("failed to get user_id")?,
        url: row.try_get("url").context("failed to get url")?,
        status,
        progress_step: row.try_get("progress_step").ok().flatten(),
        error: error_bytes.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
        created_at,
        updated_at,
    })
}
