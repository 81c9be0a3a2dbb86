//! Periodic housekeeping over the import_jobs table.

use anyhow::{Context, Result};

use crate::store::dao::ImportStore;

use super::processor::RecipeProcessor;

impl RecipeProcessor {
    /// Drop terminal jobs past the retention window and sweep jobs stuck in
    /// a non-terminal state past the staleness window to `failed`.
    pub(crate) async fn handle_cleanup(&self) -> Result<()> {
        tracing::info!(
            retention_days = self.retention_days,
            staleness_hours = self.staleness_hours,
            "running cleanup job"
        );

        let deleted = self
            .store
            .delete_import_jobs_older_than(self.retention_days)
            .await
            .context("failed to delete old import jobs")?;

        let swept = self
            .store
            .fail_stale_import_jobs(self.staleness_hours)
            .await
            .context("failed to sweep stale import jobs")?;

        tracing::info!(deleted, swept, "cleanup job completed");
        Ok(())
    }
}
