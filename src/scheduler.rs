use std::time::Duration;

use tokio::{task::JoinHandle, time::sleep};
use tracing::{error, info};

use crate::queue::{QueueClient, TaskKind};

pub(crate) fn spawn_cleanup_daemon(queue: QueueClient, interval: Duration) -> JoinHandle<()> {
    CleanupDaemon { queue, interval }.spawn()
}

/// Enqueues a `cleanup:jobs` task on a fixed cadence.
struct CleanupDaemon {
    queue: QueueClient,
    interval: Duration,
}

impl CleanupDaemon {
    fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        info!(
            interval_seconds = self.interval.as_secs(),
            "cleanup daemon started"
        );

        loop {
            sleep(self.interval).await;

            match self
                .queue
                .enqueue(TaskKind::CleanupJobs, &serde_json::json!({}))
                .await
            {
                Ok(task_id) => info!(%task_id, "cleanup task enqueued"),
                Err(err) => error!(error = %err, "failed to enqueue cleanup task"),
            }
        }
    }
}
