use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::observability::metrics::Metrics;

use super::client::QueueClient;
use super::types::Task;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const ERROR_BACKOFF: Duration = Duration::from_millis(1000);
const MAX_DELIVERIES: u32 = 3;

/// Dispatch target for dequeued tasks.
#[async_trait]
pub(crate) trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &Task) -> Result<()>;
}

/// Background worker draining the broker with N concurrent handler slots.
///
/// Delivery is at-least-once: a task sits on the processing list while its
/// handler runs, failed tasks are pushed back with an incremented attempt
/// counter, and exhausted tasks land on the dead list.
pub(crate) struct QueueWorker {
    client: QueueClient,
    handler: Arc<dyn TaskHandler>,
    metrics: Arc<Metrics>,
    semaphore: Arc<Semaphore>,
}

impl QueueWorker {
    pub(crate) fn new(
        client: QueueClient,
        handler: Arc<dyn TaskHandler>,
        metrics: Arc<Metrics>,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            handler,
            metrics,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        info!(
            concurrency = self.semaphore.available_permits(),
            "starting task worker"
        );

        loop {
            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let popped = match self.client.pop_task().await {
                Ok(Some(popped)) => popped,
                Ok(None) => {
                    drop(permit);
                    sleep(POLL_INTERVAL).await;
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "failed to pop task");
                    drop(permit);
                    sleep(ERROR_BACKOFF).await;
                    continue;
                }
            };

            let client = self.client.clone();
            let handler = Arc::clone(&self.handler);
            let metrics = Arc::clone(&self.metrics);
            tokio::spawn(async move {
                let _permit = permit;
                Self::process_task(client, handler, metrics, popped.0, popped.1).await;
            });
        }
    }

    async fn process_task(
        client: QueueClient,
        handler: Arc<dyn TaskHandler>,
        metrics: Arc<Metrics>,
        task: Task,
        raw: String,
    ) {
        let kind = task.kind.as_str();
        debug!(task_id = %task.id, kind, attempt = task.attempt, "processing task");

        metrics.active_jobs.inc();
        let start = Instant::now();
        let outcome = handler.handle(&task).await;
        let duration = start.elapsed().as_secs_f64();
        metrics.active_jobs.dec();

        let status = if outcome.is_ok() { "success" } else { "failure" };
        metrics.record_job(kind, status, duration);

        if let Err(ack_error) = client.ack(&raw).await {
            error!(task_id = %task.id, error = %ack_error, "failed to remove task from processing list");
        }

        match outcome {
            Ok(()) => {
                debug!(task_id = %task.id, kind, "task completed");
            }
            Err(handler_error) => {
                if task.attempt < MAX_DELIVERIES {
                    let mut retry = task;
                    retry.attempt += 1;
                    let delay = redelivery_delay(retry.attempt);
                    warn!(
                        task_id = %retry.id,
                        kind,
                        attempt = retry.attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %handler_error,
                        "task failed, scheduling redelivery"
                    );
                    sleep(delay).await;
                    if let Err(requeue_error) = client.push_task(&retry).await {
                        error!(task_id = %retry.id, error = %requeue_error, "failed to requeue task");
                    }
                } else {
                    error!(
                        task_id = %task.id,
                        kind,
                        attempt = task.attempt,
                        error = %handler_error,
                        "task failed after max deliveries, burying"
                    );
                    if let Err(bury_error) = client.bury(&task).await {
                        error!(task_id = %task.id, error = %bury_error, "failed to bury task");
                    }
                }
            }
        }
    }
}

/// Exponential redelivery delay keyed on the upcoming attempt.
fn redelivery_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(2).min(6);
    Duration::from_millis(1000_u64 << exponent)
}
