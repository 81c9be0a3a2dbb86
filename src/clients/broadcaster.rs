//! Per-user progress events over the realtime bus.
//!
//! Broadcasts are a convenience for connected clients, never a consistency
//! source: the caller logs failures and moves on. Publishes are serialized
//! through one mutex because the bus tolerates little concurrency.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::store::models::JobStatus;
use crate::util::AppError;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ProgressUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
    pub(crate) message: String,
}

pub(crate) struct ProgressBroadcaster {
    supabase_url: String,
    service_key: String,
    client: Client,
    publish_lock: Mutex<()>,
}

impl ProgressBroadcaster {
    pub(crate) fn new(supabase_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            service_key: service_key.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with static config"),
            publish_lock: Mutex::new(()),
        }
    }

    pub(crate) async fn broadcast(
        &self,
        user_id: &str,
        update: ProgressUpdate,
    ) -> Result<(), AppError> {
        let _guard = self.publish_lock.lock().await;

        let channel = format!("user:{user_id}:imports");
        let payload = json!({
            "channel": channel,
            "type": "broadcast",
            "event": "progress",
            "payload": update,
        });

        let url = format!(
            "{}/rest/v1/rpc/broadcast",
            self.supabase_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("failed to broadcast: {error}")))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(AppError::Internal(format!(
                "broadcast failed with status {status}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn broadcast_publishes_to_the_user_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/broadcast"))
            .and(body_partial_json(json!({
                "channel": "user:user-1:imports",
                "event": "progress",
                "payload": {"status": "executing", "message": "Fetching post content..."}
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let broadcaster = ProgressBroadcaster::new(server.uri(), "service-key");
        broadcaster
            .broadcast(
                "user-1",
                ProgressUpdate {
                    job_id: "job-1".to_string(),
                    status: JobStatus::Executing,
                    message: "Fetching post content...".to_string(),
                },
            )
            .await
            .expect("broadcast succeeds");
    }

    #[tokio::test]
    async fn error_status_is_reported_to_the_caller() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/broadcast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let broadcaster = ProgressBroadcaster::new(server.uri(), "service-key");
        let error = broadcaster
            .broadcast(
                "user-1",
                ProgressUpdate {
                    job_id: "job-1".to_string(),
                    status: JobStatus::Failed,
                    message: "boom".to_string(),
                },
            )
            .await
            .expect_err("fails");

        assert!(error.to_string().contains("status 500"));
    }
}
