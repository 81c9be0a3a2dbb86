//! Content-addressed image store on top of Supabase object storage.
//!
//! Identical bytes hash to the same SHA-256 key and share one stored-image
//! record. Two workers racing on the same hash may both upload (the bucket
//! allows overwrite-by-path) but the unique index on `content_hash` keeps
//! the metadata single; the loser re-reads the existing row.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::observability::metrics::Metrics;
use crate::util::AppError;

pub(crate) const RECIPES_BUCKET: &str = "recipes";
pub(crate) const POST_IMAGES_PREFIX: &str = "post_images";
pub(crate) const USER_AVATARS_PREFIX: &str = "user_avatars";

pub(crate) fn hash_content(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StoredImageRecord {
    pub(crate) id: String,
    #[allow(dead_code)]
    pub(crate) content_hash: String,
    pub(crate) storage_path: String,
}

#[derive(Clone)]
pub(crate) struct StorageClient {
    supabase_url: String,
    service_key: String,
    client: Client,
    metrics: Option<Arc<Metrics>>,
}

impl StorageClient {
    pub(crate) fn new(
        supabase_url: impl Into<String>,
        service_key: impl Into<String>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            service_key: service_key.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with static config"),
            metrics,
        }
    }

    pub(crate) fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.supabase_url.trim_end_matches('/')
        )
    }

    /// Metadata lookup by content hash. Absence is not an error.
    pub(crate) async fn get_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<StoredImageRecord>, AppError> {
        let url = format!(
            "{}/rest/v1/stored_images?content_hash=eq.{hash}&select=*",
            self.supabase_url.trim_end_matches('/')
        );

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("stored image lookup failed: {error}")))?;

        let records: Vec<StoredImageRecord> = response
            .json()
            .await
            .map_err(|error| AppError::Internal(format!("failed to parse stored images: {error}")))?;

        Ok(records.into_iter().next())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/storage/v1/object/{bucket}/{path}",
            self.supabase_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.service_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("image upload failed: {error}")))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "image upload failed (status {status}): {body}"
            )));
        }

        Ok(())
    }

    async fn create_record(
        &self,
        id: &str,
        hash: &str,
        storage_path: &str,
        source_url: &str,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/rest/v1/stored_images",
            self.supabase_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("Prefer", "return=minimal")
            .json(&json!({
                "id": id,
                "content_hash": hash,
                "storage_path": storage_path,
                "source_url": source_url,
            }))
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("stored image insert failed: {error}")))?;

        let status = response.status().as_u16();
        // a racing worker inserted the same hash first; their row wins
        if status == 409 {
            tracing::debug!(hash = %hash, "stored image row already exists");
            return Ok(());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "stored image insert failed (status {status}): {body}"
            )));
        }

        Ok(())
    }

    /// Upload-or-reuse by content hash; returns the public URL either way.
    pub(crate) async fn upload_with_hash(
        &self,
        bucket: &str,
        path: &str,
        source_url: &str,
        data: &[u8],
    ) -> Result<String, AppError> {
        let hash = hash_content(data);

        if let Some(existing) = self.get_by_hash(&hash).await? {
            if let Some(metrics) = &self.metrics {
                metrics.images_reused_total.inc();
            }
            tracing::debug!(hash = %hash, "image bytes already stored, reusing");
            return Ok(self.public_url(bucket, &existing.storage_path));
        }

        let content_type = if data.len() > 4 && data.starts_with(b"\x89PNG") {
            "image/png"
        } else {
            "image/jpeg"
        };

        self.upload_object(bucket, path, data, content_type).await?;
        self.create_record(&Uuid::new_v4().to_string(), &hash, path, source_url)
            .await?;

        Ok(self.public_url(bucket, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path as url_path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const JPEG_BYTES: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];
    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nrest";

    #[test]
    fn hash_content_is_deterministic_sha256_hex() {
        let first = hash_content(b"same bytes");
        let second = hash_content(b"same bytes");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert_ne!(first, hash_content(b"other bytes"));
    }

    #[tokio::test]
    async fn existing_hash_skips_the_upload() {
        let server = MockServer::start().await;
        let hash = hash_content(JPEG_BYTES);
        Mock::given(method("GET"))
            .and(url_path("/rest/v1/stored_images"))
            .and(query_param("content_hash", format!("eq.{hash}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "abc", "content_hash": hash, "storage_path": "post_images/earlier"}
            ])))
            .mount(&server)
            .await;
        // no upload mock mounted: hitting it would fail the test

        let client = StorageClient::new(server.uri(), "service-key", None);
        let url = client
            .upload_with_hash(RECIPES_BUCKET, "post_images/new", "https://src", JPEG_BYTES)
            .await
            .expect("reuses stored image");

        assert!(url.ends_with("/storage/v1/object/public/recipes/post_images/earlier"));
    }

    #[tokio::test]
    async fn new_bytes_upload_and_create_a_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/rest/v1/stored_images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(url_path("/storage/v1/object/recipes/post_images/abc"))
            .and(header("x-upsert", "true"))
            .and(header("Content-Type", "image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "k"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(url_path("/rest/v1/stored_images"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = StorageClient::new(server.uri(), "service-key", None);
        let url = client
            .upload_with_hash(RECIPES_BUCKET, "post_images/abc", "https://src", PNG_BYTES)
            .await
            .expect("uploads");

        assert!(url.ends_with("/storage/v1/object/public/recipes/post_images/abc"));
    }

    #[tokio::test]
    async fn upload_failure_surfaces_the_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/rest/v1/stored_images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(url_path("/storage/v1/object/recipes/post_images/abc"))
            .respond_with(ResponseTemplate::new(403).set_body_string("bucket policy"))
            .mount(&server)
            .await;

        let client = StorageClient::new(server.uri(), "service-key", None);
        let error = client
            .upload_with_hash(RECIPES_BUCKET, "post_images/abc", "https://src", JPEG_BYTES)
            .await
            .expect_err("fails");

        assert!(error.to_string().contains("bucket policy"));
    }
}
