//! TikTok scraping through an Apify actor.
//!
//! The actor performs the scrape and answers synchronously with a JSON
//! array; downloads can take a while, so the client carries a 3-minute
//! timeout. When the item has no direct `videoUrl`, the actor has still
//! written the file into its key-value store and the direct URL is rebuilt
//! from the matching store key.

use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::util::retry::{with_retry, RetryConfig};
use crate::util::AppError;

use super::{PostScraper, ScrapedPost};

const ACTOR_ID: &str = "GdWCkxBtKWOsKjdch";
const VIDEO_KV_STORE_ID: &str = "wHhZCBV1UdGLJZHkV";

pub(crate) struct TikTokScraper {
    api_key: String,
    base_url: String,
    client: Client,
    retry: RetryConfig,
}

impl TikTokScraper {
    pub(crate) fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.apify.com")
    }

    pub(crate) fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(180))
                .build()
                .expect("reqwest client builds with static config"),
            retry: RetryConfig::default(),
        }
    }

    #[cfg(test)]
    fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn run_actor(&self, post_url: &str) -> anyhow::Result<Vec<u8>> {
        let input = json!({
            "postURLs": [post_url],
            "resultsPerPage": 1,
            "shouldDownloadVideos": true,
            "shouldDownloadCovers": true,
            "shouldDownloadSubtitles": false,
            "videoKvStoreIdOrName": VIDEO_KV_STORE_ID,
        });

        let response = self
            .client
            .post(format!("{}/v2/acts/{ACTOR_ID}/run-sync", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&input)
            .send()
            .await?;

        let status = response.status().as_u16();
        match status {
            429 => Err(AppError::RateLimit("apify returned 429".into()).into()),
            404 => Err(AppError::NotFound("video not found".into()).into()),
            s if s >= 500 => Err(anyhow!("server error: {s}")),
            _ => Ok(response.bytes().await?.to_vec()),
        }
    }

    async fn fetch_store_keys(&self) -> anyhow::Result<KeyListing> {
        let response = self
            .client
            .get(format!(
                "{}/v2/key-value-stores/{VIDEO_KV_STORE_ID}/keys?token={}",
                self.base_url, self.api_key
            ))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "unexpected status code: {}",
                response.status().as_u16()
            ));
        }

        Ok(response.json().await?)
    }

    /// Enumerate the actor's key-value store and rebuild a direct URL for
    /// the video file.
    async fn video_url_from_store(&self, video_id: &str) -> Option<String> {
        let listing = with_retry(&self.retry, || self.fetch_store_keys())
            .await
            .ok()?;

        let key = listing
            .data
            .items
            .into_iter()
            .map(|item| item.key)
            .find(|key| key.contains(video_id) && key.ends_with(".mp4"))?;

        Some(format!(
            "{}/v2/key-value-stores/{VIDEO_KV_STORE_ID}/records/{key}?token={}",
            self.base_url, self.api_key
        ))
    }
}

#[derive(Debug, Deserialize)]
struct KeyListing {
    data: KeyListingData,
}

#[derive(Debug, Default, Deserialize)]
struct KeyListingData {
    #[serde(default)]
    items: Vec<KeyItem>,
}

#[derive(Debug, Deserialize)]
struct KeyItem {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
struct ActorItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default, rename = "videoUrl")]
    video_url: Option<String>,
    #[serde(default, rename = "videoMeta")]
    video_meta: VideoMeta,
    #[serde(default, rename = "authorMeta")]
    author_meta: AuthorMeta,
}

#[derive(Debug, Default, Deserialize)]
struct VideoMeta {
    #[serde(default, rename = "coverUrl")]
    cover_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthorMeta {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    avatar: Option<String>,
}

#[async_trait]
impl PostScraper for TikTokScraper {
    async fn scrape(&self, post_url: &str) -> Result<ScrapedPost, AppError> {
        let raw = with_retry(&self.retry, || self.run_actor(post_url))
            .await
            .map_err(|error| match error.downcast::<AppError>() {
                Ok(app_error) => app_error,
                Err(other) => AppError::scraper(format!("{other:#}"), 502),
            })?;

        let items: Vec<ActorItem> = serde_json::from_slice(&raw)
            .map_err(|error| AppError::scraper(format!("failed to parse actor response: {error}"), 502))?;

        let Some(item) = items.into_iter().next() else {
            return Err(AppError::NotFound("video not found".into()));
        };

        let mut video_url = item.video_url.filter(|url| !url.is_empty());
        if video_url.is_none() && !item.id.is_empty() {
            video_url = self.video_url_from_store(&item.id).await;
        }

        Ok(ScrapedPost {
            id: item.id,
            caption: item.text,
            image_url: item.video_meta.cover_url,
            video_url,
            owner_id: (!item.author_meta.id.is_empty()).then(|| item.author_meta.id.clone()),
            owner_username: (!item.author_meta.name.is_empty()).then(|| item.author_meta.name.clone()),
            owner_avatar_url: item.author_meta.avatar,
        })
    }
}
