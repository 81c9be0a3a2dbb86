//! Instagram scraping through a third-party fetch proxy.
//!
//! Instagram answers its GraphQL endpoint only for requests that look like
//! the web client, so the request is forwarded through a proxy that replays
//! the header block below. Rate-limited and HTML error responses are common;
//! the fast retry preset covers both.

use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::util::retry::{with_retry, RetryConfig};
use crate::util::AppError;

use super::{PostScraper, ScrapedPost};

const IG_APP_ID: &str = "936619743392459";
const LSD_TOKEN: &str = "AVqbxe3J_YA";
const ASBD_ID: &str = "129477";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
const GRAPHQL_DOC_ID: &str = "10015901848480474";

static SHORTCODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"instagram\.com/(?:[A-Za-z0-9_.]+/)?(p|reels?)/([A-Za-z0-9\-_]+)")
        .expect("valid regex")
});

pub(crate) struct InstagramScraper {
    proxy_url: String,
    proxy_key: String,
    client: Client,
    retry: RetryConfig,
}

impl InstagramScraper {
    pub(crate) fn new(proxy_url: impl Into<String>, proxy_key: impl Into<String>) -> Self {
        Self {
            proxy_url: proxy_url.into(),
            proxy_key: proxy_key.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with static config"),
            retry: RetryConfig::fast(),
        }
    }

    #[cfg(test)]
    fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn extract_shortcode(post_url: &str) -> Result<String, AppError> {
        SHORTCODE
            .captures(post_url)
            .and_then(|captures| captures.get(2))
            .map(|code| code.as_str().to_string())
            .ok_or_else(|| AppError::validation("invalid Instagram URL", "INVALID_URL"))
    }

    async fn fetch_media(&self, shortcode: &str) -> anyhow::Result<Vec<u8>> {
        let graphql_url = format!(
            "https://www.instagram.com/api/graphql?variables={{\"shortcode\":\"{shortcode}\"}}&doc_id={GRAPHQL_DOC_ID}"
        );

        let body = json!({
            "url": graphql_url,
            "method": "POST",
            "headers": {
                "User-Agent": USER_AGENT,
                "Content-Type": "application/x-www-form-urlencoded",
                "X-IG-App-ID": IG_APP_ID,
                "X-FB-LSD": LSD_TOKEN,
                "X-ASBD-ID": ASBD_ID,
                "Sec-Fetch-Site": "same-origin",
            },
        });

        let response = self
            .client
            .post(&self.proxy_url)
            .header("x-api-key", &self.proxy_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AppError::RateLimit("instagram proxy returned 429".into()).into());
        }
        if status.is_server_error() {
            return Err(anyhow!("server error: {}", status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    /// The proxy returns the upstream body as a string.
    data: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: GraphqlData,
}

#[derive(Debug, Default, Deserialize)]
struct GraphqlData {
    #[serde(default)]
    xdt_shortcode_media: ShortcodeMedia,
}

#[derive(Debug, Default, Deserialize)]
struct ShortcodeMedia {
    #[serde(default)]
    shortcode: String,
    #[serde(default)]
    display_url: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    edge_media_to_caption: CaptionEdges,
    #[serde(default)]
    owner: Owner,
}

#[derive(Debug, Default, Deserialize)]
struct CaptionEdges {
    #[serde(default)]
    edges: Vec<CaptionEdge>,
}

#[derive(Debug, Deserialize)]
struct CaptionEdge {
    node: CaptionNode,
}

#[derive(Debug, Deserialize)]
struct CaptionNode {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Owner {
    #[serde(default)]
    id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    profile_pic_url: Option<String>,
}

#[async_trait]
impl PostScraper for InstagramScraper {
    async fn scrape(&self, post_url: &str) -> Result<ScrapedPost, AppError> {
        let shortcode = Self::extract_shortcode(post_url)?;

        let raw = with_retry(&self.retry, || self.fetch_media(&shortcode))
            .await
            .map_err(|error| match error.downcast::<AppError>() {
                Ok(app_error) => app_error,
                Err(other) => AppError::scraper(format!("{other:#}"), 502),
            })?;

        let envelope: ProxyEnvelope = serde_json::from_slice(&raw)
            .map_err(|error| AppError::scraper(format!("invalid proxy envelope: {error}"), 502))?;
        let graphql: GraphqlResponse = serde_json::from_str(&envelope.data)
            .map_err(|error| AppError::scraper(format!("invalid graphql payload: {error}"), 502))?;

        let media = graphql.data.xdt_shortcode_media;
        if media.shortcode.is_empty() {
            return Err(AppError::NotFound("post not found".into()));
        }

        let caption = media
            .edge_media_to_caption
            .edges
            .first()
            .map(|edge| edge.node.text.clone())
            .unwrap_or_default();

        Ok(ScrapedPost {
            id: media.shortcode,
            caption,
            image_url: media.display_url,
            video_url: media.video_url,
            owner_id: (!media.owner.id.is_empty()).then(|| media.owner.id.clone()),
            owner_username: (!media.owner.username.is_empty()).then(|| media.owner.username.clone()),
            owner_avatar_url: media.owner.profile_pic_url,
        })
    }
}
