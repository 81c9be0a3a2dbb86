pub(crate) mod instagram;
pub(crate) mod tiktok;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::store::models::Platform;
use crate::util::AppError;

/// Everything a platform scrape can tell us about a post.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScrapedPost {
    pub(crate) id: String,
    pub(crate) caption: String,
    pub(crate) image_url: Option<String>,
    pub(crate) video_url: Option<String>,
    pub(crate) owner_id: Option<String>,
    pub(crate) owner_username: Option<String>,
    pub(crate) owner_avatar_url: Option<String>,
}

#[async_trait]
pub(crate) trait PostScraper: Send + Sync {
    async fn scrape(&self, post_url: &str) -> Result<ScrapedPost, AppError>;
}

static INSTAGRAM_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"instagram\.com/(p|reel|reels)/").expect("valid regex"));
static TIKTOK_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"tiktok\.com/").expect("valid regex"));

pub(crate) fn is_instagram_url(url: &str) -> bool {
    INSTAGRAM_URL.is_match(url)
}

pub(crate) fn is_tiktok_url(url: &str) -> bool {
    TIKTOK_URL.is_match(url)
}

/// Classify a submitted URL; `None` means the job must fail fast.
pub(crate) fn detect_platform(url: &str) -> Option<Platform> {
    if is_instagram_url(url) {
        Some(Platform::Instagram)
    } else if is_tiktok_url(url) {
        Some(Platform::TikTok)
    } else {
        None
    }
}
