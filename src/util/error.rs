/// エラー分類とリトライ判定ユーティリティ。
use thiserror::Error;

/// Operational error carried across the import pipeline.
///
/// Display output embeds the upstream HTTP status as "status NNN" where one
/// is known, so both the retry pattern matcher and the provider classifier
/// can work from rendered messages.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        code: &'static str,
        suggestion: &'static str,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("transcription failed (status {status}): {message}")]
    Transcription { message: String, status: u16 },

    #[error("scrape failed (status {status}): {message}")]
    Scraper { message: String, status: u16 },

    #[error("recipe generation failed (status {status}): {message}")]
    RecipeGeneration { message: String, status: u16 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub(crate) fn validation(message: impl Into<String>, code: &'static str) -> Self {
        Self::Validation {
            message: message.into(),
            code,
            suggestion: "",
        }
    }

    pub(crate) fn transcription(message: impl Into<String>, status: u16) -> Self {
        Self::Transcription {
            message: message.into(),
            status,
        }
    }

    pub(crate) fn scraper(message: impl Into<String>, status: u16) -> Self {
        Self::Scraper {
            message: message.into(),
            status,
        }
    }

    pub(crate) fn generation(message: impl Into<String>, status: u16) -> Self {
        Self::RecipeGeneration {
            message: message.into(),
            status,
        }
    }

    /// Machine-readable code surfaced in the job row's error text.
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. } => code,
            Self::NotFound(_) => "NOT_FOUND",
            Self::RateLimit(_) => "RATE_LIMIT",
            Self::Transcription { .. } => "TRANSCRIPTION_ERROR",
            Self::Scraper { .. } => "SCRAPER_ERROR",
            Self::RecipeGeneration { .. } => "RECIPE_GENERATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Upstream HTTP status when the error carries one.
    pub(crate) fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Transcription { status, .. }
            | Self::Scraper { status, .. }
            | Self::RecipeGeneration { status, .. } => Some(*status),
            Self::RateLimit(_) => Some(429),
            _ => None,
        }
    }

    /// リトライ可能かどうか。レート制限は常に、プロバイダ系は5xxのみ。
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimit(_) => true,
            Self::Transcription { status, .. }
            | Self::Scraper { status, .. }
            | Self::RecipeGeneration { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status for errors surfaced synchronously through the API.
    #[allow(dead_code)]
    pub(crate) fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::NotFound(_) => 404,
            Self::RateLimit(_) => 429,
            _ => 500,
        }
    }
}
