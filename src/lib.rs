//! QA-Harvest: a polite travel Q&A content harvester
//!
//! This crate crawls official help centers and community forums, extracts
//! question/answer threads through per-platform strategy cascades, gates them
//! on content quality, and persists deduplicated records plus paragraph chunks
//! for downstream embedding.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod persist;
pub mod platform;
pub mod quality;
pub mod services;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for QA-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("All extraction strategies exhausted for {url}")]
    ParseFailed { url: String },

    #[error("Candidate rejected for {url}: {reason}")]
    ValidationFailed {
        url: String,
        reason: quality::Rejection,
    },

    #[error("Could not allocate a unique slug for {url} after {attempts} attempts")]
    PersistenceConflict { url: String, attempts: u32 },

    #[error("Canonical URL {canonical} of {url} points at other content: {reason}")]
    RedirectMismatch {
        url: String,
        canonical: String,
        reason: String,
    },

    #[error("No platform configured for {url}")]
    UnsupportedUrl { url: String },

    #[error("Listing page, not extracted: {url}")]
    ListingPage { url: String },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TargetStatus,
        to: state::TargetStatus,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true if the crawl queue should schedule another attempt
    ///
    /// Transport failures and rate limiting are transient. Extraction,
    /// validation and permanent HTTP answers will not change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_retryable(),
            Self::Storage(_) | Self::Database(_) | Self::Io(_) => true,
            _ => false,
        }
    }

    /// Short label used in logs and the queue's error column
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Fetch(e) => e.kind(),
            Self::ParseFailed { .. } => "parse_failed",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::PersistenceConflict { .. } => "persistence_conflict",
            Self::RedirectMismatch { .. } => "redirect_mismatch",
            Self::UnsupportedUrl { .. } => "unsupported",
            Self::ListingPage { .. } => "listing_page",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Storage(_) | Self::Database(_) => "storage",
            Self::UrlError(_) | Self::UrlParse(_) => "url",
            Self::Reqwest(_) => "http_client",
            Self::Io(_) => "io",
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid selector for platform {platform}: {selector}")]
    InvalidSelector { platform: String, selector: String },

    #[error("No platform configuration available")]
    NoPlatforms,
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for QA-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use platform::{Platform, PlatformRegistry};
pub use state::TargetStatus;
pub use crate::url::{extract_domain, normalize_url};
