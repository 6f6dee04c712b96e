use serde::Deserialize;
use std::collections::BTreeMap;

/// A realistic desktop browser user agent
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Main configuration structure for QA-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub embedding: Option<EmbeddingConfig>,
    #[serde(default)]
    pub direct: DirectConfig,
    #[serde(default, rename = "platform")]
    pub platforms: Vec<PlatformConfig>,
}

/// Crawl queue and fetcher behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of targets processed per run
    #[serde(rename = "batch-size")]
    pub batch_size: u32,

    /// Attempts after which a failing target is no longer dequeued
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Days a failed target is kept before the cleanup sweep removes it
    #[serde(rename = "retention-days")]
    pub retention_days: u32,

    /// Total request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Fixed cool-down applied to a platform after HTTP 429 (milliseconds)
    #[serde(rename = "rate-limit-cooldown-ms")]
    pub rate_limit_cooldown_ms: u64,

    /// Fraction of the interval used as the +/- jitter band
    #[serde(rename = "jitter-ratio")]
    pub jitter_ratio: f64,

    /// Send a HEAD request before each GET
    pub preflight: bool,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_retries: 3,
            retention_days: 7,
            request_timeout_secs: 15,
            connect_timeout_secs: 10,
            rate_limit_cooldown_ms: 30_000,
            jitter_ratio: 0.3,
            preflight: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Exponential backoff shared by politeness and queue retries
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    #[serde(rename = "base-ms")]
    pub base_ms: u64,
    pub multiplier: f64,
    #[serde(rename = "cap-ms")]
    pub cap_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: 2_000,
            multiplier: 2.0,
            cap_ms: 300_000,
        }
    }
}

/// Thresholds for the quality gate and chunking
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Bodies shorter than this are always rejected
    #[serde(rename = "min-body-chars")]
    pub min_body_chars: usize,

    /// Generic landing-page text is rejected only below this length
    #[serde(rename = "landing-page-chars")]
    pub landing_page_chars: usize,

    #[serde(rename = "min-paragraph-chars")]
    pub min_paragraph_chars: usize,

    #[serde(rename = "max-chunks")]
    pub max_chunks: usize,

    /// Records with more votes than this are marked verified
    #[serde(rename = "verified-vote-threshold")]
    pub verified_vote_threshold: i64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_body_chars: 50,
            landing_page_chars: 200,
            min_paragraph_chars: 40,
            max_chunks: 5,
            verified_vote_threshold: 5,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// External embedding service
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    #[serde(rename = "timeout-secs", default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_timeout() -> u64 {
    10
}

/// Static URL list for direct (queue-less) runs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectConfig {
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Whether content comes from users or from the vendor itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Community,
    Official,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Community => "community",
            Self::Official => "official",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "community" => Some(Self::Community),
            "official" => Some(Self::Official),
            _ => None,
        }
    }
}

/// Static description of one supported source
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Platform identifier, also the key of its extraction strategy table
    pub name: String,

    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Host patterns served by this platform ("example.com" or "*.example.com")
    pub domains: Vec<String>,

    /// Human readable source label stored on records
    #[serde(default)]
    pub source: Option<String>,

    #[serde(rename = "content-type", default)]
    pub content_type: ContentType,

    #[serde(default)]
    pub category: Option<String>,

    /// Expected natural language of the platform's content
    #[serde(default)]
    pub language: Option<String>,

    /// Queue priority for targets discovered on this platform (higher = sooner)
    #[serde(default)]
    pub priority: i64,

    /// Regex a content URL path must match; an optional `id` group names the thread id
    #[serde(rename = "thread-pattern", default)]
    pub thread_pattern: Option<String>,

    #[serde(rename = "target-type", default = "default_target_type")]
    pub target_type: String,

    /// Category/index pages mined for thread links during discovery
    #[serde(rename = "listing-urls", default)]
    pub listing_urls: Vec<String>,

    /// Title fragments that betray a redirect into another language edition
    #[serde(rename = "foreign-title-markers", default)]
    pub foreign_title_markers: Vec<String>,

    #[serde(default)]
    pub politeness: PolitenessBudget,

    /// Extra request headers (e.g. Referer)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    pub selectors: SelectorSet,

    #[serde(default)]
    pub api: Option<JsonApiConfig>,
}

fn default_target_type() -> String {
    "thread".to_string()
}

impl PlatformConfig {
    /// Source label, defaulting to the platform name
    pub fn source_label(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

/// Per-platform request budget
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PolitenessBudget {
    /// Maximum requests in any rolling 60 second window
    pub burst: u32,

    /// Base spacing between consecutive requests (milliseconds)
    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,
}

impl Default for PolitenessBudget {
    fn default() -> Self {
        Self {
            burst: 20,
            interval_ms: 3_000,
        }
    }
}

/// Ordered CSS selector lists, tried first to last
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SelectorSet {
    pub title: Vec<String>,
    pub body: Vec<String>,
    pub author: Vec<String>,
    #[serde(rename = "vote-count")]
    pub vote_count: Vec<String>,
    #[serde(rename = "post-container")]
    pub post_container: Vec<String>,
    pub date: Vec<String>,
    #[serde(rename = "fallback-title")]
    pub fallback_title: Vec<String>,
    #[serde(rename = "fallback-body")]
    pub fallback_body: Vec<String>,
}

impl SelectorSet {
    /// Iterates every selector string with the list it belongs to
    pub fn all(&self) -> impl Iterator<Item = (&'static str, &String)> {
        let lists: [(&'static str, &Vec<String>); 8] = [
            ("title", &self.title),
            ("body", &self.body),
            ("author", &self.author),
            ("vote-count", &self.vote_count),
            ("post-container", &self.post_container),
            ("date", &self.date),
            ("fallback-title", &self.fallback_title),
            ("fallback-body", &self.fallback_body),
        ];
        lists
            .into_iter()
            .flat_map(|(name, list)| list.iter().map(move |s| (name, s)))
    }
}

/// Structured JSON endpoint offered by some platforms (e.g. Discourse `.json`)
#[derive(Debug, Clone, Deserialize)]
pub struct JsonApiConfig {
    /// Template for the API URL; `{url}` is replaced by the thread URL
    #[serde(rename = "url-template")]
    pub url_template: String,

    /// JSON pointer to the thread title
    #[serde(rename = "title-pointer")]
    pub title_pointer: String,

    /// JSON pointer to the array of posts (first post = question)
    #[serde(rename = "posts-pointer")]
    pub posts_pointer: String,

    #[serde(rename = "body-field")]
    pub body_field: String,

    #[serde(rename = "author-field", default)]
    pub author_field: Option<String>,

    #[serde(rename = "votes-field", default)]
    pub votes_field: Option<String>,

    /// Post bodies contain rendered HTML that must be reduced to text
    #[serde(rename = "body-is-html", default = "default_true")]
    pub body_is_html: bool,
}

fn default_true() -> bool {
    true
}

impl JsonApiConfig {
    /// Builds the API URL for a thread
    pub fn api_url(&self, thread_url: &str) -> String {
        self.url_template
            .replace("{url}", thread_url.trim_end_matches('/'))
    }
}

/// Wrapper used to deserialize the embedded default platform table
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlatformTable {
    #[serde(default)]
    pub platform: Vec<PlatformConfig>,
}
