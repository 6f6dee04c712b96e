//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with browser-like headers and bounded timeouts
//! - HEAD pre-flight accessibility checks
//! - HTML GET and structured JSON API requests
//! - Error classification
//!
//! The fetcher never retries. Retries belong to the crawl queue so that
//! backoff state is tracked per target.

use crate::config::{CrawlerConfig, PlatformConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION};
use reqwest::{redirect::Policy, Client, RequestBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;

const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const JSON_ACCEPT: &str = "application/json, text/javascript, */*;q=0.01";

/// Transport and HTTP failures surfaced to the caller
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Blocked (HTTP 403): {url}")]
    Blocked { url: String },

    #[error("Rate limited (HTTP 429): {url}")]
    RateLimited { url: String },

    #[error("Not found (HTTP 404): {url}")]
    NotFound { url: String },

    #[error("Connection failed for {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Timed out fetching {url}")]
    TimedOut { url: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {reason}")]
    Body { url: String, reason: String },
}

impl FetchError {
    /// Returns true if a later attempt may succeed
    ///
    /// | Error | Retryable |
    /// |-------|-----------|
    /// | Blocked (403) | no |
    /// | NotFound (404) | no |
    /// | RateLimited (429) | yes, after cool-down |
    /// | ConnectionFailed / TimedOut | yes |
    /// | Other 5xx | yes |
    /// | Other 4xx | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Blocked { .. } | Self::NotFound { .. } => false,
            Self::RateLimited { .. }
            | Self::ConnectionFailed { .. }
            | Self::TimedOut { .. }
            | Self::Body { .. } => true,
            Self::Status { status, .. } => *status >= 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Blocked { .. } => "blocked",
            Self::RateLimited { .. } => "rate_limited",
            Self::NotFound { .. } => "not_found",
            Self::ConnectionFailed { .. } => "connection_failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Status { .. } => "http_status",
            Self::Body { .. } => "body",
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Which representation of a page was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Json,
}

/// A successfully fetched document
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// The URL that was asked for
    pub requested_url: String,

    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status: u16,

    pub body: String,

    pub kind: DocumentKind,
}

/// Builds an HTTP client with browser-like defaults
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use qa_harvest::config::CrawlerConfig;
/// use qa_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
    if let Ok(language) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(5))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Adds the platform's extra headers (e.g. Referer) to a request
fn with_platform_headers(mut request: RequestBuilder, platform: &PlatformConfig) -> RequestBuilder {
    for (name, value) in &platform.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => request = request.header(name, value),
            _ => tracing::warn!(
                "Skipping invalid header '{}' for platform {}",
                name,
                platform.name
            ),
        }
    }
    request
}

/// Maps a non-success HTTP status to a fetch error
pub fn classify_status(url: &str, status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }

    let url = url.to_string();
    Some(match status {
        StatusCode::FORBIDDEN => FetchError::Blocked { url },
        StatusCode::NOT_FOUND | StatusCode::GONE => FetchError::NotFound { url },
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited { url },
        other => FetchError::Status {
            url,
            status: other.as_u16(),
        },
    })
}

/// Maps a transport-level reqwest error to a fetch error
fn classify_transport(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::TimedOut {
            url: url.to_string(),
        }
    } else if error.is_redirect() {
        FetchError::ConnectionFailed {
            url: url.to_string(),
            reason: "redirect limit exceeded".to_string(),
        }
    } else {
        FetchError::ConnectionFailed {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Sends a HEAD request to check the page is reachable before a full GET
///
/// Only 403, 404 and 429 answers short-circuit. Servers that reject HEAD
/// (405, 501), other statuses and transport failures let the GET decide.
pub async fn preflight(
    client: &Client,
    url: &str,
    platform: &PlatformConfig,
) -> Result<(), FetchError> {
    let request = with_platform_headers(client.head(url), platform);

    match request.send().await {
        Ok(response) => {
            let status = response.status();
            match classify_status(url, status) {
                Some(
                    e @ (FetchError::Blocked { .. }
                    | FetchError::NotFound { .. }
                    | FetchError::RateLimited { .. }),
                ) => Err(e),
                Some(_) => {
                    tracing::debug!("HEAD {} answered {}, continuing with GET", url, status);
                    Ok(())
                }
                None => Ok(()),
            }
        }
        Err(e) => {
            tracing::debug!("HEAD {} failed ({}), continuing with GET", url, e);
            Ok(())
        }
    }
}

/// Fetches a page as HTML
///
/// # Request Flow
///
/// 1. GET with browser headers plus platform headers (redirects followed, max 5)
/// 2. Classify the response status
/// 3. Read the body
///
/// The HEAD pre-flight is a separate request; callers pace it like any other.
pub async fn fetch_html(
    client: &Client,
    url: &str,
    platform: &PlatformConfig,
) -> Result<FetchedDocument, FetchError> {
    let request = with_platform_headers(client.get(url), platform);
    send(request, url, DocumentKind::Html).await
}

/// Fetches a platform's structured JSON representation of a thread
pub async fn fetch_json(
    client: &Client,
    api_url: &str,
    platform: &PlatformConfig,
) -> Result<FetchedDocument, FetchError> {
    let request = with_platform_headers(client.get(api_url), platform)
        .header(ACCEPT, HeaderValue::from_static(JSON_ACCEPT));
    send(request, api_url, DocumentKind::Json).await
}

async fn send(
    request: RequestBuilder,
    url: &str,
    kind: DocumentKind,
) -> Result<FetchedDocument, FetchError> {
    let response = request
        .send()
        .await
        .map_err(|e| classify_transport(url, e))?;

    let status = response.status();
    let final_url = response.url().to_string();

    if let Some(error) = classify_status(url, status) {
        return Err(error);
    }

    let body = response.text().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::TimedOut {
                url: url.to_string(),
            }
        } else {
            FetchError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    Ok(FetchedDocument {
        requested_url: url.to_string(),
        final_url,
        status: status.as_u16(),
        body,
        kind,
    })
}
