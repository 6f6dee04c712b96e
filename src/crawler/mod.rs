//! Crawler module for fetching and processing travel Q&A pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with browser-like headers and error classification
//! - Link discovery on listing pages
//! - Per-platform politeness (jitter, burst budget, cool-down, backoff)
//! - The per-URL pipeline and the persistent crawl queue phases

mod backoff;
mod coordinator;
mod fetcher;
pub mod parser;
mod politeness;
mod queue;

pub use backoff::BackoffPolicy;
pub use coordinator::{Coordinator, ProcessedUrl};
pub use fetcher::{
    build_http_client, classify_status, fetch_html, fetch_json, preflight, DocumentKind,
    FetchError, FetchedDocument,
};
pub use parser::{extract_links_regex, parse_html, LinkSource, ParsedPage};
pub use politeness::{jittered_delay, PolitenessController, BURST_WINDOW};
pub use queue::{BatchReport, DirectReport, DiscoveryReport, RunReport};
