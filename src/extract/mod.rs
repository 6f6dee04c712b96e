//! Content extraction
//!
//! This module turns a fetched document into an `ExtractedCandidate`:
//! - A per-platform table of ordered `ExtractionStrategy` lists
//! - The cascade loop, stopping at the first body that meets the length bar
//! - A secondary author cascade
//! - Redirect/cross-content detection against the requested URL
//!
//! `scraper::Html` is not `Send`, so extraction is synchronous and the parsed
//! document never lives across an await point.

mod author;
mod redirect;
mod strategies;
mod text;

pub use author::find_author;
pub use redirect::redirect_mismatch;
pub use strategies::{
    ArticleHeuristic, BlockScanHeuristic, ContentClassHeuristic, FallbackSelectorStrategy,
    JsonApiStrategy, LineScanHeuristic, MetaTagStrategy, PrimarySelectorStrategy,
};
pub use text::{char_count, element_text, html_fragment_to_text, normalize_text, parse_count};

use crate::config::{ContentType, PlatformConfig};
use crate::crawler::parser::{extract_canonical, extract_title};
use crate::crawler::{DocumentKind, FetchedDocument};
use crate::platform::{Platform, PlatformRegistry};
use crate::{HarvestError, Result};
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// A document prepared for the strategies
pub struct PageInput<'a> {
    pub url: &'a str,
    pub kind: DocumentKind,
    pub html: Option<Html>,
    pub json: Option<Value>,
}

impl<'a> PageInput<'a> {
    /// Parses the fetched body according to its kind
    ///
    /// A JSON body that fails to parse yields a page no strategy can use.
    pub fn from_document(document: &'a FetchedDocument) -> Self {
        let (html, json) = match document.kind {
            DocumentKind::Html => (Some(Html::parse_document(&document.body)), None),
            DocumentKind::Json => match serde_json::from_str(&document.body) {
                Ok(value) => (None, Some(value)),
                Err(e) => {
                    tracing::debug!("Invalid JSON from {}: {}", document.final_url, e);
                    (None, None)
                }
            },
        };

        Self {
            url: &document.requested_url,
            kind: document.kind,
            html,
            json,
        }
    }
}

/// What a single strategy produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutput {
    pub title: Option<String>,
    pub body: String,
    pub author: Option<String>,
    pub votes: Option<i64>,
    pub original_posts: u32,
    pub replies: u32,
}

impl StrategyOutput {
    /// A single block of text, counted as one original post
    pub fn single(title: Option<String>, body: String) -> Self {
        Self {
            title,
            original_posts: u32::from(!body.is_empty()),
            body,
            ..Self::default()
        }
    }

    /// Post bodies in thread order; the first is the original post
    pub fn from_posts(
        title: Option<String>,
        posts: Vec<String>,
        author: Option<String>,
        votes: Option<i64>,
    ) -> Self {
        let count = posts.len() as u32;
        Self {
            title,
            body: posts.join("\n\n"),
            author,
            votes,
            original_posts: count.min(1),
            replies: count.saturating_sub(1),
        }
    }
}

/// One step of an extraction cascade
pub trait ExtractionStrategy: Send + Sync {
    /// Name logged for each cascade step and stored on the record
    fn name(&self) -> &'static str;

    /// Returns `None` when the strategy does not apply to the page at all
    fn extract(&self, page: &PageInput<'_>, platform: &PlatformConfig) -> Option<StrategyOutput>;
}

/// The standard cascade, in order
pub fn default_cascade() -> Vec<Box<dyn ExtractionStrategy>> {
    vec![
        Box::new(JsonApiStrategy),
        Box::new(PrimarySelectorStrategy),
        Box::new(FallbackSelectorStrategy),
        Box::new(ContentClassHeuristic),
        Box::new(ArticleHeuristic),
        Box::new(BlockScanHeuristic::default()),
        Box::new(LineScanHeuristic::default()),
        Box::new(MetaTagStrategy),
    ]
}

/// Transient extraction result, before the quality gate
#[derive(Debug, Clone)]
pub struct ExtractedCandidate {
    pub url: String,
    pub title: String,
    pub body: String,
    pub author: Option<String>,
    pub votes: Option<i64>,
    pub platform: String,
    pub source: String,
    pub content_type: ContentType,
    pub category: Option<String>,
    pub original_posts: u32,
    pub replies: u32,
    pub char_count: usize,

    /// Name of the cascade step that produced the body
    pub strategy: &'static str,

    /// Platform's declared language, else `<html lang>`
    pub language: Option<String>,
}

/// Runs per-platform strategy cascades
pub struct ExtractionEngine {
    tables: HashMap<String, Vec<Box<dyn ExtractionStrategy>>>,
    min_body_chars: usize,
}

impl ExtractionEngine {
    /// Builds the standard cascade for every platform
    pub fn new(registry: &PlatformRegistry, min_body_chars: usize) -> Self {
        let tables = registry
            .iter()
            .map(|p| (p.name().to_string(), default_cascade()))
            .collect();

        Self {
            tables,
            min_body_chars,
        }
    }

    /// Replaces the cascade of one platform
    pub fn register(&mut self, platform: &str, strategies: Vec<Box<dyn ExtractionStrategy>>) {
        self.tables.insert(platform.to_string(), strategies);
    }

    pub fn strategy_names(&self, platform: &str) -> Vec<&'static str> {
        self.tables
            .get(platform)
            .map(|list| list.iter().map(|s| s.name()).collect())
            .unwrap_or_default()
    }

    pub fn min_body_chars(&self) -> usize {
        self.min_body_chars
    }

    /// Extracts a candidate from a fetched document
    ///
    /// # Errors
    ///
    /// - `ParseFailed` when no step yields a body of at least
    ///   `min_body_chars` characters
    /// - `RedirectMismatch` when the page's canonical (or final) URL points at
    ///   other content than was requested
    pub fn extract(
        &self,
        document: &FetchedDocument,
        platform: &Platform,
    ) -> Result<ExtractedCandidate> {
        let page = PageInput::from_document(document);
        let config = &platform.config;

        let fallback;
        let strategies = match self.tables.get(platform.name()) {
            Some(list) => list,
            None => {
                fallback = default_cascade();
                &fallback
            }
        };

        let mut seen_title: Option<String> = None;
        let mut winner = None;
        for strategy in strategies {
            let output = strategy.extract(&page, config);
            let chars = output.as_ref().map_or(0, |o| char_count(&o.body));
            tracing::debug!(
                "Cascade step {} on {} produced {} chars",
                strategy.name(),
                document.requested_url,
                chars
            );

            let Some(output) = output else {
                continue;
            };
            if seen_title.is_none() {
                seen_title = output.title.clone().filter(|t| !t.is_empty());
            }
            if chars >= self.min_body_chars {
                winner = Some((strategy.name(), output));
                break;
            }
        }

        let Some((strategy, output)) = winner else {
            return Err(HarvestError::ParseFailed {
                url: document.requested_url.clone(),
            });
        };

        let title = output
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .or(seen_title)
            .or_else(|| page.html.as_ref().and_then(document_title))
            .unwrap_or_default();

        let author = output
            .author
            .clone()
            .or_else(|| page.html.as_ref().and_then(|html| find_author(html, config)));

        let page_language = page.html.as_ref().and_then(html_language);

        if let Some(html) = page.html.as_ref() {
            let canonical = Url::parse(&document.final_url)
                .ok()
                .and_then(|base| extract_canonical(html, &base));
            let target = canonical.as_deref().unwrap_or(&document.final_url);

            if let Some(reason) = redirect_mismatch(
                platform,
                &document.requested_url,
                target,
                page_language.as_deref(),
                &title,
            ) {
                tracing::warn!(
                    "Discarding {}: resolves to {} ({})",
                    document.requested_url,
                    target,
                    reason
                );
                return Err(HarvestError::RedirectMismatch {
                    url: document.requested_url.clone(),
                    canonical: target.to_string(),
                    reason,
                });
            }
        }

        let char_count = char_count(&output.body);
        tracing::debug!(
            "Extracted {} chars from {} via {} ({} original, {} replies)",
            char_count,
            document.requested_url,
            strategy,
            output.original_posts,
            output.replies
        );

        Ok(ExtractedCandidate {
            url: document.requested_url.clone(),
            title,
            body: output.body,
            author,
            votes: output.votes,
            platform: config.name.clone(),
            source: config.source_label().to_string(),
            content_type: config.content_type,
            category: config.category.clone(),
            original_posts: output.original_posts,
            replies: output.replies,
            char_count,
            strategy,
            language: config.language.clone().or(page_language),
        })
    }
}

/// `<title>`, then `og:title`
fn document_title(html: &Html) -> Option<String> {
    extract_title(html)
        .map(|t| normalize_text(&t))
        .filter(|t| !t.is_empty())
        .or_else(|| text::meta_content(html, &["meta[property='og:title']"]))
}

/// Primary language subtag declared on `<html lang>`
fn html_language(html: &Html) -> Option<String> {
    let selector = Selector::parse("html[lang]").ok()?;
    html.select(&selector)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(|lang| lang.trim().to_ascii_lowercase())
        .filter(|lang| !lang.is_empty())
}
