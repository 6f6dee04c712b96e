//! Extraction strategies, in cascade order
//!
//! 1. `JsonApiStrategy` - structured JSON payload fields
//! 2. `PrimarySelectorStrategy` - platform title/post-container/body selectors
//! 3. `FallbackSelectorStrategy` - platform fallback selectors
//! 4. Heuristics: content-class scan, article containers, block scan, line scan
//! 5. `MetaTagStrategy` - `og:description` and friends

use super::text::{
    all_texts, char_count, element_text, first_text, html_fragment_to_text, longest_text,
    meta_content, normalize_text, parse_count, parse_selectors,
};
use super::{ExtractionStrategy, PageInput, StrategyOutput};
use crate::config::{JsonApiConfig, PlatformConfig};
use scraper::Selector;
use serde_json::Value;
use std::collections::HashSet;

/// Reads thread fields from a platform's JSON API response
#[derive(Debug, Default)]
pub struct JsonApiStrategy;

impl JsonApiStrategy {
    fn post_text(post: &Value, api: &JsonApiConfig) -> Option<String> {
        let raw = post.get(&api.body_field)?.as_str()?;
        let text = if api.body_is_html {
            html_fragment_to_text(raw)
        } else {
            normalize_text(raw)
        };
        (!text.is_empty()).then_some(text)
    }

    fn votes(post: &Value, field: &str) -> Option<i64> {
        match post.get(field)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => parse_count(s),
            _ => None,
        }
    }
}

impl ExtractionStrategy for JsonApiStrategy {
    fn name(&self) -> &'static str {
        "json-api"
    }

    fn extract(&self, page: &PageInput<'_>, platform: &PlatformConfig) -> Option<StrategyOutput> {
        let api = platform.api.as_ref()?;
        let json = page.json.as_ref()?;

        let title = json
            .pointer(&api.title_pointer)
            .and_then(Value::as_str)
            .map(normalize_text)
            .filter(|t| !t.is_empty());

        let posts = json.pointer(&api.posts_pointer)?.as_array()?;
        let first = posts.first();
        let texts: Vec<String> = posts
            .iter()
            .filter_map(|post| Self::post_text(post, api))
            .collect();

        let author = match (&api.author_field, first) {
            (Some(field), Some(post)) => post
                .get(field)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            _ => None,
        };
        let votes = match (&api.votes_field, first) {
            (Some(field), Some(post)) => Self::votes(post, field),
            _ => None,
        };

        Some(StrategyOutput::from_posts(title, texts, author, votes))
    }
}

/// Platform primary selectors, post by post
///
/// With post containers configured, each container contributes its body;
/// the first post is the question, the rest are replies. Without containers,
/// every match of the body selector is treated as a post.
#[derive(Debug, Default)]
pub struct PrimarySelectorStrategy;

impl ExtractionStrategy for PrimarySelectorStrategy {
    fn name(&self) -> &'static str {
        "primary-selectors"
    }

    fn extract(&self, page: &PageInput<'_>, platform: &PlatformConfig) -> Option<StrategyOutput> {
        let html = page.html.as_ref()?;
        let root = html.root_element();
        let selectors = &platform.selectors;

        let title = first_text(root, &selectors.title);

        let containers = parse_selectors(&selectors.post_container)
            .into_iter()
            .map(|selector| root.select(&selector).collect::<Vec<_>>())
            .find(|matches| !matches.is_empty());

        let Some(containers) = containers else {
            let texts = all_texts(root, &selectors.body);
            let author = first_text(root, &selectors.author);
            let votes = first_text(root, &selectors.vote_count).and_then(|v| parse_count(&v));
            return Some(StrategyOutput::from_posts(title, texts, author, votes));
        };

        let mut texts = Vec::new();
        let mut author = None;
        let mut votes = None;
        for (index, container) in containers.into_iter().enumerate() {
            let Some(body) = first_text(container, &selectors.body) else {
                continue;
            };
            if index == 0 || texts.is_empty() {
                author = first_text(container, &selectors.author);
                votes = first_text(container, &selectors.vote_count).and_then(|v| parse_count(&v));
            }
            if let Some(date) = first_text(container, &selectors.date) {
                tracing::trace!("Post {} dated {}", index, date);
            }
            texts.push(body);
        }

        Some(StrategyOutput::from_posts(title, texts, author, votes))
    }
}

/// Platform fallback selectors (looser class/tag patterns)
#[derive(Debug, Default)]
pub struct FallbackSelectorStrategy;

impl ExtractionStrategy for FallbackSelectorStrategy {
    fn name(&self) -> &'static str {
        "fallback-selectors"
    }

    fn extract(&self, page: &PageInput<'_>, platform: &PlatformConfig) -> Option<StrategyOutput> {
        let html = page.html.as_ref()?;
        let root = html.root_element();

        let title = first_text(root, &platform.selectors.fallback_title);
        let fallback: Vec<&str> = platform
            .selectors
            .fallback_body
            .iter()
            .map(String::as_str)
            .collect();
        let body = longest_text(root, &fallback)?;

        Some(StrategyOutput::single(title, body))
    }
}

/// Elements with conventional content-area class names
#[derive(Debug, Default)]
pub struct ContentClassHeuristic;

const CONTENT_CLASS_SELECTORS: &[&str] = &[
    "[class*='post-content']",
    "[class*='post-body']",
    "[class*='message-body']",
    "[class*='entry-content']",
    "[class*='article-body']",
    "[class*='answer']",
    "[class*='question']",
    "#content",
    "[role='main']",
];

impl ExtractionStrategy for ContentClassHeuristic {
    fn name(&self) -> &'static str {
        "content-class-scan"
    }

    fn extract(&self, page: &PageInput<'_>, _platform: &PlatformConfig) -> Option<StrategyOutput> {
        let html = page.html.as_ref()?;
        let body = longest_text(html.root_element(), CONTENT_CLASS_SELECTORS)?;
        Some(StrategyOutput::single(None, body))
    }
}

/// `<article>`-like containers
#[derive(Debug, Default)]
pub struct ArticleHeuristic;

impl ExtractionStrategy for ArticleHeuristic {
    fn name(&self) -> &'static str {
        "article-scan"
    }

    fn extract(&self, page: &PageInput<'_>, _platform: &PlatformConfig) -> Option<StrategyOutput> {
        let html = page.html.as_ref()?;
        let body = longest_text(
            html.root_element(),
            &["article", "[itemprop='articleBody']", "[itemprop='text']", "main"],
        )?;
        Some(StrategyOutput::single(None, body))
    }
}

/// Keeps every text block above a size threshold
#[derive(Debug)]
pub struct BlockScanHeuristic {
    pub min_block_chars: usize,
}

impl Default for BlockScanHeuristic {
    fn default() -> Self {
        Self {
            min_block_chars: 80,
        }
    }
}

impl ExtractionStrategy for BlockScanHeuristic {
    fn name(&self) -> &'static str {
        "block-scan"
    }

    fn extract(&self, page: &PageInput<'_>, _platform: &PlatformConfig) -> Option<StrategyOutput> {
        let html = page.html.as_ref()?;
        let selector = Selector::parse("p, blockquote, pre, li, dd, td").ok()?;

        let mut seen = HashSet::new();
        let blocks: Vec<String> = html
            .select(&selector)
            .map(element_text)
            .filter(|text| char_count(text) >= self.min_block_chars)
            .filter(|text| seen.insert(text.clone()))
            .collect();

        if blocks.is_empty() {
            return None;
        }
        Some(StrategyOutput::single(None, blocks.join("\n\n")))
    }
}

/// Last resort: long lines of the whole page text
#[derive(Debug)]
pub struct LineScanHeuristic {
    pub min_line_chars: usize,
    pub max_lines: usize,
}

impl Default for LineScanHeuristic {
    fn default() -> Self {
        Self {
            min_line_chars: 40,
            max_lines: 10,
        }
    }
}

impl ExtractionStrategy for LineScanHeuristic {
    fn name(&self) -> &'static str {
        "line-scan"
    }

    fn extract(&self, page: &PageInput<'_>, _platform: &PlatformConfig) -> Option<StrategyOutput> {
        let html = page.html.as_ref()?;
        let selector = Selector::parse("body").ok()?;
        let scope = html.select(&selector).next().unwrap_or(html.root_element());

        let lines: Vec<String> = element_text(scope)
            .lines()
            .map(str::trim)
            .filter(|line| char_count(line) >= self.min_line_chars)
            .take(self.max_lines)
            .map(str::to_string)
            .collect();

        if lines.is_empty() {
            return None;
        }
        Some(StrategyOutput::single(None, lines.join("\n\n")))
    }
}

/// Meta description tags
#[derive(Debug, Default)]
pub struct MetaTagStrategy;

impl ExtractionStrategy for MetaTagStrategy {
    fn name(&self) -> &'static str {
        "meta-tags"
    }

    fn extract(&self, page: &PageInput<'_>, _platform: &PlatformConfig) -> Option<StrategyOutput> {
        let html = page.html.as_ref()?;
        let body = meta_content(
            html,
            &[
                "meta[property='og:description']",
                "meta[name='twitter:description']",
                "meta[name='description']",
            ],
        )?;
        let title = meta_content(
            html,
            &["meta[property='og:title']", "meta[name='twitter:title']"],
        );
        Some(StrategyOutput::single(title, body))
    }
}
