//! HTML link discovery
//!
//! This module extracts from listing pages:
//! - Anchor hrefs (via an HTML parser)
//! - The canonical link
//! - Page title
//!
//! When the parser finds no anchors in a non-empty document, a regex scan of
//! raw `href="..."` attributes is used instead. That covers markup broken
//! enough that anchors never make it into the DOM.

use crate::url::normalize_url;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).expect("valid regex"));

/// How links were obtained from a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    Parser,
    RegexFallback,
}

/// Extracted information from a listing page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Normalized absolute links, deduplicated, in document order
    pub links: Vec<String>,

    pub canonical: Option<String>,

    pub source: LinkSource,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only links
/// - Non-HTTP(S) URLs after resolution
///
/// Links are resolved against `base_url` and normalized, so the same thread
/// linked with tracking parameters or a fragment yields one entry.
///
/// # Example
///
/// ```
/// use qa_harvest::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/t/a/1">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/latest").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/t/a/1".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let canonical = extract_canonical(&document, base_url);
    let mut links = extract_anchor_links(&document, base_url);
    let mut source = LinkSource::Parser;

    if links.is_empty() && !html.trim().is_empty() {
        links = extract_links_regex(html, base_url);
        if !links.is_empty() {
            tracing::debug!(
                "No anchors parsed on {}, regex fallback found {} links",
                base_url,
                links.len()
            );
            source = LinkSource::RegexFallback;
        }
    }

    ParsedPage {
        title,
        links,
        canonical,
        source,
    }
}

/// Extracts the page title from the HTML document
pub(crate) fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts the absolute canonical URL, if declared
pub(crate) fn extract_canonical(document: &Html, base_url: &Url) -> Option<String> {
    let selector = Selector::parse("link[rel='canonical'][href]").ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .find_map(|href| resolve_link(href, base_url))
}

fn extract_anchor_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let hrefs = document
        .select(&a_selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"));

    dedup_resolved(hrefs, base_url)
}

/// Scans raw markup for `href` attributes
pub fn extract_links_regex(html: &str, base_url: &Url) -> Vec<String> {
    let hrefs = HREF_RE
        .captures_iter(html)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()));

    dedup_resolved(hrefs, base_url)
}

fn dedup_resolved<'a>(hrefs: impl Iterator<Item = &'a str>, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    hrefs
        .filter_map(|href| resolve_link(href, base_url))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid or non-HTTP(S) URLs
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_url(absolute.as_str()).ok().map(|u| u.to_string())
}
