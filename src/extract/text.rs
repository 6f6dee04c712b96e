//! Text extraction helpers over `scraper` documents
//!
//! Structural whitespace is preserved: block elements become paragraph
//! breaks (a blank line), `<br>` becomes a line break, and all source
//! whitespace inside text nodes collapses to single spaces.

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d[\d,.]*").expect("valid regex"));

/// Elements whose content is never text
const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "svg", "iframe"];

/// Elements that start a new paragraph
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Returns the readable text of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    normalize_text(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                // Source line breaks are insignificant in HTML
                for c in text.chars() {
                    out.push(if c == '\n' || c == '\r' { ' ' } else { c });
                }
            }
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let is_block = BLOCKS.contains(&name);
                if is_block {
                    out.push_str("\n\n");
                }
                collect_text(child_ref, out);
                if is_block {
                    out.push_str("\n\n");
                }
            }
            _ => {}
        }
    }
}

/// Collapses whitespace per line and keeps blank lines as paragraph breaks
///
/// # Example
///
/// ```
/// use qa_harvest::extract::normalize_text;
///
/// assert_eq!(normalize_text("  a   b \n\n\n c\nd "), "a b\n\nc\nd");
/// ```
pub fn normalize_text(raw: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(collapsed);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs.join("\n\n")
}

/// Reduces an HTML fragment (e.g. a rendered forum post) to text
pub fn html_fragment_to_text(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    element_text(parsed.root_element())
}

/// Parses selectors, skipping any that do not parse
pub fn parse_selectors(selectors: &[String]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

/// Text of the first element matching the first selector that yields text
pub fn first_text(scope: ElementRef<'_>, selectors: &[String]) -> Option<String> {
    parse_selectors(selectors).iter().find_map(|selector| {
        scope
            .select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

/// Texts of all elements matching the first selector that yields text
pub fn all_texts(scope: ElementRef<'_>, selectors: &[String]) -> Vec<String> {
    for selector in parse_selectors(selectors) {
        let texts: Vec<String> = scope
            .select(&selector)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();
        if !texts.is_empty() {
            return texts;
        }
    }
    Vec::new()
}

/// Longest element text among all matches of all selectors
pub fn longest_text(scope: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .flat_map(|selector| {
            scope
                .select(&selector)
                .map(element_text)
                .collect::<Vec<_>>()
        })
        .filter(|text| !text.is_empty())
        .max_by_key(|text| text.chars().count())
}

/// Reads the `content` attribute of the first matching meta tag
pub fn meta_content(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .filter_map(|el| el.value().attr("content"))
                .map(normalize_text)
                .find(|content| !content.is_empty())
        })
}

/// Parses the first integer in a vote/kudos label ("1,204 Kudos" -> 1204)
pub fn parse_count(text: &str) -> Option<i64> {
    let raw = NUMBER_RE.find(text)?.as_str();
    let digits: String = raw
        .split('.')
        .next()
        .unwrap_or(raw)
        .chars()
        .filter(|c| *c != ',')
        .collect();
    digits.parse().ok()
}

/// Number of characters (not bytes) in a string
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_text(html: &str) -> String {
        let doc = Html::parse_document(html);
        element_text(doc.root_element())
    }

    #[test]
    fn test_blocks_become_paragraphs() {
        let text = body_text("<body><p>First para</p><p>Second\n   para</p></body>");
        assert_eq!(text, "First para\n\nSecond para");
    }

    #[test]
    fn test_br_is_line_break() {
        let text = body_text("<body><p>line one<br>line two</p></body>");
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn test_skips_script_style_noscript() {
        let text = body_text(
            "<body><script>var x = 1;</script><style>p{}</style><noscript>enable js</noscript><p>Visible</p></body>",
        );
        assert_eq!(text, "Visible");
    }

    #[test]
    fn test_inline_elements_stay_inline() {
        let text = body_text("<body><p>Check <b>in</b> at <a href='#'>3pm</a>.</p></body>");
        assert_eq!(text, "Check in at 3pm.");
    }

    #[test]
    fn test_fragment_to_text() {
        assert_eq!(
            html_fragment_to_text("<p>Hello <em>host</em></p><p>Bye</p>"),
            "Hello host\n\nBye"
        );
    }

    #[test]
    fn test_first_text_skips_empty_matches() {
        let doc = Html::parse_document("<body><h1> </h1><h2>Real title</h2></body>");
        let title = first_text(
            doc.root_element(),
            &["h1".to_string(), "h2".to_string()],
        );
        assert_eq!(title, Some("Real title".to_string()));
    }

    #[test]
    fn test_longest_text() {
        let doc = Html::parse_document(
            "<body><article>short</article><article>much longer text</article></body>",
        );
        assert_eq!(
            longest_text(doc.root_element(), &["article"]),
            Some("much longer text".to_string())
        );
    }

    #[test]
    fn test_meta_content() {
        let doc = Html::parse_document(
            r#"<head><meta property="og:description" content="  A summary  "></head>"#,
        );
        assert_eq!(
            meta_content(&doc, &["meta[property='og:description']"]),
            Some("A summary".to_string())
        );
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,204 Kudos"), Some(1204));
        assert_eq!(parse_count("Score: -3"), Some(-3));
        assert_eq!(parse_count("4.0"), Some(4));
        assert_eq!(parse_count("none"), None);
    }

    #[test]
    fn test_char_count_is_unicode_aware() {
        assert_eq!(char_count("café"), 4);
    }
}
