use super::text::{element_text, first_text, meta_content, parse_selectors};
use crate::config::PlatformConfig;
use scraper::Html;

/// Selectors tried after the platform's own author selectors
const GENERIC_AUTHOR_SELECTORS: &[&str] = &[
    "[rel='author']",
    "[itemprop='author'] [itemprop='name']",
    "[itemprop='author']",
    ".author-name",
    ".author",
    ".username",
    ".user-name",
    "[data-user-card]",
];

/// Anything longer is a bio or a byline sentence, not a name
const MAX_AUTHOR_CHARS: usize = 80;

/// Secondary author cascade
///
/// Platform author selectors first, then generic markup conventions, then the
/// `author` meta tag.
pub fn find_author(html: &Html, platform: &PlatformConfig) -> Option<String> {
    let root = html.root_element();

    let generic: Vec<String> = GENERIC_AUTHOR_SELECTORS
        .iter()
        .map(|s| s.to_string())
        .collect();

    first_text(root, &platform.selectors.author)
        .filter(|name| plausible(name))
        .or_else(|| {
            parse_selectors(&generic).iter().find_map(|selector| {
                html.select(selector)
                    .map(element_text)
                    .find(|name| plausible(name))
            })
        })
        .or_else(|| meta_content(html, &["meta[name='author']"]).filter(|name| plausible(name)))
}

fn plausible(name: &str) -> bool {
    !name.is_empty() && name.chars().count() <= MAX_AUTHOR_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::tests::create_test_platform;

    fn platform() -> PlatformConfig {
        let mut p = create_test_platform("forum", &["forum.example.com"]);
        p.selectors.author = vec![".poster".to_string()];
        p
    }

    #[test]
    fn test_platform_selector_first() {
        let html = Html::parse_document(
            r#"<body><span class="author">generic</span><span class="poster">specific</span></body>"#,
        );
        assert_eq!(find_author(&html, &platform()).as_deref(), Some("specific"));
    }

    #[test]
    fn test_generic_selectors() {
        let html = Html::parse_document(r#"<body><div class="username">traveller_22</div></body>"#);
        assert_eq!(find_author(&html, &platform()).as_deref(), Some("traveller_22"));
    }

    #[test]
    fn test_meta_author() {
        let html = Html::parse_document(r#"<head><meta name="author" content="Help Team"></head>"#);
        assert_eq!(find_author(&html, &platform()).as_deref(), Some("Help Team"));
    }

    #[test]
    fn test_long_text_is_not_a_name() {
        let bio = "a".repeat(120);
        let html = Html::parse_document(&format!(r#"<body><div class="author">{bio}</div></body>"#));
        assert_eq!(find_author(&html, &platform()), None);
    }
}
