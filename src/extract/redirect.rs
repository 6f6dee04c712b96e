use crate::platform::{classify, PageKind, Platform};
use crate::url::same_resource;
use url::Url;

/// Detects a silent redirect to unrelated content
///
/// `resolved` is the page's canonical URL, or the final URL after redirects
/// when no canonical is declared. Nothing is reported when it names the same
/// resource as `requested`. Otherwise the candidate is discarded when:
/// - both URLs carry a thread id and the ids differ
/// - the resolved URL is a listing page of this platform
/// - the page declares a language other than the platform's
/// - the title contains one of the platform's foreign-edition markers
///
/// This is a best-effort guard; callers log the reason for manual review.
pub fn redirect_mismatch(
    platform: &Platform,
    requested: &str,
    resolved: &str,
    page_language: Option<&str>,
    title: &str,
) -> Option<String> {
    if same_resource(requested, resolved) {
        return None;
    }

    let requested_url = Url::parse(requested).ok();
    let resolved_url = Url::parse(resolved).ok();

    if let (Some(req), Some(res)) = (&requested_url, &resolved_url) {
        if platform.serves_host(&crate::url::extract_domain(res).unwrap_or_default()) {
            match (classify(platform, req), classify(platform, res)) {
                (PageKind::Content { id: Some(a) }, PageKind::Content { id: Some(b) }) if a != b => {
                    return Some(format!("thread id {} differs from requested {}", b, a));
                }
                (PageKind::Content { .. }, PageKind::Listing) => {
                    return Some("resolves to a listing page".to_string());
                }
                _ => {}
            }
        }
    }

    if let (Some(expected), Some(actual)) = (platform.config.language.as_deref(), page_language) {
        if primary_subtag(expected) != primary_subtag(actual) {
            return Some(format!("page language {} instead of {}", actual, expected));
        }
    }

    let lowered = title.to_lowercase();
    platform
        .config
        .foreign_title_markers
        .iter()
        .find(|marker| !marker.is_empty() && lowered.contains(&marker.to_lowercase()))
        .map(|marker| format!("title carries foreign marker '{}'", marker))
}

fn primary_subtag(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or(tag)
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::tests::create_test_platform;

    fn platform() -> Platform {
        let mut config = create_test_platform("forum", &["forum.example.com"]);
        config.foreign_title_markers = vec!["Communauté".to_string()];
        Platform::new(config).unwrap()
    }

    const REQUESTED: &str = "https://forum.example.com/t/late-checkin/42";

    #[test]
    fn test_same_resource_is_fine() {
        let p = platform();
        assert!(redirect_mismatch(&p, REQUESTED, REQUESTED, Some("fr"), "Communauté").is_none());
    }

    #[test]
    fn test_different_thread_id() {
        let reason = redirect_mismatch(
            &platform(),
            REQUESTED,
            "https://forum.example.com/t/other/7",
            None,
            "",
        )
        .unwrap();
        assert!(reason.contains("thread id 7"));
    }

    #[test]
    fn test_same_id_different_slug_passes() {
        assert!(redirect_mismatch(
            &platform(),
            REQUESTED,
            "https://forum.example.com/t/renamed-slug/42",
            Some("en-US"),
            "Late check-in"
        )
        .is_none());
    }

    #[test]
    fn test_redirect_to_listing() {
        let reason = redirect_mismatch(
            &platform(),
            REQUESTED,
            "https://forum.example.com/c/hosting",
            None,
            "",
        );
        assert_eq!(reason.as_deref(), Some("resolves to a listing page"));
    }

    #[test]
    fn test_language_mismatch() {
        let reason = redirect_mismatch(
            &platform(),
            REQUESTED,
            "https://fr.forum.example.com/t/late-checkin/42",
            Some("fr-FR"),
            "",
        )
        .unwrap();
        assert!(reason.contains("fr-FR"));
    }

    #[test]
    fn test_foreign_title_marker() {
        let reason = redirect_mismatch(
            &platform(),
            REQUESTED,
            "https://other.example.net/x",
            None,
            "Arrivée tardive - communauté",
        )
        .unwrap();
        assert!(reason.contains("Communauté"));
    }
}
