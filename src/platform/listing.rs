use super::Platform;
use url::Url;

/// Structural classification of a URL on a known platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// A single thread/article; `id` is the thread identifier when the
    /// platform's pattern exposes one
    Content { id: Option<String> },

    /// A board, category or index page; mined for links, never extracted
    Listing,
}

impl PageKind {
    pub fn is_content(&self) -> bool {
        matches!(self, Self::Content { .. })
    }
}

/// Classifies a URL against the platform's thread pattern
///
/// The pattern is matched against the URL path. Platforms without a pattern
/// treat every URL as content. The thread identifier is the named `id` group,
/// or the last capture group when the pattern has no `id`.
pub fn classify(platform: &Platform, url: &Url) -> PageKind {
    let Some(pattern) = platform.thread_pattern() else {
        return PageKind::Content { id: None };
    };

    match pattern.captures(url.path()) {
        Some(caps) => {
            let id = caps
                .name("id")
                .or_else(|| (1..caps.len()).rev().find_map(|i| caps.get(i)))
                .map(|m| m.as_str().to_string());
            PageKind::Content { id }
        }
        None => PageKind::Listing,
    }
}

impl Platform {
    /// Returns true if the URL is a content page of this platform
    pub fn is_content_url(&self, url: &Url) -> bool {
        classify(self, url).is_content()
    }

    /// Extracts the thread identifier encoded in a content URL
    pub fn thread_id(&self, url: &Url) -> Option<String> {
        match classify(self, url) {
            PageKind::Content { id } => id,
            PageKind::Listing => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::tests::create_test_platform;

    fn platform() -> Platform {
        Platform::new(create_test_platform("forum", &["forum.example.com"])).unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_thread_url_is_content() {
        let kind = classify(&platform(), &url("https://forum.example.com/t/late-checkin/4521"));
        assert_eq!(
            kind,
            PageKind::Content {
                id: Some("4521".to_string())
            }
        );
    }

    #[test]
    fn test_trailing_slash_accepted() {
        assert!(platform().is_content_url(&url("https://forum.example.com/t/slug/12/")));
    }

    #[test]
    fn test_category_and_index_pages_are_listings() {
        let p = platform();
        assert_eq!(classify(&p, &url("https://forum.example.com/c/hosting")), PageKind::Listing);
        assert_eq!(classify(&p, &url("https://forum.example.com/latest")), PageKind::Listing);
        assert_eq!(classify(&p, &url("https://forum.example.com/t/no-id")), PageKind::Listing);
        assert_eq!(classify(&p, &url("https://forum.example.com/")), PageKind::Listing);
    }

    #[test]
    fn test_query_string_does_not_affect_classification() {
        assert!(platform().is_content_url(&url("https://forum.example.com/t/slug/12?page=2")));
    }

    #[test]
    fn test_no_pattern_means_content() {
        let mut config = create_test_platform("help", &["help.example.com"]);
        config.thread_pattern = None;
        let p = Platform::new(config).unwrap();
        assert!(p.is_content_url(&url("https://help.example.com/anything")));
        assert_eq!(p.thread_id(&url("https://help.example.com/anything")), None);
    }

    #[test]
    fn test_thread_id_falls_back_to_last_group() {
        let mut config = create_test_platform("khoros", &["community.example.com"]);
        config.thread_pattern = Some(r"^/t5/([^/]+)/td-p/(\d+)$".to_string());
        let p = Platform::new(config).unwrap();
        assert_eq!(
            p.thread_id(&url("https://community.example.com/t5/Hosting/td-p/998")),
            Some("998".to_string())
        );
    }
}
