use url::Url;

/// Extracts the lowercase host from a URL, without any `www.` prefix
///
/// # Examples
///
/// ```
/// use url::Url;
/// use qa_harvest::url::extract_domain;
///
/// let url = Url::parse("https://www.Community.Example.com/t/1").unwrap();
/// assert_eq!(extract_domain(&url), Some("community.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(stripped) => stripped.to_string(),
            None => host,
        }
    })
}
