use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Maximum slug length in characters
pub const MAX_SLUG_CHARS: usize = 80;

/// Slug used when a title has no usable characters
pub const EMPTY_SLUG: &str = "thread";

/// Digest of normalized body text
///
/// Case, punctuation and whitespace differences do not change the hash, so
/// the same post mirrored under two URLs collides.
///
/// # Example
///
/// ```
/// use qa_harvest::persist::content_hash;
///
/// assert_eq!(content_hash("Hello,   World!"), content_hash("hello world"));
/// ```
pub fn content_hash(body: &str) -> String {
    let stripped: String = body
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let normalized = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derives a URL slug from a title
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;

    for c in title.to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    let truncated: String = slug.chars().take(MAX_SLUG_CHARS).collect();
    let trimmed = truncated.trim_end_matches('-');

    if trimmed.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Lowercase alphanumeric suffix
pub fn random_suffix<R: Rng>(len: usize, rng: &mut R) -> String {
    (0..len)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect()
}

/// Splits body text into paragraph chunks for embedding
///
/// Paragraphs are separated by blank lines; those shorter than `min_chars`
/// are dropped, and at most `max_chunks` are kept.
pub fn chunk_paragraphs(body: &str, min_chars: usize, max_chunks: usize) -> Vec<String> {
    body.split("\n\n")
        .map(str::trim)
        .filter(|p| p.chars().count() >= min_chars)
        .take(max_chunks)
        .map(str::to_string)
        .collect()
}
