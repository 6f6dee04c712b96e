//! URL handling module for QA-Harvest
//!
//! This module provides URL normalization, host extraction and platform
//! domain pattern matching.

mod domain;
mod matcher;
mod normalize;

pub use domain::extract_domain;
pub use matcher::matches_wildcard;
pub use normalize::normalize_url;

/// Returns true if two URLs normalize to the same resource
///
/// Unparseable input never compares equal.
pub fn same_resource(a: &str, b: &str) -> bool {
    match (normalize_url(a), normalize_url(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
