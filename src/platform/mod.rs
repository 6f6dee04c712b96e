//! Platform resolution
//!
//! Maps URLs to the static platform table. A `PlatformRegistry` is built once
//! from the configuration and shared read-only by discovery, the crawl queue
//! and direct mode.
//!
//! # Components
//!
//! - `Platform`: a platform configuration with its thread pattern compiled
//! - `PlatformRegistry`: domain-pattern lookup over all platforms
//! - `listing`: content-page vs listing-page classification

mod listing;

pub use listing::{classify, PageKind};

use crate::config::PlatformConfig;
use crate::url::{extract_domain, matches_wildcard};
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use std::sync::Arc;
use url::Url;

/// A configured platform, ready for matching
#[derive(Debug)]
pub struct Platform {
    pub config: PlatformConfig,
    thread_pattern: Option<Regex>,
}

impl Platform {
    /// Compiles the platform's thread pattern
    pub fn new(config: PlatformConfig) -> ConfigResult<Self> {
        let thread_pattern = match &config.thread_pattern {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                ConfigError::Validation(format!(
                    "Invalid thread-pattern for platform '{}': {}",
                    config.name, e
                ))
            })?),
            None => None,
        };

        Ok(Self {
            config,
            thread_pattern,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns true if the host belongs to this platform
    pub fn serves_host(&self, host: &str) -> bool {
        self.config
            .domains
            .iter()
            .any(|pattern| matches_wildcard(&pattern.to_lowercase(), host))
    }

    pub(crate) fn thread_pattern(&self) -> Option<&Regex> {
        self.thread_pattern.as_ref()
    }
}

/// Lookup table from URL host to platform
#[derive(Debug, Clone, Default)]
pub struct PlatformRegistry {
    platforms: Vec<Arc<Platform>>,
}

impl PlatformRegistry {
    /// Builds the registry in configuration order
    ///
    /// When several platforms claim the same host, the first one wins.
    pub fn new(configs: &[PlatformConfig]) -> ConfigResult<Self> {
        if configs.is_empty() {
            return Err(ConfigError::NoPlatforms);
        }

        let platforms = configs
            .iter()
            .cloned()
            .map(|c| Platform::new(c).map(Arc::new))
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self { platforms })
    }

    /// Finds the platform serving a URL
    ///
    /// Returns `None` for unparseable URLs and hosts no platform claims; the
    /// caller logs and skips those.
    pub fn resolve(&self, url: &str) -> Option<Arc<Platform>> {
        let parsed = Url::parse(url).ok()?;
        self.resolve_url(&parsed)
    }

    pub fn resolve_url(&self, url: &Url) -> Option<Arc<Platform>> {
        let host = extract_domain(url)?;
        self.platforms
            .iter()
            .find(|p| p.serves_host(&host))
            .cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<Platform>> {
        self.platforms.iter().find(|p| p.name() == name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Platform>> {
        self.platforms.iter()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}
