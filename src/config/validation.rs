use crate::config::types::{
    BackoffConfig, Config, CrawlerConfig, PlatformConfig, QualityConfig,
};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_backoff_config(&config.backoff)?;
    validate_quality_config(&config.quality)?;
    validate_output_config(&config.output)?;
    validate_platforms(&config.platforms)?;
    validate_direct_urls(&config.direct.urls)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if !(0.0..1.0).contains(&config.jitter_ratio) {
        return Err(ConfigError::Validation(format!(
            "jitter_ratio must be in [0, 1), got {}",
            config.jitter_ratio
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 120, got {}",
            config.request_timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_backoff_config(config: &BackoffConfig) -> Result<(), ConfigError> {
    if config.multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff multiplier must be >= 1.0, got {}",
            config.multiplier
        )));
    }

    if config.cap_ms < config.base_ms {
        return Err(ConfigError::Validation(format!(
            "backoff cap ({}ms) must not be below base ({}ms)",
            config.cap_ms, config.base_ms
        )));
    }

    Ok(())
}

fn validate_quality_config(config: &QualityConfig) -> Result<(), ConfigError> {
    if config.landing_page_chars < config.min_body_chars {
        return Err(ConfigError::Validation(format!(
            "landing_page_chars ({}) must be >= min_body_chars ({})",
            config.landing_page_chars, config.min_body_chars
        )));
    }

    if config.max_chunks < 1 {
        return Err(ConfigError::Validation(
            "max_chunks must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the platform table
fn validate_platforms(platforms: &[PlatformConfig]) -> Result<(), ConfigError> {
    if platforms.is_empty() {
        return Err(ConfigError::NoPlatforms);
    }

    let mut names = HashSet::new();
    for platform in platforms {
        if platform.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "platform name cannot be empty".to_string(),
            ));
        }

        if !names.insert(platform.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate platform name '{}'",
                platform.name
            )));
        }

        validate_platform(platform)?;
    }

    Ok(())
}

/// Validates a single platform entry
fn validate_platform(platform: &PlatformConfig) -> Result<(), ConfigError> {
    Url::parse(&platform.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid base_url for platform '{}': {}",
            platform.name, e
        ))
    })?;

    if platform.domains.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Platform '{}' must declare at least one domain",
            platform.name
        )));
    }

    for domain in &platform.domains {
        validate_domain_pattern(domain)?;
    }

    let selectors = &platform.selectors;
    if selectors.title.is_empty() || selectors.body.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Platform '{}' must have non-empty primary title and body selectors",
            platform.name
        )));
    }

    if selectors.fallback_title.is_empty() || selectors.fallback_body.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Platform '{}' must have non-empty fallback title and body selectors",
            platform.name
        )));
    }

    for (_, selector) in selectors.all() {
        if Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector {
                platform: platform.name.clone(),
                selector: selector.clone(),
            });
        }
    }

    if let Some(pattern) = &platform.thread_pattern {
        Regex::new(pattern).map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid thread_pattern for platform '{}': {}",
                platform.name, e
            ))
        })?;
    }

    if platform.politeness.burst < 1 {
        return Err(ConfigError::Validation(format!(
            "Platform '{}' burst must be >= 1",
            platform.name
        )));
    }

    if platform.politeness.interval_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "Platform '{}' interval_ms must be >= 100ms, got {}ms",
            platform.name, platform.politeness.interval_ms
        )));
    }

    for listing in &platform.listing_urls {
        Url::parse(listing).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid listing URL '{}': {}", listing, e))
        })?;
    }

    if let Some(api) = &platform.api {
        if !api.url_template.contains("{url}") {
            return Err(ConfigError::Validation(format!(
                "Platform '{}' api url_template must contain {{url}}",
                platform.name
            )));
        }
    }

    Ok(())
}

fn validate_direct_urls(urls: &[String]) -> Result<(), ConfigError> {
    for url in urls {
        Url::parse(url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid direct URL '{}': {}", url, e)))?;
    }
    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)?;
    } else {
        validate_domain_string(pattern)?;
    }

    Ok(())
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
