//! Configuration module for QA-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! including the static platform table.
//!
//! # Example
//!
//! ```no_run
//! use qa_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Platforms: {}", config.platforms.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffConfig, Config, ContentType, CrawlerConfig, DirectConfig, EmbeddingConfig,
    JsonApiConfig, OutputConfig, PlatformConfig, PolitenessBudget, QualityConfig, SelectorSet,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, default_platforms, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
