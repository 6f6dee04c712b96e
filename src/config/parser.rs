use crate::config::types::{Config, PlatformConfig, PlatformTable};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

const DEFAULT_PLATFORMS: &str = include_str!("platforms.toml");

/// Loads and parses a configuration file from the given path
///
/// When the file declares no `[[platform]]` entries the built-in platform
/// table is used instead.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use qa_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Batch size: {}", config.crawler.batch_size);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;

    if config.platforms.is_empty() {
        tracing::info!("No platforms configured, using built-in platform table");
        config.platforms = default_platforms()?;
    }

    validate(&config)?;

    Ok(config)
}

/// Returns the built-in platform table
pub fn default_platforms() -> Result<Vec<PlatformConfig>, ConfigError> {
    let table: PlatformTable = toml::from_str(DEFAULT_PLATFORMS)?;
    Ok(table.platform)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at the start of each run so results can be traced back to the
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
