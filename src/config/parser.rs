//! TOML configuration loading and validation

use crate::config::Config;
use crate::ConfigError;
use std::fs;
use std::path::Path;
use url::Url;

/// Loads and validates a configuration file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - File unreadable, TOML invalid, or validation failed
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates a configuration, whether loaded from file or built from flags
///
/// Checks:
/// - The seed URL parses and carries a host
/// - Worker count is at least 1
/// - Queue ceiling is at least 1
/// - Fetch timeout is non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let seed = Url::parse(&config.crawl.seed_url)
        .map_err(|e| ConfigError::InvalidSeed(format!("{}: {}", config.crawl.seed_url, e)))?;

    if seed.host_str().is_none() {
        return Err(ConfigError::InvalidSeed(format!(
            "{}: missing host",
            config.crawl.seed_url
        )));
    }

    if !matches!(seed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidSeed(format!(
            "{}: unsupported scheme '{}'",
            config.crawl.seed_url,
            seed.scheme()
        )));
    }

    if config.crawl.workers == 0 {
        return Err(ConfigError::Validation(
            "workers must be at least 1".to_string(),
        ));
    }

    if config.crawl.queue_ceiling == 0 {
        return Err(ConfigError::Validation(
            "queue-ceiling must be at least 1".to_string(),
        ));
    }

    if config.fetch.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be non-zero".to_string(),
        ));
    }

    Ok(())
}
