//! Configuration file loading
//!
//! Reads the TOML configuration from disk, validates it, and optionally
//! computes a content hash for change detection.

use crate::config::{validate_config, Config};
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Loads and validates a configuration file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Parsed and validated configuration
/// * `Err(ConfigError)` - Read, parse, or validation failure
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads a configuration file and returns it with a content hash
///
/// The hash is the hex-encoded SHA-256 of the raw file content, useful for
/// logging which configuration a long-running worker started with.
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate_config(&config)?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok((config, hash))
}
