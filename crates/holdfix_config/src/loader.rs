//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::HoldfixConfig;
use std::path::Path;

/// Conventional configuration file name.
pub const CONFIG_FILE_NAME: &str = "holdfix.toml";

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<HoldfixConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<HoldfixConfig, ConfigError> {
    let config: HoldfixConfig =
        toml::from_str(content).map_err(|e| ConfigError::Malformed(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &HoldfixConfig) -> Result<(), ConfigError> {
    // Trivial hops must never be free, so the floor is checked like the weight.
    let checks = [
        ("wirelength.weight", config.wirelength.weight == 0),
        ("wirelength.zero_length_floor", config.wirelength.zero_length_floor == 0),
        ("repair.max_attempts", config.repair.max_attempts == 0),
        ("report.top_k", config.report.top_k == 0),
    ];
    match checks.into_iter().find(|&(_, zero)| zero) {
        Some((key, _)) => Err(ConfigError::OutOfRange {
            key,
            reason: "must be at least 1",
        }),
        None => Ok(()),
    }
}
