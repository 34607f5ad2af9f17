//! Parsing and validation of `holdfix.toml` configuration files.
//!
//! Every section has defaults, so an absent or empty file yields the stock
//! [`HoldfixConfig`]: weight 10, zero-length floor 3, minimum wirelength 100,
//! clock-region columns as the skew axis, and top-10 reports.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
