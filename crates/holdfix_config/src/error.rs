//! Errors raised while reading `holdfix.toml`.

use std::path::PathBuf;

/// Why a `holdfix.toml` could not be turned into a [`HoldfixConfig`](crate::HoldfixConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file named by `--config`, or found beside the snapshot, is unreadable.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The configuration file.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Not valid TOML, or a value of the wrong shape such as an unknown skew axis.
    #[error("malformed holdfix.toml: {0}")]
    Malformed(String),

    /// A setting the measurement or repair pass cannot run with.
    #[error("{key} {reason}")]
    OutOfRange {
        /// Dotted key, e.g. `repair.max_attempts`.
        key: &'static str,
        /// What the value must satisfy.
        reason: &'static str,
    },
}
