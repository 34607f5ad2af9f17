//! Where in a routed design a diagnostic applies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The design element a diagnostic refers to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    /// The design as a whole.
    Design,
    /// A whole net.
    Net {
        /// Net name.
        net: String,
    },
    /// One driver-to-sink connection of a net.
    Connection {
        /// Net name.
        net: String,
        /// Driver pin, as `site/pin`.
        driver: String,
        /// Sink pin, as `site/pin`.
        sink: String,
    },
}

impl Location {
    /// Creates a net location.
    pub fn net(net: impl Into<String>) -> Self {
        Location::Net { net: net.into() }
    }

    /// Creates a connection location.
    pub fn connection(
        net: impl Into<String>,
        driver: impl Into<String>,
        sink: impl Into<String>,
    ) -> Self {
        Location::Connection {
            net: net.into(),
            driver: driver.into(),
            sink: sink.into(),
        }
    }

    /// Returns `true` for [`Location::Design`].
    pub fn is_design(&self) -> bool {
        matches!(self, Location::Design)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Design => write!(f, "design"),
            Location::Net { net } => write!(f, "net {net}"),
            Location::Connection { net, driver, sink } => {
                write!(f, "net {net} ({driver} -> {sink})")
            }
        }
    }
}
