//! Configuration types deserialized from `holdfix.toml`.

use serde::{Deserialize, Serialize};

/// The top-level configuration for measurement and hold repair.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HoldfixConfig {
    /// How per-node contributions are weighted during length propagation.
    #[serde(default)]
    pub wirelength: WirelengthConfig,
    /// Hold-risk classification settings.
    #[serde(default)]
    pub hold: HoldConfig,
    /// Bounds and failure policy of the repair loop.
    #[serde(default)]
    pub repair: RepairConfig,
    /// Report sizing.
    #[serde(default)]
    pub report: ReportConfig,
    /// Which nets are measured at all.
    #[serde(default)]
    pub filter: FilterConfig,
}

/// Length propagation weighting.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WirelengthConfig {
    /// Factor applied to a destination node's intrinsic length.
    pub weight: u64,
    /// Contribution of a fabric node whose intrinsic length is zero.
    pub zero_length_floor: u64,
}

impl Default for WirelengthConfig {
    fn default() -> Self {
        Self {
            weight: 10,
            zero_length_floor: 3,
        }
    }
}

/// Hold-risk classification.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HoldConfig {
    /// Connections shorter than this are repaired.
    pub min_wirelength: u64,
    /// Which clock-region coordinate is compared to detect skew exposure.
    pub skew_axis: SkewAxis,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            min_wirelength: 100,
            skew_axis: SkewAxis::Column,
        }
    }
}

/// The clock-region coordinate along which clock skew is non-negligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkewAxis {
    /// Compare clock-region columns.
    #[default]
    Column,
    /// Compare clock-region rows.
    Row,
}

/// Repair loop bounds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Maximum rip-up/reroute rounds for a single connection.
    pub max_attempts: u32,
    /// Maximum connections processed in one session (`0` = unbounded).
    pub max_connections: usize,
    /// Restore a sink's previous route when the router cannot find a new one.
    pub rollback_on_failure: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_attempts: 16,
            max_connections: 0,
            rollback_on_failure: true,
        }
    }
}

impl RepairConfig {
    /// Returns the session connection limit, if any.
    pub fn connection_limit(&self) -> Option<usize> {
        (self.max_connections > 0).then_some(self.max_connections)
    }
}

/// Report sizing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of entries in each ranking.
    pub top_k: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { top_k: 10 }
    }
}

/// Net selection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Nets whose driver pin or site name contains any of these substrings
    /// are skipped (clock and global-buffer drivers).
    pub skip_driver_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            skip_driver_patterns: vec!["CLK".to_string(), "BUFG".to_string()],
        }
    }
}

impl FilterConfig {
    /// Returns `true` if a driver with this name should be skipped.
    pub fn skips_driver(&self, driver_name: &str) -> bool {
        self.skip_driver_patterns
            .iter()
            .any(|p| driver_name.contains(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HoldfixConfig::default();
        assert_eq!(config.wirelength.weight, 10);
        assert_eq!(config.wirelength.zero_length_floor, 3);
        assert_eq!(config.hold.min_wirelength, 100);
        assert_eq!(config.hold.skew_axis, SkewAxis::Column);
        assert_eq!(config.report.top_k, 10);
        assert!(config.repair.rollback_on_failure);
    }

    #[test]
    fn connection_limit_zero_is_unbounded() {
        let mut repair = RepairConfig::default();
        assert_eq!(repair.connection_limit(), None);
        repair.max_connections = 5;
        assert_eq!(repair.connection_limit(), Some(5));
    }

    #[test]
    fn skips_clock_drivers() {
        let filter = FilterConfig::default();
        assert!(filter.skips_driver("BUFGCE_X0Y12/O"));
        assert!(filter.skips_driver("MMCM/CLKOUT0"));
        assert!(!filter.skips_driver("SLICE_X3Y7/AQ"));
    }
}
