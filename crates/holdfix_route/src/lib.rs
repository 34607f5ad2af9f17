//! Post-route wirelength measurement and hold-time repair.
//!
//! This crate measures, for every signal net of a placed and routed design,
//! the accumulated length from the driver to each sink along the net's
//! committed route. Short connections whose endpoints sit in different clock
//! regions are hold-risk candidates; [`HoldFixer::fix_hold_violations`]
//! reroutes them one sink at a time, excluding the nodes of previous short
//! paths, until they meet the configured minimum length.
//!
//! # Pipeline
//!
//! 1. **Model**: decompose each net into driver-to-sink [`Connection`]s
//! 2. **Measure**: propagate lengths breadth-first over the committed route
//! 3. **Classify**: rank connections for setup and hold risk
//! 4. **Repair**: rip up, avoid, and reroute hold-risk connections
//!
//! # Usage
//!
//! ```ignore
//! use holdfix_route::{HoldFixer, MazeRouter};
//!
//! let mut fixer = HoldFixer::new(&device, config);
//! let before = fixer.report(&design, &sink)?;
//! let summary = fixer.fix_hold_violations(&mut design, &mut MazeRouter::new(), &sink)?;
//! let after = fixer.report(&design, &sink)?;
//! ```

#![warn(missing_docs)]

pub mod avoid;
pub mod classify;
pub mod data;
pub mod entries;
pub mod error;
pub mod ids;
pub mod net_wrapper;
pub mod repair;
pub mod report;
pub mod router;
pub mod wirelength;

pub use avoid::AvoidSet;
pub use classify::{HoldRanking, RankedConnection, SetupRanking};
pub use data::{NetKind, PhysNet, PinRole, RouteGraph, RoutedDesign, SitePin};
pub use entries::{EntryCounts, EntryRole, FabricEntries, FabricEntry};
pub use error::RepairError;
pub use ids::{NetId, PinId};
pub use net_wrapper::{Connection, ConnectionKey, NetWrapper};
pub use repair::{AbandonReason, AbandonedConnection, RepairSummary};
pub use report::{DesignReport, ReportEntry};
pub use router::{MazeRouter, NodeOccupancy, RouteFailure, Router};
pub use wirelength::{DesignMeasurement, MeasurementStats, NetWarning, Weighting, WirelengthMap};

use holdfix_config::HoldfixConfig;
use holdfix_device::Device;
use holdfix_diagnostics::DiagnosticSink;

/// Measurement and repair over one device.
///
/// Holds the configuration and the fabric entry registry shared by every
/// pass run through it.
#[derive(Debug)]
pub struct HoldFixer<'a> {
    device: &'a dyn Device,
    config: HoldfixConfig,
    entries: FabricEntries,
}

impl<'a> HoldFixer<'a> {
    /// Creates a fixer for `device`.
    pub fn new(device: &'a dyn Device, config: HoldfixConfig) -> Self {
        Self {
            device,
            config,
            entries: FabricEntries::new(),
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &HoldfixConfig {
        &self.config
    }

    /// Returns the fabric entry registry.
    pub fn entries(&self) -> &FabricEntries {
        &self.entries
    }

    /// Measures every analyzable net of `design`.
    pub fn measure(
        &mut self,
        design: &RoutedDesign,
        sink: &DiagnosticSink,
    ) -> Result<DesignMeasurement, RepairError> {
        wirelength::measure_design(
            design,
            self.device,
            Weighting::from(&self.config.wirelength),
            &self.config.filter,
            &mut self.entries,
            sink,
        )
    }

    /// Measures `design` and builds the setup/hold report.
    pub fn report(
        &mut self,
        design: &RoutedDesign,
        sink: &DiagnosticSink,
    ) -> Result<DesignReport, RepairError> {
        let measurement = self.measure(design, sink)?;
        Ok(DesignReport::build(
            design,
            self.device,
            &measurement,
            &self.config,
            &self.entries,
        ))
    }

    /// Repairs hold-risk connections of `design` using `router`.
    pub fn fix_hold_violations(
        &mut self,
        design: &mut RoutedDesign,
        router: &mut dyn Router,
        sink: &DiagnosticSink,
    ) -> Result<RepairSummary, RepairError> {
        repair::fix_hold_violations(
            design,
            self.device,
            router,
            &self.config,
            &mut self.entries,
            sink,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdfix_device::{ClockRegion, DeviceGraph, NodeKind, TileType};

    /// One net whose single sink sits one clock-region column away.
    fn crossing() -> (DeviceGraph, RoutedDesign) {
        let mut dev = DeviceGraph::new("x");
        let int = dev.add_tile("INT_X0Y0", 0, 0, TileType::Interconnect, ClockRegion::new(0, 0));
        let clb0 = dev.add_tile("CLB_X0Y0", 0, 1, TileType::Logic, ClockRegion::new(0, 0));
        let clb1 = dev.add_tile("CLB_X9Y0", 9, 0, TileType::Logic, ClockRegion::new(1, 0));
        let s0 = dev.add_site("SLICE_X0Y0", clb0);
        let s1 = dev.add_site("SLICE_X9Y0", clb1);
        let aq = dev.add_node("AQ", clb0, NodeKind::SitePin);
        let out = dev.add_node("OUT", int, NodeKind::Output);
        let hop = dev.add_node("HOP", int, NodeKind::Double);
        let feed = dev.add_node("IMUX", int, NodeKind::PinFeed);
        let a1 = dev.add_node("A1", clb1, NodeKind::SitePin);
        let edges = [
            dev.add_edge(aq, out),
            dev.add_edge(out, hop),
            dev.add_edge(hop, feed),
            dev.add_edge(feed, a1),
        ];
        dev.add_site_pin(s0, "AQ", aq);
        dev.add_site_pin(s1, "A1", a1);

        let mut design = RoutedDesign::new("x");
        let src = design.add_pin(s0, "AQ", PinRole::General);
        let dst = design.add_pin(s1, "A1", PinRole::General);
        let mut net = PhysNet::new("n", NetKind::Wire, Some(src));
        net.sinks = vec![dst];
        net.routing = edges.into_iter().collect();
        design.add_net(net);
        (dev, design)
    }

    #[test]
    fn report_ranks_crossing_connection() {
        let (dev, design) = crossing();
        let sink = DiagnosticSink::new();
        let mut fixer = HoldFixer::new(&dev, HoldfixConfig::default());
        let report = fixer.report(&design, &sink).unwrap();
        // HOP contributes 20, IMUX the floor of 3.
        assert_eq!(report.setup.len(), 1);
        assert_eq!(report.hold.len(), 1);
        assert_eq!(report.hold[0].length, 23);
        assert_eq!(report.hold[0].sink, "SLICE_X9Y0/A1");
        assert_eq!(report.fabric_entries.total, 2);
        assert_eq!(report.fabric_entries.driver, 1);
        assert_eq!(report.fabric_entries.sink, 1);
        assert!(!sink.has_errors());
    }

    #[test]
    fn rescan_does_not_grow_registry() {
        let (dev, design) = crossing();
        let sink = DiagnosticSink::new();
        let mut fixer = HoldFixer::new(&dev, HoldfixConfig::default());
        fixer.measure(&design, &sink).unwrap();
        fixer.measure(&design, &sink).unwrap();
        assert_eq!(fixer.entries().len(), 2);
    }

    #[test]
    fn unreachable_detour_is_abandoned_and_restored() {
        let (dev, mut design) = crossing();
        let before = design.nets[0].routing.clone();
        let sink = DiagnosticSink::new();
        let mut fixer = HoldFixer::new(&dev, HoldfixConfig::default());
        let summary = fixer
            .fix_hold_violations(&mut design, &mut MazeRouter::new(), &sink)
            .unwrap();
        assert_eq!(summary.repaired, 0);
        assert_eq!(summary.abandoned.len(), 1);
        assert_eq!(summary.abandoned[0].reason, AbandonReason::RouterFailed);
        assert!(summary.abandoned[0].restored);
        assert_eq!(design.nets[0].routing, before);
    }
}
