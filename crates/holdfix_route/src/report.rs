//! Measurement and repair reports.

use crate::classify::{HoldRanking, RankedConnection, SetupRanking};
use crate::data::RoutedDesign;
use crate::entries::{EntryCounts, FabricEntries};
use crate::repair::RepairSummary;
use crate::wirelength::{DesignMeasurement, NetWarning};
use holdfix_config::HoldfixConfig;
use holdfix_device::{Device, NodeKind};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One ranked connection as shown in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Net name.
    pub net: String,
    /// Driver pin label.
    pub driver: String,
    /// Sink pin label.
    pub sink: String,
    /// Measured length.
    pub length: u64,
}

impl ReportEntry {
    fn new(design: &RoutedDesign, device: &dyn Device, ranked: &RankedConnection) -> Self {
        Self {
            net: design
                .net(ranked.net)
                .map(|n| n.name.clone())
                .unwrap_or_else(|_| format!("net#{}", ranked.net)),
            driver: design.pin_label(device, ranked.driver),
            sink: design.pin_label(device, ranked.sink),
            length: ranked.length,
        }
    }
}

/// Usage of one node kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindRow {
    /// Node kind.
    pub kind: NodeKind,
    /// Routed nodes of this kind.
    pub nodes: u64,
    /// Their summed intrinsic length.
    pub length: u64,
}

/// Whole-design measurement report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignReport {
    /// Design name.
    pub design: String,
    /// Nets measured.
    pub nets_analyzed: usize,
    /// Connections of measured nets.
    pub connections: usize,
    /// Connections served by dedicated wiring.
    pub direct_connections: usize,
    /// Routed fabric nodes.
    pub total_nodes: u64,
    /// Summed intrinsic length of routed fabric nodes.
    pub total_length: u64,
    /// Usage per node kind, in report order.
    pub by_kind: Vec<KindRow>,
    /// Longest connections.
    pub setup: Vec<ReportEntry>,
    /// Shortest connections crossing clock regions.
    pub hold: Vec<ReportEntry>,
    /// Sinks the committed routes do not reach.
    pub warnings: Vec<NetWarning>,
    /// Registered fabric entry nodes.
    pub fabric_entries: EntryCounts,
}

impl DesignReport {
    /// Builds a report from a measurement pass.
    pub fn build(
        design: &RoutedDesign,
        device: &dyn Device,
        measurement: &DesignMeasurement,
        config: &HoldfixConfig,
        entries: &FabricEntries,
    ) -> Self {
        let k = config.report.top_k;
        let setup = SetupRanking::new(&measurement.connections)
            .top(k)
            .iter()
            .map(|r| ReportEntry::new(design, device, r))
            .collect();
        let hold = HoldRanking::new(
            design,
            device,
            &measurement.connections,
            config.hold.skew_axis,
        )
        .top(k)
        .iter()
        .map(|r| ReportEntry::new(design, device, r))
        .collect();
        let by_kind = NodeKind::ALL
            .into_iter()
            .filter_map(|kind| {
                measurement.stats.by_kind.get(&kind).map(|u| KindRow {
                    kind,
                    nodes: u.nodes,
                    length: u.length,
                })
            })
            .collect();

        Self {
            design: design.name.clone(),
            nets_analyzed: measurement.nets_analyzed,
            connections: measurement.connections.len(),
            direct_connections: measurement.direct_count(),
            total_nodes: measurement.stats.total_nodes,
            total_length: measurement.stats.total_length,
            by_kind,
            setup,
            hold,
            warnings: measurement.warnings.clone(),
            fabric_entries: entries.counts(),
        }
    }

    /// Renders the report as plain text.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Design: {}", self.design);
        let _ = writeln!(
            out,
            "Nets: {}, connections: {} ({} direct)",
            self.nets_analyzed, self.connections, self.direct_connections
        );
        let _ = writeln!(
            out,
            "Fabric entries: {} ({} driver, {} sink)",
            self.fabric_entries.total, self.fabric_entries.driver, self.fabric_entries.sink
        );
        let _ = writeln!(out, "Total nodes: {}", self.total_nodes);
        let _ = writeln!(out, "Total wirelength: {}", self.total_length);
        if !self.by_kind.is_empty() {
            let _ = writeln!(out, "{:<12} {:>10} {:>12}", "Node kind", "Nodes", "Wirelength");
            for row in &self.by_kind {
                let _ = writeln!(out, "{:<12} {:>10} {:>12}", row.kind.name(), row.nodes, row.length);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Setup (longest):");
        render_entries(&mut out, &self.setup);
        let _ = writeln!(out);
        let _ = writeln!(out, "Hold (shortest, crossing clock regions):");
        render_entries(&mut out, &self.hold);

        if !self.warnings.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Not fully routed: {} sink(s)", self.warnings.len());
        }
        out
    }
}

fn render_entries(out: &mut String, entries: &[ReportEntry]) {
    if entries.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for e in entries {
        let _ = writeln!(out, "  {}, {}, {}, {}", e.net, e.driver, e.sink, e.length);
    }
}

/// Renders a repair summary as plain text.
pub fn render_summary(summary: &RepairSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Hold repair: {} repaired, {} abandoned, {} attempt(s) over {} connection(s)",
        summary.repaired,
        summary.abandoned.len(),
        summary.attempts,
        summary.processed
    );
    if summary.limit_reached {
        let _ = writeln!(out, "  stopped at the connection limit");
    }
    for a in &summary.abandoned {
        let state = if a.restored {
            "previous route restored".to_string()
        } else {
            match a.length_after {
                Some(length) => format!("left at length {length}"),
                None => "left unrouted".to_string(),
            }
        };
        let _ = writeln!(
            out,
            "  abandoned {} ({} -> {}): {}, {}",
            a.net, a.driver, a.sink, a.reason, state
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::{AbandonReason, AbandonedConnection};

    fn entry(net: &str, length: u64) -> ReportEntry {
        ReportEntry {
            net: net.into(),
            driver: "S0/AQ".into(),
            sink: "S1/A1".into(),
            length,
        }
    }

    fn report() -> DesignReport {
        DesignReport {
            design: "top".into(),
            nets_analyzed: 2,
            connections: 3,
            direct_connections: 1,
            total_nodes: 9,
            total_length: 21,
            by_kind: vec![KindRow {
                kind: NodeKind::Quad,
                nodes: 2,
                length: 8,
            }],
            setup: vec![entry("a", 150)],
            hold: vec![entry("b", 40)],
            warnings: Vec::new(),
            fabric_entries: EntryCounts {
                total: 4,
                driver: 2,
                sink: 3,
            },
        }
    }

    #[test]
    fn text_report_sections() {
        let text = report().render_text();
        assert!(text.contains("Total nodes: 9"));
        assert!(text.contains("Total wirelength: 21"));
        assert!(text.contains("Fabric entries: 4 (2 driver, 3 sink)"));
        assert!(text.contains("quad"));
        assert!(text.contains("a, S0/AQ, S1/A1, 150"));
        assert!(text.contains("b, S0/AQ, S1/A1, 40"));
        assert!(!text.contains("Not fully routed"));
    }

    #[test]
    fn empty_rankings_render_none() {
        let mut r = report();
        r.setup.clear();
        r.hold.clear();
        assert_eq!(r.render_text().matches("(none)").count(), 2);
    }

    #[test]
    fn report_json_roundtrip() {
        let r = report();
        let json = serde_json::to_string(&r).unwrap();
        let back: DesignReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn summary_lists_abandoned() {
        let summary = RepairSummary {
            repaired: 1,
            abandoned: vec![AbandonedConnection {
                net: "n".into(),
                driver: "S0/AQ".into(),
                sink: "S1/A1".into(),
                length_before: 40,
                length_after: None,
                attempts: 1,
                reason: AbandonReason::RouterFailed,
                restored: false,
            }],
            processed: 2,
            attempts: 3,
            limit_reached: false,
        };
        let text = render_summary(&summary);
        assert!(text.starts_with("Hold repair: 1 repaired, 1 abandoned"));
        assert!(text.contains("router found no legal detour, left unrouted"));
    }
}
