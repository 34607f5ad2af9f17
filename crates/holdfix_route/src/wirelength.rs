//! Wirelength propagation over committed routes.
//!
//! A net's route is a tree, so a node's accumulated length depends on its
//! upstream node having been resolved first. [`propagate`] walks the route
//! breadth-first from the driver entry nodes, so the result does not depend
//! on the order the route's edges were supplied in.

use crate::data::{RouteGraph, RoutedDesign};
use crate::entries::{EntryRole, FabricEntries};
use crate::error::RepairError;
use crate::ids::NetId;
use crate::net_wrapper::{build_net_wrapper, is_analyzable, Connection, NetWrapper};
use holdfix_config::{FilterConfig, WirelengthConfig};
use holdfix_device::{Device, NodeId, NodeKind, MAX_PROJECTION_HOPS};
use holdfix_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Location};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Per-hop length weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weighting {
    /// Factor applied to the destination node's intrinsic length.
    pub weight: u64,
    /// Contribution of a zero-length fabric node.
    pub zero_length_floor: u64,
}

impl Default for Weighting {
    fn default() -> Self {
        Self::from(&WirelengthConfig::default())
    }
}

impl From<&WirelengthConfig> for Weighting {
    fn from(config: &WirelengthConfig) -> Self {
        Self {
            weight: config.weight,
            zero_length_floor: config.zero_length_floor,
        }
    }
}

impl Weighting {
    /// Returns the contribution of entering `node`.
    ///
    /// Only fabric nodes contribute; dedicated site wiring is free. The
    /// weighted length saturates instead of overflowing.
    pub fn contribution(&self, device: &dyn Device, node: NodeId) -> Option<u64> {
        let length = device.node_length(node)?;
        if !device.is_fabric_node(node) {
            return Some(0);
        }
        match self.weight.saturating_mul(u64::from(length)) {
            0 => Some(self.zero_length_floor),
            weighted => Some(weighted),
        }
    }
}

/// Accumulated length from the driver at every node a route reaches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WirelengthMap {
    lengths: BTreeMap<NodeId, u64>,
}

impl WirelengthMap {
    /// Returns the accumulated length at `node`, if reached.
    pub fn get(&self, node: NodeId) -> Option<u64> {
        self.lengths.get(&node).copied()
    }

    /// Returns the number of reached nodes.
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    /// Returns `true` if no node was reached.
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Iterates over reached nodes in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.lengths.iter().map(|(&n, &l)| (n, l))
    }
}

/// Breadth-first length propagation from `roots` over a committed route.
///
/// Every root starts at 0. A node is assigned once, on first reach, with
/// its upstream node's length plus the contribution of entering it.
pub fn propagate(
    device: &dyn Device,
    net_name: &str,
    route: &RouteGraph,
    roots: &[NodeId],
    weighting: Weighting,
) -> Result<WirelengthMap, RepairError> {
    let mut lengths: BTreeMap<NodeId, u64> = BTreeMap::new();
    let mut queue = VecDeque::new();
    for &root in roots {
        if lengths.insert(root, 0).is_none() {
            queue.push_back(root);
        }
    }
    while let Some(node) = queue.pop_front() {
        let upstream = lengths.get(&node).copied().unwrap_or_default();
        if !route.contains_node(node) {
            continue;
        }
        for next in route.neighbors_directed(node, Direction::Outgoing) {
            if lengths.contains_key(&next) {
                continue;
            }
            let step = weighting
                .contribution(device, next)
                .ok_or_else(|| RepairError::UnknownNode {
                    net: net_name.to_string(),
                    node: next,
                })?;
            lengths.insert(next, upstream.saturating_add(step));
            queue.push_back(next);
        }
    }
    Ok(WirelengthMap { lengths })
}

/// Returns the fabric node through which the committed route feeds `pin_node`.
///
/// Follows the route uphill from the pin through dedicated wiring. A pin
/// with several pin-feed nodes may be reached through any of them, so the
/// route decides which one counts.
fn routed_sink_entry(device: &dyn Device, route: &RouteGraph, pin_node: NodeId) -> Option<NodeId> {
    let mut node = pin_node;
    for _ in 0..=MAX_PROJECTION_HOPS {
        if device.is_fabric_node(node) {
            return Some(node);
        }
        if !route.contains_node(node) {
            return None;
        }
        node = route.neighbors_directed(node, Direction::Incoming).next()?;
    }
    None
}

/// Node count and raw length of one node kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindUsage {
    /// Number of routed nodes of this kind.
    pub nodes: u64,
    /// Sum of their intrinsic lengths.
    pub length: u64,
}

/// Routing resource statistics for one measurement pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementStats {
    /// Routed fabric nodes.
    pub total_nodes: u64,
    /// Sum of their intrinsic lengths.
    pub total_length: u64,
    /// Breakdown by node kind.
    pub by_kind: BTreeMap<NodeKind, KindUsage>,
}

impl MeasurementStats {
    /// Records one routed node.
    pub fn record(&mut self, kind: NodeKind, length: u32) {
        self.total_nodes += 1;
        self.total_length += u64::from(length);
        let usage = self.by_kind.entry(kind).or_default();
        usage.nodes += 1;
        usage.length += u64::from(length);
    }

    /// Adds another pass's counts to this one.
    pub fn merge(&mut self, other: &MeasurementStats) {
        self.total_nodes += other.total_nodes;
        self.total_length += other.total_length;
        for (&kind, usage) in &other.by_kind {
            let mine = self.by_kind.entry(kind).or_default();
            mine.nodes += usage.nodes;
            mine.length += usage.length;
        }
    }
}

/// A sink whose fabric entry the committed route does not reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetWarning {
    /// Net name.
    pub net: String,
    /// Sink pin label.
    pub sink: String,
}

/// The result of measuring one net.
#[derive(Debug, Clone)]
pub struct NetMeasurement {
    /// The net's connections with lengths filled in.
    pub wrapper: NetWrapper,
    /// Accumulated lengths over the committed route.
    pub lengths: WirelengthMap,
    /// Resource usage of the committed route.
    pub stats: MeasurementStats,
    /// Sinks the route does not reach.
    pub warnings: Vec<NetWarning>,
}

/// Measures one net: propagates lengths over its committed route and reads
/// each fabric connection's length at its sink entry node.
///
/// When the route reaches the sink pin through a different pin-feed node
/// than the device projection picked, that node becomes the connection's
/// sink entry. A sink entry the route does not reach leaves the
/// connection's length unset and is reported as a warning.
pub fn measure_net(
    design: &RoutedDesign,
    device: &dyn Device,
    net: NetId,
    weighting: Weighting,
    entries: &mut FabricEntries,
    sink: &DiagnosticSink,
) -> Result<NetMeasurement, RepairError> {
    let mut wrapper = build_net_wrapper(design, device, net, entries)?;
    let route = design.committed_route(device, net)?;
    let lengths = propagate(device, &wrapper.name, &route, &wrapper.driver_entries(), weighting)?;

    let mut stats = MeasurementStats::default();
    for node in route.nodes() {
        let resolved = device.node(node).ok_or_else(|| RepairError::UnknownNode {
            net: wrapper.name.clone(),
            node,
        })?;
        if device.is_fabric_node(node) {
            stats.record(resolved.kind, resolved.length());
        }
    }

    let mut warnings = Vec::new();
    for conn in wrapper.connections.iter_mut().filter(|c| !c.direct) {
        let pin_node = design.pin_node(device, conn.sink)?;
        if let Some(entry) = routed_sink_entry(device, &route, pin_node)
            .filter(|&n| Some(n) != conn.sink_entry && lengths.get(n).is_some())
        {
            entries.get_or_create(entry, EntryRole::Sink);
            conn.sink_entry = Some(entry);
        }
        conn.length = conn.sink_entry.and_then(|entry| lengths.get(entry));
        if conn.length.is_none() {
            let driver = design.pin_label(device, conn.driver);
            let sink_label = design.pin_label(device, conn.sink);
            tracing::warn!(net = %wrapper.name, sink = %sink_label, "net not fully routed");
            sink.emit(Diagnostic::warning(
                DiagnosticCode::NET_NOT_FULLY_ROUTED,
                format!("net {} is not fully routed", wrapper.name),
                Location::connection(wrapper.name.clone(), driver, sink_label.clone()),
            ));
            warnings.push(NetWarning {
                net: wrapper.name.clone(),
                sink: sink_label,
            });
        }
    }

    Ok(NetMeasurement {
        wrapper,
        lengths,
        stats,
        warnings,
    })
}

/// The result of measuring every analyzable net of a design.
#[derive(Debug, Clone, Default)]
pub struct DesignMeasurement {
    /// Number of nets measured.
    pub nets_analyzed: usize,
    /// All connections of measured nets, direct ones included.
    pub connections: Vec<Connection>,
    /// Accumulated lengths per measured net.
    pub lengths: BTreeMap<NetId, WirelengthMap>,
    /// Resource usage merged across nets.
    pub stats: MeasurementStats,
    /// Sinks left unreached.
    pub warnings: Vec<NetWarning>,
}

impl DesignMeasurement {
    /// Iterates over connections with a measured length.
    pub fn measured(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(|c| !c.direct && c.length.is_some())
    }

    /// Returns the number of direct connections.
    pub fn direct_count(&self) -> usize {
        self.connections.iter().filter(|c| c.direct).count()
    }
}

/// Measures every analyzable net of a design.
pub fn measure_design(
    design: &RoutedDesign,
    device: &dyn Device,
    weighting: Weighting,
    filter: &FilterConfig,
    entries: &mut FabricEntries,
    sink: &DiagnosticSink,
) -> Result<DesignMeasurement, RepairError> {
    let mut result = DesignMeasurement::default();
    for net in &design.nets {
        if !is_analyzable(design, device, net.id, filter)? {
            continue;
        }
        let measured = measure_net(design, device, net.id, weighting, entries, sink)?;
        result.nets_analyzed += 1;
        result.stats.merge(&measured.stats);
        result.warnings.extend(measured.warnings);
        result.lengths.insert(net.id, measured.lengths);
        result.connections.extend(measured.wrapper.connections);
    }
    tracing::debug!(
        nets = result.nets_analyzed,
        connections = result.connections.len(),
        nodes = result.stats.total_nodes,
        "measured design"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{NetKind, PhysNet, PinRole};
    use holdfix_device::{ClockRegion, DeviceGraph, EdgeId, TileType};

    /// out -> hub(Single) -> {a(Double) -> feed_a, b(Long) -> feed_b}.
    struct Tree {
        dev: DeviceGraph,
        nodes: [NodeId; 6],
        edges: Vec<EdgeId>,
    }

    fn tree() -> Tree {
        let mut dev = DeviceGraph::new("t");
        let int = dev.add_tile("INT", 0, 0, TileType::Interconnect, ClockRegion::default());
        let out = dev.add_node("OUT", int, NodeKind::Output);
        let hub = dev.add_node("HUB", int, NodeKind::Single);
        let a = dev.add_node("A", int, NodeKind::Double);
        let b = dev.add_node("B", int, NodeKind::Long);
        let fa = dev.add_node("FA", int, NodeKind::PinFeed);
        let fb = dev.add_node("FB", int, NodeKind::PinFeed);
        let edges = vec![
            dev.add_edge(out, hub),
            dev.add_edge(hub, a),
            dev.add_edge(hub, b),
            dev.add_edge(a, fa),
            dev.add_edge(b, fb),
        ];
        Tree {
            dev,
            nodes: [out, hub, a, b, fa, fb],
            edges,
        }
    }

    fn graph(t: &Tree, order: &[usize]) -> RouteGraph {
        let design = RoutedDesign::new("d");
        let net = PhysNet::new("n", NetKind::Wire, None);
        design
            .route_graph(&t.dev, &net, order.iter().map(|&i| t.edges[i]))
            .unwrap()
    }

    #[test]
    fn contribution_weights_and_floors() {
        let t = tree();
        let w = Weighting::default();
        let [out, hub, _, b, fa, _] = t.nodes;
        assert_eq!(w.contribution(&t.dev, hub), Some(10));
        assert_eq!(w.contribution(&t.dev, b), Some(120));
        assert_eq!(w.contribution(&t.dev, fa), Some(3));
        assert_eq!(w.contribution(&t.dev, out), Some(3));
        assert_eq!(w.contribution(&t.dev, NodeId::from_raw(99)), None);
    }

    #[test]
    fn lengths_accumulate_along_each_branch() {
        let t = tree();
        let [out, hub, a, b, fa, fb] = t.nodes;
        let map = propagate(&t.dev, "n", &graph(&t, &[0, 1, 2, 3, 4]), &[out], Weighting::default())
            .unwrap();
        assert_eq!(map.get(out), Some(0));
        assert_eq!(map.get(hub), Some(10));
        assert_eq!(map.get(a), Some(30));
        assert_eq!(map.get(b), Some(130));
        assert_eq!(map.get(fa), Some(33));
        assert_eq!(map.get(fb), Some(133));
    }

    #[test]
    fn edge_order_does_not_change_lengths() {
        let t = tree();
        let root = [t.nodes[0]];
        let w = Weighting::default();
        let forward = propagate(&t.dev, "n", &graph(&t, &[0, 1, 2, 3, 4]), &root, w).unwrap();
        for order in [[4, 3, 2, 1, 0], [3, 0, 4, 2, 1], [2, 4, 1, 3, 0]] {
            let shuffled = propagate(&t.dev, "n", &graph(&t, &order), &root, w).unwrap();
            assert_eq!(forward, shuffled);
        }
    }

    #[test]
    fn unreached_nodes_are_absent() {
        let t = tree();
        let [out, hub, _, b, _, fb] = t.nodes;
        // Branch b is disconnected from the root.
        let map = propagate(&t.dev, "n", &graph(&t, &[0, 4]), &[out], Weighting::default()).unwrap();
        assert_eq!(map.get(hub), Some(10));
        assert_eq!(map.get(b), None);
        assert_eq!(map.get(fb), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn roots_are_never_reassigned() {
        let t = tree();
        let [out, hub, ..] = t.nodes;
        let map = propagate(&t.dev, "n", &graph(&t, &[0, 1]), &[out, hub], Weighting::default())
            .unwrap();
        assert_eq!(map.get(hub), Some(0));
    }

    #[test]
    fn oversized_weight_saturates() {
        let t = tree();
        let [out, _, _, b, _, fb] = t.nodes;
        let w = Weighting {
            weight: 9_000_000_000_000_000_000,
            zero_length_floor: 3,
        };
        assert_eq!(w.contribution(&t.dev, b), Some(u64::MAX));
        let map = propagate(&t.dev, "n", &graph(&t, &[0, 2, 4]), &[out], w).unwrap();
        assert_eq!(map.get(fb), Some(u64::MAX));
    }

    #[test]
    fn stats_merge() {
        let mut a = MeasurementStats::default();
        a.record(NodeKind::Single, 1);
        a.record(NodeKind::Long, 12);
        let mut b = MeasurementStats::default();
        b.record(NodeKind::Single, 1);
        a.merge(&b);
        assert_eq!(a.total_nodes, 3);
        assert_eq!(a.total_length, 14);
        assert_eq!(a.by_kind[&NodeKind::Single], KindUsage { nodes: 2, length: 2 });
    }

    #[test]
    fn measure_net_reports_unrouted_sink() {
        let mut dev = DeviceGraph::new("m");
        let r = ClockRegion::default();
        let int = dev.add_tile("INT", 0, 0, TileType::Interconnect, r);
        let clb = dev.add_tile("CLB", 1, 0, TileType::Logic, r);
        let s0 = dev.add_site("S0", clb);
        let aq = dev.add_node("AQ", clb, NodeKind::SitePin);
        let out = dev.add_node("OUT", int, NodeKind::Output);
        let hop = dev.add_node("HOP", int, NodeKind::Quad);
        let fa = dev.add_node("FA", int, NodeKind::PinFeed);
        let fb = dev.add_node("FB", int, NodeKind::PinFeed);
        let a1 = dev.add_node("A1", clb, NodeKind::SitePin);
        let b1 = dev.add_node("B1", clb, NodeKind::SitePin);
        let e0 = dev.add_edge(aq, out);
        let e1 = dev.add_edge(out, hop);
        let e2 = dev.add_edge(hop, fa);
        let e3 = dev.add_edge(fa, a1);
        dev.add_edge(hop, fb);
        dev.add_edge(fb, b1);
        dev.add_site_pin(s0, "AQ", aq);
        dev.add_site_pin(s0, "A1", a1);
        dev.add_site_pin(s0, "B1", b1);

        let mut design = RoutedDesign::new("d");
        let src = design.add_pin(s0, "AQ", PinRole::General);
        let pa = design.add_pin(s0, "A1", PinRole::General);
        let pb = design.add_pin(s0, "B1", PinRole::General);
        let mut net = PhysNet::new("n", NetKind::Wire, Some(src));
        net.sinks = vec![pa, pb];
        net.routing = [e0, e1, e2, e3].into_iter().collect();
        let net = design.add_net(net);

        let sink = DiagnosticSink::new();
        let mut entries = FabricEntries::new();
        let m = measure_net(&design, &dev, net, Weighting::default(), &mut entries, &sink).unwrap();
        // OUT(0) -> HOP(40) -> FA(43)
        assert_eq!(m.wrapper.connection(pa).and_then(|c| c.length), Some(43));
        assert_eq!(m.wrapper.connection(pb).and_then(|c| c.length), None);
        assert_eq!(m.warnings.len(), 1);
        assert_eq!(sink.warning_count(), 1);
        // OUT, HOP and FA are fabric nodes; AQ and A1 are site wiring.
        assert_eq!(m.stats.total_nodes, 3);
        assert_eq!(m.stats.total_length, 4);
    }

    #[test]
    fn sink_fed_through_second_pin_feed_is_measured() {
        let mut dev = DeviceGraph::new("feeds");
        let r = ClockRegion::default();
        let int = dev.add_tile("INT", 0, 0, TileType::Interconnect, r);
        let clb = dev.add_tile("CLB", 1, 0, TileType::Logic, r);
        let s0 = dev.add_site("S0", clb);
        let s1 = dev.add_site("S1", clb);
        let aq = dev.add_node("AQ", clb, NodeKind::SitePin);
        let out = dev.add_node("OUT", int, NodeKind::Output);
        let ss = dev.add_node("SS", int, NodeKind::Single);
        let lv = dev.add_node("LV", int, NodeKind::Long);
        let fa = dev.add_node("FA", int, NodeKind::PinFeed);
        let fb = dev.add_node("FB", int, NodeKind::PinFeed);
        let b1 = dev.add_node("B1", clb, NodeKind::SitePin);
        let e_drv = dev.add_edge(aq, out);
        dev.add_edge(out, ss);
        dev.add_edge(ss, fa);
        dev.add_edge(fa, b1);
        let via_lv = [dev.add_edge(out, lv), dev.add_edge(lv, fb), dev.add_edge(fb, b1)];
        dev.add_site_pin(s0, "AQ", aq);
        dev.add_site_pin(s1, "B1", b1);
        assert_eq!(dev.fabric_entry_for_input(s1, "B1"), Some(fa));

        let mut design = RoutedDesign::new("d");
        let src = design.add_pin(s0, "AQ", PinRole::General);
        let dst = design.add_pin(s1, "B1", PinRole::General);
        let mut net = PhysNet::new("n", NetKind::Wire, Some(src));
        net.sinks = vec![dst];
        net.routing.insert(e_drv);
        net.routing.extend(via_lv);
        let net = design.add_net(net);

        let sink = DiagnosticSink::new();
        let mut entries = FabricEntries::new();
        let m = measure_net(&design, &dev, net, Weighting::default(), &mut entries, &sink).unwrap();
        let conn = m.wrapper.connection(dst).unwrap();
        // OUT(0) -> LV(120) -> FB(123)
        assert_eq!(conn.sink_entry, Some(fb));
        assert_eq!(conn.length, Some(123));
        assert!(m.warnings.is_empty());
        assert_eq!(sink.warning_count(), 0);
        assert_eq!(entries.counts().sink, 2);
    }
}
