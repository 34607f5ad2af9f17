//! Decomposition of a net into driver-to-sink connections.

use crate::data::{NetKind, RoutedDesign};
use crate::entries::{EntryRole, FabricEntries};
use crate::error::RepairError;
use crate::ids::{NetId, PinId};
use holdfix_config::FilterConfig;
use holdfix_device::{Device, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identity of a connection: sinks are unique within a net.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ConnectionKey {
    /// The owning net.
    pub net: NetId,
    /// The sink pin.
    pub sink: PinId,
}

/// One driver-to-sink pair of a net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Position of the sink within the net.
    pub index: usize,
    /// The owning net.
    pub net: NetId,
    /// The effective driver pin.
    pub driver: PinId,
    /// The sink pin.
    pub sink: PinId,
    /// The sink is not reachable through the general fabric.
    pub direct: bool,
    /// Fabric node where the driver enters the fabric (`None` when direct).
    pub driver_entry: Option<NodeId>,
    /// Fabric node feeding the sink (`None` when direct).
    pub sink_entry: Option<NodeId>,
    /// Measured length at the sink entry; unset until measured.
    pub length: Option<u64>,
}

impl Connection {
    /// Returns the identity of this connection.
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey {
            net: self.net,
            sink: self.sink,
        }
    }
}

/// A transient view of one net as a list of connections.
#[derive(Debug, Clone)]
pub struct NetWrapper {
    /// The wrapped net.
    pub net: NetId,
    /// Net name.
    pub name: String,
    /// One connection per sink, in sink order.
    pub connections: Vec<Connection>,
}

impl NetWrapper {
    /// Returns the connection for `sink`.
    pub fn connection(&self, sink: PinId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.sink == sink)
    }

    /// Iterates over the connections that are routed through the fabric.
    pub fn routed_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(|c| !c.direct)
    }

    /// Returns the distinct driver entry nodes of the fabric connections.
    pub fn driver_entries(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self
            .routed_connections()
            .filter_map(|c| c.driver_entry)
            .collect();
        roots.sort_unstable();
        roots.dedup();
        roots
    }
}

/// Returns `true` if a net takes part in measurement and repair.
///
/// Only signal nets with a driver and at least one sink are analyzed, and
/// nets driven from clock or global-buffer pins are skipped.
pub fn is_analyzable(
    design: &RoutedDesign,
    device: &dyn Device,
    net: NetId,
    filter: &FilterConfig,
) -> Result<bool, RepairError> {
    let phys = design.net(net)?;
    if phys.kind != NetKind::Wire || !phys.has_source_and_sinks() {
        return Ok(false);
    }
    let Some(source) = phys.source else {
        return Ok(false);
    };
    Ok(!filter.skips_driver(&design.pin_label(device, source)))
}

/// Builds the connection view of a net.
///
/// Each sink gets its effective driver (the alternate source when the
/// primary driver is a carry-out that cannot reach it) and is classified
/// direct or fabric-routed by projecting it onto the fabric. The driver-side
/// projection is resolved once per driver pin. Fabric entries of non-direct
/// connections are registered in `entries`. A sink listed more than once
/// yields one connection, at its first position.
pub fn build_net_wrapper(
    design: &RoutedDesign,
    device: &dyn Device,
    net: NetId,
    entries: &mut FabricEntries,
) -> Result<NetWrapper, RepairError> {
    let phys = design.net(net)?;
    let Some(source) = phys.source else {
        return Ok(NetWrapper {
            net,
            name: phys.name.clone(),
            connections: Vec::new(),
        });
    };

    let mut driver_entries: BTreeMap<PinId, Option<NodeId>> = BTreeMap::new();
    let mut connections = Vec::with_capacity(phys.sinks.len());
    let mut seen = BTreeSet::new();
    for (index, &sink) in phys.sinks.iter().enumerate() {
        if !seen.insert(sink) {
            tracing::warn!(
                net = %phys.name,
                sink = %design.pin_label(device, sink),
                "duplicate sink ignored"
            );
            continue;
        }
        let driver = if design.needs_alternate_source(device, source, sink)? {
            phys.alternate_source
                .ok_or_else(|| RepairError::MissingAlternateSource {
                    net: phys.name.clone(),
                    driver: design.pin_label(device, source),
                    sink: design.pin_label(device, sink),
                })?
        } else {
            source
        };

        let sink_pin = design.pin(sink)?;
        let sink_entry = device.fabric_entry_for_input(sink_pin.site, &sink_pin.name);
        let driver_entry = match sink_entry {
            Some(_) => match driver_entries.get(&driver) {
                Some(&cached) => cached,
                None => {
                    let pin = design.pin(driver)?;
                    let entry = device.fabric_entry_for_output(pin.site, &pin.name);
                    driver_entries.insert(driver, entry);
                    entry
                }
            },
            None => None,
        };

        let (direct, driver_entry, sink_entry) = match (driver_entry, sink_entry) {
            (Some(d), Some(s)) => {
                entries.get_or_create(d, EntryRole::Driver);
                entries.get_or_create(s, EntryRole::Sink);
                (false, Some(d), Some(s))
            }
            _ => (true, None, None),
        };
        connections.push(Connection {
            index,
            net,
            driver,
            sink,
            direct,
            driver_entry,
            sink_entry,
            length: None,
        });
    }

    Ok(NetWrapper {
        net,
        name: phys.name.clone(),
        connections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PhysNet, PinRole};
    use holdfix_device::{ClockRegion, DeviceGraph, NodeKind, SiteId, TileType};

    /// Carry pair S0 -> S1, a far site S2 with a general input, and an
    /// alternate output AMUX on S0.
    struct Carry {
        dev: DeviceGraph,
        s0: SiteId,
        s1: SiteId,
        s2: SiteId,
    }

    fn carry() -> Carry {
        let mut dev = DeviceGraph::new("carry");
        let r = ClockRegion::new(0, 0);
        let int = dev.add_tile("INT_X0Y0", 0, 0, TileType::Interconnect, r);
        let clb = dev.add_tile("CLB_X1Y0", 1, 0, TileType::Logic, r);
        let s0 = dev.add_site("SLICE_X0Y0", clb);
        let s1 = dev.add_site("SLICE_X0Y1", clb);
        let s2 = dev.add_site("SLICE_X0Y2", clb);
        dev.set_carry_successor(s0, s1);

        let cout = dev.add_node("COUT", clb, NodeKind::SitePin);
        let cin = dev.add_node("CIN", clb, NodeKind::SitePin);
        let amux = dev.add_node("AMUX", clb, NodeKind::SitePin);
        let out = dev.add_node("OUT", int, NodeKind::Output);
        let feed = dev.add_node("IMUX", int, NodeKind::PinFeed);
        let a1 = dev.add_node("A1", clb, NodeKind::SitePin);
        dev.add_edge(cout, cin);
        dev.add_edge(amux, out);
        dev.add_edge(out, feed);
        dev.add_edge(feed, a1);
        dev.add_site_pin(s0, "COUT", cout);
        dev.add_site_pin(s0, "AMUX", amux);
        dev.add_site_pin(s1, "CIN", cin);
        dev.add_site_pin(s2, "A1", a1);
        Carry { dev, s0, s1, s2 }
    }

    fn carry_net(fx: &Carry, with_alternate: bool) -> (RoutedDesign, NetId) {
        let mut design = RoutedDesign::new("d");
        let cout = design.add_pin(fx.s0, "COUT", PinRole::CarryOut);
        let amux = design.add_pin(fx.s0, "AMUX", PinRole::General);
        let cin = design.add_pin(fx.s1, "CIN", PinRole::CarryIn);
        let a1 = design.add_pin(fx.s2, "A1", PinRole::General);
        let mut net = PhysNet::new("carry_out", NetKind::Wire, Some(cout));
        net.alternate_source = with_alternate.then_some(amux);
        net.sinks = vec![cin, a1];
        let id = design.add_net(net);
        (design, id)
    }

    #[test]
    fn carry_sink_is_direct_and_external_sink_uses_alternate() {
        let fx = carry();
        let (design, net) = carry_net(&fx, true);
        let mut entries = FabricEntries::new();
        let wrapper = build_net_wrapper(&design, &fx.dev, net, &mut entries).unwrap();

        assert_eq!(wrapper.connections.len(), 2);
        let cin = &wrapper.connections[0];
        assert!(cin.direct);
        assert_eq!(cin.driver, PinId::from_raw(0));
        assert!(cin.sink_entry.is_none());

        let ext = &wrapper.connections[1];
        assert!(!ext.direct);
        assert_eq!(ext.driver, PinId::from_raw(1));
        assert!(ext.driver_entry.is_some() && ext.sink_entry.is_some());
        assert_eq!(entries.len(), 2);
        assert_eq!(wrapper.driver_entries().len(), 1);
    }

    #[test]
    fn missing_alternate_is_fatal() {
        let fx = carry();
        let (design, net) = carry_net(&fx, false);
        let mut entries = FabricEntries::new();
        let err = build_net_wrapper(&design, &fx.dev, net, &mut entries).unwrap_err();
        assert!(matches!(err, RepairError::MissingAlternateSource { .. }));
        assert!(err.to_string().contains("SLICE_X0Y0/COUT"));
    }

    #[test]
    fn sinks_map_one_to_one() {
        let fx = carry();
        let (design, net) = carry_net(&fx, true);
        let mut entries = FabricEntries::new();
        let wrapper = build_net_wrapper(&design, &fx.dev, net, &mut entries).unwrap();
        let sinks: Vec<PinId> = wrapper.connections.iter().map(|c| c.sink).collect();
        assert_eq!(sinks, design.net(net).unwrap().sinks);
        assert!(wrapper.connections.iter().all(|c| c.length.is_none()));
    }

    #[test]
    fn duplicate_sinks_yield_one_connection() {
        let fx = carry();
        let (mut design, net) = carry_net(&fx, true);
        let a1 = PinId::from_raw(3);
        design.net_mut(net).unwrap().sinks.push(a1);
        let mut entries = FabricEntries::new();
        let wrapper = build_net_wrapper(&design, &fx.dev, net, &mut entries).unwrap();
        assert_eq!(wrapper.connections.len(), 2);
        assert_eq!(wrapper.connections.iter().filter(|c| c.sink == a1).count(), 1);
        assert_eq!(wrapper.connection(a1).map(|c| c.index), Some(1));
    }

    #[test]
    fn analyzable_filter() {
        let fx = carry();
        let (mut design, net) = carry_net(&fx, true);
        let filter = FilterConfig::default();
        assert!(is_analyzable(&design, &fx.dev, net, &filter).unwrap());

        design.net_mut(net).unwrap().kind = NetKind::Clock;
        assert!(!is_analyzable(&design, &fx.dev, net, &filter).unwrap());

        design.net_mut(net).unwrap().kind = NetKind::Wire;
        design.net_mut(net).unwrap().sinks.clear();
        assert!(!is_analyzable(&design, &fx.dev, net, &filter).unwrap());
    }

    #[test]
    fn clock_driver_names_are_skipped() {
        let mut dev = DeviceGraph::new("clk");
        let t = dev.add_tile("CLK", 0, 0, TileType::Clock, ClockRegion::default());
        let bufg = dev.add_site("BUFGCE_X0Y0", t);
        let other = dev.add_site("SLICE_X0Y0", t);
        let mut design = RoutedDesign::new("d");
        let o = design.add_pin(bufg, "O", PinRole::General);
        let i = design.add_pin(other, "A1", PinRole::General);
        let mut net = PhysNet::new("gclk", NetKind::Wire, Some(o));
        net.sinks = vec![i];
        let net = design.add_net(net);
        assert!(!is_analyzable(&design, &dev, net, &FilterConfig::default()).unwrap());
    }
}
