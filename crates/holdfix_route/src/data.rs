//! Routed-design data structures.
//!
//! A [`RoutedDesign`] holds the physical nets of a placed and routed circuit
//! together with the site pins they connect. Each net's committed route is
//! the set of device edges currently assigned to it; the route is a tree
//! rooted at the driver pin's node and spanning every routed sink pin node.

use crate::error::RepairError;
use crate::ids::{NetId, PinId};
use holdfix_common::InternalError;
use holdfix_device::{Device, EdgeId, NodeId, SiteId};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// The committed route of one net as a directed graph of device nodes,
/// weighted by the device edge realizing each hop.
pub type RouteGraph = DiGraphMap<NodeId, EdgeId>;

/// The physical netlist with committed routing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutedDesign {
    /// Design name.
    pub name: String,
    /// All physical nets.
    pub nets: Vec<PhysNet>,
    /// All site pin instances.
    pub pins: Vec<SitePin>,
    /// Auxiliary index: net name to ID (rebuilt on deserialization).
    #[serde(skip)]
    pub net_by_name: HashMap<String, NetId>,
}

/// The signal class of a net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetKind {
    /// An ordinary signal net.
    Wire,
    /// A clock net.
    Clock,
    /// Constant-one supply net.
    Vcc,
    /// Constant-zero supply net.
    Gnd,
}

/// How a site pin participates in dedicated carry wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinRole {
    /// A pin reached through the general fabric.
    #[default]
    General,
    /// A carry-chain output.
    CarryOut,
    /// A carry-chain input.
    CarryIn,
}

/// A pin instance on a placed site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitePin {
    /// The unique ID of this pin.
    pub id: PinId,
    /// The site this pin belongs to.
    pub site: SiteId,
    /// Pin name within the site (e.g., "AQ", "A1").
    pub name: String,
    /// Carry participation.
    #[serde(default)]
    pub role: PinRole,
}

/// A net connecting one driver to its sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysNet {
    /// The unique ID of this net.
    pub id: NetId,
    /// Net name.
    pub name: String,
    /// Signal class.
    pub kind: NetKind,
    /// The primary driver pin.
    pub source: Option<PinId>,
    /// Driver used for sinks the primary driver cannot reach through the fabric.
    #[serde(default)]
    pub alternate_source: Option<PinId>,
    /// Sink pins, in connection order.
    pub sinks: Vec<PinId>,
    /// Committed route edges.
    #[serde(default)]
    pub routing: BTreeSet<EdgeId>,
}

impl PhysNet {
    /// Creates an unrouted net.
    pub fn new(name: impl Into<String>, kind: NetKind, source: Option<PinId>) -> Self {
        Self {
            id: NetId::from_raw(0),
            name: name.into(),
            kind,
            source,
            alternate_source: None,
            sinks: Vec::new(),
            routing: BTreeSet::new(),
        }
    }

    /// Returns the driver pins of this net (primary first).
    pub fn drivers(&self) -> impl Iterator<Item = PinId> + '_ {
        self.source.into_iter().chain(self.alternate_source)
    }

    /// Returns `true` if the net has a driver and at least one sink.
    pub fn has_source_and_sinks(&self) -> bool {
        self.source.is_some() && !self.sinks.is_empty()
    }
}

impl RoutedDesign {
    /// Creates an empty design.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a pin and returns its ID.
    pub fn add_pin(&mut self, site: SiteId, name: impl Into<String>, role: PinRole) -> PinId {
        let id = PinId::from_raw(self.pins.len() as u32);
        self.pins.push(SitePin {
            id,
            site,
            name: name.into(),
            role,
        });
        id
    }

    /// Adds a net and returns its ID.
    pub fn add_net(&mut self, mut net: PhysNet) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        net.id = id;
        self.net_by_name.insert(net.name.clone(), id);
        self.nets.push(net);
        id
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> Result<&PhysNet, RepairError> {
        self.nets
            .get(id.as_raw() as usize)
            .ok_or(RepairError::UnknownNet(id))
    }

    /// Returns a mutable reference to the net with the given ID.
    pub fn net_mut(&mut self, id: NetId) -> Result<&mut PhysNet, RepairError> {
        self.nets
            .get_mut(id.as_raw() as usize)
            .ok_or(RepairError::UnknownNet(id))
    }

    /// Returns the pin with the given ID.
    pub fn pin(&self, id: PinId) -> Result<&SitePin, RepairError> {
        self.pins
            .get(id.as_raw() as usize)
            .ok_or(RepairError::UnknownPin(id))
    }

    /// Looks up a net by name.
    pub fn net_named(&self, name: &str) -> Option<NetId> {
        self.net_by_name.get(name).copied()
    }

    /// Returns the number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Rebuilds auxiliary indices after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.net_by_name.clear();
        for (i, net) in self.nets.iter().enumerate() {
            self.net_by_name
                .insert(net.name.clone(), NetId::from_raw(i as u32));
        }
    }

    /// Formats a pin as `site/pin` for reports and diagnostics.
    pub fn pin_label(&self, device: &dyn Device, id: PinId) -> String {
        match self.pins.get(id.as_raw() as usize) {
            Some(pin) => match device.site(pin.site) {
                Some(site) => format!("{}/{}", site.name, pin.name),
                None => format!("site#{}/{}", pin.site, pin.name),
            },
            None => format!("pin#{id}"),
        }
    }

    /// Returns the device node a pin is wired to.
    pub fn pin_node(&self, device: &dyn Device, id: PinId) -> Result<NodeId, RepairError> {
        let pin = self.pin(id)?;
        device
            .site_pin_node(pin.site, &pin.name)
            .ok_or(RepairError::UnknownPin(id))
    }

    /// Returns `true` if `source` can only reach `sink` through the net's
    /// alternate source.
    ///
    /// A carry-out pin drives its site's carry successor directly; every
    /// other sink of such a driver has to be fed from a fabric-capable pin.
    pub fn needs_alternate_source(
        &self,
        device: &dyn Device,
        source: PinId,
        sink: PinId,
    ) -> Result<bool, RepairError> {
        let src = self.pin(source)?;
        if src.role != PinRole::CarryOut {
            return Ok(false);
        }
        let dst = self.pin(sink)?;
        let successor = device.site(src.site).and_then(|s| s.carry_successor);
        Ok(!(dst.role == PinRole::CarryIn && successor == Some(dst.site)))
    }

    /// Builds the committed route of a net from the given edges.
    ///
    /// Fails if an edge cannot be resolved in the device.
    pub fn route_graph<I>(
        &self,
        device: &dyn Device,
        net: &PhysNet,
        edges: I,
    ) -> Result<RouteGraph, RepairError>
    where
        I: IntoIterator<Item = EdgeId>,
    {
        let mut graph = RouteGraph::new();
        for id in edges {
            let edge = device.edge(id).ok_or_else(|| RepairError::UnknownEdge {
                net: net.name.clone(),
                edge: id,
            })?;
            graph.add_edge(edge.src, edge.dst, id);
        }
        Ok(graph)
    }

    /// Builds the committed route of a net from its current routing.
    pub fn committed_route(&self, device: &dyn Device, net: NetId) -> Result<RouteGraph, RepairError> {
        let net = self.net(net)?;
        self.route_graph(device, net, net.routing.iter().copied())
    }

    /// Returns the nodes a committed route grows from: each driver pin's
    /// node and the fabric node it enters.
    pub fn driver_roots(&self, device: &dyn Device, net: NetId) -> Result<Vec<NodeId>, RepairError> {
        let net = self.net(net)?;
        let mut roots = Vec::new();
        for driver in net.drivers() {
            let pin = self.pin(driver)?;
            roots.extend(device.site_pin_node(pin.site, &pin.name));
            roots.extend(device.fabric_entry_for_output(pin.site, &pin.name));
        }
        roots.sort_unstable();
        roots.dedup();
        Ok(roots)
    }

    /// Returns `true` if the sink's pin node is reachable from a driver
    /// through committed edges.
    pub fn is_sink_routed(
        &self,
        device: &dyn Device,
        net: NetId,
        sink: PinId,
    ) -> Result<bool, RepairError> {
        let target = self.pin_node(device, sink)?;
        let graph = self.committed_route(device, net)?;
        let roots = self.driver_roots(device, net)?;
        if roots.contains(&target) {
            return Ok(true);
        }
        let mut seen: HashSet<NodeId> = roots.iter().copied().collect();
        let mut queue: VecDeque<NodeId> = roots.into_iter().filter(|n| graph.contains_node(*n)).collect();
        while let Some(node) = queue.pop_front() {
            for next in graph.neighbors_directed(node, Direction::Outgoing) {
                if next == target {
                    return Ok(true);
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        Ok(false)
    }

    /// Returns the committed edges used exclusively by `sink`'s branch.
    ///
    /// Walks the route backward from the sink pin node and stops after the
    /// edge leaving a node that is a driver root or that fans out to another
    /// branch. Edges are returned sink first.
    ///
    /// A branch that loops back on itself means the committed route is not a
    /// tree and is reported as an internal error.
    pub fn trimmable_edges(
        &self,
        device: &dyn Device,
        net: NetId,
        sink: PinId,
    ) -> Result<Vec<EdgeId>, RepairError> {
        let target = self.pin_node(device, sink)?;
        let graph = self.committed_route(device, net)?;
        let roots: HashSet<NodeId> = self.driver_roots(device, net)?.into_iter().collect();

        let mut trimmable = Vec::new();
        let mut seen = HashSet::from([target]);
        let mut node = target;
        while graph.contains_node(node) && !roots.contains(&node) {
            let Some(src) = graph.neighbors_directed(node, Direction::Incoming).next() else {
                break;
            };
            if let Some(&edge) = graph.edge_weight(src, node) {
                trimmable.push(edge);
            }
            if !seen.insert(src) {
                let name = &self.net(net)?.name;
                return Err(InternalError::new(format!(
                    "committed route of net {name} loops through node {src}"
                ))
                .into());
            }
            let fans_out = graph.neighbors_directed(src, Direction::Outgoing).count() > 1;
            if fans_out || roots.contains(&src) {
                break;
            }
            node = src;
        }
        Ok(trimmable)
    }

    /// Removes the sink's exclusive branch from the net's route.
    ///
    /// The rest of the route is untouched. Returns the removed edges.
    pub fn unroute_pin(
        &mut self,
        device: &dyn Device,
        net: NetId,
        sink: PinId,
    ) -> Result<Vec<EdgeId>, RepairError> {
        let trimmed = self.trimmable_edges(device, net, sink)?;
        let routing = &mut self.net_mut(net)?.routing;
        for edge in &trimmed {
            routing.remove(edge);
        }
        Ok(trimmed)
    }
}
