//! Device topology oracle for the hold repair engine.
//!
//! This crate provides the [`Device`] trait the repair core reads the
//! routing-resource graph through: node lengths and kinds, edge endpoints,
//! clock-region membership of sites, and projection of site pins onto the
//! general switching fabric. [`DeviceGraph`] is a table-driven implementation
//! that can be built programmatically or deserialized from JSON.
//!
//! # Usage
//!
//! ```
//! use holdfix_device::{ClockRegion, Device, DeviceGraph, NodeKind, TileType};
//!
//! let mut dev = DeviceGraph::new("tiny");
//! let int = dev.add_tile("INT_X0Y0", 0, 0, TileType::Interconnect, ClockRegion::new(0, 0));
//! let a = dev.add_node("INT_X0Y0/A", int, NodeKind::Single);
//! let b = dev.add_node("INT_X0Y0/B", int, NodeKind::Quad);
//! let e = dev.add_edge(a, b);
//! assert_eq!(dev.edge(e).map(|e| e.dst), Some(b));
//! assert_eq!(dev.node_length(b), Some(4));
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod graph;
pub mod ids;
pub mod types;

pub use error::DeviceError;
pub use graph::DeviceGraph;
pub use ids::{EdgeId, NodeId, SiteId, TileId};
pub use types::{ClockRegion, Edge, KindProfile, Node, NodeKind, Site, SitePinDef, Tile, TileType};

use std::collections::{HashSet, VecDeque};

/// Maximum number of dedicated-wiring hops walked when projecting a pin
/// onto the switching fabric.
pub const MAX_PROJECTION_HOPS: usize = 4;

/// Read-only view of a device's routing-resource graph.
///
/// Implementations supply the table lookups; pin projection and the derived
/// queries have default implementations built on them.
pub trait Device: std::fmt::Debug {
    /// Returns the device name.
    fn name(&self) -> &str;

    /// Returns the tile with the given ID.
    fn tile(&self, id: TileId) -> Option<&Tile>;

    /// Returns the site with the given ID.
    fn site(&self, id: SiteId) -> Option<&Site>;

    /// Returns the routing node with the given ID.
    fn node(&self, id: NodeId) -> Option<&Node>;

    /// Returns the edge with the given ID.
    fn edge(&self, id: EdgeId) -> Option<&Edge>;

    /// Returns the edges leaving `node`.
    fn downhill_edges(&self, node: NodeId) -> &[EdgeId];

    /// Returns the edges entering `node`.
    fn uphill_edges(&self, node: NodeId) -> &[EdgeId];

    /// Returns the node a named site pin is wired to.
    fn site_pin_node(&self, site: SiteId, pin: &str) -> Option<NodeId>;

    /// Returns the intrinsic length of a node.
    fn node_length(&self, id: NodeId) -> Option<u32> {
        self.node(id).map(Node::length)
    }

    /// Returns the kind of a node.
    fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind)
    }

    /// Returns the tile a node is anchored in.
    fn node_tile(&self, id: NodeId) -> Option<&Tile> {
        self.node(id).and_then(|n| self.tile(n.tile))
    }

    /// Returns `true` if the node belongs to the general switching fabric.
    fn is_fabric_node(&self, id: NodeId) -> bool {
        self.node_tile(id).is_some_and(|t| t.tile_type.is_fabric())
    }

    /// Returns the clock region containing a site.
    fn clock_region_of(&self, site: SiteId) -> Option<ClockRegion> {
        self.site(site)
            .and_then(|s| self.tile(s.tile))
            .map(|t| t.clock_region)
    }

    /// Returns the Manhattan tile distance between two nodes.
    fn tile_distance(&self, a: NodeId, b: NodeId) -> Option<u32> {
        let ta = self.node_tile(a)?;
        let tb = self.node_tile(b)?;
        Some(ta.col.abs_diff(tb.col) + ta.row.abs_diff(tb.row))
    }

    /// Projects a sink pin onto the fabric node that feeds it.
    ///
    /// Walks uphill from the pin's node through dedicated wiring. `None`
    /// means the pin is not reachable through the general fabric (for example
    /// a carry-in fed only by the previous site's carry-out).
    fn fabric_entry_for_input(&self, site: SiteId, pin: &str) -> Option<NodeId> {
        let start = self.site_pin_node(site, pin)?;
        project(self, start, Walk::Uphill)
    }

    /// Projects a driver pin onto the fabric node it drives.
    ///
    /// Walks downhill from the pin's node through dedicated wiring.
    fn fabric_entry_for_output(&self, site: SiteId, pin: &str) -> Option<NodeId> {
        let start = self.site_pin_node(site, pin)?;
        project(self, start, Walk::Downhill)
    }
}

#[derive(Clone, Copy)]
enum Walk {
    Uphill,
    Downhill,
}

/// Breadth-first walk from `start` through dedicated wiring until a fabric node.
fn project<D: Device + ?Sized>(dev: &D, start: NodeId, walk: Walk) -> Option<NodeId> {
    let mut queue = VecDeque::from([(start, 0usize)]);
    let mut seen = HashSet::from([start]);
    while let Some((node, hops)) = queue.pop_front() {
        if dev.is_fabric_node(node) {
            return Some(node);
        }
        if hops == MAX_PROJECTION_HOPS {
            continue;
        }
        let edges = match walk {
            Walk::Uphill => dev.uphill_edges(node),
            Walk::Downhill => dev.downhill_edges(node),
        };
        for edge in edges.iter().filter_map(|&id| dev.edge(id)) {
            let next = match walk {
                Walk::Uphill => edge.src,
                Walk::Downhill => edge.dst,
            };
            if seen.insert(next) {
                queue.push_back((next, hops + 1));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A logic site with pins A1 (input) and AQ (output) hanging off one
    /// switch box, plus a carry pair to a second site.
    fn carry_device() -> (DeviceGraph, SiteId, SiteId) {
        let mut dev = DeviceGraph::new("carry");
        let region = ClockRegion::new(0, 0);
        let int = dev.add_tile("INT_X0Y0", 0, 0, TileType::Interconnect, region);
        let clb = dev.add_tile("CLB_X1Y0", 1, 0, TileType::Logic, region);
        let s0 = dev.add_site("SLICE_X0Y0", clb);
        let s1 = dev.add_site("SLICE_X0Y1", clb);
        dev.set_carry_successor(s0, s1);

        let aq = dev.add_node("CLB_X1Y0/AQ", clb, NodeKind::SitePin);
        let out = dev.add_node("INT_X0Y0/LOGIC_OUTS0", int, NodeKind::Output);
        let feed = dev.add_node("INT_X0Y0/IMUX0", int, NodeKind::PinFeed);
        let a1 = dev.add_node("CLB_X1Y0/A1", clb, NodeKind::SitePin);
        let cout = dev.add_node("CLB_X1Y0/COUT", clb, NodeKind::SitePin);
        let cin = dev.add_node("CLB_X1Y0/CIN", clb, NodeKind::SitePin);
        dev.add_edge(aq, out);
        dev.add_edge(out, feed);
        dev.add_edge(feed, a1);
        dev.add_edge(cout, cin);
        dev.add_site_pin(s0, "AQ", aq);
        dev.add_site_pin(s0, "A1", a1);
        dev.add_site_pin(s0, "COUT", cout);
        dev.add_site_pin(s1, "CIN", cin);
        (dev, s0, s1)
    }

    #[test]
    fn input_projects_uphill_to_pin_feed() {
        let (dev, s0, _) = carry_device();
        let entry = dev.fabric_entry_for_input(s0, "A1").unwrap();
        assert_eq!(dev.node_kind(entry), Some(NodeKind::PinFeed));
    }

    #[test]
    fn output_projects_downhill_to_output_node() {
        let (dev, s0, _) = carry_device();
        let entry = dev.fabric_entry_for_output(s0, "AQ").unwrap();
        assert_eq!(dev.node_kind(entry), Some(NodeKind::Output));
    }

    #[test]
    fn carry_in_has_no_fabric_entry() {
        let (dev, s0, s1) = carry_device();
        assert_eq!(dev.fabric_entry_for_input(s1, "CIN"), None);
        assert_eq!(dev.fabric_entry_for_output(s0, "COUT"), None);
    }

    #[test]
    fn unknown_pin_has_no_entry() {
        let (dev, s0, _) = carry_device();
        assert_eq!(dev.fabric_entry_for_input(s0, "B6"), None);
    }

    #[test]
    fn clock_region_lookup() {
        let (dev, s0, _) = carry_device();
        assert_eq!(dev.clock_region_of(s0), Some(ClockRegion::new(0, 0)));
        assert_eq!(dev.clock_region_of(SiteId::from_raw(99)), None);
    }

    #[test]
    fn fabric_membership_follows_tile_type() {
        let (dev, s0, _) = carry_device();
        let pin = dev.site_pin_node(s0, "AQ").unwrap();
        let entry = dev.fabric_entry_for_output(s0, "AQ").unwrap();
        assert!(!dev.is_fabric_node(pin));
        assert!(dev.is_fabric_node(entry));
        assert_eq!(dev.tile_distance(pin, entry), Some(1));
    }
}
