//! Table-driven device model.
//!
//! [`DeviceGraph`] stores tiles, sites, nodes, edges, and site-pin bindings
//! in flat vectors indexed by their IDs. Adjacency and pin lookup indices are
//! auxiliary and rebuilt after deserialization, mirroring how the routed
//! design keeps its name indices.

use crate::error::DeviceError;
use crate::ids::{EdgeId, NodeId, SiteId, TileId};
use crate::types::{ClockRegion, Edge, Node, NodeKind, Site, SitePinDef, Tile, TileType};
use crate::Device;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A device routing model held entirely in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceGraph {
    /// Device name (e.g., "xcvu3p").
    pub name: String,
    /// All tiles.
    pub tiles: Vec<Tile>,
    /// All sites.
    pub sites: Vec<Site>,
    /// All routing nodes.
    pub nodes: Vec<Node>,
    /// All edges.
    pub edges: Vec<Edge>,
    /// Site pin to node bindings.
    pub site_pins: Vec<SitePinDef>,
    #[serde(skip)]
    downhill: Vec<Vec<EdgeId>>,
    #[serde(skip)]
    uphill: Vec<Vec<EdgeId>>,
    #[serde(skip)]
    pin_index: HashMap<(SiteId, String), NodeId>,
}

impl DeviceGraph {
    /// Creates an empty device.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a tile and returns its ID.
    pub fn add_tile(
        &mut self,
        name: impl Into<String>,
        col: u32,
        row: u32,
        tile_type: TileType,
        clock_region: ClockRegion,
    ) -> TileId {
        let id = TileId::from_raw(self.tiles.len() as u32);
        self.tiles.push(Tile {
            id,
            name: name.into(),
            col,
            row,
            tile_type,
            clock_region,
        });
        id
    }

    /// Adds a site and returns its ID.
    pub fn add_site(&mut self, name: impl Into<String>, tile: TileId) -> SiteId {
        let id = SiteId::from_raw(self.sites.len() as u32);
        self.sites.push(Site {
            id,
            name: name.into(),
            tile,
            carry_successor: None,
        });
        id
    }

    /// Records that `site`'s carry-out directly feeds `next`'s carry-in.
    pub fn set_carry_successor(&mut self, site: SiteId, next: SiteId) {
        if let Some(s) = self.sites.get_mut(site.index()) {
            s.carry_successor = Some(next);
        }
    }

    /// Adds a node whose length comes from its kind and returns its ID.
    pub fn add_node(&mut self, name: impl Into<String>, tile: TileId, kind: NodeKind) -> NodeId {
        self.push_node(name.into(), tile, kind, None)
    }

    /// Adds a node with an explicit length and returns its ID.
    pub fn add_node_with_length(
        &mut self,
        name: impl Into<String>,
        tile: TileId,
        kind: NodeKind,
        length: u32,
    ) -> NodeId {
        self.push_node(name.into(), tile, kind, Some(length))
    }

    fn push_node(&mut self, name: String, tile: TileId, kind: NodeKind, length: Option<u32>) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            name,
            tile,
            kind,
            length,
        });
        self.downhill.push(Vec::new());
        self.uphill.push(Vec::new());
        id
    }

    /// Adds a directed edge and returns its ID.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId) -> EdgeId {
        let id = EdgeId::from_raw(self.edges.len() as u32);
        self.edges.push(Edge { id, src, dst });
        self.index_edge(id, src, dst);
        id
    }

    /// Binds a site pin to a node.
    pub fn add_site_pin(&mut self, site: SiteId, name: impl Into<String>, node: NodeId) {
        let name = name.into();
        self.pin_index.insert((site, name.clone()), node);
        self.site_pins.push(SitePinDef { site, name, node });
    }

    /// Returns the edge connecting `src` to `dst`, if one exists.
    pub fn find_edge(&self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        self.downhill_edges(src)
            .iter()
            .copied()
            .find(|&e| self.edges.get(e.index()).is_some_and(|edge| edge.dst == dst))
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn index_edge(&mut self, id: EdgeId, src: NodeId, dst: NodeId) {
        if let Some(out) = self.downhill.get_mut(src.index()) {
            out.push(id);
        }
        if let Some(inc) = self.uphill.get_mut(dst.index()) {
            inc.push(id);
        }
    }

    /// Rebuilds adjacency and pin indices after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.downhill = vec![Vec::new(); self.nodes.len()];
        self.uphill = vec![Vec::new(); self.nodes.len()];
        let edges: Vec<Edge> = self.edges.clone();
        for edge in edges {
            self.index_edge(edge.id, edge.src, edge.dst);
        }
        self.pin_index = self
            .site_pins
            .iter()
            .map(|p| ((p.site, p.name.clone()), p.node))
            .collect();
    }

    /// Checks that every ID is positional and every reference resolves.
    pub fn validate(&self) -> Result<(), DeviceError> {
        fn positional(table: &'static str, ids: impl Iterator<Item = u32>) -> Result<(), DeviceError> {
            for (index, id) in ids.enumerate() {
                if id as usize != index {
                    return Err(DeviceError::MisplacedId { table, index, id });
                }
            }
            Ok(())
        }
        positional("tiles", self.tiles.iter().map(|t| t.id.as_raw()))?;
        positional("sites", self.sites.iter().map(|s| s.id.as_raw()))?;
        positional("nodes", self.nodes.iter().map(|n| n.id.as_raw()))?;
        positional("edges", self.edges.iter().map(|e| e.id.as_raw()))?;

        for site in &self.sites {
            if self.tile(site.tile).is_none() {
                return Err(DeviceError::UnknownTile(site.tile));
            }
            if let Some(next) = site.carry_successor {
                if self.site(next).is_none() {
                    return Err(DeviceError::UnknownSite(next));
                }
            }
        }
        for node in &self.nodes {
            if self.tile(node.tile).is_none() {
                return Err(DeviceError::UnknownTile(node.tile));
            }
        }
        for edge in &self.edges {
            for node in [edge.src, edge.dst] {
                if self.node(node).is_none() {
                    return Err(DeviceError::DanglingEdge {
                        edge: edge.id,
                        node,
                    });
                }
            }
        }
        for pin in &self.site_pins {
            if self.site(pin.site).is_none() {
                return Err(DeviceError::UnknownSite(pin.site));
            }
            if self.node(pin.node).is_none() {
                return Err(DeviceError::UnknownNode(pin.node));
            }
        }
        Ok(())
    }
}

impl Device for DeviceGraph {
    fn name(&self) -> &str {
        &self.name
    }

    fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.index())
    }

    fn site(&self, id: SiteId) -> Option<&Site> {
        self.sites.get(id.index())
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    fn downhill_edges(&self, node: NodeId) -> &[EdgeId] {
        self.downhill.get(node.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    fn uphill_edges(&self, node: NodeId) -> &[EdgeId] {
        self.uphill.get(node.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    fn site_pin_node(&self, site: SiteId, pin: &str) -> Option<NodeId> {
        self.pin_index.get(&(site, pin.to_string())).copied()
    }
}
