//! Structural elements of a device routing model.
//!
//! Tiles sit on a grid and belong to a clock region. Sites live in tiles and
//! expose pins. Routing nodes live in tiles and are connected by directed
//! edges, one per programmable interconnect point. Node behavior that varies
//! by kind (default length, whether the node is a free detour point) comes
//! from a lookup table on [`NodeKind`] rather than per-node data.

use crate::ids::{EdgeId, NodeId, SiteId, TileId};
use serde::{Deserialize, Serialize};

/// The functional type of a tile.
///
/// Only [`TileType::Interconnect`] tiles belong to the general switching
/// fabric; nodes elsewhere are dedicated site wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    /// A switch-box tile of the general routing fabric.
    Interconnect,
    /// A tile containing configurable logic (LUTs, FFs, carry chains).
    Logic,
    /// A tile containing block RAM.
    Bram,
    /// A tile containing DSP blocks.
    Dsp,
    /// An I/O tile.
    Io,
    /// A clock distribution tile.
    Clock,
}

impl TileType {
    /// Returns `true` for tiles of the general switching fabric.
    pub fn is_fabric(self) -> bool {
        self == TileType::Interconnect
    }
}

/// Coordinates of a clock-distribution region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ClockRegion {
    /// Region column (left to right).
    pub col: u32,
    /// Region row (bottom to top).
    pub row: u32,
}

impl ClockRegion {
    /// Creates a clock region coordinate.
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

/// A tile in the device grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    /// The unique ID of this tile.
    pub id: TileId,
    /// Tile name (e.g., "INT_X12Y40").
    pub name: String,
    /// Column index in the device grid.
    pub col: u32,
    /// Row index in the device grid.
    pub row: u32,
    /// The functional type of this tile.
    pub tile_type: TileType,
    /// The clock region containing this tile.
    pub clock_region: ClockRegion,
}

/// A placement site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// The unique ID of this site.
    pub id: SiteId,
    /// Site name (e.g., "SLICE_X3Y40").
    pub name: String,
    /// The tile containing this site.
    pub tile: TileId,
    /// The site whose carry-in is fed directly by this site's carry-out.
    #[serde(default)]
    pub carry_successor: Option<SiteId>,
}

/// Classification of a routing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The node attached directly to a site pin.
    SitePin,
    /// A site output entering the switch box.
    Output,
    /// A switch-box node feeding a site input.
    PinFeed,
    /// A bounce node that turns a signal around inside one switch box.
    PinBounce,
    /// A distribution node shared by a switch box quadrant.
    SdqNode,
    /// A wire spanning one tile.
    Single,
    /// A wire spanning two tiles.
    Double,
    /// A wire spanning four tiles.
    Quad,
    /// A long line spanning many tiles.
    Long,
    /// A global (clock) distribution node.
    Global,
}

/// Per-kind properties looked up from [`NodeKind::profile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindProfile {
    /// Length used for nodes that carry no explicit length.
    pub default_length: u32,
    /// Pass-through point that may be reused freely during hold repair.
    pub free_detour: bool,
}

impl NodeKind {
    /// Every node kind, in report order.
    pub const ALL: [NodeKind; 10] = [
        NodeKind::SitePin,
        NodeKind::Output,
        NodeKind::PinFeed,
        NodeKind::PinBounce,
        NodeKind::SdqNode,
        NodeKind::Single,
        NodeKind::Double,
        NodeKind::Quad,
        NodeKind::Long,
        NodeKind::Global,
    ];

    /// Returns the lookup-table entry for this kind.
    pub fn profile(self) -> KindProfile {
        let (default_length, free_detour) = match self {
            NodeKind::SitePin => (0, false),
            NodeKind::Output => (0, false),
            NodeKind::PinFeed => (0, false),
            NodeKind::PinBounce => (0, true),
            NodeKind::SdqNode => (1, true),
            NodeKind::Single => (1, false),
            NodeKind::Double => (2, false),
            NodeKind::Quad => (4, false),
            NodeKind::Long => (12, false),
            NodeKind::Global => (0, false),
        };
        KindProfile {
            default_length,
            free_detour,
        }
    }

    /// Returns `true` for kinds that never enter an avoid set.
    pub fn is_free_detour(self) -> bool {
        self.profile().free_detour
    }

    /// Returns the report name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::SitePin => "site_pin",
            NodeKind::Output => "output",
            NodeKind::PinFeed => "pin_feed",
            NodeKind::PinBounce => "pin_bounce",
            NodeKind::SdqNode => "sdq_node",
            NodeKind::Single => "single",
            NodeKind::Double => "double",
            NodeKind::Quad => "quad",
            NodeKind::Long => "long",
            NodeKind::Global => "global",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A routing node of the interconnect graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// The unique ID of this node.
    pub id: NodeId,
    /// Node name (e.g., "INT_X12Y40/EE2_E_BEG3").
    pub name: String,
    /// The tile this node is anchored in.
    pub tile: TileId,
    /// The node classification.
    pub kind: NodeKind,
    /// Explicit length; `None` falls back to the kind's default.
    #[serde(default)]
    pub length: Option<u32>,
}

impl Node {
    /// Returns the intrinsic length of this node.
    pub fn length(&self) -> u32 {
        self.length.unwrap_or(self.kind.profile().default_length)
    }
}

/// A directed, device-legal connection between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// The unique ID of this edge.
    pub id: EdgeId,
    /// Upstream node.
    pub src: NodeId,
    /// Downstream node.
    pub dst: NodeId,
}

/// Binding of a named site pin to the routing node it is wired to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitePinDef {
    /// The site owning the pin.
    pub site: SiteId,
    /// Pin name within the site (e.g., "AQ", "A1", "COUT").
    pub name: String,
    /// The node the pin connects to.
    pub node: NodeId,
}
