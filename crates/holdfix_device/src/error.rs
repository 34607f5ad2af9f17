//! Errors raised while validating a device model.

use crate::ids::{EdgeId, NodeId, SiteId, TileId};

/// Inconsistencies found in device tables.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeviceError {
    /// A table entry's ID does not match its position.
    #[error("{table} entry at index {index} carries id {id}")]
    MisplacedId {
        /// Table name.
        table: &'static str,
        /// Position in the table.
        index: usize,
        /// The ID stored in the entry.
        id: u32,
    },

    /// A tile reference does not resolve.
    #[error("unknown tile {0}")]
    UnknownTile(TileId),

    /// A site reference does not resolve.
    #[error("unknown site {0}")]
    UnknownSite(SiteId),

    /// A node reference does not resolve.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// An edge references a node that does not exist.
    #[error("edge {edge} references unknown node {node}")]
    DanglingEdge {
        /// The offending edge.
        edge: EdgeId,
        /// The missing node.
        node: NodeId,
    },
}
