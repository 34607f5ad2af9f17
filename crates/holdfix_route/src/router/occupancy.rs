//! Node ownership across nets.
//!
//! Tracks which nets currently use each routing node so a reroute of one net
//! does not claim nodes another net's route already occupies.

use crate::data::RoutedDesign;
use crate::error::RepairError;
use crate::ids::NetId;
use holdfix_device::{Device, NodeId};
use std::collections::{BTreeSet, HashMap};

/// Per-node usage by nets.
#[derive(Debug, Clone, Default)]
pub struct NodeOccupancy {
    /// Nets currently using each node.
    users: HashMap<NodeId, BTreeSet<NetId>>,
}

impl NodeOccupancy {
    /// Creates an empty occupancy map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the committed routes of every net in the design.
    pub fn from_design(design: &RoutedDesign, device: &dyn Device) -> Result<Self, RepairError> {
        let mut occupancy = Self::new();
        for net in &design.nets {
            for &id in &net.routing {
                let edge = device.edge(id).ok_or_else(|| RepairError::UnknownEdge {
                    net: net.name.clone(),
                    edge: id,
                })?;
                occupancy.add_usage(edge.src, net.id);
                occupancy.add_usage(edge.dst, net.id);
            }
        }
        Ok(occupancy)
    }

    /// Records that `net` uses `node`.
    pub fn add_usage(&mut self, node: NodeId, net: NetId) {
        self.users.entry(node).or_default().insert(net);
    }

    /// Returns `true` if a net other than `net` uses `node`.
    pub fn is_blocked_for(&self, node: NodeId, net: NetId) -> bool {
        self.users
            .get(&node)
            .is_some_and(|users| users.iter().any(|&u| u != net))
    }
}
