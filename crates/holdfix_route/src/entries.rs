//! Registry of fabric entry nodes used by analyzed connections.

use holdfix_device::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which end of a connection enters the fabric at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    /// Where a driver's dedicated wiring joins the fabric.
    Driver,
    /// Where the fabric hands off to a sink's dedicated wiring.
    Sink,
}

/// A registered fabric entry node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FabricEntry {
    /// The fabric node.
    pub node: NodeId,
    /// Registered as a driver-side entry.
    pub driver: bool,
    /// Registered as a sink-side entry.
    pub sink: bool,
}

/// Registered entry nodes by role.
///
/// A node registered in both roles counts toward `driver` and `sink` but
/// only once toward `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCounts {
    /// Distinct registered nodes.
    pub total: usize,
    /// Nodes where a driver joins the fabric.
    pub driver: usize,
    /// Nodes feeding a sink.
    pub sink: usize,
}

/// Fabric entry nodes shared by all connections of a pass.
///
/// Registration is get-or-create: many connections can share a node (every
/// connection of a net shares its driver entry) and registering the same
/// node again returns the existing record.
#[derive(Debug, Clone, Default)]
pub struct FabricEntries {
    entries: BTreeMap<NodeId, FabricEntry>,
}

impl FabricEntries {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` in the given role and returns its record.
    pub fn get_or_create(&mut self, node: NodeId, role: EntryRole) -> &FabricEntry {
        let entry = self.entries.entry(node).or_insert(FabricEntry {
            node,
            driver: false,
            sink: false,
        });
        match role {
            EntryRole::Driver => entry.driver = true,
            EntryRole::Sink => entry.sink = true,
        }
        entry
    }

    /// Counts registered nodes per role.
    pub fn counts(&self) -> EntryCounts {
        self.entries.values().fold(
            EntryCounts {
                total: self.entries.len(),
                ..EntryCounts::default()
            },
            |mut counts, entry| {
                counts.driver += usize::from(entry.driver);
                counts.sink += usize::from(entry.sink);
                counts
            },
        )
    }

    /// Returns the number of registered nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent() {
        let mut entries = FabricEntries::new();
        let n = NodeId::from_raw(4);
        entries.get_or_create(n, EntryRole::Sink);
        entries.get_or_create(n, EntryRole::Sink);
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries.counts(),
            EntryCounts {
                total: 1,
                driver: 0,
                sink: 1
            }
        );
    }

    #[test]
    fn roles_accumulate() {
        let mut entries = FabricEntries::new();
        let n = NodeId::from_raw(1);
        entries.get_or_create(n, EntryRole::Driver);
        let e = entries.get_or_create(n, EntryRole::Sink);
        assert!(e.driver && e.sink);
        entries.get_or_create(NodeId::from_raw(2), EntryRole::Sink);
        let counts = entries.counts();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.driver, 1);
        assert_eq!(counts.sink, 2);
    }

    #[test]
    fn empty_registry() {
        let entries = FabricEntries::new();
        assert!(entries.is_empty());
        assert_eq!(entries.counts(), EntryCounts::default());
    }
}
