//! Nodes excluded from the next reroute of one connection.

use holdfix_device::NodeId;
use std::collections::BTreeSet;

/// Routing nodes a reroute must not use.
///
/// The set only grows while one connection is being repaired; a fresh set
/// is started for the next connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvoidSet {
    nodes: BTreeSet<NodeId>,
}

impl AvoidSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds nodes and returns how many were not already present.
    pub fn extend(&mut self, nodes: impl IntoIterator<Item = NodeId>) -> usize {
        nodes.into_iter().filter(|&n| self.nodes.insert(n)).count()
    }

    /// Returns `true` if `node` is excluded.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Returns the number of excluded nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing is excluded.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if every node of `other` is also in this set.
    pub fn is_superset(&self, other: &AvoidSet) -> bool {
        self.nodes.is_superset(&other.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: u32) -> NodeId {
        NodeId::from_raw(i)
    }

    #[test]
    fn extend_counts_new_nodes() {
        let mut set = AvoidSet::new();
        assert_eq!(set.extend([n(1), n(2)]), 2);
        assert_eq!(set.extend([n(2), n(3)]), 1);
        assert_eq!(set.extend([n(1)]), 0);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn superset_after_growth() {
        let mut set = AvoidSet::new();
        set.extend([n(4)]);
        let before = set.clone();
        set.extend([n(5)]);
        assert!(set.is_superset(&before));
        assert!(!before.is_superset(&set));
        assert!(set.contains(n(5)));
    }
}
