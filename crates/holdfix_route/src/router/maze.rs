//! A* maze search for rerouting single sinks.
//!
//! Grows from every node already on the net's route toward the sink pin's
//! node. Each hop costs one plus the entered node's intrinsic length, and
//! the remaining tile distance to the sink guides the search. Nodes in the
//! avoid set and nodes used by other nets are never entered.

use super::occupancy::NodeOccupancy;
use super::{RouteFailure, Router};
use crate::avoid::AvoidSet;
use crate::data::RoutedDesign;
use crate::ids::{NetId, PinId};
use holdfix_device::{Device, EdgeId, NodeId};
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

/// Default number of node expansions before a search gives up.
const DEFAULT_EXPANSION_LIMIT: usize = 200_000;

/// A search state in the A* priority queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SearchState {
    /// The node currently being explored.
    node: NodeId,
    /// Total cost from the route tree to this node (g-score).
    cost: u64,
    /// Estimated total cost including heuristic (f-score = g + h).
    estimated_total: u64,
}

impl Ord for SearchState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; ties go to the lower node ID.
        other
            .estimated_total
            .cmp(&self.estimated_total)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for SearchState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reference [`Router`] performing an A* search over the device graph.
#[derive(Debug, Clone)]
pub struct MazeRouter {
    expansion_limit: usize,
}

impl MazeRouter {
    /// Creates a router with the default expansion budget.
    pub fn new() -> Self {
        Self {
            expansion_limit: DEFAULT_EXPANSION_LIMIT,
        }
    }

    /// Creates a router that gives up after `limit` node expansions per sink.
    pub fn with_expansion_limit(limit: usize) -> Self {
        Self {
            expansion_limit: limit,
        }
    }

    /// Finds the cheapest legal path from `sources` to `target`.
    ///
    /// Returns the path's edges, source side first.
    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        device: &dyn Device,
        occupancy: &NodeOccupancy,
        net: NetId,
        sources: &BTreeSet<NodeId>,
        target: NodeId,
        avoid: &AvoidSet,
        sink: PinId,
    ) -> Result<Vec<EdgeId>, RouteFailure> {
        let mut open = BinaryHeap::new();
        let mut g_scores: HashMap<NodeId, u64> = HashMap::new();
        let mut came_from: HashMap<NodeId, (NodeId, EdgeId)> = HashMap::new();

        for &source in sources {
            g_scores.insert(source, 0);
            open.push(SearchState {
                node: source,
                cost: 0,
                estimated_total: heuristic(device, source, target),
            });
        }

        let mut expansions = 0usize;
        while let Some(current) = open.pop() {
            if current.node == target {
                return Ok(reconstruct_path(&came_from, sources, target));
            }
            let current_g = g_scores.get(&current.node).copied().unwrap_or(u64::MAX);
            if current.cost > current_g {
                continue; // Stale entry
            }
            expansions += 1;
            if expansions > self.expansion_limit {
                return Err(RouteFailure::BudgetExhausted {
                    sink,
                    limit: self.expansion_limit,
                });
            }

            for edge in device
                .downhill_edges(current.node)
                .iter()
                .filter_map(|&id| device.edge(id))
            {
                let next = edge.dst;
                if sources.contains(&next) {
                    continue;
                }
                if next != target && (avoid.contains(next) || occupancy.is_blocked_for(next, net)) {
                    continue;
                }
                let step = 1 + u64::from(device.node_length(next).unwrap_or(0));
                let tentative_g = current_g + step;
                if tentative_g < g_scores.get(&next).copied().unwrap_or(u64::MAX) {
                    g_scores.insert(next, tentative_g);
                    came_from.insert(next, (current.node, edge.id));
                    open.push(SearchState {
                        node: next,
                        cost: tentative_g,
                        estimated_total: tentative_g + heuristic(device, next, target),
                    });
                }
            }
        }

        Err(RouteFailure::NoPath { sink })
    }
}

impl Default for MazeRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for MazeRouter {
    fn route(
        &mut self,
        design: &mut RoutedDesign,
        device: &dyn Device,
        net: NetId,
        sinks: &[PinId],
        avoid: &AvoidSet,
    ) -> Result<(), RouteFailure> {
        let mut occupancy = NodeOccupancy::from_design(design, device)?;
        for &sink in sinks {
            if design.is_sink_routed(device, net, sink)? {
                continue;
            }
            let target = design.pin_node(device, sink)?;
            let route = design.committed_route(device, net)?;
            let mut sources: BTreeSet<NodeId> = route
                .nodes()
                .filter(|&n| !avoid.contains(n))
                .collect();
            sources.extend(design.driver_roots(device, net)?);

            let path = self.search(device, &occupancy, net, &sources, target, avoid, sink)?;
            tracing::debug!(net = %net, sink = %sink, hops = path.len(), "maze route found");
            let routing = &mut design.net_mut(net)?.routing;
            for &id in &path {
                routing.insert(id);
                if let Some(edge) = device.edge(id) {
                    occupancy.add_usage(edge.src, net);
                    occupancy.add_usage(edge.dst, net);
                }
            }
        }
        Ok(())
    }
}

/// Manhattan tile distance from `from` to `to`.
fn heuristic(device: &dyn Device, from: NodeId, to: NodeId) -> u64 {
    device.tile_distance(from, to).map_or(0, u64::from)
}

/// Walks `came_from` back from `end` to the first source node.
fn reconstruct_path(
    came_from: &HashMap<NodeId, (NodeId, EdgeId)>,
    sources: &BTreeSet<NodeId>,
    end: NodeId,
) -> Vec<EdgeId> {
    let mut path = Vec::new();
    let mut current = end;
    while !sources.contains(&current) {
        match came_from.get(&current) {
            Some(&(prev, edge)) => {
                path.push(edge);
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}
