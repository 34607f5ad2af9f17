//! The point-to-point router interface used by hold repair.
//!
//! Repair rips up one sink and hands it to a [`Router`] together with the
//! nodes that must not be reused. [`MazeRouter`] is a reference
//! implementation searching the device graph directly.

mod maze;
mod occupancy;

pub use maze::MazeRouter;
pub use occupancy::NodeOccupancy;

use crate::avoid::AvoidSet;
use crate::data::RoutedDesign;
use crate::error::RepairError;
use crate::ids::{NetId, PinId};
use holdfix_device::Device;

/// Why a route attempt produced no path.
#[derive(Debug, thiserror::Error)]
pub enum RouteFailure {
    /// No legal path reaches the sink under the current exclusions.
    #[error("no legal path to sink pin {sink}")]
    NoPath {
        /// The sink that could not be reached.
        sink: PinId,
    },

    /// The search gave up after its expansion budget.
    #[error("search budget of {limit} expansions exhausted for sink pin {sink}")]
    BudgetExhausted {
        /// The sink being searched for.
        sink: PinId,
        /// The expansion budget.
        limit: usize,
    },

    /// The routed design and the device disagree.
    #[error(transparent)]
    Model(#[from] RepairError),
}

/// A synchronous, single-attempt point-to-point router.
pub trait Router {
    /// Routes `sinks` of `net` without entering any node in `avoid`.
    ///
    /// On success the net's committed route reaches every sink. On failure
    /// the failing sink is left without a route.
    fn route(
        &mut self,
        design: &mut RoutedDesign,
        device: &dyn Device,
        net: NetId,
        sinks: &[PinId],
        avoid: &AvoidSet,
    ) -> Result<(), RouteFailure>;
}
