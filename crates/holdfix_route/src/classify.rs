//! Setup and hold rankings of measured connections.
//!
//! The longest connections are reported as setup-risk proxies. Connections
//! whose endpoints sit in different clock regions along the skew axis are
//! hold-risk candidates, ranked shortest first. A zero or missing length
//! means the connection could not be analyzed, so it is left out of both
//! rankings rather than ranked as the riskiest.

use crate::data::RoutedDesign;
use crate::ids::{NetId, PinId};
use crate::net_wrapper::{Connection, ConnectionKey};
use holdfix_config::SkewAxis;
use holdfix_device::{ClockRegion, Device};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A connection with its measured length.
///
/// Ordering is by length, then net, then sink, so rankings are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RankedConnection {
    /// Measured length.
    pub length: u64,
    /// The owning net.
    pub net: NetId,
    /// The sink pin.
    pub sink: PinId,
    /// The effective driver pin.
    pub driver: PinId,
}

impl RankedConnection {
    /// Returns the identity of the ranked connection.
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey {
            net: self.net,
            sink: self.sink,
        }
    }

    /// Ranks a connection if it has a usable length.
    pub fn from_connection(conn: &Connection) -> Option<Self> {
        if conn.direct {
            return None;
        }
        match conn.length {
            Some(length) if length > 0 => Some(Self {
                length,
                net: conn.net,
                sink: conn.sink,
                driver: conn.driver,
            }),
            _ => None,
        }
    }
}

fn axis_coordinate(region: ClockRegion, axis: SkewAxis) -> u32 {
    match axis {
        SkewAxis::Column => region.col,
        SkewAxis::Row => region.row,
    }
}

/// Returns `true` if the connection's driver and sink sites lie in
/// different clock regions along `axis`.
///
/// Pins whose clock region cannot be resolved are treated as not crossing.
pub fn crosses_clock_regions(
    design: &RoutedDesign,
    device: &dyn Device,
    driver: PinId,
    sink: PinId,
    axis: SkewAxis,
) -> bool {
    let region = |pin: PinId| {
        design
            .pin(pin)
            .ok()
            .and_then(|p| device.clock_region_of(p.site))
            .map(|r| axis_coordinate(r, axis))
    };
    match (region(driver), region(sink)) {
        (Some(a), Some(b)) => a != b,
        _ => false,
    }
}

/// Returns the connection as a hold-risk candidate, if it is one.
pub fn hold_candidate(
    design: &RoutedDesign,
    device: &dyn Device,
    conn: &Connection,
    axis: SkewAxis,
) -> Option<RankedConnection> {
    RankedConnection::from_connection(conn)
        .filter(|_| crosses_clock_regions(design, device, conn.driver, conn.sink, axis))
}

/// Pops up to `k` entries; an exhausted heap yields a shorter list.
fn drain_top<T: Ord>(heap: &mut BinaryHeap<T>, k: usize) -> Vec<T> {
    std::iter::from_fn(|| heap.pop()).take(k).collect()
}

/// Longest-first ranking of measured connections.
#[derive(Debug, Clone, Default)]
pub struct SetupRanking {
    heap: BinaryHeap<RankedConnection>,
}

impl SetupRanking {
    /// Ranks every measured connection.
    pub fn new<'a>(connections: impl IntoIterator<Item = &'a Connection>) -> Self {
        Self {
            heap: connections
                .into_iter()
                .filter_map(RankedConnection::from_connection)
                .collect(),
        }
    }

    /// Pops the longest remaining connection.
    pub fn pop(&mut self) -> Option<RankedConnection> {
        self.heap.pop()
    }

    /// Pops up to `k` of the longest connections.
    pub fn top(&mut self, k: usize) -> Vec<RankedConnection> {
        drain_top(&mut self.heap, k)
    }

    /// Returns the number of ranked connections.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing is ranked.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Shortest-first ranking of connections that cross clock regions.
#[derive(Debug, Clone, Default)]
pub struct HoldRanking {
    heap: BinaryHeap<Reverse<RankedConnection>>,
}

impl HoldRanking {
    /// Ranks the hold-risk candidates among `connections`.
    pub fn new<'a>(
        design: &RoutedDesign,
        device: &dyn Device,
        connections: impl IntoIterator<Item = &'a Connection>,
        axis: SkewAxis,
    ) -> Self {
        Self {
            heap: connections
                .into_iter()
                .filter_map(|c| hold_candidate(design, device, c, axis))
                .map(Reverse)
                .collect(),
        }
    }

    /// Pops the shortest remaining candidate.
    pub fn pop(&mut self) -> Option<RankedConnection> {
        self.heap.pop().map(|Reverse(c)| c)
    }

    /// Returns the shortest remaining candidate without removing it.
    pub fn peek(&self) -> Option<&RankedConnection> {
        self.heap.peek().map(|Reverse(c)| c)
    }

    /// Pops up to `k` of the shortest candidates.
    pub fn top(&mut self, k: usize) -> Vec<RankedConnection> {
        drain_top(&mut self.heap, k)
            .into_iter()
            .map(|Reverse(c)| c)
            .collect()
    }

    /// Returns the number of candidates.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
