//! Iterative hold repair.
//!
//! Hold-risk connections are taken shortest first. For each one the sink's
//! exclusive branch is ripped up, the fabric nodes it used join the
//! connection's avoid set, and the router is asked for a new path that
//! avoids them all. The net is then re-measured. A connection is repaired
//! once its length reaches the threshold and abandoned when the router fails,
//! when the avoid set stops growing, or when its attempt budget runs out.
//!
//! After each connection its net is re-measured and the net's remaining
//! candidates are re-ranked, since rerouting one sink can change the length
//! of its siblings. The loop stops as soon as the shortest remaining
//! candidate meets the threshold.

use crate::avoid::AvoidSet;
use crate::classify::{hold_candidate, RankedConnection};
use crate::data::RoutedDesign;
use crate::entries::FabricEntries;
use crate::error::RepairError;
use crate::ids::NetId;
use crate::net_wrapper::ConnectionKey;
use crate::router::{RouteFailure, Router};
use crate::wirelength::{measure_design, measure_net, Weighting};
use holdfix_config::HoldfixConfig;
use holdfix_device::{Device, EdgeId, NodeId, NodeKind};
use holdfix_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Location};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};
use std::fmt;

/// Why a connection was given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    /// The router found no legal path under the avoid set.
    RouterFailed,
    /// A round added nothing new to the avoid set and the length is still short.
    AvoidSetExhausted,
    /// The per-connection attempt budget ran out.
    AttemptLimit,
    /// The router reported success but the sink is not reached by the route.
    SinkUnreachable,
}

impl AbandonReason {
    /// Returns `true` if the sink is left without a route unless restored.
    pub fn loses_route(self) -> bool {
        matches!(self, AbandonReason::RouterFailed | AbandonReason::SinkUnreachable)
    }
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AbandonReason::RouterFailed => "router found no legal detour",
            AbandonReason::AvoidSetExhausted => "no further nodes to avoid",
            AbandonReason::AttemptLimit => "attempt limit reached",
            AbandonReason::SinkUnreachable => "sink not reached after reroute",
        };
        f.write_str(text)
    }
}

/// A hold-risk connection the repair loop could not fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonedConnection {
    /// Net name.
    pub net: String,
    /// Driver pin label.
    pub driver: String,
    /// Sink pin label.
    pub sink: String,
    /// Length when the connection was picked.
    pub length_before: u64,
    /// Length the sink is left with, if it is still routed.
    pub length_after: Option<u64>,
    /// Rip-up/reroute rounds spent.
    pub attempts: u32,
    /// Why repair stopped.
    pub reason: AbandonReason,
    /// The route from before repair was put back.
    pub restored: bool,
}

/// Outcome of a repair session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairSummary {
    /// Connections that reached the threshold.
    pub repaired: usize,
    /// Connections given up on.
    pub abandoned: Vec<AbandonedConnection>,
    /// Connections picked for repair.
    pub processed: usize,
    /// Rip-up/reroute rounds across all connections.
    pub attempts: u32,
    /// The session stopped at the configured connection limit.
    pub limit_reached: bool,
}

/// A queued candidate, valid while its net's generation is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Pending {
    candidate: RankedConnection,
    generation: u32,
}

enum Outcome {
    Repaired { length: u64 },
    Abandoned(AbandonedConnection),
}

struct Session<'a> {
    design: &'a mut RoutedDesign,
    device: &'a dyn Device,
    config: &'a HoldfixConfig,
    entries: &'a mut FabricEntries,
    sink: &'a DiagnosticSink,
    weighting: Weighting,
}

/// Repairs hold-risk connections of `design` using `router`.
///
/// Local failures are recorded in the summary and reported to `sink`; only
/// configuration and model errors are returned as `Err`.
pub fn fix_hold_violations(
    design: &mut RoutedDesign,
    device: &dyn Device,
    router: &mut dyn Router,
    config: &HoldfixConfig,
    entries: &mut FabricEntries,
    sink: &DiagnosticSink,
) -> Result<RepairSummary, RepairError> {
    let mut session = Session {
        design,
        device,
        config,
        entries,
        sink,
        weighting: Weighting::from(&config.wirelength),
    };
    session.run(router)
}

impl Session<'_> {
    fn run(&mut self, router: &mut dyn Router) -> Result<RepairSummary, RepairError> {
        let threshold = self.config.hold.min_wirelength;
        let scan = measure_design(
            self.design,
            self.device,
            self.weighting,
            &self.config.filter,
            self.entries,
            self.sink,
        )?;

        let mut queue = BinaryHeap::new();
        for conn in &scan.connections {
            if let Some(candidate) =
                hold_candidate(self.design, self.device, conn, self.config.hold.skew_axis)
            {
                queue.push(Reverse(Pending {
                    candidate,
                    generation: 0,
                }));
            }
        }
        tracing::info!(candidates = queue.len(), threshold, "starting hold repair");

        let mut generations: HashMap<NetId, u32> = HashMap::new();
        let mut processed: HashSet<ConnectionKey> = HashSet::new();
        let mut summary = RepairSummary::default();

        while let Some(Reverse(pending)) = queue.pop() {
            let candidate = pending.candidate;
            let current = generations.get(&candidate.net).copied().unwrap_or(0);
            if pending.generation != current || processed.contains(&candidate.key()) {
                continue;
            }
            if candidate.length >= threshold {
                break;
            }
            if let Some(limit) = self.config.repair.connection_limit() {
                if summary.processed >= limit {
                    summary.limit_reached = true;
                    tracing::info!(limit, "connection limit reached");
                    break;
                }
            }
            processed.insert(candidate.key());
            summary.processed += 1;

            match self.repair_connection(router, candidate, &mut summary)? {
                Outcome::Repaired { length } => {
                    summary.repaired += 1;
                    tracing::info!(
                        net = %candidate.net,
                        sink = %candidate.sink,
                        before = candidate.length,
                        after = length,
                        "connection repaired"
                    );
                }
                Outcome::Abandoned(record) => {
                    self.report_abandoned(&record);
                    summary.abandoned.push(record);
                }
            }

            let generation = generations.entry(candidate.net).or_insert(0);
            *generation += 1;
            let generation = *generation;
            for conn in self.remeasure(candidate.net)? {
                if processed.contains(&conn.key()) {
                    continue;
                }
                queue.push(Reverse(Pending {
                    candidate: conn,
                    generation,
                }));
            }
        }

        tracing::info!(
            repaired = summary.repaired,
            abandoned = summary.abandoned.len(),
            attempts = summary.attempts,
            "hold repair finished"
        );
        Ok(summary)
    }

    /// Re-measures one net and returns its current hold-risk candidates.
    ///
    /// Unrouted-sink warnings are not re-reported here; abandoned
    /// connections carry their own diagnostics.
    fn remeasure(&mut self, net: NetId) -> Result<Vec<RankedConnection>, RepairError> {
        let scratch = DiagnosticSink::new();
        let measured = measure_net(
            self.design,
            self.device,
            net,
            self.weighting,
            self.entries,
            &scratch,
        )?;
        Ok(measured
            .wrapper
            .connections
            .iter()
            .filter_map(|c| hold_candidate(self.design, self.device, c, self.config.hold.skew_axis))
            .collect())
    }

    /// Measures the current length of one connection.
    fn connection_length(&mut self, key: ConnectionKey) -> Result<Option<u64>, RepairError> {
        let scratch = DiagnosticSink::new();
        let measured = measure_net(
            self.design,
            self.device,
            key.net,
            self.weighting,
            self.entries,
            &scratch,
        )?;
        Ok(measured.wrapper.connection(key.sink).and_then(|c| c.length))
    }

    /// Nodes that never enter the avoid set: the pins and fabric entries of
    /// the connection and the net's driver roots.
    fn protected_nodes(&self, candidate: RankedConnection) -> Result<BTreeSet<NodeId>, RepairError> {
        let mut nodes: BTreeSet<NodeId> = self
            .design
            .driver_roots(self.device, candidate.net)?
            .into_iter()
            .collect();
        nodes.insert(self.design.pin_node(self.device, candidate.sink)?);
        let sink = self.design.pin(candidate.sink)?;
        nodes.extend(self.device.fabric_entry_for_input(sink.site, &sink.name));
        let driver = self.design.pin(candidate.driver)?;
        nodes.extend(self.device.fabric_entry_for_output(driver.site, &driver.name));
        Ok(nodes)
    }

    /// Fabric nodes entered by the given edges that may be avoided.
    fn avoidable_nodes(
        &self,
        net: NetId,
        edges: &[EdgeId],
        protected: &BTreeSet<NodeId>,
    ) -> Result<Vec<NodeId>, RepairError> {
        let mut nodes = Vec::new();
        for &id in edges {
            let edge = self.device.edge(id).ok_or_else(|| RepairError::UnknownEdge {
                net: self.design.net(net).map(|n| n.name.clone()).unwrap_or_default(),
                edge: id,
            })?;
            let node = edge.dst;
            let free = self.device.node_kind(node).is_some_and(NodeKind::is_free_detour);
            if self.device.is_fabric_node(node) && !free && !protected.contains(&node) {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn repair_connection(
        &mut self,
        router: &mut dyn Router,
        candidate: RankedConnection,
        summary: &mut RepairSummary,
    ) -> Result<Outcome, RepairError> {
        let net = candidate.net;
        let threshold = self.config.hold.min_wirelength;
        let max_attempts = self.config.repair.max_attempts;
        let snapshot = self.design.net(net)?.routing.clone();
        let protected = self.protected_nodes(candidate)?;
        let mut avoid = AvoidSet::new();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            summary.attempts += 1;

            let trimmable = self.design.trimmable_edges(self.device, net, candidate.sink)?;
            let fresh = self.avoidable_nodes(net, &trimmable, &protected)?;
            let grew = avoid.extend(fresh) > 0;
            self.design.unroute_pin(self.device, net, candidate.sink)?;
            tracing::debug!(
                net = %net,
                sink = %candidate.sink,
                attempt = attempts,
                avoid = avoid.len(),
                "rerouting connection"
            );

            if let Err(failure) = router.route(self.design, self.device, net, &[candidate.sink], &avoid) {
                let failure = match failure {
                    RouteFailure::Model(err) => return Err(err),
                    other => other,
                };
                tracing::debug!(net = %net, sink = %candidate.sink, %failure, "reroute failed");
                return self.abandon(candidate, attempts, None, AbandonReason::RouterFailed, snapshot);
            }

            let length = self.connection_length(candidate.key())?;
            match length {
                None => {
                    return self.abandon(
                        candidate,
                        attempts,
                        None,
                        AbandonReason::SinkUnreachable,
                        snapshot,
                    );
                }
                Some(length) if length >= threshold => return Ok(Outcome::Repaired { length }),
                Some(length) if !grew => {
                    return self.abandon(
                        candidate,
                        attempts,
                        Some(length),
                        AbandonReason::AvoidSetExhausted,
                        snapshot,
                    );
                }
                Some(length) if attempts >= max_attempts => {
                    return self.abandon(
                        candidate,
                        attempts,
                        Some(length),
                        AbandonReason::AttemptLimit,
                        snapshot,
                    );
                }
                Some(_) => {}
            }
        }
    }

    /// Records an abandoned connection, restoring the net's previous route
    /// when the sink lost its route and rollback is enabled.
    fn abandon(
        &mut self,
        candidate: RankedConnection,
        attempts: u32,
        length_after: Option<u64>,
        reason: AbandonReason,
        snapshot: BTreeSet<EdgeId>,
    ) -> Result<Outcome, RepairError> {
        let restored = reason.loses_route() && self.config.repair.rollback_on_failure;
        if restored {
            self.design.net_mut(candidate.net)?.routing = snapshot;
        }
        let net = self.design.net(candidate.net)?;
        Ok(Outcome::Abandoned(AbandonedConnection {
            net: net.name.clone(),
            driver: self.design.pin_label(self.device, candidate.driver),
            sink: self.design.pin_label(self.device, candidate.sink),
            length_before: candidate.length,
            length_after: if restored { Some(candidate.length) } else { length_after },
            attempts,
            reason,
            restored,
        }))
    }

    fn report_abandoned(&self, record: &AbandonedConnection) {
        tracing::warn!(
            net = %record.net,
            sink = %record.sink,
            reason = %record.reason,
            attempts = record.attempts,
            "hold repair abandoned"
        );
        let location = Location::connection(
            record.net.clone(),
            record.driver.clone(),
            record.sink.clone(),
        );
        let mut diag = Diagnostic::warning(
            DiagnosticCode::REPAIR_ABANDONED,
            format!("hold repair abandoned: {}", record.reason),
            location.clone(),
        )
        .with_note(format!(
            "length {} after {} attempt(s), threshold {}",
            record.length_after.unwrap_or(record.length_before),
            record.attempts,
            self.config.hold.min_wirelength
        ));
        if record.restored {
            diag = diag.with_note("the previous route was restored");
        }
        self.sink.emit(diag);

        if record.reason.loses_route() && !record.restored {
            self.sink.emit(
                Diagnostic::warning(
                    DiagnosticCode::SINK_LEFT_UNROUTED,
                    "sink left unrouted after failed hold repair",
                    location,
                )
                .with_help("set `rollback_on_failure = true` to keep the previous route"),
            );
        }
    }
}
