//! Hard failures of a measurement or repair pass.
//!
//! Local problems (an unrouted sink, a connection the router cannot detour)
//! are reported as diagnostics and recorded in the pass results. Only the
//! conditions below abort a pass.

use crate::ids::{NetId, PinId};
use holdfix_common::InternalError;
use holdfix_device::{EdgeId, NodeId};
use holdfix_diagnostics::{Diagnostic, DiagnosticCode, Location};

/// Errors that abort a measurement or repair pass.
#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    /// A carry-out driver feeds a general sink but the net has no alternate source.
    #[error("net {net}: {driver} -> {sink} needs an alternate source but none is set")]
    MissingAlternateSource {
        /// Net name.
        net: String,
        /// The carry-out driver pin.
        driver: String,
        /// The sink that cannot be driven through dedicated carry wiring.
        sink: String,
    },

    /// A net ID does not resolve.
    #[error("unknown net {0}")]
    UnknownNet(NetId),

    /// A pin ID does not resolve, or the pin has no routing node.
    #[error("unknown pin {0}")]
    UnknownPin(PinId),

    /// A committed edge is not present in the device.
    #[error("net {net}: committed edge {edge} is not in the device")]
    UnknownEdge {
        /// Net name.
        net: String,
        /// The unresolvable edge.
        edge: EdgeId,
    },

    /// A node reached by a committed route is not present in the device.
    #[error("net {net}: routed node {node} is not in the device")]
    UnknownNode {
        /// Net name.
        net: String,
        /// The unresolvable node.
        node: NodeId,
    },

    /// An internal invariant was violated.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl RepairError {
    /// Returns the diagnostic code reported for this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            RepairError::MissingAlternateSource { .. } => DiagnosticCode::MISSING_ALTERNATE_SOURCE,
            _ => DiagnosticCode::MODEL_CORRUPTION,
        }
    }

    /// Converts this error into an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let location = match self {
            RepairError::MissingAlternateSource { net, driver, sink } => {
                Location::connection(net.clone(), driver.clone(), sink.clone())
            }
            RepairError::UnknownEdge { net, .. } | RepairError::UnknownNode { net, .. } => {
                Location::net(net.clone())
            }
            _ => Location::Design,
        };
        let diag = Diagnostic::error(self.code(), self.to_string(), location);
        match self {
            RepairError::MissingAlternateSource { .. } => diag
                .with_help("assign the net's alternate source pin before running hold repair"),
            _ => diag.with_note("the routed design and the device model disagree"),
        }
    }
}
