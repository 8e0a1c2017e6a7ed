// flowsim: discrete-event data-center network flow simulator
// Copyright (C) 2026  flowsim contributors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Error taxonomy (spec.md §7): one `thiserror` enum per failure domain,
//! composed into [`NetworkError`] so the public API threads a single
//! `Result` type end to end.

use crate::ids::{FlowId, NodeId};
use crate::units::DataRate;
use thiserror::Error;

/// Which side of a port an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The port's `incoming_rate_of` side.
    Incoming,
    /// The port's `outgoing_rate_of` side.
    Outgoing,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Incoming => write!(f, "incoming"),
            Direction::Outgoing => write!(f, "outgoing"),
        }
    }
}

/// Port-level invariant violations (spec.md §4.1). A port never
/// autonomously reconciles overload, so these indicate a fairness policy
/// (or caller) that handed the port more than its residual capacity —
/// an internal bug, not a recoverable condition.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum PortError {
    /// Writing `requested` on `direction` would have exceeded `capacity`.
    #[error("port capacity exceeded: {direction} rate {requested} would exceed capacity {capacity}")]
    CapacityExceeded {
        /// The rate that was requested.
        requested: DataRate,
        /// The port's `max_speed`.
        capacity: DataRate,
        /// Which side of the port was being written.
        direction: Direction,
    },
}

/// Failures of the [`crate::stability::NetworkStabilityValidator`]'s
/// invalidate/validate protocol (spec.md §4.6). Both indicate a caller
/// violating the must-be-stable guard, not a recoverable runtime condition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityError {
    /// `invalidate()` was called while a `check_is_stable_while` block was
    /// in progress.
    #[error("invalidate() called while the network is inside a check_is_stable_while block")]
    IllegalInvalidate,
    /// `validate()` was called with no outstanding invalidation.
    #[error("validate() called with no outstanding invalidation")]
    SpuriousValidate,
    /// `check_is_stable_while` was entered while invalidations were still
    /// outstanding.
    #[error("check_is_stable_while entered while the network is not stable")]
    NotStable,
}

/// The `FlowId` counter reached `u64::MAX` (spec.md §7, §9). Fatal: the
/// caller should stop issuing new flows on this `Network`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("flow id counter exhausted")]
pub struct FlowIdExhausted;

/// Errors surfaced by [`crate::network::Network`] and
/// `NetworkController` operations (spec.md §6, §7).
#[derive(Error, Debug, PartialEq)]
pub enum NetworkError {
    /// A `NodeId` referenced by a flow start/stop/connect call is not
    /// present in the topology.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    /// Spec.md §7's `no_route` taxonomy entry. Currently never
    /// constructed: `Network::start_flow` resolves a routeless
    /// destination per the taxonomy's own recovery column — register the
    /// flow at zero throughput and retry on the next topology change
    /// (scenario S6) — rather than returning this variant. Kept so the
    /// full error taxonomy stays representable in one type.
    #[error("no route from {src} to {dst}")]
    NoRoute {
        /// The flow's source.
        src: NodeId,
        /// The flow's destination.
        dst: NodeId,
    },
    /// Neither port named in a `connect` call has a free slot, and neither
    /// node is the elastic `Internet` node (spec.md §9).
    #[error("no free port on node {0}")]
    NoFreePort(NodeId),
    /// `get_flow`/`stop_flow` referenced a `FlowId` with no active flow.
    #[error("unknown flow: {0}")]
    UnknownFlow(FlowId),
    /// `connect` was asked to pair a port that is already connected.
    #[error("port already connected: {0:?}")]
    PortAlreadyConnected(crate::ids::PortKey),
    /// An internal port-level invariant was violated.
    #[error(transparent)]
    Port(#[from] PortError),
    /// The stability validator's protocol was violated.
    #[error(transparent)]
    Stability(#[from] StabilityError),
    /// The `FlowId` counter was exhausted.
    #[error(transparent)]
    FlowIdExhausted(#[from] FlowIdExhausted),
    /// A node's update loop exceeded its oscillation bound without
    /// reaching quiescence (spec.md §5, §7). The network is left in a
    /// non-converged state; a snapshot taken afterwards is tagged
    /// `converged: false`.
    #[error("node {node} exceeded its convergence bound ({bound} signals) without stabilizing")]
    ConvergenceTimeout {
        /// The node whose processing triggered the bound.
        node: NodeId,
        /// The oscillation bound that was exceeded.
        bound: usize,
    },
}
