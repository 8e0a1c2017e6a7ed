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

#![deny(missing_docs)]

//! # flowsim: a discrete-event data-center network flow simulator
//!
//! This crate models end-to-end data flows traversing a graph of switches,
//! hosts, and an abstract "internet" node. It computes per-link throughput
//! under configurable fairness policies, propagates updates until the
//! network reaches a quiescent (stable) state, and reports per-node
//! throughput and power consumption snapshots.
//!
//! This is a fluid/rate-based model: there is no packet-level simulation,
//! no congestion-window dynamics, and no network-layer address resolution.
//! All addressing uses opaque node identifiers ([`ids::NodeId`]).
//!
//! ## Structure
//!
//! - **[`units`]**: newtype-wrapped scalars (`DataRate`, `Data`, `Power`,
//!   `Time`) with ε-tolerant approximate equality.
//! - **[`ids`]**: opaque [`ids::NodeId`]/[`ids::FlowId`] identifiers.
//! - **[`port`]**: one side of a full-duplex link — the per-port flow
//!   state machine.
//! - **[`routing`]**: per-node shortest-path next-hop sets
//!   ([`routing::RoutingTable`]).
//! - **[`forwarding`]**: splits one flow's demand across candidate
//!   next-hop ports ([`forwarding::ForwardingPolicy`]).
//! - **[`fairness`]**: reconciles aggregate per-port demand with link
//!   capacity ([`fairness::FairnessPolicy`]).
//! - **[`flow`]**: end-to-end [`flow::NetFlow`] objects and the per-node
//!   [`flow::FlowHandler`] registry.
//! - **[`node`]**: a [`node::Node`]'s identity, ports, routing state and
//!   policies.
//! - **[`stability`]**: the network-wide quiescence gate
//!   ([`stability::NetworkStabilityValidator`]).
//! - **[`energy`]**: pluggable power/energy accounting
//!   ([`energy::EnergyMonitor`], [`energy::NetworkEnergyRecorder`]).
//! - **[`network`]**: the top-level [`network::Network`] — the public
//!   controller surface (`start_flow`, `stop_flow`, `connect`,
//!   `await_stability`, `snapshot`, ...).
//! - **[`topology`]**: JSON topology deserialization and
//!   [`network::Network::from_topology`].
//! - **[`snapshot`]**: telemetry export types produced by
//!   [`network::Network::snapshot`].
//! - **[`error`]**: the crate's `thiserror`-based error taxonomy.

pub mod energy;
pub mod error;
pub mod fairness;
pub mod flow;
pub mod forwarding;
pub mod ids;
pub mod network;
pub mod node;
pub mod port;
pub mod routing;
pub mod snapshot;
pub mod stability;
pub mod topology;
pub mod units;

pub use error::NetworkError;
pub use ids::{FlowId, NodeId, INTERNET_ID};
pub use network::Network;
pub use node::NodeKind;
