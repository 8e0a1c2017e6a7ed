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

//! Telemetry export types produced by [`crate::network::Network::snapshot`]
//! (spec.md §6). Parquet/CSV export itself is out of scope (spec.md §1);
//! these types are plain `serde::Serialize` structs an embedding
//! application can hand to whatever exporter it likes.

use crate::ids::{FlowId, NodeId};
use serde::Serialize;
use std::collections::HashSet;

/// One node's throughput and energy state as of a [`NetworkSnapshot`].
/// Ratio fields are `None` when their denominator (demand, or total port
/// capacity) is approximately zero (spec.md §9's "division by zero ...
/// yields a null optional").
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    /// Milliseconds since the network's clock epoch at snapshot time.
    pub timestamp_ms: u64,
    /// The node this record describes.
    pub node_id: NodeId,
    /// Flows with a nonzero incoming rate on any of this node's ports.
    pub incoming_flows: Vec<FlowId>,
    /// Flows this node is currently forwarding or generating onward.
    pub outgoing_flows: Vec<FlowId>,
    /// Flows whose source is this node.
    pub generating_flows: Vec<FlowId>,
    /// Flows whose destination is this node.
    pub consuming_flows: Vec<FlowId>,
    /// The minimum throughput/demand ratio across this node's generating
    /// and consuming flows.
    pub min_flow_throughput_ratio: Option<f64>,
    /// The maximum such ratio.
    pub max_flow_throughput_ratio: Option<f64>,
    /// The mean such ratio.
    pub avg_flow_throughput_ratio: Option<f64>,
    /// Total outgoing rate across every port, in Mbit/s.
    pub node_throughput_mbps: f64,
    /// Total outgoing rate divided by total port capacity.
    pub node_throughput_ratio: Option<f64>,
    /// This node's current instantaneous power draw.
    pub power_draw_watts: f64,
    /// This node's cumulative energy consumption since the network was
    /// built.
    pub energy_consumed_joule: f64,
}

/// An immutable, network-wide telemetry snapshot (spec.md §4.7, §6).
/// Produced only after [`crate::network::Network::await_stability`], so
/// every field describes a quiescent network unless `converged` is false.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkSnapshot {
    /// Milliseconds since the network's clock epoch at snapshot time.
    pub timestamp_ms: u64,
    /// False if the update loop that produced this snapshot exceeded its
    /// oscillation bound (spec.md §5, §7); the remaining fields still
    /// reflect whatever state the network was left in.
    pub converged: bool,
    /// Cumulative energy across every node, integrated over wall-time by
    /// the network's [`crate::energy::NetworkEnergyRecorder`].
    pub total_energy_joule: f64,
    /// Per-node records, sorted by [`NodeId`].
    pub nodes: Vec<NodeSnapshot>,
}

impl NetworkSnapshot {
    /// The number of distinct flows registered anywhere in the network —
    /// a flow contributes to exactly one node's `generating_flows` and one
    /// node's `consuming_flows`, so this dedups across both sides rather
    /// than summing per-node counts (spec.md §8 scenario S6's
    /// "numOfActiveFlows").
    pub fn active_flow_count(&self) -> usize {
        let mut ids: HashSet<FlowId> = HashSet::new();
        for node in &self.nodes {
            ids.extend(node.generating_flows.iter().copied());
            ids.extend(node.consuming_flows.iter().copied());
        }
        ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_node(id: u64) -> NodeSnapshot {
        NodeSnapshot {
            timestamp_ms: 0,
            node_id: NodeId(id),
            incoming_flows: vec![],
            outgoing_flows: vec![],
            generating_flows: vec![],
            consuming_flows: vec![],
            min_flow_throughput_ratio: None,
            max_flow_throughput_ratio: None,
            avg_flow_throughput_ratio: None,
            node_throughput_mbps: 0.0,
            node_throughput_ratio: None,
            power_draw_watts: 0.0,
            energy_consumed_joule: 0.0,
        }
    }

    #[test]
    fn dedups_a_flow_seen_at_both_its_endpoints() {
        let mut src = empty_node(1);
        src.generating_flows.push(FlowId(1));
        let mut dst = empty_node(2);
        dst.consuming_flows.push(FlowId(1));
        let snapshot = NetworkSnapshot {
            timestamp_ms: 0,
            converged: true,
            total_energy_joule: 0.0,
            nodes: vec![src, dst],
        };
        assert_eq!(snapshot.active_flow_count(), 1);
    }

    #[test]
    fn counts_two_independent_flows() {
        let mut src = empty_node(1);
        src.generating_flows.push(FlowId(1));
        src.generating_flows.push(FlowId(2));
        let snapshot = NetworkSnapshot {
            timestamp_ms: 0,
            converged: true,
            total_energy_joule: 0.0,
            nodes: vec![src],
        };
        assert_eq!(snapshot.active_flow_count(), 2);
    }

    #[test]
    fn serializes_with_null_ratios() {
        let node = empty_node(1);
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"min_flow_throughput_ratio\":null"));
    }
}
