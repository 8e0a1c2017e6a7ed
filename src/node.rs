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

//! A network node (spec.md §3): its ports, routing table, flow registry
//! and the policies governing its update loop. The loop itself lives in
//! [`crate::network::Network`], since one node's recompute needs to write
//! its peers' port state (spec.md §4.5) — this module holds the
//! per-node state the loop reads and writes.

use crate::energy::{EnergyModel, EnergyMonitor};
use crate::fairness::{FairnessPolicy, MaxMinNoForcedReduction};
use crate::flow::FlowHandler;
use crate::forwarding::{ForwardingPolicy, StaticEcmp};
use crate::ids::NodeId;
use crate::port::Port;
use crate::routing::RoutingTable;
use crate::units::DataRate;

/// The role a node plays, governing whether it can source/sink flows and
/// whether its port count is fixed or elastic (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Can both generate and consume flows.
    HostNode,
    /// Transit-only: never a flow's source or destination.
    Switch,
    /// A `Switch` that may additionally connect towards the `Internet`.
    CoreSwitch,
    /// The abstract internet node: unbounded port speed, elastic port
    /// count (spec.md §9). Exactly one per network, at [`crate::ids::INTERNET_ID`].
    Internet,
}

impl NodeKind {
    /// Only `HostNode` and `Internet` may be a flow's source or
    /// destination (a `CoreSwitch`'s connection to the internet carries
    /// traffic that, from this network's point of view, originates or
    /// terminates at the `Internet` node itself).
    pub fn can_source_or_sink_flows(self) -> bool {
        matches!(self, NodeKind::HostNode | NodeKind::Internet)
    }

    /// Only `Internet` grows new ports on demand; every other kind has a
    /// fixed port count set at construction (spec.md §9).
    pub fn has_elastic_ports(self) -> bool {
        matches!(self, NodeKind::Internet)
    }
}

/// The port speed assigned to [`NodeKind::Internet`]'s elastically-grown
/// ports: large enough to never be the bottleneck of any topology this
/// crate can represent, modeling the "unbounded port speed" clause of
/// spec.md §3.
pub const INTERNET_PORT_SPEED: DataRate = DataRate::new_const(1e18);

/// One node in the network: its identity, ports, routing state, flow
/// registry and the policies that drive its update loop.
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    ports: Vec<Port>,
    /// Speed assigned to newly-grown ports (only ever grown for
    /// [`NodeKind::Internet`], see [`NodeKind::has_elastic_ports`]).
    default_port_speed: DataRate,
    routing_table: RoutingTable,
    flow_handler: FlowHandler,
    forwarding_policy: Box<dyn ForwardingPolicy>,
    fairness_policy: Box<dyn FairnessPolicy>,
    energy_monitor: EnergyMonitor,
    /// Whether this node has a pending wake-up on its (size-1, coalescing)
    /// update channel (spec.md §4.5).
    pub(crate) pending: bool,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("ports", &self.ports.len())
            .field("pending", &self.pending)
            .finish()
    }
}

impl Node {
    /// Builds a node with `num_ports` unconnected ports of the given
    /// speed, `StaticEcmp` forwarding and `MaxMinNoForcedReduction`
    /// fairness (the two required policies' natural defaults).
    pub fn new(id: NodeId, kind: NodeKind, port_speed: DataRate, num_ports: usize) -> Self {
        Node {
            id,
            kind,
            ports: (0..num_ports).map(|_| Port::new(port_speed)).collect(),
            default_port_speed: port_speed,
            routing_table: RoutingTable::default(),
            flow_handler: FlowHandler::default(),
            forwarding_policy: Box::new(StaticEcmp),
            fairness_policy: Box::new(MaxMinNoForcedReduction),
            energy_monitor: EnergyMonitor::new(),
            pending: false,
        }
    }

    /// This node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// This node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// This node's ports.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub(crate) fn ports_mut(&mut self) -> &mut [Port] {
        &mut self.ports
    }

    /// This node's routing table.
    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    pub(crate) fn routing_table_mut(&mut self) -> &mut RoutingTable {
        &mut self.routing_table
    }

    /// This node's flow registry.
    pub fn flow_handler(&self) -> &FlowHandler {
        &self.flow_handler
    }

    pub(crate) fn flow_handler_mut(&mut self) -> &mut FlowHandler {
        &mut self.flow_handler
    }

    /// This node's energy monitor.
    pub fn energy_monitor(&self) -> &EnergyMonitor {
        &self.energy_monitor
    }

    pub(crate) fn energy_monitor_mut(&mut self) -> &mut EnergyMonitor {
        &mut self.energy_monitor
    }

    /// Replaces this node's forwarding policy.
    pub fn set_forwarding_policy(&mut self, policy: Box<dyn ForwardingPolicy>) {
        self.forwarding_policy = policy;
    }

    /// Replaces this node's fairness policy.
    pub fn set_fairness_policy(&mut self, policy: Box<dyn FairnessPolicy>) {
        self.fairness_policy = policy;
    }

    /// Replaces this node's energy model (spec.md §4.8). Nodes default to
    /// [`crate::energy::ZeroPowerModel`]; this is the only way to plug in
    /// a different one, mirroring [`Node::set_fairness_policy`] and
    /// [`Node::set_forwarding_policy`].
    pub fn set_energy_model(&mut self, model: Box<dyn EnergyModel>) {
        self.energy_monitor = EnergyMonitor::with_model(model);
    }

    pub(crate) fn forwarding_policy(&self) -> &dyn ForwardingPolicy {
        self.forwarding_policy.as_ref()
    }

    pub(crate) fn fairness_policy(&self) -> &dyn FairnessPolicy {
        self.fairness_policy.as_ref()
    }

    /// Borrows the fairness policy and one port's persisted fairness state
    /// simultaneously. Both borrows come from disjoint fields of `self`
    /// (the `Box<dyn FairnessPolicy>` field and one element of `ports`), so
    /// the borrow checker allows them side by side even though the method
    /// signature takes `&mut self`.
    pub(crate) fn fairness_policy_and_port_state(
        &mut self,
        idx: usize,
    ) -> (&dyn FairnessPolicy, &mut crate::fairness::FairnessState) {
        (self.fairness_policy.as_ref(), &mut self.ports[idx].fairness_state)
    }

    /// The index of an unconnected port, if any.
    pub(crate) fn free_port_index(&self) -> Option<usize> {
        self.ports.iter().position(|p| !p.is_connected())
    }

    /// Appends a new unconnected port at this node's default speed, used
    /// only by [`NodeKind::Internet`] (spec.md §9).
    pub(crate) fn grow_port(&mut self) -> usize {
        self.ports.push(Port::new(self.default_port_speed));
        self.ports.len() - 1
    }

    /// Σ outgoing rate across every port, used by the energy model input
    /// and by snapshotting.
    pub fn total_outgoing_rate(&self) -> DataRate {
        self.ports.iter().map(Port::total_outgoing).sum()
    }

    /// Σ incoming rate across every port.
    pub fn total_incoming_rate(&self) -> DataRate {
        self.ports.iter().map(Port::total_incoming).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_and_internet_can_source_or_sink() {
        assert!(NodeKind::HostNode.can_source_or_sink_flows());
        assert!(NodeKind::Internet.can_source_or_sink_flows());
        assert!(!NodeKind::Switch.can_source_or_sink_flows());
        assert!(!NodeKind::CoreSwitch.can_source_or_sink_flows());
    }

    #[test]
    fn only_internet_has_elastic_ports() {
        assert!(NodeKind::Internet.has_elastic_ports());
        assert!(!NodeKind::HostNode.has_elastic_ports());
    }

    #[test]
    fn free_port_index_finds_an_unconnected_port() {
        let node = Node::new(NodeId(1), NodeKind::Switch, DataRate::new(1000.0), 2);
        assert_eq!(node.free_port_index(), Some(0));
    }

    #[test]
    fn grow_port_only_used_by_internet_in_practice() {
        let mut node = Node::new(crate::ids::INTERNET_ID, NodeKind::Internet, DataRate::new(1e12), 0);
        assert_eq!(node.ports().len(), 0);
        let idx = node.grow_port();
        assert_eq!(idx, 0);
        assert_eq!(node.ports().len(), 1);
    }
}
