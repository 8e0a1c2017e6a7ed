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

//! End-to-end flow objects and the per-node flow registry (spec.md §3).

use crate::ids::{FlowId, NodeId};
use crate::units::DataRate;
use std::collections::{HashMap, HashSet};

/// Observer callback invoked on a demand or throughput change. Receives
/// the flow id and the (old, new) rate pair (spec.md §6). Callbacks run
/// synchronously inside the update loop and must not mutate the network;
/// Rust has no exceptions, so a panicking callback aborts the call that
/// triggered it rather than being swallowed (spec.md §7).
///
/// This crate passes the flow's id rather than a live `&NetFlow`
/// reference: `NetFlow` owns its own handler lists, so handing out a
/// simultaneous reference while iterating them would alias; an id is
/// sufficient to look the flow back up via `Network::get_flow` if a
/// handler needs more than the rate pair.
pub type FlowChangeHandler = Box<dyn FnMut(FlowId, DataRate, DataRate)>;

/// An end-to-end flow: demand is set by its source, throughput by
/// whatever reaches the destination.
pub struct NetFlow {
    id: FlowId,
    transmitter: NodeId,
    destination: NodeId,
    demand: DataRate,
    throughput: DataRate,
    demand_handlers: Vec<FlowChangeHandler>,
    throughput_handlers: Vec<FlowChangeHandler>,
}

impl std::fmt::Debug for NetFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetFlow")
            .field("id", &self.id)
            .field("transmitter", &self.transmitter)
            .field("destination", &self.destination)
            .field("demand", &self.demand)
            .field("throughput", &self.throughput)
            .finish()
    }
}

impl NetFlow {
    pub(crate) fn new(id: FlowId, transmitter: NodeId, destination: NodeId, demand: DataRate) -> Self {
        NetFlow {
            id,
            transmitter,
            destination,
            demand,
            throughput: DataRate::ZERO,
            demand_handlers: Vec::new(),
            throughput_handlers: Vec::new(),
        }
    }

    /// This flow's id.
    pub fn id(&self) -> FlowId {
        self.id
    }

    /// The node this flow originates from.
    pub fn transmitter(&self) -> NodeId {
        self.transmitter
    }

    /// The node this flow is addressed to.
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// The rate the source wishes to send.
    pub fn demand(&self) -> DataRate {
        self.demand
    }

    /// The rate actually delivered to the destination.
    pub fn throughput(&self) -> DataRate {
        self.throughput
    }

    /// Registers an observer for demand changes.
    pub fn on_demand_change(&mut self, handler: FlowChangeHandler) {
        self.demand_handlers.push(handler);
    }

    /// Registers an observer for throughput changes.
    pub fn on_throughput_change(&mut self, handler: FlowChangeHandler) {
        self.throughput_handlers.push(handler);
    }

    /// Sets a new demand, notifying observers if it changed by more than ε.
    pub(crate) fn set_demand(&mut self, demand: DataRate) {
        let old = self.demand;
        if demand.approx_eq(old) {
            return;
        }
        self.demand = demand;
        for handler in &mut self.demand_handlers {
            handler(self.id, old, demand);
        }
    }

    /// Sets a new throughput, notifying observers if it changed by more
    /// than ε.
    pub(crate) fn set_throughput(&mut self, throughput: DataRate) {
        let old = self.throughput;
        if throughput.approx_eq(old) {
            return;
        }
        self.throughput = throughput;
        for handler in &mut self.throughput_handlers {
            handler(self.id, old, throughput);
        }
    }
}

/// A flow's aggregate sending state at this node, as of the last
/// completed update cycle (spec.md §3). This is a read-model cache, not a
/// demand source: a flow whose demand has genuinely dropped to zero (via
/// `stop_flow` or a withdrawn route) already propagates that through
/// `generating`/`transit` with demand zero, so step 2 of the update loop
/// (spec.md §4.5) only needs to consult those two indices. `outgoing` is
/// refreshed at the end of every cycle and exists so per-node telemetry
/// (`NodeSnapshot`'s `outgoing_flows`, spec.md §6) can be read without
/// recomputing it.
#[derive(Debug, Clone, Copy)]
pub struct OutFlow {
    /// The flow's destination (needed to keep forwarding it to zero
    /// without consulting the network's master flow map).
    pub destination: NodeId,
    /// The aggregate rate this node sent for the flow last cycle.
    pub rate: DataRate,
}

/// A node's registry of the flows it participates in, split into four
/// disjoint indices (spec.md §3).
#[derive(Debug, Default)]
pub struct FlowHandler {
    /// Flows whose source is this node.
    pub(crate) generating: HashSet<FlowId>,
    /// Flows whose destination is this node.
    pub(crate) consuming: HashSet<FlowId>,
    /// Read-model cache of what this node is currently sending, per flow
    /// (see [`OutFlow`]); not consulted for demand computation.
    pub(crate) outgoing: HashMap<FlowId, OutFlow>,
    /// Flows arriving at one port and departing on others, mapped to
    /// their destination (denormalized locally so forwarding does not
    /// need to consult the network's master flow map every cycle).
    pub(crate) transit: HashMap<FlowId, NodeId>,
}

impl FlowHandler {
    /// Every flow id this node must compute forwarding demand for this
    /// cycle: `generating ∪ transit` (spec.md §4.5 step 2; see the note
    /// on [`OutFlow`] for why `outgoing` is excluded here).
    pub(crate) fn active_flow_ids(&self) -> HashSet<FlowId> {
        let mut ids: HashSet<FlowId> = self.generating.iter().copied().collect();
        ids.extend(self.transit.keys().copied());
        ids
    }

    /// Removes every trace of `flow` from this node's registry.
    pub(crate) fn purge(&mut self, flow: FlowId) {
        self.generating.remove(&flow);
        self.consuming.remove(&flow);
        self.outgoing.remove(&flow);
        self.transit.remove(&flow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demand_change_notifies_observers() {
        let mut flow = NetFlow::new(FlowId(1), NodeId(1), NodeId(2), DataRate::new(100.0));
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        flow.on_demand_change(Box::new(move |id, old, new| {
            seen2.borrow_mut().push((id, old, new));
        }));
        flow.set_demand(DataRate::new(200.0));
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].1.approx_eq(DataRate::new(100.0)));
        assert!(seen.borrow()[0].2.approx_eq(DataRate::new(200.0)));
    }

    #[test]
    fn unchanged_demand_does_not_notify() {
        let mut flow = NetFlow::new(FlowId(1), NodeId(1), NodeId(2), DataRate::new(100.0));
        let calls = std::rc::Rc::new(std::cell::RefCell::new(0));
        let calls2 = calls.clone();
        flow.on_demand_change(Box::new(move |_, _, _| {
            *calls2.borrow_mut() += 1;
        }));
        flow.set_demand(DataRate::new(100.0));
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn active_flow_ids_unions_generating_and_transit_only() {
        let mut handler = FlowHandler::default();
        handler.generating.insert(FlowId(1));
        handler.transit.insert(FlowId(2), NodeId(9));
        handler.outgoing.insert(FlowId(3), OutFlow { destination: NodeId(9), rate: DataRate::ZERO });
        let ids = handler.active_flow_ids();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&FlowId(3)));
    }
}
