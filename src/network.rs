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

//! The top-level network: owns every node and flow, drives the update
//! loop to quiescence, and exposes the controller API (spec.md §4.7, §6).

use crate::energy::NetworkEnergyRecorder;
use crate::error::NetworkError;
use crate::flow::{FlowChangeHandler, NetFlow, OutFlow};
use crate::ids::{FlowId, FlowIdAllocator, NodeId, PortIndex, PortKey, INTERNET_ID};
use crate::node::{Node, NodeKind, INTERNET_PORT_SPEED};
use crate::routing::RoutingTable;
use crate::snapshot::{NetworkSnapshot, NodeSnapshot};
use crate::stability::NetworkStabilityValidator;
use crate::units::{safe_ratio, DataRate, Power, Time};

use log::{debug, trace, warn};
use petgraph::algo::dijkstra;
use petgraph::graphmap::UnGraphMap;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Multiplier applied to the network's diameter to derive the default
/// oscillation bound (spec.md §5: "signal count per flow exceeding a
/// configurable bound, default 10·H").
const DEFAULT_OSCILLATION_MULTIPLIER: usize = 10;

fn default_clock() -> Box<dyn Fn() -> u64 + Send + Sync> {
    let counter = AtomicU64::new(0);
    Box::new(move || counter.fetch_add(1, Ordering::Relaxed))
}

/// Owns every node and active flow, the stability validator, and the
/// network-wide energy recorder. The public surface here is the
/// "NetworkController" named in spec.md §6 — there is no separate type,
/// since every controller operation needs direct access to node and flow
/// state anyway.
pub struct Network {
    nodes: HashMap<NodeId, Node>,
    next_node_id: u64,
    flows: HashMap<FlowId, NetFlow>,
    flow_ids: FlowIdAllocator,
    pending: VecDeque<NodeId>,
    validator: Arc<NetworkStabilityValidator>,
    energy_recorder: NetworkEnergyRecorder,
    clock: Box<dyn Fn() -> u64 + Send + Sync>,
    oscillation_multiplier: usize,
    /// Whether the most recent [`Network::drain_pending`] ran to
    /// completion without exceeding the oscillation bound. Tracked
    /// separately from `pending.is_empty()` because a timed-out drain
    /// abandons its remaining work-list entries (see `drain_pending`),
    /// which empties `pending` without the network having converged.
    converged: bool,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("nodes", &self.nodes.len())
            .field("flows", &self.flows.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Builds an empty network with a monotonic in-process clock.
    pub fn new() -> Self {
        Network {
            nodes: HashMap::new(),
            next_node_id: 1,
            flows: HashMap::new(),
            flow_ids: FlowIdAllocator::default(),
            pending: VecDeque::new(),
            validator: Arc::new(NetworkStabilityValidator::new()),
            energy_recorder: NetworkEnergyRecorder::new(),
            clock: default_clock(),
            oscillation_multiplier: DEFAULT_OSCILLATION_MULTIPLIER,
            converged: true,
        }
    }

    /// Replaces the wall-time source used for [`NodeSnapshot::timestamp_ms`]
    /// and energy integration. Defaults to a monotonic in-process counter
    /// so identical test runs produce byte-identical snapshot sequences
    /// (spec.md §8 Testable Property 5) without depending on `std::time`.
    pub fn set_instant_source(&mut self, clock: Box<dyn Fn() -> u64 + Send + Sync>) {
        self.clock = clock;
    }

    fn now(&self) -> Time {
        Time::from_millis((self.clock)())
    }

    /// Adds a node with a fresh, never-before-used id.
    pub fn add_node(&mut self, kind: NodeKind, port_speed: DataRate, num_ports: usize) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.add_node_with_id(id, kind, port_speed, num_ports)
    }

    /// Adds a node at an explicit id, used by [`crate::topology::TopologySpec`]
    /// deserialization to honor ids named in the input. Bumps the
    /// auto-assignment counter past `id` so a later [`Network::add_node`]
    /// call never collides with it.
    pub(crate) fn add_node_with_id(
        &mut self,
        id: NodeId,
        kind: NodeKind,
        port_speed: DataRate,
        num_ports: usize,
    ) -> NodeId {
        self.nodes.insert(id, Node::new(id, kind, port_speed, num_ports));
        if id != crate::ids::INTERNET_ID && id.0 >= self.next_node_id {
            self.next_node_id = id.0 + 1;
        }
        trace!("added node {} ({:?}, {} ports)", id, kind, num_ports);
        id
    }

    fn require_node(&self, id: NodeId) -> Result<&Node, NetworkError> {
        self.nodes.get(&id).ok_or(NetworkError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, NetworkError> {
        self.nodes.get_mut(&id).ok_or(NetworkError::UnknownNode(id))
    }

    /// Reserves a free port on `id`, growing a new one if the node has
    /// elastic ports (spec.md §9's Internet-node resolution).
    fn reserve_port(&mut self, id: NodeId) -> Result<PortIndex, NetworkError> {
        let node = self.node_mut(id)?;
        if let Some(idx) = node.free_port_index() {
            return Ok(idx);
        }
        if node.kind().has_elastic_ports() {
            return Ok(node.grow_port());
        }
        Err(NetworkError::NoFreePort(id))
    }

    /// Lazily creates the abstract Internet node the first time it is
    /// needed (e.g. by [`Network::from_internet`] or a topology with an
    /// explicit `internet` reference).
    fn ensure_internet_node(&mut self) {
        self.nodes
            .entry(INTERNET_ID)
            .or_insert_with(|| Node::new(INTERNET_ID, NodeKind::Internet, INTERNET_PORT_SPEED, 0));
    }

    /// Pairs a free port on each node, bidirectionally, and re-advertises
    /// routes from both sides (spec.md §4.7).
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<(PortKey, PortKey), NetworkError> {
        if a == INTERNET_ID {
            self.ensure_internet_node();
        }
        if b == INTERNET_ID {
            self.ensure_internet_node();
        }
        let idx_a = self.reserve_port(a)?;
        let idx_b = self.reserve_port(b)?;
        let key_a: PortKey = (a, idx_a);
        let key_b: PortKey = (b, idx_b);
        if self.require_node(a)?.ports()[idx_a].is_connected() {
            return Err(NetworkError::PortAlreadyConnected(key_a));
        }
        if self.require_node(b)?.ports()[idx_b].is_connected() {
            return Err(NetworkError::PortAlreadyConnected(key_b));
        }
        self.node_mut(a)?.ports_mut()[idx_a].set_other_end(Some(key_b));
        self.node_mut(b)?.ports_mut()[idx_b].set_other_end(Some(key_a));
        debug!("connected {:?} <-> {:?}", key_a, key_b);
        self.recompute_routing();
        self.signal(a)?;
        self.signal(b)?;
        self.drain_pending()?;
        Ok((key_a, key_b))
    }

    /// Symmetric inverse of [`Network::connect`]: tears down both sides of
    /// the link named by `port` and re-advertises routes.
    pub fn disconnect(&mut self, port: PortKey) -> Result<(), NetworkError> {
        let (node_id, idx) = port;
        let peer = self
            .require_node(node_id)?
            .ports()
            .get(idx)
            .ok_or(NetworkError::UnknownNode(node_id))?
            .other_end();
        self.node_mut(node_id)?.ports_mut()[idx].disconnect();
        if let Some((peer_id, peer_idx)) = peer {
            self.node_mut(peer_id)?.ports_mut()[peer_idx].disconnect();
        }
        debug!("disconnected {:?}", port);
        self.recompute_routing();
        self.signal(node_id)?;
        if let Some((peer_id, _)) = peer {
            self.signal(peer_id)?;
        }
        self.drain_pending()
    }

    /// Rebuilds every node's routing table from scratch via one BFS per
    /// destination over the current port graph. This is a bulk recompute
    /// rather than incremental advertisement propagation — see
    /// `crate::routing` and `DESIGN.md` for why.
    fn recompute_routing(&mut self) {
        let graph = self.build_graph();
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        let mut new_tables: HashMap<NodeId, RoutingTable> =
            ids.iter().map(|&id| (id, RoutingTable::default())).collect();

        for &dest in &ids {
            let distances: HashMap<NodeId, u32> = dijkstra(&graph, dest, None, |_| 1u32);
            for &node_id in &ids {
                if node_id == dest {
                    continue;
                }
                let node_dist = match distances.get(&node_id) {
                    Some(&d) => d,
                    None => continue,
                };
                let node = &self.nodes[&node_id];
                for (idx, port) in node.ports().iter().enumerate() {
                    if let Some((peer_id, _)) = port.other_end() {
                        if let Some(&peer_dist) = distances.get(&peer_id) {
                            if peer_dist + 1 == node_dist {
                                new_tables
                                    .get_mut(&node_id)
                                    .unwrap()
                                    .advertise(dest, node_dist, (node_id, idx));
                            }
                        }
                    }
                }
            }
        }

        for (id, table) in new_tables {
            self.nodes.get_mut(&id).unwrap().routing_table_mut().replace(table);
        }
        trace!("routing recomputed across {} nodes", ids.len());
    }

    /// Builds the undirected port-connectivity graph used by route
    /// computation: one node per [`NodeId`], one edge per connected port
    /// pair (spec.md §4.2's "shortest-path" routing is computed over this
    /// graph via `petgraph::algo::dijkstra` with unit edge weights, which
    /// is equivalent to a breadth-first search since every link costs 1).
    fn build_graph(&self) -> UnGraphMap<NodeId, ()> {
        let mut graph = UnGraphMap::with_capacity(self.nodes.len(), 0);
        for &id in self.nodes.keys() {
            graph.add_node(id);
        }
        for (&id, node) in &self.nodes {
            for port in node.ports() {
                if let Some((peer_id, _)) = port.other_end() {
                    graph.add_edge(id, peer_id, ());
                }
            }
        }
        graph
    }

    /// The network's diameter (max finite hop distance between any pair of
    /// connected nodes), used to scale the default oscillation bound.
    fn diameter(&self) -> u32 {
        let graph = self.build_graph();
        self.nodes
            .keys()
            .flat_map(|&id| dijkstra(&graph, id, None, |_| 1u32).into_values())
            .max()
            .unwrap_or(0)
    }

    fn oscillation_bound(&self) -> usize {
        self.oscillation_multiplier * (self.diameter().max(1) as usize) * self.nodes.len().max(1)
    }

    /// Enqueues `id` for an update cycle unless it is already pending
    /// (the size-1 coalescing channel of spec.md §4.5).
    fn signal(&mut self, id: NodeId) -> Result<(), NetworkError> {
        if let Some(node) = self.nodes.get_mut(&id) {
            if !node.pending {
                node.pending = true;
                self.validator.invalidate()?;
                self.pending.push_back(id);
            }
        }
        Ok(())
    }

    /// Drains the pending work-list until every node has quiesced. This is
    /// the synchronous stand-in for spec.md §5's cooperative-task
    /// scheduler: the same call path that produced a signal drains it
    /// before returning control to the caller.
    ///
    /// If the oscillation bound is exceeded, the remaining queued node ids
    /// are abandoned rather than run — but every one of them (the
    /// offending id included) already went through `signal()` ->
    /// `validator.invalidate()`, so leaving them queued would leave their
    /// `pending` flags set and the validator's invalidation counter
    /// permanently above zero, wedging `await_stability`/`snapshot`
    /// forever. Instead, every abandoned id's `pending` flag is cleared
    /// and the validator is reset, so the network stays usable and can
    /// report `converged: false` (spec.md §7's `convergence_timeout`
    /// recovery).
    fn drain_pending(&mut self) -> Result<(), NetworkError> {
        let bound = self.oscillation_bound();
        let mut dispatched = 0usize;
        while let Some(id) = self.pending.pop_front() {
            dispatched += 1;
            if dispatched > bound {
                let abandoned = self.pending.len() + 1;
                warn!(
                    "node {} exceeded its oscillation bound of {}; abandoning {} queued node(s) and resetting the stability validator",
                    id, bound, abandoned
                );
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.pending = false;
                }
                while let Some(remaining_id) = self.pending.pop_front() {
                    if let Some(node) = self.nodes.get_mut(&remaining_id) {
                        node.pending = false;
                    }
                }
                self.validator.reset();
                self.converged = false;
                return Err(NetworkError::ConvergenceTimeout { node: id, bound });
            }
            self.run_node_cycle(id)?;
        }
        self.converged = true;
        Ok(())
    }

    fn node_flow_demand(node: &Node, flow_id: FlowId, flows: &HashMap<FlowId, NetFlow>) -> DataRate {
        if node.flow_handler().generating.contains(&flow_id) {
            flows.get(&flow_id).map(NetFlow::demand).unwrap_or(DataRate::ZERO)
        } else {
            node.ports().iter().map(|p| p.incoming_rate(flow_id)).sum()
        }
    }

    /// Step 2 of the update loop (spec.md §4.5): for every flow this node
    /// forwards, split its demand across next-hop ports. Returns one
    /// demand map per port index, containing only flows with a nonzero
    /// contribution — so a flow that stops routing through a port here
    /// drops out of that port's contending set entirely, which matters for
    /// `MaxMinNoForcedReduction`'s "contending set changed" check.
    ///
    /// The third element lists transit flow ids whose computed demand came
    /// back zero: a transiting flow's demand is the rate still arriving
    /// from upstream (`node_flow_demand`'s non-generating branch), so zero
    /// here means upstream has rerouted the flow off this node entirely
    /// (as opposed to `stop_flow`/`disconnect`, which purge `transit`
    /// explicitly). The caller prunes these so `FlowHandler::transit` does
    /// not accumulate permanent stale entries.
    fn collect_port_demand(
        &self,
        id: NodeId,
    ) -> Result<(Vec<HashMap<FlowId, DataRate>>, HashMap<FlowId, NodeId>, Vec<FlowId>), NetworkError> {
        let node = self.require_node(id)?;
        let mut port_demand = vec![HashMap::new(); node.ports().len()];
        let mut destinations = HashMap::new();
        let mut stale_transit = Vec::new();

        let mut flow_ids: Vec<FlowId> = node.flow_handler().active_flow_ids().into_iter().collect();
        flow_ids.sort();

        for flow_id in flow_ids {
            let is_generating = node.flow_handler().generating.contains(&flow_id);
            let destination = if is_generating {
                match self.flows.get(&flow_id) {
                    Some(flow) => flow.destination(),
                    None => continue,
                }
            } else {
                match node.flow_handler().transit.get(&flow_id) {
                    Some(&d) => d,
                    None => continue,
                }
            };
            destinations.insert(flow_id, destination);

            let demand = Self::node_flow_demand(node, flow_id, &self.flows);
            if demand.is_zero() && !is_generating {
                stale_transit.push(flow_id);
            }
            let mut hops: Vec<PortKey> = node
                .routing_table()
                .next_hops(destination)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .collect();
            hops.sort_by_key(|&(_, idx)| node.ports()[idx].other_end().map(|(peer, _)| peer));

            for (port_key, rate) in node.forwarding_policy().split(demand, &hops) {
                if !rate.is_zero() {
                    port_demand[port_key.1].insert(flow_id, rate);
                }
            }
        }

        Ok((port_demand, destinations, stale_transit))
    }

    /// Runs one full update cycle for `id`: steps 2–6 of spec.md §4.5.
    fn run_node_cycle(&mut self, id: NodeId) -> Result<(), NetworkError> {
        self.node_mut(id)?.pending = false;

        let (port_demand, destinations, stale_transit) = self.collect_port_demand(id)?;
        if !stale_transit.is_empty() {
            let node = self.node_mut(id)?;
            for flow_id in stale_transit {
                node.flow_handler_mut().transit.remove(&flow_id);
            }
        }
        let mut peer_writes: Vec<(PortKey, FlowId, DataRate, NodeId)> = Vec::new();
        let mut local_outgoing_totals: HashMap<FlowId, DataRate> = HashMap::new();

        {
            let node = self.node_mut(id)?;
            let num_ports = node.ports().len();
            for idx in 0..num_ports {
                let demand_for_port = port_demand.get(idx).cloned().unwrap_or_default();
                let capacity = node.ports()[idx].max_speed();
                let (policy, state) = node.fairness_policy_and_port_state(idx);
                let allocation = policy.allocate(&demand_for_port, capacity, state);

                let mut touched: Vec<FlowId> = allocation.keys().copied().collect();
                touched.extend(node.ports()[idx].outgoing_flow_ids());
                touched.sort();
                touched.dedup();

                for flow_id in touched {
                    let rate = allocation.get(&flow_id).copied().unwrap_or(DataRate::ZERO);
                    if node.ports_mut()[idx].set_outgoing_rate(flow_id, rate)?.is_some() {
                        if let Some(peer_key) = node.ports()[idx].other_end() {
                            let destination = destinations
                                .get(&flow_id)
                                .copied()
                                .or_else(|| self.flows.get(&flow_id).map(NetFlow::destination))
                                .unwrap_or(id);
                            peer_writes.push((peer_key, flow_id, rate, destination));
                        }
                    }
                    let entry = local_outgoing_totals.entry(flow_id).or_insert(DataRate::ZERO);
                    *entry = *entry + rate;
                }
            }
        }

        for (peer_key, flow_id, rate, destination) in peer_writes {
            let (peer_id, peer_idx) = peer_key;
            if let Some(peer_node) = self.nodes.get_mut(&peer_id) {
                peer_node.ports_mut()[peer_idx].set_incoming_rate(flow_id, rate);
                let already_known = peer_node.flow_handler().generating.contains(&flow_id)
                    || peer_node.flow_handler().consuming.contains(&flow_id)
                    || peer_node.flow_handler().transit.contains_key(&flow_id);
                if !already_known && !rate.is_zero() && peer_id != destination {
                    peer_node.flow_handler_mut().transit.insert(flow_id, destination);
                }
            }
            self.signal(peer_id)?;
        }

        self.refresh_outgoing_cache(id, &local_outgoing_totals, &destinations)?;
        self.update_consuming_throughput(id)?;
        self.update_energy(id)?;

        self.validator.validate()?;
        Ok(())
    }

    fn refresh_outgoing_cache(
        &mut self,
        id: NodeId,
        totals: &HashMap<FlowId, DataRate>,
        destinations: &HashMap<FlowId, NodeId>,
    ) -> Result<(), NetworkError> {
        let node = self.node_mut(id)?;
        for (&flow_id, &rate) in totals {
            if rate.is_zero() {
                node.flow_handler_mut().outgoing.remove(&flow_id);
                continue;
            }
            if let Some(&destination) = destinations.get(&flow_id) {
                node.flow_handler_mut().outgoing.insert(flow_id, OutFlow { destination, rate });
            }
        }
        Ok(())
    }

    /// Step 5 of the update loop: a destination's delivered throughput is
    /// the sum of incoming rates across every port carrying the flow (a
    /// single ECMP-split flow may arrive on more than one port; each piece
    /// already reflects its path's bottleneck, so summing them is the
    /// total delivered rate).
    fn update_consuming_throughput(&mut self, id: NodeId) -> Result<(), NetworkError> {
        let throughputs: Vec<(FlowId, DataRate)> = {
            let node = self.require_node(id)?;
            node.flow_handler()
                .consuming
                .iter()
                .map(|&flow_id| {
                    let total = node.ports().iter().map(|p| p.incoming_rate(flow_id)).sum();
                    (flow_id, total)
                })
                .collect()
        };
        for (flow_id, throughput) in throughputs {
            if let Some(flow) = self.flows.get_mut(&flow_id) {
                flow.set_throughput(throughput);
            }
        }
        Ok(())
    }

    /// Step 6: notifies this node's energy monitor and advances the
    /// network-wide energy recorder from the updated power totals.
    fn update_energy(&mut self, id: NodeId) -> Result<(), NetworkError> {
        let now = self.now();
        let total_bps = self.require_node(id)?.total_outgoing_rate().value();
        self.node_mut(id)?.energy_monitor_mut().notify(now, total_bps);

        let total_power: Power = self.nodes.values().map(|n| n.energy_monitor().current_power()).sum();
        self.energy_recorder.advance(now, total_power);
        Ok(())
    }

    /// Registers a new end-to-end flow and injects it at `src` (spec.md
    /// §4.7). Unlike the distilled spec's literal wording, a destination
    /// with no current route does **not** fail the call: per §7's
    /// recovery column and scenario S6, the flow is registered with
    /// throughput 0 and re-tried automatically on the next topology
    /// change (see `DESIGN.md`).
    pub fn start_flow(
        &mut self,
        src: NodeId,
        dst: NodeId,
        demand: DataRate,
        on_throughput_change: Option<FlowChangeHandler>,
    ) -> Result<FlowId, NetworkError> {
        if !self.nodes.contains_key(&src) {
            return Err(NetworkError::UnknownNode(src));
        }
        if !self.nodes.contains_key(&dst) {
            return Err(NetworkError::UnknownNode(dst));
        }

        let flow_id = self.flow_ids.alloc()?;
        let mut flow = NetFlow::new(flow_id, src, dst, demand);
        if let Some(handler) = on_throughput_change {
            flow.on_throughput_change(handler);
        }
        self.flows.insert(flow_id, flow);
        self.nodes.get_mut(&src).unwrap().flow_handler_mut().generating.insert(flow_id);
        self.nodes.get_mut(&dst).unwrap().flow_handler_mut().consuming.insert(flow_id);

        if self.nodes[&src].routing_table().no_route(dst) {
            warn!("flow {} has no route from {} to {} at injection", flow_id, src, dst);
        }
        debug!("flow {} started: {} -> {} @ {}", flow_id, src, dst, demand);

        self.signal(src)?;
        self.drain_pending()?;
        Ok(flow_id)
    }

    /// Convenience wrapper around [`Network::start_flow`] modeling traffic
    /// originating outside the network: lazily creates the Internet node
    /// and sources the flow from it (spec.md §6, §9).
    pub fn from_internet(
        &mut self,
        dst: NodeId,
        demand: DataRate,
        on_throughput_change: Option<FlowChangeHandler>,
    ) -> Result<FlowId, NetworkError> {
        self.ensure_internet_node();
        self.start_flow(INTERNET_ID, dst, demand, on_throughput_change)
    }

    /// Removes a flow from every node's registry, zeroes its demand, and
    /// signals every node that held a reference to it so throughput
    /// converges to 0 along the whole path (spec.md §4.7).
    pub fn stop_flow(&mut self, id: FlowId) -> Result<(), NetworkError> {
        let flow = self.flows.get_mut(&id).ok_or(NetworkError::UnknownFlow(id))?;
        flow.set_demand(DataRate::ZERO);

        let mut touched = Vec::new();
        for (&node_id, node) in self.nodes.iter_mut() {
            let handler = node.flow_handler();
            let had = handler.generating.contains(&id)
                || handler.consuming.contains(&id)
                || handler.transit.contains_key(&id)
                || handler.outgoing.contains_key(&id);
            if had {
                node.flow_handler_mut().purge(id);
                touched.push(node_id);
            }
        }
        self.flows.remove(&id);

        debug!("flow {} stopped", id);
        for node_id in touched {
            self.signal(node_id)?;
        }
        self.drain_pending()
    }

    /// Looks up an active flow by id.
    pub fn get_flow(&self, id: FlowId) -> Option<&NetFlow> {
        self.flows.get(&id)
    }

    /// Blocks (synchronously; this crate has no blocking I/O, so this
    /// returns immediately once the pending work-list is empty) until
    /// every node's update loop has quiesced.
    pub fn await_stability(&self) {
        self.validator.await_stability();
    }

    /// Produces an immutable snapshot of every node's throughput and
    /// energy state (spec.md §4.7, §6). Waits for stability first, then
    /// runs inside a `check_is_stable_while` region so no concurrent
    /// `invalidate()` can race the read.
    pub fn snapshot(&mut self) -> Result<NetworkSnapshot, NetworkError> {
        self.await_stability();
        let validator = Arc::clone(&self.validator);
        Ok(validator.check_is_stable_while(|| self.build_snapshot())?)
    }

    fn build_snapshot(&self) -> NetworkSnapshot {
        let timestamp_ms = (self.clock)();
        let mut nodes: Vec<NodeSnapshot> = self
            .nodes
            .keys()
            .map(|&id| self.build_node_snapshot(id, timestamp_ms))
            .collect();
        nodes.sort_by_key(|n| n.node_id);
        NetworkSnapshot {
            timestamp_ms,
            converged: self.converged,
            total_energy_joule: self.energy_recorder.total_energy().value(),
            nodes,
        }
    }

    fn build_node_snapshot(&self, id: NodeId, timestamp_ms: u64) -> NodeSnapshot {
        let node = &self.nodes[&id];
        let handler = node.flow_handler();

        let mut incoming_flows: Vec<FlowId> = node
            .ports()
            .iter()
            .flat_map(|p| p.incoming_flow_ids())
            .collect();
        incoming_flows.sort();
        incoming_flows.dedup();

        let mut outgoing_flows: Vec<FlowId> = handler.outgoing.keys().copied().collect();
        outgoing_flows.sort();

        let mut generating_flows: Vec<FlowId> = handler.generating.iter().copied().collect();
        generating_flows.sort();

        let mut consuming_flows: Vec<FlowId> = handler.consuming.iter().copied().collect();
        consuming_flows.sort();

        let ratios: Vec<f64> = generating_flows
            .iter()
            .chain(consuming_flows.iter())
            .filter_map(|flow_id| self.flows.get(flow_id))
            .filter_map(|flow| safe_ratio(flow.throughput(), flow.demand()))
            .collect();
        let min_flow_throughput_ratio = ratios.iter().cloned().fold(None, min_option);
        let max_flow_throughput_ratio = ratios.iter().cloned().fold(None, max_option);
        let avg_flow_throughput_ratio = if ratios.is_empty() {
            None
        } else {
            Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
        };

        let node_throughput = node.total_outgoing_rate();
        let node_throughput_mbps = node_throughput.value() / 1_000_000.0;
        let node_capacity: DataRate = node.ports().iter().map(|p| p.max_speed()).sum();
        let node_throughput_ratio = safe_ratio(node_throughput, node_capacity);

        NodeSnapshot {
            timestamp_ms,
            node_id: id,
            incoming_flows,
            outgoing_flows,
            generating_flows,
            consuming_flows,
            min_flow_throughput_ratio,
            max_flow_throughput_ratio,
            avg_flow_throughput_ratio,
            node_throughput_mbps,
            node_throughput_ratio,
            power_draw_watts: node.energy_monitor().current_power().value(),
            energy_consumed_joule: node.energy_monitor().total_energy().value(),
        }
    }

    /// Direct node accessor, exposed read-only for callers inspecting
    /// topology state outside a snapshot (e.g. tests).
    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(Node::kind)
    }

    /// Borrows a node's full state directly, for callers inspecting
    /// per-port rates outside a snapshot (e.g. the conservation and
    /// peer-consistency property tests of spec.md §8).
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Every node id currently in the network.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Replaces a node's fairness policy (spec.md §4.4's two required
    /// variants are swappable per node; e.g. scenario S4 configures
    /// [`crate::fairness::FirstComeFirstServed`] on one switch).
    pub fn set_fairness_policy(
        &mut self,
        id: NodeId,
        policy: Box<dyn crate::fairness::FairnessPolicy>,
    ) -> Result<(), NetworkError> {
        self.node_mut(id)?.set_fairness_policy(policy);
        Ok(())
    }

    /// Replaces a node's forwarding policy.
    pub fn set_forwarding_policy(
        &mut self,
        id: NodeId,
        policy: Box<dyn crate::forwarding::ForwardingPolicy>,
    ) -> Result<(), NetworkError> {
        self.node_mut(id)?.set_forwarding_policy(policy);
        Ok(())
    }

    /// Replaces a node's energy model (spec.md §4.8); nodes default to
    /// [`crate::energy::ZeroPowerModel`].
    pub fn set_energy_model(
        &mut self,
        id: NodeId,
        model: Box<dyn crate::energy::EnergyModel>,
    ) -> Result<(), NetworkError> {
        self.node_mut(id)?.set_energy_model(model);
        Ok(())
    }
}

fn min_option(acc: Option<f64>, x: f64) -> Option<f64> {
    Some(acc.map_or(x, |a| a.min(x)))
}

fn max_option(acc: Option<f64>, x: f64) -> Option<f64> {
    Some(acc.map_or(x, |a| a.max(x)))
}
