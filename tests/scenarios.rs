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

//! End-to-end scenarios S1–S6 from spec.md §8, plus a handful of the
//! network-wide testable properties (conservation, peer consistency,
//! idempotence, determinism) exercised through the public `Network` API.

use assert_approx_eq::assert_approx_eq;
use flowsim::energy::EnergyModel;
use flowsim::fairness::FirstComeFirstServed;
use flowsim::node::NodeKind;
use flowsim::units::{DataRate, Power, EPSILON};
use flowsim::Network;

fn host(net: &mut Network, speed_kbps: f64, ports: usize) -> flowsim::NodeId {
    net.add_node(NodeKind::HostNode, DataRate::new(speed_kbps), ports)
}

fn switch(net: &mut Network, speed_kbps: f64, ports: usize) -> flowsim::NodeId {
    net.add_node(NodeKind::Switch, DataRate::new(speed_kbps), ports)
}

/// A minimal non-zero `EnergyModel`: a fixed idle draw plus a per-bps
/// term, used to exercise `Network::set_energy_model`'s pluggability.
#[derive(Debug)]
struct LinearPowerModel;

impl EnergyModel for LinearPowerModel {
    fn power_draw(&self, total_outgoing_bits_per_sec: f64) -> Power {
        Power::new(10.0 + total_outgoing_bits_per_sec / 1000.0)
    }
}

#[test]
fn s1_single_switch_two_hosts() {
    let mut net = Network::new();
    let h1 = host(&mut net, 1000.0, 1);
    let s = switch(&mut net, 1000.0, 2);
    let h2 = host(&mut net, 1000.0, 1);
    net.connect(h1, s).unwrap();
    net.connect(s, h2).unwrap();
    net.set_energy_model(s, Box::new(LinearPowerModel)).unwrap();

    let flow_id = net.start_flow(h1, h2, DataRate::new(500.0), None).unwrap();
    net.await_stability();

    let flow = net.get_flow(flow_id).unwrap();
    assert_approx_eq!(flow.throughput().value(), 500.0);

    let snapshot = net.snapshot().unwrap();
    let s_snapshot = snapshot.nodes.iter().find(|n| n.node_id == s).unwrap();
    assert!(s_snapshot.node_throughput_mbps > 0.0);
    assert!(s_snapshot.power_draw_watts > 0.0);
}

#[test]
fn s2_ecmp_split_carries_400_on_each_leg() {
    let mut net = Network::new();
    let h1 = host(&mut net, 1000.0, 1);
    let s1 = switch(&mut net, 1000.0, 3);
    let s2a = switch(&mut net, 1000.0, 2);
    let s2b = switch(&mut net, 1000.0, 2);
    let s3 = switch(&mut net, 1000.0, 3);
    let h2 = host(&mut net, 1000.0, 1);
    net.connect(h1, s1).unwrap();
    net.connect(s1, s2a).unwrap();
    net.connect(s1, s2b).unwrap();
    net.connect(s2a, s3).unwrap();
    net.connect(s2b, s3).unwrap();
    net.connect(s3, h2).unwrap();

    let flow_id = net.start_flow(h1, h2, DataRate::new(800.0), None).unwrap();
    net.await_stability();

    assert_approx_eq!(net.node(s2a).unwrap().total_outgoing_rate().value(), 400.0);
    assert_approx_eq!(net.node(s2b).unwrap().total_outgoing_rate().value(), 400.0);
    assert_approx_eq!(net.get_flow(flow_id).unwrap().throughput().value(), 800.0);
}

#[test]
fn s3_oversubscribed_maxmin_splits_evenly() {
    let mut net = Network::new();
    let h1 = host(&mut net, 1000.0, 1);
    let h2 = host(&mut net, 1000.0, 1);
    let h3 = host(&mut net, 1000.0, 1);
    let s = switch(&mut net, 1000.0, 3);
    net.connect(h1, s).unwrap();
    net.connect(h2, s).unwrap();
    net.connect(s, h3).unwrap();

    let f1 = net.start_flow(h1, h3, DataRate::new(800.0), None).unwrap();
    let f2 = net.start_flow(h2, h3, DataRate::new(800.0), None).unwrap();
    net.await_stability();

    assert_approx_eq!(net.get_flow(f1).unwrap().throughput().value(), 500.0);
    assert_approx_eq!(net.get_flow(f2).unwrap().throughput().value(), 500.0);
}

#[test]
fn s4_oversubscribed_fcfs_favors_arrival_order() {
    let mut net = Network::new();
    let h1 = host(&mut net, 1000.0, 1);
    let h2 = host(&mut net, 1000.0, 1);
    let h3 = host(&mut net, 1000.0, 1);
    let s = switch(&mut net, 1000.0, 3);
    net.connect(h1, s).unwrap();
    net.connect(h2, s).unwrap();
    net.connect(s, h3).unwrap();

    net.set_fairness_policy(s, Box::new(FirstComeFirstServed)).unwrap();

    let f1 = net.start_flow(h1, h3, DataRate::new(800.0), None).unwrap();
    let f2 = net.start_flow(h2, h3, DataRate::new(800.0), None).unwrap();
    net.await_stability();

    assert_approx_eq!(net.get_flow(f1).unwrap().throughput().value(), 800.0);
    assert_approx_eq!(net.get_flow(f2).unwrap().throughput().value(), 200.0);
}

#[test]
fn s5_dynamic_teardown_converges_to_remaining_demand() {
    let mut net = Network::new();
    let h1 = host(&mut net, 1000.0, 1);
    let h2 = host(&mut net, 1000.0, 1);
    let h3 = host(&mut net, 1000.0, 1);
    let s = switch(&mut net, 1000.0, 3);
    net.connect(h1, s).unwrap();
    net.connect(h2, s).unwrap();
    net.connect(s, h3).unwrap();

    let f1 = net.start_flow(h1, h3, DataRate::new(800.0), None).unwrap();
    let f2 = net.start_flow(h2, h3, DataRate::new(800.0), None).unwrap();
    net.await_stability();
    assert_approx_eq!(net.get_flow(f1).unwrap().throughput().value(), 500.0);

    net.stop_flow(f1).unwrap();
    net.await_stability();

    assert_approx_eq!(net.get_flow(f2).unwrap().throughput().value(), 800.0);
    assert!(net.get_flow(f1).is_none());
}

#[test]
fn s6_routing_failure_registers_flow_at_zero_throughput() {
    let mut net = Network::new();
    let h1 = host(&mut net, 1000.0, 1);
    let h_disconnected = host(&mut net, 1000.0, 1);

    let flow_id = net
        .start_flow(h1, h_disconnected, DataRate::new(500.0), None)
        .unwrap();
    net.await_stability();

    assert!(net.get_flow(flow_id).unwrap().throughput().is_zero());
    let snapshot = net.snapshot().unwrap();
    assert_eq!(snapshot.active_flow_count(), 1);
}

#[test]
fn peer_consistency_holds_after_stability() {
    let mut net = Network::new();
    let h1 = host(&mut net, 1000.0, 1);
    let s = switch(&mut net, 1000.0, 2);
    let h2 = host(&mut net, 1000.0, 1);
    let (key_h1, _) = net.connect(h1, s).unwrap();
    let (key_s_to_h2, key_h2) = net.connect(s, h2).unwrap();

    let flow_id = net.start_flow(h1, h2, DataRate::new(500.0), None).unwrap();
    net.await_stability();

    let h1_port = &net.node(h1).unwrap().ports()[key_h1.1];
    let s_port_to_h1 = &net.node(s).unwrap().ports()[0];
    assert_approx_eq!(
        h1_port.outgoing_rate(flow_id).value(),
        s_port_to_h1.incoming_rate(flow_id).value()
    );

    let s_port_to_h2 = &net.node(s).unwrap().ports()[key_s_to_h2.1];
    let h2_port = &net.node(h2).unwrap().ports()[key_h2.1];
    assert_approx_eq!(
        s_port_to_h2.outgoing_rate(flow_id).value(),
        h2_port.incoming_rate(flow_id).value()
    );
}

#[test]
fn capacity_invariant_never_exceeded_when_oversubscribed() {
    let mut net = Network::new();
    let h1 = host(&mut net, 1000.0, 1);
    let h2 = host(&mut net, 1000.0, 1);
    let h3 = host(&mut net, 1000.0, 1);
    let s = switch(&mut net, 1000.0, 3);
    net.connect(h1, s).unwrap();
    net.connect(h2, s).unwrap();
    net.connect(s, h3).unwrap();

    net.start_flow(h1, h3, DataRate::new(800.0), None).unwrap();
    net.start_flow(h2, h3, DataRate::new(800.0), None).unwrap();
    net.await_stability();

    for port in net.node(s).unwrap().ports() {
        assert!(port.total_outgoing().value() <= port.max_speed().value() + EPSILON);
    }
}

#[test]
fn await_stability_is_idempotent() {
    let mut net = Network::new();
    let h1 = host(&mut net, 1000.0, 1);
    let s = switch(&mut net, 1000.0, 2);
    let h2 = host(&mut net, 1000.0, 1);
    net.connect(h1, s).unwrap();
    net.connect(s, h2).unwrap();
    net.start_flow(h1, h2, DataRate::new(300.0), None).unwrap();

    net.await_stability();
    let first = net.snapshot().unwrap();
    net.await_stability();
    let second = net.snapshot().unwrap();

    assert_eq!(first.nodes.len(), second.nodes.len());
    for (a, b) in first.nodes.iter().zip(second.nodes.iter()) {
        assert_approx_eq!(a.node_throughput_mbps, b.node_throughput_mbps);
    }
}

#[test]
fn determinism_across_independent_runs() {
    fn build_and_run() -> Vec<f64> {
        let mut net = Network::new();
        let h1 = host(&mut net, 1000.0, 1);
        let s1 = switch(&mut net, 1000.0, 3);
        let s2a = switch(&mut net, 1000.0, 2);
        let s2b = switch(&mut net, 1000.0, 2);
        let s3 = switch(&mut net, 1000.0, 3);
        let h2 = host(&mut net, 1000.0, 1);
        net.connect(h1, s1).unwrap();
        net.connect(s1, s2a).unwrap();
        net.connect(s1, s2b).unwrap();
        net.connect(s2a, s3).unwrap();
        net.connect(s2b, s3).unwrap();
        net.connect(s3, h2).unwrap();
        net.start_flow(h1, h2, DataRate::new(800.0), None).unwrap();
        net.await_stability();
        let snapshot = net.snapshot().unwrap();
        snapshot.nodes.iter().map(|n| n.node_throughput_mbps).collect()
    }

    let run_a = build_and_run();
    let run_b = build_and_run();
    assert_eq!(run_a, run_b);
}
