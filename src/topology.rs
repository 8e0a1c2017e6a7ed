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

//! Topology JSON deserialization (spec.md §6, §9): a thin `serde` shape
//! plus [`Network::from_topology`] to build a [`crate::network::Network`]
//! from it. No file I/O, CLI, or schema versioning lives here — that is
//! the embedding application's responsibility (spec.md §1, §9).

use crate::error::NetworkError;
use crate::ids::{NodeId, INTERNET_ID};
use crate::network::Network;
use crate::node::NodeKind;
use crate::units::DataRate;
use serde::Deserialize;
use std::collections::HashMap;

/// A link capacity. Deserializes from a bare number (Kbps, per spec.md
/// §6: "Rate units are Kbps unless annotated") or a string carrying an
/// explicit unit suffix (`"bps"`, `"kbps"`, `"mbps"`, `"gbps"`,
/// case-insensitive).
#[derive(Debug, Clone, Copy)]
pub struct RateSpec(
    /// The parsed capacity.
    pub DataRate,
);

impl<'de> Deserialize<'de> for RateSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Annotated(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(kbps) => Ok(RateSpec(DataRate::new(kbps * 1000.0))),
            Raw::Annotated(text) => parse_annotated_rate(&text)
                .map(RateSpec)
                .map_err(serde::de::Error::custom),
        }
    }
}

fn parse_annotated_rate(text: &str) -> Result<DataRate, String> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();
    let (number_part, multiplier) = if let Some(prefix) = lower.strip_suffix("gbps") {
        (prefix, 1e9)
    } else if let Some(prefix) = lower.strip_suffix("mbps") {
        (prefix, 1e6)
    } else if let Some(prefix) = lower.strip_suffix("kbps") {
        (prefix, 1e3)
    } else if let Some(prefix) = lower.strip_suffix("bps") {
        (prefix, 1.0)
    } else {
        return Err(format!("unrecognized rate unit in {:?}", text));
    };
    let value: f64 = number_part
        .trim()
        .parse()
        .map_err(|_| format!("unparseable rate magnitude in {:?}", text))?;
    Ok(DataRate::new(value * multiplier))
}

/// The role named by a [`NodeSpec`]'s `kind` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKindSpec {
    /// Maps to [`NodeKind::HostNode`].
    Host,
    /// Maps to [`NodeKind::Switch`].
    Switch,
    /// Maps to [`NodeKind::CoreSwitch`].
    CoreSwitch,
}

impl From<NodeKindSpec> for NodeKind {
    fn from(spec: NodeKindSpec) -> Self {
        match spec {
            NodeKindSpec::Host => NodeKind::HostNode,
            NodeKindSpec::Switch => NodeKind::Switch,
            NodeKindSpec::CoreSwitch => NodeKind::CoreSwitch,
        }
    }
}

/// One `nodes[]` entry (spec.md §6). `id` is optional; missing ids are
/// auto-assigned by [`Network::add_node`] in declaration order.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    /// This node's role.
    pub kind: NodeKindSpec,
    /// An explicit id, honored verbatim if present.
    pub id: Option<u64>,
    /// Per-port link capacity.
    pub port_speed: RateSpec,
    /// The number of ports to build this node with.
    pub num_of_ports: usize,
}

/// One `links[]` entry (spec.md §6): an unordered pair of node ids to
/// connect. Either endpoint may be the literal id reserved for the
/// abstract internet node; [`Network::from_topology`] creates it lazily.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LinkSpec {
    /// One endpoint's id.
    pub a: u64,
    /// The other endpoint's id.
    pub b: u64,
}

/// The top-level topology document (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct TopologySpec {
    /// Node declarations, in the order ids are auto-assigned.
    pub nodes: Vec<NodeSpec>,
    /// Link declarations, connecting previously-declared (or internet)
    /// node ids.
    pub links: Vec<LinkSpec>,
}

impl Network {
    /// Builds a network from a parsed [`TopologySpec`]: adds every node
    /// (auto-assigning ids where absent), then connects every link in
    /// declaration order. A link naming [`INTERNET_ID`] lazily creates
    /// the internet node (spec.md §9).
    pub fn from_topology(spec: &TopologySpec) -> Result<Network, NetworkError> {
        let mut network = Network::new();
        let mut by_declared_id: HashMap<u64, NodeId> = HashMap::new();

        for node_spec in &spec.nodes {
            let kind: NodeKind = node_spec.kind.into();
            let speed = node_spec.port_speed.0;
            let assigned = match node_spec.id {
                Some(declared) => {
                    let id = NodeId(declared);
                    network.add_node_with_id(id, kind, speed, node_spec.num_of_ports);
                    id
                }
                None => network.add_node(kind, speed, node_spec.num_of_ports),
            };
            if let Some(declared) = node_spec.id {
                by_declared_id.insert(declared, assigned);
            }
        }

        let resolve = |raw: u64| -> NodeId {
            if raw == INTERNET_ID.0 {
                INTERNET_ID
            } else {
                by_declared_id.get(&raw).copied().unwrap_or(NodeId(raw))
            }
        };

        for link in &spec.links {
            network.connect(resolve(link.a), resolve(link.b))?;
        }

        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_is_kbps() {
        let spec: RateSpec = serde_json::from_str("1000").unwrap();
        assert!(spec.0.approx_eq(DataRate::new(1_000_000.0)));
    }

    #[test]
    fn annotated_mbps_is_honored() {
        let spec: RateSpec = serde_json::from_str("\"10Mbps\"").unwrap();
        assert!(spec.0.approx_eq(DataRate::new(10_000_000.0)));
    }

    #[test]
    fn annotated_gbps_is_honored() {
        let spec: RateSpec = serde_json::from_str("\"1Gbps\"").unwrap();
        assert!(spec.0.approx_eq(DataRate::new(1_000_000_000.0)));
    }

    #[test]
    fn builds_a_network_from_json() {
        let json = r#"{
            "nodes": [
                {"kind": "host", "id": 1, "port_speed": 1000, "num_of_ports": 1},
                {"kind": "switch", "id": 2, "port_speed": 1000, "num_of_ports": 2},
                {"kind": "host", "id": 3, "port_speed": 1000, "num_of_ports": 1}
            ],
            "links": [
                {"a": 1, "b": 2},
                {"a": 2, "b": 3}
            ]
        }"#;
        let spec: TopologySpec = serde_json::from_str(json).unwrap();
        let mut network = Network::from_topology(&spec).unwrap();
        let flow_id = network
            .start_flow(NodeId(1), NodeId(3), DataRate::new(500_000.0), None)
            .unwrap();
        network.await_stability();
        assert!(network
            .get_flow(flow_id)
            .unwrap()
            .throughput()
            .approx_eq(DataRate::new(500_000.0)));
    }

    #[test]
    fn auto_assigns_missing_ids() {
        let json = r#"{
            "nodes": [
                {"kind": "host", "id": null, "port_speed": 1000, "num_of_ports": 1},
                {"kind": "host", "id": null, "port_speed": 1000, "num_of_ports": 1}
            ],
            "links": []
        }"#;
        let spec: TopologySpec = serde_json::from_str(json).unwrap();
        let network = Network::from_topology(&spec).unwrap();
        assert_eq!(network.node_kind(NodeId(1)), Some(NodeKind::HostNode));
        assert_eq!(network.node_kind(NodeId(2)), Some(NodeKind::HostNode));
    }
}
