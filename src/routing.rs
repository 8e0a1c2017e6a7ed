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

//! Per-node map from destination to a set of equal-cost next-hop ports
//! (spec.md §4.2). A node's table is rebuilt wholesale by
//! [`crate::network::Network::recompute_routing`] whenever the topology
//! changes, mirroring the teacher's own bulk forwarding-table recompute
//! rather than a BGP-style incremental advertisement flood — see
//! `DESIGN.md`. `advertise` is the primitive that bulk recompute drives;
//! `purge_port` is the spec's other named mutating primitive (spec.md
//! §4.2's "purge on disconnect") but is subsumed by the bulk recompute in
//! practice — kept and tested as the lower-level operation an incremental
//! consumer of this table would use.

use crate::ids::{NodeId, PortKey};
use std::collections::{BTreeSet, HashMap};

/// A node's routing table: destination → non-empty set of equal-cost
/// next-hop ports, all at the same minimum hop distance.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    entries: HashMap<NodeId, (u32, BTreeSet<PortKey>)>,
}

impl RoutingTable {
    /// The current next-hop set for `destination`, if routable.
    pub fn next_hops(&self, destination: NodeId) -> Option<&BTreeSet<PortKey>> {
        self.entries.get(&destination).map(|(_, hops)| hops)
    }

    /// The current shortest hop distance to `destination`, if routable.
    pub fn distance(&self, destination: NodeId) -> Option<u32> {
        self.entries.get(&destination).map(|(d, _)| *d)
    }

    /// True iff no route exists to `destination` (spec.md §4.2's
    /// `no_route`).
    pub fn no_route(&self, destination: NodeId) -> bool {
        self.next_hops(destination).is_none()
    }

    /// Registers a route advertisement `(destination, distance, via_port)`.
    /// Keeps only the minimum-distance advertisements for each
    /// destination; ties are retained (ECMP). Returns true if the table
    /// changed.
    pub(crate) fn advertise(&mut self, destination: NodeId, distance: u32, via_port: PortKey) -> bool {
        match self.entries.entry(destination) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                let (current_distance, hops) = e.get_mut();
                if distance < *current_distance {
                    *current_distance = distance;
                    hops.clear();
                    hops.insert(via_port);
                    true
                } else if distance == *current_distance {
                    hops.insert(via_port)
                } else {
                    false
                }
            }
            std::collections::hash_map::Entry::Vacant(v) => {
                let mut hops = BTreeSet::new();
                hops.insert(via_port);
                v.insert((distance, hops));
                true
            }
        }
    }

    /// Purges every next-hop entry that routed through `port`, e.g. on
    /// disconnection. Drops a destination entirely once its hop set is
    /// empty. Returns true if anything changed.
    pub(crate) fn purge_port(&mut self, port: PortKey) -> bool {
        let mut changed = false;
        self.entries.retain(|_, (_, hops)| {
            if hops.remove(&port) {
                changed = true;
            }
            !hops.is_empty()
        });
        changed
    }

    /// Replaces this table wholesale, used by the bulk topology recompute.
    pub(crate) fn replace(&mut self, other: RoutingTable) {
        self.entries = other.entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorter_distance_replaces_the_hop_set() {
        let mut table = RoutingTable::default();
        table.advertise(NodeId(9), 2, (NodeId(1), 0));
        table.advertise(NodeId(9), 1, (NodeId(1), 1));
        let hops: Vec<_> = table.next_hops(NodeId(9)).unwrap().iter().copied().collect();
        assert_eq!(hops, vec![(NodeId(1), 1)]);
        assert_eq!(table.distance(NodeId(9)), Some(1));
    }

    #[test]
    fn equal_distance_is_retained_for_ecmp() {
        let mut table = RoutingTable::default();
        table.advertise(NodeId(9), 1, (NodeId(1), 0));
        table.advertise(NodeId(9), 1, (NodeId(1), 1));
        assert_eq!(table.next_hops(NodeId(9)).unwrap().len(), 2);
    }

    #[test]
    fn longer_distance_is_ignored() {
        let mut table = RoutingTable::default();
        table.advertise(NodeId(9), 1, (NodeId(1), 0));
        let changed = table.advertise(NodeId(9), 2, (NodeId(1), 1));
        assert!(!changed);
        assert_eq!(table.next_hops(NodeId(9)).unwrap().len(), 1);
    }

    #[test]
    fn purge_removes_empty_destinations() {
        let mut table = RoutingTable::default();
        table.advertise(NodeId(9), 1, (NodeId(1), 0));
        let changed = table.purge_port((NodeId(1), 0));
        assert!(changed);
        assert!(table.no_route(NodeId(9)));
    }
}
