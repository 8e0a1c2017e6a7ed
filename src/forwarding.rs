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

//! Splits one flow's demand across its candidate next-hop ports
//! (spec.md §4.3). The fairness policy, run afterwards per outgoing port,
//! is what actually reconciles oversubscription; a forwarding policy's
//! output always sums to the input demand.

use crate::ids::PortKey;
use crate::units::DataRate;

/// Splits a flow's demand across a (already peer-id-sorted) slice of
/// candidate next-hop ports.
pub trait ForwardingPolicy: std::fmt::Debug {
    /// Splits `demand` across `next_hops`. The result sums to `demand`
    /// (modulo floating-point error); an empty `next_hops` yields an empty
    /// result (the `no_route` case, spec.md §4.2).
    fn split(&self, demand: DataRate, next_hops: &[PortKey]) -> Vec<(PortKey, DataRate)>;
}

/// Equal-cost multi-path: splits demand evenly across every next hop.
/// Callers are responsible for presenting `next_hops` pre-sorted by peer
/// node id so iteration (and hence any downstream rounding) is
/// deterministic (spec.md §4.3, §5).
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticEcmp;

impl ForwardingPolicy for StaticEcmp {
    fn split(&self, demand: DataRate, next_hops: &[PortKey]) -> Vec<(PortKey, DataRate)> {
        if next_hops.is_empty() {
            return Vec::new();
        }
        let share = demand / next_hops.len() as f64;
        next_hops.iter().map(|&port| (port, share)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;

    #[test]
    fn splits_evenly_across_next_hops() {
        let policy = StaticEcmp;
        let hops = vec![(NodeId(1), 0), (NodeId(2), 0)];
        let split = policy.split(DataRate::new(800.0), &hops);
        assert_eq!(split.len(), 2);
        for (_, rate) in &split {
            assert!(rate.approx_eq(DataRate::new(400.0)));
        }
    }

    #[test]
    fn no_next_hops_yields_no_split() {
        let policy = StaticEcmp;
        let split = policy.split(DataRate::new(800.0), &[]);
        assert!(split.is_empty());
    }
}
