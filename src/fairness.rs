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

//! Per-port fairness policies (spec.md §4.4): given aggregated per-flow
//! demands contending for one outgoing port and that port's capacity,
//! produce allocations with `a_i <= d_i` and `sum(a_i) <= capacity`.
//!
//! Ties (equal demand) are always broken by `FlowId` ascending, never by
//! hash-map iteration order (spec.md §5).

use crate::ids::FlowId;
use crate::units::DataRate;
use std::collections::{HashMap, HashSet};

/// Per-port state a [`FairnessPolicy`] carries across recomputations.
/// Owned by the [`crate::port::Port`], not the policy object, so the same
/// policy instance can be shared across ports or nodes.
#[derive(Debug, Clone, Default)]
pub struct FairnessState {
    /// FCFS: the order flows were first seen contending at this port.
    arrival_order: Vec<FlowId>,
    /// MaxMin: the allocation handed out last cycle.
    prev_alloc: HashMap<FlowId, DataRate>,
    /// MaxMin: the capacity in effect last cycle.
    prev_capacity: Option<DataRate>,
    /// MaxMin: the contending flow set last cycle.
    prev_contending: HashSet<FlowId>,
}

/// Splits a port's capacity among its contending flows.
pub trait FairnessPolicy: std::fmt::Debug {
    /// Produces allocations for `demands`, given `capacity` and mutable
    /// access to this port's persisted fairness state.
    fn allocate(
        &self,
        demands: &HashMap<FlowId, DataRate>,
        capacity: DataRate,
        state: &mut FairnessState,
    ) -> HashMap<FlowId, DataRate>;
}

fn sorted_flow_ids(demands: &HashMap<FlowId, DataRate>) -> Vec<FlowId> {
    let mut ids: Vec<FlowId> = demands.keys().copied().collect();
    ids.sort();
    ids
}

/// Flows are served in arrival order, each to its full demand, until
/// capacity is exhausted; flows past that point receive zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstComeFirstServed;

impl FairnessPolicy for FirstComeFirstServed {
    fn allocate(
        &self,
        demands: &HashMap<FlowId, DataRate>,
        capacity: DataRate,
        state: &mut FairnessState,
    ) -> HashMap<FlowId, DataRate> {
        state.arrival_order.retain(|id| demands.contains_key(id));
        let known: HashSet<FlowId> = state.arrival_order.iter().copied().collect();
        for id in sorted_flow_ids(demands) {
            if !known.contains(&id) {
                state.arrival_order.push(id);
            }
        }

        let mut allocation = HashMap::with_capacity(demands.len());
        let mut remaining = capacity;
        for id in &state.arrival_order {
            let demand = demands.get(id).copied().unwrap_or(DataRate::ZERO);
            let give = demand.min_with(remaining);
            allocation.insert(*id, give);
            remaining = remaining.saturating_sub(give);
        }
        allocation
    }
}

/// Classical max-min water-filling, with the "no forced reduction" clause
/// from spec.md §4.4 / §9: a flow's allocation is never lowered below the
/// value it was handed last cycle unless this port's capacity decreased or
/// its contending-flow set changed. Because both the raw max-min result and
/// any previous-value floor must still respect `sum(a_i) <= capacity`, a
/// floor is only honored out of the port's *spare* capacity (capacity minus
/// the raw allocation's sum) — see the Open Question resolution in
/// `DESIGN.md`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxMinNoForcedReduction;

impl MaxMinNoForcedReduction {
    fn raw_max_min(demands: &HashMap<FlowId, DataRate>, capacity: DataRate) -> HashMap<FlowId, DataRate> {
        let mut ids = sorted_flow_ids(demands);
        ids.sort_by(|a, b| {
            demands[a]
                .cmp(&demands[b])
                .then_with(|| a.cmp(b))
        });
        let mut allocation = HashMap::with_capacity(ids.len());
        let mut remaining = capacity;
        let n = ids.len();
        for (i, id) in ids.into_iter().enumerate() {
            let demand = demands[&id];
            let share_count = (n - i) as f64;
            let fair_share = remaining / share_count;
            let give = demand.min_with(fair_share);
            allocation.insert(id, give);
            remaining = remaining.saturating_sub(give);
        }
        allocation
    }
}

impl FairnessPolicy for MaxMinNoForcedReduction {
    fn allocate(
        &self,
        demands: &HashMap<FlowId, DataRate>,
        capacity: DataRate,
        state: &mut FairnessState,
    ) -> HashMap<FlowId, DataRate> {
        let mut allocation = Self::raw_max_min(demands, capacity);

        let contending: HashSet<FlowId> = demands.keys().copied().collect();
        let capacity_decreased = state
            .prev_capacity
            .map(|prev| capacity.value() < prev.value() - crate::units::EPSILON)
            .unwrap_or(false);
        let contending_changed = contending != state.prev_contending;

        if !capacity_decreased && !contending_changed {
            let raw_sum: DataRate = allocation.values().copied().sum();
            let mut spare = capacity.saturating_sub(raw_sum);
            for id in sorted_flow_ids(demands) {
                if spare.is_zero() {
                    break;
                }
                let demand = demands[&id];
                let current = allocation.get(&id).copied().unwrap_or(DataRate::ZERO);
                let floor = state
                    .prev_alloc
                    .get(&id)
                    .copied()
                    .unwrap_or(DataRate::ZERO)
                    .min_with(demand);
                if current.value() < floor.value() {
                    let bump = (floor - current).min_with(spare);
                    allocation.insert(id, current + bump);
                    spare = spare.saturating_sub(bump);
                }
            }
        }

        state.prev_alloc = allocation.clone();
        state.prev_capacity = Some(capacity);
        state.prev_contending = contending;
        allocation
    }
}

trait MinWith {
    fn min_with(self, other: Self) -> Self;
}

impl MinWith for DataRate {
    fn min_with(self, other: Self) -> Self {
        if self.value() <= other.value() {
            self
        } else {
            other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    #[test]
    fn fcfs_serves_in_arrival_order() {
        let policy = FirstComeFirstServed;
        let mut state = FairnessState::default();
        // flow 1 arrives alone first.
        let only_one = hashmap! { FlowId(1) => DataRate::new(800.0) };
        policy.allocate(&only_one, DataRate::new(1000.0), &mut state);
        // flow 2 arrives later, contending with flow 1.
        let both = hashmap! {
            FlowId(1) => DataRate::new(800.0),
            FlowId(2) => DataRate::new(800.0),
        };
        let allocation = policy.allocate(&both, DataRate::new(1000.0), &mut state);
        assert!(allocation[&FlowId(1)].approx_eq(DataRate::new(800.0)));
        assert!(allocation[&FlowId(2)].approx_eq(DataRate::new(200.0)));
    }

    #[test]
    fn maxmin_splits_evenly_when_oversubscribed() {
        let policy = MaxMinNoForcedReduction;
        let mut state = FairnessState::default();
        let d = hashmap! {
            FlowId(1) => DataRate::new(800.0),
            FlowId(2) => DataRate::new(800.0),
        };
        let allocation = policy.allocate(&d, DataRate::new(1000.0), &mut state);
        assert!(allocation[&FlowId(1)].approx_eq(DataRate::new(500.0)));
        assert!(allocation[&FlowId(2)].approx_eq(DataRate::new(500.0)));
    }

    #[test]
    fn maxmin_does_not_reduce_when_a_flow_s_demand_drops() {
        let policy = MaxMinNoForcedReduction;
        let mut state = FairnessState::default();
        let initial = hashmap! {
            FlowId(1) => DataRate::new(500.0),
            FlowId(2) => DataRate::new(500.0),
        };
        let first = policy.allocate(&initial, DataRate::new(1000.0), &mut state);
        assert!(first[&FlowId(1)].approx_eq(DataRate::new(500.0)));

        // Flow 2's demand drops; same contending set, same capacity, so
        // flow 1 must not be reduced below its previous allocation.
        let reduced = hashmap! {
            FlowId(1) => DataRate::new(500.0),
            FlowId(2) => DataRate::new(100.0),
        };
        let second = policy.allocate(&reduced, DataRate::new(1000.0), &mut state);
        assert!(second[&FlowId(1)].value() >= 500.0 - crate::units::EPSILON);
    }

    #[test]
    fn maxmin_allows_reduction_when_capacity_shrinks() {
        let policy = MaxMinNoForcedReduction;
        let mut state = FairnessState::default();
        let d = hashmap! {
            FlowId(1) => DataRate::new(500.0),
            FlowId(2) => DataRate::new(500.0),
        };
        policy.allocate(&d, DataRate::new(1000.0), &mut state);
        let after_shrink = policy.allocate(&d, DataRate::new(400.0), &mut state);
        assert!(after_shrink[&FlowId(1)].approx_eq(DataRate::new(200.0)));
        assert!(after_shrink[&FlowId(2)].approx_eq(DataRate::new(200.0)));
    }

    #[test]
    fn maxmin_allows_reduction_when_contending_set_changes() {
        let policy = MaxMinNoForcedReduction;
        let mut state = FairnessState::default();
        let d = hashmap! { FlowId(1) => DataRate::new(1000.0) };
        let first = policy.allocate(&d, DataRate::new(1000.0), &mut state);
        assert!(first[&FlowId(1)].approx_eq(DataRate::new(1000.0)));

        let two_flows = hashmap! {
            FlowId(1) => DataRate::new(1000.0),
            FlowId(2) => DataRate::new(1000.0),
        };
        let second = policy.allocate(&two_flows, DataRate::new(1000.0), &mut state);
        assert!(second[&FlowId(1)].approx_eq(DataRate::new(500.0)));
    }
}
