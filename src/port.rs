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

//! One side of a full-duplex link (spec.md §4.1).
//!
//! A port never autonomously reconciles overload: callers (the node update
//! loop, via a [`crate::fairness::FairnessPolicy`]) must saturate demand to
//! capacity before calling [`Port::set_outgoing_rate`].

use crate::error::{Direction, PortError};
use crate::fairness::FairnessState;
use crate::ids::{FlowId, PortKey};
use crate::units::{DataRate, EPSILON};
use std::collections::HashMap;

/// One side of a link, owned by exactly one node.
#[derive(Debug, Clone)]
pub struct Port {
    max_speed: DataRate,
    other_end: Option<PortKey>,
    outgoing_rate_of: HashMap<FlowId, DataRate>,
    incoming_rate_of: HashMap<FlowId, DataRate>,
    /// Per-port bookkeeping consulted by the fairness policy across
    /// recomputations (arrival order for FCFS, previous allocations for
    /// MaxMin-no-forced-reduction).
    pub(crate) fairness_state: FairnessState,
}

impl Port {
    /// Builds an unconnected port with the given link capacity.
    pub fn new(max_speed: DataRate) -> Self {
        Port {
            max_speed,
            other_end: None,
            outgoing_rate_of: HashMap::new(),
            incoming_rate_of: HashMap::new(),
            fairness_state: FairnessState::default(),
        }
    }

    /// The link's capacity in each direction.
    pub fn max_speed(&self) -> DataRate {
        self.max_speed
    }

    /// The peer port this one is connected to, if any.
    pub fn other_end(&self) -> Option<PortKey> {
        self.other_end
    }

    /// True iff this port is paired with a peer.
    pub fn is_connected(&self) -> bool {
        self.other_end.is_some()
    }

    pub(crate) fn set_other_end(&mut self, peer: Option<PortKey>) {
        self.other_end = peer;
    }

    /// Tears down this side of a link: clears the peer pointer and every
    /// per-flow rate, since a disconnected port carries nothing.
    pub(crate) fn disconnect(&mut self) {
        self.other_end = None;
        self.outgoing_rate_of.clear();
        self.incoming_rate_of.clear();
    }

    /// This port's current outgoing rate for `flow`, or zero.
    pub fn outgoing_rate(&self, flow: FlowId) -> DataRate {
        self.outgoing_rate_of.get(&flow).copied().unwrap_or(DataRate::ZERO)
    }

    /// This port's current incoming rate for `flow`, or zero.
    pub fn incoming_rate(&self, flow: FlowId) -> DataRate {
        self.incoming_rate_of.get(&flow).copied().unwrap_or(DataRate::ZERO)
    }

    /// The flow ids with a nonzero outgoing rate on this port.
    pub fn outgoing_flow_ids(&self) -> Vec<FlowId> {
        self.outgoing_rate_of.keys().copied().collect()
    }

    /// The flow ids with a nonzero incoming rate on this port.
    pub fn incoming_flow_ids(&self) -> Vec<FlowId> {
        self.incoming_rate_of.keys().copied().collect()
    }

    /// Σ `outgoing_rate_of`.
    pub fn total_outgoing(&self) -> DataRate {
        self.outgoing_rate_of.values().copied().sum()
    }

    /// Σ `incoming_rate_of`.
    pub fn total_incoming(&self) -> DataRate {
        self.incoming_rate_of.values().copied().sum()
    }

    /// `max_speed − Σ outgoing_rate_of`.
    pub fn residual_out_capacity(&self) -> DataRate {
        self.max_speed.saturating_sub(self.total_outgoing())
    }

    /// `max_speed − Σ incoming_rate_of`.
    pub fn residual_in_capacity(&self) -> DataRate {
        self.max_speed.saturating_sub(self.total_incoming())
    }

    /// Sets this side's outgoing rate for `flow`. Fails if the new Σ
    /// outgoing would exceed `max_speed` by more than ε; the caller (the
    /// fairness policy) is expected to have already saturated demand to
    /// capacity.
    ///
    /// Returns the previous rate when the change exceeds ε (the caller
    /// uses this to decide whether to notify the peer), or `None` if the
    /// rate did not change.
    pub(crate) fn set_outgoing_rate(
        &mut self,
        flow: FlowId,
        rate: DataRate,
    ) -> Result<Option<DataRate>, PortError> {
        let old = self.outgoing_rate(flow);
        if rate.approx_eq(old) {
            return Ok(None);
        }
        let new_total = self.total_outgoing().saturating_sub(old) + rate;
        if new_total.value() > self.max_speed.value() + EPSILON {
            return Err(PortError::CapacityExceeded {
                requested: new_total,
                capacity: self.max_speed,
                direction: Direction::Outgoing,
            });
        }
        if rate.is_zero() {
            self.outgoing_rate_of.remove(&flow);
        } else {
            self.outgoing_rate_of.insert(flow, rate);
        }
        Ok(Some(old))
    }

    /// Sets this side's incoming rate for `flow`, called when the peer
    /// writes its matching outgoing rate. Panics on a capacity violation:
    /// by the time a peer's fairness policy has saturated to its own
    /// `max_speed`, this side's `max_speed` (normally equal, per a
    /// symmetric link) should never be exceeded; violation indicates an
    /// asymmetric-speed topology bug upstream.
    pub(crate) fn set_incoming_rate(&mut self, flow: FlowId, rate: DataRate) {
        let old = self.incoming_rate(flow);
        if rate.approx_eq(old) {
            return;
        }
        if rate.is_zero() {
            self.incoming_rate_of.remove(&flow);
        } else {
            self.incoming_rate_of.insert(flow, rate);
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(n: u64) -> FlowId {
        FlowId(n)
    }

    #[test]
    fn residual_capacity_tracks_allocations() {
        let mut port = Port::new(DataRate::new(1000.0));
        port.set_outgoing_rate(flow(1), DataRate::new(400.0)).unwrap();
        assert!(port.residual_out_capacity().approx_eq(DataRate::new(600.0)));
    }

    #[test]
    fn overload_is_rejected() {
        let mut port = Port::new(DataRate::new(1000.0));
        port.set_outgoing_rate(flow(1), DataRate::new(900.0)).unwrap();
        let result = port.set_outgoing_rate(flow(2), DataRate::new(200.0));
        assert!(matches!(result, Err(PortError::CapacityExceeded { .. })));
    }

    #[test]
    fn unchanged_rate_reports_no_change() {
        let mut port = Port::new(DataRate::new(1000.0));
        port.set_outgoing_rate(flow(1), DataRate::new(400.0)).unwrap();
        let result = port.set_outgoing_rate(flow(1), DataRate::new(400.0)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn zero_rate_removes_the_entry() {
        let mut port = Port::new(DataRate::new(1000.0));
        port.set_outgoing_rate(flow(1), DataRate::new(400.0)).unwrap();
        port.set_outgoing_rate(flow(1), DataRate::ZERO).unwrap();
        assert!(port.outgoing_flow_ids().is_empty());
        assert!(port.total_outgoing().is_zero());
    }
}
