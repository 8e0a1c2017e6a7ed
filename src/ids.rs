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

//! Opaque identifiers. All addressing in this crate goes through these two
//! types rather than network-layer addresses (spec.md §1 Non-goals).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node, unique within one [`crate::network::Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// The distinguished id of the abstract internet node (spec.md §3).
pub const INTERNET_ID: NodeId = NodeId(u64::MAX);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == INTERNET_ID {
            write!(f, "internet")
        } else {
            write!(f, "n{}", self.0)
        }
    }
}

/// A local port index within a node's port vector.
pub type PortIndex = usize;

/// An arena key identifying one port: the node that owns it and its index
/// in that node's port vector. `other_end` is a key rather than an owning
/// reference, since the port-graph is cyclic (spec.md §9).
pub type PortKey = (NodeId, PortIndex);

/// Identifies one [`crate::flow::NetFlow`], unique for the lifetime of a
/// [`crate::network::Network`]. Monotonically increasing; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(pub u64);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Allocates strictly increasing [`FlowId`]s, scoped to one `Network`
/// instance rather than a process-wide global (spec.md §9).
#[derive(Debug, Default)]
pub(crate) struct FlowIdAllocator {
    next: u64,
}

impl FlowIdAllocator {
    pub(crate) fn alloc(&mut self) -> Result<FlowId, crate::error::FlowIdExhausted> {
        if self.next == u64::MAX {
            return Err(crate::error::FlowIdExhausted);
        }
        let id = FlowId(self.next);
        self.next += 1;
        Ok(id)
    }
}
