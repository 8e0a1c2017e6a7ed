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

//! Blocks observers until every node's update loop has quiesced, and
//! guards "must-be-stable" regions against concurrent mutation
//! (spec.md §4.6).
//!
//! The distilled spec describes two mutexes (one for the invalidation
//! counter `n`, one for the should-be-stable counter `s`) taken in a
//! lexicographic order to avoid deadlock. This implementation instead
//! guards both counters with a single mutex: with one lock there is no
//! ordering to get wrong, and the two counters are never read or written
//! independently of each other anyway (every operation here touches at
//! most one of them but always needs a consistent view of both to decide
//! whether to fail). This is a strict simplification of the same
//! exclusion property, recorded in `DESIGN.md`.

use crate::error::StabilityError;
use std::sync::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Counters {
    /// Outstanding invalidations. Stability holds iff this is zero.
    n: u64,
    /// Nested `check_is_stable_while` depth.
    s: u64,
}

/// Counts outstanding invalidations, lets callers await quiescence, and
/// enforces the `check_is_stable_while` mutation guard.
#[derive(Debug)]
pub struct NetworkStabilityValidator {
    counters: Mutex<Counters>,
    stable: Condvar,
}

impl Default for NetworkStabilityValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkStabilityValidator {
    /// Builds a validator starting in the stable state.
    pub fn new() -> Self {
        NetworkStabilityValidator {
            counters: Mutex::new(Counters::default()),
            stable: Condvar::new(),
        }
    }

    /// Declares pending work. Fails if called while a
    /// `check_is_stable_while` block is in progress.
    pub(crate) fn invalidate(&self) -> Result<(), StabilityError> {
        let mut counters = self.counters.lock().unwrap();
        if counters.s > 0 {
            return Err(StabilityError::IllegalInvalidate);
        }
        counters.n += 1;
        Ok(())
    }

    /// Declares one piece of pending work resolved. Fails if there was no
    /// outstanding invalidation.
    pub(crate) fn validate(&self) -> Result<(), StabilityError> {
        let mut counters = self.counters.lock().unwrap();
        if counters.n == 0 {
            return Err(StabilityError::SpuriousValidate);
        }
        counters.n -= 1;
        if counters.n == 0 {
            self.stable.notify_all();
        }
        Ok(())
    }

    /// True iff there are no outstanding invalidations right now.
    pub fn is_stable(&self) -> bool {
        self.counters.lock().unwrap().n == 0
    }

    /// Blocks the calling thread until every outstanding invalidation has
    /// cleared.
    pub fn await_stability(&self) {
        let counters = self.counters.lock().unwrap();
        let _guard = self
            .stable
            .wait_while(counters, |c| c.n != 0)
            .unwrap();
    }

    /// Asserts the network is stable, runs `f` inside a guarded region
    /// during which any `invalidate()` call fails, then returns `f`'s
    /// result. Used to protect read-only consistency regions such as
    /// snapshotting or advancing byte counters (spec.md §4.6).
    pub fn check_is_stable_while<R>(&self, f: impl FnOnce() -> R) -> Result<R, StabilityError> {
        {
            let mut counters = self.counters.lock().unwrap();
            if counters.n != 0 {
                return Err(StabilityError::NotStable);
            }
            counters.s += 1;
        }
        let result = f();
        {
            let mut counters = self.counters.lock().unwrap();
            counters.s -= 1;
        }
        Ok(result)
    }

    /// Discards all in-flight invalidations. Used only when tearing down
    /// and rebuilding a network, never during normal operation.
    pub fn reset(&self) {
        let mut counters = self.counters.lock().unwrap();
        *counters = Counters::default();
        self.stable.notify_all();
    }
}
