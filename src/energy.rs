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

//! Per-node power tracking and network-wide energy integration
//! (spec.md §4.8). Concrete energy models are out of scope (spec.md §1);
//! only the pluggable interface is specified here.

use crate::units::{Energy, Power, Time};

/// A pure function from a node's current throughput state to its
/// instantaneous power draw. Concrete implementations (e.g. idle/per-Gbps
/// linear models) are the embedding application's responsibility.
pub trait EnergyModel: std::fmt::Debug {
    /// Computes instantaneous power draw given the node's current total
    /// outgoing rate, in bits/s.
    fn power_draw(&self, total_outgoing_bits_per_sec: f64) -> Power;
}

/// A model that always reports zero power draw. Used as the default for
/// nodes that were not given an explicit model; harmless for topologies
/// that don't care about energy accounting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroPowerModel;

impl EnergyModel for ZeroPowerModel {
    fn power_draw(&self, _total_outgoing_bits_per_sec: f64) -> Power {
        Power::ZERO
    }
}

type PowerChangeHandler = Box<dyn FnMut(Power, Power)>;

/// Observes one node's update cycles and recomputes its instantaneous
/// power draw via a pluggable [`EnergyModel`].
pub struct EnergyMonitor {
    model: Box<dyn EnergyModel>,
    current_power: Power,
    total_energy: Energy,
    last_update_at: Option<Time>,
    observers: Vec<PowerChangeHandler>,
}

impl std::fmt::Debug for EnergyMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnergyMonitor")
            .field("current_power", &self.current_power)
            .finish()
    }
}

impl EnergyMonitor {
    /// Builds a monitor with the default zero-power model.
    pub fn new() -> Self {
        EnergyMonitor {
            model: Box::new(ZeroPowerModel),
            current_power: Power::ZERO,
            total_energy: Energy::ZERO,
            last_update_at: None,
            observers: Vec::new(),
        }
    }

    /// Builds a monitor with an explicit model.
    pub fn with_model(model: Box<dyn EnergyModel>) -> Self {
        EnergyMonitor {
            model,
            current_power: Power::ZERO,
            total_energy: Energy::ZERO,
            last_update_at: None,
            observers: Vec::new(),
        }
    }

    /// The most recently computed power draw.
    pub fn current_power(&self) -> Power {
        self.current_power
    }

    /// This node's own accumulated energy consumption, integrated across
    /// every call to [`EnergyMonitor::notify`] so far.
    pub fn total_energy(&self) -> Energy {
        self.total_energy
    }

    /// Registers an observer notified with the (old, new) power pair.
    pub fn on_power_change(&mut self, handler: PowerChangeHandler) {
        self.observers.push(handler);
    }

    /// Recomputes power draw from the node's current total outgoing rate
    /// and notifies observers if it changed. Called once per completed
    /// update cycle (spec.md §4.5 step 6). `now` integrates the power
    /// level held since the previous call into this node's running energy
    /// total before recomputing.
    pub(crate) fn notify(&mut self, now: Time, total_outgoing_bits_per_sec: f64) {
        if let Some(last) = self.last_update_at {
            let elapsed = now - last;
            self.total_energy = self.total_energy + self.current_power.over(elapsed);
        }
        self.last_update_at = Some(now);

        let old = self.current_power;
        let new = self.model.power_draw(total_outgoing_bits_per_sec);
        if new.approx_eq(old) {
            return;
        }
        self.current_power = new;
        for observer in &mut self.observers {
            observer(old, new);
        }
    }
}

impl Default for EnergyMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Integrates every node's power draw over wall-time to produce total
/// energy consumed across the network.
#[derive(Debug, Default)]
pub struct NetworkEnergyRecorder {
    total: Energy,
    last_sample_at: Option<Time>,
}

impl NetworkEnergyRecorder {
    /// Builds an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the recorder's clock to `now`, accumulating
    /// `total_power * elapsed` since the previous sample. The first call
    /// establishes the baseline and accumulates nothing.
    pub fn advance(&mut self, now: Time, total_power: Power) {
        if let Some(last) = self.last_sample_at {
            let elapsed = now - last;
            self.total = self.total + total_power.over(elapsed);
        }
        self.last_sample_at = Some(now);
    }

    /// Total energy accumulated so far.
    pub fn total_energy(&self) -> Energy {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct LinearModel;
    impl EnergyModel for LinearModel {
        fn power_draw(&self, total_outgoing_bits_per_sec: f64) -> Power {
            Power::new(10.0 + total_outgoing_bits_per_sec / 1000.0)
        }
    }

    #[test]
    fn monitor_notifies_on_change() {
        let mut monitor = EnergyMonitor::with_model(Box::new(LinearModel));
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        monitor.on_power_change(Box::new(move |old, new| seen2.borrow_mut().push((old, new))));
        monitor.notify(Time::from_millis(0), 500.0);
        assert_eq!(seen.borrow().len(), 1);
        assert!(monitor.current_power().approx_eq(Power::new(10.5)));
    }

    #[test]
    fn recorder_integrates_power_over_time() {
        let mut recorder = NetworkEnergyRecorder::new();
        recorder.advance(Time::from_millis(0), Power::new(100.0));
        recorder.advance(Time::from_millis(2000), Power::new(100.0));
        assert!(recorder.total_energy().approx_eq(Energy::new(200.0)));
    }
}
