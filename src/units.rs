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

//! Newtype-wrapped scalar units: rates, data volumes, power and time.
//!
//! All four types wrap an `f64` and compare with an ε-tolerance on equality
//! while keeping a strict total order (via `ordered-float`) for `<`/`<=`.
//! Division by zero in ratio computations elsewhere in the crate is handled
//! by returning `None`, never `NaN`.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Sub};

/// Relative tolerance used by every `approx_eq` in this module.
pub const EPSILON: f64 = 1e-6;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

macro_rules! scalar_unit {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) f64);

        impl $name {
            /// The additive identity.
            pub const ZERO: Self = $name(0.0);

            /// Builds a value, clamping negative input to zero. Values are
            /// never expected to be negative; this only guards against
            /// floating-point error accumulating a small negative residue.
            pub fn new(value: f64) -> Self {
                if value < 0.0 {
                    $name(0.0)
                } else {
                    $name(value)
                }
            }

            /// Builds a value directly, skipping the negative-clamp in
            /// [`Self::new`]. Used only for compile-time constants known to
            /// be non-negative.
            pub const fn new_const(value: f64) -> Self {
                $name(value)
            }

            /// The raw scalar value.
            pub fn value(self) -> f64 {
                self.0
            }

            /// True within [`EPSILON`] of zero.
            pub fn is_zero(self) -> bool {
                approx_eq(self.0, 0.0)
            }

            /// ε-tolerant equality; see module docs.
            pub fn approx_eq(self, other: Self) -> bool {
                approx_eq(self.0, other.0)
            }

            /// Saturating subtraction: never produces a negative value.
            pub fn saturating_sub(self, other: Self) -> Self {
                $name((self.0 - other.0).max(0.0))
            }

            fn key(self) -> OrderedFloat<f64> {
                OrderedFloat(self.0)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0 == other.0
            }
        }
        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }
        impl Ord for $name {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.key().cmp(&other.key())
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                $name(self.0 + rhs.0)
            }
        }
        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                $name(self.0 - rhs.0)
            }
        }
        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self {
                $name(self.0 * rhs)
            }
        }
        impl Div<f64> for $name {
            type Output = Self;
            fn div(self, rhs: f64) -> Self {
                $name(self.0 / rhs)
            }
        }
        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold($name(0.0), |a, b| a + b)
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

scalar_unit!(DataRate, "A non-negative rate, in bits per second.");
scalar_unit!(Data, "A non-negative quantity of transferred data, in bits.");
scalar_unit!(Power, "Instantaneous power draw, in watts.");
scalar_unit!(Energy, "Accumulated energy, in joules.");

/// A duration, in seconds. Unlike the other units this may legitimately be
/// constructed from a millisecond count coming off an external wall clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(pub(crate) f64);

impl Time {
    /// The additive identity.
    pub const ZERO: Self = Time(0.0);

    /// Builds a `Time` from a millisecond count.
    pub fn from_millis(ms: u64) -> Self {
        Time(ms as f64 / 1000.0)
    }

    /// The duration in whole milliseconds, truncating any sub-millisecond
    /// remainder.
    pub fn as_millis(self) -> u64 {
        (self.0 * 1000.0) as u64
    }

    /// ε-tolerant equality.
    pub fn approx_eq(self, other: Self) -> bool {
        approx_eq(self.0, other.0)
    }
}

impl Sub for Time {
    type Output = Time;
    fn sub(self, rhs: Time) -> Time {
        Time(self.0 - rhs.0)
    }
}

impl DataRate {
    /// The amount of data sent if this rate is sustained for `elapsed`.
    pub fn over(self, elapsed: Time) -> Data {
        Data(self.0 * elapsed.0)
    }
}

impl Power {
    /// The energy consumed if this power draw is sustained for `elapsed`.
    pub fn over(self, elapsed: Time) -> Energy {
        Energy(self.0 * elapsed.0)
    }
}

/// Computes `numerator / denominator` as a ratio, returning `None` rather
/// than propagating a `NaN` when `denominator` is (approximately) zero. Used
/// throughout the crate for throughput/demand ratios (spec.md §9, §6).
pub fn safe_ratio(numerator: DataRate, denominator: DataRate) -> Option<f64> {
    if denominator.is_zero() {
        None
    } else {
        Some(numerator.0 / denominator.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approx_eq_within_epsilon() {
        let a = DataRate::new(1000.0);
        let b = DataRate::new(1000.0 + 1e-9);
        assert!(a.approx_eq(b));
        let c = DataRate::new(1001.0);
        assert!(!a.approx_eq(c));
    }

    #[test]
    fn ordering_is_total() {
        let mut rates = vec![DataRate::new(3.0), DataRate::new(1.0), DataRate::new(2.0)];
        rates.sort();
        assert_eq!(rates, vec![DataRate::new(1.0), DataRate::new(2.0), DataRate::new(3.0)]);
    }

    #[test]
    fn saturating_sub_never_negative() {
        let a = DataRate::new(5.0);
        let b = DataRate::new(10.0);
        assert_eq!(a.saturating_sub(b), DataRate::ZERO);
    }

    #[test]
    fn safe_ratio_zero_denominator() {
        assert_eq!(safe_ratio(DataRate::new(5.0), DataRate::ZERO), None);
        assert_eq!(safe_ratio(DataRate::new(5.0), DataRate::new(10.0)), Some(0.5));
    }

    #[test]
    fn rate_over_time_yields_data() {
        let rate = DataRate::new(1000.0);
        let elapsed = Time::from_millis(500);
        assert!(rate.over(elapsed).approx_eq(Data::new(500.0)));
    }
}
