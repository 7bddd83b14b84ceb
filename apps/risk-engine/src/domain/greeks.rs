//! Option Greeks value object.

use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Option sensitivities for a single contract (per share).
///
/// Greeks are plain `f64` values: they come out of the Black-Scholes model or
/// a live provider's analytics, not out of ledger arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta - price sensitivity to the underlying.
    pub delta: f64,
    /// Gamma - rate of change of delta.
    pub gamma: f64,
    /// Theta - time decay per calendar day.
    pub theta: f64,
    /// Vega - price sensitivity per 1% volatility move.
    pub vega: f64,
}

impl Greeks {
    /// Create new Greeks.
    #[must_use]
    pub const fn new(delta: f64, gamma: f64, theta: f64, vega: f64) -> Self {
        Self {
            delta,
            gamma,
            theta,
            vega,
        }
    }

    /// Zero Greeks.
    pub const ZERO: Self = Self {
        delta: 0.0,
        gamma: 0.0,
        theta: 0.0,
        vega: 0.0,
    };

    /// Scale by a factor (contracts × multiplier, direction sign).
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            theta: self.theta * factor,
            vega: self.vega * factor,
        }
    }
}

impl Add for Greeks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            delta: self.delta + rhs.delta,
            gamma: self.gamma + rhs.gamma,
            theta: self.theta + rhs.theta,
            vega: self.vega + rhs.vega,
        }
    }
}
