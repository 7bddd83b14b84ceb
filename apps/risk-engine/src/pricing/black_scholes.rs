//! Black-Scholes Pricing Model
//!
//! Closed-form European option pricing and Greeks from spot, strike, time,
//! volatility, and rate. Pure functions, no I/O, safe to call concurrently.
//!
//! The cumulative normal uses the Abramowitz-Stegun polynomial approximation
//! (error < 7.5e-8), so no statistics crate is needed. Accuracy against live
//! analytics is within a couple of percent, which is what the market data
//! gateway relies on when the live quote source is unavailable.

// Black-Scholes uses standard mathematical notation (s, k, t, r, sigma)
#![allow(clippy::many_single_char_names)]
#![allow(clippy::suboptimal_flops)]

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Greeks, OptionType};

/// Calendar days per year used for time-to-expiry and theta scaling.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Errors from the pricing model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// An input violated the model's domain (must be strictly positive).
    #[error("pricing input {name} must be positive, got {value}")]
    InvalidInput {
        /// Parameter name.
        name: &'static str,
        /// The offending value.
        value: f64,
    },
}

/// Theoretical price and Greeks from the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelQuote {
    /// Theoretical option price per share.
    pub price: f64,
    /// Sensitivities per share.
    pub greeks: Greeks,
}

/// Standard normal CDF via the Abramowitz-Stegun approximation.
fn norm_cdf(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.2316419 * x.abs());
    let d = 0.3989423 * (-x * x / 2.0).exp();
    let prob =
        d * t * (0.3193815 + t * (-0.3565638 + t * (1.781478 + t * (-1.821256 + t * 1.330274))));

    if x > 0.0 { 1.0 - prob } else { prob }
}

/// Standard normal PDF.
fn norm_pdf(x: f64) -> f64 {
    (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Time to expiration in years, floored at one calendar day.
///
/// Callers derive the model's `t` from an expiration date; the floor avoids
/// division by zero on (or after) expiry day.
#[must_use]
pub fn years_to_expiry(expiration: NaiveDate, as_of: NaiveDate) -> f64 {
    let days = (expiration - as_of).num_days().max(1) as f64;
    days / DAYS_PER_YEAR
}

/// Price an option and derive its Greeks.
///
/// * `s` - spot price of the underlying
/// * `k` - strike price
/// * `t` - time to expiration in years (see [`years_to_expiry`])
/// * `r` - risk-free rate (annualized)
/// * `sigma` - implied volatility (annualized)
///
/// Delta is `N(d1)` for calls and `N(d1) - 1` for puts; gamma and vega are
/// shared, with vega quoted per 1% volatility move; theta is the annualized
/// decay divided by 365 (per calendar day).
///
/// # Errors
///
/// Returns [`PricingError::InvalidInput`] if any input is not strictly
/// positive. Inputs are rejected, never clamped.
pub fn price_and_greeks(
    s: f64,
    k: f64,
    t: f64,
    r: f64,
    sigma: f64,
    option_type: OptionType,
) -> Result<ModelQuote, PricingError> {
    if !(s > 0.0) {
        return Err(PricingError::InvalidInput {
            name: "spot",
            value: s,
        });
    }
    if !(k > 0.0) {
        return Err(PricingError::InvalidInput {
            name: "strike",
            value: k,
        });
    }
    if !(t > 0.0) {
        return Err(PricingError::InvalidInput {
            name: "years_to_expiry",
            value: t,
        });
    }
    if !(sigma > 0.0) {
        return Err(PricingError::InvalidInput {
            name: "implied_vol",
            value: sigma,
        });
    }

    let sqrt_t = t.sqrt();
    let d1 = ((s / k).ln() + (r + sigma * sigma / 2.0) * t) / (sigma * sqrt_t);
    let d2 = d1 - sigma * sqrt_t;

    let pdf_d1 = norm_pdf(d1);
    let discount = (-r * t).exp();

    // Gamma and vega are shared between calls and puts; vega is per 1% move.
    let gamma = pdf_d1 / (s * sigma * sqrt_t);
    let vega = s * pdf_d1 * sqrt_t / 100.0;

    let (delta, theta, price) = match option_type {
        OptionType::Call => {
            let delta = norm_cdf(d1);
            let theta =
                (-(s * pdf_d1 * sigma) / (2.0 * sqrt_t) - r * k * discount * norm_cdf(d2))
                    / DAYS_PER_YEAR;
            let price = s * norm_cdf(d1) - k * discount * norm_cdf(d2);
            (delta, theta, price)
        }
        OptionType::Put => {
            let delta = norm_cdf(d1) - 1.0;
            let theta =
                (-(s * pdf_d1 * sigma) / (2.0 * sqrt_t) + r * k * discount * norm_cdf(-d2))
                    / DAYS_PER_YEAR;
            let price = k * discount * norm_cdf(-d2) - s * norm_cdf(-d1);
            (delta, theta, price)
        }
    };

    Ok(ModelQuote {
        price,
        greeks: Greeks::new(delta, gamma, theta, vega),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn test_norm_cdf() {
        assert!(approx_eq(norm_cdf(0.0), 0.5, 1e-6));
        assert!(approx_eq(norm_cdf(1.96), 0.975, 0.001));
        assert!(approx_eq(norm_cdf(-1.96), 0.025, 0.001));
    }

    #[test]
    fn test_atm_call_price() {
        // ATM call: S=100, K=100, T=1, r=0.05, sigma=0.20
        let quote = price_and_greeks(100.0, 100.0, 1.0, 0.05, 0.20, OptionType::Call).unwrap();
        // Expected ~ 10.45 (from Black-Scholes tables)
        assert!(approx_eq(quote.price, 10.45, 0.05));
    }

    #[test]
    fn test_atm_put_price() {
        let quote = price_and_greeks(100.0, 100.0, 1.0, 0.05, 0.20, OptionType::Put).unwrap();
        // Expected ~ 5.57 (put-call parity)
        assert!(approx_eq(quote.price, 5.57, 0.05));
    }

    #[test]
    fn test_theta_is_negative_for_long_atm_options() {
        let call = price_and_greeks(100.0, 100.0, 0.25, 0.05, 0.30, OptionType::Call).unwrap();
        let put = price_and_greeks(100.0, 100.0, 0.25, 0.05, 0.30, OptionType::Put).unwrap();
        assert!(call.greeks.theta < 0.0);
        assert!(put.greeks.theta < 0.0);
    }

    #[test]
    fn test_deep_itm_call_delta_near_one() {
        let quote = price_and_greeks(200.0, 100.0, 0.1, 0.05, 0.20, OptionType::Call).unwrap();
        assert!(quote.greeks.delta > 0.99);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        for (s, k, t, sigma) in [
            (0.0, 100.0, 1.0, 0.2),
            (-5.0, 100.0, 1.0, 0.2),
            (100.0, 0.0, 1.0, 0.2),
            (100.0, 100.0, 0.0, 0.2),
            (100.0, 100.0, 1.0, 0.0),
        ] {
            let result = price_and_greeks(s, k, t, 0.05, sigma, OptionType::Call);
            assert!(matches!(result, Err(PricingError::InvalidInput { .. })));
        }
    }

    #[test]
    fn test_years_to_expiry_floor() {
        let as_of = NaiveDate::from_ymd_opt(2025, 8, 5).unwrap();

        // 30 days out
        let t = years_to_expiry(NaiveDate::from_ymd_opt(2025, 9, 4).unwrap(), as_of);
        assert!(approx_eq(t, 30.0 / 365.0, 1e-12));

        // Expiry day and past expiry both floor at one day
        assert!(approx_eq(years_to_expiry(as_of, as_of), 1.0 / 365.0, 1e-12));
        let past = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert!(approx_eq(years_to_expiry(past, as_of), 1.0 / 365.0, 1e-12));
    }

    proptest! {
        #[test]
        fn prop_delta_bounds_and_shared_greeks(
            s in 1.0f64..500.0,
            k in 1.0f64..500.0,
            t in 0.004f64..2.0,
            r in 0.0f64..0.10,
            sigma in 0.05f64..1.5,
        ) {
            let call = price_and_greeks(s, k, t, r, sigma, OptionType::Call).unwrap();
            let put = price_and_greeks(s, k, t, r, sigma, OptionType::Put).unwrap();

            prop_assert!((0.0..=1.0).contains(&call.greeks.delta));
            prop_assert!((-1.0..=0.0).contains(&put.greeks.delta));
            prop_assert!(call.greeks.gamma >= 0.0);
            prop_assert!(call.greeks.vega >= 0.0);
            // Gamma and vega are direction-agnostic
            prop_assert!(approx_eq(call.greeks.gamma, put.greeks.gamma, 1e-12));
            prop_assert!(approx_eq(call.greeks.vega, put.greeks.vega, 1e-12));
        }

        #[test]
        fn prop_put_call_parity(
            s in 1.0f64..500.0,
            k in 1.0f64..500.0,
            t in 0.004f64..2.0,
            r in 0.0f64..0.10,
            sigma in 0.05f64..1.5,
        ) {
            let call = price_and_greeks(s, k, t, r, sigma, OptionType::Call).unwrap();
            let put = price_and_greeks(s, k, t, r, sigma, OptionType::Put).unwrap();

            // C - P = S - K·e^(-rT)
            let parity = s - k * (-r * t).exp();
            prop_assert!(approx_eq(call.price - put.price, parity, 1e-6 * s.max(k)));
        }
    }
}
