//! Option pricing.
//!
//! Closed-form Black-Scholes pricing and Greeks, used directly by callers
//! and as the market data gateway's analytical fallback.

mod black_scholes;

pub use black_scholes::{DAYS_PER_YEAR, ModelQuote, PricingError, price_and_greeks, years_to_expiry};
