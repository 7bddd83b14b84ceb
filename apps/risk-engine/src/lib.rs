// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Portfolio Risk & Option Greeks Engine
//!
//! Library core of a brokerage-account risk dashboard. The engine receives a
//! portfolio snapshot plus configuration and returns structured risk and
//! Greeks results; persistence, authentication, and the HTTP surface are the
//! caller's business, consumed only through narrow ports.
//!
//! # Components
//!
//! - **`pricing`**: closed-form Black-Scholes pricing and Greeks. Pure
//!   functions, no I/O.
//! - **`market_data`**: the quote gateway. Tries the live provider first,
//!   sanity-checks the result, and falls back to the pricing model, so the
//!   engine works with zero external dependencies configured. Per-position
//!   fetches fan out concurrently; a failed leg degrades to its last known
//!   price instead of aborting the refresh.
//! - **`validation`**: price sanity bounds (intrinsic value, time value,
//!   moneyness) applied before a live price is accepted.
//! - **`risk`**: folds stock and option holdings into portfolio metrics -
//!   leverage, beta, concentration, margin, liquidity, unrealized P&L,
//!   aggregated Greeks, classification, and stress scenarios.
//! - **`rollover`**: the all-or-nothing ledger for closing one option
//!   position and opening its replacement with locked-in realized P&L.
//!
//! # Degraded outputs over failures
//!
//! Nothing in this crate is fatal to the surrounding process: provider
//! failures trigger the analytical fallback, unevaluable validations degrade
//! to warnings, and degenerate aggregations (zero equity) produce sentinel
//! values rather than NaN. The one hard-failure path is the rollover ledger,
//! where partial application would corrupt realized-P&L history.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Engine configuration.
pub mod config;

/// Domain value objects.
pub mod domain;

/// Market data gateway and providers.
pub mod market_data;

/// Option pricing model.
pub mod pricing;

/// Portfolio risk aggregation.
pub mod risk;

/// Rollover ledger.
pub mod rollover;

/// Price sanity validation.
pub mod validation;

// Re-exports
pub use config::{EngineConfig, MarketDataConfig, PricingConfig, RiskConfig, ValidationConfig};
pub use domain::{
    Direction, Greeks, OptionPosition, OptionSymbol, OptionType, PortfolioSnapshot, PositionStatus,
    StockPosition,
};
pub use market_data::{
    MarketDataApiProvider, MarketDataGateway, MockQuoteProvider, QuoteProviderPort, QuoteSource,
    RefreshReport,
};
pub use pricing::{ModelQuote, PricingError, price_and_greeks, years_to_expiry};
pub use risk::{RiskAggregator, RiskLevel, RiskMetrics};
pub use rollover::{
    HoldingsStore, InMemoryHoldingsStore, NewPositionSpec, RolloverLedger, RolloverRecord,
    RolloverRequest,
};
pub use validation::{PriceValidator, PriceVerdict};
