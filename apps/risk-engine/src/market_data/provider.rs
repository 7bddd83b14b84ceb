//! Quote Provider Port
//!
//! Interface for fetching stock and option quotes from an external provider.
//! This is a driven (secondary/outbound) port: the gateway depends on the
//! abstraction, adapters implement it.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Greeks, OptionSymbol};

/// Quote for an underlying stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockQuote {
    /// Ticker.
    pub symbol: String,
    /// Current price.
    pub price: Decimal,
    /// Display name, when the provider has one.
    pub name: Option<String>,
    /// Equity beta, when the provider has one.
    pub beta: Option<Decimal>,
}

/// Live option quote with Greeks.
///
/// Open interest and volume only exist on the live path; the analytical
/// fallback never fabricates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveOptionQuote {
    /// Option price per share.
    pub price: Decimal,
    /// Greeks as reported by the provider.
    pub greeks: Greeks,
    /// Implied volatility (annualized), when reported.
    pub implied_volatility: Option<f64>,
    /// Open interest, when reported.
    pub open_interest: Option<i64>,
    /// Volume, when reported.
    pub volume: Option<i64>,
}

/// Quote provider errors. All of these are recoverable from the gateway's
/// point of view: they trigger the analytical fallback, never a hard failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// No credential/endpoint configured.
    #[error("quote provider not configured")]
    NotConfigured,

    /// Network failure or timeout.
    #[error("quote provider network error: {message}")]
    Network {
        /// Error details.
        message: String,
    },

    /// Authentication failed.
    #[error("quote provider authentication failed")]
    AuthenticationFailed,

    /// Symbol unknown to the provider.
    #[error("symbol not found: {symbol}")]
    SymbolNotFound {
        /// The unknown symbol.
        symbol: String,
    },

    /// Rate limited.
    #[error("quote provider rate limited")]
    RateLimited,

    /// Response arrived but had no usable data.
    #[error("malformed provider response: {message}")]
    MalformedResponse {
        /// Error details.
        message: String,
    },
}

/// Port for fetching quotes from an external provider.
#[async_trait]
pub trait QuoteProviderPort: Send + Sync {
    /// Fetch a live option quote with Greeks.
    async fn option_quote(&self, symbol: &OptionSymbol) -> Result<LiveOptionQuote, ProviderError>;

    /// Fetch the current quote for a stock.
    async fn stock_quote(&self, symbol: &str) -> Result<StockQuote, ProviderError>;
}
