//! Market Data Gateway
//!
//! Resolves option prices and Greeks from two interchangeable sources tried
//! in priority order: a live quote provider (authoritative but rate-limited
//! and optional) and the Black-Scholes model (always available, accurate to
//! within a few percent). Live prices pass the sanity validator before they
//! are accepted; rejected or unavailable quotes fall through to the model.
//!
//! Per-position fetches are independent network round trips, so the
//! portfolio refresh fans out one task per holding and fans in before
//! aggregation. A failed leg keeps its last known price and never aborts the
//! batch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, MarketDataConfig, PricingConfig};
use crate::domain::{Greeks, OptionPosition, PortfolioSnapshot, PositionStatus, StockPosition};
use crate::pricing::{price_and_greeks, years_to_expiry};
use crate::validation::{PriceValidator, PriceVerdict};

use super::marketdata_api::MarketDataApiProvider;
use super::provider::{ProviderError, QuoteProviderPort, StockQuote};

/// Which path produced a resolved quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteSource {
    /// Live quote provider.
    Live,
    /// Analytical pricing model.
    Model,
}

impl std::fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// A resolved option quote, tagged with the path that produced it.
///
/// Both paths populate all four Greeks; only the live path may carry open
/// interest and volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedQuote {
    /// Option price per share.
    pub price: Decimal,
    /// Greeks per share.
    pub greeks: Greeks,
    /// Implied volatility: live when reported, otherwise the one the model
    /// priced with.
    pub implied_volatility: Option<f64>,
    /// Open interest (live path only).
    pub open_interest: Option<i64>,
    /// Volume (live path only).
    pub volume: Option<i64>,
    /// Source of the quote.
    pub source: QuoteSource,
}

/// Gateway errors. Reaching this means both the live source and the model
/// fallback failed; the caller keeps the position's last known price.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// No source could produce a usable quote.
    #[error("no quote available for {symbol}: {message}")]
    QuoteUnavailable {
        /// The option symbol.
        symbol: String,
        /// What failed last.
        message: String,
    },
}

/// One option leg of a refresh: the updated position and how its quote was
/// resolved (`None` when every source failed and the old price is retained).
#[derive(Debug, Clone)]
pub struct OptionRefresh {
    /// The (possibly updated) position.
    pub position: OptionPosition,
    /// Quote source, when the refresh succeeded.
    pub source: Option<QuoteSource>,
}

/// Outcome of a portfolio refresh, intended to be written back to storage by
/// the caller.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    /// Updated stock positions.
    pub stocks: Vec<StockPosition>,
    /// Updated option positions with their quote sources.
    pub options: Vec<OptionRefresh>,
    /// Stocks with a fresh price.
    pub stocks_updated: usize,
    /// Stocks left with their previous price.
    pub stocks_retained: usize,
    /// Options with a fresh price.
    pub options_updated: usize,
    /// Options left with their previous price.
    pub options_retained: usize,
    /// Options resolved from the live provider.
    pub live_quotes: usize,
    /// Options resolved from the pricing model.
    pub model_quotes: usize,
}

/// Two-tier market data gateway.
pub struct MarketDataGateway {
    provider: Option<Arc<dyn QuoteProviderPort>>,
    validator: PriceValidator,
    market_data: MarketDataConfig,
    pricing: PricingConfig,
}

impl MarketDataGateway {
    /// Create a gateway with an explicit provider (or none).
    ///
    /// The provider is injected by the caller and lives for the request
    /// scope; the gateway holds no resources across calls.
    #[must_use]
    pub fn new(config: &EngineConfig, provider: Option<Arc<dyn QuoteProviderPort>>) -> Self {
        Self {
            provider,
            validator: PriceValidator::new(config.validation.clone()),
            market_data: config.market_data.clone(),
            pricing: config.pricing.clone(),
        }
    }

    /// Create a gateway from configuration alone, wiring up the live HTTP
    /// provider when an API token is configured.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        let provider: Option<Arc<dyn QuoteProviderPort>> =
            match MarketDataApiProvider::new(&config.market_data) {
                Ok(p) => Some(Arc::new(p)),
                Err(ProviderError::NotConfigured) => {
                    info!("no live quote credential configured, using pricing model only");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "failed to build live quote provider, using pricing model only");
                    None
                }
            };

        Self::new(config, provider)
    }

    /// Resolve a quote for one option position.
    ///
    /// `spot_hint` short-circuits the underlying lookup when the caller
    /// already holds the stock with a current price.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::QuoteUnavailable`] only when the live source
    /// and the model fallback both fail (e.g. no underlying price at all).
    pub async fn option_quote(
        &self,
        position: &OptionPosition,
        spot_hint: Option<Decimal>,
        as_of: NaiveDate,
    ) -> Result<ResolvedQuote, GatewayError> {
        let symbol = &position.symbol;
        let mut live_iv: Option<f64> = None;
        let mut spot: Option<Decimal> = spot_hint.filter(|s| *s > Decimal::ZERO);

        if let Some(provider) = &self.provider {
            match provider.option_quote(symbol).await {
                Ok(quote) => {
                    if spot.is_none() {
                        spot = self.fetch_spot(symbol.underlying()).await;
                    }
                    let verdict = self.validator.validate(
                        quote.price,
                        spot,
                        symbol.strike(),
                        symbol.option_type(),
                        symbol.expiration(),
                        as_of,
                    );
                    match verdict {
                        PriceVerdict::Accepted => {
                            debug!(symbol = %symbol, price = %quote.price, "live quote accepted");
                            return Ok(ResolvedQuote {
                                price: quote.price,
                                greeks: quote.greeks,
                                implied_volatility: quote.implied_volatility,
                                open_interest: quote.open_interest,
                                volume: quote.volume,
                                source: QuoteSource::Live,
                            });
                        }
                        PriceVerdict::AcceptedWithWarning { warning } => {
                            warn!(symbol = %symbol, warning, "live quote accepted with warning");
                            return Ok(ResolvedQuote {
                                price: quote.price,
                                greeks: quote.greeks,
                                implied_volatility: quote.implied_volatility,
                                open_interest: quote.open_interest,
                                volume: quote.volume,
                                source: QuoteSource::Live,
                            });
                        }
                        PriceVerdict::Rejected { reason } => {
                            // Documented fallback, not a silent trust
                            warn!(
                                symbol = %symbol,
                                price = %quote.price,
                                %reason,
                                "live quote rejected by validator, falling back to model"
                            );
                            live_iv = quote.implied_volatility;
                        }
                    }
                }
                Err(e) => {
                    debug!(symbol = %symbol, error = %e, "live quote unavailable, falling back to model");
                }
            }
        }

        if spot.is_none() {
            spot = self.fetch_spot(symbol.underlying()).await;
        }

        let spot = spot
            .filter(|s| *s > Decimal::ZERO)
            .ok_or_else(|| GatewayError::QuoteUnavailable {
                symbol: symbol.to_string(),
                message: "underlying price unavailable".to_string(),
            })?;

        let iv = live_iv
            .or(position.implied_volatility)
            .filter(|v| *v > 0.0)
            .unwrap_or(self.market_data.default_implied_volatility);

        let model = price_and_greeks(
            spot.to_f64().unwrap_or(0.0),
            symbol.strike().to_f64().unwrap_or(0.0),
            years_to_expiry(symbol.expiration(), as_of),
            self.pricing.risk_free_rate,
            iv,
            symbol.option_type(),
        )
        .map_err(|e| GatewayError::QuoteUnavailable {
            symbol: symbol.to_string(),
            message: e.to_string(),
        })?;

        let price =
            Decimal::from_f64(model.price).ok_or_else(|| GatewayError::QuoteUnavailable {
                symbol: symbol.to_string(),
                message: "model price not representable".to_string(),
            })?;

        debug!(symbol = %symbol, %price, iv, "priced with analytical model");

        Ok(ResolvedQuote {
            price: price.round_dp(2),
            greeks: model.greeks,
            implied_volatility: Some(iv),
            open_interest: None,
            volume: None,
            source: QuoteSource::Model,
        })
    }

    /// Refresh every holding in the snapshot concurrently.
    ///
    /// Stock quotes are fetched once per distinct symbol; option legs fan out
    /// one task each and fan in here. Failures degrade the affected position
    /// only.
    pub async fn refresh_portfolio(
        &self,
        snapshot: &PortfolioSnapshot,
        as_of: NaiveDate,
    ) -> RefreshReport {
        let mut report = RefreshReport::default();

        // Fan out one fetch per distinct stock symbol.
        let stock_quotes = self.fetch_stock_quotes(snapshot).await;

        for stock in &snapshot.stocks {
            let mut updated = stock.clone();
            if let Some(quote) = stock_quotes.get(&stock.symbol) {
                updated.current_price = Some(quote.price);
                if quote.beta.is_some() {
                    updated.beta = quote.beta;
                }
                if quote.name.is_some() {
                    updated.name = quote.name.clone();
                }
                report.stocks_updated += 1;
            } else {
                report.stocks_retained += 1;
            }
            report.stocks.push(updated);
        }

        // Fan out one task per ACTIVE option; terminal positions pass through.
        let refreshes = join_all(snapshot.options.iter().map(|position| {
            let stock_quotes = &stock_quotes;
            async move {
                if position.status != PositionStatus::Active {
                    return OptionRefresh {
                        position: position.clone(),
                        source: None,
                    };
                }

                let spot_hint = snapshot
                    .spot_for(position.underlying())
                    .or_else(|| stock_quotes.get(position.underlying()).map(|q| q.price));

                match self.option_quote(position, spot_hint, as_of).await {
                    Ok(quote) => {
                        let mut updated = position.clone();
                        updated.current_price = Some(quote.price);
                        updated.greeks = Some(quote.greeks);
                        if quote.implied_volatility.is_some() {
                            updated.implied_volatility = quote.implied_volatility;
                        }
                        OptionRefresh {
                            position: updated,
                            source: Some(quote.source),
                        }
                    }
                    Err(e) => {
                        warn!(symbol = %position.symbol, error = %e, "quote failed, keeping last known price");
                        OptionRefresh {
                            position: position.clone(),
                            source: None,
                        }
                    }
                }
            }
        }))
        .await;

        for refresh in refreshes {
            if refresh.position.status == PositionStatus::Active {
                match refresh.source {
                    Some(QuoteSource::Live) => {
                        report.live_quotes += 1;
                        report.options_updated += 1;
                    }
                    Some(QuoteSource::Model) => {
                        report.model_quotes += 1;
                        report.options_updated += 1;
                    }
                    None => report.options_retained += 1,
                }
            }
            report.options.push(refresh);
        }

        info!(
            stocks_updated = report.stocks_updated,
            stocks_retained = report.stocks_retained,
            options_updated = report.options_updated,
            options_retained = report.options_retained,
            live_quotes = report.live_quotes,
            model_quotes = report.model_quotes,
            "portfolio refresh complete"
        );

        report
    }

    /// Fetch the spot price of an underlying from the provider.
    async fn fetch_spot(&self, underlying: &str) -> Option<Decimal> {
        let provider = self.provider.as_ref()?;
        match provider.stock_quote(underlying).await {
            Ok(quote) if quote.price > Decimal::ZERO => Some(quote.price),
            Ok(_) => {
                debug!(underlying, "provider returned no usable spot price");
                None
            }
            Err(e) => {
                debug!(underlying, error = %e, "spot price fetch failed");
                None
            }
        }
    }

    /// Fetch quotes for every distinct stock symbol in the snapshot.
    async fn fetch_stock_quotes(&self, snapshot: &PortfolioSnapshot) -> HashMap<String, StockQuote> {
        let Some(provider) = &self.provider else {
            return HashMap::new();
        };

        let mut symbols: Vec<&str> = snapshot.stocks.iter().map(|s| s.symbol.as_str()).collect();
        symbols.sort_unstable();
        symbols.dedup();

        let results = join_all(symbols.iter().map(|symbol| provider.stock_quote(symbol))).await;

        let mut quotes = HashMap::new();
        for (symbol, result) in symbols.into_iter().zip(results) {
            match result {
                Ok(quote) if quote.price > Decimal::ZERO => {
                    quotes.insert(symbol.to_string(), quote);
                }
                Ok(_) => debug!(symbol, "stock quote had no usable price"),
                Err(e) => debug!(symbol, error = %e, "stock quote failed"),
            }
        }
        quotes
    }
}
