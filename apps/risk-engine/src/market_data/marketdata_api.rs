//! Live quote provider adapter.
//!
//! Talks to a Market Data style REST API (array-shaped JSON payloads, bearer
//! token auth). Option symbols go out in OCC format; prices come back with
//! live Greeks, implied volatility, open interest and volume.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use tracing::debug;

use crate::config::MarketDataConfig;
use crate::domain::{Greeks, OptionSymbol};

use super::provider::{LiveOptionQuote, ProviderError, QuoteProviderPort, StockQuote};

/// Option quote payload. Every field is an array, even for single quotes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionQuotePayload {
    s: String,
    #[serde(default)]
    mid: Vec<Option<f64>>,
    #[serde(default)]
    last: Vec<Option<f64>>,
    #[serde(default)]
    bid: Vec<Option<f64>>,
    #[serde(default)]
    ask: Vec<Option<f64>>,
    #[serde(default)]
    delta: Vec<Option<f64>>,
    #[serde(default)]
    gamma: Vec<Option<f64>>,
    #[serde(default)]
    theta: Vec<Option<f64>>,
    #[serde(default)]
    vega: Vec<Option<f64>>,
    #[serde(default)]
    iv: Vec<Option<f64>>,
    #[serde(default)]
    open_interest: Vec<Option<i64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

/// Stock quote payload, same array shape.
#[derive(Debug, Deserialize)]
struct StockQuotePayload {
    s: String,
    #[serde(default)]
    last: Vec<Option<f64>>,
    #[serde(default)]
    ask: Vec<Option<f64>>,
    #[serde(default)]
    bid: Vec<Option<f64>>,
}

fn first(values: &[Option<f64>]) -> Option<f64> {
    values.first().copied().flatten()
}

fn first_i64(values: &[Option<i64>]) -> Option<i64> {
    values.first().copied().flatten()
}

/// Positive first element, or `None`.
fn first_positive(values: &[Option<f64>]) -> Option<f64> {
    first(values).filter(|v| *v > 0.0)
}

/// Live quote provider over HTTP.
#[derive(Debug, Clone)]
pub struct MarketDataApiProvider {
    client: Client,
    token: String,
    base_url: String,
}

impl MarketDataApiProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotConfigured`] when no API token is set and
    /// [`ProviderError::Network`] when the HTTP client cannot be built.
    pub fn new(config: &MarketDataConfig) -> Result<Self, ProviderError> {
        let token = config
            .api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::NotConfigured)?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            token,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        symbol: &str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{path}", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                message: e.to_string(),
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ProviderError::AuthenticationFailed)
            }
            StatusCode::NOT_FOUND => Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            }),
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
            status if !status.is_success() => Err(ProviderError::Network {
                message: format!("unexpected status {status}"),
            }),
            _ => response
                .json::<T>()
                .await
                .map_err(|e| ProviderError::MalformedResponse {
                    message: e.to_string(),
                }),
        }
    }

    fn decimal(value: f64) -> Result<Decimal, ProviderError> {
        Decimal::from_f64(value).ok_or_else(|| ProviderError::MalformedResponse {
            message: format!("price {value} is not representable"),
        })
    }
}

#[async_trait::async_trait]
impl QuoteProviderPort for MarketDataApiProvider {
    async fn option_quote(&self, symbol: &OptionSymbol) -> Result<LiveOptionQuote, ProviderError> {
        let occ = symbol.to_occ();
        let payload: OptionQuotePayload = self
            .get(&format!("/options/quotes/{occ}/"), &occ)
            .await?;

        if payload.s != "ok" {
            return Err(ProviderError::MalformedResponse {
                message: format!("response status {}", payload.s),
            });
        }

        // Price preference: mid, then last, then bid/ask average.
        let price = first_positive(&payload.mid)
            .or_else(|| first_positive(&payload.last))
            .or_else(|| match (first_positive(&payload.bid), first_positive(&payload.ask)) {
                (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
                _ => None,
            })
            .ok_or_else(|| ProviderError::MalformedResponse {
                message: format!("no usable price for {occ}"),
            })?;

        let greeks = Greeks::new(
            first(&payload.delta).unwrap_or(0.0),
            first(&payload.gamma).unwrap_or(0.0),
            first(&payload.theta).unwrap_or(0.0),
            first(&payload.vega).unwrap_or(0.0),
        );

        debug!(symbol = %symbol, occ = %occ, price, "fetched live option quote");

        Ok(LiveOptionQuote {
            price: Self::decimal(price)?,
            greeks,
            implied_volatility: first(&payload.iv),
            open_interest: first_i64(&payload.open_interest),
            volume: first_i64(&payload.volume),
        })
    }

    async fn stock_quote(&self, symbol: &str) -> Result<StockQuote, ProviderError> {
        let payload: StockQuotePayload = self
            .get(&format!("/stocks/quotes/{symbol}/"), symbol)
            .await?;

        if payload.s != "ok" {
            return Err(ProviderError::MalformedResponse {
                message: format!("response status {}", payload.s),
            });
        }

        // Last price, then ask, then bid, then zero.
        let price = first_positive(&payload.last)
            .or_else(|| first_positive(&payload.ask))
            .or_else(|| first_positive(&payload.bid))
            .unwrap_or(0.0);

        debug!(symbol, price, "fetched stock quote");

        Ok(StockQuote {
            symbol: symbol.to_string(),
            price: Self::decimal(price)?,
            name: None,
            beta: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> MarketDataConfig {
        MarketDataConfig {
            api_token: Some("test-token".to_string()),
            base_url: server.uri(),
            timeout_secs: 2,
            ..MarketDataConfig::default()
        }
    }

    fn aapl_call() -> OptionSymbol {
        OptionSymbol::parse("AAPL 260116C250").unwrap()
    }

    #[test]
    fn missing_token_is_not_configured() {
        let config = MarketDataConfig::default();
        assert!(matches!(
            MarketDataApiProvider::new(&config),
            Err(ProviderError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn option_quote_prefers_mid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/options/quotes/AAPL260116C00250000/"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "s": "ok",
                "mid": [12.35],
                "last": [12.10],
                "bid": [12.20],
                "ask": [12.50],
                "delta": [0.45],
                "gamma": [0.012],
                "theta": [-0.08],
                "vega": [0.31],
                "iv": [0.27],
                "openInterest": [1500],
                "volume": [230]
            })))
            .mount(&server)
            .await;

        let provider = MarketDataApiProvider::new(&config_for(&server)).unwrap();
        let quote = provider.option_quote(&aapl_call()).await.unwrap();

        assert_eq!(quote.price, dec!(12.35));
        assert_eq!(quote.greeks.delta, 0.45);
        assert_eq!(quote.implied_volatility, Some(0.27));
        assert_eq!(quote.open_interest, Some(1500));
    }

    #[tokio::test]
    async fn option_quote_falls_back_to_bid_ask_average() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/options/quotes/AAPL260116C00250000/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "s": "ok",
                "mid": [0.0],
                "last": [null],
                "bid": [12.0],
                "ask": [13.0],
                "delta": [0.45],
                "gamma": [0.012],
                "theta": [-0.08],
                "vega": [0.31]
            })))
            .mount(&server)
            .await;

        let provider = MarketDataApiProvider::new(&config_for(&server)).unwrap();
        let quote = provider.option_quote(&aapl_call()).await.unwrap();

        assert_eq!(quote.price, dec!(12.5));
        assert_eq!(quote.implied_volatility, None);
    }

    #[tokio::test]
    async fn option_quote_with_no_price_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/options/quotes/AAPL260116C00250000/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "s": "ok",
                "mid": [],
                "delta": [0.45]
            })))
            .mount(&server)
            .await;

        let provider = MarketDataApiProvider::new(&config_for(&server)).unwrap();
        let result = provider.option_quote(&aapl_call()).await;

        assert!(matches!(
            result,
            Err(ProviderError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn auth_failure_maps_to_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = MarketDataApiProvider::new(&config_for(&server)).unwrap();
        let result = provider.option_quote(&aapl_call()).await;

        assert!(matches!(result, Err(ProviderError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn unknown_symbol_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = MarketDataApiProvider::new(&config_for(&server)).unwrap();
        let result = provider.stock_quote("ZZZZ").await;

        assert!(matches!(result, Err(ProviderError::SymbolNotFound { .. })));
    }

    #[tokio::test]
    async fn stock_quote_falls_back_to_ask_then_bid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stocks/quotes/AMZN/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "s": "ok",
                "last": [null],
                "ask": [230.10],
                "bid": [229.90]
            })))
            .mount(&server)
            .await;

        let provider = MarketDataApiProvider::new(&config_for(&server)).unwrap();
        let quote = provider.stock_quote("AMZN").await.unwrap();

        assert_eq!(quote.price, dec!(230.10));
    }

    #[tokio::test]
    async fn stock_quote_with_no_fields_is_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stocks/quotes/AMZN/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "s": "ok" })))
            .mount(&server)
            .await;

        let provider = MarketDataApiProvider::new(&config_for(&server)).unwrap();
        let quote = provider.stock_quote("AMZN").await.unwrap();

        assert_eq!(quote.price, Decimal::ZERO);
    }
}
