//! Mock quote provider for testing.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::OptionSymbol;

use super::provider::{LiveOptionQuote, ProviderError, QuoteProviderPort, StockQuote};

/// In-memory quote provider for tests and offline development.
#[derive(Debug, Default)]
pub struct MockQuoteProvider {
    stock_quotes: RwLock<HashMap<String, StockQuote>>,
    option_quotes: RwLock<HashMap<String, LiveOptionQuote>>,
}

impl MockQuoteProvider {
    /// Create an empty mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stock quote for a symbol.
    pub fn set_stock_price(&self, symbol: &str, price: Decimal) {
        let mut quotes = self
            .stock_quotes
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        quotes.insert(
            symbol.to_string(),
            StockQuote {
                symbol: symbol.to_string(),
                price,
                name: None,
                beta: None,
            },
        );
    }

    /// Set a full stock quote.
    pub fn set_stock_quote(&self, quote: StockQuote) {
        let mut quotes = self
            .stock_quotes
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        quotes.insert(quote.symbol.clone(), quote);
    }

    /// Set the live quote for an option symbol.
    pub fn set_option_quote(&self, symbol: &OptionSymbol, quote: LiveOptionQuote) {
        let mut quotes = self
            .option_quotes
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        quotes.insert(symbol.to_occ(), quote);
    }
}

#[async_trait]
impl QuoteProviderPort for MockQuoteProvider {
    async fn option_quote(&self, symbol: &OptionSymbol) -> Result<LiveOptionQuote, ProviderError> {
        let quotes = self
            .option_quotes
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        quotes
            .get(&symbol.to_occ())
            .cloned()
            .ok_or_else(|| ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }

    async fn stock_quote(&self, symbol: &str) -> Result<StockQuote, ProviderError> {
        let quotes = self
            .stock_quotes
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}
