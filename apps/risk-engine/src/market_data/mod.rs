//! Market data: quote provider port, adapters, and the two-tier gateway.

mod gateway;
mod marketdata_api;
mod mock;
mod provider;

pub use gateway::{
    GatewayError, MarketDataGateway, OptionRefresh, QuoteSource, RefreshReport, ResolvedQuote,
};
pub use marketdata_api::MarketDataApiProvider;
pub use mock::MockQuoteProvider;
pub use provider::{LiveOptionQuote, ProviderError, QuoteProviderPort, StockQuote};
