//! Stock and option position value objects and the portfolio snapshot.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::greeks::Greeks;
use super::symbol::OptionSymbol;

/// Shares per equity option contract.
pub const CONTRACT_MULTIPLIER: Decimal = dec!(100);

/// Option right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionType {
    /// Call option (right to buy).
    Call,
    /// Put option (right to sell).
    Put,
}

impl OptionType {
    /// Single-letter code used in OCC symbols.
    #[must_use]
    pub const fn occ_code(self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Position direction. The contract count stays positive; direction carries
/// the sign semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Long (premium paid).
    Buy,
    /// Short (premium received).
    Sell,
}

impl Direction {
    /// True for short positions.
    #[must_use]
    pub const fn is_short(self) -> bool {
        matches!(self, Self::Sell)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle status of an option position.
///
/// Only ACTIVE positions participate in risk aggregation by default; CLOSED
/// and ROLLED are terminal and kept for history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    /// Open position.
    Active,
    /// Closed by the user.
    Closed,
    /// Closed as the old leg of a rollover.
    Rolled,
}

impl PositionStatus {
    /// Terminal statuses never return to aggregation.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Errors from position construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    /// Contract count must be positive.
    #[error("option position requires at least one contract")]
    InvalidContracts,

    /// Cost price must not be negative.
    #[error("cost price must not be negative: {price}")]
    InvalidCostPrice {
        /// The offending price.
        price: Decimal,
    },
}

/// A stock holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPosition {
    /// Position id.
    pub id: Uuid,
    /// Ticker.
    pub symbol: String,
    /// Display name, when the quote provider supplies one.
    pub name: Option<String>,
    /// Share count (may be zero, never negative).
    pub quantity: u32,
    /// Average cost per share.
    pub cost_price: Decimal,
    /// Latest market price; `None` until the first refresh.
    pub current_price: Option<Decimal>,
    /// Equity beta; 1.0 is assumed when unknown.
    pub beta: Option<Decimal>,
}

impl StockPosition {
    /// Create a stock position with no market data yet.
    #[must_use]
    pub fn new(symbol: impl Into<String>, quantity: u32, cost_price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            name: None,
            quantity,
            cost_price,
            current_price: None,
            beta: None,
        }
    }

    /// Set the current market price.
    #[must_use]
    pub const fn with_current_price(mut self, price: Decimal) -> Self {
        self.current_price = Some(price);
        self
    }

    /// Set the equity beta.
    #[must_use]
    pub const fn with_beta(mut self, beta: Decimal) -> Self {
        self.beta = Some(beta);
        self
    }

    /// Market value (zero until the first price refresh).
    #[must_use]
    pub fn market_value(&self) -> Decimal {
        self.current_price.unwrap_or(Decimal::ZERO) * Decimal::from(self.quantity)
    }

    /// Unrealized P&L; zero while no market price is known.
    #[must_use]
    pub fn unrealized_pnl(&self) -> Decimal {
        self.current_price.map_or(Decimal::ZERO, |current| {
            (current - self.cost_price) * Decimal::from(self.quantity)
        })
    }

    /// Beta, defaulting to 1.0 when the provider had none.
    #[must_use]
    pub fn beta_or_default(&self) -> Decimal {
        self.beta.unwrap_or(Decimal::ONE)
    }
}

/// An option holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPosition {
    /// Position id.
    pub id: Uuid,
    /// Parsed option symbol (underlying, expiration, right, strike).
    pub symbol: OptionSymbol,
    /// Long or short.
    pub direction: Direction,
    /// Contract count (always positive).
    pub contracts: u32,
    /// Premium paid/received per share.
    pub cost_price: Decimal,
    /// Latest market price per share; `None` until the first refresh.
    pub current_price: Option<Decimal>,
    /// Latest Greeks; `None` until computed.
    pub greeks: Option<Greeks>,
    /// Latest implied volatility (annualized); `None` until observed.
    pub implied_volatility: Option<f64>,
    /// Lifecycle status.
    pub status: PositionStatus,
}

impl OptionPosition {
    /// Create an ACTIVE option position.
    ///
    /// # Errors
    ///
    /// Rejects a zero contract count or a negative cost price.
    pub fn new(
        symbol: OptionSymbol,
        direction: Direction,
        contracts: u32,
        cost_price: Decimal,
    ) -> Result<Self, PositionError> {
        if contracts == 0 {
            return Err(PositionError::InvalidContracts);
        }
        if cost_price < Decimal::ZERO {
            return Err(PositionError::InvalidCostPrice { price: cost_price });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            symbol,
            direction,
            contracts,
            cost_price,
            current_price: None,
            greeks: None,
            implied_volatility: None,
            status: PositionStatus::Active,
        })
    }

    /// Set the current market price.
    #[must_use]
    pub const fn with_current_price(mut self, price: Decimal) -> Self {
        self.current_price = Some(price);
        self
    }

    /// Underlying ticker.
    #[must_use]
    pub fn underlying(&self) -> &str {
        self.symbol.underlying()
    }

    /// Call or put.
    #[must_use]
    pub const fn option_type(&self) -> OptionType {
        self.symbol.option_type()
    }

    /// Strike price.
    #[must_use]
    pub const fn strike(&self) -> Decimal {
        self.symbol.strike()
    }

    /// Expiration date.
    #[must_use]
    pub const fn expiration(&self) -> NaiveDate {
        self.symbol.expiration()
    }

    /// True for short positions.
    #[must_use]
    pub const fn is_short(&self) -> bool {
        self.direction.is_short()
    }

    /// Calendar days until expiration (negative once expired).
    #[must_use]
    pub fn days_to_expiry(&self, as_of: NaiveDate) -> i64 {
        (self.expiration() - as_of).num_days()
    }

    /// Contract count × multiplier as a decimal.
    #[must_use]
    pub fn share_count(&self) -> Decimal {
        Decimal::from(self.contracts) * CONTRACT_MULTIPLIER
    }

    /// Signed market value: long positions are assets, short positions are
    /// liabilities. Zero until the first price refresh.
    #[must_use]
    pub fn market_value(&self) -> Decimal {
        self.current_price.map_or(Decimal::ZERO, |price| {
            let gross = price * self.share_count();
            match self.direction {
                Direction::Buy => gross,
                Direction::Sell => -gross,
            }
        })
    }

    /// Unrealized P&L; zero while no market price is known.
    #[must_use]
    pub fn unrealized_pnl(&self) -> Decimal {
        self.current_price.map_or(Decimal::ZERO, |current| {
            let per_share = match self.direction {
                Direction::Buy => current - self.cost_price,
                Direction::Sell => self.cost_price - current,
            };
            per_share * self.share_count()
        })
    }
}

/// Holdings and cash figures for one portfolio, the unit of aggregation.
///
/// The snapshot is an input: the engine reads it and returns results, it
/// never persists or mutates the caller's holdings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Cash balance.
    pub cash_balance: Decimal,
    /// Margin currently drawn.
    pub margin_used: Decimal,
    /// Stock holdings.
    pub stocks: Vec<StockPosition>,
    /// Option holdings (any status; filter with [`Self::active_options`]).
    pub options: Vec<OptionPosition>,
}

impl PortfolioSnapshot {
    /// Create an empty snapshot with cash and margin figures.
    #[must_use]
    pub fn new(cash_balance: Decimal, margin_used: Decimal) -> Self {
        Self {
            cash_balance,
            margin_used,
            stocks: Vec::new(),
            options: Vec::new(),
        }
    }

    /// Option positions that participate in live risk aggregation.
    pub fn active_options(&self) -> impl Iterator<Item = &OptionPosition> {
        self.options
            .iter()
            .filter(|o| o.status == PositionStatus::Active)
    }

    /// Option positions for risk queries; `include_all` adds CLOSED and
    /// ROLLED legs for history and audit views.
    pub fn option_positions(&self, include_all: bool) -> impl Iterator<Item = &OptionPosition> {
        self.options
            .iter()
            .filter(move |o| include_all || o.status == PositionStatus::Active)
    }

    /// Current price of a held underlying, when the snapshot has one.
    #[must_use]
    pub fn spot_for(&self, underlying: &str) -> Option<Decimal> {
        self.stocks
            .iter()
            .find(|s| s.symbol == underlying)
            .and_then(|s| s.current_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_450() -> OptionSymbol {
        OptionSymbol::parse("AMZN 250815P450").unwrap()
    }

    #[test]
    fn stock_market_value_and_pnl() {
        let stock = StockPosition::new("AMZN", 30, dec!(225))
            .with_current_price(dec!(230))
            .with_beta(dec!(1.2));

        assert_eq!(stock.market_value(), dec!(6900));
        assert_eq!(stock.unrealized_pnl(), dec!(150));
        assert_eq!(stock.beta_or_default(), dec!(1.2));
    }

    #[test]
    fn stock_without_price_is_inert() {
        let stock = StockPosition::new("AMZN", 30, dec!(225));
        assert_eq!(stock.market_value(), Decimal::ZERO);
        assert_eq!(stock.unrealized_pnl(), Decimal::ZERO);
        assert_eq!(stock.beta_or_default(), Decimal::ONE);
    }

    #[test]
    fn option_rejects_zero_contracts() {
        let result = OptionPosition::new(put_450(), Direction::Sell, 0, dec!(15));
        assert_eq!(result.unwrap_err(), PositionError::InvalidContracts);
    }

    #[test]
    fn option_rejects_negative_cost() {
        let result = OptionPosition::new(put_450(), Direction::Buy, 1, dec!(-1));
        assert!(matches!(
            result,
            Err(PositionError::InvalidCostPrice { .. })
        ));
    }

    #[test]
    fn short_option_market_value_is_a_liability() {
        let option = OptionPosition::new(put_450(), Direction::Sell, 1, dec!(15))
            .unwrap()
            .with_current_price(dec!(10));

        assert_eq!(option.market_value(), dec!(-1000));
    }

    #[test]
    fn short_option_pnl_gains_when_price_drops() {
        let option = OptionPosition::new(put_450(), Direction::Sell, 1, dec!(15))
            .unwrap()
            .with_current_price(dec!(10));

        // (15 - 10) × 1 × 100
        assert_eq!(option.unrealized_pnl(), dec!(500));
    }

    #[test]
    fn long_option_pnl_loses_when_price_drops() {
        let option = OptionPosition::new(put_450(), Direction::Buy, 2, dec!(15))
            .unwrap()
            .with_current_price(dec!(10));

        assert_eq!(option.unrealized_pnl(), dec!(-1000));
    }

    #[test]
    fn snapshot_filters_by_status() {
        let mut snapshot = PortfolioSnapshot::new(dec!(10_000), Decimal::ZERO);
        let active = OptionPosition::new(put_450(), Direction::Sell, 1, dec!(15)).unwrap();
        let mut rolled = OptionPosition::new(put_450(), Direction::Sell, 1, dec!(20)).unwrap();
        rolled.status = PositionStatus::Rolled;

        snapshot.options.push(active);
        snapshot.options.push(rolled);

        assert_eq!(snapshot.active_options().count(), 1);
        assert_eq!(snapshot.option_positions(false).count(), 1);
        assert_eq!(snapshot.option_positions(true).count(), 2);
    }

    #[test]
    fn spot_lookup_uses_held_stock() {
        let mut snapshot = PortfolioSnapshot::new(Decimal::ZERO, Decimal::ZERO);
        snapshot
            .stocks
            .push(StockPosition::new("AMZN", 30, dec!(225)).with_current_price(dec!(230)));

        assert_eq!(snapshot.spot_for("AMZN"), Some(dec!(230)));
        assert_eq!(snapshot.spot_for("MSFT"), None);
    }

    #[test]
    fn days_to_expiry() {
        let option = OptionPosition::new(put_450(), Direction::Sell, 1, dec!(15)).unwrap();
        let as_of = NaiveDate::from_ymd_opt(2025, 8, 5).unwrap();
        assert_eq!(option.days_to_expiry(as_of), 10);
    }
}
