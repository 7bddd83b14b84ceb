//! Portfolio risk metric types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Greeks;

/// Overall portfolio risk classification.
///
/// Ordered by severity: the aggregator reports the worst predicate that
/// fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Low risk.
    Green,
    /// Medium risk.
    Yellow,
    /// High risk.
    Red,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Green => write!(f, "GREEN"),
            Self::Yellow => write!(f, "YELLOW"),
            Self::Red => write!(f, "RED"),
        }
    }
}

/// Outcome of one simulated market-drop scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressResult {
    /// Scenario label (e.g. "market drop 20%").
    pub name: String,
    /// Simulated market drop as a fraction.
    pub drop: Decimal,
    /// Estimated portfolio loss.
    pub loss: Decimal,
    /// Equity remaining after the loss.
    pub equity_after: Decimal,
    /// Leverage ratio after the drop, capped at the configured sentinel.
    pub leverage_after: Decimal,
    /// Loss as a percentage of current net liquidation value.
    pub drawdown_pct: Decimal,
}

/// Portfolio-level risk metrics.
///
/// Recomputed on demand from a snapshot; the engine never persists these or
/// mutates the holdings they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// (stock value + option max loss) / net liquidation value. Uses max
    /// loss rather than market value so short-option risk is not
    /// underrepresented.
    pub leverage_ratio: Decimal,
    /// (stock value + |option market value|) / net liquidation value,
    /// reported alongside for reference.
    pub market_leverage_ratio: Decimal,
    /// Value-weighted average stock beta.
    pub portfolio_beta: Decimal,
    /// Largest single stock's share of total stock value (%).
    pub max_concentration: Decimal,
    /// Symbol holding that largest share.
    pub max_concentration_symbol: Option<String>,
    /// Maintenance margin requirement / net liquidation value (%).
    pub margin_usage_ratio: Decimal,
    /// Net liquidation value minus maintenance margin.
    pub excess_liquidity: Decimal,
    /// Excess liquidity / net liquidation value (%).
    pub excess_liquidity_ratio: Decimal,
    /// Cash / net liquidation value (%).
    pub cash_ratio: Decimal,
    /// Total stock market value.
    pub stock_value: Decimal,
    /// Signed option market value (short legs are liabilities).
    pub option_market_value: Decimal,
    /// Total option max loss (conservative exposure).
    pub option_max_loss: Decimal,
    /// Cash + stock value + option market value.
    pub net_liquidation_value: Decimal,
    /// Estimated maintenance margin requirement.
    pub maintenance_margin: Decimal,
    /// Margin drawn, as supplied by the snapshot.
    pub margin_used: Decimal,
    /// Unrealized P&L on the stock legs.
    pub stock_unrealized_pnl: Decimal,
    /// Unrealized P&L on the option legs.
    pub option_unrealized_pnl: Decimal,
    /// Total unrealized P&L.
    pub total_unrealized_pnl: Decimal,
    /// Position-weighted portfolio Greeks (× contracts × 100, short legs
    /// negated).
    pub portfolio_greeks: Greeks,
    /// Whether any short option position is open.
    pub has_short_options: bool,
    /// Classification: worst triggered predicate.
    pub risk_level: RiskLevel,
    /// Human-readable descriptions of every triggered risk predicate.
    pub risk_factors: Vec<String>,
    /// Simulated market-drop scenarios.
    pub stress_results: Vec<StressResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_ordering() {
        assert!(RiskLevel::Green < RiskLevel::Yellow);
        assert!(RiskLevel::Yellow < RiskLevel::Red);
        assert_eq!(RiskLevel::Red.to_string(), "RED");
    }
}
