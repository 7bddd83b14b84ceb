//! Market-drop stress scenarios.
//!
//! Stock losses scale with portfolio beta; option losses scale the max-loss
//! figure by the configured stress multiplier to approximate convexity and
//! volatility-spike effects on short legs.

use rust_decimal::Decimal;

use crate::config::RiskConfig;

use super::aggregator::{capped_leverage, ratio_pct};
use super::metrics::StressResult;

/// Run every configured drop scenario against the aggregated figures.
pub(crate) fn run_scenarios(
    config: &RiskConfig,
    stock_value: Decimal,
    option_max_loss: Decimal,
    portfolio_beta: Decimal,
    net_liquidation_value: Decimal,
) -> Vec<StressResult> {
    config
        .stress_drops
        .iter()
        .map(|&drop| {
            let stock_loss = stock_value * drop * portfolio_beta;
            let option_loss = option_max_loss * drop * config.stress_multiplier;
            let loss = stock_loss + option_loss;

            let equity_after = net_liquidation_value - loss;
            let exposure_after = (stock_value - stock_loss) + option_max_loss;
            let leverage_after = capped_leverage(exposure_after, equity_after, config.leverage_cap);

            StressResult {
                name: format!("market drop {}%", (drop * Decimal::ONE_HUNDRED).normalize()),
                drop,
                loss,
                equity_after,
                leverage_after,
                drawdown_pct: ratio_pct(loss, net_liquidation_value),
            }
        })
        .collect()
}
