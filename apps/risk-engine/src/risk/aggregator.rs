//! Portfolio risk aggregation.
//!
//! Folds stock and option holdings into portfolio-level metrics: leverage,
//! beta, concentration, margin, liquidity, unrealized P&L, Greeks totals,
//! classification, and stress scenarios. Pure over the snapshot; only ACTIVE
//! option positions participate.

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::RiskConfig;
use crate::domain::{Greeks, OptionType, PortfolioSnapshot};

use super::metrics::{RiskLevel, RiskMetrics};
use super::stress;

/// Percentage ratio with a guarded denominator: zero when there is nothing
/// to divide by, never NaN and never a panic.
pub(crate) fn ratio_pct(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator > Decimal::ZERO {
        numerator / denominator * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Leverage ratio with the zero-equity sentinel: exposure against no equity
/// reports the cap rather than infinity.
pub(crate) fn capped_leverage(exposure: Decimal, equity: Decimal, cap: Decimal) -> Decimal {
    if equity > Decimal::ZERO {
        (exposure / equity).min(cap)
    } else if exposure > Decimal::ZERO {
        cap
    } else {
        Decimal::ZERO
    }
}

/// Computes portfolio risk metrics from a snapshot.
#[derive(Debug, Clone, Default)]
pub struct RiskAggregator {
    config: RiskConfig,
}

impl RiskAggregator {
    /// Create an aggregator with the given configuration.
    #[must_use]
    pub const fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Compute risk metrics for the snapshot.
    ///
    /// Never mutates the input; recompute on demand after each refresh.
    #[must_use]
    pub fn compute(&self, snapshot: &PortfolioSnapshot) -> RiskMetrics {
        let config = &self.config;

        // Stock folds
        let mut stock_value = Decimal::ZERO;
        let mut weighted_beta_sum = Decimal::ZERO;
        let mut stock_unrealized_pnl = Decimal::ZERO;
        let mut max_stock_value = Decimal::ZERO;
        let mut max_concentration_symbol: Option<String> = None;

        for stock in &snapshot.stocks {
            let value = stock.market_value();
            stock_value += value;
            weighted_beta_sum += value * stock.beta_or_default();
            stock_unrealized_pnl += stock.unrealized_pnl();

            if value > max_stock_value {
                max_stock_value = value;
                max_concentration_symbol = Some(stock.symbol.clone());
            }
        }

        let portfolio_beta = if stock_value > Decimal::ZERO {
            weighted_beta_sum / stock_value
        } else {
            Decimal::ZERO
        };
        let max_concentration = ratio_pct(max_stock_value, stock_value);

        // Option folds (ACTIVE positions only)
        let mut option_market_value = Decimal::ZERO;
        let mut option_max_loss = Decimal::ZERO;
        let mut option_unrealized_pnl = Decimal::ZERO;
        let mut option_maintenance = Decimal::ZERO;
        let mut portfolio_greeks = Greeks::ZERO;
        let mut has_short_options = false;

        for option in snapshot.active_options() {
            option_market_value += option.market_value();
            option_unrealized_pnl += option.unrealized_pnl();

            let shares = option.share_count();
            if option.is_short() {
                has_short_options = true;

                // Conservative worst case: assignment on a worthless
                // underlying for puts, the bounded proxy for naked calls.
                option_max_loss += match option.option_type() {
                    OptionType::Put => option.strike() * shares,
                    OptionType::Call => config.naked_call_multiplier * option.strike() * shares,
                };

                // Short-leg maintenance, mirrored for puts and calls around
                // the reference price (held underlying's spot, else strike).
                let reference = snapshot
                    .spot_for(option.underlying())
                    .unwrap_or_else(|| option.strike());
                let per_share = match option.option_type() {
                    OptionType::Put => {
                        let otm = (option.strike() - reference).max(Decimal::ZERO);
                        (option.strike() * config.short_option_margin_ratio)
                            .max(option.strike() - otm)
                    }
                    OptionType::Call => {
                        let itm = (reference - option.strike()).max(Decimal::ZERO);
                        (reference * config.short_option_margin_ratio).max(reference + itm)
                    }
                };
                option_maintenance += per_share * shares;
            } else {
                // Long options risk the premium paid and carry no
                // maintenance requirement.
                option_max_loss += option.cost_price * shares;
            }

            if let Some(greeks) = option.greeks {
                let sign = if option.is_short() { -1.0 } else { 1.0 };
                let factor = f64::from(option.contracts) * 100.0 * sign;
                portfolio_greeks = portfolio_greeks + greeks.scale(factor);
            }
        }

        let net_liquidation_value = snapshot.cash_balance + stock_value + option_market_value;

        let leverage_ratio = capped_leverage(
            stock_value + option_max_loss,
            net_liquidation_value,
            config.leverage_cap,
        );
        let market_leverage_ratio = capped_leverage(
            stock_value + option_market_value.abs(),
            net_liquidation_value,
            config.leverage_cap,
        );

        let maintenance_margin = stock_value * config.stock_maintenance_ratio + option_maintenance;
        let margin_usage_ratio = ratio_pct(maintenance_margin, net_liquidation_value);
        let excess_liquidity = net_liquidation_value - maintenance_margin;
        let excess_liquidity_ratio = ratio_pct(excess_liquidity, net_liquidation_value);
        let cash_ratio = ratio_pct(snapshot.cash_balance, net_liquidation_value);

        let (risk_level, risk_factors) = self.classify(
            leverage_ratio,
            max_concentration,
            max_concentration_symbol.as_deref(),
            excess_liquidity_ratio,
            net_liquidation_value,
            has_short_options,
        );

        let stress_results = stress::run_scenarios(
            config,
            stock_value,
            option_max_loss,
            portfolio_beta,
            net_liquidation_value,
        );

        debug!(
            %net_liquidation_value,
            %leverage_ratio,
            risk_level = %risk_level,
            "computed risk metrics"
        );

        RiskMetrics {
            leverage_ratio,
            market_leverage_ratio,
            portfolio_beta,
            max_concentration,
            max_concentration_symbol,
            margin_usage_ratio,
            excess_liquidity,
            excess_liquidity_ratio,
            cash_ratio,
            stock_value,
            option_market_value,
            option_max_loss,
            net_liquidation_value,
            maintenance_margin,
            margin_used: snapshot.margin_used,
            stock_unrealized_pnl,
            option_unrealized_pnl,
            total_unrealized_pnl: stock_unrealized_pnl + option_unrealized_pnl,
            portfolio_greeks,
            has_short_options,
            risk_level,
            risk_factors,
            stress_results,
        }
    }

    /// Evaluate the classification predicates. High-risk predicates run
    /// first; the reported level is the worst that fired, and every
    /// triggered predicate lands in the factor list.
    fn classify(
        &self,
        leverage_ratio: Decimal,
        max_concentration: Decimal,
        max_concentration_symbol: Option<&str>,
        excess_liquidity_ratio: Decimal,
        net_liquidation_value: Decimal,
        has_short_options: bool,
    ) -> (RiskLevel, Vec<String>) {
        let config = &self.config;
        let mut level = RiskLevel::Green;
        let mut factors = Vec::new();

        if leverage_ratio >= config.red_leverage {
            level = RiskLevel::Red;
            factors.push(format!(
                "leverage ratio {} at or above {}",
                leverage_ratio.round_dp(2),
                config.red_leverage
            ));
        }
        if max_concentration > config.red_concentration_pct {
            level = RiskLevel::Red;
            factors.push(format!(
                "single position ({}) above {}% of stock value",
                max_concentration_symbol.unwrap_or("?"),
                config.red_concentration_pct
            ));
        }
        if net_liquidation_value > Decimal::ZERO
            && excess_liquidity_ratio < config.min_excess_liquidity_pct
        {
            level = RiskLevel::Red;
            factors.push(format!(
                "excess liquidity below {}% of net liquidation value",
                config.min_excess_liquidity_pct
            ));
        }
        if has_short_options {
            level = RiskLevel::Red;
            factors.push("short option positions in use".to_string());
        }

        if level < RiskLevel::Red {
            if leverage_ratio >= config.yellow_leverage {
                level = RiskLevel::Yellow;
                factors.push(format!(
                    "leverage ratio {} at or above {}",
                    leverage_ratio.round_dp(2),
                    config.yellow_leverage
                ));
            }
            if max_concentration > config.yellow_concentration_pct {
                level = RiskLevel::Yellow;
                factors.push(format!(
                    "single position ({}) above {}% of stock value",
                    max_concentration_symbol.unwrap_or("?"),
                    config.yellow_concentration_pct
                ));
            }
        }

        (level, factors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, OptionPosition, OptionSymbol, StockPosition};
    use rust_decimal_macros::dec;

    fn aggregator() -> RiskAggregator {
        RiskAggregator::default()
    }

    /// The reference portfolio: $14,400 cash, 30 AMZN at $230 (cost $225,
    /// beta 1.2), one short $450 put at $10 (cost $15).
    fn reference_snapshot() -> PortfolioSnapshot {
        let mut snapshot = PortfolioSnapshot::new(dec!(14400), Decimal::ZERO);
        snapshot.stocks.push(
            StockPosition::new("AMZN", 30, dec!(225))
                .with_current_price(dec!(230))
                .with_beta(dec!(1.2)),
        );
        snapshot.options.push(
            OptionPosition::new(
                OptionSymbol::parse("AMZN 250815P450").unwrap(),
                Direction::Sell,
                1,
                dec!(15),
            )
            .unwrap()
            .with_current_price(dec!(10)),
        );
        snapshot
    }

    #[test]
    fn reference_portfolio_metrics() {
        let metrics = aggregator().compute(&reference_snapshot());

        assert_eq!(metrics.stock_value, dec!(6900));
        assert_eq!(metrics.option_market_value, dec!(-1000));
        assert_eq!(metrics.option_max_loss, dec!(45000));
        assert_eq!(metrics.net_liquidation_value, dec!(20300));
        // (6900 + 45000) / 20300
        assert_eq!(metrics.leverage_ratio.round_dp(2), dec!(2.56));
        assert_eq!(metrics.market_leverage_ratio.round_dp(2), dec!(0.39));
        assert_eq!(metrics.portfolio_beta, dec!(1.2));
        assert_eq!(metrics.max_concentration, dec!(100));
        assert_eq!(metrics.max_concentration_symbol.as_deref(), Some("AMZN"));
        assert_eq!(metrics.stock_unrealized_pnl, dec!(150));
        assert_eq!(metrics.option_unrealized_pnl, dec!(500));
        assert_eq!(metrics.total_unrealized_pnl, dec!(650));
        assert!(metrics.has_short_options);
        assert_eq!(metrics.risk_level, RiskLevel::Red);
        assert_eq!(metrics.stress_results.len(), 3);
    }

    #[test]
    fn reference_portfolio_maintenance_margin() {
        let metrics = aggregator().compute(&reference_snapshot());

        // Stock leg: 6900 × 0.25 = 1725. Short put: reference is the held
        // AMZN spot (230); max(450 × 0.20, 450 - (450 - 230)) = 230/share.
        assert_eq!(metrics.maintenance_margin, dec!(1725) + dec!(23000));
        assert!(metrics.excess_liquidity < Decimal::ZERO);
    }

    #[test]
    fn all_cash_portfolio_is_green() {
        let snapshot = PortfolioSnapshot::new(dec!(14400), Decimal::ZERO);
        let metrics = aggregator().compute(&snapshot);

        assert_eq!(metrics.leverage_ratio, Decimal::ZERO);
        assert_eq!(metrics.portfolio_beta, Decimal::ZERO);
        assert_eq!(metrics.cash_ratio, dec!(100));
        assert_eq!(metrics.risk_level, RiskLevel::Green);
        assert!(metrics.risk_factors.is_empty());
        assert!(metrics.stress_results.iter().all(|r| r.loss == Decimal::ZERO));
    }

    #[test]
    fn zero_equity_reports_capped_leverage_not_nan() {
        // Cash exactly offset by the short option liability: NLV = 0
        let mut snapshot = PortfolioSnapshot::new(dec!(1000), Decimal::ZERO);
        snapshot.options.push(
            OptionPosition::new(
                OptionSymbol::parse("XYZ 250919P50").unwrap(),
                Direction::Sell,
                1,
                dec!(8),
            )
            .unwrap()
            .with_current_price(dec!(10)),
        );

        let metrics = aggregator().compute(&snapshot);

        assert_eq!(metrics.net_liquidation_value, Decimal::ZERO);
        assert_eq!(metrics.option_max_loss, dec!(5000));
        assert_eq!(metrics.leverage_ratio, dec!(999));
        assert_eq!(metrics.risk_level, RiskLevel::Red);
    }

    #[test]
    fn any_short_option_forces_red() {
        // Plenty of cash, tiny short call: every other predicate is green
        let mut snapshot = PortfolioSnapshot::new(dec!(1_000_000), Decimal::ZERO);
        snapshot.options.push(
            OptionPosition::new(
                OptionSymbol::parse("XYZ 250919C10").unwrap(),
                Direction::Sell,
                1,
                dec!(0.50),
            )
            .unwrap()
            .with_current_price(dec!(0.10)),
        );

        let metrics = aggregator().compute(&snapshot);

        assert!(metrics.leverage_ratio < dec!(0.01));
        assert_eq!(metrics.risk_level, RiskLevel::Red);
        assert_eq!(
            metrics.risk_factors,
            vec!["short option positions in use".to_string()]
        );
    }

    #[test]
    fn moderate_leverage_is_yellow() {
        // Five equal stocks on margin: leverage 1.2, concentration 20%
        let mut snapshot = PortfolioSnapshot::new(dec!(-2000), Decimal::ZERO);
        for symbol in ["AAA", "BBB", "CCC", "DDD", "EEE"] {
            snapshot.stocks.push(
                StockPosition::new(symbol, 10, dec!(240)).with_current_price(dec!(240)),
            );
        }

        let metrics = aggregator().compute(&snapshot);

        assert_eq!(metrics.net_liquidation_value, dec!(10000));
        assert_eq!(metrics.leverage_ratio, dec!(1.2));
        assert_eq!(metrics.max_concentration, dec!(20));
        assert_eq!(metrics.risk_level, RiskLevel::Yellow);
        // Leverage and concentration predicates both fired
        assert_eq!(metrics.risk_factors.len(), 2);
    }

    #[test]
    fn long_option_max_loss_is_premium_paid() {
        let mut snapshot = PortfolioSnapshot::new(dec!(50_000), Decimal::ZERO);
        snapshot.options.push(
            OptionPosition::new(
                OptionSymbol::parse("AAPL 251219C200").unwrap(),
                Direction::Buy,
                2,
                dec!(5),
            )
            .unwrap()
            .with_current_price(dec!(6)),
        );

        let metrics = aggregator().compute(&snapshot);

        // 5 × 2 × 100
        assert_eq!(metrics.option_max_loss, dec!(1000));
        assert_eq!(metrics.option_market_value, dec!(1200));
        assert!(!metrics.has_short_options);
        assert_eq!(metrics.risk_level, RiskLevel::Green);
    }

    #[test]
    fn naked_call_uses_strike_multiple() {
        let mut snapshot = PortfolioSnapshot::new(dec!(500_000), Decimal::ZERO);
        snapshot.options.push(
            OptionPosition::new(
                OptionSymbol::parse("TSLA 250919C300").unwrap(),
                Direction::Sell,
                2,
                dec!(12),
            )
            .unwrap()
            .with_current_price(dec!(14)),
        );

        let metrics = aggregator().compute(&snapshot);

        // 3 × 300 × 2 × 100
        assert_eq!(metrics.option_max_loss, dec!(180_000));
    }

    #[test]
    fn portfolio_greeks_negate_short_legs() {
        let mut snapshot = PortfolioSnapshot::new(dec!(100_000), Decimal::ZERO);

        let mut long_call = OptionPosition::new(
            OptionSymbol::parse("AAPL 251219C200").unwrap(),
            Direction::Buy,
            2,
            dec!(5),
        )
        .unwrap()
        .with_current_price(dec!(6));
        long_call.greeks = Some(Greeks::new(0.50, 0.010, -0.05, 0.30));

        let mut short_put = OptionPosition::new(
            OptionSymbol::parse("AAPL 251219P180").unwrap(),
            Direction::Sell,
            1,
            dec!(4),
        )
        .unwrap()
        .with_current_price(dec!(3));
        short_put.greeks = Some(Greeks::new(-0.40, 0.008, -0.04, 0.25));

        snapshot.options.push(long_call);
        snapshot.options.push(short_put);

        let metrics = aggregator().compute(&snapshot);

        // 0.50 × 200 + (-0.40) × 100 × (-1) = 100 + 40
        assert!((metrics.portfolio_greeks.delta - 140.0).abs() < 1e-9);
        // -0.05 × 200 + (-0.04) × 100 × (-1) = -10 + 4
        assert!((metrics.portfolio_greeks.theta + 6.0).abs() < 1e-9);
    }

    #[test]
    fn rolled_positions_do_not_contribute() {
        let mut snapshot = reference_snapshot();
        for option in &mut snapshot.options {
            option.status = crate::domain::PositionStatus::Rolled;
        }

        let metrics = aggregator().compute(&snapshot);

        assert_eq!(metrics.option_market_value, Decimal::ZERO);
        assert_eq!(metrics.option_max_loss, Decimal::ZERO);
        assert!(!metrics.has_short_options);
    }

    #[test]
    fn compute_does_not_mutate_snapshot() {
        let snapshot = reference_snapshot();
        let before = snapshot.clone();
        let _ = aggregator().compute(&snapshot);
        assert_eq!(snapshot.options, before.options);
        assert_eq!(snapshot.stocks, before.stocks);
    }
}
