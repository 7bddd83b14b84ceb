//! Engine configuration.
//!
//! Every heuristic constant the engine uses (fallback volatility, margin
//! ratios, stress multipliers, validation thresholds) lives here as a named,
//! overridable field. Configuration loads from an optional file plus
//! `RISK_ENGINE_*` environment variables; all fields have defaults so an
//! empty configuration is fully usable.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Loading or deserializing the configuration failed.
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Market data gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// Live quote API token. When absent, the gateway skips the live source
    /// and prices everything with the analytical model.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Live quote API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds. A timeout is treated the same as
    /// "live quote unavailable" and triggers the model fallback.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Implied volatility assumed when no market IV is available.
    #[serde(default = "default_implied_volatility")]
    pub default_implied_volatility: f64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            default_implied_volatility: default_implied_volatility(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.marketdata.app/v1".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_implied_volatility() -> f64 {
    0.30
}

/// Pricing model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Risk-free rate (annualized) used by the analytical fallback.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
        }
    }
}

const fn default_risk_free_rate() -> f64 {
    0.05
}

/// Price validator thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Rounding tolerance below intrinsic value before a price is rejected.
    #[serde(default = "default_intrinsic_tolerance")]
    pub intrinsic_tolerance: Decimal,
    /// Maximum plausible time value as a fraction of spot.
    #[serde(default = "default_max_time_value_ratio")]
    pub max_time_value_ratio: Decimal,
    /// Days-to-expiry at or below which the tighter near-expiry bound applies.
    #[serde(default = "default_near_expiry_days")]
    pub near_expiry_days: i64,
    /// Maximum time value near expiry, as a fraction of spot.
    #[serde(default = "default_near_expiry_time_value_ratio")]
    pub near_expiry_time_value_ratio: Decimal,
    /// Moneyness beyond which a contract counts as far out-of-the-money.
    #[serde(default = "default_otm_moneyness_threshold")]
    pub otm_moneyness_threshold: Decimal,
    /// Maximum far-OTM price as a fraction of spot.
    #[serde(default = "default_otm_price_ratio")]
    pub otm_price_ratio: Decimal,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            intrinsic_tolerance: default_intrinsic_tolerance(),
            max_time_value_ratio: default_max_time_value_ratio(),
            near_expiry_days: default_near_expiry_days(),
            near_expiry_time_value_ratio: default_near_expiry_time_value_ratio(),
            otm_moneyness_threshold: default_otm_moneyness_threshold(),
            otm_price_ratio: default_otm_price_ratio(),
        }
    }
}

const fn default_intrinsic_tolerance() -> Decimal {
    dec!(0.01)
}

const fn default_max_time_value_ratio() -> Decimal {
    dec!(0.15)
}

const fn default_near_expiry_days() -> i64 {
    7
}

const fn default_near_expiry_time_value_ratio() -> Decimal {
    dec!(0.05)
}

const fn default_otm_moneyness_threshold() -> Decimal {
    dec!(0.05)
}

const fn default_otm_price_ratio() -> Decimal {
    dec!(0.03)
}

/// Risk aggregation configuration.
///
/// The naked-call and stress multipliers are heuristics without a published
/// derivation; they are deliberately kept as overridable fields rather than
/// recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Max-loss proxy multiplier for naked short calls (× strike).
    #[serde(default = "default_naked_call_multiplier")]
    pub naked_call_multiplier: Decimal,
    /// Stress-scenario multiplier applied to option max loss to approximate
    /// convexity and volatility-spike effects on short legs.
    #[serde(default = "default_stress_multiplier")]
    pub stress_multiplier: Decimal,
    /// Maintenance margin on the stock leg (Reg-T style flat estimate).
    #[serde(default = "default_stock_maintenance_ratio")]
    pub stock_maintenance_ratio: Decimal,
    /// Base maintenance ratio for short option legs.
    #[serde(default = "default_short_option_margin_ratio")]
    pub short_option_margin_ratio: Decimal,
    /// Sentinel reported instead of an infinite leverage ratio.
    #[serde(default = "default_leverage_cap")]
    pub leverage_cap: Decimal,
    /// Leverage at or above which the portfolio is high risk.
    #[serde(default = "default_red_leverage")]
    pub red_leverage: Decimal,
    /// Leverage at or above which the portfolio is medium risk.
    #[serde(default = "default_yellow_leverage")]
    pub yellow_leverage: Decimal,
    /// Single-position concentration (%) above which the portfolio is high risk.
    #[serde(default = "default_red_concentration_pct")]
    pub red_concentration_pct: Decimal,
    /// Single-position concentration (%) above which the portfolio is medium risk.
    #[serde(default = "default_yellow_concentration_pct")]
    pub yellow_concentration_pct: Decimal,
    /// Excess liquidity ratio (%) below which the portfolio is high risk.
    #[serde(default = "default_min_excess_liquidity_pct")]
    pub min_excess_liquidity_pct: Decimal,
    /// Market-drop fractions simulated by the stress test.
    #[serde(default = "default_stress_drops")]
    pub stress_drops: Vec<Decimal>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            naked_call_multiplier: default_naked_call_multiplier(),
            stress_multiplier: default_stress_multiplier(),
            stock_maintenance_ratio: default_stock_maintenance_ratio(),
            short_option_margin_ratio: default_short_option_margin_ratio(),
            leverage_cap: default_leverage_cap(),
            red_leverage: default_red_leverage(),
            yellow_leverage: default_yellow_leverage(),
            red_concentration_pct: default_red_concentration_pct(),
            yellow_concentration_pct: default_yellow_concentration_pct(),
            min_excess_liquidity_pct: default_min_excess_liquidity_pct(),
            stress_drops: default_stress_drops(),
        }
    }
}

const fn default_naked_call_multiplier() -> Decimal {
    dec!(3)
}

const fn default_stress_multiplier() -> Decimal {
    dec!(2.5)
}

const fn default_stock_maintenance_ratio() -> Decimal {
    dec!(0.25)
}

const fn default_short_option_margin_ratio() -> Decimal {
    dec!(0.20)
}

const fn default_leverage_cap() -> Decimal {
    dec!(999)
}

const fn default_red_leverage() -> Decimal {
    dec!(1.5)
}

const fn default_yellow_leverage() -> Decimal {
    dec!(1.0)
}

const fn default_red_concentration_pct() -> Decimal {
    dec!(20)
}

const fn default_yellow_concentration_pct() -> Decimal {
    dec!(10)
}

const fn default_min_excess_liquidity_pct() -> Decimal {
    dec!(30)
}

fn default_stress_drops() -> Vec<Decimal> {
    vec![dec!(0.10), dec!(0.20), dec!(0.30)]
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Market data gateway settings.
    #[serde(default)]
    pub market_data: MarketDataConfig,
    /// Pricing model settings.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Price validator thresholds.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Risk aggregation settings.
    #[serde(default)]
    pub risk: RiskConfig,
}

impl EngineConfig {
    /// Load configuration from an optional file plus `RISK_ENGINE_*`
    /// environment variables (e.g. `RISK_ENGINE_MARKET_DATA__API_TOKEN`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when the file or an override cannot be
    /// parsed. A missing file is not an error; defaults apply.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("RISK_ENGINE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
