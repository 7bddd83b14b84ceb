//! Price sanity validation.
//!
//! Fetched or derived option prices pass through these bounds before the
//! gateway accepts them. Rules are evaluated in order and the first failing
//! rule wins. A rule that cannot be evaluated (no underlying price) degrades
//! to accepted-with-warning: validation is never the reason a refresh fails
//! outright.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ValidationConfig;
use crate::domain::OptionType;

/// Why a price was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// Price is negative.
    NegativePrice,
    /// Price is below intrinsic value beyond the rounding tolerance.
    BelowIntrinsic,
    /// Extrinsic value is implausibly large.
    ExcessiveTimeValue,
    /// Time value has not decayed close to expiry; data is likely stale.
    StaleNearExpiry,
    /// Far out-of-the-money contract priced suspiciously rich.
    OverpricedFarOtm,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativePrice => write!(f, "price is negative"),
            Self::BelowIntrinsic => write!(f, "price is below intrinsic value"),
            Self::ExcessiveTimeValue => write!(f, "time value exceeds plausible bounds"),
            Self::StaleNearExpiry => write!(f, "time value too large this close to expiry"),
            Self::OverpricedFarOtm => write!(f, "far out-of-the-money contract priced too rich"),
        }
    }
}

/// Outcome of validating a single price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceVerdict {
    /// Price passed every applicable rule.
    Accepted,
    /// A rule could not be evaluated; the price is accepted with a warning.
    AcceptedWithWarning {
        /// Why full validation was skipped.
        warning: String,
    },
    /// Price failed a sanity rule.
    Rejected {
        /// The first rule that failed.
        reason: RejectReason,
    },
}

impl PriceVerdict {
    /// Whether the price may be used.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

/// Sanity-checks option prices against intrinsic value, time-value bounds,
/// and moneyness.
#[derive(Debug, Clone, Default)]
pub struct PriceValidator {
    config: ValidationConfig,
}

impl PriceValidator {
    /// Create a validator with the given thresholds.
    #[must_use]
    pub const fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate an option price.
    ///
    /// `underlying` is the spot price of the underlying when known. Without
    /// it, only the sign check runs and the verdict carries a warning.
    #[must_use]
    pub fn validate(
        &self,
        price: Decimal,
        underlying: Option<Decimal>,
        strike: Decimal,
        option_type: OptionType,
        expiration: NaiveDate,
        as_of: NaiveDate,
    ) -> PriceVerdict {
        if price < Decimal::ZERO {
            return PriceVerdict::Rejected {
                reason: RejectReason::NegativePrice,
            };
        }

        let Some(spot) = underlying.filter(|s| *s > Decimal::ZERO) else {
            return PriceVerdict::AcceptedWithWarning {
                warning: "underlying price unavailable, skipping sanity bounds".to_string(),
            };
        };

        let intrinsic = match option_type {
            OptionType::Call => (spot - strike).max(Decimal::ZERO),
            OptionType::Put => (strike - spot).max(Decimal::ZERO),
        };

        if price < intrinsic - self.config.intrinsic_tolerance {
            return PriceVerdict::Rejected {
                reason: RejectReason::BelowIntrinsic,
            };
        }

        let time_value = price - intrinsic;
        if time_value > spot * self.config.max_time_value_ratio {
            return PriceVerdict::Rejected {
                reason: RejectReason::ExcessiveTimeValue,
            };
        }

        let days_to_expiry = (expiration - as_of).num_days();
        if days_to_expiry <= self.config.near_expiry_days
            && time_value > spot * self.config.near_expiry_time_value_ratio
        {
            return PriceVerdict::Rejected {
                reason: RejectReason::StaleNearExpiry,
            };
        }

        let otm_moneyness = match option_type {
            OptionType::Call => (strike - spot) / spot,
            OptionType::Put => (spot - strike) / spot,
        };
        if otm_moneyness > self.config.otm_moneyness_threshold
            && price > spot * self.config.otm_price_ratio
        {
            return PriceVerdict::Rejected {
                reason: RejectReason::OverpricedFarOtm,
            };
        }

        PriceVerdict::Accepted
    }
}
