//! Option symbol value object.
//!
//! Internal format: `"QQQ 250718P440"` (space optional, fractional strikes
//! allowed). External OCC format: `"QQQ250718P00440000"` - underlying,
//! YYMMDD expiration, C/P right, strike × 1000 as 8 zero-padded digits.
//! Conversion round-trips exactly for all valid strikes, including
//! fractional ones like 440.5.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::position::OptionType;

static INTERNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^([A-Z]+)\s?(\d{6})([CP])(\d+(?:\.\d+)?)$").expect("valid pattern")
});

static OCC_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^([A-Z]+)(\d{6})([CP])(\d{8})$").expect("valid pattern")
});

/// Errors from option symbol parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    /// Symbol does not match the expected format.
    #[error("invalid option symbol format: {symbol}")]
    InvalidFormat {
        /// The offending symbol.
        symbol: String,
    },

    /// Expiration digits do not form a calendar date.
    #[error("invalid expiration date in option symbol: {symbol}")]
    InvalidExpiration {
        /// The offending symbol.
        symbol: String,
    },

    /// Strike is zero, negative, or unparseable.
    #[error("invalid strike in option symbol: {symbol}")]
    InvalidStrike {
        /// The offending symbol.
        symbol: String,
    },
}

/// A parsed option symbol: underlying, expiration, right, and strike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionSymbol {
    underlying: String,
    expiration: NaiveDate,
    option_type: OptionType,
    strike: Decimal,
}

impl OptionSymbol {
    /// Build a symbol from its parts. Strike must be positive.
    pub fn new(
        underlying: impl Into<String>,
        expiration: NaiveDate,
        option_type: OptionType,
        strike: Decimal,
    ) -> Result<Self, SymbolError> {
        let underlying = underlying.into();
        if strike <= Decimal::ZERO {
            return Err(SymbolError::InvalidStrike { symbol: underlying });
        }
        Ok(Self {
            underlying,
            expiration,
            option_type,
            strike: strike.normalize(),
        })
    }

    /// Parse the internal `"TICKER YYMMDD[C|P]STRIKE"` form.
    ///
    /// The space between ticker and contract part is optional; fractional
    /// strikes (`440.5`) are accepted.
    pub fn parse(symbol: &str) -> Result<Self, SymbolError> {
        let trimmed = symbol.trim();
        let caps = INTERNAL_RE
            .captures(trimmed)
            .ok_or_else(|| SymbolError::InvalidFormat {
                symbol: symbol.to_string(),
            })?;

        let expiration = NaiveDate::parse_from_str(&caps[2], "%y%m%d").map_err(|_| {
            SymbolError::InvalidExpiration {
                symbol: symbol.to_string(),
            }
        })?;

        let option_type = if &caps[3] == "C" {
            OptionType::Call
        } else {
            OptionType::Put
        };

        let strike = Decimal::from_str(&caps[4]).map_err(|_| SymbolError::InvalidStrike {
            symbol: symbol.to_string(),
        })?;

        Self::new(caps[1].to_string(), expiration, option_type, strike).map_err(|_| {
            SymbolError::InvalidStrike {
                symbol: symbol.to_string(),
            }
        })
    }

    /// Parse the external OCC form `"TICKERYYMMDD[C|P]00000000"`.
    pub fn from_occ(symbol: &str) -> Result<Self, SymbolError> {
        let caps = OCC_RE
            .captures(symbol.trim())
            .ok_or_else(|| SymbolError::InvalidFormat {
                symbol: symbol.to_string(),
            })?;

        let expiration = NaiveDate::parse_from_str(&caps[2], "%y%m%d").map_err(|_| {
            SymbolError::InvalidExpiration {
                symbol: symbol.to_string(),
            }
        })?;

        let option_type = if &caps[3] == "C" {
            OptionType::Call
        } else {
            OptionType::Put
        };

        let milli_strike: i64 = caps[4].parse().map_err(|_| SymbolError::InvalidStrike {
            symbol: symbol.to_string(),
        })?;
        // 00440500 -> 440.5
        let strike = Decimal::new(milli_strike, 3).normalize();

        Self::new(caps[1].to_string(), expiration, option_type, strike).map_err(|_| {
            SymbolError::InvalidStrike {
                symbol: symbol.to_string(),
            }
        })
    }

    /// Format as the external OCC symbol (strike × 1000, 8 digits).
    #[must_use]
    pub fn to_occ(&self) -> String {
        let milli_strike = (self.strike * Decimal::from(1000))
            .round()
            .to_i64()
            .unwrap_or(0);
        format!(
            "{}{}{}{:08}",
            self.underlying,
            self.expiration.format("%y%m%d"),
            self.option_type.occ_code(),
            milli_strike
        )
    }

    /// Underlying ticker.
    #[must_use]
    pub fn underlying(&self) -> &str {
        &self.underlying
    }

    /// Expiration date.
    #[must_use]
    pub const fn expiration(&self) -> NaiveDate {
        self.expiration
    }

    /// Call or put.
    #[must_use]
    pub const fn option_type(&self) -> OptionType {
        self.option_type
    }

    /// Strike price.
    #[must_use]
    pub const fn strike(&self) -> Decimal {
        self.strike
    }
}

impl std::fmt::Display for OptionSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}{}{}",
            self.underlying,
            self.expiration.format("%y%m%d"),
            self.option_type.occ_code(),
            self.strike.normalize()
        )
    }
}

impl FromStr for OptionSymbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_with_space() {
        let sym = OptionSymbol::parse("AAPL 260116C250").unwrap();
        assert_eq!(sym.underlying(), "AAPL");
        assert_eq!(sym.option_type(), OptionType::Call);
        assert_eq!(sym.strike(), dec!(250));
        assert_eq!(
            sym.expiration(),
            NaiveDate::from_ymd_opt(2026, 1, 16).unwrap()
        );
    }

    #[test]
    fn parse_without_space() {
        let sym = OptionSymbol::parse("MSFT251010P515").unwrap();
        assert_eq!(sym.underlying(), "MSFT");
        assert_eq!(sym.option_type(), OptionType::Put);
        assert_eq!(sym.strike(), dec!(515));
    }

    #[test]
    fn occ_round_trip() {
        let sym = OptionSymbol::parse("AAPL 260116C250").unwrap();
        assert_eq!(sym.to_occ(), "AAPL260116C00250000");

        let back = OptionSymbol::from_occ("AAPL260116C00250000").unwrap();
        assert_eq!(back, sym);
        assert_eq!(back.strike(), dec!(250.00).normalize());
    }

    #[test]
    fn occ_round_trip_fractional_strike() {
        let sym = OptionSymbol::parse("QQQ 250718P440.5").unwrap();
        assert_eq!(sym.to_occ(), "QQQ250718P00440500");

        let back = OptionSymbol::from_occ("QQQ250718P00440500").unwrap();
        assert_eq!(back.strike(), dec!(440.5));
        assert_eq!(back, sym);
    }

    #[test]
    fn display_matches_internal_form() {
        let sym = OptionSymbol::parse("QQQ 250718P440").unwrap();
        assert_eq!(sym.to_string(), "QQQ 250718P440");

        let fractional = OptionSymbol::parse("QQQ250718P440.5").unwrap();
        assert_eq!(fractional.to_string(), "QQQ 250718P440.5");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            OptionSymbol::parse("not a symbol"),
            Err(SymbolError::InvalidFormat { .. })
        ));
        assert!(matches!(
            OptionSymbol::parse("AAPL 260116X250"),
            Err(SymbolError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn rejects_bad_date() {
        assert!(matches!(
            OptionSymbol::parse("AAPL 261350C250"),
            Err(SymbolError::InvalidExpiration { .. })
        ));
    }

    #[test]
    fn rejects_zero_strike() {
        assert!(matches!(
            OptionSymbol::parse("AAPL 260116C0"),
            Err(SymbolError::InvalidStrike { .. })
        ));
    }

    #[test]
    fn serde_round_trip() {
        let sym = OptionSymbol::parse("TSLA 250620C200").unwrap();
        let json = serde_json::to_string(&sym).unwrap();
        let parsed: OptionSymbol = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sym);
    }
}
