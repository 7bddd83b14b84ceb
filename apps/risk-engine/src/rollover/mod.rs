//! Rollover Ledger
//!
//! Records the closing of one option position and the opening of a
//! replacement, computing and locking in realized P&L. The realized figure
//! is immutable once written; the new position starts fresh unrealized P&L
//! tracking from its own opening price.
//!
//! The operation is a single logical transaction: the old position's
//! ACTIVE → ROLLED transition, the new position, and the ledger entry all
//! land or none do. This is the one place in the engine where a storage
//! failure propagates as a hard error, since partial application would
//! corrupt realized-P&L history.

mod store;

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    CONTRACT_MULTIPLIER, Direction, OptionPosition, OptionSymbol, PositionStatus,
};

pub use store::{HoldingsStore, InMemoryHoldingsStore, StoreError};

/// Rollover failures. All of these must surface to the caller; none are
/// silently recoverable.
#[derive(Debug, Error)]
pub enum RolloverError {
    /// The position to close does not exist.
    #[error("option position {id} not found")]
    PositionNotFound {
        /// Requested position id.
        id: Uuid,
    },

    /// Only ACTIVE positions can be rolled.
    #[error("cannot roll over {status:?} option position {id}")]
    PositionNotActive {
        /// Requested position id.
        id: Uuid,
        /// Its current status.
        status: PositionStatus,
    },

    /// Contract counts must be positive and close at most the held amount.
    #[error("invalid contract count {requested} (position holds {held})")]
    InvalidContracts {
        /// Requested contracts.
        requested: u32,
        /// Contracts held by the old position.
        held: u32,
    },

    /// Close and open prices must not be negative.
    #[error("invalid price {price}")]
    InvalidPrice {
        /// The offending price.
        price: Decimal,
    },

    /// A roll must move to a different contract.
    #[error("replacement symbol matches the closed position: {symbol}")]
    SymbolUnchanged {
        /// The repeated symbol.
        symbol: OptionSymbol,
    },

    /// The holdings store failed; state has been compensated where possible.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The replacement contract to open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPositionSpec {
    /// Replacement option symbol (same underlying, type, and direction as
    /// the closed leg; new strike and/or expiration).
    pub symbol: OptionSymbol,
    /// Opening price per share; becomes the new cost basis.
    pub open_price: Decimal,
    /// Contracts to open.
    pub open_contracts: u32,
}

/// A rollover request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloverRequest {
    /// Position being closed.
    pub old_position_id: Uuid,
    /// Price at which the old position was closed.
    pub close_price: Decimal,
    /// Contracts closed (may be fewer than held; P&L realizes on these).
    pub close_contracts: u32,
    /// The replacement position.
    pub new_position: NewPositionSpec,
    /// Transaction fees deducted from realized P&L.
    pub fees: Option<Decimal>,
    /// Rollover date.
    pub rollover_date: NaiveDate,
}

/// An immutable ledger entry. Created exactly once per rollover, never
/// updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloverRecord {
    /// Ledger entry id.
    pub id: Uuid,
    /// The closed position.
    pub old_position_id: Uuid,
    /// The newly opened position.
    pub new_position_id: Uuid,
    /// Symbol of the closed position.
    pub old_symbol: OptionSymbol,
    /// Symbol of the replacement.
    pub new_symbol: OptionSymbol,
    /// Close price per share.
    pub close_price: Decimal,
    /// Contracts closed.
    pub close_contracts: u32,
    /// Open price per share.
    pub open_price: Decimal,
    /// Contracts opened.
    pub open_contracts: u32,
    /// Realized P&L on the closed leg, fees deducted.
    pub realized_pnl: Decimal,
    /// Fees, when charged.
    pub fees: Option<Decimal>,
    /// Rollover date.
    pub rollover_date: NaiveDate,
}

/// Records rollovers against the caller's holdings store.
pub struct RolloverLedger<S: HoldingsStore> {
    store: Arc<S>,
}

impl<S: HoldingsStore> RolloverLedger<S> {
    /// Create a ledger over a holdings store.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Close one option position and open its replacement, realizing P&L on
    /// the closed leg.
    ///
    /// For a SELL-direction position the realized P&L is
    /// `(cost - close) × contracts × 100 - fees`; for BUY it is
    /// `(close - cost) × contracts × 100 - fees`.
    ///
    /// # Errors
    ///
    /// Rejects rolls of missing or non-ACTIVE positions, invalid counts or
    /// prices, and an unchanged symbol. Store failures propagate after
    /// compensating any partially applied state.
    pub async fn record_rollover(
        &self,
        request: RolloverRequest,
    ) -> Result<RolloverRecord, RolloverError> {
        let old = self
            .store
            .option_position(request.old_position_id)
            .await?
            .ok_or(RolloverError::PositionNotFound {
                id: request.old_position_id,
            })?;

        if old.status != PositionStatus::Active {
            return Err(RolloverError::PositionNotActive {
                id: old.id,
                status: old.status,
            });
        }
        if request.close_contracts == 0 || request.close_contracts > old.contracts {
            return Err(RolloverError::InvalidContracts {
                requested: request.close_contracts,
                held: old.contracts,
            });
        }
        if request.new_position.open_contracts == 0 {
            return Err(RolloverError::InvalidContracts {
                requested: 0,
                held: old.contracts,
            });
        }
        if request.close_price < Decimal::ZERO {
            return Err(RolloverError::InvalidPrice {
                price: request.close_price,
            });
        }
        if request.new_position.open_price < Decimal::ZERO {
            return Err(RolloverError::InvalidPrice {
                price: request.new_position.open_price,
            });
        }
        if request.new_position.symbol == old.symbol {
            return Err(RolloverError::SymbolUnchanged {
                symbol: old.symbol.clone(),
            });
        }

        let closed_shares = Decimal::from(request.close_contracts) * CONTRACT_MULTIPLIER;
        let per_share = match old.direction {
            // Short leg profits when it closes below its cost
            Direction::Sell => old.cost_price - request.close_price,
            // Long leg profits when it closes above its cost
            Direction::Buy => request.close_price - old.cost_price,
        };
        let realized_pnl = per_share * closed_shares - request.fees.unwrap_or(Decimal::ZERO);

        // The replacement keeps the old leg's direction and starts its own
        // cost basis at the opening price.
        let new_position = OptionPosition::new(
            request.new_position.symbol.clone(),
            old.direction,
            request.new_position.open_contracts,
            request.new_position.open_price,
        )
        .map_err(|_| RolloverError::InvalidPrice {
            price: request.new_position.open_price,
        })?
        .with_current_price(request.new_position.open_price);

        // All-or-nothing: insert new, retire old, write the ledger entry,
        // compensating in reverse on any failure.
        self.store.insert_option(new_position.clone()).await?;

        if let Err(e) = self
            .store
            .set_option_status(old.id, PositionStatus::Rolled)
            .await
        {
            warn!(old_position = %old.id, error = %e, "rollover failed, removing replacement position");
            let _ = self.store.remove_option(new_position.id).await;
            return Err(e.into());
        }

        let record = RolloverRecord {
            id: Uuid::new_v4(),
            old_position_id: old.id,
            new_position_id: new_position.id,
            old_symbol: old.symbol.clone(),
            new_symbol: request.new_position.symbol,
            close_price: request.close_price,
            close_contracts: request.close_contracts,
            open_price: request.new_position.open_price,
            open_contracts: request.new_position.open_contracts,
            realized_pnl,
            fees: request.fees,
            rollover_date: request.rollover_date,
        };

        if let Err(e) = self.store.insert_rollover(record.clone()).await {
            warn!(old_position = %old.id, error = %e, "ledger write failed, restoring old position");
            let _ = self
                .store
                .set_option_status(old.id, PositionStatus::Active)
                .await;
            let _ = self.store.remove_option(new_position.id).await;
            return Err(e.into());
        }

        info!(
            old_position = %record.old_position_id,
            new_position = %record.new_position_id,
            realized_pnl = %record.realized_pnl,
            "recorded rollover"
        );

        Ok(record)
    }

    /// List all rollover records for history and audit views.
    pub async fn rollovers(&self) -> Result<Vec<RolloverRecord>, RolloverError> {
        Ok(self.store.rollovers().await?)
    }
}
