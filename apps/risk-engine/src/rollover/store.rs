//! Holdings store port for the rollover ledger.
//!
//! Persistence lives outside the engine; the ledger only needs this narrow
//! interface. The in-memory adapter backs tests and callers without storage.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{OptionPosition, PositionStatus};

use super::RolloverRecord;

/// Holdings store failure.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The underlying storage failed.
    #[error("holdings store error: {message}")]
    Storage {
        /// Error details.
        message: String,
    },
}

/// Port to the caller's holdings storage.
#[async_trait]
pub trait HoldingsStore: Send + Sync {
    /// Fetch an option position by id.
    async fn option_position(&self, id: Uuid) -> Result<Option<OptionPosition>, StoreError>;

    /// Insert a new option position.
    async fn insert_option(&self, position: OptionPosition) -> Result<(), StoreError>;

    /// Update the status of an option position.
    async fn set_option_status(&self, id: Uuid, status: PositionStatus) -> Result<(), StoreError>;

    /// Remove an option position (compensation path only).
    async fn remove_option(&self, id: Uuid) -> Result<(), StoreError>;

    /// Append a rollover record.
    async fn insert_rollover(&self, record: RolloverRecord) -> Result<(), StoreError>;

    /// All rollover records, oldest first.
    async fn rollovers(&self) -> Result<Vec<RolloverRecord>, StoreError>;
}

/// In-memory holdings store.
#[derive(Debug, Default)]
pub struct InMemoryHoldingsStore {
    options: RwLock<HashMap<Uuid, OptionPosition>>,
    rollovers: RwLock<Vec<RolloverRecord>>,
}

impl InMemoryHoldingsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a position.
    pub fn seed_option(&self, position: OptionPosition) {
        let mut options = self
            .options
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        options.insert(position.id, position);
    }
}

#[async_trait]
impl HoldingsStore for InMemoryHoldingsStore {
    async fn option_position(&self, id: Uuid) -> Result<Option<OptionPosition>, StoreError> {
        let options = self
            .options
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(options.get(&id).cloned())
    }

    async fn insert_option(&self, position: OptionPosition) -> Result<(), StoreError> {
        let mut options = self
            .options
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        options.insert(position.id, position);
        Ok(())
    }

    async fn set_option_status(&self, id: Uuid, status: PositionStatus) -> Result<(), StoreError> {
        let mut options = self
            .options
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let position = options.get_mut(&id).ok_or_else(|| StoreError::Storage {
            message: format!("option position {id} not found"),
        })?;
        position.status = status;
        Ok(())
    }

    async fn remove_option(&self, id: Uuid) -> Result<(), StoreError> {
        let mut options = self
            .options
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        options.remove(&id);
        Ok(())
    }

    async fn insert_rollover(&self, record: RolloverRecord) -> Result<(), StoreError> {
        let mut rollovers = self
            .rollovers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        rollovers.push(record);
        Ok(())
    }

    async fn rollovers(&self) -> Result<Vec<RolloverRecord>, StoreError> {
        let rollovers = self
            .rollovers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(rollovers.clone())
    }
}
