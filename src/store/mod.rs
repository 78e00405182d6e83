//! Persistence for the two pieces of state Maldify owns: the merchant's
//! offer mapping and the monthly count of offers served.

mod memory;
mod postgres;

pub use memory::{InMemorySettingsRepository, InMemoryUsageCounter};
pub use postgres::{PgSettingsRepository, PgUsageCounter};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::services::OfferCatalog;
use crate::domain::value_objects::UsagePeriod;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait UsageCounter: Send + Sync {
    async fn current(&self, shop: &str, period: &UsagePeriod) -> Result<u32, StoreError>;

    /// Records one served offer if the count is still below `limit`, in one
    /// atomic step. Returns the new count, or `None` when the quota is spent.
    async fn try_increment(&self, shop: &str, period: &UsagePeriod, limit: u32) -> Result<Option<u32>, StoreError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load(&self, shop: &str) -> Result<Option<OfferCatalog>, StoreError>;

    async fn save(&self, shop: &str, catalog: &OfferCatalog) -> Result<(), StoreError>;
}
