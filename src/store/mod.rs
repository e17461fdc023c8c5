//! Persistence for the calibration baseline.
//!
//! The detector only relies on `load` returning what the last `save` wrote;
//! how the record is kept is up to the backend.

mod db;
mod memory;

pub use db::DbBaselineStore;
pub use memory::MemoryBaselineStore;

use std::future::Future;

use crate::detector::Baseline;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub trait BaselineStore: Send + Sync {
    /// Stored baseline, if one was ever saved.
    fn load(&self) -> impl Future<Output = Result<Option<Baseline>, StoreError>> + Send;

    /// Replace the stored baseline as a single record.
    fn save(&self, baseline: &Baseline) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Backend chosen at startup.
#[derive(Clone)]
pub enum AnyBaselineStore {
    Database(DbBaselineStore),
    Memory(MemoryBaselineStore),
}

impl BaselineStore for AnyBaselineStore {
    async fn load(&self) -> Result<Option<Baseline>, StoreError> {
        match self {
            Self::Database(store) => store.load().await,
            Self::Memory(store) => store.load().await,
        }
    }

    async fn save(&self, baseline: &Baseline) -> Result<(), StoreError> {
        match self {
            Self::Database(store) => store.save(baseline).await,
            Self::Memory(store) => store.save(baseline).await,
        }
    }
}
