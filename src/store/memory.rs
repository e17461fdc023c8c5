use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::detector::Baseline;

use super::{BaselineStore, StoreError};

/// Process-local store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryBaselineStore {
    slot: Arc<RwLock<Option<Baseline>>>,
    fail_saves: Arc<AtomicBool>,
}

impl MemoryBaselineStore {
    #[must_use]
    pub fn with_baseline(baseline: Baseline) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(baseline))),
            fail_saves: Arc::default(),
        }
    }

    /// Make subsequent saves fail, to exercise error paths.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl BaselineStore for MemoryBaselineStore {
    async fn load(&self) -> Result<Option<Baseline>, StoreError> {
        self.slot
            .read()
            .map(|slot| slot.clone())
            .map_err(|_| StoreError::Unavailable("baseline lock poisoned".to_string()))
    }

    async fn save(&self, baseline: &Baseline) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("saves disabled".to_string()));
        }
        let mut slot = self
            .slot
            .write()
            .map_err(|_| StoreError::Unavailable("baseline lock poisoned".to_string()))?;
        *slot = Some(baseline.clone());
        Ok(())
    }
}
