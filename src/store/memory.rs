use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{PinStateRecord, StateStore};
use crate::error::AppError;

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<FxHashMap<u32, bool>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn with_records<I: IntoIterator<Item = PinStateRecord>>(records: I) -> Self {
        let store = Self::default();
        {
            let mut map = store.records.write();
            for r in records {
                map.insert(r.pin_id, r.active);
            }
        }
        store
    }

    /// Make every later call fail with a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::Relaxed) {
            Err(AppError::Storage("memory store unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl StateStore for MemoryStore {
    fn ensure_schema(&self) -> Result<(), AppError> {
        self.check()
    }

    fn upsert(&self, pin_id: u32, active: bool) -> Result<(), AppError> {
        self.check()?;
        self.records.write().insert(pin_id, active);
        Ok(())
    }

    fn status(&self, pin_id: u32) -> Result<bool, AppError> {
        self.check()?;
        Ok(self.records.read().get(&pin_id).copied().unwrap_or(false))
    }

    fn all(&self) -> Result<Vec<PinStateRecord>, AppError> {
        self.check()?;
        let mut records: Vec<PinStateRecord> = self
            .records
            .read()
            .iter()
            .map(|(id, active)| PinStateRecord::new(*id, *active))
            .collect();
        records.sort_by_key(|r| r.pin_id);
        Ok(records)
    }
}
