use parking_lot::{FairMutex, RwLock, RwLockUpgradableReadGuard};
use rustc_hash::FxHashMap;

use crate::error::AppError;

/// Per-line handles, created on first use. Writes to lines that already have
/// a handle only take the shared lock.
pub struct LineTable<R> {
    lines: RwLock<FxHashMap<u32, FairMutex<R>>>, // keyed by line offset
}

impl<R> Default for LineTable<R> {
    fn default() -> Self {
        Self {
            lines: RwLock::new(FxHashMap::default()),
        }
    }
}

impl<R> LineTable<R> {
    /// Run `apply` on the handle for `offset`. When there is none yet, `open`
    /// creates it and `apply` is skipped: `open` sets the first value itself.
    pub fn drive_with<O, A>(&self, offset: u32, open: O, apply: A) -> Result<(), AppError>
    where
        O: FnOnce() -> Result<R, AppError>,
        A: FnOnce(&mut R) -> Result<(), AppError>,
    {
        {
            let lines = self.lines.read();
            if let Some(handle) = lines.get(&offset) {
                return apply(&mut handle.lock());
            }
        }

        let lines = self.lines.upgradable_read();

        // another writer may have opened the line while we waited
        if let Some(handle) = lines.get(&offset) {
            return apply(&mut handle.lock());
        }

        let handle = open()?;
        let mut lines = RwLockUpgradableReadGuard::upgrade(lines);
        lines.insert(offset, FairMutex::new(handle));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
