pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::AppError;

/// Last commanded state of one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinStateRecord {
    pub pin_id: u32,
    pub active: bool,
}

impl PinStateRecord {
    pub fn new(pin_id: u32, active: bool) -> Self {
        Self { pin_id, active }
    }
}

/// Durable pin id -> active mapping. At most one record per pin.
pub trait StateStore: Send + Sync {
    /// Create the backing structure if it does not exist yet.
    fn ensure_schema(&self) -> Result<(), AppError>;

    /// Insert the record for `pin_id` or replace its `active` flag.
    fn upsert(&self, pin_id: u32, active: bool) -> Result<(), AppError>;

    /// Stored flag for `pin_id`, `false` when the pin was never set.
    fn status(&self, pin_id: u32) -> Result<bool, AppError>;

    /// Every record, ordered by pin id.
    fn all(&self) -> Result<Vec<PinStateRecord>, AppError>;
}
