use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::AppError;

const PIN_LOCK_STRIPES: usize = 64;

/// Logical pin state, as stored and as spoken over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinLevel {
    Active,
    Inactive,
}

/// Physical line level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Electrical {
    Low,
    High,
}

impl PinLevel {
    pub fn from_active(active: bool) -> Self {
        if active {
            PinLevel::Active
        } else {
            PinLevel::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, PinLevel::Active)
    }

    /// Lines are wired active-low: an active pin is driven low.
    pub fn electrical(&self) -> Electrical {
        match self {
            PinLevel::Active => Electrical::Low,
            PinLevel::Inactive => Electrical::High,
        }
    }
}

pub trait GpioBackend: Send + Sync {
    /// Configure `pin_id` as an output and drive it to `level`.
    fn drive(&self, pin_id: u32, level: Electrical) -> Result<(), AppError>;
}

pub struct PinController<B: GpioBackend> {
    backend: Arc<B>,
}

impl<B: GpioBackend> PinController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn set_level(&self, pin_id: u32, active: bool) -> Result<(), AppError> {
        let level = PinLevel::from_active(active);
        self.backend.drive(pin_id, level.electrical())
    }
}

/// Striped per-pin locks. A set-state request holds its pin's stripe across
/// the hardware write and the store upsert.
pub struct PinLocks {
    stripes: [Mutex<()>; PIN_LOCK_STRIPES],
}

impl Default for PinLocks {
    fn default() -> Self {
        Self {
            stripes: std::array::from_fn(|_| Mutex::new(())),
        }
    }
}

impl PinLocks {
    pub fn lock(&self, pin_id: u32) -> MutexGuard<'_, ()> {
        self.stripes[pin_id as usize % PIN_LOCK_STRIPES].lock()
    }
}
