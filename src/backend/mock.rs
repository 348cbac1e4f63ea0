use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::AppError;
use crate::gpio::{Electrical, GpioBackend};

/// In-memory backend. Remembers every write in order and the current level
/// of each driven line.
#[derive(Default)]
pub struct MockGpioBackend {
    state: RwLock<MockState>,
}

#[derive(Default)]
struct MockState {
    levels: FxHashMap<u32, Electrical>,
    writes: Vec<(u32, Electrical)>,
    failing: FxHashSet<u32>,
    settle: Option<Duration>,
}

impl MockGpioBackend {
    pub fn level(&self, pin_id: u32) -> Option<Electrical> {
        self.state.read().levels.get(&pin_id).copied()
    }

    pub fn writes(&self) -> Vec<(u32, Electrical)> {
        self.state.read().writes.clone()
    }

    /// Make every later write to `pin_id` fail.
    pub fn fail_pin(&self, pin_id: u32) {
        self.state.write().failing.insert(pin_id);
    }

    /// Block every successful write for `delay` after the level is applied,
    /// like a line that takes time to settle.
    pub fn set_settle_time(&self, delay: Duration) {
        self.state.write().settle = Some(delay);
    }
}

impl GpioBackend for MockGpioBackend {
    fn drive(&self, pin_id: u32, level: Electrical) -> Result<(), AppError> {
        let settle = {
            let mut state = self.state.write();

            if state.failing.contains(&pin_id) {
                return Err(AppError::Gpio(format!("line {pin_id} unavailable")));
            }

            state.levels.insert(pin_id, level);
            state.writes.push((pin_id, level));
            state.settle
        };

        if let Some(delay) = settle {
            std::thread::sleep(delay);
        }
        Ok(())
    }
}
