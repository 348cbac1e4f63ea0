use log::{debug, error};

use crate::error::AppError;
use crate::gpio::{GpioBackend, PinController};
use crate::store::StateStore;

/// Replays every stored pin state onto the hardware, in store order.
///
/// A pin that cannot be driven is logged and skipped. Returns the number of
/// records read from the store.
pub fn run<B, S>(controller: &PinController<B>, store: &S) -> Result<usize, AppError>
where
    B: GpioBackend,
    S: StateStore + ?Sized,
{
    let records = store.all()?;

    for record in &records {
        debug!("restoring gpio {} active={}", record.pin_id, record.active);
        if let Err(e) = controller.set_level(record.pin_id, record.active) {
            error!("failed to restore gpio {}: {e}", record.pin_id);
        }
    }

    Ok(records.len())
}
