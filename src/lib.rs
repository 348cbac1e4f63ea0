pub mod backend;
pub mod config;
pub mod error;
pub mod gpio;
pub mod recovery;
pub mod routes;
pub mod store;

pub use config::{AppConfig, StorageErrorPolicy};
pub use error::AppError;
pub use gpio::{Electrical, GpioBackend, PinController, PinLevel, PinLocks};
pub use routes::AppState;
pub use store::{MemoryStore, PinStateRecord, SqliteStore, StateStore};

#[cfg(feature = "hardware-gpio")]
pub use backend::LibgpiodBackend;
pub use backend::MockGpioBackend;
