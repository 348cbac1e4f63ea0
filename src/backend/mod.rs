#[cfg(feature = "hardware-gpio")]
pub mod libgpiod;
#[cfg_attr(not(feature = "hardware-gpio"), allow(dead_code))]
mod lines;
pub mod mock;

#[cfg(feature = "hardware-gpio")]
pub use libgpiod::LibgpiodBackend;
pub use mock::MockGpioBackend;
