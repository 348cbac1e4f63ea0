use log::debug;
use std::path::{Path, PathBuf};

use libgpiod::{chip::Chip, line, request};

use super::lines::LineTable;
use crate::error::AppError;
use crate::gpio::{Electrical, GpioBackend};

/// Drives lines of one GPIO character device. Each line is requested as an
/// output on its first write and the request is kept for later writes.
pub struct LibgpiodBackend {
    chip: PathBuf,
    lines: LineTable<request::Request>,
}

impl LibgpiodBackend {
    /// Opens the chip once so a missing or inaccessible device fails here
    /// instead of on the first request.
    pub fn new<P: AsRef<Path>>(chip: P) -> Result<Self, AppError> {
        let chip = chip.as_ref().to_path_buf();
        Self::open_chip(&chip)?;

        Ok(Self {
            chip,
            lines: LineTable::default(),
        })
    }

    fn open_chip(path: &Path) -> Result<Chip, AppError> {
        Chip::open(&path).map_err(|e| AppError::Gpio(format!("open chip {}: {e}", path.display())))
    }

    fn to_value(level: Electrical) -> line::Value {
        match level {
            Electrical::Low => line::Value::InActive,
            Electrical::High => line::Value::Active,
        }
    }

    fn make_line_config(offset: u32, level: Electrical) -> Result<line::Config, AppError> {
        let mut ls =
            line::Settings::new().map_err(|e| AppError::Gpio(format!("libgpiod settings: {e}")))?;
        ls.set_direction(line::Direction::Output)
            .map_err(|e| AppError::Gpio(format!("set direction: {e}")))?;
        ls.set_output_value(Self::to_value(level))
            .map_err(|e| AppError::Gpio(format!("set output value: {e}")))?;

        let mut cfg =
            line::Config::new().map_err(|e| AppError::Gpio(format!("line config: {e}")))?;
        cfg.add_line_settings(&[offset], ls)
            .map_err(|e| AppError::Gpio(format!("line config add settings: {e}")))?;
        Ok(cfg)
    }

    fn request_output(&self, offset: u32, level: Electrical) -> Result<request::Request, AppError> {
        let chip = Self::open_chip(&self.chip)?;
        let line_cfg = Self::make_line_config(offset, level)?;

        let mut req_cfg =
            request::Config::new().map_err(|e| AppError::Gpio(format!("request config: {e}")))?;
        req_cfg
            .set_consumer(env!("CARGO_PKG_NAME"))
            .map_err(|e| AppError::Gpio(format!("request consumer: {e}")))?;

        chip.request_lines(Some(&req_cfg), &line_cfg)
            .map_err(|e| AppError::Gpio(format!("request line {offset}: {e}")))
    }
}

impl GpioBackend for LibgpiodBackend {
    fn drive(&self, pin_id: u32, level: Electrical) -> Result<(), AppError> {
        self.lines.drive_with(
            pin_id,
            || {
                // the request already applies the output value
                let req = self.request_output(pin_id, level)?;
                debug!("requested line {pin_id} as output on {}", self.chip.display());
                Ok(req)
            },
            |req| {
                req.set_value(pin_id, Self::to_value(level))
                    .map(|_| ())
                    .map_err(|e| AppError::Gpio(format!("set value on line {pin_id}: {e}")))
            },
        )
    }
}
