use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// What the handlers do when the state store fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageErrorPolicy {
    /// Log and answer as if the store had succeeded (`false` for lookups).
    Ignore,
    /// Answer 500 with the storage error.
    Propagate,
}

/// Persist GPIO output states and serve them over HTTP
#[derive(Parser, Debug, Clone)]
#[command(name = "gstate", version)]
pub struct AppConfig {
    /// SQLite file holding the last known pin states
    #[arg(long, env = "GSTATE_DBFILE", default_value = "./gpio.db")]
    pub dbfile: PathBuf,

    /// Replay stored pin states onto the hardware at startup
    #[arg(long, env = "GSTATE_RECOVERY")]
    pub recovery: bool,

    /// HTTP listen port
    #[arg(long, env = "GSTATE_LISTEN_PORT", default_value_t = 8081)]
    pub listen_port: u16,

    /// HTTP bind address
    #[arg(long, env = "GSTATE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// URL prefix in front of /gpios/{id}
    #[arg(long, env = "GSTATE_PATH", default_value = "")]
    pub path: String,

    /// GPIO character device driven by the hardware backend
    #[arg(long, env = "GSTATE_CHIP", default_value = "/dev/gpiochip0")]
    pub chip: PathBuf,

    /// How storage failures surface to HTTP clients
    #[arg(
        long,
        env = "GSTATE_STORAGE_ERRORS",
        value_enum,
        default_value_t = StorageErrorPolicy::Propagate
    )]
    pub storage_errors: StorageErrorPolicy,
}

impl AppConfig {
    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.listen_port)
    }
}
