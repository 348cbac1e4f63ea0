//! SQLite-backed state store.
//!
//! The file layout is shared with earlier deployments of the service: one
//! `gpio` table keyed by `gpioID` with a nullable boolean `active` column.
//! An existing database file is reused as-is.

use log::warn;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use super::{PinStateRecord, StateStore};
use crate::error::AppError;

const CREATE_GPIO_TABLE: &str = r#"CREATE TABLE IF NOT EXISTS gpio (
    "gpioID" integer NOT NULL PRIMARY KEY AUTOINCREMENT,
    "active" bool
)"#;

const UPSERT_GPIO: &str = "INSERT INTO gpio(gpioID, active) VALUES (?1, ?2)
    ON CONFLICT(gpioID) DO UPDATE SET active=excluded.active";

const SELECT_GPIO: &str = "SELECT active FROM gpio WHERE gpioID = ?1";

const SELECT_ALL_GPIO: &str = "SELECT gpioID, active FROM gpio ORDER BY gpioID";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens `path`, creating the file when it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| AppError::Storage(format!("open {}: {e}", path.display())))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }
}

impl StateStore for SqliteStore {
    fn ensure_schema(&self) -> Result<(), AppError> {
        self.conn.lock().execute(CREATE_GPIO_TABLE, [])?;
        Ok(())
    }

    fn upsert(&self, pin_id: u32, active: bool) -> Result<(), AppError> {
        self.conn
            .lock()
            .prepare_cached(UPSERT_GPIO)?
            .execute(params![pin_id, active])?;
        Ok(())
    }

    fn status(&self, pin_id: u32) -> Result<bool, AppError> {
        let active: Option<Option<bool>> = self
            .conn
            .lock()
            .prepare_cached(SELECT_GPIO)?
            .query_row(params![pin_id], |row| row.get(0))
            .optional()?;

        Ok(active.flatten().unwrap_or(false))
    }

    fn all(&self) -> Result<Vec<PinStateRecord>, AppError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(SELECT_ALL_GPIO)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, Option<bool>>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            match row {
                Ok((pin_id, Some(active))) => records.push(PinStateRecord::new(pin_id, active)),
                Ok((pin_id, None)) => warn!("skipping gpio {pin_id}: no stored state"),
                Err(e) => warn!("skipping unreadable gpio row: {e}"),
            }
        }
        Ok(records)
    }
}
