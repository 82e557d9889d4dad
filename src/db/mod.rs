//! Database module for the clinic ledger.
//!
//! All persistence goes through SQLite. Each operation opens its own
//! [`Connection`] with [`Database::connect`], so concurrent requests contend on
//! SQLite's locks rather than on an in-process mutex. The schema in
//! `schema.sql` carries the invariants that must hold under that concurrency:
//! the partial unique index on booked slots and the one-diagnosis-per-
//! appointment constraint.
//!
//! Query functions in the submodules take a `&Connection` so they can run
//! either on a plain connection or inside a [`rusqlite::Transaction`].

use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use time::{Date, OffsetDateTime};

pub mod appointments;
pub mod diagnoses;
pub mod directory;
pub mod prescriptions;
mod seed;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the clinic's SQLite file.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Opens (creating if needed) the database file and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema fails to
    /// execute.
    ///
    /// # Postconditions
    ///
    /// All tables and indexes exist. Applying the schema to an existing file is
    /// a no-op.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let database = Self {
            path: path.as_ref().to_path_buf(),
        };
        let conn = database
            .connect()
            .with_context(|| format!("Failed to open database at {}", database.path.display()))?;

        let schema = include_str!("schema.sql");
        conn.execute_batch(schema)
            .context("Failed to execute schema")?;

        tracing::debug!(path = %database.path.display(), "database schema applied");
        Ok(database)
    }

    /// Opens a new connection with foreign keys enforced and a busy timeout.
    pub fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Seconds since the Unix epoch, the storage form of every instant.
pub(crate) fn unix(instant: OffsetDateTime) -> i64 {
    instant.unix_timestamp()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

/// Reads an instant stored as Unix seconds.
pub(crate) fn instant_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let seconds: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|e| conversion_error(idx, format!("Invalid timestamp {seconds}: {e}")))
}

/// Reads an optional `YYYY-MM-DD` day.
pub(crate) fn day_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Date>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|text| {
        crate::models::parse_day(&text).map_err(|e| conversion_error(idx, e.to_string()))
    })
    .transpose()
}

/// Reads a text column into any type with a `FromStr` impl, such as the
/// status and role enums.
pub(crate) fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e: T::Err| conversion_error(idx, e.to_string()))
}

/// Reads a JSON text column.
pub(crate) fn json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, format!("Invalid JSON: {e}")))
}
