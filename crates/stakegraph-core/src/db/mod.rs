//! SQLite store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers are not blocked by the writer
//! - `busy_timeout = 5s` before a contended `BEGIN IMMEDIATE` gives up
//! - `foreign_keys = ON` so deferred edge constraints are checked at commit
//! - `sg_fold(text)`: Unicode lowercase, used for case-insensitive matching

pub mod legacy;
pub mod migrations;
pub mod mutate;
pub mod query;
pub mod schema;
pub mod seed;

use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use std::{path::Path, time::Duration};

use crate::config::StoreLocation;

/// Busy timeout used when no configuration overrides it.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQL name of the Unicode case-fold scalar registered on every connection.
pub const FOLD_FUNCTION: &str = "sg_fold";

/// Open (or create) the store file, apply runtime pragmas, and migrate the
/// schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    open_store_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
}

fn open_store_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open store {}", path.display()))?;

    configure_connection(&conn, busy_timeout).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;

    Ok(conn)
}

/// Open a private in-memory store with the full schema.
///
/// # Errors
///
/// Returns an error if configuring or migrating the database fails.
pub fn open_in_memory() -> Result<Connection> {
    open_in_memory_with_timeout(DEFAULT_BUSY_TIMEOUT)
}

fn open_in_memory_with_timeout(busy_timeout: Duration) -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory store")?;
    configure_connection(&conn, busy_timeout).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;
    Ok(conn)
}

/// Open whatever `location` names.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_location(location: &StoreLocation, busy_timeout: Duration) -> Result<Connection> {
    match location {
        StoreLocation::Memory => open_in_memory_with_timeout(busy_timeout),
        StoreLocation::File(path) => open_store_with_timeout(path, busy_timeout),
    }
}

/// `true` once the store file exists and carries the current schema.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn is_initialized(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let conn = Connection::open(path).with_context(|| format!("open store {}", path.display()))?;
    let version = migrations::current_schema_version(&conn).context("read schema version")?;
    Ok(version >= migrations::LATEST_SCHEMA_VERSION)
}

fn configure_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(busy_timeout)?;
    register_fold(conn)
}

/// `sg_fold(x)` lowercases with full Unicode rules; SQLite's own `LIKE` and
/// `lower()` only fold ASCII. NULL stays NULL.
fn register_fold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
}
