//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open projection database files.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{debug, error};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a projection database file and applies all pending migrations.
///
/// # Side effects
/// - Creates the file when it does not exist.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();
    let mut conn = Connection::open(path).map_err(|err| {
        error!(
            "event=db_open module=db status=error path={} duration_ms={} error_code=db_open_failed error={}",
            path.display(),
            started_at.elapsed().as_millis(),
            err
        );
        err
    })?;

    if let Err(err) = bootstrap_connection(&mut conn) {
        error!(
            "event=db_open module=db status=error path={} duration_ms={} error_code=db_bootstrap_failed error={}",
            path.display(),
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err);
    }
    debug!(
        "event=db_open module=db status=ok path={} duration_ms={}",
        path.display(),
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}
