use std::sync::MutexGuard;

use rusqlite::Connection;
use tracing::{debug, error};

use crate::error::Result;

/// An open transaction. Every repository operation runs through one.
///
/// Writes are visible to later reads on the same handle straight away and
/// to everyone else after `commit`. Dropping the handle without committing
/// rolls everything back.
pub struct UnitOfWork<'db> {
    conn: MutexGuard<'db, Connection>,
    finished: bool,
}

impl<'db> UnitOfWork<'db> {
    pub(crate) fn begin(conn: MutexGuard<'db, Connection>) -> Result<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        debug!("Unit of work started");
        Ok(Self {
            conn,
            finished: false,
        })
    }

    pub fn commit(mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        debug!("Unit of work committed");
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.rollback_in_place()
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    fn rollback_in_place(&mut self) -> Result<()> {
        // SQLite may already have aborted the transaction on its own
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        debug!("Unit of work rolled back");
        Ok(())
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.rollback_in_place() {
            error!("Rollback of abandoned unit of work failed: {}", e);
        }
    }
}
