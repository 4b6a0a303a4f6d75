pub mod auth;
pub mod config;
pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod uow;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

pub use auth::{authenticate, signup};
pub use config::{DbConfig, DbLocation};
pub use error::{DbError, Result};
pub use models::{LikeToggle, NewMessage, NewUser, ProfileUpdate};
pub use queries::DEFAULT_TIMELINE_LIMIT;
pub use uow::UnitOfWork;

/// Tables in dependency order, children first.
pub const TABLES: [&str; 4] = ["likes", "follows", "messages", "users"];

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let db = Self::init(conn)?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self::init(Connection::open_in_memory()?)?;
        info!("In-memory database opened");
        Ok(db)
    }

    pub fn connect(config: &DbConfig) -> Result<Self> {
        match &config.location {
            DbLocation::Memory => Self::open_in_memory(),
            DbLocation::File(path) => Self::open(path),
        }
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// A panic while the connection was held poisons the mutex. Any unit of
    /// work open at the time has already rolled back in its `Drop`, so the
    /// poison is cleared and the connection reused.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        match self.conn.lock() {
            Ok(conn) => Ok(conn),
            Err(poisoned) => {
                warn!("Recovering database connection after a panic");
                self.conn.clear_poison();
                let conn = poisoned.into_inner();
                // A panic inside `with_conn` can leave a raw transaction open
                if !conn.is_autocommit() {
                    conn.execute_batch("ROLLBACK")?;
                }
                Ok(conn)
            }
        }
    }

    /// Run `f` against the raw connection, outside any unit of work.
    ///
    /// Blocks while a `UnitOfWork` is open; never call it from inside one.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Open a unit of work. It holds the connection until committed,
    /// rolled back, or dropped; dropping it uncommitted rolls back.
    pub fn begin(&self) -> Result<UnitOfWork<'_>> {
        UnitOfWork::begin(self.lock()?)
    }

    /// Run `f` in a fresh unit of work, committing if it returns `Ok` and
    /// rolling back otherwise.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T>,
    {
        let uow = self.begin()?;
        let value = f(&uow)?;
        uow.commit()?;
        Ok(value)
    }

    /// Drop every table and recreate the schema.
    pub fn reset(&self) -> Result<()> {
        self.with_conn(|conn| {
            migrations::drop_all(conn)?;
            migrations::run(conn)?;
            info!("Database reset");
            Ok(())
        })
    }

    /// Row count of every table, in `TABLES` order.
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        self.with_conn(|conn| {
            TABLES
                .iter()
                .map(|table| {
                    let count: i64 =
                        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                            row.get(0)
                        })?;
                    Ok::<_, DbError>((*table, count))
                })
                .collect()
        })
    }
}
