//! SQLite storage for accounts.
//!
//! Three tables back the identity model: `users` (keyed by UUID, unique
//! normalized email), `auth_groups` and the `user_groups` membership table,
//! whose rows go away with either side through `ON DELETE CASCADE`. The
//! [`UserStore`](crate::users::UserStore) implementation lives in
//! [`queries`]; migrations live in [`schema`].

pub mod queries;
pub mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::errors::DatabaseError;

/// How long a writer waits on a locked database file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle on the account database.
///
/// One connection behind a `Mutex`: handlers reach it from the blocking
/// pool, and SQLite serializes writers anyway.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database file at `path`, creating it and its directory if
    /// needed. The schema is not touched; see [`initialize`](Self::initialize).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let journal: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        enable_foreign_keys(&conn)?;

        info!(path = %path.display(), journal = %journal, "account database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the database at `path` and bring its schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let db = Self::new(path)?;
        db.initialize()?;
        Ok(db)
    }

    /// A private in-memory database, gone when the handle drops.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        enable_foreign_keys(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Apply pending migrations.
    pub fn initialize(&self) -> Result<(), DatabaseError> {
        let conn = self.conn();
        schema::run_migrations(&conn)?;
        debug!(version = schema::latest_version(), "account schema ready");
        Ok(())
    }

    /// Migration level recorded in the file.
    pub fn schema_version(&self) -> Result<u32, DatabaseError> {
        schema::get_schema_version(&self.conn())
    }

    /// The connection. A lock poisoned by a panicking holder is taken over.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("account database lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Run `f` in one transaction: committed on `Ok`, rolled back on `Err`.
    pub fn transaction<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

/// Memberships rely on cascading deletes, which SQLite only enforces per
/// connection when asked.
fn enable_foreign_keys(conn: &Connection) -> Result<(), DatabaseError> {
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(())
}
