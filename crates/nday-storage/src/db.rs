//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex. Configures WAL mode and the
//! durability PRAGMAs on open, and classifies SQLite failures into transient
//! storage errors and corruption.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use tracing::{info, warn};

use nday_core::config::StorageConfig;
use nday_core::error::NdayError;

use crate::migrations;

/// Convert a rusqlite error into the store's error taxonomy.
///
/// `SQLITE_CORRUPT` and `SQLITE_NOTADB` mean the file itself is unusable. A
/// stored value of the wrong type or out of range means a row cannot be
/// decoded. Both are corruption; everything else is reported as a (possibly
/// transient) storage failure.
pub fn sqlite_error(context: &str, err: rusqlite::Error) -> NdayError {
    let corrupt = match err {
        rusqlite::Error::SqliteFailure(ref ffi_err, _) => matches!(
            ffi_err.code,
            ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase
        ),
        rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => true,
        _ => false,
    };
    if corrupt {
        NdayError::StorageCorruption(format!("{}: {}", context, err))
    } else {
        NdayError::Storage(format!("{}: {}", context, err))
    }
}

/// SQLite database handle owned by the bury store.
///
/// The connection is wrapped in a Mutex since rusqlite Connection is not Sync.
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) a database at the given path with default settings.
    pub fn new(path: &Path) -> Result<Self, NdayError> {
        Self::open(path, &StorageConfig::default())
    }

    /// Open (or create) a database at the given path.
    ///
    /// Configures WAL mode, the `synchronous` level, the busy timeout,
    /// optionally runs `PRAGMA quick_check`, then applies pending migrations.
    pub fn open(path: &Path, config: &StorageConfig) -> Result<Self, NdayError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| sqlite_error("Failed to open database", e))?;

        configure(&conn, config)?;

        if config.check_integrity_on_open {
            quick_check(&conn)?;
        }

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, NdayError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| sqlite_error("Failed to open in-memory db", e))?;

        configure(&conn, &StorageConfig::default())?;

        let db = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Delete the database file (and its WAL/SHM siblings) and create a fresh,
    /// empty store in its place. All previous records are lost.
    pub fn reinitialize(path: &Path, config: &StorageConfig) -> Result<Self, NdayError> {
        for file in sidecar_paths(path) {
            match std::fs::remove_file(&file) {
                Ok(()) => warn!(path = %file.display(), "Removed store file for reinitialization"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Self::open(path, config)
    }

    /// Location of the backing file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, NdayError>
    where
        F: FnOnce(&Connection) -> Result<T, NdayError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| NdayError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a closure inside an exclusive write transaction.
    ///
    /// The transaction is started with `BEGIN IMMEDIATE` so another process
    /// syncing the same file cannot interleave. It commits only if the closure
    /// succeeds; any error rolls everything back.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, NdayError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, NdayError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| NdayError::Storage(format!("Database lock poisoned: {}", e)))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| sqlite_error("Failed to begin transaction", e))?;
        let value = f(&tx)?;
        tx.commit()
            .map_err(|e| sqlite_error("Failed to commit transaction", e))?;
        Ok(value)
    }

    /// Flush the WAL into the main file and close the connection.
    pub fn close(self) -> Result<(), NdayError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|e| NdayError::Storage(format!("Database lock poisoned: {}", e)))?;

        if self.path.is_some() {
            conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
                .map_err(|e| sqlite_error("Failed to checkpoint WAL", e))?;
        }

        conn.close()
            .map_err(|(_, e)| sqlite_error("Failed to close database", e))?;

        if let Some(path) = &self.path {
            info!("Database closed at {}", path.display());
        }
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

fn configure(conn: &Connection, config: &StorageConfig) -> Result<(), NdayError> {
    let synchronous = match config.synchronous.to_ascii_lowercase().as_str() {
        "normal" => "NORMAL",
        "extra" => "EXTRA",
        _ => "FULL",
    };

    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = {};",
        synchronous
    ))
    .map_err(|e| sqlite_error("Failed to set pragmas", e))?;

    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|e| sqlite_error("Failed to set busy timeout", e))?;

    Ok(())
}

fn quick_check(conn: &Connection) -> Result<(), NdayError> {
    let verdict: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(|e| sqlite_error("Integrity check failed", e))?;
    if verdict != "ok" {
        return Err(NdayError::StorageCorruption(format!(
            "Integrity check reported: {}",
            verdict
        )));
    }
    Ok(())
}

fn sidecar_paths(path: &Path) -> [PathBuf; 3] {
    let with_suffix = |suffix: &str| {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };
    [path.to_path_buf(), with_suffix("-wal"), with_suffix("-shm")]
}
