#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `SQLite` store of known accident locations.
//!
//! The database has two tables: `model_data`, one row per historical
//! location with its road features, and `zip_codes`, the zip codes served.
//! Booleans are stored as `INTEGER` 0/1. All access goes through
//! `switchy_database`.

pub mod db;
pub mod queries;

use std::path::{Path, PathBuf};

use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// The connection could not be opened.
    #[error("Failed to open database: {message}")]
    Open {
        /// Description of what went wrong.
        message: String,
    },

    /// The database file does not exist.
    #[error("Database not found at {}", path.display())]
    Missing {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Opens an existing locations database.
///
/// # Errors
///
/// Returns [`DbError::Missing`] if there is no file at `path`, or
/// [`DbError::Open`] if it cannot be opened.
pub fn open(path: &Path) -> Result<Box<dyn Database>, DbError> {
    if !path.exists() {
        return Err(DbError::Missing {
            path: path.to_path_buf(),
        });
    }

    log::debug!("Opening locations database {}", path.display());
    init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Open {
        message: e.to_string(),
    })
}

/// Opens (or creates) a locations database and ensures its tables exist.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be created or the schema DDL
/// fails.
pub async fn create(path: &Path) -> Result<Box<dyn Database>, DbError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Open {
        message: e.to_string(),
    })?;
    ensure_schema(db.as_ref()).await?;
    Ok(db)
}

/// Creates the `model_data` and `zip_codes` tables if they don't exist.
///
/// # Errors
///
/// Returns [`DbError`] if the DDL fails.
pub async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS model_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            Start_Lat REAL NOT NULL,
            Start_Lng REAL NOT NULL,
            Amenity INTEGER NOT NULL DEFAULT 0,
            Bump INTEGER NOT NULL DEFAULT 0,
            Crossing INTEGER NOT NULL DEFAULT 0,
            Give_Way INTEGER NOT NULL DEFAULT 0,
            Junction INTEGER NOT NULL DEFAULT 0,
            No_Exit INTEGER NOT NULL DEFAULT 0,
            Railway INTEGER NOT NULL DEFAULT 0,
            Roundabout INTEGER NOT NULL DEFAULT 0,
            Station INTEGER NOT NULL DEFAULT 0,
            Stop INTEGER NOT NULL DEFAULT 0,
            Traffic_Calming INTEGER NOT NULL DEFAULT 0,
            Traffic_Signal INTEGER NOT NULL DEFAULT 0,
            Turning_Loop INTEGER NOT NULL DEFAULT 0,
            Zip_Code TEXT
        )",
    )
    .await?;

    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_model_data_zip ON model_data (Zip_Code)")
        .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS zip_codes (
            zip_code TEXT PRIMARY KEY
        )",
    )
    .await?;

    Ok(())
}
