//! Shared storage plumbing: the repository error type and SQLite bootstrap.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    token TEXT
);

CREATE TABLE IF NOT EXISTS agencies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    office_name TEXT,
    address1 TEXT,
    address2 TEXT,
    logo TEXT,
    site TEXT,
    site_name TEXT,
    acquaint_site_prefix TEXT,
    daft_api_key TEXT,
    fourpm_branch_id INTEGER,
    myhome_api_key TEXT,
    myhome_group_id INTEGER,
    unique_key TEXT,
    whmcs_id TEXT,
    ghl_id TEXT,
    primary_source TEXT,
    total_properties INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_agencies_unique_key ON agencies(unique_key);

CREATE TABLE IF NOT EXISTS field_mappings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    field_name TEXT,
    acquaint_crm TEXT,
    propertydrive TEXT,
    daft TEXT,
    myhome TEXT
);
"#;

/// Open a SQLite pool for `url` and make sure the tables exist.
///
/// In-memory URLs (`sqlite::memory:`) are pinned to a single connection so every
/// query sees the same database.
pub async fn connect_sqlite(url: &str) -> Result<SqlitePool, RepositoryError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    bootstrap(&pool).await?;
    Ok(pool)
}

/// Create the tables used by the SQLite repositories when they are missing.
pub async fn bootstrap(pool: &SqlitePool) -> Result<(), RepositoryError> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}
