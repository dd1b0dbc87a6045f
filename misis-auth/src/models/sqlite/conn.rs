use std::{error::Error as StdError, time::Duration};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

/// SQLite connection options.
pub struct Options {
    /// Database file path.
    pub path: String,
}

const BUSY_TIMEOUT_SECS: u64 = 10;
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Connect to SQLite. The database file will be created if it does not exist.
pub async fn connect(options: &Options) -> Result<SqlitePool, Box<dyn StdError>> {
    let opts = SqliteConnectOptions::new()
        .filename(options.path.as_str())
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));
    let pool = SqlitePoolOptions::new()
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect_with(opts)
        .await?;
    Ok(pool)
}
