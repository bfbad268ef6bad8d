//! # Shift Store Connection Pool
//!
//! Opens the SQLite file that holds clock events, shifts, breaks, drawer
//! counts and validation verdicts, and hands out transactions.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Several terminals, one shift store                      │
//! │                                                                         │
//! │   till-1 clock_in ─────┐                                                │
//! │   till-2 clock_in ─────┼──► begin() ──► BEGIN ... COMMIT                │
//! │   sweep job ───────────┘        │                                       │
//! │                                 │  SQLite admits one writer at a time.  │
//! │                                 │  The others wait up to busy_timeout,  │
//! │                                 │  then re-check state inside their own │
//! │                                 │  transaction. A loser that slips past │
//! │                                 │  the check hits a UNIQUE index.       │
//! │                                 ▼                                       │
//! │   get_active / get_validation ──► acquire() (readers never block: WAL)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the shift store.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/titan/titan.db")
///     .max_connections(4)
///     .busy_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// One per terminal plus background jobs. Default: 5.
    pub max_connections: u32,

    /// How long to wait for a free pooled connection. Default: 30s.
    pub acquire_timeout: Duration,

    /// How long a writer waits on another terminal's open transaction
    /// before failing with `SQLITE_BUSY`. Default: 5s.
    pub busy_timeout: Duration,

    /// Apply pending migrations on open. Default: true.
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed store, created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private in-memory store for tests.
    ///
    /// Every pooled connection would get its own empty database, so the pool
    /// is pinned to a single connection. Never hold a transaction and ask
    /// for a second connection at the same time.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// True for the `:memory:` store.
    pub fn is_memory(&self) -> bool {
        self.database_path == Path::new(MEMORY_PATH)
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                // Readers keep working while a terminal writes
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        // Shift, break and verdict rows reference each other; SQLite
        // leaves enforcement off unless asked.
        Ok(options
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the shift store. Cheap to clone; clones share the pool.
///
/// Repositories do not own a connection. They borrow one for the length of
/// an operation: a pooled connection for reads, an open transaction for
/// anything that writes.
///
/// ```text
/// let mut tx = db.begin().await?;
/// ├── ShiftRepository::new(&mut tx).get_active_for_user(..)
/// ├── ClockEventRepository::new(&mut tx).insert(..)
/// └── ShiftRepository::new(&mut tx).insert(..)
/// tx.commit().await?;   ← all or nothing
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the store and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening shift store"
        );

        let options = config.connect_options()?;
        debug!(busy_timeout_ms = config.busy_timeout.as_millis() as u64, "Connect options ready");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            // An in-memory database dies with its last connection
            .idle_timeout(if config.is_memory() { None } else { Some(Duration::from_secs(600)) })
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }

        Ok(db)
    }

    /// Underlying pool, for migrations and diagnostics.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a write transaction.
    ///
    /// Dropping it without `commit()` rolls back, so an early `?` return
    /// leaves no partial shift behind.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    /// Checks out a pooled connection for reads.
    pub async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// Closes every connection. Later `begin()`/`acquire()` calls fail.
    pub async fn close(&self) {
        info!("Closing shift store");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn staff_count(db: &Database) -> i64 {
        let mut conn = db.acquire().await.unwrap();
        sqlx::query_scalar("SELECT COUNT(*) FROM staff")
            .fetch_one(&mut *conn)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(staff_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_drop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        {
            let mut tx = db.begin().await.unwrap();
            sqlx::query(
                "INSERT INTO staff (id, business_id, display_name, role) VALUES ('u-1', 'b', 'Ann', 'cashier')",
            )
            .execute(&mut *tx)
            .await
            .unwrap();
            // dropped without commit
        }

        assert_eq!(staff_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_closed_store_refuses_work() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(db.begin().await.is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/shift.db")
            .max_connections(3)
            .busy_timeout(Duration::from_millis(250))
            .run_migrations(false);

        assert_eq!(config.max_connections, 3);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.run_migrations);
        assert!(!config.is_memory());
        assert!(DbConfig::in_memory().is_memory());
    }
}
