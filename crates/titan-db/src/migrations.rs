//! # Schema Migrations
//!
//! The shift schema ships inside the binary (`migrations/sqlite/*.sql`) and
//! is brought up to date when a terminal opens its store.
//!
//! ```text
//! open store ──► _sqlx_migrations ──► apply pending, in file order
//!                    │
//!                    └── checksum of an applied file changed? refuse to start
//! ```
//!
//! Applied files are never edited. A schema change is a new `NNN_*.sql`
//! file, and any rule that racing terminals could break belongs in a UNIQUE
//! index there, not in service code alone.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Where the store's schema stands relative to this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaVersion {
    /// Highest migration version recorded as applied (0 for a fresh file).
    pub applied: i64,
    /// Highest migration version embedded in this build.
    pub latest: i64,
}

impl SchemaVersion {
    pub fn is_current(&self) -> bool {
        self.applied == self.latest
    }
}

/// Applies every embedded migration the store has not seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let before = schema_version(pool).await?;
    if before.is_current() {
        info!(version = before.applied, "Shift schema up to date");
        return Ok(());
    }

    if before.applied > before.latest {
        // The run below fails with MigrationFailed on an unknown version.
        warn!(
            applied = before.applied,
            latest = before.latest,
            "Shift store was migrated by a newer build"
        );
    }

    MIGRATOR.run(pool).await?;
    info!(from = before.applied, to = before.latest, "Shift schema migrated");
    Ok(())
}

/// Reads the applied schema version without changing anything.
pub async fn schema_version(pool: &SqlitePool) -> DbResult<SchemaVersion> {
    let latest = MIGRATOR.iter().map(|m| m.version).max().unwrap_or(0);

    let table: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_optional(pool)
    .await?;

    let applied = match table {
        Some(_) => {
            sqlx::query_scalar::<_, Option<i64>>(
                "SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1",
            )
            .fetch_one(pool)
            .await?
            .unwrap_or(0)
        }
        None => 0,
    };

    Ok(SchemaVersion { applied, latest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_fresh_store_reaches_latest() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        let fresh = schema_version(db.pool()).await.unwrap();
        assert_eq!(fresh.applied, 0);
        assert!(fresh.latest >= 1);

        run_migrations(db.pool()).await.unwrap();
        assert!(schema_version(db.pool()).await.unwrap().is_current());

        // Second run is a no-op
        run_migrations(db.pool()).await.unwrap();
    }

    #[tokio::test]
    async fn test_race_guards_are_unique_indexes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND sql LIKE 'CREATE UNIQUE%'",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        for expected in [
            "idx_shifts_one_active_per_user",
            "idx_breaks_one_active_per_shift",
            "idx_counts_one_end_shift",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }
}
