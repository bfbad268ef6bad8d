//! # Cash Count Repository
//!
//! Cash drawer counts recorded during and at the end of a shift. The table
//! enforces `variance = counted − expected` and a single end-shift count
//! per shift.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use titan_core::CashDrawerCount;

const SELECT_COUNT: &str = r#"
    SELECT id, shift_id, count_type, expected_cents, counted_cents,
           variance_cents, counted_by, notes, requires_approval,
           approved_by, approved_at, timestamp
    FROM cash_drawer_counts
"#;

/// Repository for cash drawer counts.
pub struct CashCountRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CashCountRepository<'c> {
    /// Creates a repository over a borrowed connection or transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CashCountRepository { conn }
    }

    /// Inserts a count.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` for a second end-shift count.
    pub async fn insert(&mut self, count: &CashDrawerCount) -> DbResult<()> {
        debug!(
            id = %count.id,
            shift_id = %count.shift_id,
            variance_cents = count.variance_cents,
            "Inserting cash count"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_drawer_counts (
                id, shift_id, count_type, expected_cents, counted_cents,
                variance_cents, counted_by, notes, requires_approval,
                approved_by, approved_at, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&count.id)
        .bind(&count.shift_id)
        .bind(count.count_type)
        .bind(count.expected_cents)
        .bind(count.counted_cents)
        .bind(count.variance_cents)
        .bind(&count.counted_by)
        .bind(&count.notes)
        .bind(count.requires_approval)
        .bind(&count.approved_by)
        .bind(count.approved_at)
        .bind(count.timestamp)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets a count by ID.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<CashDrawerCount>> {
        let sql = format!("{SELECT_COUNT} WHERE id = ?1");
        let count = sqlx::query_as::<_, CashDrawerCount>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(count)
    }

    /// All counts of a shift in the order they were taken.
    pub async fn list_for_shift(&mut self, shift_id: &str) -> DbResult<Vec<CashDrawerCount>> {
        let sql = format!("{SELECT_COUNT} WHERE shift_id = ?1 ORDER BY timestamp ASC, id ASC");
        let counts = sqlx::query_as::<_, CashDrawerCount>(&sql)
            .bind(shift_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(counts)
    }

    /// Records a manager approval.
    ///
    /// Only an unapproved count is touched, so a concurrent second approval
    /// reports `NotFound` instead of overwriting the first.
    pub async fn approve(&mut self, id: &str, approved_by: &str, approved_at: i64) -> DbResult<()> {
        debug!(id = %id, approved_by = %approved_by, "Approving cash count");

        let result = sqlx::query(
            r#"
            UPDATE cash_drawer_counts
            SET approved_by = ?2, approved_at = ?3
            WHERE id = ?1 AND approved_by IS NULL
            "#,
        )
        .bind(id)
        .bind(approved_by)
        .bind(approved_at)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CashDrawerCount", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
