//! # Break Repository
//!
//! Breaks taken within a shift. A partial unique index allows at most one
//! `active` break per shift, so two terminals racing to start a break for
//! the same shift cannot both succeed.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use titan_core::Break;

const SELECT_BREAK: &str = r#"
    SELECT id, shift_id, user_id, break_type, start_time, end_time,
           duration_seconds, is_paid, status, is_required,
           minimum_duration_seconds, is_missed, is_short
    FROM breaks
"#;

/// Repository for breaks.
pub struct BreakRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> BreakRepository<'c> {
    /// Creates a repository over a borrowed connection or transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        BreakRepository { conn }
    }

    /// Inserts a break.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` if the shift already has an active break.
    pub async fn insert(&mut self, brk: &Break) -> DbResult<()> {
        debug!(id = %brk.id, shift_id = %brk.shift_id, status = brk.status.as_str(), "Inserting break");

        sqlx::query(
            r#"
            INSERT INTO breaks (
                id, shift_id, user_id, break_type, start_time, end_time,
                duration_seconds, is_paid, status, is_required,
                minimum_duration_seconds, is_missed, is_short
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&brk.id)
        .bind(&brk.shift_id)
        .bind(&brk.user_id)
        .bind(brk.break_type)
        .bind(brk.start_time)
        .bind(brk.end_time)
        .bind(brk.duration_seconds)
        .bind(brk.is_paid)
        .bind(brk.status)
        .bind(brk.is_required)
        .bind(brk.minimum_duration_seconds)
        .bind(brk.is_missed)
        .bind(brk.is_short)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets a break by ID.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Break>> {
        let sql = format!("{SELECT_BREAK} WHERE id = ?1");
        let brk = sqlx::query_as::<_, Break>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(brk)
    }

    /// All breaks of a shift in start order.
    pub async fn list_for_shift(&mut self, shift_id: &str) -> DbResult<Vec<Break>> {
        let sql = format!("{SELECT_BREAK} WHERE shift_id = ?1 ORDER BY start_time ASC, id ASC");
        let breaks = sqlx::query_as::<_, Break>(&sql)
            .bind(shift_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(breaks)
    }

    /// Writes the state columns of a break (end, duration, status, flags).
    pub async fn update(&mut self, brk: &Break) -> DbResult<()> {
        debug!(id = %brk.id, status = brk.status.as_str(), "Updating break");

        let result = sqlx::query(
            r#"
            UPDATE breaks SET
                end_time = ?2,
                duration_seconds = ?3,
                status = ?4,
                is_missed = ?5,
                is_short = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&brk.id)
        .bind(brk.end_time)
        .bind(brk.duration_seconds)
        .bind(brk.status)
        .bind(brk.is_missed)
        .bind(brk.is_short)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Break", &brk.id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{active_shift, db};
    use titan_core::{BreakStatus, BreakType};

    const MIN_MS: i64 = 60_000;

    fn active_break(id: &str, shift_id: &str, start: i64) -> Break {
        Break {
            id: id.to_string(),
            shift_id: shift_id.to_string(),
            user_id: "u-1".to_string(),
            break_type: BreakType::Rest,
            start_time: start,
            end_time: None,
            duration_seconds: None,
            is_paid: true,
            status: BreakStatus::Active,
            is_required: false,
            minimum_duration_seconds: Some(600),
            is_missed: false,
            is_short: false,
        }
    }

    #[tokio::test]
    async fn test_one_active_break_per_shift() {
        let db = db().await;
        let mut conn = db.acquire().await.unwrap();
        active_shift(&mut conn, "s-1", "u-1", 0).await;

        let mut repo = BreakRepository::new(&mut conn);
        repo.insert(&active_break("b-1", "s-1", MIN_MS)).await.unwrap();
        let err = repo.insert(&active_break("b-2", "s-1", 2 * MIN_MS)).await.unwrap_err();
        assert_eq!(err.invariant(), Some("one active break per shift"));
    }

    #[tokio::test]
    async fn test_end_break_then_start_another() {
        let db = db().await;
        let mut conn = db.acquire().await.unwrap();
        active_shift(&mut conn, "s-1", "u-1", 0).await;

        let mut repo = BreakRepository::new(&mut conn);
        let mut brk = active_break("b-1", "s-1", MIN_MS);
        repo.insert(&brk).await.unwrap();

        brk.end_time = Some(16 * MIN_MS);
        brk.duration_seconds = Some(900);
        brk.status = BreakStatus::Completed;
        repo.update(&brk).await.unwrap();

        repo.insert(&active_break("b-2", "s-1", 30 * MIN_MS)).await.unwrap();

        let breaks = repo.list_for_shift("s-1").await.unwrap();
        assert_eq!(breaks.len(), 2);
        assert_eq!(breaks[0], brk);
        assert_eq!(repo.get_by_id("b-2").await.unwrap().unwrap().status, BreakStatus::Active);
    }

    #[tokio::test]
    async fn test_end_must_follow_start() {
        let db = db().await;
        let mut conn = db.acquire().await.unwrap();
        active_shift(&mut conn, "s-1", "u-1", 0).await;

        let mut repo = BreakRepository::new(&mut conn);
        let mut brk = active_break("b-1", "s-1", MIN_MS);
        repo.insert(&brk).await.unwrap();

        brk.end_time = Some(MIN_MS);
        brk.status = BreakStatus::Completed;
        assert!(repo.update(&brk).await.is_err());
    }
}
