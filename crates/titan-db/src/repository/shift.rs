//! # Shift Repository
//!
//! Database operations for the shift aggregate root.
//!
//! ## Shift Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Shift Lifecycle                                   │
//! │                                                                         │
//! │  1. CLOCK IN                                                           │
//! │     └── insert() → Shift { status: Active, clock_out_id: NULL }        │
//! │         (partial unique index: one active shift per user)              │
//! │                                                                         │
//! │  2. DURING THE SHIFT                                                   │
//! │     └── update() → refreshed totals (sales, breaks, hours)             │
//! │                                                                         │
//! │  3. CLOCK OUT / STALE SWEEP                                            │
//! │     └── update() → Shift { status: Ended | PendingReview }             │
//! │         (CHECK: status = active exactly when clock_out_id is NULL)     │
//! │                                                                         │
//! │  4. REVIEW                                                             │
//! │     └── update() → PendingReview → Ended once approved                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use titan_core::Shift;

const SELECT_SHIFT: &str = r#"
    SELECT id, user_id, business_id, schedule_id, terminal_id,
           clock_in_id, clock_out_id, status, started_at, ended_at,
           starting_cash_cents, total_sales_cents, total_transactions,
           total_refunds_cents, total_voids, total_seconds, regular_seconds,
           overtime_seconds, break_duration_seconds, created_at, updated_at
    FROM shifts
"#;

/// Repository for shifts.
pub struct ShiftRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ShiftRepository<'c> {
    /// Creates a repository over a borrowed connection or transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ShiftRepository { conn }
    }

    /// Inserts a new shift.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` if the user already has an active shift
    /// or the clock-in event already opened a shift.
    pub async fn insert(&mut self, shift: &Shift) -> DbResult<()> {
        debug!(id = %shift.id, user_id = %shift.user_id, "Inserting shift");

        sqlx::query(
            r#"
            INSERT INTO shifts (
                id, user_id, business_id, schedule_id, terminal_id,
                clock_in_id, clock_out_id, status, started_at, ended_at,
                starting_cash_cents, total_sales_cents, total_transactions,
                total_refunds_cents, total_voids, total_seconds, regular_seconds,
                overtime_seconds, break_duration_seconds, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21
            )
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.user_id)
        .bind(&shift.business_id)
        .bind(&shift.schedule_id)
        .bind(&shift.terminal_id)
        .bind(&shift.clock_in_id)
        .bind(&shift.clock_out_id)
        .bind(shift.status)
        .bind(shift.started_at)
        .bind(shift.ended_at)
        .bind(shift.starting_cash_cents)
        .bind(shift.total_sales_cents)
        .bind(shift.total_transactions)
        .bind(shift.total_refunds_cents)
        .bind(shift.total_voids)
        .bind(shift.total_seconds)
        .bind(shift.regular_seconds)
        .bind(shift.overtime_seconds)
        .bind(shift.break_duration_seconds)
        .bind(shift.created_at)
        .bind(shift.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets a shift by ID.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Shift>> {
        let sql = format!("{SELECT_SHIFT} WHERE id = ?1");
        let shift = sqlx::query_as::<_, Shift>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(shift)
    }

    /// The user's active shift, if any.
    pub async fn get_active_for_user(&mut self, user_id: &str) -> DbResult<Option<Shift>> {
        let sql = format!("{SELECT_SHIFT} WHERE user_id = ?1 AND status = 'active'");
        let shift = sqlx::query_as::<_, Shift>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(shift)
    }

    /// Writes every mutable column of a shift.
    ///
    /// Identity columns (user, business, terminal, clock-in) never change.
    pub async fn update(&mut self, shift: &Shift) -> DbResult<()> {
        debug!(id = %shift.id, status = shift.status.as_str(), "Updating shift");

        let result = sqlx::query(
            r#"
            UPDATE shifts SET
                schedule_id = ?2,
                clock_out_id = ?3,
                status = ?4,
                ended_at = ?5,
                starting_cash_cents = ?6,
                total_sales_cents = ?7,
                total_transactions = ?8,
                total_refunds_cents = ?9,
                total_voids = ?10,
                total_seconds = ?11,
                regular_seconds = ?12,
                overtime_seconds = ?13,
                break_duration_seconds = ?14,
                updated_at = ?15
            WHERE id = ?1
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.schedule_id)
        .bind(&shift.clock_out_id)
        .bind(shift.status)
        .bind(shift.ended_at)
        .bind(shift.starting_cash_cents)
        .bind(shift.total_sales_cents)
        .bind(shift.total_transactions)
        .bind(shift.total_refunds_cents)
        .bind(shift.total_voids)
        .bind(shift.total_seconds)
        .bind(shift.regular_seconds)
        .bind(shift.overtime_seconds)
        .bind(shift.break_duration_seconds)
        .bind(shift.updated_at)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shift", &shift.id));
        }

        Ok(())
    }

    /// Active shifts that started before `cutoff` (stale sweep candidates).
    pub async fn list_active_started_before(&mut self, cutoff: i64) -> DbResult<Vec<Shift>> {
        let sql = format!(
            "{SELECT_SHIFT} WHERE status = 'active' AND started_at < ?1 ORDER BY started_at ASC"
        );
        let shifts = sqlx::query_as::<_, Shift>(&sql)
            .bind(cutoff)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(shifts)
    }

    /// The user's shifts that started in `[from, to)`, earliest first.
    pub async fn list_for_user_between(
        &mut self,
        user_id: &str,
        from: i64,
        to: i64,
    ) -> DbResult<Vec<Shift>> {
        let sql = format!(
            "{SELECT_SHIFT} WHERE user_id = ?1 AND started_at >= ?2 AND started_at < ?3 ORDER BY started_at ASC"
        );
        let shifts = sqlx::query_as::<_, Shift>(&sql)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(shifts)
    }

    /// Other shifts of the user whose interval touches `[from, to)`.
    ///
    /// Open shifts count as extending forever.
    pub async fn list_overlapping(
        &mut self,
        user_id: &str,
        exclude_id: &str,
        from: i64,
        to: i64,
    ) -> DbResult<Vec<Shift>> {
        let sql = format!(
            r#"{SELECT_SHIFT}
            WHERE user_id = ?1 AND id <> ?2
              AND started_at < ?4
              AND (ended_at IS NULL OR ended_at > ?3)
            ORDER BY started_at ASC"#
        );
        let shifts = sqlx::query_as::<_, Shift>(&sql)
            .bind(user_id)
            .bind(exclude_id)
            .bind(from)
            .bind(to)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(shifts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
