//! # Schedule Repository
//!
//! Scheduled work windows. Read by clock-in (schedule matching), by the
//! "today's schedule" query and by the late clock-in rule.

use sqlx::SqliteConnection;

use crate::error::DbResult;
use titan_core::Schedule;

/// Repository for schedules.
pub struct ScheduleRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ScheduleRepository<'c> {
    /// Creates a repository over a borrowed connection or transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ScheduleRepository { conn }
    }

    /// Inserts a schedule (seeding and tests).
    pub async fn insert(&mut self, schedule: &Schedule) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO schedules (id, user_id, business_id, start_time, end_time, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&schedule.id)
        .bind(&schedule.user_id)
        .bind(&schedule.business_id)
        .bind(schedule.start_time)
        .bind(schedule.end_time)
        .bind(schedule.status)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets a schedule by ID.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Schedule>> {
        let schedule = sqlx::query_as::<_, Schedule>(
            "SELECT id, user_id, business_id, start_time, end_time, status FROM schedules WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(schedule)
    }

    /// Schedules of a user that start in `[from, to)`, earliest first.
    ///
    /// Cancelled schedules are included; callers decide whether they count.
    pub async fn list_for_user_between(
        &mut self,
        user_id: &str,
        from: i64,
        to: i64,
    ) -> DbResult<Vec<Schedule>> {
        let schedules = sqlx::query_as::<_, Schedule>(
            r#"
            SELECT id, user_id, business_id, start_time, end_time, status
            FROM schedules
            WHERE user_id = ?1 AND start_time >= ?2 AND start_time < ?3
            ORDER BY start_time ASC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(schedules)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
