//! # Clock Event Repository
//!
//! Append-only storage for clock-in and clock-out events. There is no
//! update or delete: corrections are recorded as new facts elsewhere.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use titan_core::ClockEvent;

/// Repository for clock events.
pub struct ClockEventRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ClockEventRepository<'c> {
    /// Creates a repository over a borrowed connection or transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ClockEventRepository { conn }
    }

    /// Appends a clock event.
    pub async fn insert(&mut self, event: &ClockEvent) -> DbResult<()> {
        debug!(
            id = %event.id,
            user_id = %event.user_id,
            event_type = ?event.event_type,
            "Recording clock event"
        );

        sqlx::query(
            r#"
            INSERT INTO clock_events (
                id, user_id, business_id, terminal_id, schedule_id,
                event_type, timestamp, method, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&event.id)
        .bind(&event.user_id)
        .bind(&event.business_id)
        .bind(&event.terminal_id)
        .bind(&event.schedule_id)
        .bind(event.event_type)
        .bind(event.timestamp)
        .bind(event.method)
        .bind(event.status)
        .bind(event.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets a clock event by ID.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<ClockEvent>> {
        let event = sqlx::query_as::<_, ClockEvent>(
            r#"
            SELECT id, user_id, business_id, terminal_id, schedule_id,
                   event_type, timestamp, method, status, created_at
            FROM clock_events
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(event)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{clock_event, db};
    use titan_core::ClockEventType;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let mut conn = db.acquire().await.unwrap();
        let mut repo = ClockEventRepository::new(&mut conn);

        let event = clock_event("e-1", "u-1", ClockEventType::In, 1_000);
        repo.insert(&event).await.unwrap();

        assert_eq!(repo.get_by_id("e-1").await.unwrap(), Some(event.clone()));

        // Same ID twice is a unique violation
        let err = repo.insert(&event).await.unwrap_err();
        assert!(matches!(err, crate::DbError::UniqueViolation { .. }));
    }
}
