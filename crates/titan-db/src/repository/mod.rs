//! # Repository Module
//!
//! Database repository implementations for shift tracking.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories Over a Borrowed Connection              │
//! │                                                                         │
//! │  ShiftService                                                          │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                               │
//! │       │  BreakRepository::new(&mut tx).insert(&brk)                    │
//! │       ▼                                                                 │
//! │  BreakRepository<'c> { conn: &'c mut SqliteConnection }                │
//! │  ├── insert(&mut self, brk)                                            │
//! │  ├── get_by_id(&mut self, id)                                          │
//! │  ├── list_for_shift(&mut self, shift_id)                               │
//! │  └── update(&mut self, brk)                                            │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every repository works on either a pooled connection or an open       │
//! │  transaction, so a multi-table operation commits atomically.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`StaffRepository`](staff::StaffRepository) - Staff lookup (role, PIN hash)
//! - [`ScheduleRepository`](schedule::ScheduleRepository) - Scheduled shifts
//! - [`ClockEventRepository`](clock_event::ClockEventRepository) - Append-only clock events
//! - [`ShiftRepository`](shift::ShiftRepository) - Shift aggregate root
//! - [`BreakRepository`](breaks::BreakRepository) - Breaks within a shift
//! - [`CashCountRepository`](cash_count::CashCountRepository) - Drawer counts
//! - [`TransactionRepository`](transaction::TransactionRepository) - Sales read model
//! - [`ValidationRepository`](validation::ValidationRepository) - Verdicts and issues

pub mod breaks;
pub mod cash_count;
pub mod clock_event;
pub mod schedule;
pub mod shift;
pub mod staff;
pub mod transaction;
pub mod validation;

/// Shared fixtures for repository tests.
#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqliteConnection;
    use titan_core::{ClockEvent, ClockEventStatus, ClockEventType, ClockMethod, Shift, ShiftStatus};

    use super::clock_event::ClockEventRepository;
    use super::shift::ShiftRepository;
    use crate::pool::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn clock_event(id: &str, user_id: &str, event_type: ClockEventType, ts: i64) -> ClockEvent {
        ClockEvent {
            id: id.to_string(),
            user_id: user_id.to_string(),
            business_id: "biz-1".to_string(),
            terminal_id: "till-1".to_string(),
            schedule_id: None,
            event_type,
            timestamp: ts,
            method: ClockMethod::Manual,
            status: ClockEventStatus::Confirmed,
            created_at: ts,
        }
    }

    /// Inserts a clock-in event and an active shift for `user_id`.
    pub async fn active_shift(conn: &mut SqliteConnection, id: &str, user_id: &str, started_at: i64) -> Shift {
        let event = clock_event(&format!("{id}-in"), user_id, ClockEventType::In, started_at);
        ClockEventRepository::new(conn).insert(&event).await.unwrap();

        let shift = Shift {
            id: id.to_string(),
            user_id: user_id.to_string(),
            business_id: "biz-1".to_string(),
            schedule_id: None,
            terminal_id: "till-1".to_string(),
            clock_in_id: event.id.clone(),
            clock_out_id: None,
            status: ShiftStatus::Active,
            started_at,
            ended_at: None,
            starting_cash_cents: Some(10_000),
            total_sales_cents: 0,
            total_transactions: 0,
            total_refunds_cents: 0,
            total_voids: 0,
            total_seconds: 0,
            regular_seconds: 0,
            overtime_seconds: 0,
            break_duration_seconds: 0,
            created_at: started_at,
            updated_at: started_at,
        };
        ShiftRepository::new(conn).insert(&shift).await.unwrap();
        shift
    }
}
