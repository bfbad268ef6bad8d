//! # titan-db: Database Layer for Titan POS Shifts
//!
//! This crate persists clock events, shifts, breaks, cash counts and
//! validation verdicts. It uses SQLite for local storage with sqlx for
//! async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Titan POS Shift Data Flow                        │
//! │                                                                         │
//! │  ShiftService::clock_out (titan-shift)                                  │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                                │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     titan-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌─────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories   │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (borrow a conn) │   │  (embedded)  │  │   │
//! │  │   │               │    │                 │   │              │  │   │
//! │  │   │ SqlitePool    │    │ ShiftRepo       │   │ 001_shift_   │  │   │
//! │  │   │ begin()       │◄───│ BreakRepo       │   │   schema.sql │  │   │
//! │  │   │ acquire()     │    │ ValidationRepo  │   │              │  │   │
//! │  │   └───────────────┘    └─────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/Library/Application Support/com.titan.pos/titan.db         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (shift, break, validation, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use titan_db::{Database, DbConfig, ShiftRepository};
//!
//! let db = Database::new(DbConfig::new("path/to/db.sqlite")).await?;
//!
//! // Reads use a pooled connection
//! let mut conn = db.acquire().await?;
//! let active = ShiftRepository::new(&mut conn).get_active_for_user("u-1").await?;
//!
//! // Writes that touch several tables share one transaction
//! let mut tx = db.begin().await?;
//! ShiftRepository::new(&mut tx).update(&shift).await?;
//! BreakRepository::new(&mut tx).update(&brk).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::breaks::BreakRepository;
pub use repository::cash_count::CashCountRepository;
pub use repository::clock_event::ClockEventRepository;
pub use repository::schedule::ScheduleRepository;
pub use repository::shift::ShiftRepository;
pub use repository::staff::StaffRepository;
pub use repository::transaction::TransactionRepository;
pub use repository::validation::ValidationRepository;
