//! # titan-core: Pure Shift Logic for Titan POS
//!
//! This crate is the **heart** of shift tracking in Titan POS. It contains
//! the shift lifecycle rules and the compliance rule engine as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Titan POS Shift Flow                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 titan-shift (ShiftService)                      │   │
//! │  │   clock_in, clock_out, start_break, create_count, run_validation│   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ titan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌────────────┐  ┌──────────────┐   │   │
//! │  │   │ ledger  │─►│ breaks  │─►│ aggregator │─►│    cash      │   │   │
//! │  │   │ in/out  │  │ rest    │  │ hours, OT  │  │  variance    │   │   │
//! │  │   └─────────┘  └─────────┘  └────────────┘  └──────┬───────┘   │   │
//! │  │                                                    ▼           │   │
//! │  │                 ┌────────────┐          ┌──────────────────┐   │   │
//! │  │                 │ resolution │◄─────────│     engine       │   │   │
//! │  │                 │  workflow  │          │  rule catalog    │   │   │
//! │  │                 └────────────┘          └──────────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO WALL CLOCK • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    titan-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (ClockEvent, Shift, Break, CashDrawerCount, ...)
//! - [`issue`] - Validation issue codes, severities and the validation record
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`policy`] - Thresholds the rules read, shift-requirement resolution
//! - [`ledger`] - Clock Event Ledger rules
//! - [`breaks`] - Break Tracker rules
//! - [`aggregator`] - Shift Aggregator (hours, overtime, sales totals)
//! - [`cash`] - Cash Drawer Reconciliation
//! - [`calendar`] - Local day and ISO week boundaries
//! - [`refund_chain`] - Bounded walk over refund → original links
//! - [`engine`] - Validation Rule Engine
//! - [`resolution`] - Issue Resolution state machine
//! - [`validation`] - Input validators
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, the caller supplies `now`
//! 2. **Integer Units**: seconds for durations, cents for money
//! 3. **Explicit Errors**: invariant breaches are typed errors, rule findings are data
//!
//! ## Example Usage
//!
//! ```rust
//! use titan_core::aggregator::split_hours;
//! use titan_core::policy::ShiftPolicy;
//!
//! let policy = ShiftPolicy::default();
//! // 9 hours worked against an 8 hour standard shift
//! let split = split_hours(9 * 3600, policy.standard_shift_secs);
//! assert_eq!(split.regular_seconds, 8 * 3600);
//! assert_eq!(split.overtime_seconds, 3600);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregator;
pub mod breaks;
pub mod calendar;
pub mod cash;
pub mod engine;
pub mod error;
pub mod issue;
pub mod ledger;
pub mod money;
pub mod policy;
pub mod refund_chain;
pub mod resolution;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use issue::*;
pub use money::Money;
pub use policy::{BreakPolicy, ShiftPolicy};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Seconds in one hour.
pub const SECS_PER_HOUR: i64 = 3600;

/// Milliseconds in one second. Timestamps are epoch milliseconds.
pub const MILLIS_PER_SEC: i64 = 1000;

/// Maximum length of free-text notes (resolution notes, count notes).
pub const MAX_NOTES_LEN: usize = 1000;

/// Generates a new entity ID (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Converts a millisecond span to whole seconds (truncating).
#[inline]
pub const fn millis_to_secs(millis: i64) -> i64 {
    millis / MILLIS_PER_SEC
}
