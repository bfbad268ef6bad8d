//! # Domain Types
//!
//! Shift lifecycle entities used throughout Titan POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shift Aggregate                                 │
//! │                                                                         │
//! │  ┌─────────────────┐        ┌─────────────────────────────────────┐    │
//! │  │   ClockEvent    │◄───────│               Shift                  │    │
//! │  │  ─────────────  │ in/out │  ─────────────────────────────────   │    │
//! │  │  type in|out    │ (1:1)  │  status active|ended|pending_review  │    │
//! │  │  timestamp (ms) │        │  total/regular/overtime seconds      │    │
//! │  │  append-only    │        │  sales totals (cents)                │    │
//! │  └─────────────────┘        └──────────┬───────────────┬──────────┘    │
//! │                                        │ owns          │ owns          │
//! │                              ┌─────────▼───────┐ ┌─────▼────────────┐  │
//! │                              │     Break       │ │ CashDrawerCount  │  │
//! │                              │  meal|rest      │ │ mid|end-shift    │  │
//! │                              │  duration secs  │ │ variance cents   │  │
//! │                              └─────────────────┘ └──────────────────┘  │
//! │                                                                         │
//! │  Read-only inputs: SalesTransaction, Schedule, Staff                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Units
//! - Timestamps: epoch milliseconds (`i64`)
//! - Durations: whole seconds (`i64`)
//! - Money: cents (`i64`), see [`Money`]

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::aggregator::seconds_to_hours;
use crate::money::Money;

// =============================================================================
// Clock Events
// =============================================================================

/// Direction of a clock event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ClockEventType {
    In,
    Out,
}

/// How the clock event was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ClockMethod {
    /// Implicit clock-in on POS login.
    Login,
    /// Cashier pressed the clock button.
    Manual,
    /// Scheduler or background job.
    Auto,
    /// Entered by a manager on the user's behalf.
    Manager,
}

/// Review status of a clock event.
///
/// `Disputed` is only reachable through the time-correction workflow, which
/// links a correction record instead of editing the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ClockEventStatus {
    Pending,
    #[default]
    Confirmed,
    Disputed,
}

/// An immutable clock-in or clock-out fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ClockEvent {
    pub id: String,
    pub user_id: String,
    pub business_id: String,
    pub terminal_id: String,
    pub schedule_id: Option<String>,
    pub event_type: ClockEventType,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub method: ClockMethod,
    pub status: ClockEventStatus,
    pub created_at: i64,
}

impl ClockEvent {
    /// Returns true for clock-in events.
    #[inline]
    pub fn is_in(&self) -> bool {
        self.event_type == ClockEventType::In
    }
}

// =============================================================================
// Breaks
// =============================================================================

/// Kind of break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum BreakType {
    Meal,
    Rest,
    Other,
}

/// Lifecycle status of a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum BreakStatus {
    Scheduled,
    Active,
    Completed,
    Cancelled,
    Missed,
}

impl BreakStatus {
    /// Wire spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            BreakStatus::Scheduled => "scheduled",
            BreakStatus::Active => "active",
            BreakStatus::Completed => "completed",
            BreakStatus::Cancelled => "cancelled",
            BreakStatus::Missed => "missed",
        }
    }
}

/// One rest or meal period inside a shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Break {
    pub id: String,
    pub shift_id: String,
    pub user_id: String,
    pub break_type: BreakType,
    pub start_time: i64,
    /// None while the break is active.
    pub end_time: Option<i64>,
    /// Set when the break is closed.
    pub duration_seconds: Option<i64>,
    pub is_paid: bool,
    pub status: BreakStatus,
    pub is_required: bool,
    pub minimum_duration_seconds: Option<i64>,
    pub is_missed: bool,
    pub is_short: bool,
}

impl Break {
    /// Returns true while the break is running.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == BreakStatus::Active
    }

    /// Duration that counts toward the shift's break total.
    ///
    /// Only completed breaks count.
    pub fn completed_seconds(&self) -> i64 {
        match self.status {
            BreakStatus::Completed => self.duration_seconds.unwrap_or(0),
            _ => 0,
        }
    }
}

// =============================================================================
// Shift
// =============================================================================

/// Lifecycle status of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Active,
    Ended,
    PendingReview,
}

impl ShiftStatus {
    /// Wire spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Active => "active",
            ShiftStatus::Ended => "ended",
            ShiftStatus::PendingReview => "pending_review",
        }
    }
}

/// One continuous work period, bounded by a clock-in and a clock-out.
///
/// ## Computed Fields
/// `total_seconds`, `regular_seconds`, `overtime_seconds`,
/// `break_duration_seconds` and the sales totals are materialized from the
/// clock events, breaks and transactions by [`crate::aggregator`]. They are
/// zero while the shift is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Shift {
    pub id: String,
    pub user_id: String,
    pub business_id: String,
    pub schedule_id: Option<String>,
    pub terminal_id: String,
    pub clock_in_id: String,
    pub clock_out_id: Option<String>,
    pub status: ShiftStatus,
    /// Copy of the clock-in event timestamp.
    pub started_at: i64,
    /// Copy of the clock-out event timestamp.
    pub ended_at: Option<i64>,
    /// Present for POS shifts (a cash drawer is assigned).
    pub starting_cash_cents: Option<i64>,
    pub total_sales_cents: i64,
    pub total_transactions: i64,
    pub total_refunds_cents: i64,
    pub total_voids: i64,
    pub total_seconds: i64,
    pub regular_seconds: i64,
    pub overtime_seconds: i64,
    pub break_duration_seconds: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Shift {
    /// Returns true until the shift is clocked out.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == ShiftStatus::Active
    }

    /// Returns true if the shift runs a cash drawer.
    #[inline]
    pub fn is_pos_shift(&self) -> bool {
        self.starting_cash_cents.is_some()
    }

    /// Starting float, zero for non-POS shifts.
    pub fn starting_cash(&self) -> Money {
        Money::from_cents(self.starting_cash_cents.unwrap_or(0))
    }

    /// End of the shift's time window; `now` for an open shift.
    pub fn window_end(&self, now: i64) -> i64 {
        self.ended_at.unwrap_or(now)
    }

    /// Total hours, rounded to two decimals (presentation only).
    pub fn total_hours(&self) -> f64 {
        seconds_to_hours(self.total_seconds)
    }

    /// Regular hours, rounded to two decimals (presentation only).
    pub fn regular_hours(&self) -> f64 {
        seconds_to_hours(self.regular_seconds)
    }

    /// Overtime hours, rounded to two decimals (presentation only).
    pub fn overtime_hours(&self) -> f64 {
        seconds_to_hours(self.overtime_seconds)
    }
}

// =============================================================================
// Cash Drawer Count
// =============================================================================

/// When the drawer was counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "kebab-case"))]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum CashCountType {
    MidShift,
    EndShift,
}

/// A point-in-time cash count tied to a shift. Immutable once recorded,
/// apart from the manager approval stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashDrawerCount {
    pub id: String,
    pub shift_id: String,
    pub count_type: CashCountType,
    pub expected_cents: i64,
    pub counted_cents: i64,
    /// counted − expected. Positive = overage, negative = shortage.
    pub variance_cents: i64,
    pub counted_by: String,
    pub notes: Option<String>,
    /// Variance exceeded the discrepancy threshold.
    pub requires_approval: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<i64>,
    pub timestamp: i64,
}

impl CashDrawerCount {
    /// Returns the variance as Money.
    #[inline]
    pub fn variance(&self) -> Money {
        Money::from_cents(self.variance_cents)
    }

    /// Returns true for end-of-shift counts.
    #[inline]
    pub fn is_end_shift(&self) -> bool {
        self.count_type == CashCountType::EndShift
    }
}

// =============================================================================
// Sales Transactions (read-only input)
// =============================================================================

/// Kind of sales transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sale,
    Refund,
    Void,
}

/// How a transaction was tendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    ExternalCard,
    /// Split tender; `cash_amount_cents` holds the cash part.
    Mixed,
}

/// A transaction owned by the sales subsystem, read by reconciliation and
/// validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesTransaction {
    pub id: String,
    pub shift_id: String,
    pub transaction_type: TransactionType,
    pub payment_method: PaymentMethod,
    /// Always positive; the type carries the direction.
    pub total_cents: i64,
    pub cash_amount_cents: Option<i64>,
    pub void_reason: Option<String>,
    pub manager_approval_id: Option<String>,
    pub is_partial_refund: bool,
    /// For refunds: the sale being refunded.
    pub original_transaction_id: Option<String>,
    pub created_at: i64,
}

impl SalesTransaction {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// The part of this transaction that moved drawer cash.
    pub fn cash_portion(&self) -> Money {
        match self.payment_method {
            PaymentMethod::Cash => {
                Money::from_cents(self.cash_amount_cents.unwrap_or(self.total_cents))
            }
            PaymentMethod::Mixed => Money::from_cents(self.cash_amount_cents.unwrap_or(0)),
            PaymentMethod::ExternalCard => Money::zero(),
        }
    }
}

// =============================================================================
// Schedules (read-only input)
// =============================================================================

/// Status of a scheduled shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Scheduled,
    Cancelled,
}

/// A planned work window produced by the scheduling subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Schedule {
    pub id: String,
    pub user_id: String,
    pub business_id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub status: ScheduleStatus,
}

// =============================================================================
// Staff (read-only input)
// =============================================================================

/// Business role of a staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Owner,
    Manager,
    Cashier,
    Staff,
}

impl StaffRole {
    /// Wire spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Owner => "owner",
            StaffRole::Manager => "manager",
            StaffRole::Cashier => "cashier",
            StaffRole::Staff => "staff",
        }
    }

    /// Roles allowed to approve cash variances and resolve validations.
    pub fn can_approve(&self) -> bool {
        matches!(self, StaffRole::Owner | StaffRole::Manager)
    }
}

/// A staff member as seen by the shift subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Staff {
    pub id: String,
    pub business_id: String,
    pub display_name: String,
    pub role: StaffRole,
    /// Explicit per-user override of the role's shift requirement.
    pub shift_required_override: Option<bool>,
    /// argon2 PHC string; never serialized to callers.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub pin_hash: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(method: PaymentMethod, total: i64, cash: Option<i64>) -> SalesTransaction {
        SalesTransaction {
            id: "t-1".to_string(),
            shift_id: "s-1".to_string(),
            transaction_type: TransactionType::Sale,
            payment_method: method,
            total_cents: total,
            cash_amount_cents: cash,
            void_reason: None,
            manager_approval_id: None,
            is_partial_refund: false,
            original_transaction_id: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_cash_portion_by_method() {
        assert_eq!(txn(PaymentMethod::Cash, 1_000, None).cash_portion().cents(), 1_000);
        assert_eq!(txn(PaymentMethod::Mixed, 1_000, Some(400)).cash_portion().cents(), 400);
        assert_eq!(txn(PaymentMethod::Mixed, 1_000, None).cash_portion().cents(), 0);
        assert!(txn(PaymentMethod::ExternalCard, 1_000, Some(1_000))
            .cash_portion()
            .is_zero());
    }

    #[test]
    fn test_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&CashCountType::EndShift).unwrap(),
            "\"end-shift\""
        );
        assert_eq!(
            serde_json::to_string(&ShiftStatus::PendingReview).unwrap(),
            "\"pending_review\""
        );
        assert_eq!(serde_json::to_string(&ClockEventType::In).unwrap(), "\"in\"");
    }

    #[test]
    fn test_only_completed_breaks_count() {
        let mut b = Break {
            id: "b-1".to_string(),
            shift_id: "s-1".to_string(),
            user_id: "u-1".to_string(),
            break_type: BreakType::Rest,
            start_time: 0,
            end_time: Some(600_000),
            duration_seconds: Some(600),
            is_paid: true,
            status: BreakStatus::Completed,
            is_required: false,
            minimum_duration_seconds: None,
            is_missed: false,
            is_short: false,
        };
        assert_eq!(b.completed_seconds(), 600);
        b.status = BreakStatus::Cancelled;
        assert_eq!(b.completed_seconds(), 0);
    }

    #[test]
    fn test_pin_hash_not_serialized() {
        let staff = Staff {
            id: "u-1".to_string(),
            business_id: "biz".to_string(),
            display_name: "Dana".to_string(),
            role: StaffRole::Manager,
            shift_required_override: None,
            pin_hash: Some("$argon2id$secret".to_string()),
        };
        let json = serde_json::to_string(&staff).unwrap();
        assert!(!json.contains("argon2"));
    }
}
