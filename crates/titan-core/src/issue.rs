//! # Validation Issues
//!
//! The closed registry of issue codes and the records the rule engine and
//! resolution workflow produce.
//!
//! ## Issue Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  IssueCode::CashVarianceHigh                                            │
//! │    ├── category  → cash_management   (fixed per code)                   │
//! │    ├── type      → violation         (fixed per code)                   │
//! │    └── severity  → high | critical   (chosen by the rule at run time)   │
//! │                                                                         │
//! │  ShiftValidation (1 per shift) ──owns──► ShiftValidationIssue (0..n)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Adding a code means adding a variant here; every `match` on the code is
//! then a compile error until the new code is classified.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Classification Enums
// =============================================================================

/// Whether an issue invalidates the shift or only warns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Violation,
    Warning,
}

/// Issue severity. Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Area of the business an issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Attendance,
    CashManagement,
    Transactions,
    Compliance,
    System,
}

// =============================================================================
// Issue Code Registry
// =============================================================================

/// Every issue the rule engine can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    // Attendance
    LateClockIn,
    EarlyClockOut,
    MissedClockOut,
    ShiftOverlap,
    // Cash management
    CashVarianceHigh,
    MissingEndShiftCount,
    MultipleEndShiftCounts,
    // Transactions
    VoidedTransactionNoReason,
    RefundWithoutApproval,
    ExcessiveVoids,
    // Compliance
    MissingBreak,
    MissedRequiredBreak,
    BreakTooShort,
    BreakTooLong,
    ExcessiveOvertime,
    // System
    RefundChainCorrupt,
}

impl IssueCode {
    /// The category this code is filed under.
    pub const fn category(&self) -> IssueCategory {
        match self {
            IssueCode::LateClockIn
            | IssueCode::EarlyClockOut
            | IssueCode::MissedClockOut
            | IssueCode::ShiftOverlap => IssueCategory::Attendance,
            IssueCode::CashVarianceHigh
            | IssueCode::MissingEndShiftCount
            | IssueCode::MultipleEndShiftCounts => IssueCategory::CashManagement,
            IssueCode::VoidedTransactionNoReason
            | IssueCode::RefundWithoutApproval
            | IssueCode::ExcessiveVoids => IssueCategory::Transactions,
            IssueCode::MissingBreak
            | IssueCode::MissedRequiredBreak
            | IssueCode::BreakTooShort
            | IssueCode::BreakTooLong
            | IssueCode::ExcessiveOvertime => IssueCategory::Compliance,
            IssueCode::RefundChainCorrupt => IssueCategory::System,
        }
    }

    /// Violations make the shift invalid; warnings do not.
    pub const fn issue_type(&self) -> IssueType {
        match self {
            IssueCode::MissedClockOut
            | IssueCode::ShiftOverlap
            | IssueCode::CashVarianceHigh
            | IssueCode::MultipleEndShiftCounts
            | IssueCode::RefundWithoutApproval
            | IssueCode::MissingBreak
            | IssueCode::RefundChainCorrupt => IssueType::Violation,
            IssueCode::LateClockIn
            | IssueCode::EarlyClockOut
            | IssueCode::MissingEndShiftCount
            | IssueCode::VoidedTransactionNoReason
            | IssueCode::ExcessiveVoids
            | IssueCode::MissedRequiredBreak
            | IssueCode::BreakTooShort
            | IssueCode::BreakTooLong
            | IssueCode::ExcessiveOvertime => IssueType::Warning,
        }
    }

    /// Wire spelling, e.g. `LATE_CLOCK_IN`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            IssueCode::LateClockIn => "LATE_CLOCK_IN",
            IssueCode::EarlyClockOut => "EARLY_CLOCK_OUT",
            IssueCode::MissedClockOut => "MISSED_CLOCK_OUT",
            IssueCode::ShiftOverlap => "SHIFT_OVERLAP",
            IssueCode::CashVarianceHigh => "CASH_VARIANCE_HIGH",
            IssueCode::MissingEndShiftCount => "MISSING_END_SHIFT_COUNT",
            IssueCode::MultipleEndShiftCounts => "MULTIPLE_END_SHIFT_COUNTS",
            IssueCode::VoidedTransactionNoReason => "VOIDED_TRANSACTION_NO_REASON",
            IssueCode::RefundWithoutApproval => "REFUND_WITHOUT_APPROVAL",
            IssueCode::ExcessiveVoids => "EXCESSIVE_VOIDS",
            IssueCode::MissingBreak => "MISSING_BREAK",
            IssueCode::MissedRequiredBreak => "MISSED_REQUIRED_BREAK",
            IssueCode::BreakTooShort => "BREAK_TOO_SHORT",
            IssueCode::BreakTooLong => "BREAK_TOO_LONG",
            IssueCode::ExcessiveOvertime => "EXCESSIVE_OVERTIME",
            IssueCode::RefundChainCorrupt => "REFUND_CHAIN_CORRUPT",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Issue Draft (rule engine output)
// =============================================================================

/// A finding produced by one rule, before it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IssueDraft {
    pub code: IssueCode,
    pub severity: IssueSeverity,
    pub message: String,
    pub related_entity_id: Option<String>,
    pub related_entity_type: Option<String>,
    /// JSON context captured for audit.
    pub data_snapshot: String,
}

impl IssueDraft {
    /// Violation or warning, derived from the code.
    #[inline]
    pub fn issue_type(&self) -> IssueType {
        self.code.issue_type()
    }

    /// Category, derived from the code.
    #[inline]
    pub fn category(&self) -> IssueCategory {
        self.code.category()
    }
}

// =============================================================================
// Validation Record
// =============================================================================

/// How a validation run was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMethod {
    /// Clock-out or background sweep.
    Auto,
    /// Requested by a user.
    Manual,
}

/// Review outcome of a validation.
///
/// ```text
/// pending ──► needs_review ──► approved
///    │              │
///    │              └────────► rejected
///    ├──────────────────────► approved
///    └──────────────────────► rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Pending,
    NeedsReview,
    Approved,
    Rejected,
}

impl Resolution {
    /// Approved and rejected validations are never reopened.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Resolution::Approved | Resolution::Rejected)
    }

    /// Wire spelling, e.g. `needs_review`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Resolution::Pending => "pending",
            Resolution::NeedsReview => "needs_review",
            Resolution::Approved => "approved",
            Resolution::Rejected => "rejected",
        }
    }
}

/// The verdict for one shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ShiftValidation {
    pub id: String,
    pub shift_id: String,
    pub valid: bool,
    pub requires_review: bool,
    pub violation_count: i64,
    pub warning_count: i64,
    pub critical_issue_count: i64,
    pub unresolved_issue_count: i64,
    pub validation_method: ValidationMethod,
    pub resolution: Resolution,
    pub validated_at: i64,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<i64>,
    pub resolution_notes: Option<String>,
}

/// One persisted issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ShiftValidationIssue {
    pub id: String,
    pub validation_id: String,
    pub issue_type: IssueType,
    pub code: IssueCode,
    pub message: String,
    pub severity: IssueSeverity,
    pub category: IssueCategory,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<i64>,
    pub resolution_notes: Option<String>,
    pub related_entity_id: Option<String>,
    pub related_entity_type: Option<String>,
    pub data_snapshot: String,
    pub created_at: i64,
}

impl ShiftValidationIssue {
    /// Materializes a draft under a validation record.
    pub fn from_draft(draft: IssueDraft, validation_id: &str, created_at: i64) -> Self {
        let issue_type = draft.issue_type();
        let category = draft.category();
        ShiftValidationIssue {
            id: crate::new_id(),
            validation_id: validation_id.to_string(),
            issue_type,
            code: draft.code,
            message: draft.message,
            severity: draft.severity,
            category,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
            related_entity_id: draft.related_entity_id,
            related_entity_type: draft.related_entity_type,
            data_snapshot: draft.data_snapshot,
            created_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
