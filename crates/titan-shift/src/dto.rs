//! # Request and Response Records
//!
//! What a request layer (IPC or HTTP) exchanges with [`crate::ShiftService`].
//!
//! ## Wire Conventions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  field names    camelCase            startingCash, clockOutId           │
//! │  timestamps     epoch milliseconds   1709726400000                      │
//! │  money          decimal units (f64)  330.0                              │
//! │  enums          wire spelling        "end-shift", "needs_review"        │
//! │                                                                         │
//! │  f64 → cents happens once, here. Everything behind the service works   │
//! │  on integer cents and seconds.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use titan_core::{
    Break, BreakStatus, BreakType, CashCountType, CashDrawerCount, ClockMethod, IssueCategory,
    IssueCode, IssueSeverity, IssueType, Money, Resolution, Schedule, ScheduleStatus, Shift,
    ShiftStatus, ShiftValidation, ShiftValidationIssue, ValidationMethod,
};

fn manual() -> ClockMethod {
    ClockMethod::Manual
}

fn decimal(cents: i64) -> f64 {
    Money::from_cents(cents).to_decimal()
}

// =============================================================================
// Clock In / Out
// =============================================================================

/// Request to clock a user in.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClockInRequest {
    pub user_id: String,
    pub business_id: String,
    pub terminal_id: String,
    /// Links a schedule explicitly; otherwise the nearest one is matched.
    pub schedule_id: Option<String>,
    #[serde(default = "manual")]
    pub method: ClockMethod,
    /// Defaults to the service clock.
    pub timestamp: Option<i64>,
    /// Drawer float for POS shifts.
    pub starting_cash: Option<f64>,
}

/// Request to clock a user out.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClockOutRequest {
    pub user_id: String,
    pub business_id: String,
    pub terminal_id: String,
    #[serde(default = "manual")]
    pub method: ClockMethod,
    pub timestamp: Option<i64>,
}

/// A shift as callers see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShiftDto {
    pub id: String,
    pub user_id: String,
    pub business_id: String,
    pub schedule_id: Option<String>,
    pub terminal_id: String,
    pub clock_in_id: String,
    pub clock_out_id: Option<String>,
    pub status: ShiftStatus,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub starting_cash: Option<f64>,
    pub total_sales: f64,
    pub total_transactions: i64,
    pub total_refunds: f64,
    pub total_voids: i64,
    pub total_hours: f64,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub break_duration_seconds: i64,
}

impl From<&Shift> for ShiftDto {
    fn from(shift: &Shift) -> Self {
        ShiftDto {
            id: shift.id.clone(),
            user_id: shift.user_id.clone(),
            business_id: shift.business_id.clone(),
            schedule_id: shift.schedule_id.clone(),
            terminal_id: shift.terminal_id.clone(),
            clock_in_id: shift.clock_in_id.clone(),
            clock_out_id: shift.clock_out_id.clone(),
            status: shift.status,
            started_at: shift.started_at,
            ended_at: shift.ended_at,
            starting_cash: shift.starting_cash_cents.map(decimal),
            total_sales: decimal(shift.total_sales_cents),
            total_transactions: shift.total_transactions,
            total_refunds: decimal(shift.total_refunds_cents),
            total_voids: shift.total_voids,
            total_hours: shift.total_hours(),
            regular_hours: shift.regular_hours(),
            overtime_hours: shift.overtime_hours(),
            break_duration_seconds: shift.break_duration_seconds,
        }
    }
}

/// Clock-out result: the closed shift and its fresh verdict.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClockOutResponse {
    pub shift: ShiftDto,
    pub validation: ValidationDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ScheduleDto {
    pub id: String,
    pub user_id: String,
    pub business_id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub status: ScheduleStatus,
}

impl From<&Schedule> for ScheduleDto {
    fn from(schedule: &Schedule) -> Self {
        ScheduleDto {
            id: schedule.id.clone(),
            user_id: schedule.user_id.clone(),
            business_id: schedule.business_id.clone(),
            start_time: schedule.start_time,
            end_time: schedule.end_time,
            status: schedule.status,
        }
    }
}

// =============================================================================
// Breaks
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StartBreakRequest {
    pub shift_id: String,
    pub break_type: BreakType,
    #[serde(default)]
    pub is_required: bool,
    /// Overrides the policy minimum for this break.
    pub minimum_duration_seconds: Option<i64>,
    pub start_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EndBreakRequest {
    pub break_id: String,
    pub end_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BreakDto {
    pub id: String,
    pub shift_id: String,
    pub user_id: String,
    pub break_type: BreakType,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub is_paid: bool,
    pub status: BreakStatus,
    pub is_required: bool,
    pub minimum_duration_seconds: Option<i64>,
    pub is_missed: bool,
    pub is_short: bool,
}

impl From<&Break> for BreakDto {
    fn from(brk: &Break) -> Self {
        BreakDto {
            id: brk.id.clone(),
            shift_id: brk.shift_id.clone(),
            user_id: brk.user_id.clone(),
            break_type: brk.break_type,
            start_time: brk.start_time,
            end_time: brk.end_time,
            duration_seconds: brk.duration_seconds,
            is_paid: brk.is_paid,
            status: brk.status,
            is_required: brk.is_required,
            minimum_duration_seconds: brk.minimum_duration_seconds,
            is_missed: brk.is_missed,
            is_short: brk.is_short,
        }
    }
}

// =============================================================================
// Cash Drawer
// =============================================================================

/// Expected drawer cash and how it was derived.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExpectedCashDto {
    pub shift_id: String,
    pub starting_cash: f64,
    pub cash_sales: f64,
    pub cash_refunds: f64,
    pub expected_cash: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCountRequest {
    pub shift_id: String,
    pub count_type: CashCountType,
    pub counted_amount: f64,
    pub counted_by: String,
    /// Mandatory when the variance exceeds the discrepancy threshold.
    pub notes: Option<String>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashCountDto {
    pub id: String,
    pub shift_id: String,
    pub count_type: CashCountType,
    pub expected_amount: f64,
    pub counted_amount: f64,
    pub variance: f64,
    pub counted_by: String,
    pub notes: Option<String>,
    pub requires_approval: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<i64>,
    pub timestamp: i64,
}

impl From<&CashDrawerCount> for CashCountDto {
    fn from(count: &CashDrawerCount) -> Self {
        CashCountDto {
            id: count.id.clone(),
            shift_id: count.shift_id.clone(),
            count_type: count.count_type,
            expected_amount: decimal(count.expected_cents),
            counted_amount: decimal(count.counted_cents),
            variance: decimal(count.variance_cents),
            counted_by: count.counted_by.clone(),
            notes: count.notes.clone(),
            requires_approval: count.requires_approval,
            approved_by: count.approved_by.clone(),
            approved_at: count.approved_at,
            timestamp: count.timestamp,
        }
    }
}

/// Manager sign-off on a high-variance count.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApproveCountRequest {
    pub count_id: String,
    pub manager_id: String,
    pub pin: String,
}

// =============================================================================
// Validation
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IssueDto {
    pub id: String,
    pub validation_id: String,
    #[serde(rename = "type")]
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
    /// Values the rule saw when it fired.
    #[ts(type = "unknown")]
    pub data_snapshot: serde_json::Value,
    pub created_at: i64,
}

impl From<&ShiftValidationIssue> for IssueDto {
    fn from(issue: &ShiftValidationIssue) -> Self {
        IssueDto {
            id: issue.id.clone(),
            validation_id: issue.validation_id.clone(),
            issue_type: issue.issue_type,
            code: issue.code,
            message: issue.message.clone(),
            severity: issue.severity,
            category: issue.category,
            resolved: issue.resolved,
            resolved_by: issue.resolved_by.clone(),
            resolved_at: issue.resolved_at,
            resolution_notes: issue.resolution_notes.clone(),
            related_entity_id: issue.related_entity_id.clone(),
            related_entity_type: issue.related_entity_type.clone(),
            data_snapshot: serde_json::from_str(&issue.data_snapshot)
                .unwrap_or_else(|_| serde_json::Value::String(issue.data_snapshot.clone())),
            created_at: issue.created_at,
        }
    }
}

/// A verdict with its issues, critical first.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ValidationDto {
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
    pub issues: Vec<IssueDto>,
}

impl ValidationDto {
    pub fn new(validation: &ShiftValidation, issues: &[ShiftValidationIssue]) -> Self {
        ValidationDto {
            id: validation.id.clone(),
            shift_id: validation.shift_id.clone(),
            valid: validation.valid,
            requires_review: validation.requires_review,
            violation_count: validation.violation_count,
            warning_count: validation.warning_count,
            critical_issue_count: validation.critical_issue_count,
            unresolved_issue_count: validation.unresolved_issue_count,
            validation_method: validation.validation_method,
            resolution: validation.resolution,
            validated_at: validation.validated_at,
            resolved_by: validation.resolved_by.clone(),
            resolved_at: validation.resolved_at,
            resolution_notes: validation.resolution_notes.clone(),
            issues: issues.iter().map(IssueDto::from).collect(),
        }
    }

    /// Codes of the attached issues, in rank order.
    pub fn codes(&self) -> Vec<IssueCode> {
        self.issues.iter().map(|i| i.code).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ResolveIssueRequest {
    pub issue_id: String,
    pub resolved_by: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ResolveValidationRequest {
    pub validation_id: String,
    pub resolved_by: String,
    pub resolution: Resolution,
    pub notes: Option<String>,
}

/// Outcome of a stale-shift sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SweepReport {
    /// Active shifts older than the stale threshold.
    pub checked: usize,
    /// Shifts whose verdict now asks for review.
    pub flagged: Vec<String>,
    /// Shifts whose verdict was already decided and was left alone.
    pub skipped: Vec<String>,
}
