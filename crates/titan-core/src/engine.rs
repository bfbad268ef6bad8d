//! # Validation Rule Engine
//!
//! Evaluates a shift and everything attached to it against a fixed catalog
//! of compliance rules.
//!
//! ## Evaluation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ValidationContext (read-only)                                          │
//! │    shift, schedule, breaks, cash counts, transactions, other shifts     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  CATALOG (fixed order)                                                  │
//! │    late_clock_in ─► early_clock_out ─► ... ─► refund_chain_corrupt      │
//! │    each rule: Option<IssueDraft>, at most one issue per rule            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  rank by severity (critical first, ties keep catalog order)             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ValidationOutcome { issues, valid, requires_review, counts }           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules never fail and never touch their inputs: running the engine twice
//! on the same context yields the same outcome.

use serde_json::json;

use crate::cash::exceeds_threshold;
use crate::issue::{IssueCode, IssueDraft, IssueSeverity, IssueType};
use crate::policy::ShiftPolicy;
use crate::refund_chain::{walk_refund_chain, ChainBreak, DEFAULT_MAX_DEPTH};
use crate::types::{
    Break, BreakStatus, BreakType, CashDrawerCount, SalesTransaction, Schedule, Shift,
    TransactionType,
};
use crate::{millis_to_secs, MILLIS_PER_SEC};

// =============================================================================
// Context and Outcome
// =============================================================================

/// Everything the rules may look at.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub shift: &'a Shift,
    pub schedule: Option<&'a Schedule>,
    pub breaks: &'a [Break],
    pub cash_counts: &'a [CashDrawerCount],
    /// Transactions that reference the shift.
    pub transactions: &'a [SalesTransaction],
    /// Refund originals from other shifts, for the chain walk.
    pub linked_transactions: &'a [SalesTransaction],
    /// The user's other shifts near this one.
    pub other_shifts: &'a [Shift],
    /// Seconds the user worked earlier in the same week.
    pub week_prior_seconds: i64,
    /// Epoch ms; the end of an open shift's window.
    pub now: i64,
}

impl<'a> ValidationContext<'a> {
    /// A context with only the shift itself.
    pub fn new(shift: &'a Shift, now: i64) -> Self {
        ValidationContext {
            shift,
            schedule: None,
            breaks: &[],
            cash_counts: &[],
            transactions: &[],
            linked_transactions: &[],
            other_shifts: &[],
            week_prior_seconds: 0,
            now,
        }
    }

    fn window_end(&self) -> i64 {
        self.shift.window_end(self.now)
    }

    fn elapsed_secs(&self) -> i64 {
        millis_to_secs((self.window_end() - self.shift.started_at).max(0))
    }

    fn end_shift_counts(&self) -> impl Iterator<Item = &'a CashDrawerCount> {
        self.cash_counts.iter().filter(|c| c.is_end_shift())
    }

    fn of_type(&self, kind: TransactionType) -> impl Iterator<Item = &'a SalesTransaction> {
        self.transactions
            .iter()
            .filter(move |t| t.transaction_type == kind)
    }

    fn completed_breaks(&self) -> impl Iterator<Item = &'a Break> {
        self.breaks
            .iter()
            .filter(|b| b.status == BreakStatus::Completed)
    }
}

/// The engine's verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// Ranked, critical first.
    pub issues: Vec<IssueDraft>,
    pub valid: bool,
    pub requires_review: bool,
    pub violation_count: i64,
    pub warning_count: i64,
    pub critical_issue_count: i64,
}

impl ValidationOutcome {
    /// Codes of the raised issues, in rank order.
    pub fn codes(&self) -> Vec<IssueCode> {
        self.issues.iter().map(|i| i.code).collect()
    }

    /// Returns the issue raised for a code, if any.
    pub fn issue(&self, code: IssueCode) -> Option<&IssueDraft> {
        self.issues.iter().find(|i| i.code == code)
    }
}

// =============================================================================
// Engine
// =============================================================================

type Rule = fn(&ValidationContext<'_>, &ShiftPolicy) -> Option<IssueDraft>;

/// The rule catalog, in evaluation order.
const CATALOG: &[(IssueCode, Rule)] = &[
    (IssueCode::LateClockIn, late_clock_in),
    (IssueCode::EarlyClockOut, early_clock_out),
    (IssueCode::MissedClockOut, missed_clock_out),
    (IssueCode::ShiftOverlap, shift_overlap),
    (IssueCode::CashVarianceHigh, cash_variance_high),
    (IssueCode::MissingEndShiftCount, missing_end_shift_count),
    (IssueCode::MultipleEndShiftCounts, multiple_end_shift_counts),
    (IssueCode::VoidedTransactionNoReason, voided_transaction_no_reason),
    (IssueCode::RefundWithoutApproval, refund_without_approval),
    (IssueCode::ExcessiveVoids, excessive_voids),
    (IssueCode::MissingBreak, missing_break),
    (IssueCode::MissedRequiredBreak, missed_required_break),
    (IssueCode::BreakTooShort, break_too_short),
    (IssueCode::BreakTooLong, break_too_long),
    (IssueCode::ExcessiveOvertime, excessive_overtime),
    (IssueCode::RefundChainCorrupt, refund_chain_corrupt),
];

/// Codes the engine evaluates, in catalog order.
pub fn catalog() -> impl Iterator<Item = IssueCode> {
    CATALOG.iter().map(|(code, _)| *code)
}

/// Runs every rule and aggregates the verdict.
pub fn validate_shift(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> ValidationOutcome {
    let mut issues: Vec<IssueDraft> = CATALOG
        .iter()
        .filter_map(|(_, rule)| rule(ctx, policy))
        .collect();

    // Stable: equal severities keep catalog order.
    issues.sort_by(|a, b| b.severity.cmp(&a.severity));

    summarize(issues)
}

/// Aggregates counts and flags for a ranked issue list.
///
/// ## Rules
/// - `valid` = no violations and no critical issues
/// - `requires_review` = not valid, or any critical issue, or a warning set
///   with high severity present, or a cash variance above threshold
pub fn summarize(issues: Vec<IssueDraft>) -> ValidationOutcome {
    let violation_count = count(&issues, |i| i.issue_type() == IssueType::Violation);
    let warning_count = count(&issues, |i| i.issue_type() == IssueType::Warning);
    let critical_issue_count = count(&issues, |i| i.severity == IssueSeverity::Critical);
    let high_present = issues.iter().any(|i| i.severity >= IssueSeverity::High);
    let cash_variance = issues.iter().any(|i| i.code == IssueCode::CashVarianceHigh);

    let valid = critical_issue_count == 0 && violation_count == 0;
    let requires_review =
        !valid || critical_issue_count > 0 || (warning_count > 0 && high_present) || cash_variance;

    ValidationOutcome {
        issues,
        valid,
        requires_review,
        violation_count,
        warning_count,
        critical_issue_count,
    }
}

fn count(issues: &[IssueDraft], pred: impl Fn(&IssueDraft) -> bool) -> i64 {
    issues.iter().filter(|i| pred(i)).count() as i64
}

fn draft(
    code: IssueCode,
    severity: IssueSeverity,
    message: String,
    related: Option<(&str, &str)>,
    snapshot: serde_json::Value,
) -> IssueDraft {
    IssueDraft {
        code,
        severity,
        message,
        related_entity_id: related.map(|(id, _)| id.to_string()),
        related_entity_type: related.map(|(_, kind)| kind.to_string()),
        data_snapshot: snapshot.to_string(),
    }
}

fn minutes(millis: i64) -> i64 {
    millis / (60 * MILLIS_PER_SEC)
}

// =============================================================================
// Attendance Rules
// =============================================================================

fn late_clock_in(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> Option<IssueDraft> {
    let schedule = ctx.schedule?;
    let late_ms = ctx.shift.started_at - schedule.start_time;
    let grace_ms = policy.clock_in_grace_secs * MILLIS_PER_SEC;
    if late_ms <= grace_ms {
        return None;
    }

    let beyond_grace = millis_to_secs(late_ms - grace_ms);
    let severity = if beyond_grace > policy.late_medium_after_secs {
        IssueSeverity::Medium
    } else {
        IssueSeverity::Low
    };

    Some(draft(
        IssueCode::LateClockIn,
        severity,
        format!("Clocked in {} minutes after the scheduled start", minutes(late_ms)),
        Some((schedule.id.as_str(), "schedule")),
        json!({
            "scheduled_start": schedule.start_time,
            "clock_in": ctx.shift.started_at,
            "late_seconds": millis_to_secs(late_ms),
            "grace_seconds": policy.clock_in_grace_secs,
        }),
    ))
}

fn early_clock_out(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> Option<IssueDraft> {
    let schedule = ctx.schedule?;
    let ended_at = ctx.shift.ended_at?;
    let early_ms = schedule.end_time - ended_at;
    if early_ms <= policy.early_clock_out_grace_secs * MILLIS_PER_SEC {
        return None;
    }

    Some(draft(
        IssueCode::EarlyClockOut,
        IssueSeverity::Low,
        format!("Clocked out {} minutes before the scheduled end", minutes(early_ms)),
        Some((schedule.id.as_str(), "schedule")),
        json!({
            "scheduled_end": schedule.end_time,
            "clock_out": ended_at,
            "early_seconds": millis_to_secs(early_ms),
        }),
    ))
}

fn missed_clock_out(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> Option<IssueDraft> {
    if !ctx.shift.is_active() {
        return None;
    }
    let open_secs = ctx.elapsed_secs();
    if open_secs <= policy.stale_shift_secs {
        return None;
    }

    Some(draft(
        IssueCode::MissedClockOut,
        IssueSeverity::High,
        format!(
            "Shift has been open for {:.1} hours without a clock-out",
            open_secs as f64 / 3600.0
        ),
        Some((ctx.shift.id.as_str(), "shift")),
        json!({
            "started_at": ctx.shift.started_at,
            "checked_at": ctx.now,
            "open_seconds": open_secs,
            "stale_after_seconds": policy.stale_shift_secs,
        }),
    ))
}

fn shift_overlap(ctx: &ValidationContext<'_>, _policy: &ShiftPolicy) -> Option<IssueDraft> {
    let start = ctx.shift.started_at;
    let end = ctx.window_end();

    let overlapping: Vec<&Shift> = ctx
        .other_shifts
        .iter()
        .filter(|other| other.id != ctx.shift.id && other.user_id == ctx.shift.user_id)
        .filter(|other| other.started_at < end && start < other.window_end(ctx.now))
        .collect();

    let first = overlapping.first()?;
    Some(draft(
        IssueCode::ShiftOverlap,
        IssueSeverity::Critical,
        format!("Shift overlaps {} other shift(s) of the same user", overlapping.len()),
        Some((first.id.as_str(), "shift")),
        json!({ "overlapping_shift_ids": overlapping.iter().map(|x| x.id.as_str()).collect::<Vec<_>>() }),
    ))
}

// =============================================================================
// Cash Management Rules
// =============================================================================

fn cash_variance_high(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> Option<IssueDraft> {
    let worst = ctx
        .end_shift_counts()
        .filter(|c| exceeds_threshold(c.variance(), policy.cash_discrepancy_threshold_cents))
        .max_by_key(|c| c.variance_cents.abs())?;

    let severity = if worst.variance_cents.abs() > policy.cash_variance_critical_cents {
        IssueSeverity::Critical
    } else {
        IssueSeverity::High
    };

    Some(draft(
        IssueCode::CashVarianceHigh,
        severity,
        format!("End-of-shift drawer variance of {}", worst.variance()),
        Some((worst.id.as_str(), "cash_drawer_count")),
        json!({
            "expected_cents": worst.expected_cents,
            "counted_cents": worst.counted_cents,
            "variance_cents": worst.variance_cents,
            "threshold_cents": policy.cash_discrepancy_threshold_cents,
            "approved_by": worst.approved_by,
        }),
    ))
}

fn missing_end_shift_count(ctx: &ValidationContext<'_>, _policy: &ShiftPolicy) -> Option<IssueDraft> {
    if ctx.shift.is_active() || !ctx.shift.is_pos_shift() || ctx.end_shift_counts().next().is_some() {
        return None;
    }

    Some(draft(
        IssueCode::MissingEndShiftCount,
        IssueSeverity::Medium,
        "Shift ended without an end-of-shift cash count".to_string(),
        Some((ctx.shift.id.as_str(), "shift")),
        json!({ "starting_cash_cents": ctx.shift.starting_cash_cents }),
    ))
}

fn multiple_end_shift_counts(ctx: &ValidationContext<'_>, _policy: &ShiftPolicy) -> Option<IssueDraft> {
    let counts: Vec<&CashDrawerCount> = ctx.end_shift_counts().collect();
    if counts.len() <= 1 {
        return None;
    }

    Some(draft(
        IssueCode::MultipleEndShiftCounts,
        IssueSeverity::Critical,
        format!("{} end-of-shift counts recorded for one shift", counts.len()),
        Some((ctx.shift.id.as_str(), "shift")),
        json!({ "count_ids": counts.iter().map(|x| x.id.as_str()).collect::<Vec<_>>() }),
    ))
}

// =============================================================================
// Transaction Rules
// =============================================================================

fn voided_transaction_no_reason(
    ctx: &ValidationContext<'_>,
    _policy: &ShiftPolicy,
) -> Option<IssueDraft> {
    let missing: Vec<&SalesTransaction> = ctx
        .of_type(TransactionType::Void)
        .filter(|t| t.void_reason.as_deref().map_or(true, |r| r.trim().is_empty()))
        .collect();
    let first = missing.first()?;

    Some(draft(
        IssueCode::VoidedTransactionNoReason,
        IssueSeverity::Medium,
        format!("{} voided transaction(s) without a reason", missing.len()),
        Some((first.id.as_str(), "transaction")),
        json!({ "transaction_ids": missing.iter().map(|x| x.id.as_str()).collect::<Vec<_>>() }),
    ))
}

fn refund_without_approval(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> Option<IssueDraft> {
    let unapproved: Vec<&SalesTransaction> = ctx
        .of_type(TransactionType::Refund)
        .filter(|t| t.is_partial_refund || t.total_cents > policy.refund_approval_limit_cents)
        .filter(|t| t.manager_approval_id.as_deref().map_or(true, |a| a.trim().is_empty()))
        .collect();
    let first = unapproved.first()?;

    Some(draft(
        IssueCode::RefundWithoutApproval,
        IssueSeverity::High,
        format!("{} refund(s) need manager approval but have none", unapproved.len()),
        Some((first.id.as_str(), "transaction")),
        json!({
            "transaction_ids": unapproved.iter().map(|x| x.id.as_str()).collect::<Vec<_>>(),
            "approval_limit_cents": policy.refund_approval_limit_cents,
        }),
    ))
}

fn excessive_voids(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> Option<IssueDraft> {
    let voids = ctx.of_type(TransactionType::Void).count() as i64;
    if voids <= policy.max_voids_per_shift {
        return None;
    }

    Some(draft(
        IssueCode::ExcessiveVoids,
        IssueSeverity::Medium,
        format!("{voids} voids in one shift (limit {})", policy.max_voids_per_shift),
        Some((ctx.shift.id.as_str(), "shift")),
        json!({ "void_count": voids, "limit": policy.max_voids_per_shift }),
    ))
}

// =============================================================================
// Compliance Rules
// =============================================================================

fn meal_break_missing(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> bool {
    ctx.elapsed_secs() >= policy.breaks.meal_required_after_secs
        && !ctx.completed_breaks().any(|b| b.break_type == BreakType::Meal)
}

fn missing_break(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> Option<IssueDraft> {
    if !meal_break_missing(ctx, policy) {
        return None;
    }

    Some(draft(
        IssueCode::MissingBreak,
        IssueSeverity::High,
        format!(
            "No meal break taken in a shift longer than {} hours",
            policy.breaks.meal_required_after_secs / 3600
        ),
        Some((ctx.shift.id.as_str(), "shift")),
        json!({
            "elapsed_seconds": ctx.elapsed_secs(),
            "required_after_seconds": policy.breaks.meal_required_after_secs,
        }),
    ))
}

fn missed_required_break(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> Option<IssueDraft> {
    // A missed meal is already reported by MISSING_BREAK.
    let skip_meals = meal_break_missing(ctx, policy);
    let missed: Vec<&Break> = ctx
        .breaks
        .iter()
        .filter(|b| b.is_required && b.is_missed)
        .filter(|b| !(skip_meals && b.break_type == BreakType::Meal))
        .collect();
    let first = missed.first()?;

    Some(draft(
        IssueCode::MissedRequiredBreak,
        IssueSeverity::Medium,
        format!("{} required break(s) were not taken", missed.len()),
        Some((first.id.as_str(), "break")),
        json!({ "break_ids": missed.iter().map(|x| x.id.as_str()).collect::<Vec<_>>() }),
    ))
}

fn break_too_short(ctx: &ValidationContext<'_>, _policy: &ShiftPolicy) -> Option<IssueDraft> {
    let short: Vec<(&Break, i64, i64)> = ctx
        .completed_breaks()
        .filter_map(|b| {
            let minimum = b.minimum_duration_seconds?;
            let duration = b.duration_seconds.unwrap_or(0);
            (duration < minimum).then_some((b, duration, minimum))
        })
        .collect();
    let (first, duration, minimum) = *short.first()?;

    let severity = if short.iter().any(|(_, d, m)| d * 2 < *m) {
        IssueSeverity::Medium
    } else {
        IssueSeverity::Low
    };

    Some(draft(
        IssueCode::BreakTooShort,
        severity,
        format!(
            "Break lasted {} minutes, minimum is {} minutes",
            duration / 60,
            minimum / 60
        ),
        Some((first.id.as_str(), "break")),
        json!({
            "breaks": short
                .iter()
                .map(|(b, d, m)| json!({ "id": b.id, "duration_seconds": d, "minimum_seconds": m }))
                .collect::<Vec<_>>(),
        }),
    ))
}

fn break_too_long(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> Option<IssueDraft> {
    let long: Vec<(&Break, i64, i64)> = ctx
        .completed_breaks()
        .filter_map(|b| {
            let maximum = policy.breaks.maximum_for(b.break_type);
            let duration = b.duration_seconds.unwrap_or(0);
            (duration > maximum).then_some((b, duration, maximum))
        })
        .collect();
    let (first, duration, maximum) = *long.first()?;

    let severity = if long.iter().any(|(_, d, m)| d * 2 > m * 3) {
        IssueSeverity::Medium
    } else {
        IssueSeverity::Low
    };

    Some(draft(
        IssueCode::BreakTooLong,
        severity,
        format!(
            "Break lasted {} minutes, maximum is {} minutes",
            duration / 60,
            maximum / 60
        ),
        Some((first.id.as_str(), "break")),
        json!({
            "breaks": long
                .iter()
                .map(|(b, d, m)| json!({ "id": b.id, "duration_seconds": d, "maximum_seconds": m }))
                .collect::<Vec<_>>(),
        }),
    ))
}

fn excessive_overtime(ctx: &ValidationContext<'_>, policy: &ShiftPolicy) -> Option<IssueDraft> {
    let daily = ctx.shift.overtime_seconds > policy.daily_overtime_cap_secs;
    let week_total = ctx.week_prior_seconds + ctx.shift.total_seconds;
    let weekly = week_total > policy.weekly_hours_cap_secs;
    if !daily && !weekly {
        return None;
    }

    let message = if daily {
        format!(
            "{:.2} overtime hours exceed the daily cap of {:.2}",
            ctx.shift.overtime_hours(),
            policy.daily_overtime_cap_secs as f64 / 3600.0
        )
    } else {
        format!(
            "{:.2} hours this week exceed the weekly cap of {:.2}",
            week_total as f64 / 3600.0,
            policy.weekly_hours_cap_secs as f64 / 3600.0
        )
    };

    Some(draft(
        IssueCode::ExcessiveOvertime,
        IssueSeverity::Medium,
        message,
        Some((ctx.shift.id.as_str(), "shift")),
        json!({
            "overtime_seconds": ctx.shift.overtime_seconds,
            "daily_cap_seconds": policy.daily_overtime_cap_secs,
            "week_total_seconds": week_total,
            "weekly_cap_seconds": policy.weekly_hours_cap_secs,
        }),
    ))
}

// =============================================================================
// System Rules
// =============================================================================

fn refund_chain_corrupt(ctx: &ValidationContext<'_>, _policy: &ShiftPolicy) -> Option<IssueDraft> {
    let lookup = |id: &str| {
        ctx.transactions
            .iter()
            .chain(ctx.linked_transactions.iter())
            .find(|t| t.id == id)
    };

    let broken: Vec<(&SalesTransaction, ChainBreak)> = ctx
        .transactions
        .iter()
        .filter(|t| t.original_transaction_id.is_some())
        .filter_map(|t| {
            walk_refund_chain(t, lookup, DEFAULT_MAX_DEPTH)
                .err()
                .map(|e| (t, e))
        })
        .collect();
    let (first, _) = broken.first()?;

    Some(draft(
        IssueCode::RefundChainCorrupt,
        IssueSeverity::Critical,
        format!("{} refund chain(s) are cyclic or too deep", broken.len()),
        Some((first.id.as_str(), "transaction")),
        json!({
            "chains": broken
                .iter()
                .map(|(t, e)| match e {
                    ChainBreak::Cycle { at } => json!({ "id": t.id, "cycle_at": at }),
                    ChainBreak::TooDeep { depth } => json!({ "id": t.id, "depth": depth }),
                })
                .collect::<Vec<_>>(),
        }),
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{close_shift, open_shift};
    use crate::ledger::{new_event, ClockRequest};
    use crate::types::{
        CashCountType, ClockEventType, ClockMethod, PaymentMethod, ScheduleStatus, ShiftStatus,
    };

    const MIN_MS: i64 = 60_000;
    const HOUR_MS: i64 = 3_600_000;

    fn no_meal_rule() -> ShiftPolicy {
        let mut policy = ShiftPolicy::default();
        policy.breaks.meal_required_after_secs = 10 * 3600;
        policy
    }

    fn closed_shift(hours: i64, starting_cash: Option<i64>, breaks: &[Break]) -> Shift {
        let request = |ts| ClockRequest {
            user_id: "u-1".to_string(),
            business_id: "biz".to_string(),
            terminal_id: "till-1".to_string(),
            schedule_id: None,
            method: ClockMethod::Manual,
            timestamp: ts,
        };
        let clock_in = new_event(&request(0), ClockEventType::In, 0);
        let shift = open_shift(&clock_in, starting_cash, 0);
        let clock_out = new_event(&request(hours * HOUR_MS), ClockEventType::Out, 0);
        close_shift(&shift, &clock_out, breaks, &[], 8 * 3600, 0).unwrap()
    }

    fn completed(break_type: BreakType, secs: i64, minimum: Option<i64>) -> Break {
        Break {
            id: crate::new_id(),
            shift_id: "s".to_string(),
            user_id: "u-1".to_string(),
            break_type,
            start_time: 3 * HOUR_MS,
            end_time: Some(3 * HOUR_MS + secs * 1000),
            duration_seconds: Some(secs),
            is_paid: false,
            status: BreakStatus::Completed,
            is_required: true,
            minimum_duration_seconds: minimum,
            is_missed: false,
            is_short: minimum.is_some_and(|m| secs < m),
        }
    }

    fn txn(kind: TransactionType, cents: i64) -> SalesTransaction {
        SalesTransaction {
            id: crate::new_id(),
            shift_id: "s".to_string(),
            transaction_type: kind,
            payment_method: PaymentMethod::Cash,
            total_cents: cents,
            cash_amount_cents: None,
            void_reason: None,
            manager_approval_id: None,
            is_partial_refund: false,
            original_transaction_id: None,
            created_at: 0,
        }
    }

    fn end_count(variance: i64) -> CashDrawerCount {
        CashDrawerCount {
            id: crate::new_id(),
            shift_id: "s".to_string(),
            count_type: CashCountType::EndShift,
            expected_cents: 33_000,
            counted_cents: 33_000 + variance,
            variance_cents: variance,
            counted_by: "u-1".to_string(),
            notes: Some("counted twice".to_string()),
            requires_approval: variance.abs() > 500,
            approved_by: None,
            approved_at: None,
            timestamp: 0,
        }
    }

    #[test]
    fn test_clean_eight_hour_shift() {
        let shift = closed_shift(8, None, &[]);
        let outcome = validate_shift(&ValidationContext::new(&shift, 8 * HOUR_MS), &no_meal_rule());

        assert!(outcome.issues.is_empty());
        assert!(outcome.valid);
        assert!(!outcome.requires_review);
    }

    #[test]
    fn test_short_break_is_warning_only() {
        let breaks = vec![completed(BreakType::Meal, 600, Some(45 * 60))];
        let shift = closed_shift(8, None, &breaks);
        let ctx = ValidationContext {
            breaks: &breaks,
            ..ValidationContext::new(&shift, 8 * HOUR_MS)
        };

        let outcome = validate_shift(&ctx, &ShiftPolicy::default());

        assert_eq!(outcome.codes(), vec![IssueCode::BreakTooShort]);
        assert_eq!(outcome.issues[0].severity, IssueSeverity::Medium);
        assert!(outcome.valid);
        assert!(!outcome.requires_review);
    }

    #[test]
    fn test_no_meal_break_after_threshold() {
        let shift = closed_shift(8, None, &[]);
        let outcome = validate_shift(&ValidationContext::new(&shift, 0), &ShiftPolicy::default());
        assert_eq!(outcome.codes(), vec![IssueCode::MissingBreak]);
        assert!(!outcome.valid);
        assert!(outcome.requires_review);
    }

    #[test]
    fn test_cash_variance_high_and_critical() {
        let shift = closed_shift(4, Some(10_000), &[]);
        let counts = vec![end_count(-3_000)];
        let ctx = ValidationContext {
            cash_counts: &counts,
            ..ValidationContext::new(&shift, 0)
        };
        let outcome = validate_shift(&ctx, &ShiftPolicy::default());
        let issue = outcome.issue(IssueCode::CashVarianceHigh).unwrap();
        assert_eq!(issue.severity, IssueSeverity::High);
        assert!(outcome.requires_review);

        let counts = vec![end_count(-8_000)];
        let ctx = ValidationContext {
            cash_counts: &counts,
            ..ValidationContext::new(&shift, 0)
        };
        let outcome = validate_shift(&ctx, &ShiftPolicy::default());
        assert_eq!(
            outcome.issue(IssueCode::CashVarianceHigh).unwrap().severity,
            IssueSeverity::Critical
        );
        assert_eq!(outcome.critical_issue_count, 1);
    }

    #[test]
    fn test_pos_shift_without_end_count() {
        let shift = closed_shift(4, Some(10_000), &[]);
        let outcome = validate_shift(&ValidationContext::new(&shift, 0), &ShiftPolicy::default());
        assert_eq!(outcome.codes(), vec![IssueCode::MissingEndShiftCount]);
        assert!(outcome.valid);
    }

    #[test]
    fn test_multiple_end_counts_flag_corruption() {
        let shift = closed_shift(4, Some(10_000), &[]);
        let counts = vec![end_count(0), end_count(100)];
        let ctx = ValidationContext {
            cash_counts: &counts,
            ..ValidationContext::new(&shift, 0)
        };
        let outcome = validate_shift(&ctx, &ShiftPolicy::default());
        assert_eq!(outcome.codes(), vec![IssueCode::MultipleEndShiftCounts]);
        assert!(!outcome.valid);
    }

    #[test]
    fn test_stale_open_shift_is_missed_clock_out() {
        let clock_in = new_event(
            &ClockRequest {
                user_id: "u-1".to_string(),
                business_id: "biz".to_string(),
                terminal_id: "till-1".to_string(),
                schedule_id: None,
                method: ClockMethod::Login,
                timestamp: 0,
            },
            ClockEventType::In,
            0,
        );
        let shift = open_shift(&clock_in, None, 0);
        assert_eq!(shift.status, ShiftStatus::Active);

        let outcome = validate_shift(&ValidationContext::new(&shift, 20 * HOUR_MS), &no_meal_rule());
        let issue = outcome.issue(IssueCode::MissedClockOut).unwrap();
        assert_eq!(issue.severity, IssueSeverity::High);

        let outcome = validate_shift(&ValidationContext::new(&shift, 2 * HOUR_MS), &no_meal_rule());
        assert!(outcome.issue(IssueCode::MissedClockOut).is_none());
    }

    #[test]
    fn test_late_clock_in_severity_steps() {
        let mut shift = closed_shift(4, None, &[]);
        let schedule = Schedule {
            id: "sch".to_string(),
            user_id: "u-1".to_string(),
            business_id: "biz".to_string(),
            start_time: 0,
            end_time: 4 * HOUR_MS,
            status: ScheduleStatus::Scheduled,
        };
        let policy = ShiftPolicy::default();

        shift.started_at = 10 * MIN_MS;
        let ctx = ValidationContext {
            schedule: Some(&schedule),
            ..ValidationContext::new(&shift, 0)
        };
        assert_eq!(
            validate_shift(&ctx, &policy).issue(IssueCode::LateClockIn).unwrap().severity,
            IssueSeverity::Low
        );

        shift.started_at = 30 * MIN_MS;
        let ctx = ValidationContext {
            schedule: Some(&schedule),
            ..ValidationContext::new(&shift, 0)
        };
        assert_eq!(
            validate_shift(&ctx, &policy).issue(IssueCode::LateClockIn).unwrap().severity,
            IssueSeverity::Medium
        );

        shift.started_at = 4 * MIN_MS;
        let ctx = ValidationContext {
            schedule: Some(&schedule),
            ..ValidationContext::new(&shift, 0)
        };
        assert!(validate_shift(&ctx, &policy).issue(IssueCode::LateClockIn).is_none());
    }

    #[test]
    fn test_overlap_is_critical() {
        let shift = closed_shift(4, None, &[]);
        let mut other = closed_shift(4, None, &[]);
        other.started_at = 2 * HOUR_MS;
        other.ended_at = Some(6 * HOUR_MS);
        let others = vec![other];
        let ctx = ValidationContext {
            other_shifts: &others,
            ..ValidationContext::new(&shift, 0)
        };
        let outcome = validate_shift(&ctx, &no_meal_rule());
        assert_eq!(outcome.codes(), vec![IssueCode::ShiftOverlap]);
        assert_eq!(outcome.critical_issue_count, 1);
        assert!(outcome.requires_review);
    }

    #[test]
    fn test_transaction_rules() {
        let shift = closed_shift(4, None, &[]);
        let mut big_refund = txn(TransactionType::Refund, 9_000);
        big_refund.original_transaction_id = None;
        let mut partial = txn(TransactionType::Refund, 100);
        partial.is_partial_refund = true;
        partial.manager_approval_id = Some("m-1".to_string());
        let mut txns = vec![big_refund, partial];
        txns.extend((0..6).map(|_| txn(TransactionType::Void, 100)));

        let ctx = ValidationContext {
            transactions: &txns,
            ..ValidationContext::new(&shift, 0)
        };
        let outcome = validate_shift(&ctx, &no_meal_rule());

        // High first, then the mediums in catalog order.
        assert_eq!(
            outcome.codes(),
            vec![
                IssueCode::RefundWithoutApproval,
                IssueCode::VoidedTransactionNoReason,
                IssueCode::ExcessiveVoids,
            ]
        );
    }

    #[test]
    fn test_refund_cycle_is_critical_system_issue() {
        let shift = closed_shift(4, None, &[]);
        let mut a = txn(TransactionType::Refund, 100);
        let mut b = txn(TransactionType::Refund, 100);
        a.original_transaction_id = Some(b.id.clone());
        b.original_transaction_id = Some(a.id.clone());
        a.manager_approval_id = Some("m".to_string());
        b.manager_approval_id = Some("m".to_string());
        let txns = vec![a, b];

        let ctx = ValidationContext {
            transactions: &txns,
            ..ValidationContext::new(&shift, 0)
        };
        let outcome = validate_shift(&ctx, &no_meal_rule());
        let issue = outcome.issue(IssueCode::RefundChainCorrupt).unwrap();
        assert_eq!(issue.severity, IssueSeverity::Critical);
        assert_eq!(issue.category(), crate::issue::IssueCategory::System);
    }

    #[test]
    fn test_excessive_overtime_daily_and_weekly() {
        let shift = closed_shift(13, None, &[completed(BreakType::Meal, 1800, None)]);
        let breaks = vec![completed(BreakType::Meal, 1800, None)];
        let ctx = ValidationContext {
            breaks: &breaks,
            ..ValidationContext::new(&shift, 0)
        };
        assert!(validate_shift(&ctx, &ShiftPolicy::default())
            .issue(IssueCode::ExcessiveOvertime)
            .is_some());

        let shift = closed_shift(8, None, &[completed(BreakType::Meal, 1800, None)]);
        let ctx = ValidationContext {
            breaks: &breaks,
            week_prior_seconds: 45 * 3600,
            ..ValidationContext::new(&shift, 0)
        };
        assert!(validate_shift(&ctx, &ShiftPolicy::default())
            .issue(IssueCode::ExcessiveOvertime)
            .is_some());
    }

    #[test]
    fn test_engine_is_idempotent() {
        let breaks = vec![completed(BreakType::Rest, 60, Some(600))];
        let shift = closed_shift(9, Some(10_000), &breaks);
        let counts = vec![end_count(-3_000)];
        let txns = vec![txn(TransactionType::Void, 100)];
        let ctx = ValidationContext {
            breaks: &breaks,
            cash_counts: &counts,
            transactions: &txns,
            ..ValidationContext::new(&shift, 0)
        };
        let policy = ShiftPolicy::default();

        let first = validate_shift(&ctx, &policy);
        let second = validate_shift(&ctx, &policy);
        assert_eq!(first, second);
        assert!(first.issues.len() >= 3);
    }

    #[test]
    fn test_ranking_puts_critical_first() {
        let outcome = validate_shift(
            &ValidationContext::new(&closed_shift(4, None, &[]), 0),
            &no_meal_rule(),
        );
        assert!(outcome.issues.is_empty());

        let drafts = vec![
            draft(IssueCode::BreakTooLong, IssueSeverity::Low, String::new(), None, json!({})),
            draft(IssueCode::ShiftOverlap, IssueSeverity::Critical, String::new(), None, json!({})),
        ];
        let summary = summarize(drafts);
        assert_eq!(summary.warning_count, 1);
        assert_eq!(summary.violation_count, 1);
        assert!(!summary.valid);
    }

    #[test]
    fn test_catalog_covers_every_code_once() {
        let codes: Vec<IssueCode> = catalog().collect();
        let mut sorted = codes.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
        assert_eq!(codes.len(), 16);
    }
}
