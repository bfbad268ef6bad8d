//! End-to-end shift scenarios and lifecycle properties, run against an
//! in-memory database.

use titan_core::{
    BreakPolicy, BreakType, CashCountType, IssueCode, IssueSeverity, Resolution, ShiftPolicy,
    ShiftStatus, TransactionType, SECS_PER_HOUR,
};

use super::test_support::*;
use crate::dto::{CreateCountRequest, EndBreakRequest, ResolveIssueRequest, StartBreakRequest};
use crate::error::ShiftError;
use crate::ShiftService;

fn meal(shift_id: &str, at: i64, minimum_secs: Option<i64>) -> StartBreakRequest {
    StartBreakRequest {
        shift_id: shift_id.to_string(),
        break_type: BreakType::Meal,
        is_required: true,
        minimum_duration_seconds: minimum_secs,
        start_time: Some(at),
    }
}

async fn take_break(service: &ShiftService, request: StartBreakRequest, minutes: i64) {
    let end = request.start_time.unwrap_or(T0) + minutes * MIN_MS;
    let brk = service.start_break(request).await.unwrap();
    service
        .end_break(EndBreakRequest {
            break_id: brk.id,
            end_time: Some(end),
        })
        .await
        .unwrap();
}

fn end_count(shift_id: &str, amount: f64, notes: Option<&str>) -> CreateCountRequest {
    CreateCountRequest {
        shift_id: shift_id.to_string(),
        count_type: CashCountType::EndShift,
        counted_amount: amount,
        counted_by: "u-1".to_string(),
        notes: notes.map(str::to_string),
        timestamp: Some(T0 + 4 * HOUR_MS - MIN_MS),
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_scenario_a_clean_eight_hour_shift() {
    // Meal rule out of the way so nothing else fires.
    let policy = ShiftPolicy {
        breaks: BreakPolicy {
            meal_required_after_secs: 9 * SECS_PER_HOUR,
            ..BreakPolicy::default()
        },
        ..ShiftPolicy::default()
    };
    let (service, _) = service_with(policy).await;

    service.clock_in(clock_in("u-1", T0, None)).await.unwrap();
    let closed = service.clock_out(clock_out("u-1", T0 + 8 * HOUR_MS)).await.unwrap();

    assert_eq!(closed.shift.total_hours, 8.0);
    assert_eq!(closed.shift.regular_hours, 8.0);
    assert_eq!(closed.shift.overtime_hours, 0.0);
    assert!(closed.validation.valid);
    assert!(!closed.validation.requires_review);
    assert!(closed.validation.issues.is_empty());
    assert_eq!(closed.validation.resolution, Resolution::Pending);
    assert_eq!(closed.shift.status, ShiftStatus::Ended);
}

#[tokio::test]
async fn test_scenario_b_short_required_break() {
    let (service, _) = service().await;
    let shift = service.clock_in(clock_in("u-1", T0, None)).await.unwrap();

    take_break(&service, meal(&shift.id, T0 + 2 * HOUR_MS, Some(45 * 60)), 10).await;
    let closed = service.clock_out(clock_out("u-1", T0 + 4 * HOUR_MS)).await.unwrap();

    assert_eq!(closed.validation.codes(), vec![IssueCode::BreakTooShort]);
    // 10 minutes is less than half of 45
    assert_eq!(closed.validation.issues[0].severity, IssueSeverity::Medium);
    assert!(closed.validation.valid);
    assert!(!closed.validation.requires_review);
    assert_eq!(closed.shift.break_duration_seconds, 600);
}

#[tokio::test]
async fn test_scenario_c_short_drawer() {
    let (service, _) = service().await;
    let shift = service.clock_in(clock_in("u-1", T0, Some(100.0))).await.unwrap();
    cash_txn(&service, &shift.id, TransactionType::Sale, 25_000, T0 + HOUR_MS).await;
    cash_txn(&service, &shift.id, TransactionType::Refund, 2_000, T0 + 2 * HOUR_MS).await;

    let expected = service.get_expected_cash(&shift.id).await.unwrap();
    assert_eq!(expected.expected_cash, 330.0);

    let err = service.create_count(end_count(&shift.id, 300.0, None)).await.unwrap_err();
    assert!(matches!(err, ShiftError::Validation(_)));

    let count = service
        .create_count(end_count(&shift.id, 300.0, Some("two twenties missing")))
        .await
        .unwrap();
    assert_eq!(count.expected_amount, 330.0);
    assert_eq!(count.variance, -30.0);
    assert!(count.requires_approval);

    let closed = service.clock_out(clock_out("u-1", T0 + 4 * HOUR_MS)).await.unwrap();
    assert_eq!(closed.validation.codes(), vec![IssueCode::CashVarianceHigh]);
    assert_eq!(closed.validation.issues[0].severity, IssueSeverity::High);
    assert!(!closed.validation.valid);
    assert!(closed.validation.requires_review);
    assert_eq!(closed.validation.resolution, Resolution::NeedsReview);
    assert_eq!(closed.shift.status, ShiftStatus::PendingReview);
}

#[tokio::test]
async fn test_scenario_d_missed_clock_out_swept() {
    let (service, _) = service().await;
    let shift = service.clock_in(clock_in("u-1", T0, None)).await.unwrap();

    let report = service.sweep_stale_shifts(T0 + 20 * HOUR_MS).await.unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.flagged, vec![shift.id.clone()]);

    let validation = service.get_validation(&shift.id).await.unwrap().unwrap();
    let missed = validation
        .issues
        .iter()
        .find(|i| i.code == IssueCode::MissedClockOut)
        .unwrap();
    assert_eq!(missed.severity, IssueSeverity::High);
    assert!(validation.requires_review);

    // The shift stays open until someone closes it.
    assert!(service.get_active("u-1").await.unwrap().is_some());

    let again = service.sweep_stale_shifts(T0 + 21 * HOUR_MS).await.unwrap();
    assert_eq!(again.flagged, vec![shift.id.clone()]);
    let rerun = service.get_validation(&shift.id).await.unwrap().unwrap();
    assert_eq!(rerun.id, validation.id);
    assert_eq!(rerun.codes(), validation.codes());
}

#[tokio::test]
async fn test_scenario_e_last_issue_does_not_approve() {
    let (service, _) = service().await;
    service.clock_in(clock_in("u-1", T0, None)).await.unwrap();
    let closed = service.clock_out(clock_out("u-1", T0 + 7 * HOUR_MS)).await.unwrap();
    assert_eq!(closed.validation.codes(), vec![IssueCode::MissingBreak]);
    assert_eq!(closed.validation.unresolved_issue_count, 1);

    let after = service
        .resolve_issue(ResolveIssueRequest {
            issue_id: closed.validation.issues[0].id.clone(),
            resolved_by: "mgr-1".to_string(),
            notes: Some("meal logged on paper".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(after.unresolved_issue_count, 0);
    assert!(after.issues[0].resolved);
    assert_eq!(after.resolution, Resolution::NeedsReview);
    assert!(after.resolved_by.is_none());

    let err = service
        .resolve_issue(ResolveIssueRequest {
            issue_id: closed.validation.issues[0].id.clone(),
            resolved_by: "mgr-1".to_string(),
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ShiftError::InvalidState(_)));
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_hours_identity_with_overtime() {
    let (service, _) = service().await;
    let shift = service.clock_in(clock_in("u-1", T0, None)).await.unwrap();
    take_break(&service, meal(&shift.id, T0 + 4 * HOUR_MS, None), 30).await;

    let closed = service
        .clock_out(clock_out("u-1", T0 + 9 * HOUR_MS + 30 * MIN_MS))
        .await
        .unwrap();

    // 9.5h on the clock minus a 30 minute meal
    assert_eq!(closed.shift.break_duration_seconds, 30 * 60);
    assert_eq!(closed.shift.total_hours, 9.0);
    assert_eq!(closed.shift.regular_hours, 8.0);
    assert_eq!(closed.shift.overtime_hours, 1.0);
    assert_eq!(
        closed.shift.regular_hours + closed.shift.overtime_hours,
        closed.shift.total_hours
    );
}

#[tokio::test]
async fn test_validation_is_idempotent() {
    let (service, _) = service().await;
    let shift = service.clock_in(clock_in("u-1", T0, Some(50.0))).await.unwrap();
    cash_txn(&service, &shift.id, TransactionType::Void, 1_000, T0 + HOUR_MS).await;
    service.clock_out(clock_out("u-1", T0 + 7 * HOUR_MS)).await.unwrap();

    let first = service.run_validation(&shift.id).await.unwrap();
    let second = service.run_validation(&shift.id).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.codes(), second.codes());
    assert_eq!(first.violation_count, second.violation_count);
    assert_eq!(first.warning_count, second.warning_count);
    assert_eq!(second.unresolved_issue_count, second.issues.len() as i64);
    assert!(second.codes().contains(&IssueCode::VoidedTransactionNoReason));
    assert!(second.codes().contains(&IssueCode::MissingEndShiftCount));
}

#[tokio::test]
async fn test_concurrent_clock_ins_open_one_shift() {
    let (service, _) = service().await;

    let (a, b) = tokio::join!(
        service.clock_in(clock_in("u-1", T0, None)),
        service.clock_in(clock_in("u-1", T0 + 1, None)),
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = a.err().or(b.err()).unwrap();
    assert!(matches!(
        loser,
        ShiftError::InvalidState(_) | ShiftError::Conflict(_)
    ));
}

#[tokio::test]
async fn test_refresh_converges_to_clock_out_totals() {
    let (service, _) = service().await;
    let shift = service.clock_in(clock_in("u-1", T0, Some(20.0))).await.unwrap();
    take_break(&service, meal(&shift.id, T0 + 3 * HOUR_MS, None), 35).await;
    cash_txn(&service, &shift.id, TransactionType::Sale, 4_250, T0 + HOUR_MS).await;
    cash_txn(&service, &shift.id, TransactionType::Refund, 750, T0 + 2 * HOUR_MS).await;
    let closed = service.clock_out(clock_out("u-1", T0 + 8 * HOUR_MS)).await.unwrap();

    let refreshed = service.refresh_shift_aggregates(&shift.id).await.unwrap();
    assert_eq!(refreshed, closed.shift);

    let twice = service.refresh_shift_aggregates(&shift.id).await.unwrap();
    assert_eq!(twice, refreshed);
}
