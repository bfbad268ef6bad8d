//! # Cash Drawer Reconciliation
//!
//! Expected cash, count variance and the approval requirement.
//!
//! ## Reconciliation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  starting_cash ─────────┐                                               │
//! │  + cash part of sales   ├──► expected                                   │
//! │  − cash part of refunds ┘       │                                       │
//! │  (voids never move cash)        ▼                                       │
//! │                      variance = counted − expected                      │
//! │                                 │                                       │
//! │            |variance| > threshold?                                      │
//! │              │ no                      │ yes                            │
//! │              ▼                         ▼                                │
//! │          recorded            notes required, requires_approval = true   │
//! │                              (manager approves with PIN later)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example (Scenario: short drawer)
//! ```rust
//! use titan_core::cash::variance;
//! use titan_core::Money;
//!
//! let expected = Money::from_decimal(330.00);
//! let counted = Money::from_decimal(300.00);
//! assert_eq!(variance(counted, expected).to_string(), "-$30.00");
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    CashCountType, CashDrawerCount, SalesTransaction, Shift, Staff, TransactionType,
};
use crate::validation::{normalize_notes, validate_cash_cents};

/// Expected drawer cash: starting float plus cash sales minus cash refunds.
pub fn expected_cash(starting_cash: Money, transactions: &[SalesTransaction]) -> Money {
    transactions
        .iter()
        .fold(starting_cash, |expected, txn| match txn.transaction_type {
            TransactionType::Sale => expected + txn.cash_portion(),
            TransactionType::Refund => expected - txn.cash_portion(),
            TransactionType::Void => expected,
        })
}

/// `counted − expected`. Positive is an overage, negative a shortage.
#[inline]
pub fn variance(counted: Money, expected: Money) -> Money {
    counted - expected
}

/// True when a variance needs notes and manager approval.
#[inline]
pub fn exceeds_threshold(variance: Money, threshold_cents: i64) -> bool {
    variance.abs().cents() > threshold_cents
}

/// What a caller supplies to record a count.
#[derive(Debug, Clone)]
pub struct CountRequest {
    pub count_type: CashCountType,
    pub counted: Money,
    pub counted_by: String,
    pub notes: Option<String>,
}

/// Records a drawer count against the shift's expected cash.
///
/// ## Errors
/// - `InvalidState` for a mid-shift count on a closed shift
/// - `Conflict` for a second end-shift count
/// - `Validation` for a negative count, or a count above the discrepancy
///   threshold without notes
pub fn record_count(
    shift: &Shift,
    existing: &[CashDrawerCount],
    request: &CountRequest,
    expected: Money,
    threshold_cents: i64,
    timestamp: i64,
) -> CoreResult<CashDrawerCount> {
    validate_cash_cents("counted_amount", request.counted.cents())?;

    if request.count_type == CashCountType::MidShift && !shift.is_active() {
        return Err(CoreError::invalid_state(
            "Shift",
            &shift.id,
            shift.status.as_str(),
            "mid-shift counts need an active shift",
        ));
    }

    if request.count_type == CashCountType::EndShift && existing.iter().any(|c| c.is_end_shift()) {
        return Err(CoreError::conflict(
            "CashDrawerCount",
            format!("shift {} already has an end-shift count", shift.id),
        ));
    }

    let variance = variance(request.counted, expected);
    let requires_approval = exceeds_threshold(variance, threshold_cents);
    let notes = normalize_notes(request.notes.as_deref())?;

    if requires_approval && notes.is_none() {
        return Err(ValidationError::Required {
            field: "notes".to_string(),
        }
        .into());
    }

    Ok(CashDrawerCount {
        id: crate::new_id(),
        shift_id: shift.id.clone(),
        count_type: request.count_type,
        expected_cents: expected.cents(),
        counted_cents: request.counted.cents(),
        variance_cents: variance.cents(),
        counted_by: request.counted_by.clone(),
        notes,
        requires_approval,
        approved_by: None,
        approved_at: None,
        timestamp,
    })
}

/// Stamps a manager approval on a count that needs one.
///
/// The approver's PIN must already be verified; this checks the role and
/// the count's state.
pub fn approve_count(
    count: &CashDrawerCount,
    approver: &Staff,
    now: i64,
) -> CoreResult<CashDrawerCount> {
    if !approver.role.can_approve() {
        return Err(CoreError::invalid_state(
            "Staff",
            &approver.id,
            approver.role.as_str(),
            "only managers and owners can approve cash variances",
        ));
    }

    if !count.requires_approval {
        return Err(CoreError::invalid_state(
            "CashDrawerCount",
            &count.id,
            "within threshold",
            "count does not need approval",
        ));
    }

    if count.approved_by.is_some() {
        return Err(CoreError::invalid_state(
            "CashDrawerCount",
            &count.id,
            "approved",
            "count is already approved",
        ));
    }

    Ok(CashDrawerCount {
        approved_by: Some(approver.id.clone()),
        approved_at: Some(now),
        ..count.clone()
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::open_shift;
    use crate::ledger::{new_event, ClockRequest};
    use crate::types::{ClockEventType, ClockMethod, PaymentMethod, StaffRole};

    fn shift(starting: i64) -> Shift {
        let event = new_event(
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
        open_shift(&event, Some(starting), 0)
    }

    fn txn(kind: TransactionType, method: PaymentMethod, total: i64, cash: Option<i64>) -> SalesTransaction {
        SalesTransaction {
            id: crate::new_id(),
            shift_id: "s".to_string(),
            transaction_type: kind,
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

    fn end_request(counted: i64, notes: Option<&str>) -> CountRequest {
        CountRequest {
            count_type: CashCountType::EndShift,
            counted: Money::from_cents(counted),
            counted_by: "u-1".to_string(),
            notes: notes.map(str::to_string),
        }
    }

    fn manager(role: StaffRole) -> Staff {
        Staff {
            id: "m-1".to_string(),
            business_id: "biz".to_string(),
            display_name: "Morgan".to_string(),
            role,
            shift_required_override: None,
            pin_hash: None,
        }
    }

    #[test]
    fn test_expected_cash_uses_cash_portions_only() {
        let txns = vec![
            txn(TransactionType::Sale, PaymentMethod::Cash, 20_000, None),
            txn(TransactionType::Sale, PaymentMethod::Mixed, 10_000, Some(5_000)),
            txn(TransactionType::Sale, PaymentMethod::ExternalCard, 7_000, None),
            txn(TransactionType::Refund, PaymentMethod::Cash, 2_000, None),
            txn(TransactionType::Void, PaymentMethod::Cash, 9_999, None),
        ];
        let expected = expected_cash(Money::from_cents(10_000), &txns);
        assert_eq!(expected.cents(), 33_000);
    }

    #[test]
    fn test_high_variance_requires_notes() {
        let shift = shift(10_000);
        let expected = Money::from_cents(33_000);

        let err = record_count(&shift, &[], &end_request(30_000, None), expected, 500, 1).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));

        let count = record_count(
            &shift,
            &[],
            &end_request(30_000, Some("till short, receipts missing")),
            expected,
            500,
            1,
        )
        .unwrap();
        assert_eq!(count.variance_cents, -3_000);
        assert!(count.requires_approval);
    }

    #[test]
    fn test_small_variance_needs_nothing() {
        let count = record_count(&shift(0), &[], &end_request(10_450, None), Money::from_cents(10_000), 500, 1)
            .unwrap();
        assert!(!count.requires_approval);
        assert_eq!(count.variance_cents, 450);
    }

    #[test]
    fn test_second_end_shift_count_conflicts() {
        let shift = shift(0);
        let first = record_count(&shift, &[], &end_request(0, None), Money::zero(), 500, 1).unwrap();
        let err = record_count(&shift, &[first], &end_request(0, None), Money::zero(), 500, 2).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }));
    }

    #[test]
    fn test_negative_count_rejected() {
        let err = record_count(&shift(0), &[], &end_request(-1, None), Money::zero(), 500, 1).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_approval_rules() {
        let shift = shift(10_000);
        let count = record_count(
            &shift,
            &[],
            &end_request(30_000, Some("short")),
            Money::from_cents(33_000),
            500,
            1,
        )
        .unwrap();

        assert!(approve_count(&count, &manager(StaffRole::Cashier), 2).is_err());

        let approved = approve_count(&count, &manager(StaffRole::Manager), 2).unwrap();
        assert_eq!(approved.approved_by.as_deref(), Some("m-1"));
        assert_eq!(approved.approved_at, Some(2));

        assert!(approve_count(&approved, &manager(StaffRole::Owner), 3).is_err());
    }
}
