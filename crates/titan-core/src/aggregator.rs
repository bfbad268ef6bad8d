//! # Shift Aggregator
//!
//! Derives a shift's computed fields from its source-of-truth records.
//!
//! ## Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  clock-in.ts ─┐                                                         │
//! │               ├─► elapsed = (out − in) / 1000                           │
//! │  clock-out.ts ┘        │                                                │
//! │                        ▼                                                │
//! │  completed breaks ─► break_duration ─► total = elapsed − break_duration │
//! │                                           │                             │
//! │                          ┌────────────────┴───────────────┐             │
//! │                          ▼                                ▼             │
//! │              regular = min(total, std)      overtime = max(0, total−std)│
//! │                                                                         │
//! │  transactions ─► total_sales / total_transactions / refunds / voids     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The computed fields are a materialized view: [`derive_facts`] is the only
//! place they are computed, both at clock-out and when a shift is refreshed,
//! so the two paths always agree.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Break, ClockEvent, SalesTransaction, Shift, ShiftStatus, TransactionType};
use crate::validation::validate_cash_cents;
use crate::{millis_to_secs, SECS_PER_HOUR};

// =============================================================================
// Hours
// =============================================================================

/// Converts seconds to hours rounded to two decimals.
///
/// Presentation only; nothing is computed from the result.
///
/// ## Example
/// ```rust
/// use titan_core::aggregator::seconds_to_hours;
///
/// assert_eq!(seconds_to_hours(8 * 3600), 8.0);
/// assert_eq!(seconds_to_hours(5400), 1.5);
/// assert_eq!(seconds_to_hours(1000), 0.28);
/// ```
pub fn seconds_to_hours(seconds: i64) -> f64 {
    (seconds as f64 / SECS_PER_HOUR as f64 * 100.0).round() / 100.0
}

/// Worked time split into regular and overtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HoursSplit {
    pub total_seconds: i64,
    pub regular_seconds: i64,
    pub overtime_seconds: i64,
}

/// Splits worked seconds against the standard shift length.
pub fn split_hours(total_seconds: i64, standard_secs: i64) -> HoursSplit {
    let total_seconds = total_seconds.max(0);
    HoursSplit {
        total_seconds,
        regular_seconds: total_seconds.min(standard_secs),
        overtime_seconds: (total_seconds - standard_secs).max(0),
    }
}

/// Sum of completed break durations.
pub fn break_duration(breaks: &[Break]) -> i64 {
    breaks.iter().map(Break::completed_seconds).sum()
}

/// Completed break time that falls inside `[from, to)`.
///
/// A break logged past the clock-out only counts up to the clock-out, so
/// worked time plus break time never exceeds the time on the clock.
pub fn break_duration_within(breaks: &[Break], from: i64, to: i64) -> i64 {
    breaks
        .iter()
        .map(|b| {
            let recorded = b.completed_seconds();
            match b.end_time {
                Some(end) if recorded > 0 => {
                    let overlap = end.min(to) - b.start_time.max(from);
                    recorded.min(millis_to_secs(overlap.max(0)))
                }
                _ => recorded,
            }
        })
        .sum()
}

// =============================================================================
// Transaction Totals
// =============================================================================

/// Sales totals for one shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesTotals {
    pub total_sales: Money,
    pub total_transactions: i64,
    pub total_refunds: Money,
    pub total_voids: i64,
}

/// Sums the transactions that reference a shift.
///
/// Sales add to the sales total and count as transactions, refunds add to
/// the refund total, voids are counted only.
pub fn sum_transactions(transactions: &[SalesTransaction]) -> SalesTotals {
    transactions
        .iter()
        .fold(SalesTotals::default(), |mut totals, txn| {
            match txn.transaction_type {
                TransactionType::Sale => {
                    totals.total_sales += txn.total();
                    totals.total_transactions += 1;
                }
                TransactionType::Refund => totals.total_refunds += txn.total(),
                TransactionType::Void => totals.total_voids += 1,
            }
            totals
        })
}

// =============================================================================
// Shift Facts
// =============================================================================

/// Every computed field of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftFacts {
    pub hours: HoursSplit,
    pub break_duration_seconds: i64,
    pub sales: SalesTotals,
}

/// Derives the computed fields from clock timestamps, breaks and transactions.
pub fn derive_facts(
    clock_in: i64,
    clock_out: i64,
    breaks: &[Break],
    transactions: &[SalesTransaction],
    standard_secs: i64,
) -> ShiftFacts {
    let elapsed = millis_to_secs((clock_out - clock_in).max(0));
    let break_duration_seconds = break_duration_within(breaks, clock_in, clock_out);

    ShiftFacts {
        hours: split_hours(elapsed - break_duration_seconds, standard_secs),
        break_duration_seconds,
        sales: sum_transactions(transactions),
    }
}

/// Writes derived facts onto a shift.
pub fn apply_facts(shift: &mut Shift, facts: &ShiftFacts, updated_at: i64) {
    shift.total_seconds = facts.hours.total_seconds;
    shift.regular_seconds = facts.hours.regular_seconds;
    shift.overtime_seconds = facts.hours.overtime_seconds;
    shift.break_duration_seconds = facts.break_duration_seconds;
    shift.total_sales_cents = facts.sales.total_sales.cents();
    shift.total_transactions = facts.sales.total_transactions;
    shift.total_refunds_cents = facts.sales.total_refunds.cents();
    shift.total_voids = facts.sales.total_voids;
    shift.updated_at = updated_at;
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Opens an active shift for a clock-in event.
pub fn open_shift(clock_in: &ClockEvent, starting_cash_cents: Option<i64>, now: i64) -> Shift {
    Shift {
        id: crate::new_id(),
        user_id: clock_in.user_id.clone(),
        business_id: clock_in.business_id.clone(),
        schedule_id: clock_in.schedule_id.clone(),
        terminal_id: clock_in.terminal_id.clone(),
        clock_in_id: clock_in.id.clone(),
        clock_out_id: None,
        status: ShiftStatus::Active,
        started_at: clock_in.timestamp,
        ended_at: None,
        starting_cash_cents,
        total_sales_cents: 0,
        total_transactions: 0,
        total_refunds_cents: 0,
        total_voids: 0,
        total_seconds: 0,
        regular_seconds: 0,
        overtime_seconds: 0,
        break_duration_seconds: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Validates the starting float of a POS shift.
pub fn check_starting_cash(starting_cash_cents: Option<i64>) -> CoreResult<()> {
    if let Some(cents) = starting_cash_cents {
        validate_cash_cents("starting_cash", cents)?;
    }
    Ok(())
}

/// Closes an active shift against its clock-out event.
///
/// `breaks` must already be force-closed (see
/// [`crate::breaks::force_close_open_breaks`]). The shift comes back as
/// `ended`; the caller moves it to `pending_review` when validation asks
/// for it.
pub fn close_shift(
    shift: &Shift,
    clock_out: &ClockEvent,
    breaks: &[Break],
    transactions: &[SalesTransaction],
    standard_secs: i64,
    now: i64,
) -> CoreResult<Shift> {
    if !shift.is_active() {
        return Err(CoreError::invalid_state(
            "Shift",
            &shift.id,
            shift.status.as_str(),
            "shift is already closed",
        ));
    }

    let facts = derive_facts(
        shift.started_at,
        clock_out.timestamp,
        breaks,
        transactions,
        standard_secs,
    );

    let mut closed = shift.clone();
    closed.clock_out_id = Some(clock_out.id.clone());
    closed.ended_at = Some(clock_out.timestamp);
    closed.status = ShiftStatus::Ended;
    apply_facts(&mut closed, &facts, now);
    Ok(closed)
}

/// Re-derives a closed shift's computed fields from its clock events.
///
/// Converges to the value [`close_shift`] produced for unchanged inputs.
pub fn recompute(
    shift: &Shift,
    clock_in: &ClockEvent,
    clock_out: &ClockEvent,
    breaks: &[Break],
    transactions: &[SalesTransaction],
    standard_secs: i64,
    now: i64,
) -> CoreResult<Shift> {
    if shift.clock_out_id.as_deref() != Some(clock_out.id.as_str()) || shift.clock_in_id != clock_in.id
    {
        return Err(CoreError::invalid_state(
            "Shift",
            &shift.id,
            shift.status.as_str(),
            "clock events do not belong to this shift",
        ));
    }

    let facts = derive_facts(
        clock_in.timestamp,
        clock_out.timestamp,
        breaks,
        transactions,
        standard_secs,
    );

    let mut refreshed = shift.clone();
    refreshed.started_at = clock_in.timestamp;
    refreshed.ended_at = Some(clock_out.timestamp);
    apply_facts(&mut refreshed, &facts, now);
    Ok(refreshed)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{new_event, ClockRequest};
    use crate::types::{BreakStatus, BreakType, ClockEventType, ClockMethod, PaymentMethod};

    const HOUR_MS: i64 = 3_600_000;

    fn event(ts: i64, event_type: ClockEventType) -> ClockEvent {
        new_event(
            &ClockRequest {
                user_id: "u-1".to_string(),
                business_id: "biz".to_string(),
                terminal_id: "till-1".to_string(),
                schedule_id: None,
                method: ClockMethod::Manual,
                timestamp: ts,
            },
            event_type,
            ts,
        )
    }

    fn completed_break(secs: i64) -> Break {
        Break {
            id: crate::new_id(),
            shift_id: "s".to_string(),
            user_id: "u-1".to_string(),
            break_type: BreakType::Meal,
            start_time: HOUR_MS,
            end_time: Some(HOUR_MS + secs * 1000),
            duration_seconds: Some(secs),
            is_paid: false,
            status: BreakStatus::Completed,
            is_required: false,
            minimum_duration_seconds: None,
            is_missed: false,
            is_short: false,
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

    #[test]
    fn test_split_hours() {
        let split = split_hours(6 * 3600, 8 * 3600);
        assert_eq!((split.regular_seconds, split.overtime_seconds), (6 * 3600, 0));

        let split = split_hours(10 * 3600, 8 * 3600);
        assert_eq!((split.regular_seconds, split.overtime_seconds), (8 * 3600, 2 * 3600));
        assert_eq!(split.regular_seconds + split.overtime_seconds, split.total_seconds);

        assert_eq!(split_hours(-5, 8 * 3600).total_seconds, 0);
    }

    #[test]
    fn test_close_shift_eight_hours() {
        let clock_in = event(0, ClockEventType::In);
        let shift = open_shift(&clock_in, None, 0);
        let clock_out = event(8 * HOUR_MS, ClockEventType::Out);

        let closed = close_shift(&shift, &clock_out, &[], &[], 8 * 3600, 8 * HOUR_MS).unwrap();

        assert_eq!(closed.status, ShiftStatus::Ended);
        assert_eq!(closed.total_hours(), 8.0);
        assert_eq!(closed.overtime_seconds, 0);
        assert_eq!(closed.clock_out_id.as_deref(), Some(clock_out.id.as_str()));
    }

    #[test]
    fn test_close_shift_subtracts_breaks_and_sums_sales() {
        let clock_in = event(0, ClockEventType::In);
        let shift = open_shift(&clock_in, Some(10_000), 0);
        let clock_out = event(9 * HOUR_MS, ClockEventType::Out);
        let breaks = vec![completed_break(1800)];
        let txns = vec![
            txn(TransactionType::Sale, 2_500),
            txn(TransactionType::Sale, 1_500),
            txn(TransactionType::Refund, 500),
            txn(TransactionType::Void, 900),
        ];

        let closed = close_shift(&shift, &clock_out, &breaks, &txns, 8 * 3600, 0).unwrap();

        assert_eq!(closed.break_duration_seconds, 1800);
        assert_eq!(closed.total_seconds, 9 * 3600 - 1800);
        assert_eq!(closed.overtime_seconds, 1800);
        assert_eq!(closed.total_sales_cents, 4_000);
        assert_eq!(closed.total_transactions, 2);
        assert_eq!(closed.total_refunds_cents, 500);
        assert_eq!(closed.total_voids, 1);
    }

    #[test]
    fn test_break_past_clock_out_is_clamped() {
        let clock_in = event(0, ClockEventType::In);
        let shift = open_shift(&clock_in, None, 0);
        let clock_out = event(2 * HOUR_MS, ClockEventType::Out);
        // starts at 1h, logged as 3h long
        let breaks = vec![completed_break(3 * 3600)];

        let closed = close_shift(&shift, &clock_out, &breaks, &[], 8 * 3600, 0).unwrap();

        assert_eq!(closed.break_duration_seconds, 3600);
        assert_eq!(closed.total_seconds, 3600);
        assert_eq!(
            closed.total_seconds + closed.break_duration_seconds,
            2 * 3600
        );
    }

    #[test]
    fn test_close_twice_rejected() {
        let clock_in = event(0, ClockEventType::In);
        let shift = open_shift(&clock_in, None, 0);
        let clock_out = event(HOUR_MS, ClockEventType::Out);
        let closed = close_shift(&shift, &clock_out, &[], &[], 8 * 3600, 0).unwrap();
        assert!(close_shift(&closed, &clock_out, &[], &[], 8 * 3600, 0).is_err());
    }

    #[test]
    fn test_recompute_converges_to_close() {
        let clock_in = event(0, ClockEventType::In);
        let shift = open_shift(&clock_in, None, 0);
        let clock_out = event(10 * HOUR_MS + 1234, ClockEventType::Out);
        let breaks = vec![completed_break(900), completed_break(1800)];

        let closed = close_shift(&shift, &clock_out, &breaks, &[], 8 * 3600, 5).unwrap();

        let mut drifted = closed.clone();
        drifted.total_seconds = 1;
        drifted.overtime_seconds = 99;
        let refreshed =
            recompute(&drifted, &clock_in, &clock_out, &breaks, &[], 8 * 3600, 5).unwrap();

        assert_eq!(refreshed, closed);
    }

    #[test]
    fn test_recompute_rejects_foreign_events() {
        let clock_in = event(0, ClockEventType::In);
        let shift = open_shift(&clock_in, None, 0);
        let clock_out = event(HOUR_MS, ClockEventType::Out);
        let closed = close_shift(&shift, &clock_out, &[], &[], 8 * 3600, 0).unwrap();
        let other = event(HOUR_MS, ClockEventType::Out);
        assert!(recompute(&closed, &clock_in, &other, &[], &[], 8 * 3600, 0).is_err());
    }
}
