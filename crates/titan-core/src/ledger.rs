//! # Clock Event Ledger
//!
//! Rules for recording clock-in and clock-out events. Events are append-only:
//! this module builds new events and decides whether they may be recorded,
//! it never edits one.
//!
//! ## Recording Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  clock-in                                                               │
//! │    open shift for user?  ── yes ──► InvalidState (already clocked in)   │
//! │          │ no                                                           │
//! │          ▼                                                              │
//! │    ClockEvent{type=in}  ──► aggregator::open_shift                      │
//! │                                                                         │
//! │  clock-out                                                              │
//! │    open shift for user?  ── no ───► InvalidState (not clocked in)       │
//! │          │ yes                                                          │
//! │    timestamp >= clock-in? ── no ──► Validation (OutOfOrder)             │
//! │          ▼                                                              │
//! │    ClockEvent{type=out} ──► aggregator::close_shift                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The "one open clock-in per user" rule is also a partial unique index in
//! the database, so two terminals racing each other cannot both win.

use crate::error::{CoreError, CoreResult};
use crate::types::{
    ClockEvent, ClockEventStatus, ClockEventType, ClockMethod, Schedule, ScheduleStatus, Shift,
};
use crate::validation::{validate_not_before, validate_reference};
use crate::MILLIS_PER_SEC;

/// What a caller supplies to record a clock event.
#[derive(Debug, Clone)]
pub struct ClockRequest {
    pub user_id: String,
    pub business_id: String,
    pub terminal_id: String,
    pub schedule_id: Option<String>,
    pub method: ClockMethod,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// Checks a clock-in against the user's currently open shift.
pub fn check_clock_in(request: &ClockRequest, open_shift: Option<&Shift>) -> CoreResult<()> {
    validate_reference("user_id", &request.user_id)?;
    validate_reference("business_id", &request.business_id)?;
    validate_reference("terminal_id", &request.terminal_id)?;

    if let Some(shift) = open_shift {
        return Err(CoreError::invalid_state(
            "Shift",
            &shift.id,
            "active",
            format!("user {} is already clocked in", request.user_id),
        ));
    }

    Ok(())
}

/// Checks a clock-out and returns the shift it closes.
pub fn check_clock_out<'a>(
    request: &ClockRequest,
    open_shift: Option<&'a Shift>,
) -> CoreResult<&'a Shift> {
    let shift = open_shift.ok_or_else(|| {
        CoreError::invalid_state(
            "User",
            &request.user_id,
            "clocked out",
            "no open clock-in to close",
        )
    })?;

    validate_not_before("timestamp", request.timestamp, "clock-in", shift.started_at)?;
    Ok(shift)
}

/// Builds a confirmed clock event from a request.
pub fn new_event(request: &ClockRequest, event_type: ClockEventType, created_at: i64) -> ClockEvent {
    ClockEvent {
        id: crate::new_id(),
        user_id: request.user_id.clone(),
        business_id: request.business_id.clone(),
        terminal_id: request.terminal_id.clone(),
        schedule_id: request.schedule_id.clone(),
        event_type,
        timestamp: request.timestamp,
        method: request.method,
        status: ClockEventStatus::default(),
        created_at,
    }
}

/// Picks the schedule a clock-in belongs to.
///
/// Among the user's non-cancelled schedules, the one whose start is closest
/// to `clock_in` wins, as long as it lies within `window_secs`.
pub fn match_schedule<'a>(
    schedules: &'a [Schedule],
    user_id: &str,
    clock_in: i64,
    window_secs: i64,
) -> Option<&'a Schedule> {
    let window_ms = window_secs * MILLIS_PER_SEC;
    schedules
        .iter()
        .filter(|s| s.user_id == user_id && s.status == ScheduleStatus::Scheduled)
        .map(|s| ((s.start_time - clock_in).abs(), s))
        .filter(|(distance, _)| *distance <= window_ms)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, s)| s)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::open_shift;

    const HOUR_MS: i64 = 3_600_000;

    fn request(ts: i64) -> ClockRequest {
        ClockRequest {
            user_id: "u-1".to_string(),
            business_id: "biz".to_string(),
            terminal_id: "till-1".to_string(),
            schedule_id: None,
            method: ClockMethod::Manual,
            timestamp: ts,
        }
    }

    fn schedule(id: &str, start: i64, status: ScheduleStatus) -> Schedule {
        Schedule {
            id: id.to_string(),
            user_id: "u-1".to_string(),
            business_id: "biz".to_string(),
            start_time: start,
            end_time: start + 8 * HOUR_MS,
            status,
        }
    }

    #[test]
    fn test_double_clock_in_rejected() {
        let event = new_event(&request(0), ClockEventType::In, 0);
        let shift = open_shift(&event, None, 0);

        assert!(check_clock_in(&request(1), None).is_ok());
        let err = check_clock_in(&request(1), Some(&shift)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
    }

    #[test]
    fn test_clock_out_requires_open_shift() {
        let err = check_clock_out(&request(0), None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
    }

    #[test]
    fn test_clock_out_before_clock_in_rejected() {
        let event = new_event(&request(HOUR_MS), ClockEventType::In, 0);
        let shift = open_shift(&event, None, 0);
        let err = check_clock_out(&request(0), Some(&shift)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_new_event_defaults_to_confirmed() {
        let event = new_event(&request(5), ClockEventType::Out, 7);
        assert_eq!(event.status, ClockEventStatus::Confirmed);
        assert_eq!(event.timestamp, 5);
        assert!(!event.is_in());
    }

    #[test]
    fn test_match_schedule_nearest_within_window() {
        let schedules = vec![
            schedule("far", 0, ScheduleStatus::Scheduled),
            schedule("near", 3 * HOUR_MS, ScheduleStatus::Scheduled),
            schedule("cancelled", 4 * HOUR_MS, ScheduleStatus::Cancelled),
        ];
        let found = match_schedule(&schedules, "u-1", 4 * HOUR_MS, 2 * 3600).unwrap();
        assert_eq!(found.id, "near");

        assert!(match_schedule(&schedules, "u-1", 12 * HOUR_MS, 2 * 3600).is_none());
        assert!(match_schedule(&schedules, "u-2", 3 * HOUR_MS, 2 * 3600).is_none());
    }
}
