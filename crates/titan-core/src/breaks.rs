//! # Break Tracker
//!
//! Starting, ending and force-closing breaks inside a shift.
//!
//! ## Break Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  scheduled ──start──► active ──end──► completed (duration, is_short)    │
//! │      │                  │                                               │
//! │      │                  └──shift closes──► completed at clock-out time  │
//! │      └──shift closes──► missed (is_missed when required)                │
//! │                                                                         │
//! │  No meal break at all after the meal threshold?                         │
//! │      └──shift closes──► synthetic missed meal break record              │
//! │                                                                         │
//! │  At most ONE active break per shift (also a partial unique index).      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::policy::BreakPolicy;
use crate::types::{Break, BreakStatus, BreakType, Shift};
use crate::{millis_to_secs, MILLIS_PER_SEC};

/// What a caller supplies to start a break.
#[derive(Debug, Clone)]
pub struct BreakRequest {
    pub break_type: BreakType,
    pub is_required: bool,
    /// Overrides the policy minimum for this break.
    pub minimum_duration_secs: Option<i64>,
}

/// Starts a break on an active shift.
///
/// ## Errors
/// - `InvalidState` if the shift is not active
/// - `Conflict` if another break of the shift is active
/// - `Validation` if the start is before the shift's clock-in
pub fn start_break(
    shift: &Shift,
    existing: &[Break],
    request: &BreakRequest,
    start_time: i64,
    policy: &BreakPolicy,
) -> CoreResult<Break> {
    if !shift.is_active() {
        return Err(CoreError::invalid_state(
            "Shift",
            &shift.id,
            shift.status.as_str(),
            "breaks can only start on an active shift",
        ));
    }

    if let Some(active) = existing.iter().find(|b| b.is_active()) {
        return Err(CoreError::conflict(
            "Break",
            format!("break {} is already active for shift {}", active.id, shift.id),
        ));
    }

    if start_time < shift.started_at {
        return Err(ValidationError::OutOfOrder {
            field: "start_time".to_string(),
            after: "clock-in".to_string(),
        }
        .into());
    }

    if let Some(minimum) = request.minimum_duration_secs {
        if minimum < 0 {
            return Err(ValidationError::OutOfRange {
                field: "minimum_duration_seconds".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }
    }

    Ok(Break {
        id: crate::new_id(),
        shift_id: shift.id.clone(),
        user_id: shift.user_id.clone(),
        break_type: request.break_type,
        start_time,
        end_time: None,
        duration_seconds: None,
        is_paid: policy.is_paid(request.break_type),
        status: BreakStatus::Active,
        is_required: request.is_required,
        minimum_duration_seconds: request
            .minimum_duration_secs
            .or_else(|| policy.minimum_for(request.break_type)),
        is_missed: false,
        is_short: false,
    })
}

/// Ends an active break.
///
/// `duration_seconds = end_time − start_time`, and `is_short` is set when a
/// minimum is configured and the break fell short of it.
pub fn end_break(brk: &Break, end_time: i64) -> CoreResult<Break> {
    if !brk.is_active() {
        return Err(CoreError::invalid_state(
            "Break",
            &brk.id,
            brk.status.as_str(),
            "only an active break can be ended",
        ));
    }

    if end_time <= brk.start_time {
        return Err(ValidationError::OutOfOrder {
            field: "end_time".to_string(),
            after: "start_time".to_string(),
        }
        .into());
    }

    Ok(complete(brk, end_time))
}

fn complete(brk: &Break, end_time: i64) -> Break {
    let duration = millis_to_secs((end_time - brk.start_time).max(0));
    Break {
        end_time: Some(end_time),
        duration_seconds: Some(duration),
        status: BreakStatus::Completed,
        is_short: brk.minimum_duration_seconds.is_some_and(|min| duration < min),
        ..brk.clone()
    }
}

/// Result of closing out a shift's breaks.
#[derive(Debug, Clone, Default)]
pub struct BreakClosure {
    /// Existing breaks whose state changed.
    pub updated: Vec<Break>,
    /// Break records created to document a required break never taken.
    pub inserted: Vec<Break>,
}

impl BreakClosure {
    /// The shift's breaks after applying this closure.
    pub fn apply(&self, breaks: &[Break]) -> Vec<Break> {
        let mut merged: Vec<Break> = breaks
            .iter()
            .map(|b| {
                self.updated
                    .iter()
                    .find(|u| u.id == b.id)
                    .cloned()
                    .unwrap_or_else(|| b.clone())
            })
            .collect();
        merged.extend(self.inserted.iter().cloned());
        merged
    }
}

/// Closes every open break of a shift at clock-out.
///
/// ## Rules
/// - `active` breaks are completed with the clock-out time as their end
///   (cancelled if they started at the clock-out instant)
/// - `scheduled` breaks that never started become `missed`
/// - if the shift ran past the meal threshold and no meal break was ever
///   recorded, a missed required meal break is inserted
pub fn force_close_open_breaks(
    shift: &Shift,
    breaks: &[Break],
    clock_out: i64,
    policy: &BreakPolicy,
) -> BreakClosure {
    let mut closure = BreakClosure::default();

    for brk in breaks {
        match brk.status {
            BreakStatus::Active if clock_out > brk.start_time => {
                closure.updated.push(complete(brk, clock_out))
            }
            // Started at the clock-out instant: nothing was taken.
            BreakStatus::Active => closure.updated.push(Break {
                status: BreakStatus::Cancelled,
                ..brk.clone()
            }),
            BreakStatus::Scheduled => closure.updated.push(Break {
                status: BreakStatus::Missed,
                is_missed: brk.is_required,
                ..brk.clone()
            }),
            _ => {}
        }
    }

    let elapsed = millis_to_secs((clock_out - shift.started_at).max(0));
    let meal_recorded = breaks
        .iter()
        .any(|b| b.break_type == BreakType::Meal && b.status != BreakStatus::Cancelled);

    if elapsed >= policy.meal_required_after_secs && !meal_recorded {
        closure.inserted.push(Break {
            id: crate::new_id(),
            shift_id: shift.id.clone(),
            user_id: shift.user_id.clone(),
            break_type: BreakType::Meal,
            start_time: shift.started_at + policy.meal_required_after_secs * MILLIS_PER_SEC,
            end_time: None,
            duration_seconds: None,
            is_paid: policy.meal_paid,
            status: BreakStatus::Missed,
            is_required: true,
            minimum_duration_seconds: Some(policy.meal_min_secs),
            is_missed: true,
            is_short: false,
        });
    }

    closure
}

// =============================================================================
// Unit Tests
// =============================================================================
