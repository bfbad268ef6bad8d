//! # Issue Resolution
//!
//! Turning an engine outcome into a validation record, resolving single
//! issues, and moving a validation through its review states.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   pending ───────────────► needs_review                                 │
//! │      │                         │                                        │
//! │      ├──► approved ◄───────────┤   approve: unresolved_issue_count == 0 │
//! │      │                         │                                        │
//! │      └──► rejected ◄───────────┘   reject: notes required               │
//! │                                                                         │
//! │   approved / rejected are terminal. A new clock-out cycle replaces the  │
//! │   record instead of reopening it.                                       │
//! │                                                                         │
//! │   Resolving the last issue does NOT approve: approval is explicit.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::engine::ValidationOutcome;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::issue::{Resolution, ShiftValidation, ShiftValidationIssue, ValidationMethod};
use crate::types::ShiftStatus;
use crate::validation::{normalize_notes, require_notes};

/// Builds the validation record and its issues for an engine outcome.
///
/// The record starts as `needs_review` when the outcome asks for review,
/// `pending` otherwise. It is never approved here.
pub fn build_validation(
    shift_id: &str,
    outcome: ValidationOutcome,
    method: ValidationMethod,
    validated_at: i64,
) -> (ShiftValidation, Vec<ShiftValidationIssue>) {
    let validation = ShiftValidation {
        id: crate::new_id(),
        shift_id: shift_id.to_string(),
        valid: outcome.valid,
        requires_review: outcome.requires_review,
        violation_count: outcome.violation_count,
        warning_count: outcome.warning_count,
        critical_issue_count: outcome.critical_issue_count,
        unresolved_issue_count: outcome.issues.len() as i64,
        validation_method: method,
        resolution: if outcome.requires_review {
            Resolution::NeedsReview
        } else {
            Resolution::Pending
        },
        validated_at,
        resolved_by: None,
        resolved_at: None,
        resolution_notes: None,
    };

    let issues = outcome
        .issues
        .into_iter()
        .map(|draft| ShiftValidationIssue::from_draft(draft, &validation.id, validated_at))
        .collect();

    (validation, issues)
}

/// Re-bases a freshly built verdict onto the undecided record it replaces.
///
/// The record keeps its id and notes, and its resolution only moves
/// forward: once `needs_review`, it stays there until a manager decides.
/// A new issue that matches an earlier resolved one (same code, same
/// related entity) inherits that resolution; each earlier issue is matched
/// at most once. Issues that no longer fire simply drop out.
pub fn carry_forward(
    previous: &ShiftValidation,
    previous_issues: &[ShiftValidationIssue],
    rebuilt: ShiftValidation,
    issues: Vec<ShiftValidationIssue>,
) -> (ShiftValidation, Vec<ShiftValidationIssue>) {
    let mut claimed = vec![false; previous_issues.len()];

    let issues: Vec<ShiftValidationIssue> = issues
        .into_iter()
        .map(|mut issue| {
            issue.validation_id = previous.id.clone();

            let earlier = previous_issues.iter().enumerate().find(|(i, old)| {
                !claimed[*i]
                    && old.resolved
                    && old.code == issue.code
                    && old.related_entity_id == issue.related_entity_id
            });
            if let Some((i, old)) = earlier {
                claimed[i] = true;
                issue.resolved = true;
                issue.resolved_by = old.resolved_by.clone();
                issue.resolved_at = old.resolved_at;
                issue.resolution_notes = old.resolution_notes.clone();
            }
            issue
        })
        .collect();

    let resolution = match (previous.resolution, rebuilt.resolution) {
        (Resolution::NeedsReview, _) => Resolution::NeedsReview,
        (_, fresh) => fresh,
    };

    let validation = ShiftValidation {
        id: previous.id.clone(),
        unresolved_issue_count: issues.iter().filter(|i| !i.resolved).count() as i64,
        resolution,
        resolution_notes: previous.resolution_notes.clone(),
        ..rebuilt
    };

    (validation, issues)
}

/// Rejects a manual re-run on a validation that is already decided.
pub fn check_rerun(existing: Option<&ShiftValidation>) -> CoreResult<()> {
    match existing {
        Some(v) if v.resolution.is_terminal() => Err(CoreError::invalid_state(
            "ShiftValidation",
            &v.id,
            v.resolution.as_str(),
            "a decided validation cannot be re-run",
        )),
        _ => Ok(()),
    }
}

/// Marks one issue resolved and decrements its validation's unresolved count.
pub fn resolve_issue(
    issue: &ShiftValidationIssue,
    validation: &ShiftValidation,
    resolved_by: &str,
    notes: Option<&str>,
    now: i64,
) -> CoreResult<(ShiftValidationIssue, ShiftValidation)> {
    if issue.validation_id != validation.id {
        return Err(CoreError::invalid_state(
            "ShiftValidationIssue",
            &issue.id,
            "detached",
            "issue does not belong to this validation",
        ));
    }

    if issue.resolved {
        return Err(CoreError::invalid_state(
            "ShiftValidationIssue",
            &issue.id,
            "resolved",
            "issue is already resolved",
        ));
    }

    if validation.resolution.is_terminal() {
        return Err(CoreError::invalid_state(
            "ShiftValidation",
            &validation.id,
            validation.resolution.as_str(),
            "issues of a decided validation cannot be resolved",
        ));
    }

    if resolved_by.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "resolved_by".to_string(),
        }
        .into());
    }

    let resolved = ShiftValidationIssue {
        resolved: true,
        resolved_by: Some(resolved_by.to_string()),
        resolved_at: Some(now),
        resolution_notes: normalize_notes(notes)?,
        ..issue.clone()
    };

    let parent = ShiftValidation {
        unresolved_issue_count: (validation.unresolved_issue_count - 1).max(0),
        ..validation.clone()
    };

    Ok((resolved, parent))
}

/// Whether the review state machine allows `from → to`.
pub const fn can_transition(from: Resolution, to: Resolution) -> bool {
    matches!(
        (from, to),
        (Resolution::Pending, Resolution::NeedsReview)
            | (Resolution::Pending, Resolution::Approved)
            | (Resolution::Pending, Resolution::Rejected)
            | (Resolution::NeedsReview, Resolution::Approved)
            | (Resolution::NeedsReview, Resolution::Rejected)
    )
}

/// Moves a validation to a new resolution.
///
/// ## Errors
/// - `InvalidState` for a transition the state machine does not allow, or
///   an approval while issues are unresolved
/// - `Validation` for a rejection without notes
pub fn resolve_validation(
    validation: &ShiftValidation,
    resolved_by: &str,
    target: Resolution,
    notes: Option<&str>,
    now: i64,
) -> CoreResult<ShiftValidation> {
    if !can_transition(validation.resolution, target) {
        return Err(CoreError::invalid_state(
            "ShiftValidation",
            &validation.id,
            validation.resolution.as_str(),
            format!("cannot move to {}", target.as_str()),
        ));
    }

    if target == Resolution::Approved && validation.unresolved_issue_count > 0 {
        return Err(CoreError::invalid_state(
            "ShiftValidation",
            &validation.id,
            validation.resolution.as_str(),
            format!(
                "{} issue(s) are still unresolved",
                validation.unresolved_issue_count
            ),
        ));
    }

    let notes = match target {
        Resolution::Rejected => Some(require_notes("resolution_notes", notes)?),
        _ => normalize_notes(notes)?,
    };

    if resolved_by.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "resolved_by".to_string(),
        }
        .into());
    }

    let decided = target.is_terminal();
    Ok(ShiftValidation {
        resolution: target,
        resolved_by: decided.then(|| resolved_by.to_string()),
        resolved_at: decided.then_some(now),
        resolution_notes: notes.or_else(|| validation.resolution_notes.clone()),
        ..validation.clone()
    })
}

/// Shift status that follows a validation decision.
///
/// An approved shift leaves `pending_review`; any other outcome keeps the
/// current status.
pub fn shift_status_after(resolution: Resolution, current: ShiftStatus) -> ShiftStatus {
    match (resolution, current) {
        (Resolution::Approved, ShiftStatus::PendingReview) => ShiftStatus::Ended,
        _ => current,
    }
}

/// Shift status right after clock-out validation.
pub fn shift_status_at_close(requires_review: bool) -> ShiftStatus {
    if requires_review {
        ShiftStatus::PendingReview
    } else {
        ShiftStatus::Ended
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
