//! # Shift Policy
//!
//! Every threshold the lifecycle rules and the rule engine read, in one
//! place. Loaded from the `[policy]` table of `shift.toml`; any field left
//! out keeps its default.
//!
//! ## Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  *_secs   → whole seconds        standard_shift_secs = 28800 (8h)       │
//! │  *_cents  → integer cents        cash_discrepancy_threshold_cents = 500 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use titan_core::policy::ShiftPolicy;
//!
//! let policy: ShiftPolicy = toml::from_str("standard_shift_secs = 36000").unwrap();
//! assert_eq!(policy.standard_shift_secs, 36_000);
//! assert_eq!(policy.cash_discrepancy_threshold_cents, 500);
//! assert!(policy.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::{BreakType, StaffRole};
use crate::SECS_PER_HOUR;

// =============================================================================
// Break Policy
// =============================================================================

/// Break bounds per break type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct BreakPolicy {
    /// A meal break is required once this much time has been worked.
    pub meal_required_after_secs: i64,
    pub meal_min_secs: i64,
    pub meal_max_secs: i64,
    pub meal_paid: bool,
    pub rest_min_secs: i64,
    pub rest_max_secs: i64,
    pub rest_paid: bool,
    /// Upper bound for `other` breaks; they have no minimum.
    pub other_max_secs: i64,
}

impl Default for BreakPolicy {
    fn default() -> Self {
        BreakPolicy {
            meal_required_after_secs: 6 * SECS_PER_HOUR,
            meal_min_secs: 30 * 60,
            meal_max_secs: 60 * 60,
            meal_paid: false,
            rest_min_secs: 10 * 60,
            rest_max_secs: 20 * 60,
            rest_paid: true,
            other_max_secs: 60 * 60,
        }
    }
}

impl BreakPolicy {
    /// Configured minimum duration for a break type.
    pub fn minimum_for(&self, break_type: BreakType) -> Option<i64> {
        match break_type {
            BreakType::Meal => Some(self.meal_min_secs),
            BreakType::Rest => Some(self.rest_min_secs),
            BreakType::Other => None,
        }
    }

    /// Configured maximum duration for a break type.
    pub fn maximum_for(&self, break_type: BreakType) -> i64 {
        match break_type {
            BreakType::Meal => self.meal_max_secs,
            BreakType::Rest => self.rest_max_secs,
            BreakType::Other => self.other_max_secs,
        }
    }

    /// Whether a break type is paid time.
    pub fn is_paid(&self, break_type: BreakType) -> bool {
        match break_type {
            BreakType::Meal => self.meal_paid,
            BreakType::Rest => self.rest_paid,
            BreakType::Other => false,
        }
    }
}

// =============================================================================
// Shift Policy
// =============================================================================

/// Thresholds for shift timing, cash handling and compliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct ShiftPolicy {
    /// Worked time beyond this is overtime.
    pub standard_shift_secs: i64,
    /// Clock-in this long after the scheduled start is still on time.
    pub clock_in_grace_secs: i64,
    /// Lateness beyond the grace period above which LATE_CLOCK_IN is medium.
    pub late_medium_after_secs: i64,
    /// Clock-out this long before the scheduled end is still on time.
    pub early_clock_out_grace_secs: i64,
    /// An active shift older than this is a missed clock-out.
    pub stale_shift_secs: i64,
    /// Count variance above this needs notes and manager approval.
    pub cash_discrepancy_threshold_cents: i64,
    /// Count variance above this makes CASH_VARIANCE_HIGH critical.
    pub cash_variance_critical_cents: i64,
    /// Refunds above this need a manager approval id.
    pub refund_approval_limit_cents: i64,
    pub max_voids_per_shift: i64,
    /// Overtime in one shift above this raises EXCESSIVE_OVERTIME.
    pub daily_overtime_cap_secs: i64,
    /// Worked time in one ISO week above this raises EXCESSIVE_OVERTIME.
    pub weekly_hours_cap_secs: i64,
    /// Clock-in within this distance of a scheduled start links the schedule.
    pub schedule_match_window_secs: i64,
    /// Whether a user with no role on file must hold a shift to sell.
    pub shift_required_default: bool,
    pub breaks: BreakPolicy,
}

impl Default for ShiftPolicy {
    fn default() -> Self {
        ShiftPolicy {
            standard_shift_secs: 8 * SECS_PER_HOUR,
            clock_in_grace_secs: 5 * 60,
            late_medium_after_secs: 15 * 60,
            early_clock_out_grace_secs: 5 * 60,
            stale_shift_secs: 16 * SECS_PER_HOUR,
            cash_discrepancy_threshold_cents: 500,
            cash_variance_critical_cents: 5_000,
            refund_approval_limit_cents: 5_000,
            max_voids_per_shift: 5,
            daily_overtime_cap_secs: 4 * SECS_PER_HOUR,
            weekly_hours_cap_secs: 48 * SECS_PER_HOUR,
            schedule_match_window_secs: 2 * SECS_PER_HOUR,
            shift_required_default: true,
            breaks: BreakPolicy::default(),
        }
    }
}

impl ShiftPolicy {
    /// Rejects values that would make the rules meaningless.
    pub fn validate(&self) -> Result<(), ValidationError> {
        positive("standard_shift_secs", self.standard_shift_secs)?;
        positive("stale_shift_secs", self.stale_shift_secs)?;
        positive("max_voids_per_shift", self.max_voids_per_shift)?;
        positive("weekly_hours_cap_secs", self.weekly_hours_cap_secs)?;

        non_negative("clock_in_grace_secs", self.clock_in_grace_secs)?;
        non_negative("late_medium_after_secs", self.late_medium_after_secs)?;
        non_negative("early_clock_out_grace_secs", self.early_clock_out_grace_secs)?;
        non_negative("cash_discrepancy_threshold_cents", self.cash_discrepancy_threshold_cents)?;
        non_negative("refund_approval_limit_cents", self.refund_approval_limit_cents)?;
        non_negative("daily_overtime_cap_secs", self.daily_overtime_cap_secs)?;
        non_negative("schedule_match_window_secs", self.schedule_match_window_secs)?;

        if self.cash_variance_critical_cents < self.cash_discrepancy_threshold_cents {
            return Err(ValidationError::OutOfRange {
                field: "cash_variance_critical_cents".to_string(),
                min: self.cash_discrepancy_threshold_cents,
                max: i64::MAX,
            });
        }

        let b = &self.breaks;
        positive("breaks.meal_required_after_secs", b.meal_required_after_secs)?;
        bounds("breaks.meal", b.meal_min_secs, b.meal_max_secs)?;
        bounds("breaks.rest", b.rest_min_secs, b.rest_max_secs)?;
        positive("breaks.other_max_secs", b.other_max_secs)?;

        Ok(())
    }
}

fn positive(field: &str, value: i64) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn non_negative(field: &str, value: i64) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

fn bounds(prefix: &str, min: i64, max: i64) -> Result<(), ValidationError> {
    non_negative(&format!("{prefix}_min_secs"), min)?;
    if max <= 0 || max < min {
        return Err(ValidationError::OutOfRange {
            field: format!("{prefix}_max_secs"),
            min: min.max(1),
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Shift Requirement Resolution
// =============================================================================

/// Which precedence level decided a shift requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RequirementSource {
    UserOverride,
    RoleDefault,
    SystemDefault,
}

/// Whether a user must be clocked in to ring up sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftRequirement {
    pub required: bool,
    pub source: RequirementSource,
}

/// Default requirement for a role.
///
/// Owners and managers may sell without a shift; cashiers and staff may not.
pub const fn role_requires_shift(role: StaffRole) -> bool {
    match role {
        StaffRole::Owner | StaffRole::Manager => false,
        StaffRole::Cashier | StaffRole::Staff => true,
    }
}

/// Resolves the shift requirement.
///
/// ## Precedence
/// ```text
/// user override ──(None)──► role default ──(no role)──► system default
/// ```
///
/// ## Example
/// ```rust
/// use titan_core::policy::{resolve_shift_requirement, RequirementSource};
/// use titan_core::StaffRole;
///
/// let r = resolve_shift_requirement(Some(false), Some(StaffRole::Cashier), true);
/// assert!(!r.required);
/// assert_eq!(r.source, RequirementSource::UserOverride);
///
/// let r = resolve_shift_requirement(None, Some(StaffRole::Manager), true);
/// assert!(!r.required);
/// assert_eq!(r.source, RequirementSource::RoleDefault);
/// ```
pub fn resolve_shift_requirement(
    user_override: Option<bool>,
    role: Option<StaffRole>,
    system_default: bool,
) -> ShiftRequirement {
    if let Some(required) = user_override {
        return ShiftRequirement {
            required,
            source: RequirementSource::UserOverride,
        };
    }

    if let Some(role) = role {
        return ShiftRequirement {
            required: role_requires_shift(role),
            source: RequirementSource::RoleDefault,
        };
    }

    ShiftRequirement {
        required: system_default,
        source: RequirementSource::SystemDefault,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
