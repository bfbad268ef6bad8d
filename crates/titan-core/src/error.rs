//! # Error Types
//!
//! Domain-specific error types for titan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  titan-core errors (this file)                                         │
//! │  ├── CoreError        - Lifecycle invariant breaches                   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  titan-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  titan-shift errors                                                    │
//! │  └── ShiftError       - What callers see (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ShiftError ← DbError              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT an Error
//! A triggered compliance rule (late clock-in, cash variance, ...) is a
//! [`crate::issue::IssueDraft`], never a `CoreError`. The rule engine always
//! returns a result.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Lifecycle errors raised when an operation would break an invariant.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The entity is not in a state that allows the operation.
    ///
    /// ## When This Occurs
    /// - Clock-in while the user already has an open clock-in
    /// - Clock-out without an open clock-in
    /// - Ending a break that is not active
    /// - Approving a validation that still has unresolved issues
    #[error("{entity} {id} is {state}: {reason}")]
    InvalidState {
        entity: String,
        id: String,
        state: String,
        reason: String,
    },

    /// A uniqueness invariant would be violated.
    ///
    /// ## When This Occurs
    /// - Starting a break while another break of the shift is active
    /// - Recording a second end-shift count for a shift
    #[error("Conflict on {entity}: {reason}")]
    Conflict { entity: String, reason: String },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        state: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            state: state.into(),
            reason: reason.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::Conflict {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// The caller must correct the input; these are never retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// A timestamp is earlier than the one it must follow.
    #[error("{field} must not be earlier than {after}")]
    OutOfOrder { field: String, after: String },

    /// Credentials did not verify.
    #[error("{field} is incorrect")]
    BadCredential { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
