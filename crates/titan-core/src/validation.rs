//! # Validation Module
//!
//! Input validation for shift operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request records (titan-shift)                                 │
//! │  ├── Type validation (deserialization)                                  │
//! │  └── THIS MODULE: field rules (ids, notes, amounts, PINs)               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Lifecycle rules (ledger, breaks, cash)                        │
//! │  └── State checks: open clock-in, active break, end-shift count         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── UNIQUE constraints (one active shift, one end-shift count)         │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Input problems are [`ValidationError`]s. A compliance rule that fires is
//! never reported through this module.

use crate::error::ValidationError;
use crate::MAX_NOTES_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an entity id (UUID string).
///
/// ## Example
/// ```rust
/// use titan_core::validation::validate_id;
///
/// assert!(validate_id("shift_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_id("shift_id", "not-a-uuid").is_err());
/// assert!(validate_id("shift_id", "  ").is_err());
/// ```
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates a free-text reference that is not generated by this system
/// (terminal ids, business ids).
pub fn validate_reference(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.len() > 100 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 100,
        });
    }
    Ok(())
}

/// Normalizes optional notes.
///
/// ## Returns
/// The trimmed notes, or `None` when absent or blank.
///
/// ## Example
/// ```rust
/// use titan_core::validation::normalize_notes;
///
/// assert_eq!(normalize_notes(Some("  short by $30  ")).unwrap(), Some("short by $30".to_string()));
/// assert_eq!(normalize_notes(Some("   ")).unwrap(), None);
/// assert_eq!(normalize_notes(None).unwrap(), None);
/// ```
pub fn normalize_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(Some(notes.to_string()))
}

/// Like [`normalize_notes`], but blank notes are an error.
pub fn require_notes(field: &str, notes: Option<&str>) -> ValidationResult<String> {
    normalize_notes(notes)?.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })
}

/// Validates a manager PIN before it is checked against the stored hash.
///
/// ## Rules
/// - 4 to 8 ASCII digits
pub fn validate_pin(pin: &str) -> ValidationResult<()> {
    if pin.is_empty() {
        return Err(ValidationError::Required {
            field: "pin".to_string(),
        });
    }
    if !(4..=8).contains(&pin.len()) || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "pin".to_string(),
            reason: "must be 4 to 8 digits".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a counted or float amount in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0); an empty drawer is a valid count
///
/// ## Example
/// ```rust
/// use titan_core::validation::validate_cash_cents;
///
/// assert!(validate_cash_cents("counted_amount", 30_000).is_ok());
/// assert!(validate_cash_cents("counted_amount", 0).is_ok());
/// assert!(validate_cash_cents("counted_amount", -1).is_err());
/// ```
pub fn validate_cash_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates that a timestamp (epoch ms) is not before another one.
pub fn validate_not_before(
    field: &str,
    value: i64,
    after_field: &str,
    after: i64,
) -> ValidationResult<()> {
    if value < after {
        return Err(ValidationError::OutOfOrder {
            field: field.to_string(),
            after: after_field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_id("id", "").is_err());
        assert!(validate_id("id", "123").is_err());
    }

    #[test]
    fn test_validate_reference() {
        assert!(validate_reference("terminal_id", "till-1").is_ok());
        assert!(validate_reference("terminal_id", " ").is_err());
        assert!(validate_reference("terminal_id", &"x".repeat(101)).is_err());
    }

    #[test]
    fn test_notes() {
        assert!(normalize_notes(Some(&"n".repeat(MAX_NOTES_LEN + 1))).is_err());
        assert!(require_notes("notes", Some("  ")).is_err());
        assert_eq!(require_notes("notes", Some(" ok ")).unwrap(), "ok");
    }

    #[test]
    fn test_validate_pin() {
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("12345678").is_ok());
        assert!(validate_pin("").is_err());
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("12a4").is_err());
    }

    #[test]
    fn test_validate_not_before() {
        assert!(validate_not_before("end_time", 10, "start_time", 10).is_ok());
        assert!(matches!(
            validate_not_before("end_time", 9, "start_time", 10),
            Err(ValidationError::OutOfOrder { .. })
        ));
    }
}
