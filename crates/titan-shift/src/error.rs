//! # Service Error Type
//!
//! The one error type callers of [`crate::ShiftService`] see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Shift Service                      │
//! │                                                                         │
//! │  clock_in(request)                                                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  ShiftService operation                                          │  │
//! │  │  Result<T, ShiftError>                                           │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Rule breach? ──── CoreError::InvalidState ─────────┐           │  │
//! │  │         │                                           │           │  │
//! │  │         ▼                                           ▼           │  │
//! │  │  Lost a race? ──── DbError::UniqueViolation ──── ShiftError ───►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "INVALID_STATE",                                            │
//! │    "message": "Shift 9f1c… is active: user already has an open ..." }  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is retried. A failed compliance rule is an issue on the
//! validation record, never a `ShiftError`.

use serde::Serialize;
use thiserror::Error;
use titan_core::{CoreError, ValidationError};
use titan_db::DbError;

/// Caller-facing error.
#[derive(Debug, Error)]
pub enum ShiftError {
    /// The entity is not in a state that allows the operation.
    #[error("{0}")]
    InvalidState(String),

    /// A uniqueness invariant would be violated (or a concurrent writer won).
    #[error("{0}")]
    Conflict(String),

    /// The caller must correct the input.
    #[error("{0}")]
    Validation(String),

    /// A referenced shift, break, count, validation or issue does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The store is unavailable or failed. Details are logged, not returned.
    #[error("{0}")]
    Storage(String),

    /// Configuration could not be loaded, saved or validated.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Machine-readable error codes.
///
/// ## Usage in a Frontend
/// ```typescript
/// try {
///   await invoke('clock_in', { request });
/// } catch (e) {
///   switch (e.code) {
///     case 'INVALID_STATE':
///       showNotification('You are already clocked in');
///       break;
///     case 'VALIDATION_ERROR':
///       showForm(e.message);
///       break;
///     default:
///       showError('An error occurred');
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidState,
    Conflict,
    ValidationError,
    NotFound,
    StorageError,
    ConfigError,
}

/// What a request layer serializes for a failed call.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Shift not found: 9f1c..." }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl ShiftError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ShiftError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ShiftError::InvalidState(_) => ErrorCode::InvalidState,
            ShiftError::Conflict(_) => ErrorCode::Conflict,
            ShiftError::Validation(_) => ErrorCode::ValidationError,
            ShiftError::NotFound { .. } => ErrorCode::NotFound,
            ShiftError::Storage(_) => ErrorCode::StorageError,
            ShiftError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// Code + message, ready to serialize.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Converts core errors to service errors.
impl From<CoreError> for ShiftError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidState { .. } => ShiftError::InvalidState(err.to_string()),
            CoreError::Conflict { .. } => ShiftError::Conflict(err.to_string()),
            CoreError::NotFound { entity, id } => ShiftError::NotFound { entity, id },
            CoreError::Validation(e) => ShiftError::Validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ShiftError {
    fn from(err: ValidationError) -> Self {
        ShiftError::Validation(err.to_string())
    }
}

/// Converts database errors to service errors.
impl From<DbError> for ShiftError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ShiftError::NotFound { entity, id },
            DbError::UniqueViolation { ref constraint } => {
                let rule = err.invariant().unwrap_or("unique record");
                tracing::warn!(%constraint, rule, "Write rejected by unique index");
                ShiftError::Conflict(format!("Concurrent update broke rule: {}", rule))
            }
            DbError::Busy => {
                tracing::warn!("Shift store busy, another terminal holds the writer");
                ShiftError::Conflict("Shift store is busy, retry".to_string())
            }
            DbError::ForeignKeyViolation(message) => {
                tracing::error!("Foreign key violation: {}", message);
                ShiftError::Validation("Invalid reference".to_string())
            }
            DbError::CheckViolation(message) => {
                tracing::error!("Check constraint failed: {}", message);
                ShiftError::Validation("Record failed a storage check".to_string())
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ShiftError::Storage("Database connection failed".to_string())
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ShiftError::Storage("Database migration failed".to_string())
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ShiftError::Storage("Database operation failed".to_string())
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ShiftError::Storage("Database transaction failed".to_string())
            }
            DbError::PoolExhausted => ShiftError::Storage("Database pool exhausted".to_string()),
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ShiftError::Storage("Database operation failed".to_string())
            }
        }
    }
}

impl From<std::io::Error> for ShiftError {
    fn from(err: std::io::Error) -> Self {
        ShiftError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for ShiftError {
    fn from(err: toml::de::Error) -> Self {
        ShiftError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ShiftError {
    fn from(err: toml::ser::Error) -> Self {
        ShiftError::Config(err.to_string())
    }
}

/// Result type for service operations.
pub type ShiftResult<T> = Result<T, ShiftError>;

// =============================================================================
// Unit Tests
// =============================================================================
