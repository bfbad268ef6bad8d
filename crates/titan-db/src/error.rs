//! # Shift Store Errors
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error                                                            │
//! │       │                                                                 │
//! │       ├── UNIQUE failed ──► UniqueViolation { constraint }              │
//! │       │                     constraint → invariant() names the rule     │
//! │       │                     ("one active shift per user", ...)          │
//! │       ├── FOREIGN KEY ────► ForeignKeyViolation                         │
//! │       ├── CHECK ──────────► CheckViolation                              │
//! │       ├── database locked ► Busy  (another terminal held the writer)    │
//! │       └── anything else ──► QueryFailed / Internal                      │
//! │                                                                         │
//! │  titan-shift turns UniqueViolation and Busy into ShiftError::Conflict.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

/// UNIQUE constraints and the shift invariant each one enforces.
const INVARIANTS: &[(&str, &str)] = &[
    ("shifts.user_id", "one active shift per user"),
    ("shifts.clock_in_id", "one shift per clock-in event"),
    ("shifts.clock_out_id", "one shift per clock-out event"),
    ("breaks.shift_id", "one active break per shift"),
    ("cash_drawer_counts.shift_id", "one end-shift count per shift"),
    ("shift_validations.shift_id", "one validation per shift"),
];

/// Shift store errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row with that id, or an update touched zero rows.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write; usually a lost race between
    /// terminals.
    #[error("Unique constraint {constraint} violated")]
    UniqueViolation { constraint: String },

    /// A row referenced a shift, event or validation that does not exist.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A CHECK constraint rejected the row (e.g. a break ending before it
    /// started, a variance that does not add up).
    #[error("Check constraint failed: {0}")]
    CheckViolation(String),

    /// Another writer held the database past the busy timeout.
    #[error("Database is busy")]
    Busy,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Every pooled connection stayed checked out past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn unique(constraint: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    /// The shift rule a UNIQUE violation protects, when it is one we know.
    pub fn invariant(&self) -> Option<&'static str> {
        match self {
            DbError::UniqueViolation { constraint } => INVARIANTS
                .iter()
                .find(|(name, _)| constraint.contains(name))
                .map(|(_, rule)| *rule),
            _ => None,
        }
    }

    /// Lost races: retrying after re-reading state may succeed.
    pub fn is_contention(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. } | DbError::Busy)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                match db_err.kind() {
                    // "UNIQUE constraint failed: shifts.user_id"
                    ErrorKind::UniqueViolation => DbError::unique(
                        msg.split("failed: ").nth(1).unwrap_or("unknown"),
                    ),
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(msg),
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::CheckViolation(msg)
                    }
                    _ if msg.contains("database is locked") => DbError::Busy,
                    _ => DbError::QueryFailed(msg),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for shift store operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_names() {
        let err = DbError::unique("shifts.user_id");
        assert_eq!(err.invariant(), Some("one active shift per user"));
        assert!(err.is_contention());

        let err = DbError::unique("cash_drawer_counts.shift_id");
        assert_eq!(err.invariant(), Some("one end-shift count per shift"));

        assert_eq!(DbError::unique("staff.id").invariant(), None);
        assert_eq!(DbError::Busy.invariant(), None);
        assert!(DbError::Busy.is_contention());
        assert!(!DbError::PoolExhausted.is_contention());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(DbError::not_found("Shift", "s-1").to_string(), "Shift not found: s-1");
    }
}
