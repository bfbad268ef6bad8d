//! # Validation Repository
//!
//! Persisted validation verdicts and their issues.
//!
//! ## Storage Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  shift ──1:1──► shift_validations ──1:N──► shift_validation_issues      │
//! │                  (UNIQUE shift_id)          (ordered by position)       │
//! │                                                                         │
//! │  clock-out      → delete_for_shift + insert   (new cycle, new record)   │
//! │  manual re-run  → update + replace_issues     (same record id)          │
//! │  resolution     → update / update_issue                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `position` keeps the engine's severity ranking stable on reload.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use titan_core::{ShiftValidation, ShiftValidationIssue};

const SELECT_VALIDATION: &str = r#"
    SELECT id, shift_id, valid, requires_review, violation_count,
           warning_count, critical_issue_count, unresolved_issue_count,
           validation_method, resolution, validated_at, resolved_by,
           resolved_at, resolution_notes
    FROM shift_validations
"#;

const SELECT_ISSUE: &str = r#"
    SELECT id, validation_id, issue_type, code, message, severity, category,
           resolved, resolved_by, resolved_at, resolution_notes,
           related_entity_id, related_entity_type, data_snapshot, created_at
    FROM shift_validation_issues
"#;

/// Repository for validations and issues.
pub struct ValidationRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ValidationRepository<'c> {
    /// Creates a repository over a borrowed connection or transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ValidationRepository { conn }
    }

    // =========================================================================
    // Validations
    // =========================================================================

    /// The validation of a shift, if it has been validated.
    pub async fn get_by_shift(&mut self, shift_id: &str) -> DbResult<Option<ShiftValidation>> {
        let sql = format!("{SELECT_VALIDATION} WHERE shift_id = ?1");
        let validation = sqlx::query_as::<_, ShiftValidation>(&sql)
            .bind(shift_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(validation)
    }

    /// Gets a validation by ID.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<ShiftValidation>> {
        let sql = format!("{SELECT_VALIDATION} WHERE id = ?1");
        let validation = sqlx::query_as::<_, ShiftValidation>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(validation)
    }

    /// Inserts a validation with its issues.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` if the shift already has a validation.
    pub async fn insert(
        &mut self,
        validation: &ShiftValidation,
        issues: &[ShiftValidationIssue],
    ) -> DbResult<()> {
        debug!(
            id = %validation.id,
            shift_id = %validation.shift_id,
            issues = issues.len(),
            resolution = validation.resolution.as_str(),
            "Inserting validation"
        );

        sqlx::query(
            r#"
            INSERT INTO shift_validations (
                id, shift_id, valid, requires_review, violation_count,
                warning_count, critical_issue_count, unresolved_issue_count,
                validation_method, resolution, validated_at, resolved_by,
                resolved_at, resolution_notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&validation.id)
        .bind(&validation.shift_id)
        .bind(validation.valid)
        .bind(validation.requires_review)
        .bind(validation.violation_count)
        .bind(validation.warning_count)
        .bind(validation.critical_issue_count)
        .bind(validation.unresolved_issue_count)
        .bind(validation.validation_method)
        .bind(validation.resolution)
        .bind(validation.validated_at)
        .bind(&validation.resolved_by)
        .bind(validation.resolved_at)
        .bind(&validation.resolution_notes)
        .execute(&mut *self.conn)
        .await?;

        self.insert_issues(issues).await
    }

    /// Writes every mutable column of a validation.
    pub async fn update(&mut self, validation: &ShiftValidation) -> DbResult<()> {
        debug!(
            id = %validation.id,
            resolution = validation.resolution.as_str(),
            unresolved = validation.unresolved_issue_count,
            "Updating validation"
        );

        let result = sqlx::query(
            r#"
            UPDATE shift_validations SET
                valid = ?2,
                requires_review = ?3,
                violation_count = ?4,
                warning_count = ?5,
                critical_issue_count = ?6,
                unresolved_issue_count = ?7,
                validation_method = ?8,
                resolution = ?9,
                validated_at = ?10,
                resolved_by = ?11,
                resolved_at = ?12,
                resolution_notes = ?13
            WHERE id = ?1
            "#,
        )
        .bind(&validation.id)
        .bind(validation.valid)
        .bind(validation.requires_review)
        .bind(validation.violation_count)
        .bind(validation.warning_count)
        .bind(validation.critical_issue_count)
        .bind(validation.unresolved_issue_count)
        .bind(validation.validation_method)
        .bind(validation.resolution)
        .bind(validation.validated_at)
        .bind(&validation.resolved_by)
        .bind(validation.resolved_at)
        .bind(&validation.resolution_notes)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ShiftValidation", &validation.id));
        }

        Ok(())
    }

    /// Deletes a shift's validation; its issues go with it (cascade).
    ///
    /// Returns whether a validation existed.
    pub async fn delete_for_shift(&mut self, shift_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM shift_validations WHERE shift_id = ?1")
            .bind(shift_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Issues
    // =========================================================================

    /// Replaces the issue set of a validation, keeping the given order.
    pub async fn replace_issues(
        &mut self,
        validation_id: &str,
        issues: &[ShiftValidationIssue],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM shift_validation_issues WHERE validation_id = ?1")
            .bind(validation_id)
            .execute(&mut *self.conn)
            .await?;

        self.insert_issues(issues).await
    }

    async fn insert_issues(&mut self, issues: &[ShiftValidationIssue]) -> DbResult<()> {
        for (position, issue) in issues.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO shift_validation_issues (
                    id, validation_id, position, issue_type, code, message,
                    severity, category, resolved, resolved_by, resolved_at,
                    resolution_notes, related_entity_id, related_entity_type,
                    data_snapshot, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                "#,
            )
            .bind(&issue.id)
            .bind(&issue.validation_id)
            .bind(position as i64)
            .bind(issue.issue_type)
            .bind(issue.code)
            .bind(&issue.message)
            .bind(issue.severity)
            .bind(issue.category)
            .bind(issue.resolved)
            .bind(&issue.resolved_by)
            .bind(issue.resolved_at)
            .bind(&issue.resolution_notes)
            .bind(&issue.related_entity_id)
            .bind(&issue.related_entity_type)
            .bind(&issue.data_snapshot)
            .bind(issue.created_at)
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(())
    }

    /// Issues of a validation in ranked order (most severe first).
    pub async fn list_issues(&mut self, validation_id: &str) -> DbResult<Vec<ShiftValidationIssue>> {
        let sql = format!("{SELECT_ISSUE} WHERE validation_id = ?1 ORDER BY position ASC");
        let issues = sqlx::query_as::<_, ShiftValidationIssue>(&sql)
            .bind(validation_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(issues)
    }

    /// Gets an issue by ID.
    pub async fn get_issue(&mut self, id: &str) -> DbResult<Option<ShiftValidationIssue>> {
        let sql = format!("{SELECT_ISSUE} WHERE id = ?1");
        let issue = sqlx::query_as::<_, ShiftValidationIssue>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(issue)
    }

    /// Writes the resolution columns of an issue.
    pub async fn update_issue(&mut self, issue: &ShiftValidationIssue) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE shift_validation_issues SET
                resolved = ?2,
                resolved_by = ?3,
                resolved_at = ?4,
                resolution_notes = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&issue.id)
        .bind(issue.resolved)
        .bind(&issue.resolved_by)
        .bind(issue.resolved_at)
        .bind(&issue.resolution_notes)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ShiftValidationIssue", &issue.id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
