//! # Staff Repository
//!
//! Read access to staff records: role, shift-requirement override and the
//! PIN hash used for manager approvals. Staff are owned by the user
//! directory; `insert` exists for seeding and tests.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use titan_core::Staff;

/// Repository for staff lookups.
pub struct StaffRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> StaffRepository<'c> {
    /// Creates a repository over a borrowed connection or transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        StaffRepository { conn }
    }

    /// Inserts or replaces a staff member.
    pub async fn upsert(&mut self, staff: &Staff) -> DbResult<()> {
        debug!(id = %staff.id, role = staff.role.as_str(), "Upserting staff");

        sqlx::query(
            r#"
            INSERT INTO staff (id, business_id, display_name, role, shift_required_override, pin_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                business_id = excluded.business_id,
                display_name = excluded.display_name,
                role = excluded.role,
                shift_required_override = excluded.shift_required_override,
                pin_hash = excluded.pin_hash
            "#,
        )
        .bind(&staff.id)
        .bind(&staff.business_id)
        .bind(&staff.display_name)
        .bind(staff.role)
        .bind(staff.shift_required_override)
        .bind(&staff.pin_hash)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets a staff member by ID.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Staff>> {
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            SELECT id, business_id, display_name, role, shift_required_override, pin_hash
            FROM staff
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(staff)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::db;
    use titan_core::StaffRole;

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = db().await;
        let mut conn = db.acquire().await.unwrap();
        let mut repo = StaffRepository::new(&mut conn);

        let mut staff = Staff {
            id: "m-1".to_string(),
            business_id: "biz-1".to_string(),
            display_name: "Mia".to_string(),
            role: StaffRole::Manager,
            shift_required_override: None,
            pin_hash: Some("$argon2id$stub".to_string()),
        };
        repo.upsert(&staff).await.unwrap();

        staff.shift_required_override = Some(false);
        repo.upsert(&staff).await.unwrap();

        let loaded = repo.get_by_id("m-1").await.unwrap().unwrap();
        assert_eq!(loaded, staff);
        assert!(repo.get_by_id("nobody").await.unwrap().is_none());
    }
}
