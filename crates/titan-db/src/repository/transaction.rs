//! # Transaction Repository
//!
//! Read model of the sales transactions rung up during a shift. Sales are
//! owned by the checkout flow; this subsystem only sums and inspects them.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use titan_core::SalesTransaction;

const SELECT_TRANSACTION: &str = r#"
    SELECT id, shift_id, transaction_type, payment_method, total_cents,
           cash_amount_cents, void_reason, manager_approval_id,
           is_partial_refund, original_transaction_id, created_at
    FROM sales_transactions
"#;

/// Repository for sales transactions.
pub struct TransactionRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> TransactionRepository<'c> {
    /// Creates a repository over a borrowed connection or transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        TransactionRepository { conn }
    }

    /// Records a transaction against a shift.
    pub async fn insert(&mut self, txn: &SalesTransaction) -> DbResult<()> {
        debug!(
            id = %txn.id,
            shift_id = %txn.shift_id,
            transaction_type = ?txn.transaction_type,
            total_cents = txn.total_cents,
            "Recording transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO sales_transactions (
                id, shift_id, transaction_type, payment_method, total_cents,
                cash_amount_cents, void_reason, manager_approval_id,
                is_partial_refund, original_transaction_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&txn.id)
        .bind(&txn.shift_id)
        .bind(txn.transaction_type)
        .bind(txn.payment_method)
        .bind(txn.total_cents)
        .bind(txn.cash_amount_cents)
        .bind(&txn.void_reason)
        .bind(&txn.manager_approval_id)
        .bind(txn.is_partial_refund)
        .bind(&txn.original_transaction_id)
        .bind(txn.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets a transaction by ID, whatever shift it belongs to.
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<SalesTransaction>> {
        let sql = format!("{SELECT_TRANSACTION} WHERE id = ?1");
        let txn = sqlx::query_as::<_, SalesTransaction>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(txn)
    }

    /// All transactions of a shift in the order they happened.
    pub async fn list_for_shift(&mut self, shift_id: &str) -> DbResult<Vec<SalesTransaction>> {
        let sql = format!("{SELECT_TRANSACTION} WHERE shift_id = ?1 ORDER BY created_at ASC, id ASC");
        let txns = sqlx::query_as::<_, SalesTransaction>(&sql)
            .bind(shift_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(txns)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
