//! Cash drawer reconciliation.

use tracing::{info, warn};

use titan_core::cash::{approve_count, expected_cash, record_count, CountRequest};
use titan_core::validation::validate_pin;
use titan_core::{Money, SalesTransaction, TransactionType, ValidationError};
use titan_db::{CashCountRepository, ShiftRepository, StaffRepository, TransactionRepository};

use super::{commit, ShiftService};
use crate::credentials::verify_pin;
use crate::dto::{ApproveCountRequest, CashCountDto, CreateCountRequest, ExpectedCashDto};
use crate::error::{ShiftError, ShiftResult};

fn cash_total(transactions: &[SalesTransaction], kind: TransactionType) -> Money {
    transactions
        .iter()
        .filter(|t| t.transaction_type == kind)
        .map(SalesTransaction::cash_portion)
        .fold(Money::zero(), |sum, cash| sum + cash)
}

impl ShiftService {
    /// Expected drawer cash right now.
    ///
    /// ```text
    /// expected = starting cash + cash sales − cash refunds
    /// ```
    pub async fn get_expected_cash(&self, shift_id: &str) -> ShiftResult<ExpectedCashDto> {
        let mut conn = self.db.acquire().await?;

        let shift = ShiftRepository::new(&mut conn)
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("Shift", shift_id))?;
        let transactions = TransactionRepository::new(&mut conn)
            .list_for_shift(shift_id)
            .await?;

        Ok(ExpectedCashDto {
            shift_id: shift.id.clone(),
            starting_cash: shift.starting_cash().to_decimal(),
            cash_sales: cash_total(&transactions, TransactionType::Sale).to_decimal(),
            cash_refunds: cash_total(&transactions, TransactionType::Refund).to_decimal(),
            expected_cash: expected_cash(shift.starting_cash(), &transactions).to_decimal(),
        })
    }

    /// Records a drawer count.
    ///
    /// ## Errors
    /// - `Conflict` for a second end-shift count
    /// - `Validation` when the variance exceeds the threshold and no notes
    ///   were given
    /// - `InvalidState` for a mid-shift count on a closed shift
    pub async fn create_count(&self, request: CreateCountRequest) -> ShiftResult<CashCountDto> {
        let timestamp = request.timestamp.unwrap_or_else(|| self.now());

        let mut tx = self.db.begin().await?;

        let shift = ShiftRepository::new(&mut tx)
            .get_by_id(&request.shift_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("Shift", &request.shift_id))?;
        let existing = CashCountRepository::new(&mut tx)
            .list_for_shift(&shift.id)
            .await?;
        let transactions = TransactionRepository::new(&mut tx)
            .list_for_shift(&shift.id)
            .await?;

        let count = record_count(
            &shift,
            &existing,
            &CountRequest {
                count_type: request.count_type,
                counted: Money::from_decimal(request.counted_amount),
                counted_by: request.counted_by,
                notes: request.notes,
            },
            expected_cash(shift.starting_cash(), &transactions),
            self.policy.cash_discrepancy_threshold_cents,
            timestamp,
        )
        .inspect_err(|e| warn!(shift_id = %shift.id, error = %e, "Cash count rejected"))?;

        CashCountRepository::new(&mut tx).insert(&count).await?;
        commit(tx).await?;

        if count.requires_approval {
            warn!(
                count_id = %count.id,
                shift_id = %count.shift_id,
                variance_cents = count.variance_cents,
                "Cash variance above threshold, manager approval required"
            );
        } else {
            info!(
                count_id = %count.id,
                shift_id = %count.shift_id,
                variance_cents = count.variance_cents,
                "Cash counted"
            );
        }
        Ok(CashCountDto::from(&count))
    }

    /// Manager sign-off on a count above the discrepancy threshold.
    ///
    /// ## Errors
    /// - `Validation` for a malformed or wrong PIN
    /// - `InvalidState` if the approver is not a manager/owner, the count
    ///   is within threshold, or it is already approved
    pub async fn approve_cash_count(&self, request: ApproveCountRequest) -> ShiftResult<CashCountDto> {
        validate_pin(&request.pin)?;
        let now = self.now();

        let mut tx = self.db.begin().await?;

        let count = CashCountRepository::new(&mut tx)
            .get_by_id(&request.count_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("CashDrawerCount", &request.count_id))?;
        let manager = StaffRepository::new(&mut tx)
            .get_by_id(&request.manager_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("Staff", &request.manager_id))?;

        let verified = manager
            .pin_hash
            .as_deref()
            .is_some_and(|hash| verify_pin(hash, &request.pin));
        if !verified {
            warn!(manager_id = %manager.id, count_id = %count.id, "Manager PIN rejected");
            return Err(ValidationError::BadCredential {
                field: "pin".to_string(),
            }
            .into());
        }

        let approved = approve_count(&count, &manager, now)?;
        CashCountRepository::new(&mut tx)
            .approve(&approved.id, &manager.id, now)
            .await?;
        commit(tx).await?;

        info!(
            count_id = %approved.id,
            approved_by = %manager.id,
            variance_cents = approved.variance_cents,
            "Cash variance approved"
        );
        Ok(CashCountDto::from(&approved))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::dto::{ApproveCountRequest, CreateCountRequest};
    use crate::error::ShiftError;
    use titan_core::{CashCountType, TransactionType};

    fn count(shift_id: &str, kind: CashCountType, amount: f64, notes: Option<&str>) -> CreateCountRequest {
        CreateCountRequest {
            shift_id: shift_id.to_string(),
            count_type: kind,
            counted_amount: amount,
            counted_by: "u-1".to_string(),
            notes: notes.map(str::to_string),
            timestamp: Some(T0 + HOUR_MS),
        }
    }

    #[tokio::test]
    async fn test_expected_cash_breakdown() {
        let (service, _) = service().await;
        let shift = service.clock_in(clock_in("u-1", T0, Some(100.0))).await.unwrap();
        cash_txn(&service, &shift.id, TransactionType::Sale, 25_000, T0 + MIN_MS).await;
        cash_txn(&service, &shift.id, TransactionType::Refund, 2_000, T0 + 2 * MIN_MS).await;
        cash_txn(&service, &shift.id, TransactionType::Void, 9_900, T0 + 3 * MIN_MS).await;

        let expected = service.get_expected_cash(&shift.id).await.unwrap();
        assert_eq!(expected.starting_cash, 100.0);
        assert_eq!(expected.cash_sales, 250.0);
        assert_eq!(expected.cash_refunds, 20.0);
        assert_eq!(expected.expected_cash, 330.0);
    }

    #[tokio::test]
    async fn test_second_end_shift_count_conflicts() {
        let (service, _) = service().await;
        let shift = service.clock_in(clock_in("u-1", T0, Some(100.0))).await.unwrap();

        service
            .create_count(count(&shift.id, CashCountType::EndShift, 100.0, None))
            .await
            .unwrap();
        let err = service
            .create_count(count(&shift.id, CashCountType::EndShift, 100.0, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ShiftError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_approval_checks_pin_and_role() {
        let (service, _) = service().await;
        manager(&service, "mgr-1", "2468").await;
        let shift = service.clock_in(clock_in("u-1", T0, Some(100.0))).await.unwrap();

        let short = service
            .create_count(count(&shift.id, CashCountType::MidShift, 80.0, Some("float used for change")))
            .await
            .unwrap();
        assert!(short.requires_approval);

        let wrong_pin = service
            .approve_cash_count(ApproveCountRequest {
                count_id: short.id.clone(),
                manager_id: "mgr-1".to_string(),
                pin: "1111".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong_pin, ShiftError::Validation(_)));

        let approved = service
            .approve_cash_count(ApproveCountRequest {
                count_id: short.id.clone(),
                manager_id: "mgr-1".to_string(),
                pin: "2468".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(approved.approved_by.as_deref(), Some("mgr-1"));
        assert_eq!(approved.approved_at, Some(T0));

        let again = service
            .approve_cash_count(ApproveCountRequest {
                count_id: short.id,
                manager_id: "mgr-1".to_string(),
                pin: "2468".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(again, ShiftError::InvalidState(_)));
    }
}
