//! Break start/end.

use tracing::{info, warn};

use titan_core::aggregator::break_duration;
use titan_core::breaks::{end_break, start_break, BreakRequest};
use titan_db::{BreakRepository, ShiftRepository};

use super::{commit, ShiftService};
use crate::dto::{BreakDto, EndBreakRequest, StartBreakRequest};
use crate::error::{ShiftError, ShiftResult};

impl ShiftService {
    /// Starts a break on an active shift.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown shift
    /// - `InvalidState` if the shift is closed
    /// - `Conflict` if a break is already active (checked, and enforced by
    ///   a unique index for concurrent starts)
    pub async fn start_break(&self, request: StartBreakRequest) -> ShiftResult<BreakDto> {
        let start_time = request.start_time.unwrap_or_else(|| self.now());

        let mut tx = self.db.begin().await?;

        let shift = ShiftRepository::new(&mut tx)
            .get_by_id(&request.shift_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("Shift", &request.shift_id))?;
        let existing = BreakRepository::new(&mut tx).list_for_shift(&shift.id).await?;

        let brk = start_break(
            &shift,
            &existing,
            &BreakRequest {
                break_type: request.break_type,
                is_required: request.is_required,
                minimum_duration_secs: request.minimum_duration_seconds,
            },
            start_time,
            &self.policy.breaks,
        )
        .inspect_err(|e| warn!(shift_id = %shift.id, error = %e, "Break start rejected"))?;

        BreakRepository::new(&mut tx).insert(&brk).await?;
        commit(tx).await?;

        info!(
            break_id = %brk.id,
            shift_id = %brk.shift_id,
            break_type = ?brk.break_type,
            "Break started"
        );
        Ok(BreakDto::from(&brk))
    }

    /// Ends an active break and refreshes the shift's running break total.
    pub async fn end_break(&self, request: EndBreakRequest) -> ShiftResult<BreakDto> {
        let now = self.now();
        let end_time = request.end_time.unwrap_or(now);

        let mut tx = self.db.begin().await?;

        let brk = BreakRepository::new(&mut tx)
            .get_by_id(&request.break_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("Break", &request.break_id))?;

        let ended = end_break(&brk, end_time)
            .inspect_err(|e| warn!(break_id = %brk.id, error = %e, "Break end rejected"))?;
        BreakRepository::new(&mut tx).update(&ended).await?;

        let mut shift = ShiftRepository::new(&mut tx)
            .get_by_id(&ended.shift_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("Shift", &ended.shift_id))?;
        if shift.is_active() {
            let breaks = BreakRepository::new(&mut tx).list_for_shift(&shift.id).await?;
            shift.break_duration_seconds = break_duration(&breaks);
            shift.updated_at = now;
            ShiftRepository::new(&mut tx).update(&shift).await?;
        }

        commit(tx).await?;

        info!(
            break_id = %ended.id,
            shift_id = %ended.shift_id,
            duration_seconds = ?ended.duration_seconds,
            is_short = ended.is_short,
            "Break ended"
        );
        Ok(BreakDto::from(&ended))
    }

    /// Breaks of a shift, earliest first.
    pub async fn list_breaks(&self, shift_id: &str) -> ShiftResult<Vec<BreakDto>> {
        let mut conn = self.db.acquire().await?;
        let breaks = BreakRepository::new(&mut conn).list_for_shift(shift_id).await?;
        Ok(breaks.iter().map(BreakDto::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::dto::{EndBreakRequest, StartBreakRequest};
    use crate::error::ShiftError;
    use titan_core::{BreakStatus, BreakType};

    fn start(shift_id: &str, break_type: BreakType, at: i64) -> StartBreakRequest {
        StartBreakRequest {
            shift_id: shift_id.to_string(),
            break_type,
            is_required: false,
            minimum_duration_seconds: None,
            start_time: Some(at),
        }
    }

    #[tokio::test]
    async fn test_break_roundtrip_updates_running_total() {
        let (service, _) = service().await;
        let shift = service.clock_in(clock_in("u-1", T0, None)).await.unwrap();

        let brk = service
            .start_break(start(&shift.id, BreakType::Rest, T0 + 2 * HOUR_MS))
            .await
            .unwrap();
        assert_eq!(brk.status, BreakStatus::Active);

        let ended = service
            .end_break(EndBreakRequest {
                break_id: brk.id.clone(),
                end_time: Some(T0 + 2 * HOUR_MS + 15 * MIN_MS),
            })
            .await
            .unwrap();
        assert_eq!(ended.duration_seconds, Some(900));
        assert!(!ended.is_short);

        let active = service.get_active("u-1").await.unwrap().unwrap();
        assert_eq!(active.break_duration_seconds, 900);
    }

    #[tokio::test]
    async fn test_second_active_break_conflicts() {
        let (service, _) = service().await;
        let shift = service.clock_in(clock_in("u-1", T0, None)).await.unwrap();

        service
            .start_break(start(&shift.id, BreakType::Rest, T0 + HOUR_MS))
            .await
            .unwrap();
        let err = service
            .start_break(start(&shift.id, BreakType::Meal, T0 + HOUR_MS + MIN_MS))
            .await
            .unwrap_err();
        assert!(matches!(err, ShiftError::Conflict(_)));
        assert_eq!(service.list_breaks(&shift.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (service, _) = service().await;
        let err = service
            .start_break(start("nope", BreakType::Rest, T0))
            .await
            .unwrap_err();
        assert!(matches!(err, ShiftError::NotFound { .. }));

        let err = service
            .end_break(EndBreakRequest {
                break_id: "nope".to_string(),
                end_time: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ShiftError::NotFound { .. }));
    }
}
