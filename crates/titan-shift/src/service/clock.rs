//! Clock-in, clock-out and the reads around them.

use tracing::{info, warn};

use titan_core::aggregator::{check_starting_cash, close_shift, open_shift};
use titan_core::breaks::force_close_open_breaks;
use titan_core::calendar::{day_window, DAY_MS};
use titan_core::ledger::{check_clock_in, check_clock_out, match_schedule, new_event, ClockRequest};
use titan_core::policy::{resolve_shift_requirement, ShiftRequirement};
use titan_core::resolution::shift_status_at_close;
use titan_core::{ClockEventType, CoreError, Money, ScheduleStatus, ValidationMethod, MILLIS_PER_SEC};
use titan_db::{
    BreakRepository, ClockEventRepository, ScheduleRepository, ShiftRepository, StaffRepository,
    TransactionRepository, ValidationRepository,
};

use super::{commit, ShiftService};
use crate::dto::{
    ClockInRequest, ClockOutRequest, ClockOutResponse, ScheduleDto, ShiftDto, ValidationDto,
};
use crate::error::{ShiftError, ShiftResult};

impl ShiftService {
    /// Clocks a user in and opens their shift.
    ///
    /// ## Errors
    /// - `InvalidState` if the user already has an active shift
    /// - `Conflict` if another terminal opened one concurrently
    /// - `NotFound` for an explicit schedule id that does not exist
    /// - `Validation` for a negative starting cash or blank references
    pub async fn clock_in(&self, request: ClockInRequest) -> ShiftResult<ShiftDto> {
        let now = self.now();
        let starting_cash = request
            .starting_cash
            .map(|amount| Money::from_decimal(amount).cents());
        check_starting_cash(starting_cash)?;

        let mut clock = ClockRequest {
            user_id: request.user_id,
            business_id: request.business_id,
            terminal_id: request.terminal_id,
            schedule_id: request.schedule_id,
            method: request.method,
            timestamp: request.timestamp.unwrap_or(now),
        };

        let mut tx = self.db.begin().await?;

        let open = ShiftRepository::new(&mut tx)
            .get_active_for_user(&clock.user_id)
            .await?;
        check_clock_in(&clock, open.as_ref()).inspect_err(|e| {
            warn!(user_id = %clock.user_id, error = %e, "Clock-in rejected");
        })?;

        match clock.schedule_id.as_deref() {
            Some(id) => {
                if ScheduleRepository::new(&mut tx).get_by_id(id).await?.is_none() {
                    return Err(ShiftError::not_found("Schedule", id));
                }
            }
            None => {
                let window_ms = self.policy.schedule_match_window_secs * MILLIS_PER_SEC;
                let candidates = ScheduleRepository::new(&mut tx)
                    .list_for_user_between(
                        &clock.user_id,
                        clock.timestamp - window_ms,
                        clock.timestamp + window_ms + 1,
                    )
                    .await?;
                clock.schedule_id = match_schedule(
                    &candidates,
                    &clock.user_id,
                    clock.timestamp,
                    self.policy.schedule_match_window_secs,
                )
                .map(|s| s.id.clone());
            }
        }

        let event = new_event(&clock, ClockEventType::In, now);
        ClockEventRepository::new(&mut tx).insert(&event).await?;

        let shift = open_shift(&event, starting_cash, now);
        ShiftRepository::new(&mut tx).insert(&shift).await?;

        commit(tx).await?;

        info!(
            shift_id = %shift.id,
            user_id = %shift.user_id,
            schedule_id = ?shift.schedule_id,
            started_at = shift.started_at,
            "Clocked in"
        );
        Ok(ShiftDto::from(&shift))
    }

    /// Clocks a user out: closes breaks, derives totals, validates.
    ///
    /// ## What Happens (one transaction)
    /// 1. Append the clock-out event
    /// 2. Force-close open breaks (and record a missed meal if none was taken)
    /// 3. Derive hours and sales totals from the stored facts
    /// 4. Run the rule engine and replace any earlier verdict
    /// 5. End the shift, or park it in `pending_review`
    pub async fn clock_out(&self, request: ClockOutRequest) -> ShiftResult<ClockOutResponse> {
        let now = self.now();
        let clock = ClockRequest {
            user_id: request.user_id,
            business_id: request.business_id,
            terminal_id: request.terminal_id,
            schedule_id: None,
            method: request.method,
            timestamp: request.timestamp.unwrap_or(now),
        };

        let mut tx = self.db.begin().await?;

        let open = ShiftRepository::new(&mut tx)
            .get_active_for_user(&clock.user_id)
            .await?;
        let shift = check_clock_out(&clock, open.as_ref())
            .inspect_err(|e| {
                warn!(user_id = %clock.user_id, error = %e, "Clock-out rejected");
            })?
            .clone();

        let event = new_event(
            &ClockRequest {
                schedule_id: shift.schedule_id.clone(),
                ..clock
            },
            ClockEventType::Out,
            now,
        );
        ClockEventRepository::new(&mut tx).insert(&event).await?;

        let breaks = BreakRepository::new(&mut tx).list_for_shift(&shift.id).await?;
        let closure =
            force_close_open_breaks(&shift, &breaks, event.timestamp, &self.policy.breaks);
        {
            let mut repo = BreakRepository::new(&mut tx);
            for brk in &closure.updated {
                repo.update(brk).await?;
            }
            for brk in &closure.inserted {
                repo.insert(brk).await?;
            }
        }
        let breaks = closure.apply(&breaks);

        let transactions = TransactionRepository::new(&mut tx)
            .list_for_shift(&shift.id)
            .await?;
        let closed = close_shift(
            &shift,
            &event,
            &breaks,
            &transactions,
            self.policy.standard_shift_secs,
            now,
        )?;

        let record = self.load_record(&mut tx, closed, now).await?;
        let outcome = self.evaluate(&record, now);
        let mut closed = record.shift;
        closed.status = shift_status_at_close(outcome.requires_review);
        ShiftRepository::new(&mut tx).update(&closed).await?;

        // A new clock-out cycle always gets a fresh verdict
        ValidationRepository::new(&mut tx)
            .delete_for_shift(&closed.id)
            .await?;
        let (validation, issues) = self
            .store_verdict(&mut tx, None, &closed.id, outcome, ValidationMethod::Auto, now)
            .await?;

        commit(tx).await?;

        info!(
            shift_id = %closed.id,
            user_id = %closed.user_id,
            total_seconds = closed.total_seconds,
            overtime_seconds = closed.overtime_seconds,
            valid = validation.valid,
            requires_review = validation.requires_review,
            issues = issues.len(),
            "Clocked out"
        );

        Ok(ClockOutResponse {
            shift: ShiftDto::from(&closed),
            validation: ValidationDto::new(&validation, &issues),
        })
    }

    /// The user's active shift, if any.
    pub async fn get_active(&self, user_id: &str) -> ShiftResult<Option<ShiftDto>> {
        let mut conn = self.db.acquire().await?;
        let shift = ShiftRepository::new(&mut conn)
            .get_active_for_user(user_id)
            .await?;
        Ok(shift.as_ref().map(ShiftDto::from))
    }

    /// Non-cancelled schedules touching today (business local time).
    pub async fn get_today_schedule(&self, user_id: &str) -> ShiftResult<Vec<ScheduleDto>> {
        let (day_start, day_end) = day_window(self.now(), self.utc_offset_minutes)?;

        let mut conn = self.db.acquire().await?;
        // Overnight schedules start the day before
        let schedules = ScheduleRepository::new(&mut conn)
            .list_for_user_between(user_id, day_start - DAY_MS, day_end)
            .await?;

        Ok(schedules
            .iter()
            .filter(|s| s.status != ScheduleStatus::Cancelled && s.end_time > day_start)
            .map(ScheduleDto::from)
            .collect())
    }

    /// Guards the sales screen: a user whose role requires a shift must
    /// be clocked in.
    ///
    /// Returns the resolved requirement when the user may sell.
    pub async fn require_shift_for_sales(&self, user_id: &str) -> ShiftResult<ShiftRequirement> {
        let mut conn = self.db.acquire().await?;

        let staff = StaffRepository::new(&mut conn).get_by_id(user_id).await?;
        let requirement = resolve_shift_requirement(
            staff.as_ref().and_then(|s| s.shift_required_override),
            staff.as_ref().map(|s| s.role),
            self.policy.shift_required_default,
        );

        if requirement.required
            && ShiftRepository::new(&mut conn)
                .get_active_for_user(user_id)
                .await?
                .is_none()
        {
            warn!(user_id, source = ?requirement.source, "Sale attempted without a shift");
            return Err(CoreError::invalid_state(
                "User",
                user_id,
                "clocked out",
                "a shift is required before ringing up sales",
            )
            .into());
        }

        Ok(requirement)
    }
}
