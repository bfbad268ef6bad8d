//! Validation runs, the review workflow, and background jobs.
//!
//! ```text
//!   run_validation ──► store_verdict ──► resolve_issue (× n) ──► resolve_validation
//!        ▲                                                         │
//!        │                               approved: pending_review ─┴─► ended
//!   sweep_stale_shifts (active shifts older than stale_shift_secs)
//! ```

use tracing::{debug, info, warn};

use titan_core::aggregator::recompute;
use titan_core::resolution::{
    check_rerun, resolve_issue, resolve_validation, shift_status_after, shift_status_at_close,
};
use titan_core::{CoreError, Resolution, ValidationMethod, MILLIS_PER_SEC};
use titan_db::{
    BreakRepository, ClockEventRepository, ShiftRepository, StaffRepository,
    TransactionRepository, ValidationRepository,
};

use super::{commit, ShiftService};
use crate::dto::{
    ResolveIssueRequest, ResolveValidationRequest, ShiftDto, SweepReport, ValidationDto,
};
use crate::error::{ShiftError, ShiftResult};

impl ShiftService {
    /// Validates a shift on demand and persists the verdict.
    ///
    /// An undecided verdict keeps its id and gets a fresh issue set; a
    /// verdict that already needs review keeps needing it. A closed shift
    /// moves between `ended` and `pending_review` to match.
    ///
    /// ## Errors
    /// - `InvalidState` if the shift's verdict was already approved/rejected
    pub async fn run_validation(&self, shift_id: &str) -> ShiftResult<ValidationDto> {
        let now = self.now();
        let mut tx = self.db.begin().await?;

        let shift = ShiftRepository::new(&mut tx)
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("Shift", shift_id))?;
        let existing = ValidationRepository::new(&mut tx).get_by_shift(shift_id).await?;
        check_rerun(existing.as_ref())?;

        let record = self.load_record(&mut tx, shift, now).await?;
        let outcome = self.evaluate(&record, now);

        let (validation, issues) = self
            .store_verdict(
                &mut tx,
                existing.as_ref(),
                &record.shift.id,
                outcome,
                ValidationMethod::Manual,
                now,
            )
            .await?;

        let mut shift = record.shift;
        if !shift.is_active() {
            let status = shift_status_at_close(validation.resolution == Resolution::NeedsReview);
            if status != shift.status {
                shift.status = status;
                shift.updated_at = now;
                ShiftRepository::new(&mut tx).update(&shift).await?;
            }
        }
        commit(tx).await?;

        info!(
            shift_id = %shift.id,
            validation_id = %validation.id,
            valid = validation.valid,
            requires_review = validation.requires_review,
            issues = issues.len(),
            "Shift validated"
        );
        Ok(ValidationDto::new(&validation, &issues))
    }

    /// The stored verdict for a shift, if one exists.
    pub async fn get_validation(&self, shift_id: &str) -> ShiftResult<Option<ValidationDto>> {
        let mut conn = self.db.acquire().await?;
        let mut repo = ValidationRepository::new(&mut conn);

        match repo.get_by_shift(shift_id).await? {
            Some(validation) => {
                let issues = repo.list_issues(&validation.id).await?;
                Ok(Some(ValidationDto::new(&validation, &issues)))
            }
            None => Ok(None),
        }
    }

    /// Marks one issue resolved.
    ///
    /// Resolving the last open issue leaves the resolution untouched;
    /// approval is always a separate call.
    pub async fn resolve_issue(&self, request: ResolveIssueRequest) -> ShiftResult<ValidationDto> {
        let now = self.now();
        let mut tx = self.db.begin().await?;
        let mut repo = ValidationRepository::new(&mut tx);

        let issue = repo
            .get_issue(&request.issue_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("ShiftValidationIssue", &request.issue_id))?;
        let validation = repo
            .get_by_id(&issue.validation_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("ShiftValidation", &issue.validation_id))?;

        let (resolved, validation) = resolve_issue(
            &issue,
            &validation,
            &request.resolved_by,
            request.notes.as_deref(),
            now,
        )
        .inspect_err(|e| warn!(issue_id = %issue.id, error = %e, "Issue resolution rejected"))?;

        repo.update_issue(&resolved).await?;
        repo.update(&validation).await?;
        let issues = repo.list_issues(&validation.id).await?;
        commit(tx).await?;

        info!(
            issue_id = %resolved.id,
            code = resolved.code.as_str(),
            resolved_by = %request.resolved_by,
            unresolved = validation.unresolved_issue_count,
            "Issue resolved"
        );
        Ok(ValidationDto::new(&validation, &issues))
    }

    /// Moves a verdict to a new resolution. Only managers and owners decide.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown validation or resolver
    /// - `InvalidState` for a resolver without approval rights, a disallowed
    ///   transition, or an approval with open issues
    /// - `Validation` for a rejection without notes
    pub async fn resolve_validation(
        &self,
        request: ResolveValidationRequest,
    ) -> ShiftResult<ValidationDto> {
        let now = self.now();
        let mut tx = self.db.begin().await?;

        let resolver = StaffRepository::new(&mut tx)
            .get_by_id(&request.resolved_by)
            .await?
            .ok_or_else(|| ShiftError::not_found("Staff", &request.resolved_by))?;
        if !resolver.role.can_approve() {
            return Err(CoreError::invalid_state(
                "Staff",
                &resolver.id,
                resolver.role.as_str(),
                "only managers and owners can decide validations",
            )
            .into());
        }

        let mut repo = ValidationRepository::new(&mut tx);
        let validation = repo
            .get_by_id(&request.validation_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("ShiftValidation", &request.validation_id))?;

        let decided = resolve_validation(
            &validation,
            &resolver.id,
            request.resolution,
            request.notes.as_deref(),
            now,
        )
        .inspect_err(|e| {
            warn!(validation_id = %validation.id, error = %e, "Validation decision rejected");
        })?;
        repo.update(&decided).await?;
        let issues = repo.list_issues(&decided.id).await?;

        let mut shift = ShiftRepository::new(&mut tx)
            .get_by_id(&decided.shift_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("Shift", &decided.shift_id))?;
        let status = shift_status_after(decided.resolution, shift.status);
        if status != shift.status {
            shift.status = status;
            shift.updated_at = now;
            ShiftRepository::new(&mut tx).update(&shift).await?;
        }

        commit(tx).await?;

        info!(
            validation_id = %decided.id,
            shift_id = %decided.shift_id,
            resolution = decided.resolution.as_str(),
            resolved_by = %resolver.id,
            "Validation decided"
        );
        Ok(ValidationDto::new(&decided, &issues))
    }

    /// Rejects a verdict. Notes are required.
    pub async fn reject_validation(
        &self,
        validation_id: &str,
        resolved_by: &str,
        notes: &str,
    ) -> ShiftResult<ValidationDto> {
        self.resolve_validation(ResolveValidationRequest {
            validation_id: validation_id.to_string(),
            resolved_by: resolved_by.to_string(),
            resolution: Resolution::Rejected,
            notes: Some(notes.to_string()),
        })
        .await
    }

    // =========================================================================
    // Background Jobs
    // =========================================================================

    /// Validates every active shift opened more than `stale_shift_secs`
    /// before `now`, which raises MISSED_CLOCK_OUT on them.
    ///
    /// Each shift is its own transaction; one failure does not stop the
    /// sweep.
    pub async fn sweep_stale_shifts(&self, now: i64) -> ShiftResult<SweepReport> {
        let cutoff = now - self.policy.stale_shift_secs * MILLIS_PER_SEC;
        let stale = {
            let mut conn = self.db.acquire().await?;
            ShiftRepository::new(&mut conn)
                .list_active_started_before(cutoff)
                .await?
        };

        let mut report = SweepReport {
            checked: stale.len(),
            ..SweepReport::default()
        };

        for shift in stale {
            let shift_id = shift.id;
            match self.sweep_one(&shift_id, now).await {
                Ok(Some(true)) => report.flagged.push(shift_id),
                Ok(Some(false)) => {}
                Ok(None) => report.skipped.push(shift_id),
                Err(e) => {
                    warn!(shift_id = %shift_id, error = %e, "Sweep failed for shift");
                    report.skipped.push(shift_id);
                }
            }
        }

        info!(
            checked = report.checked,
            flagged = report.flagged.len(),
            skipped = report.skipped.len(),
            "Stale shift sweep finished"
        );
        Ok(report)
    }

    /// `Some(requires_review)` once stored, `None` if the shift was closed
    /// since the sweep listed it or its verdict is already decided.
    async fn sweep_one(&self, shift_id: &str, now: i64) -> ShiftResult<Option<bool>> {
        let mut tx = self.db.begin().await?;

        // A clock-out may have committed after the list was taken.
        let shift = match ShiftRepository::new(&mut tx).get_by_id(shift_id).await? {
            Some(shift) if shift.is_active() => shift,
            _ => {
                debug!(shift_id, "Shift no longer active, skipping");
                return Ok(None);
            }
        };

        let existing = ValidationRepository::new(&mut tx).get_by_shift(&shift.id).await?;
        if existing.as_ref().is_some_and(|v| v.resolution.is_terminal()) {
            debug!(shift_id = %shift.id, "Verdict already decided, skipping");
            return Ok(None);
        }

        let record = self.load_record(&mut tx, shift, now).await?;
        let outcome = self.evaluate(&record, now);
        let (validation, _) = self
            .store_verdict(
                &mut tx,
                existing.as_ref(),
                &record.shift.id,
                outcome,
                ValidationMethod::Auto,
                now,
            )
            .await?;
        commit(tx).await?;

        Ok(Some(validation.requires_review))
    }

    /// Re-derives a closed shift's hours, break total and sales totals from
    /// its clock events, breaks and transactions, and writes them back.
    ///
    /// ## Errors
    /// - `InvalidState` for a shift that is still active
    pub async fn refresh_shift_aggregates(&self, shift_id: &str) -> ShiftResult<ShiftDto> {
        let now = self.now();
        let mut tx = self.db.begin().await?;

        let shift = ShiftRepository::new(&mut tx)
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("Shift", shift_id))?;
        let clock_out_id = shift.clock_out_id.clone().ok_or_else(|| {
            CoreError::invalid_state(
                "Shift",
                &shift.id,
                shift.status.as_str(),
                "only closed shifts can be refreshed",
            )
        })?;

        let mut events = ClockEventRepository::new(&mut tx);
        let clock_in = events
            .get_by_id(&shift.clock_in_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("ClockEvent", &shift.clock_in_id))?;
        let clock_out = events
            .get_by_id(&clock_out_id)
            .await?
            .ok_or_else(|| ShiftError::not_found("ClockEvent", &clock_out_id))?;

        let breaks = BreakRepository::new(&mut tx).list_for_shift(&shift.id).await?;
        let transactions = TransactionRepository::new(&mut tx)
            .list_for_shift(&shift.id)
            .await?;

        let refreshed = recompute(
            &shift,
            &clock_in,
            &clock_out,
            &breaks,
            &transactions,
            self.policy.standard_shift_secs,
            now,
        )?;
        ShiftRepository::new(&mut tx).update(&refreshed).await?;
        commit(tx).await?;

        debug!(
            shift_id = %refreshed.id,
            total_seconds = refreshed.total_seconds,
            drift_seconds = refreshed.total_seconds - shift.total_seconds,
            "Shift aggregates refreshed"
        );
        Ok(ShiftDto::from(&refreshed))
    }
}
