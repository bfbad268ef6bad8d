//! # Shift Service
//!
//! Every shift operation as one short SQLite transaction.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Operation = One Transaction                      │
//! │                                                                         │
//! │  let mut tx = db.begin().await?;                                        │
//! │       │                                                                 │
//! │       ├── 1. READ current state      ShiftRepository::get_active_...   │
//! │       ├── 2. CHECK invariants        titan_core::ledger::check_...     │
//! │       ├── 3. WRITE new facts         ClockEventRepository::insert      │
//! │       │                              ShiftRepository::insert           │
//! │       └── 4. COMMIT                  tx.commit()                       │
//! │                                                                         │
//! │  Any error before COMMIT drops `tx`, which rolls everything back.      │
//! │  Two terminals racing each other: the loser hits a UNIQUE index and    │
//! │  gets ShiftError::Conflict. Nothing is retried here.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Area | Methods |
//! |------|---------|
//! | clock | `clock_in`, `clock_out`, `get_active`, `get_today_schedule`, `require_shift_for_sales` |
//! | breaks | `start_break`, `end_break`, `list_breaks` |
//! | cash | `get_expected_cash`, `create_count`, `approve_cash_count` |
//! | review | `run_validation`, `get_validation`, `resolve_issue`, `resolve_validation`, `reject_validation` |
//! | jobs | `sweep_stale_shifts`, `refresh_shift_aggregates` |

mod breaks;
mod cash;
mod clock;
mod review;

#[cfg(test)]
mod scenarios;

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::{Sqlite, SqliteConnection, Transaction};
use titan_core::calendar::week_start;
use titan_core::engine::{validate_shift, ValidationContext, ValidationOutcome};
use titan_core::refund_chain::DEFAULT_MAX_DEPTH;
use titan_core::resolution::{build_validation, carry_forward};
use titan_core::{
    Break, CashDrawerCount, SalesTransaction, Schedule, Shift, ShiftPolicy, ShiftValidation,
    ShiftValidationIssue, ValidationMethod,
};
use titan_db::{
    BreakRepository, CashCountRepository, Database, DbError, ScheduleRepository, ShiftRepository,
    TransactionRepository, ValidationRepository,
};

use crate::config::ShiftConfig;
use crate::error::{ShiftError, ShiftResult};

/// Source of "now", in epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// The wall clock.
pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

/// Shift lifecycle and compliance operations over one database.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct ShiftService {
    db: Database,
    policy: Arc<ShiftPolicy>,
    utc_offset_minutes: i32,
    clock: Clock,
}

impl std::fmt::Debug for ShiftService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShiftService")
            .field("db", &self.db)
            .field("utc_offset_minutes", &self.utc_offset_minutes)
            .finish_non_exhaustive()
    }
}

impl ShiftService {
    /// Creates a service on an open database.
    pub fn new(db: Database, policy: ShiftPolicy, utc_offset_minutes: i32) -> Self {
        ShiftService {
            db,
            policy: Arc::new(policy),
            utc_offset_minutes,
            clock: system_clock(),
        }
    }

    /// Opens the configured database (running migrations) and builds the service.
    pub async fn connect(config: &ShiftConfig) -> ShiftResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()).await?;
        tracing::info!(
            path = %config.database_path().display(),
            utc_offset_minutes = config.business.utc_offset_minutes,
            "Shift service ready"
        );
        Ok(Self::new(
            db,
            config.policy.clone(),
            config.business.utc_offset_minutes,
        ))
    }

    /// Replaces the clock (tests, replays).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &ShiftPolicy {
        &self.policy
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    // =========================================================================
    // Validation Plumbing (shared by clock-out, manual runs and the sweep)
    // =========================================================================

    /// Loads everything the rule engine reads about `shift`.
    async fn load_record(
        &self,
        conn: &mut SqliteConnection,
        shift: Shift,
        now: i64,
    ) -> ShiftResult<ShiftRecord> {
        let schedule = match shift.schedule_id.as_deref() {
            Some(id) => ScheduleRepository::new(conn).get_by_id(id).await?,
            None => None,
        };
        let breaks = BreakRepository::new(conn).list_for_shift(&shift.id).await?;
        let cash_counts = CashCountRepository::new(conn).list_for_shift(&shift.id).await?;
        let transactions = TransactionRepository::new(conn).list_for_shift(&shift.id).await?;
        let linked_transactions = linked_transactions(conn, &transactions).await?;

        let other_shifts = ShiftRepository::new(conn)
            .list_overlapping(
                &shift.user_id,
                &shift.id,
                shift.started_at,
                shift.window_end(now),
            )
            .await?;

        let week_from = week_start(shift.started_at, self.utc_offset_minutes)?;
        let week_prior_seconds = ShiftRepository::new(conn)
            .list_for_user_between(&shift.user_id, week_from, shift.started_at)
            .await?
            .iter()
            .filter(|s| s.id != shift.id)
            .map(|s| s.total_seconds)
            .sum();

        Ok(ShiftRecord {
            shift,
            schedule,
            breaks,
            cash_counts,
            transactions,
            linked_transactions,
            other_shifts,
            week_prior_seconds,
        })
    }

    fn evaluate(&self, record: &ShiftRecord, now: i64) -> ValidationOutcome {
        validate_shift(&record.context(now), &self.policy)
    }

    /// Writes a verdict, keeping the id of an earlier undecided one.
    ///
    /// The issue set is always replaced wholesale; see [`carry_forward`] for
    /// what survives from the earlier record.
    async fn store_verdict(
        &self,
        conn: &mut SqliteConnection,
        existing: Option<&ShiftValidation>,
        shift_id: &str,
        outcome: ValidationOutcome,
        method: ValidationMethod,
        now: i64,
    ) -> ShiftResult<(ShiftValidation, Vec<ShiftValidationIssue>)> {
        let (validation, issues) = build_validation(shift_id, outcome, method, now);
        let mut repo = ValidationRepository::new(conn);

        match existing {
            Some(previous) => {
                let previous_issues = repo.list_issues(&previous.id).await?;
                let (validation, issues) =
                    carry_forward(previous, &previous_issues, validation, issues);
                repo.update(&validation).await?;
                repo.replace_issues(&validation.id, &issues).await?;
                Ok((validation, issues))
            }
            None => {
                repo.insert(&validation, &issues).await?;
                Ok((validation, issues))
            }
        }
    }
}

/// Commits, mapping the failure like every other storage error.
async fn commit(tx: Transaction<'static, Sqlite>) -> ShiftResult<()> {
    tx.commit()
        .await
        .map_err(|e| ShiftError::from(DbError::TransactionFailed(e.to_string())))
}

/// Refund originals that live outside the shift, following each chain a
/// little past the walker's depth limit so it can report `TooDeep`.
async fn linked_transactions(
    conn: &mut SqliteConnection,
    transactions: &[SalesTransaction],
) -> ShiftResult<Vec<SalesTransaction>> {
    let mut known: HashSet<String> = transactions.iter().map(|t| t.id.clone()).collect();
    let mut linked = Vec::new();

    for txn in transactions {
        let mut next = txn.original_transaction_id.clone();
        let mut steps = 0;

        while let Some(id) = next.take() {
            if steps > DEFAULT_MAX_DEPTH || known.contains(&id) {
                break;
            }
            steps += 1;

            if let Some(original) = TransactionRepository::new(conn).get_by_id(&id).await? {
                next = original.original_transaction_id.clone();
                known.insert(original.id.clone());
                linked.push(original);
            }
        }
    }

    Ok(linked)
}

/// A shift with everything stored about it.
#[derive(Debug)]
struct ShiftRecord {
    shift: Shift,
    schedule: Option<Schedule>,
    breaks: Vec<Break>,
    cash_counts: Vec<CashDrawerCount>,
    transactions: Vec<SalesTransaction>,
    linked_transactions: Vec<SalesTransaction>,
    other_shifts: Vec<Shift>,
    week_prior_seconds: i64,
}

impl ShiftRecord {
    fn context(&self, now: i64) -> ValidationContext<'_> {
        ValidationContext {
            shift: &self.shift,
            schedule: self.schedule.as_ref(),
            breaks: &self.breaks,
            cash_counts: &self.cash_counts,
            transactions: &self.transactions,
            linked_transactions: &self.linked_transactions,
            other_shifts: &self.other_shifts,
            week_prior_seconds: self.week_prior_seconds,
            now,
        }
    }
}

/// Shared fixtures for service tests.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    use titan_core::{PaymentMethod, SalesTransaction, ShiftPolicy, Staff, StaffRole, TransactionType};
    use titan_db::{Database, DbConfig, StaffRepository, TransactionRepository};

    use super::ShiftService;
    use crate::credentials::hash_pin;
    use crate::dto::{ClockInRequest, ClockOutRequest};

    pub const MIN_MS: i64 = 60_000;
    pub const HOUR_MS: i64 = 3_600_000;

    /// 2024-03-04T09:00:00Z, a Monday.
    pub const T0: i64 = 1_709_542_800_000;

    /// A settable clock shared with the service.
    #[derive(Clone)]
    pub struct TestClock(Arc<AtomicI64>);

    impl TestClock {
        pub fn set(&self, now: i64) {
            self.0.store(now, Ordering::SeqCst);
        }
    }

    pub async fn service() -> (ShiftService, TestClock) {
        service_with(ShiftPolicy::default()).await
    }

    pub async fn service_with(policy: ShiftPolicy) -> (ShiftService, TestClock) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let clock = TestClock(Arc::new(AtomicI64::new(T0)));
        let handle = clock.0.clone();
        let service = ShiftService::new(db, policy, 0)
            .with_clock(Arc::new(move || handle.load(Ordering::SeqCst)));
        (service, clock)
    }

    pub fn clock_in(user_id: &str, ts: i64, starting_cash: Option<f64>) -> ClockInRequest {
        ClockInRequest {
            user_id: user_id.to_string(),
            business_id: "biz-1".to_string(),
            terminal_id: "till-1".to_string(),
            schedule_id: None,
            method: titan_core::ClockMethod::Manual,
            timestamp: Some(ts),
            starting_cash,
        }
    }

    pub fn clock_out(user_id: &str, ts: i64) -> ClockOutRequest {
        ClockOutRequest {
            user_id: user_id.to_string(),
            business_id: "biz-1".to_string(),
            terminal_id: "till-1".to_string(),
            method: titan_core::ClockMethod::Manual,
            timestamp: Some(ts),
        }
    }

    pub async fn manager(service: &ShiftService, id: &str, pin: &str) {
        let mut conn = service.database().acquire().await.unwrap();
        StaffRepository::new(&mut conn)
            .upsert(&Staff {
                id: id.to_string(),
                business_id: "biz-1".to_string(),
                display_name: "Store Manager".to_string(),
                role: StaffRole::Manager,
                shift_required_override: None,
                pin_hash: Some(hash_pin(pin).unwrap()),
            })
            .await
            .unwrap();
    }

    pub async fn cash_txn(
        service: &ShiftService,
        shift_id: &str,
        kind: TransactionType,
        cents: i64,
        at: i64,
    ) -> SalesTransaction {
        let txn = SalesTransaction {
            id: titan_core::new_id(),
            shift_id: shift_id.to_string(),
            transaction_type: kind,
            payment_method: PaymentMethod::Cash,
            total_cents: cents,
            cash_amount_cents: None,
            void_reason: None,
            manager_approval_id: None,
            is_partial_refund: false,
            original_transaction_id: None,
            created_at: at,
        };
        let mut conn = service.database().acquire().await.unwrap();
        TransactionRepository::new(&mut conn).insert(&txn).await.unwrap();
        txn
    }
}
