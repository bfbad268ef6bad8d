//! # Shift Demo Seeder
//!
//! Populates a database with staff, schedules and a day of shifts, then
//! runs the stale-shift sweep and prints every verdict.
//!
//! ## Usage
//! ```bash
//! # Seed ./titan_dev.db (default)
//! cargo run -p titan-shift --bin seed
//!
//! # Specify database path
//! cargo run -p titan-shift --bin seed -- --db ./data/titan.db
//! ```
//!
//! ## Generated Shifts
//! - `cashier-1`: on schedule, meal taken, drawer balanced
//! - `cashier-2`: drawer short by 30.00, approved by the manager
//! - `cashier-3`: clocked in 30 hours ago and never clocked out
//!
//! The manager (`mgr-1`) approves with PIN `2468`.

use chrono::Utc;
use std::env;
use titan_core::{
    BreakType, CashCountType, ClockMethod, PaymentMethod, SalesTransaction, Schedule,
    ScheduleStatus, Staff, StaffRole, TransactionType,
};
use titan_db::{ScheduleRepository, StaffRepository, TransactionRepository};
use titan_shift::credentials::hash_pin;
use titan_shift::dto::{
    ApproveCountRequest, ClockInRequest, ClockOutRequest, CreateCountRequest, EndBreakRequest,
    StartBreakRequest,
};
use titan_shift::{init_tracing, ShiftConfig, ShiftService};

const HOUR_MS: i64 = 3_600_000;
const MIN_MS: i64 = 60_000;
const BUSINESS_ID: &str = "biz-demo";
const MANAGER_PIN: &str = "2468";

/// (id, display name, role)
const STAFF: &[(&str, &str, StaffRole)] = &[
    ("mgr-1", "Morgan (Manager)", StaffRole::Manager),
    ("cashier-1", "Casey", StaffRole::Cashier),
    ("cashier-2", "Jordan", StaffRole::Cashier),
    ("cashier-3", "Riley", StaffRole::Cashier),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./titan_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Titan POS Shift Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./titan_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = ShiftConfig::new();
    config.database.path = Some(db_path.clone().into());
    init_tracing(&config.logging.filter);

    println!("🌱 Titan POS Shift Seeder");
    println!("=========================");
    println!("Database: {}", db_path);
    println!();

    let service = ShiftService::connect(&config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    {
        let mut conn = service.database().acquire().await?;
        if StaffRepository::new(&mut conn).get_by_id("mgr-1").await?.is_some() {
            println!("⚠ Database already has demo staff");
            println!("  Skipping seed to avoid duplicates.");
            println!("  Delete the database file to regenerate.");
            return Ok(());
        }
    }

    let now = Utc::now().timestamp_millis();
    let day_start = now - 30 * HOUR_MS;

    seed_staff(&service).await?;
    seed_schedules(&service, day_start).await?;
    println!("✓ Staff and schedules");

    // cashier-1: a clean shift
    let clean = service
        .clock_in(clock_in("cashier-1", day_start + 2 * MIN_MS, Some(150.0)))
        .await?;
    sale(&service, &clean.id, 1_299, day_start + HOUR_MS).await?;
    sale(&service, &clean.id, 4_550, day_start + 3 * HOUR_MS).await?;
    let meal = service
        .start_break(StartBreakRequest {
            shift_id: clean.id.clone(),
            break_type: BreakType::Meal,
            is_required: true,
            minimum_duration_seconds: None,
            start_time: Some(day_start + 4 * HOUR_MS),
        })
        .await?;
    service
        .end_break(EndBreakRequest {
            break_id: meal.id,
            end_time: Some(day_start + 4 * HOUR_MS + 30 * MIN_MS),
        })
        .await?;
    service
        .create_count(CreateCountRequest {
            shift_id: clean.id.clone(),
            count_type: CashCountType::EndShift,
            counted_amount: 208.49,
            counted_by: "cashier-1".to_string(),
            notes: None,
            timestamp: Some(day_start + 8 * HOUR_MS - 5 * MIN_MS),
        })
        .await?;
    service
        .clock_out(clock_out("cashier-1", day_start + 8 * HOUR_MS))
        .await?;
    println!("✓ cashier-1 shift");

    // cashier-2: short drawer
    let short = service
        .clock_in(clock_in("cashier-2", day_start + HOUR_MS, Some(100.0)))
        .await?;
    sale(&service, &short.id, 25_000, day_start + 2 * HOUR_MS).await?;
    refund(&service, &short.id, 2_000, day_start + 3 * HOUR_MS).await?;
    let count = service
        .create_count(CreateCountRequest {
            shift_id: short.id.clone(),
            count_type: CashCountType::EndShift,
            counted_amount: 300.0,
            counted_by: "cashier-2".to_string(),
            notes: Some("Drawer short, two twenties unaccounted for".to_string()),
            timestamp: Some(day_start + 5 * HOUR_MS - 5 * MIN_MS),
        })
        .await?;
    service
        .approve_cash_count(ApproveCountRequest {
            count_id: count.id,
            manager_id: "mgr-1".to_string(),
            pin: MANAGER_PIN.to_string(),
        })
        .await?;
    service
        .clock_out(clock_out("cashier-2", day_start + 5 * HOUR_MS))
        .await?;
    println!("✓ cashier-2 shift");

    // cashier-3: never clocks out
    let stale = service
        .clock_in(clock_in("cashier-3", day_start, None))
        .await?;
    println!("✓ cashier-3 shift (left open)");

    println!();
    println!("Running stale shift sweep...");
    let report = service.sweep_stale_shifts(now).await?;
    println!(
        "  Checked {}, flagged {}, skipped {}",
        report.checked,
        report.flagged.len(),
        report.skipped.len()
    );

    println!();
    println!("Verdicts:");
    for shift in [&clean, &short, &stale] {
        let user_id = shift.user_id.as_str();
        match service.get_validation(&shift.id).await? {
            Some(validation) => {
                let codes: Vec<&str> = validation.codes().iter().map(|c| c.as_str()).collect();
                println!(
                    "  {:<10} valid={:<5} review={:<5} resolution={:<12} issues={:?}",
                    user_id,
                    validation.valid,
                    validation.requires_review,
                    validation.resolution.as_str(),
                    codes
                );
            }
            None => println!("  {:<10} no verdict", user_id),
        }
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

async fn seed_staff(service: &ShiftService) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = service.database().acquire().await?;
    let mut repo = StaffRepository::new(&mut conn);

    for (id, name, role) in STAFF {
        let pin_hash = match role {
            StaffRole::Manager => Some(hash_pin(MANAGER_PIN)?),
            _ => None,
        };
        repo.upsert(&Staff {
            id: id.to_string(),
            business_id: BUSINESS_ID.to_string(),
            display_name: name.to_string(),
            role: *role,
            shift_required_override: None,
            pin_hash,
        })
        .await?;
    }
    Ok(())
}

async fn seed_schedules(
    service: &ShiftService,
    day_start: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = service.database().acquire().await?;
    let mut repo = ScheduleRepository::new(&mut conn);

    let rows = [
        ("cashier-1", day_start, 8),
        ("cashier-2", day_start + HOUR_MS, 4),
        ("cashier-3", day_start, 8),
    ];
    for (user_id, start, hours) in rows {
        repo.insert(&Schedule {
            id: titan_core::new_id(),
            user_id: user_id.to_string(),
            business_id: BUSINESS_ID.to_string(),
            start_time: start,
            end_time: start + hours * HOUR_MS,
            status: ScheduleStatus::Scheduled,
        })
        .await?;
    }
    Ok(())
}

fn clock_in(user_id: &str, timestamp: i64, starting_cash: Option<f64>) -> ClockInRequest {
    ClockInRequest {
        user_id: user_id.to_string(),
        business_id: BUSINESS_ID.to_string(),
        terminal_id: "till-1".to_string(),
        schedule_id: None,
        method: ClockMethod::Login,
        timestamp: Some(timestamp),
        starting_cash,
    }
}

fn clock_out(user_id: &str, timestamp: i64) -> ClockOutRequest {
    ClockOutRequest {
        user_id: user_id.to_string(),
        business_id: BUSINESS_ID.to_string(),
        terminal_id: "till-1".to_string(),
        method: ClockMethod::Manual,
        timestamp: Some(timestamp),
    }
}

async fn sale(
    service: &ShiftService,
    shift_id: &str,
    cents: i64,
    at: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    insert_transaction(service, shift_id, TransactionType::Sale, cents, at).await
}

async fn refund(
    service: &ShiftService,
    shift_id: &str,
    cents: i64,
    at: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    insert_transaction(service, shift_id, TransactionType::Refund, cents, at).await
}

/// Sales are owned by the checkout subsystem; the seeder writes them directly.
async fn insert_transaction(
    service: &ShiftService,
    shift_id: &str,
    kind: TransactionType,
    cents: i64,
    at: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = service.database().acquire().await?;
    TransactionRepository::new(&mut conn)
        .insert(&SalesTransaction {
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
        })
        .await?;
    Ok(())
}
