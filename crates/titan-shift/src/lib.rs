//! # Titan Shift
//!
//! Shift lifecycle and compliance validation for Titan POS terminals.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Titan Shift                                    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Clock         │  │  Breaks        │  │  Cash Drawer               ││
//! │  │                │  │                │  │                            ││
//! │  │ • clock_in     │  │ • start_break  │  │ • get_expected_cash        ││
//! │  │ • clock_out    │  │ • end_break    │  │ • create_count             ││
//! │  │ • get_active   │  │ • list_breaks  │  │ • approve_cash_count       ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────────────────────┐  ┌──────────────────────────────┐  │
//! │  │  Review                        │  │  Jobs                        │  │
//! │  │                                │  │                              │  │
//! │  │ • run_validation               │  │ • sweep_stale_shifts         │  │
//! │  │ • resolve_issue                │  │ • refresh_shift_aggregates   │  │
//! │  │ • resolve_validation           │  │                              │  │
//! │  └────────────────────────────────┘  └──────────────────────────────┘  │
//! │                                                                         │
//! │  ShiftConfig ── shift.toml + TITAN_* env ──► ShiftService::connect      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use titan_shift::{init_tracing, ShiftConfig, ShiftService};
//!
//! let config = ShiftConfig::load_or_default(None);
//! init_tracing(&config.logging.filter);
//!
//! let service = ShiftService::connect(&config).await?;
//! let shift = service.clock_in(request).await?;
//! ```

pub mod config;
pub mod credentials;
pub mod dto;
pub mod error;
pub mod service;

// Re-exports
pub use config::ShiftConfig;
pub use error::{ErrorCode, ErrorResponse, ShiftError, ShiftResult};
pub use service::{system_clock, Clock, ShiftService};

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` wins over `default_filter` when set. Calling this twice is
/// harmless; the second call leaves the first subscriber in place.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
