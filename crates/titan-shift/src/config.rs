//! # Shift Service Configuration
//!
//! Configuration management for the shift service.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TITAN_DB_PATH=/var/lib/titan/titan.db                              │
//! │     TITAN_CASH_DISCREPANCY_CENTS=1000                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pos/shift.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.titan.pos/shift.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     8h standard shift, 5.00 discrepancy threshold, UTC                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # shift.toml
//! [database]
//! path = "/var/lib/titan/titan.db"
//! max_connections = 5
//!
//! [logging]
//! filter = "info,titan=debug,sqlx=warn"
//!
//! [business]
//! utc_offset_minutes = -300
//!
//! [policy]
//! standard_shift_secs = 28800
//! cash_discrepancy_threshold_cents = 500
//!
//! [policy.breaks]
//! meal_required_after_secs = 21600
//! meal_min_secs = 1800
//! ```
//!
//! Every key is optional; a partial file keeps the defaults for the rest.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use titan_core::calendar::MAX_OFFSET_MINUTES;
use titan_core::ShiftPolicy;
use titan_db::DbConfig;

use crate::error::{ShiftError, ShiftResult};

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,titan=debug,sqlx=warn";

// =============================================================================
// Database Settings
// =============================================================================

/// Where the shift store lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    /// `":memory:"` opens a throwaway in-memory store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directives. `RUST_LOG` wins over this.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Business Settings
// =============================================================================

/// Facts about the business the terminals belong to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessSettings {
    /// Local time offset used for "today" and ISO weeks, in minutes east
    /// of UTC (e.g. `-300` for UTC-05:00).
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete shift service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShiftConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub business: BusinessSettings,

    /// Thresholds the rule engine reads.
    #[serde(default)]
    pub policy: ShiftPolicy,
}

impl ShiftConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (shift.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ShiftResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading shift config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration, falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load shift config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Writes the configuration as pretty TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> ShiftResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ShiftError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Shift config saved");
        Ok(())
    }

    /// Rejects settings the service cannot run with.
    pub fn validate(&self) -> ShiftResult<()> {
        self.policy
            .validate()
            .map_err(|e| ShiftError::Config(format!("policy: {}", e)))?;

        if self.business.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ShiftError::Config(format!(
                "utc_offset_minutes must be within ±{}, got {}",
                MAX_OFFSET_MINUTES, self.business.utc_offset_minutes
            )));
        }

        if self.database.max_connections == 0 {
            return Err(ShiftError::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ShiftError::Config("logging filter must not be empty".into()));
        }

        Ok(())
    }

    /// Applies `TITAN_*` environment variables.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TITAN_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(filter) = std::env::var("TITAN_LOG") {
            self.logging.filter = filter;
        }

        if let Some(cents) = env_number::<i64>("TITAN_CASH_DISCREPANCY_CENTS") {
            debug!(cents, "Overriding cash discrepancy threshold from environment");
            self.policy.cash_discrepancy_threshold_cents = cents;
        }

        if let Some(secs) = env_number::<i64>("TITAN_STANDARD_SHIFT_SECS") {
            debug!(secs, "Overriding standard shift length from environment");
            self.policy.standard_shift_secs = secs;
        }

        if let Some(secs) = env_number::<i64>("TITAN_STALE_SHIFT_SECS") {
            debug!(secs, "Overriding stale shift threshold from environment");
            self.policy.stale_shift_secs = secs;
        }

        if let Some(minutes) = env_number::<i32>("TITAN_UTC_OFFSET_MINUTES") {
            debug!(minutes, "Overriding UTC offset from environment");
            self.business.utc_offset_minutes = minutes;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "titan", "pos")
            .map(|dirs| dirs.config_dir().join("shift.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Resolved SQLite path.
    ///
    /// - macOS: ~/Library/Application Support/com.titan.pos/titan.db
    /// - Linux: ~/.local/share/pos/titan.db
    /// - Fallback: ./titan.db
    pub fn database_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "titan", "pos")
                .map(|dirs| dirs.data_dir().join("titan.db"))
                .unwrap_or_else(|| PathBuf::from("titan.db"))
        })
    }

    /// Pool settings for [`titan_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        let path = self.database_path();
        if path.as_os_str() == ":memory:" {
            return DbConfig::in_memory();
        }
        DbConfig::new(path).max_connections(self.database.max_connections)
    }
}

/// Parses a numeric environment variable, warning on garbage.
fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring non-numeric environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShiftConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.policy.cash_discrepancy_threshold_cents, 500);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ShiftConfig::default();

        config.business.utc_offset_minutes = 15 * 60;
        assert!(config.validate().is_err());

        config.business.utc_offset_minutes = -300;
        assert!(config.validate().is_ok());

        config.policy.standard_shift_secs = 0;
        assert!(matches!(config.validate(), Err(ShiftError::Config(_))));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ShiftConfig = toml::from_str(
            r#"
            [business]
            utc_offset_minutes = 60

            [policy]
            cash_discrepancy_threshold_cents = 1000

            [policy.breaks]
            meal_min_secs = 2700
            "#,
        )
        .unwrap();

        assert_eq!(config.business.utc_offset_minutes, 60);
        assert_eq!(config.policy.cash_discrepancy_threshold_cents, 1000);
        assert_eq!(config.policy.breaks.meal_min_secs, 2700);
        assert_eq!(config.policy.standard_shift_secs, ShiftPolicy::default().standard_shift_secs);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_load_from_explicit_path() {
        let path = std::env::temp_dir().join(format!("titan-shift-{}.toml", titan_core::new_id()));
        std::fs::write(&path, "[database]\npath = \":memory:\"\n").unwrap();

        let config = ShiftConfig::load(Some(path.clone())).unwrap();
        assert_eq!(config.database.path, Some(PathBuf::from(":memory:")));
        assert_eq!(config.db_config().max_connections, 1);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_toml_serialization() {
        let config = ShiftConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[policy]"));
        assert!(toml_str.contains("[policy.breaks]"));

        let back: ShiftConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.policy, config.policy);
    }
}
