//! # Configuration
//!
//! Application settings, loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`LARDER_*`, e.g. `LARDER_DATABASE_PATH`)
//! 2. Config file (`larder.toml`, optional)
//! 3. Defaults (this file)
//!
//! Read-only after loading; pass it (or the pieces you need) explicitly.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::pool::DbConfig;

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "larder.toml";

/// Prefix of the environment overrides.
pub const ENV_PREFIX: &str = "LARDER";

/// Log filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,larder=debug,sqlx=warn";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    pub max_connections: u32,

    /// Apply pending migrations when the pool opens.
    pub run_migrations: bool,

    /// Currency code (ISO 4217)
    pub currency_code: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Whether the symbol follows the amount ("12 500 FCFA") or leads it ("$12.50").
    pub currency_symbol_after: bool,

    /// Number of decimal places for currency
    pub currency_decimals: u8,

    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("larder.db"),
            max_connections: 5,
            run_migrations: true,
            currency_code: "XOF".to_string(),
            currency_symbol: "FCFA".to_string(),
            currency_symbol_after: true,
            currency_decimals: 0,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads defaults, then `larder.toml` if present, then `LARDER_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Same as [`AppConfig::load`] with an explicit config file path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let config = Config::builder()
            .set_default(
                "database_path",
                defaults.database_path.to_string_lossy().into_owned(),
            )?
            .set_default("max_connections", defaults.max_connections)?
            .set_default("run_migrations", defaults.run_migrations)?
            .set_default("currency_code", defaults.currency_code)?
            .set_default("currency_symbol", defaults.currency_symbol)?
            .set_default("currency_symbol_after", defaults.currency_symbol_after)?
            .set_default("currency_decimals", defaults.currency_decimals)?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database_path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_connections".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.currency_decimals > 4 {
            return Err(ConfigError::InvalidValue {
                field: "currency_decimals".to_string(),
                reason: "must be between 0 and 4".to_string(),
            });
        }
        Ok(())
    }

    /// Pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        if self.database_path.as_os_str() == ":memory:" {
            return DbConfig::in_memory().run_migrations(self.run_migrations);
        }

        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .run_migrations(self.run_migrations)
    }

    /// Formats an amount in minimal units for display.
    ///
    /// ## Example
    /// ```rust
    /// use larder_db::config::AppConfig;
    ///
    /// let config = AppConfig::default(); // XOF, no decimals
    /// assert_eq!(config.format_money(12_500), "12500 FCFA");
    /// assert_eq!(config.format_money(-500), "-500 FCFA");
    /// ```
    pub fn format_money(&self, minor: i64) -> String {
        let divisor = 10_i64.pow(u32::from(self.currency_decimals));
        let whole = (minor / divisor).abs();
        let frac = (minor % divisor).abs();
        let sign = if minor < 0 { "-" } else { "" };

        let amount = if self.currency_decimals > 0 {
            format!(
                "{}.{:0width$}",
                whole,
                frac,
                width = self.currency_decimals as usize
            )
        } else {
            whole.to_string()
        };

        if self.currency_symbol_after {
            format!("{sign}{amount} {}", self.currency_symbol)
        } else {
            format!("{sign}{}{amount}", self.currency_symbol)
        }
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG` wins when set
/// - otherwise `filter` (usually [`AppConfig::log_filter`])
///
/// A subscriber that is already installed is left in place.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}
