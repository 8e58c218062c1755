//! # Terminal Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     LUMINA_STORE_NAME, LUMINA_TAX_RATE_BPS, LUMINA_DB_PATH ...          │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/lumina-ops/lumina.toml (Linux)                            │
//! │     ~/Library/Application Support/com.lumina.ops/lumina.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     16% IVA, MXN "$", 30 s settlement timeout                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # lumina.toml
//! store_name = "Lumina Ops Taller Centro"
//! currency_symbol = "$"
//! currency_decimals = 2
//! tax_rate_bps = 1600
//! settlement_timeout_ms = 30000
//! database_path = "/var/lib/lumina/lumina.db"
//! seed_on_start = true
//! history_limit = 20
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use lumina_core::validation::validate_tax_rate_bps;
use lumina_core::{Money, TaxRate, DEFAULT_TAX_RATE_BPS};

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// No explicit database path and no platform data directory.
    #[error("Could not determine app data directory")]
    NoDataDir,
}

/// Terminal configuration.
///
/// Every key is optional in the file; missing keys take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Printed on receipts.
    pub store_name: String,

    pub currency_symbol: String,

    /// Decimal places when formatting money.
    pub currency_decimals: u8,

    /// Cart tax rate in basis points (1600 = 16%).
    pub tax_rate_bps: u32,

    /// Upper bound on re-check + settlement before a checkout fails.
    pub settlement_timeout_ms: u64,

    /// Explicit database file. `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Write the embedded catalog into an empty database at start-up.
    pub seed_on_start: bool,

    /// Rows returned by `history`.
    pub history_limit: u32,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            store_name: "Lumina Ops".to_string(),
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
            settlement_timeout_ms: 30_000,
            database_path: None,
            seed_on_start: true,
            history_limit: 20,
        }
    }
}

impl TerminalConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (lumina.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading terminal config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_name.trim().is_empty() {
            return Err(ConfigError::Invalid("store_name must not be empty".into()));
        }

        validate_tax_rate_bps(self.tax_rate_bps)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.currency_decimals > 4 {
            return Err(ConfigError::Invalid(
                "currency_decimals must be at most 4".into(),
            ));
        }

        if self.settlement_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "settlement_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "history_limit must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `LUMINA_*` overrides read through `var`.
    ///
    /// Unparseable numbers are ignored with a warning; validation runs after.
    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = var("LUMINA_STORE_NAME") {
            self.store_name = name;
        }

        if let Some(symbol) = var("LUMINA_CURRENCY_SYMBOL") {
            self.currency_symbol = symbol;
        }

        if let Some(bps) = var("LUMINA_TAX_RATE_BPS") {
            match bps.parse::<u32>() {
                Ok(bps) => {
                    debug!(tax_rate_bps = bps, "Overriding tax rate from environment");
                    self.tax_rate_bps = bps;
                }
                Err(_) => warn!(value = %bps, "Ignoring non-numeric LUMINA_TAX_RATE_BPS"),
            }
        }

        if let Some(ms) = var("LUMINA_SETTLEMENT_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(ms) => self.settlement_timeout_ms = ms,
                Err(_) => warn!(value = %ms, "Ignoring non-numeric LUMINA_SETTLEMENT_TIMEOUT_MS"),
            }
        }

        if let Some(path) = var("LUMINA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(flag) = var("LUMINA_SEED_ON_START") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.seed_on_start = true,
                "0" | "false" | "no" => self.seed_on_start = false,
                _ => warn!(value = %flag, "Unknown LUMINA_SEED_ON_START value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "lumina", "ops")
            .map(|dirs| dirs.config_dir().join("lumina.toml"))
    }

    /// Database file to open, creating the data directory when defaulted.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.lumina.ops/lumina.db`
    /// - **Windows**: `%APPDATA%\lumina\ops\data\lumina.db`
    /// - **Linux**: `~/.local/share/lumina-ops/lumina.db`
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs =
            directories::ProjectDirs::from("com", "lumina", "ops").ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("lumina.db"))
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    pub fn settlement_timeout(&self) -> Duration {
        Duration::from_millis(self.settlement_timeout_ms)
    }

    /// Formats an amount with the configured symbol and decimals.
    ///
    /// ```rust,ignore
    /// let config = TerminalConfig::default();
    /// assert_eq!(config.format_currency(Money::from_cents(342200)), "$3422.00");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        let cents = amount.cents();
        let divisor = 10_i64.pow(self.currency_decimals as u32);
        let whole = cents / divisor;
        let frac = (cents % divisor).abs();

        format!(
            "{}{}{}",
            if cents < 0 { "-" } else { "" },
            self.currency_symbol,
            if self.currency_decimals > 0 {
                format!(
                    "{}.{:0width$}",
                    whole.abs(),
                    frac,
                    width = self.currency_decimals as usize
                )
            } else {
                whole.abs().to_string()
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = TerminalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tax_rate().bps(), 1600);
        assert_eq!(config.settlement_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TerminalConfig::from_toml(
            r#"
            store_name = "Taller Centro"
            settlement_timeout_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.store_name, "Taller Centro");
        assert_eq!(config.settlement_timeout_ms, 5000);
        assert_eq!(config.tax_rate_bps, DEFAULT_TAX_RATE_BPS);
        assert!(config.seed_on_start);
    }

    #[test]
    fn test_bad_toml_is_a_parse_error() {
        assert!(matches!(
            TerminalConfig::from_toml("tax_rate_bps = \"sixteen\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_fails_on_bad_file_and_defaults_on_missing_file() {
        let dir = std::env::temp_dir().join(format!("lumina-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let bad = dir.join("bad.toml");
        std::fs::write(&bad, "settlement_timeout_ms = 0\n").unwrap();
        assert!(matches!(
            TerminalConfig::load(Some(bad)),
            Err(ConfigError::Invalid(_))
        ));

        let missing = TerminalConfig::load(Some(dir.join("missing.toml"))).unwrap();
        assert_eq!(missing.tax_rate_bps, DEFAULT_TAX_RATE_BPS);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("LUMINA_STORE_NAME", "Sucursal Norte"),
            ("LUMINA_TAX_RATE_BPS", "800"),
            ("LUMINA_SETTLEMENT_TIMEOUT_MS", "not-a-number"),
            ("LUMINA_DB_PATH", "/tmp/lumina-test.db"),
            ("LUMINA_SEED_ON_START", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = TerminalConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store_name, "Sucursal Norte");
        assert_eq!(config.tax_rate_bps, 800);
        assert_eq!(config.settlement_timeout_ms, 30_000);
        assert_eq!(
            config.resolve_database_path().unwrap(),
            PathBuf::from("/tmp/lumina-test.db")
        );
        assert!(!config.seed_on_start);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = TerminalConfig::default();
        config.tax_rate_bps = 10_001;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = TerminalConfig::default();
        config.settlement_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = TerminalConfig::default();
        config.store_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_currency() {
        let config = TerminalConfig::default();
        assert_eq!(config.format_currency(Money::from_cents(342_200)), "$3422.00");
        assert_eq!(config.format_currency(Money::from_cents(1)), "$0.01");
        assert_eq!(config.format_currency(Money::from_cents(-1234)), "-$12.34");

        let whole = TerminalConfig {
            currency_decimals: 0,
            ..TerminalConfig::default()
        };
        assert_eq!(whole.format_currency(Money::from_cents(950)), "$950");
    }
}
