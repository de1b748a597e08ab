//! # Printer Configuration
//!
//! Loaded the same way as the sync configuration: defaults, then
//! `printer.toml` from the platform config dir, then `RESTOBILL_PRINTER_*`
//! environment variables.
//!
//! ## Configuration File Format
//! ```toml
//! # printer.toml
//! [reconnect]
//! base_delay_ms = 1000
//! multiplier = 2.0
//! max_delay_ms = 30000
//! max_attempts = 5
//!
//! [health_check]
//! interval_secs = 30
//!
//! [queue]
//! capacity = 10
//! max_job_retries = 3
//!
//! [timeouts]
//! connect_secs = 10
//! write_secs = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{PrintError, PrintResult};

// =============================================================================
// Sections
// =============================================================================

/// Reconnect schedule after an unexpected disconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    /// Consecutive failures before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        ReconnectSettings {
            base_delay_ms: 1_000,
            multiplier: 2.0,
            max_delay_ms: 30_000,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckSettings {
    pub interval_secs: u64,
}

impl Default for HealthCheckSettings {
    fn default() -> Self {
        HealthCheckSettings { interval_secs: 30 }
    }
}

impl HealthCheckSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Jobs held while the printer is unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintQueueSettings {
    pub capacity: usize,
    /// Rewrites allowed after a job's first failed write. A job is dropped
    /// and reported once it has failed `max_job_retries + 1` times.
    pub max_job_retries: u32,
}

impl Default for PrintQueueSettings {
    fn default() -> Self {
        PrintQueueSettings {
            capacity: 10,
            max_job_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub connect_secs: u64,
    pub write_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        TimeoutSettings {
            connect_secs: 10,
            write_secs: 5,
        }
    }
}

// =============================================================================
// Printer Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrinterConfig {
    #[serde(default)]
    pub reconnect: ReconnectSettings,

    #[serde(default)]
    pub health_check: HealthCheckSettings,

    #[serde(default)]
    pub queue: PrintQueueSettings,

    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

impl PrinterConfig {
    /// Loads configuration from file, environment, and defaults.
    pub fn load(config_path: Option<PathBuf>) -> PrintResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading printer config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Printer config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load printer config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> PrintResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| PrintError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PrintError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| PrintError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Printer config saved");
        Ok(())
    }

    pub fn validate(&self) -> PrintResult<()> {
        let r = &self.reconnect;

        if r.base_delay_ms == 0 || r.max_delay_ms < r.base_delay_ms {
            return Err(PrintError::InvalidConfig(format!(
                "reconnect delays must satisfy 0 < base_delay_ms <= max_delay_ms (got {} / {})",
                r.base_delay_ms, r.max_delay_ms
            )));
        }

        if !r.multiplier.is_finite() || r.multiplier < 1.0 {
            return Err(PrintError::InvalidConfig(format!(
                "reconnect multiplier must be >= 1.0, got {}",
                r.multiplier
            )));
        }

        if r.max_attempts == 0 {
            return Err(PrintError::InvalidConfig("max_attempts must be greater than 0".into()));
        }

        if self.health_check.interval_secs == 0 {
            return Err(PrintError::InvalidConfig(
                "health_check interval_secs must be greater than 0".into(),
            ));
        }

        if self.queue.capacity == 0 {
            return Err(PrintError::InvalidConfig("queue capacity must be greater than 0".into()));
        }

        if self.timeouts.connect_secs == 0 || self.timeouts.write_secs == 0 {
            return Err(PrintError::InvalidConfig("timeouts must be greater than 0".into()));
        }

        Ok(())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parse_into<T: std::str::FromStr>(name: &str, raw: Option<String>, target: &mut T) {
            let Some(raw) = raw else {
                return;
            };
            match raw.parse() {
                Ok(value) => {
                    debug!(var = name, value = %raw, "Printer config override");
                    *target = value;
                }
                Err(_) => warn!(var = name, value = %raw, "Ignoring invalid printer override"),
            }
        }

        const MAX_RECONNECTS: &str = "RESTOBILL_PRINTER_MAX_RECONNECTS";
        const HEALTH_SECS: &str = "RESTOBILL_PRINTER_HEALTH_INTERVAL_SECS";
        const QUEUE_CAPACITY: &str = "RESTOBILL_PRINTER_QUEUE_CAPACITY";
        const MAX_DELAY_MS: &str = "RESTOBILL_PRINTER_MAX_DELAY_MS";

        parse_into(MAX_RECONNECTS, lookup(MAX_RECONNECTS), &mut self.reconnect.max_attempts);
        parse_into(HEALTH_SECS, lookup(HEALTH_SECS), &mut self.health_check.interval_secs);
        parse_into(QUEUE_CAPACITY, lookup(QUEUE_CAPACITY), &mut self.queue.capacity);
        parse_into(MAX_DELAY_MS, lookup(MAX_DELAY_MS), &mut self.reconnect.max_delay_ms);
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("in", "restobill", "pos")
            .map(|dirs| dirs.config_dir().join("printer.toml"))
    }
}
