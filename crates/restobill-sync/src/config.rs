//! # Sync Configuration
//!
//! Configuration management for the sync layer.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RESTOBILL_API_URL=https://api.restobill.in/api                     │
//! │     RESTOBILL_SYNC_OVERFLOW=reject                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/restobill/sync.toml (Linux)                              │
//! │     ~/Library/Application Support/in.restobill.pos/sync.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [api]
//! base_url = "https://api.restobill.in/api"
//! request_timeout_secs = 15
//!
//! [queue]
//! capacity = 500
//! overflow = "drop_oldest"  # drop_oldest | reject
//! max_attempts = 3
//!
//! [cache]
//! ttl_secs = 300
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Overflow Policy
// =============================================================================

/// What `enqueue` does when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest item (reported to the emitter) and accept the new one.
    #[default]
    DropOldest,

    /// Refuse the new item with `SyncError::QueueFull`.
    Reject,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverflowPolicy::DropOldest => write!(f, "drop_oldest"),
            OverflowPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for OverflowPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop_oldest" | "drop-oldest" | "drop" => Ok(OverflowPolicy::DropOldest),
            "reject" => Ok(OverflowPolicy::Reject),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown overflow policy: '{}'. Valid options: drop_oldest, reject",
                other
            ))),
        }
    }
}

// =============================================================================
// API Settings
// =============================================================================

/// Where and how mutations are replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the REST API; replays go to `{base_url}/sync/{action}`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Bearer token sent with every replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            auth_token: None,
        }
    }
}

// =============================================================================
// Queue Settings
// =============================================================================

/// Bounds of the offline queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Maximum queued mutations.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Behavior when `capacity` is reached.
    #[serde(default)]
    pub overflow: OverflowPolicy,

    /// Failed replay attempts before an item is abandoned.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_capacity() -> usize {
    500
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for QueueSettings {
    fn default() -> Self {
        QueueSettings {
            capacity: default_capacity(),
            overflow: OverflowPolicy::default(),
            max_attempts: default_max_attempts(),
        }
    }
}

// =============================================================================
// Cache Settings
// =============================================================================

/// Offline cache freshness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Age (seconds) after which a snapshot is only served as stale.
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

fn default_ttl() -> u64 {
    300
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            ttl_secs: default_ttl(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub queue: QueueSettings,

    #[serde(default)]
    pub cache: CacheSettings,
}

impl SyncConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
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

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = Url::parse(&self.api.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.queue.capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "queue capacity must be greater than 0".into(),
            ));
        }

        if self.queue.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "max_attempts must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the environment in production).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("RESTOBILL_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(token) = lookup("RESTOBILL_API_TOKEN") {
            self.api.auth_token = Some(token);
        }

        if let Some(timeout) = lookup("RESTOBILL_API_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(t) => self.api.request_timeout_secs = t,
                Err(_) => warn!(value = %timeout, "Ignoring invalid RESTOBILL_API_TIMEOUT_SECS"),
            }
        }

        if let Some(capacity) = lookup("RESTOBILL_SYNC_QUEUE_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(c) => self.queue.capacity = c,
                Err(_) => warn!(value = %capacity, "Ignoring invalid RESTOBILL_SYNC_QUEUE_CAPACITY"),
            }
        }

        if let Some(policy) = lookup("RESTOBILL_SYNC_OVERFLOW") {
            match policy.parse() {
                Ok(p) => {
                    debug!(policy = %policy, "Overriding overflow policy from environment");
                    self.queue.overflow = p;
                }
                Err(_) => warn!(policy = %policy, "Unknown overflow policy in environment"),
            }
        }

        if let Some(ttl) = lookup("RESTOBILL_CACHE_TTL_SECS") {
            match ttl.parse::<u64>() {
                Ok(t) => self.cache.ttl_secs = t,
                Err(_) => warn!(value = %ttl, "Ignoring invalid RESTOBILL_CACHE_TTL_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("in", "restobill", "pos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_overflow_policy_parsing() {
        assert_eq!("drop_oldest".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::DropOldest);
        assert_eq!("REJECT".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::Reject);
        assert!("block".parse::<OverflowPolicy>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.overflow, OverflowPolicy::DropOldest);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();

        config.api.base_url = "ws://localhost:8000".to_string();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.api.base_url = "https://api.restobill.in".to_string();
        config.queue.capacity = 0;
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("RESTOBILL_API_URL", "https://api.restobill.in/api"),
            ("RESTOBILL_SYNC_OVERFLOW", "reject"),
            ("RESTOBILL_SYNC_QUEUE_CAPACITY", "not-a-number"),
            ("RESTOBILL_CACHE_TTL_SECS", "60"),
        ]);

        let mut config = SyncConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://api.restobill.in/api");
        assert_eq!(config.queue.overflow, OverflowPolicy::Reject);
        assert_eq!(config.queue.capacity, 500);
        assert_eq!(config.cache.ttl_secs, 60);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [queue]
            overflow = "reject"
            "#,
        )
        .unwrap();

        assert_eq!(config.queue.overflow, OverflowPolicy::Reject);
        assert_eq!(config.queue.capacity, 500);
        assert_eq!(config.api.request_timeout_secs, 15);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sync.toml");

        let mut config = SyncConfig::default();
        config.queue.capacity = 42;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[queue]"));

        let loaded: SyncConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.queue.capacity, 42);
    }
}
