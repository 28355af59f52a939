//! Configuration for Ignite.
//!
//! Loaded from `$IGNITE_CONFIG` when set, otherwise `~/.ignite/config.toml`.
//! A missing file is not an error; every field has a default.
//!
//! ```toml
//! [boot]
//! warmup_ms = 125
//! default_timeout_ms = 5000
//! missing_method = "abort"   # or "stall"
//! event_capacity = 256
//!
//! [log]
//! filter = "info,ignite_engine=debug"
//! ```

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use ignite_types::{DEFAULT_ITEM_TIMEOUT, MissingMethodPolicy};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "IGNITE_CONFIG";

const fn default_warmup_ms() -> u64 {
    125
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_ITEM_TIMEOUT.as_millis() as u64
}

const fn default_event_capacity() -> usize {
    256
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config at {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IgniteConfig {
    #[serde(default)]
    pub boot: BootConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Scheduler tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootConfig {
    /// Delay between `bootstrap` and the first phase. Default: 125.
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,
    /// Watchdog timeout for items registered without one. Default: 5000.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Behaviour when a target lacks its registered method. Default: abort.
    #[serde(default)]
    pub missing_method: MissingMethodPolicy,
    /// Buffer size of the boot event broadcast channel. Default: 256.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            warmup_ms: default_warmup_ms(),
            default_timeout_ms: default_timeout_ms(),
            missing_method: MissingMethodPolicy::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl BootConfig {
    #[must_use]
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    fn validate(&self) -> Result<(), String> {
        if self.default_timeout_ms == 0 {
            return Err("boot.default_timeout_ms must be greater than zero".to_string());
        }
        if self.event_capacity == 0 {
            return Err("boot.event_capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: Option<String>,
}

impl IgniteConfig {
    /// Load the config from the default location.
    ///
    /// Returns `Ok(None)` when no path can be determined or the file does not exist.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match Self::path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    /// Load and validate the config at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let config: Self = match toml::from_str(content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        config
            .boot
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                path: path.to_path_buf(),
                reason,
            })?;
        Ok(config)
    }

    /// Resolved config file path: `$IGNITE_CONFIG`, else `~/.ignite/config.toml`.
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path(env::var_os(CONFIG_ENV_VAR))
    }
}

fn config_path(override_path: Option<OsString>) -> Option<PathBuf> {
    match override_path {
        Some(raw) if !raw.is_empty() => Some(PathBuf::from(raw)),
        _ => dirs::home_dir().map(|home| home.join(".ignite").join("config.toml")),
    }
}
