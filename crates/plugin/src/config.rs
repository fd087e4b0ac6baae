//! Plugin options.
//!
//! Loaded once at initialize from an optional `passthru.toml` placed next to
//! the plugin DLL. Options only tune logging and loop timing; runtime state
//! (passthrough, hotkey, auto-repress) is never read from or written to disk.

use anyhow::{Context, Result};
use passthru_core::Timing;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// File name looked up next to the plugin DLL.
pub const CONFIG_FILE_NAME: &str = "passthru.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const MIN_POLL_MS: u64 = 1;
const MAX_POLL_MS: u64 = 1000;
const MAX_SHUTDOWN_GRACE_MS: u64 = 5000;

/// Main configuration structure for the plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Worker loop timing.
    pub timing: TimingConfig,
}

/// Logging-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file name, created next to the plugin DLL.
    #[serde(default = "default_log_file_name")]
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_name: default_log_file_name(),
        }
    }
}

/// Worker loop timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Sleep between cycles while passthrough is on, in milliseconds.
    #[serde(default = "default_active_poll_ms")]
    pub active_poll_ms: u64,

    /// Sleep between cycles while passthrough is off, in milliseconds.
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Active cycles between registry prunes.
    #[serde(default = "default_prune_interval")]
    pub prune_interval: u32,

    /// How long shutdown waits for the worker, in milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            active_poll_ms: default_active_poll_ms(),
            idle_poll_ms: default_idle_poll_ms(),
            prune_interval: default_prune_interval(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl From<&TimingConfig> for Timing {
    fn from(config: &TimingConfig) -> Self {
        Timing {
            active_poll: Duration::from_millis(config.active_poll_ms),
            idle_poll: Duration::from_millis(config.idle_poll_ms),
            prune_interval: config.prune_interval,
            shutdown_grace: Duration::from_millis(config.shutdown_grace_ms),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file_name() -> String {
    "passthru.log".to_string()
}

fn default_active_poll_ms() -> u64 {
    10
}

fn default_idle_poll_ms() -> u64 {
    50
}

fn default_prune_interval() -> u32 {
    100
}

fn default_shutdown_grace_ms() -> u64 {
    200
}

/// A configuration value that was out of range and has been corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn clamp_poll(field: &'static str, value: &mut u64, warnings: &mut Vec<ConfigWarning>) {
    let clamped = (*value).clamp(MIN_POLL_MS, MAX_POLL_MS);
    if clamped != *value {
        warnings.push(ConfigWarning::new(
            field,
            format!(
                "{} out of range {}..={}, using {}",
                value, MIN_POLL_MS, MAX_POLL_MS, clamped
            ),
        ));
        *value = clamped;
    }
}

impl PluginConfig {
    /// Clamp out-of-range values in place.
    ///
    /// Returns one warning per corrected field.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let level = self.logging.level.trim().to_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            self.logging.level = level;
        } else {
            warnings.push(ConfigWarning::new(
                "logging.level",
                format!("unknown level {:?}, using \"info\"", self.logging.level),
            ));
            self.logging.level = default_log_level();
        }

        if self.logging.file_name.trim().is_empty() {
            warnings.push(ConfigWarning::new(
                "logging.file_name",
                "empty file name, using \"passthru.log\"",
            ));
            self.logging.file_name = default_log_file_name();
        }

        clamp_poll(
            "timing.active_poll_ms",
            &mut self.timing.active_poll_ms,
            &mut warnings,
        );
        clamp_poll(
            "timing.idle_poll_ms",
            &mut self.timing.idle_poll_ms,
            &mut warnings,
        );

        if self.timing.prune_interval == 0 {
            warnings.push(ConfigWarning::new("timing.prune_interval", "0 is not allowed, using 1"));
            self.timing.prune_interval = 1;
        }

        if self.timing.shutdown_grace_ms > MAX_SHUTDOWN_GRACE_MS {
            warnings.push(ConfigWarning::new(
                "timing.shutdown_grace_ms",
                format!(
                    "{} exceeds {}, using {}",
                    self.timing.shutdown_grace_ms, MAX_SHUTDOWN_GRACE_MS, MAX_SHUTDOWN_GRACE_MS
                ),
            ));
            self.timing.shutdown_grace_ms = MAX_SHUTDOWN_GRACE_MS;
        }

        warnings
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: PluginConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load and validate `passthru.toml` from `dir`.
    ///
    /// Never fails: a missing file gives defaults, an unreadable or
    /// unparsable one gives defaults plus a warning. Warnings are returned
    /// rather than logged because logging is configured from the result.
    pub fn load_from_dir(dir: &Path) -> (Self, Vec<ConfigWarning>) {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return (Self::default(), Vec::new());
        }

        match Self::load_from_path(&path) {
            Ok(mut config) => {
                let warnings = config.validate();
                (config, warnings)
            }
            Err(e) => (
                Self::default(),
                vec![ConfigWarning::new(CONFIG_FILE_NAME, format!("{:#}, using defaults", e))],
            ),
        }
    }
}
