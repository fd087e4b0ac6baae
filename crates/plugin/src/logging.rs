//! File logging for the plugin.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Filter for a configured level, falling back to `info`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn log_path(dir: &Path, config: &LoggingConfig) -> PathBuf {
    dir.join(&config.file_name)
}

/// Install a file subscriber writing to `dir`.
///
/// Returns `Ok(false)` without touching the file when the host already set a
/// global subscriber; the plugin's events then flow into the host's.
pub fn init(dir: &Path, config: &LoggingConfig) -> Result<bool> {
    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }

    let path = log_path(dir, config);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file: {}", path.display()))?;

    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(env_filter(&config.level))
        .with_writer(Mutex::new(file))
        .finish();

    // Lost a race with the host.
    Ok(tracing::subscriber::set_global_default(subscriber).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_uses_file_name() {
        let config = LoggingConfig {
            file_name: "custom.log".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(
            log_path(Path::new("plugins"), &config),
            Path::new("plugins").join("custom.log")
        );
    }

    #[test]
    fn test_env_filter_falls_back_to_info() {
        assert_eq!(env_filter("debug").to_string(), "debug");
        assert_eq!(env_filter("passthru=loud").to_string(), "info");
    }

    #[test]
    fn test_init_reports_unwritable_log_path() {
        let dir = std::env::temp_dir()
            .join("passthru-logging-test")
            .join("missing");
        let err = init(&dir, &LoggingConfig::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to create log file"));
        assert!(!tracing::dispatcher::has_been_set());
    }
}
