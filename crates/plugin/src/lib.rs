//! Passthru Plugin
//!
//! Overlay-host plugin that lets the user click through the host's own
//! windows onto its overlay. Loaded as a DLL into the host process; the host
//! drives it through a small C ABI (see `exports`, Windows only).
//!
//! This crate handles:
//! - Plugin lifecycle (controller creation, worker start, shutdown)
//! - Plugin options from `passthru.toml` ([`config`])
//! - File logging next to the DLL ([`logging`])
//! - The settings panel ([`settings_panel`])

pub mod config;
pub mod logging;
pub mod settings_panel;

#[cfg(windows)]
mod exports;
#[cfg(windows)]
mod imgui_ui;

use config::PluginConfig;
use passthru_core::{Backend, Controller, ControllerError, Timing};
use std::sync::Arc;
use tracing::info;

/// Capability bit: the plugin draws a settings panel.
pub const ADDON_CAP_HAS_SETTINGS: u32 = 1;

/// Display name, NUL-terminated for the C ABI.
pub const ADDON_NAME: &str = "Input Blocker (Optimized)\0";

/// Crate version, NUL-terminated for the C ABI.
pub const ADDON_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// A loaded plugin instance.
pub struct Plugin {
    controller: Arc<Controller>,
}

impl Plugin {
    /// Create the controller without starting it.
    ///
    /// The hook procedure must be able to reach the controller before the
    /// worker installs it anywhere, so starting is a separate step.
    pub fn new(backend: Backend, config: &PluginConfig) -> Self {
        let timing = Timing::from(&config.timing);
        Self {
            controller: Arc::new(Controller::new(backend, timing)),
        }
    }

    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    /// Start the worker loop.
    pub fn start(&self) -> Result<(), ControllerError> {
        self.controller.start()?;
        info!(
            "{} {} started",
            ADDON_NAME.trim_end_matches('\0'),
            ADDON_VERSION.trim_end_matches('\0')
        );
        Ok(())
    }

    /// Stop the worker and restore every intercepted window.
    pub fn shutdown(self) -> Arc<Controller> {
        self.controller.shutdown();
        info!("Shutdown complete");
        self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passthru_core::fake::{FakeWindow, FakeWindows, InlineScheduler, FAKE_HOOK};
    use passthru_core::WindowSystem;
    use std::time::{Duration, Instant};

    fn plugin() -> (Arc<FakeWindows>, Plugin) {
        let fake = Arc::new(FakeWindows::new());
        let backend = Backend {
            windows: fake.clone(),
            keyboard: fake.clone(),
            input: fake.clone(),
            scheduler: Arc::new(InlineScheduler::default()),
        };
        (fake, Plugin::new(backend, &PluginConfig::default()))
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_identity_strings_are_nul_terminated() {
        assert_eq!(ADDON_NAME, "Input Blocker (Optimized)\0");
        assert!(ADDON_VERSION.ends_with('\0'));
        assert_eq!(ADDON_VERSION.matches('\0').count(), 1);
        assert_eq!(ADDON_CAP_HAS_SETTINGS, 1);
    }

    #[test]
    fn test_config_timing_reaches_controller() {
        let fake = Arc::new(FakeWindows::new());
        let backend = Backend {
            windows: fake.clone(),
            keyboard: fake.clone(),
            input: fake,
            scheduler: Arc::new(InlineScheduler::default()),
        };
        let mut config = PluginConfig::default();
        config.timing.prune_interval = 7;

        let plugin = Plugin::new(backend, &config);
        assert_eq!(plugin.controller().timing().prune_interval, 7);
    }

    #[test]
    fn test_start_hooks_then_shutdown_restores() {
        let (fake, plugin) = plugin();
        let hwnd = fake.add(FakeWindow::new());
        plugin.controller().set_passthrough(true);

        plugin.start().unwrap();
        assert!(matches!(
            plugin.start(),
            Err(ControllerError::AlreadyStarted)
        ));
        assert!(wait_for(|| fake.window_proc(hwnd) == FAKE_HOOK));

        let controller = plugin.shutdown();
        assert!(!controller.is_running());
        assert_eq!(fake.count_with_proc(FAKE_HOOK), 0);
        assert!(controller.registry().is_empty());
    }
}
