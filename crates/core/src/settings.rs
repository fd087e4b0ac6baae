//! Runtime settings shared by the worker loop, the hook procedure and the
//! settings panel.
//!
//! Every field is an independent atomic. Reading the hotkey is not a single
//! atomic snapshot; a torn read across key and modifiers only ever produces
//! a combination that does not match for one poll cycle.

use crate::hotkey::Hotkey;
use crate::keys::VK_HOME;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

/// Process-wide controller settings. Reset to defaults on every load.
#[derive(Debug)]
pub struct Settings {
    passthrough: AtomicBool,
    hotkey_vk: AtomicU16,
    hotkey_ctrl: AtomicBool,
    hotkey_alt: AtomicBool,
    hotkey_shift: AtomicBool,
    auto_repress: AtomicBool,
    simulating: AtomicBool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            passthrough: AtomicBool::new(false),
            hotkey_vk: AtomicU16::new(VK_HOME),
            hotkey_ctrl: AtomicBool::new(false),
            hotkey_alt: AtomicBool::new(false),
            hotkey_shift: AtomicBool::new(false),
            auto_repress: AtomicBool::new(true),
            simulating: AtomicBool::new(false),
        }
    }
}

impl Settings {
    pub fn passthrough(&self) -> bool {
        self.passthrough.load(Ordering::SeqCst)
    }

    /// Store the passthrough mode and return the previous one.
    pub fn swap_passthrough(&self, enabled: bool) -> bool {
        self.passthrough.swap(enabled, Ordering::SeqCst)
    }

    pub fn hotkey(&self) -> Hotkey {
        Hotkey {
            vk: self.hotkey_vk.load(Ordering::Relaxed),
            ctrl: self.hotkey_ctrl.load(Ordering::Relaxed),
            alt: self.hotkey_alt.load(Ordering::Relaxed),
            shift: self.hotkey_shift.load(Ordering::Relaxed),
        }
    }

    pub fn set_hotkey(&self, hotkey: Hotkey) {
        self.hotkey_vk.store(hotkey.vk, Ordering::Relaxed);
        self.hotkey_ctrl.store(hotkey.ctrl, Ordering::Relaxed);
        self.hotkey_alt.store(hotkey.alt, Ordering::Relaxed);
        self.hotkey_shift.store(hotkey.shift, Ordering::Relaxed);
    }

    pub fn set_hotkey_key(&self, vk: u16) {
        self.hotkey_vk.store(vk, Ordering::Relaxed);
    }

    pub fn set_hotkey_ctrl(&self, on: bool) {
        self.hotkey_ctrl.store(on, Ordering::Relaxed);
    }

    pub fn set_hotkey_alt(&self, on: bool) {
        self.hotkey_alt.store(on, Ordering::Relaxed);
    }

    pub fn set_hotkey_shift(&self, on: bool) {
        self.hotkey_shift.store(on, Ordering::Relaxed);
    }

    pub fn auto_repress(&self) -> bool {
        self.auto_repress.load(Ordering::Relaxed)
    }

    pub fn set_auto_repress(&self, on: bool) {
        self.auto_repress.store(on, Ordering::Relaxed);
    }

    /// Whether a synthesized input sequence is in flight.
    pub fn simulating(&self) -> bool {
        self.simulating.load(Ordering::SeqCst)
    }

    pub fn set_simulating(&self, on: bool) {
        self.simulating.store(on, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.passthrough());
        assert_eq!(settings.hotkey(), Hotkey::key(VK_HOME));
        assert!(settings.auto_repress());
        assert!(!settings.simulating());
    }

    #[test]
    fn test_swap_passthrough_returns_previous() {
        let settings = Settings::default();
        assert!(!settings.swap_passthrough(true));
        assert!(settings.swap_passthrough(true));
        assert!(settings.swap_passthrough(false));
        assert!(!settings.passthrough());
    }

    #[test]
    fn test_hotkey_fields_are_independent() {
        let settings = Settings::default();
        settings.set_hotkey_ctrl(true);
        settings.set_hotkey_key(0x70);
        assert_eq!(
            settings.hotkey(),
            Hotkey {
                vk: 0x70,
                ctrl: true,
                alt: false,
                shift: false
            }
        );

        settings.set_hotkey(Hotkey::key(0));
        assert!(settings.hotkey().is_disabled());
        assert!(!settings.hotkey().ctrl);
    }
}
