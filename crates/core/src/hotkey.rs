//! Hotkey combination and rising-edge detection.
//!
//! The worker loop samples physical key state once per cycle. A toggle fires
//! only on the transition from "combination not held" to "combination held",
//! so holding the key down never retriggers.

use crate::keys::{self, VK_CONTROL, VK_MENU, VK_SHIFT};
use std::fmt;

/// Source of physical key state.
pub trait KeyboardState: Send + Sync {
    /// Whether the virtual key is currently held down.
    fn is_down(&self, vk: u16) -> bool;
}

/// A key plus the exact set of modifiers that must accompany it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkey {
    /// Virtual key code; `0` disables the hotkey.
    pub vk: u16,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Default for Hotkey {
    fn default() -> Self {
        Self {
            vk: keys::VK_HOME,
            ctrl: false,
            alt: false,
            shift: false,
        }
    }
}

impl Hotkey {
    /// A bare key without modifiers.
    pub fn key(vk: u16) -> Self {
        Self {
            vk,
            ctrl: false,
            alt: false,
            shift: false,
        }
    }

    /// Whether the hotkey is switched off.
    pub fn is_disabled(&self) -> bool {
        self.vk == 0
    }

    /// Configured modifier keys in press order (Ctrl, Alt, Shift).
    pub fn modifiers(&self) -> Vec<u16> {
        [(self.ctrl, VK_CONTROL), (self.alt, VK_MENU), (self.shift, VK_SHIFT)]
            .into_iter()
            .filter_map(|(on, vk)| on.then_some(vk))
            .collect()
    }

    /// Whether the combination is held right now.
    ///
    /// Every modifier must match exactly: a modifier configured off must be
    /// physically released.
    pub fn is_held(&self, keyboard: &dyn KeyboardState) -> bool {
        if self.is_disabled() {
            return false;
        }

        keyboard.is_down(self.vk)
            && keyboard.is_down(VK_CONTROL) == self.ctrl
            && keyboard.is_down(VK_MENU) == self.alt
            && keyboard.is_down(VK_SHIFT) == self.shift
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        f.write_str(&keys::key_name(self.vk))
    }
}

/// Rising-edge detector for a [`Hotkey`].
#[derive(Debug, Default)]
pub struct HotkeyEdge {
    was_held: bool,
}

impl HotkeyEdge {
    /// Sample the keyboard; returns `true` only on a new press.
    pub fn poll(&mut self, hotkey: &Hotkey, keyboard: &dyn KeyboardState) -> bool {
        let held = hotkey.is_held(keyboard);
        let edge = held && !self.was_held;
        self.was_held = held;
        edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::VK_HOME;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Keys(Mutex<HashSet<u16>>);

    impl Keys {
        fn set(&self, down: &[u16]) {
            let mut keys = self.0.lock().unwrap();
            keys.clear();
            keys.extend(down.iter().copied());
        }
    }

    impl KeyboardState for Keys {
        fn is_down(&self, vk: u16) -> bool {
            self.0.lock().unwrap().contains(&vk)
        }
    }

    fn ctrl_home() -> Hotkey {
        Hotkey {
            ctrl: true,
            ..Hotkey::key(VK_HOME)
        }
    }

    #[test]
    fn test_default_hotkey_is_home() {
        let hotkey = Hotkey::default();
        assert_eq!(hotkey.vk, VK_HOME);
        assert!(hotkey.modifiers().is_empty());
    }

    #[test]
    fn test_single_edge_per_press() {
        let keys = Keys::default();
        let hotkey = ctrl_home();
        let mut edge = HotkeyEdge::default();

        let samples: [&[u16]; 4] = [
            &[],
            &[VK_HOME, VK_CONTROL],
            &[VK_HOME, VK_CONTROL],
            &[],
        ];
        let fired: Vec<bool> = samples
            .iter()
            .map(|down| {
                keys.set(down);
                edge.poll(&hotkey, &keys)
            })
            .collect();

        assert_eq!(fired, vec![false, true, false, false]);
    }

    #[test]
    fn test_extra_modifier_blocks_match() {
        let keys = Keys::default();
        let hotkey = ctrl_home();
        keys.set(&[VK_HOME, VK_CONTROL, VK_SHIFT]);
        assert!(!hotkey.is_held(&keys));

        keys.set(&[VK_HOME]);
        assert!(!hotkey.is_held(&keys));

        keys.set(&[VK_HOME, VK_CONTROL]);
        assert!(hotkey.is_held(&keys));
    }

    #[test]
    fn test_modifier_released_then_pressed_is_new_edge() {
        let keys = Keys::default();
        let hotkey = ctrl_home();
        let mut edge = HotkeyEdge::default();

        keys.set(&[VK_HOME, VK_CONTROL]);
        assert!(edge.poll(&hotkey, &keys));
        // Shift joins: combination no longer matches exactly.
        keys.set(&[VK_HOME, VK_CONTROL, VK_SHIFT]);
        assert!(!edge.poll(&hotkey, &keys));
        keys.set(&[VK_HOME, VK_CONTROL]);
        assert!(edge.poll(&hotkey, &keys));
    }

    #[test]
    fn test_disabled_hotkey_never_fires() {
        let keys = Keys::default();
        let hotkey = Hotkey::key(0);
        let mut edge = HotkeyEdge::default();
        keys.set(&[0, VK_HOME]);
        assert!(!edge.poll(&hotkey, &keys));
        assert!(!edge.poll(&hotkey, &keys));
    }

    #[test]
    fn test_modifier_order_and_display() {
        let hotkey = Hotkey {
            vk: 0x41,
            ctrl: true,
            alt: true,
            shift: true,
        };
        assert_eq!(hotkey.modifiers(), vec![VK_CONTROL, VK_MENU, VK_SHIFT]);
        assert_eq!(hotkey.to_string(), "Ctrl+Alt+Shift+A");
        assert_eq!(ctrl_home().to_string(), "Ctrl+Home");
    }
}
