//! Keyboard polling and input injection.

use crate::Win32Platform;
use passthru_core::keys::{VK_DELETE, VK_END, VK_HOME, VK_INSERT, VK_NEXT, VK_PRIOR};
use passthru_core::{InputSink, KeyboardState};
use std::mem;
use tracing::warn;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT,
    KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEINPUT, VIRTUAL_KEY,
};

/// Navigation keys live on the extended part of the keyboard; without the
/// flag they arrive as their numpad twins.
fn is_extended_key(vk: u16) -> bool {
    matches!(
        vk,
        VK_PRIOR | VK_NEXT | VK_END | VK_HOME | VK_INSERT | VK_DELETE
    )
}

fn send(input: INPUT, what: &str) {
    let sent = unsafe { SendInput(&[input], mem::size_of::<INPUT>() as i32) };
    if sent != 1 {
        warn!("SendInput dropped {}", what);
    }
}

impl KeyboardState for Win32Platform {
    fn is_down(&self, vk: u16) -> bool {
        // High bit: key is currently down.
        (unsafe { GetAsyncKeyState(vk as i32) } as u16 & 0x8000) != 0
    }
}

impl InputSink for Win32Platform {
    fn key(&self, vk: u16, down: bool) {
        let mut flags = if is_extended_key(vk) {
            KEYEVENTF_EXTENDEDKEY
        } else {
            KEYBD_EVENT_FLAGS(0)
        };
        if !down {
            flags |= KEYEVENTF_KEYUP;
        }

        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(vk),
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        send(input, "key event");
    }

    fn left_button(&self, down: bool) {
        let flags = if down {
            MOUSEEVENTF_LEFTDOWN
        } else {
            MOUSEEVENTF_LEFTUP
        };

        let input = INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: 0,
                    dy: 0,
                    mouseData: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        send(input, "mouse event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passthru_core::keys::{VK_A, VK_CONTROL, VK_F1};

    #[test]
    fn test_extended_keys() {
        assert!(is_extended_key(VK_HOME));
        assert!(is_extended_key(VK_NEXT));
        assert!(!is_extended_key(VK_A));
        assert!(!is_extended_key(VK_F1));
        assert!(!is_extended_key(VK_CONTROL));
    }
}
