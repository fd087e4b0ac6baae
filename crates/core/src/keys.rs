//! Virtual-key codes and the fixed set of keys offered as a hotkey.

use std::borrow::Cow;

pub const VK_SHIFT: u16 = 0x10;
pub const VK_CONTROL: u16 = 0x11;
pub const VK_MENU: u16 = 0x12;
pub const VK_PRIOR: u16 = 0x21;
pub const VK_NEXT: u16 = 0x22;
pub const VK_END: u16 = 0x23;
pub const VK_HOME: u16 = 0x24;
pub const VK_INSERT: u16 = 0x2D;
pub const VK_DELETE: u16 = 0x2E;
pub const VK_A: u16 = 0x41;
pub const VK_Z: u16 = 0x5A;
pub const VK_F1: u16 = 0x70;
pub const VK_F12: u16 = 0x7B;

/// Keys the settings panel offers, in display order. `0` means "no hotkey".
pub const SELECTABLE_KEYS: [u16; 45] = [
    0, 0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x7B, VK_INSERT,
    VK_DELETE, VK_HOME, VK_END, VK_PRIOR, VK_NEXT, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47,
    0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F, 0x50, 0x51, 0x52, 0x53, 0x54, 0x55, 0x56,
    0x57, 0x58, 0x59, 0x5A,
];

/// Human-readable name of a virtual key.
pub fn key_name(vk: u16) -> Cow<'static, str> {
    match vk {
        0 => Cow::Borrowed("None"),
        VK_F1..=VK_F12 => Cow::Owned(format!("F{}", vk - VK_F1 + 1)),
        VK_INSERT => Cow::Borrowed("Insert"),
        VK_DELETE => Cow::Borrowed("Delete"),
        VK_HOME => Cow::Borrowed("Home"),
        VK_END => Cow::Borrowed("End"),
        VK_PRIOR => Cow::Borrowed("Page Up"),
        VK_NEXT => Cow::Borrowed("Page Down"),
        VK_A..=VK_Z => Cow::Owned(char::from(vk as u8).to_string()),
        _ => Cow::Owned(format!("Key {}", vk)),
    }
}
