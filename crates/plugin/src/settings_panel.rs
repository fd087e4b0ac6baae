//! Settings panel drawn inside the host's overlay.
//!
//! Widgets edit the controller's runtime settings directly; nothing here is
//! persisted.

use passthru_core::keys::{key_name, SELECTABLE_KEYS};
use passthru_core::Controller;

pub const HELP_TEXT: &str = "Input Blocker allows interaction with the overlay.";

/// The immediate-mode widgets the panel needs.
///
/// Mirrors the usual ImGui calls: a widget returns `true` on the frame the
/// user changed it.
pub trait ImmediateUi {
    fn text_wrapped(&mut self, text: &str);
    fn text(&mut self, text: &str);
    fn separator(&mut self);
    fn same_line(&mut self);
    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool;
    /// Returns `true` while the combo is open; `end_combo` must follow.
    fn begin_combo(&mut self, label: &str, preview: &str) -> bool;
    fn selectable(&mut self, label: &str, selected: bool) -> bool;
    fn end_combo(&mut self);
}

/// Draw one frame of the settings panel.
pub fn render(ui: &mut dyn ImmediateUi, controller: &Controller) {
    let settings = controller.settings();

    ui.text_wrapped(HELP_TEXT);
    ui.separator();

    let mut passthrough = settings.passthrough();
    if ui.checkbox("Enable Input Passthrough", &mut passthrough) {
        // Unchecking restores immediately, like the hotkey OFF transition.
        controller.set_passthrough(passthrough);
    }

    let mut auto_repress = settings.auto_repress();
    if ui.checkbox("Enable Auto Click & Repress", &mut auto_repress) {
        settings.set_auto_repress(auto_repress);
    }

    ui.separator();
    ui.text("Hotkey:");

    let hotkey = settings.hotkey();
    let mut ctrl = hotkey.ctrl;
    let mut alt = hotkey.alt;
    let mut shift = hotkey.shift;

    if ui.checkbox("Ctrl", &mut ctrl) {
        settings.set_hotkey_ctrl(ctrl);
    }
    ui.same_line();
    if ui.checkbox("Alt", &mut alt) {
        settings.set_hotkey_alt(alt);
    }
    ui.same_line();
    if ui.checkbox("Shift", &mut shift) {
        settings.set_hotkey_shift(shift);
    }

    if ui.begin_combo("Key", &key_name(hotkey.vk)) {
        for vk in SELECTABLE_KEYS {
            if ui.selectable(&key_name(vk), vk == hotkey.vk) {
                settings.set_hotkey_key(vk);
            }
        }
        ui.end_combo();
    }
}
