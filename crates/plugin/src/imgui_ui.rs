//! [`ImmediateUi`] over the host's Dear ImGui context.

use crate::settings_panel::ImmediateUi;
use imgui_sys as sys;
use std::ffi::{c_char, c_void, CString};

/// printf-style format used for every text widget.
const TEXT_FORMAT: &[u8] = b"%s\0";

fn c_string(text: &str) -> CString {
    CString::new(text).unwrap_or_default()
}

fn format_ptr() -> *const c_char {
    TEXT_FORMAT.as_ptr() as *const c_char
}

/// Route this module's ImGui allocations through the host's allocator.
///
/// # Safety
///
/// `alloc` and `free` must be null or valid `ImGuiMemAllocFunc` /
/// `ImGuiMemFreeFunc` pointers matching `user_data`.
pub unsafe fn set_allocator(alloc: *mut c_void, free: *mut c_void, user_data: *mut c_void) {
    if alloc.is_null() || free.is_null() {
        return;
    }
    let alloc = std::mem::transmute::<*mut c_void, sys::ImGuiMemAllocFunc>(alloc);
    let free = std::mem::transmute::<*mut c_void, sys::ImGuiMemFreeFunc>(free);
    sys::igSetAllocatorFunctions(alloc, free, user_data);
}

/// Widgets drawn into the current ImGui window.
pub struct ImguiUi {
    _bound: (),
}

impl ImguiUi {
    /// Make `context` current for this module's ImGui calls.
    ///
    /// # Safety
    ///
    /// `context` must be a live context of the same ImGui version, and the
    /// returned value used only on the host's render thread inside a frame.
    pub unsafe fn bind(context: *mut sys::ImGuiContext) -> Self {
        sys::igSetCurrentContext(context);
        Self { _bound: () }
    }
}

impl ImmediateUi for ImguiUi {
    fn text_wrapped(&mut self, text: &str) {
        let text = c_string(text);
        unsafe { sys::igTextWrapped(format_ptr(), text.as_ptr()) }
    }

    fn text(&mut self, text: &str) {
        let text = c_string(text);
        unsafe { sys::igText(format_ptr(), text.as_ptr()) }
    }

    fn separator(&mut self) {
        unsafe { sys::igSeparator() }
    }

    fn same_line(&mut self) {
        // ImGui defaults: no offset, default spacing.
        unsafe { sys::igSameLine(0.0, -1.0) }
    }

    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool {
        let label = c_string(label);
        unsafe { sys::igCheckbox(label.as_ptr(), value) }
    }

    fn begin_combo(&mut self, label: &str, preview: &str) -> bool {
        let label = c_string(label);
        let preview = c_string(preview);
        unsafe { sys::igBeginCombo(label.as_ptr(), preview.as_ptr(), 0) }
    }

    fn selectable(&mut self, label: &str, selected: bool) -> bool {
        let label = c_string(label);
        unsafe {
            sys::igSelectable_Bool(
                label.as_ptr(),
                selected,
                0,
                sys::ImVec2 { x: 0.0, y: 0.0 },
            )
        }
    }

    fn end_combo(&mut self) {
        unsafe { sys::igEndCombo() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings_panel::render;
    use passthru_core::fake::{FakeWindows, InlineScheduler};
    use passthru_core::keys::VK_HOME;
    use passthru_core::{Backend, Controller, Timing};
    use std::ptr;
    use std::sync::Arc;

    #[test]
    fn test_panel_draws_into_a_frame() {
        let fake = Arc::new(FakeWindows::new());
        let backend = Backend {
            windows: fake.clone(),
            keyboard: fake.clone(),
            input: fake,
            scheduler: Arc::new(InlineScheduler::default()),
        };
        let controller = Controller::new(backend, Timing::default());

        unsafe {
            let context = sys::igCreateContext(ptr::null_mut());
            let io = &mut *sys::igGetIO();
            io.DisplaySize = sys::ImVec2 { x: 800.0, y: 600.0 };
            io.DeltaTime = 1.0 / 60.0;

            let mut pixels: *mut u8 = ptr::null_mut();
            let (mut width, mut height, mut bytes_per_pixel) = (0, 0, 0);
            sys::ImFontAtlas_GetTexDataAsRGBA32(
                io.Fonts,
                &mut pixels,
                &mut width,
                &mut height,
                &mut bytes_per_pixel,
            );

            sys::igNewFrame();
            let mut ui = ImguiUi::bind(context);
            render(&mut ui, &controller);
            sys::igEndFrame();
            sys::igDestroyContext(context);
        }

        // Nothing was clicked.
        assert!(!controller.settings().passthrough());
        assert!(controller.settings().auto_repress());
        assert_eq!(controller.settings().hotkey().vk, VK_HOME);
    }
}
