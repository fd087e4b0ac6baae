//! Passthru Platform Win32
//!
//! Windows implementation of the controller's backend traits.
//!
//! This crate handles:
//! - Enumeration of top-level and child windows via EnumWindows/EnumChildWindows
//! - Window procedure and style reads/writes via Get/SetWindowLongPtrW
//! - Frame redraws and topmost raises via SetWindowPos
//! - Foreground forcing with AttachThreadInput
//! - Cursor correction, key state polling and SendInput injection
//! - The subclass procedure installed on hooked windows ([`hook`])

#![cfg(windows)]

pub mod hook;
pub mod input;
mod module;

pub use module::module_directory;

use passthru_core::{WindowError, WindowHandle, WindowProc, WindowStyles, WindowSystem};
use std::ffi::c_void;
use thiserror::Error;
use tracing::{debug, trace};
use windows::Win32::Foundation::{GetLastError, SetLastError, BOOL, HWND, LPARAM, WIN32_ERROR};
use windows::Win32::System::Threading::{AttachThreadInput, GetCurrentProcessId, GetCurrentThreadId};
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, ClipCursor, EnumChildWindows, EnumWindows, GetCursorInfo,
    GetForegroundWindow, GetWindowThreadProcessId, IsWindow, IsWindowVisible, LoadCursorW,
    SetCursor, SetForegroundWindow, SetWindowPos, ShowCursor, CURSORINFO, CURSOR_SHOWING,
    GWLP_WNDPROC, GWL_EXSTYLE, GWL_STYLE, HWND_TOPMOST, IDC_ARROW, SET_WINDOW_POS_FLAGS,
    SWP_FRAMECHANGED, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER, WINDOW_LONG_PTR_INDEX,
};

/// Upper bound on ShowCursor increments when un-hiding the cursor.
const MAX_SHOW_CURSOR_CALLS: usize = 16;

/// Errors that can occur during Win32 operations.
#[derive(Debug, Error)]
pub enum Win32Error {
    #[error("{call} failed: {source}")]
    Api {
        call: &'static str,
        #[source]
        source: windows::core::Error,
    },

    #[error("{call} failed with error code {code}")]
    LastError { call: &'static str, code: u32 },
}

impl Win32Error {
    fn api(call: &'static str) -> impl FnOnce(windows::core::Error) -> Self {
        move |source| Win32Error::Api { call, source }
    }
}

pub fn to_hwnd(hwnd: WindowHandle) -> HWND {
    HWND(hwnd.0 as *mut c_void)
}

pub fn from_hwnd(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as usize)
}

#[cfg(target_pointer_width = "64")]
unsafe fn read_long(hwnd: HWND, index: WINDOW_LONG_PTR_INDEX) -> isize {
    windows::Win32::UI::WindowsAndMessaging::GetWindowLongPtrW(hwnd, index)
}

#[cfg(target_pointer_width = "32")]
unsafe fn read_long(hwnd: HWND, index: WINDOW_LONG_PTR_INDEX) -> isize {
    windows::Win32::UI::WindowsAndMessaging::GetWindowLongW(hwnd, index) as isize
}

#[cfg(target_pointer_width = "64")]
unsafe fn raw_write_long(hwnd: HWND, index: WINDOW_LONG_PTR_INDEX, value: isize) -> isize {
    windows::Win32::UI::WindowsAndMessaging::SetWindowLongPtrW(hwnd, index, value)
}

#[cfg(target_pointer_width = "32")]
unsafe fn raw_write_long(hwnd: HWND, index: WINDOW_LONG_PTR_INDEX, value: isize) -> isize {
    windows::Win32::UI::WindowsAndMessaging::SetWindowLongW(hwnd, index, value as i32) as isize
}

/// Write a window long and return the previous value.
///
/// A previous value of zero is ambiguous, so the last-error code is cleared
/// before the call and inspected after it.
fn write_long(
    hwnd: HWND,
    index: WINDOW_LONG_PTR_INDEX,
    value: isize,
    call: &'static str,
) -> Result<isize, Win32Error> {
    unsafe {
        SetLastError(WIN32_ERROR(0));
        let previous = raw_write_long(hwnd, index, value);
        if previous == 0 {
            let code = GetLastError();
            if code.0 != 0 {
                return Err(Win32Error::LastError { call, code: code.0 });
            }
        }
        Ok(previous)
    }
}

/// EnumWindows/EnumChildWindows callback collecting into a `Vec<WindowHandle>`.
unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let found = &mut *(lparam.0 as *mut Vec<WindowHandle>);
    found.push(from_hwnd(hwnd));
    BOOL(1)
}

fn reposition(
    hwnd: WindowHandle,
    insert_after: Option<HWND>,
    flags: SET_WINDOW_POS_FLAGS,
) -> Result<(), WindowError> {
    unsafe { SetWindowPos(to_hwnd(hwnd), insert_after, 0, 0, 0, 0, flags) }
        .map_err(Win32Error::api("SetWindowPos"))
        .map_err(|e| WindowError::PositionFailed(hwnd, e.to_string()))
}

/// Win32 window backend for the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Platform;

impl Win32Platform {
    pub fn new() -> Self {
        Self
    }
}

impl WindowSystem for Win32Platform {
    #[allow(clippy::fn_to_numeric_cast)]
    fn hook_proc(&self) -> WindowProc {
        WindowProc(hook::passthru_wndproc as usize)
    }

    fn top_level_windows(&self) -> Vec<WindowHandle> {
        let mut found: Vec<WindowHandle> = Vec::new();
        let result = unsafe {
            EnumWindows(
                Some(collect_window),
                LPARAM(&mut found as *mut Vec<WindowHandle> as isize),
            )
        };
        if let Err(e) = result {
            debug!("EnumWindows stopped early: {}", e);
        }
        found
    }

    fn child_windows(&self, parent: WindowHandle) -> Vec<WindowHandle> {
        let mut found: Vec<WindowHandle> = Vec::new();
        // Returns FALSE both for "no children" and for failure.
        let _ = unsafe {
            EnumChildWindows(
                Some(to_hwnd(parent)),
                Some(collect_window),
                LPARAM(&mut found as *mut Vec<WindowHandle> as isize),
            )
        };
        found
    }

    fn is_window(&self, hwnd: WindowHandle) -> bool {
        unsafe { IsWindow(Some(to_hwnd(hwnd))) }.as_bool()
    }

    fn is_visible(&self, hwnd: WindowHandle) -> bool {
        unsafe { IsWindowVisible(to_hwnd(hwnd)) }.as_bool()
    }

    fn is_owned(&self, hwnd: WindowHandle) -> bool {
        let mut process_id = 0u32;
        unsafe {
            GetWindowThreadProcessId(to_hwnd(hwnd), Some(&mut process_id as *mut u32));
            process_id == GetCurrentProcessId()
        }
    }

    fn window_proc(&self, hwnd: WindowHandle) -> WindowProc {
        WindowProc(unsafe { read_long(to_hwnd(hwnd), GWLP_WNDPROC) } as usize)
    }

    fn set_window_proc(
        &self,
        hwnd: WindowHandle,
        procedure: WindowProc,
    ) -> Result<WindowProc, WindowError> {
        write_long(
            to_hwnd(hwnd),
            GWLP_WNDPROC,
            procedure.0 as isize,
            "SetWindowLongPtrW(GWLP_WNDPROC)",
        )
        .map(|previous| WindowProc(previous as usize))
        .map_err(|e| WindowError::ProcedureSwapFailed(hwnd, e.to_string()))
    }

    fn styles(&self, hwnd: WindowHandle) -> WindowStyles {
        let raw = to_hwnd(hwnd);
        unsafe { WindowStyles::new(read_long(raw, GWL_STYLE), read_long(raw, GWL_EXSTYLE)) }
    }

    fn set_styles(&self, hwnd: WindowHandle, styles: WindowStyles) -> Result<(), WindowError> {
        let raw = to_hwnd(hwnd);
        write_long(raw, GWL_STYLE, styles.style, "SetWindowLongPtrW(GWL_STYLE)")
            .and_then(|_| {
                write_long(
                    raw,
                    GWL_EXSTYLE,
                    styles.ex_style,
                    "SetWindowLongPtrW(GWL_EXSTYLE)",
                )
            })
            .map(|_| ())
            .map_err(|e| WindowError::StyleWriteFailed(hwnd, e.to_string()))
    }

    fn refresh_frame(&self, hwnd: WindowHandle) -> Result<(), WindowError> {
        reposition(
            hwnd,
            None,
            SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_FRAMECHANGED,
        )
    }

    fn raise_topmost(&self, hwnd: WindowHandle) -> Result<(), WindowError> {
        reposition(
            hwnd,
            Some(HWND_TOPMOST),
            SWP_NOMOVE | SWP_NOSIZE | SWP_FRAMECHANGED,
        )
    }

    fn force_foreground(&self, hwnd: WindowHandle) -> bool {
        let target = to_hwnd(hwnd);
        unsafe {
            let foreground = GetForegroundWindow();
            let foreground_thread = GetWindowThreadProcessId(foreground, None);
            let current_thread = GetCurrentThreadId();

            // Input must be attached to the foreground thread or Windows
            // refuses to hand over focus.
            let attached = foreground_thread != 0
                && foreground_thread != current_thread
                && AttachThreadInput(current_thread, foreground_thread, true).as_bool();

            let _ = BringWindowToTop(target);
            let granted = SetForegroundWindow(target).as_bool();

            if attached {
                let _ = AttachThreadInput(current_thread, foreground_thread, false);
            }

            if !granted {
                trace!("SetForegroundWindow refused for {}", hwnd);
            }
            granted
        }
    }

    fn correct_cursor(&self) {
        self.release_cursor_clip();

        unsafe {
            let mut info = CURSORINFO {
                cbSize: std::mem::size_of::<CURSORINFO>() as u32,
                ..Default::default()
            };
            if GetCursorInfo(&mut info).is_ok() && (info.flags.0 & CURSOR_SHOWING.0) == 0 {
                // ShowCursor is a counter; bump it until the cursor is visible.
                for _ in 0..MAX_SHOW_CURSOR_CALLS {
                    if ShowCursor(true) >= 0 {
                        break;
                    }
                }
            }

            if let Ok(arrow) = LoadCursorW(None, IDC_ARROW) {
                SetCursor(Some(arrow));
            }
        }
    }

    fn release_cursor_clip(&self) {
        if let Err(e) = unsafe { ClipCursor(None) } {
            trace!("ClipCursor(None) failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passthru_core::{msg, styles};
    use windows::Win32::UI::WindowsAndMessaging::{
        HTCLIENT, HTTRANSPARENT, WM_LBUTTONDOWN, WM_MOUSEMOVE, WM_NCHITTEST, WM_SETCURSOR,
        WS_DISABLED, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TRANSPARENT,
    };

    #[test]
    fn test_message_constants_match_win32() {
        assert_eq!(msg::WM_SETCURSOR, WM_SETCURSOR);
        assert_eq!(msg::WM_NCHITTEST, WM_NCHITTEST);
        assert_eq!(msg::WM_MOUSEMOVE, WM_MOUSEMOVE);
        assert_eq!(msg::WM_LBUTTONDOWN, WM_LBUTTONDOWN);
        assert_eq!(msg::HTTRANSPARENT, HTTRANSPARENT as isize);
        assert_eq!(msg::HTCLIENT, HTCLIENT as isize);
    }

    #[test]
    fn test_style_constants_match_win32() {
        assert_eq!(styles::WS_EX_TRANSPARENT, WS_EX_TRANSPARENT.0 as isize);
        assert_eq!(styles::WS_EX_LAYERED, WS_EX_LAYERED.0 as isize);
        assert_eq!(styles::WS_EX_NOACTIVATE, WS_EX_NOACTIVATE.0 as isize);
        assert_eq!(styles::WS_DISABLED, WS_DISABLED.0 as isize);
    }

    #[test]
    fn test_handle_conversion() {
        let handle = WindowHandle(0x1234);
        assert_eq!(from_hwnd(to_hwnd(handle)), handle);
    }

    #[test]
    fn test_hook_proc_is_stable() {
        let platform = Win32Platform::new();
        assert_eq!(platform.hook_proc(), platform.hook_proc());
        assert!(!platform.hook_proc().is_none());
    }

    #[test]
    fn test_enumeration_skips_foreign_windows() {
        // A test process owns no windows.
        let platform = Win32Platform::new();
        let owned: Vec<_> = platform
            .top_level_windows()
            .into_iter()
            .filter(|hwnd| platform.is_owned(*hwnd))
            .collect();
        assert!(owned.is_empty());
    }

    #[test]
    fn test_null_handle_is_not_a_window() {
        assert!(!Win32Platform::new().is_window(WindowHandle(0)));
    }
}
