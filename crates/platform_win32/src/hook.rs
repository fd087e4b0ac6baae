//! Subclass procedure installed on every hooked window.
//!
//! The procedure itself is stateless: it looks up the active controller,
//! lets it decide how the message is handled, and forwards to the window's
//! original procedure through `CallWindowProcW`.

use crate::from_hwnd;
use passthru_core::{Controller, Delegate, WindowProc};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{CallWindowProcW, DefWindowProcW, WNDPROC};

/// Controller that hooked windows dispatch through.
static ACTIVE: RwLock<Option<Arc<Controller>>> = RwLock::new(None);

/// Route hooked windows to `controller`.
///
/// Replaces any previously attached controller.
pub fn attach(controller: Arc<Controller>) {
    let previous = ACTIVE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(controller);
    if previous.is_some() {
        debug!("Replaced attached controller");
    }
}

/// Stop routing to the attached controller and hand it back.
///
/// Messages arriving afterwards go to `DefWindowProcW`.
pub fn detach() -> Option<Arc<Controller>> {
    ACTIVE.write().unwrap_or_else(PoisonError::into_inner).take()
}

fn active() -> Option<Arc<Controller>> {
    // Clone out so the lock is not held while the window procedure runs;
    // the controller may re-enter through SetWindowLongPtrW.
    ACTIVE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Hook procedure.
///
/// Wrapped with catch_unwind so a panic never unwinds into user32.
pub unsafe extern "system" fn passthru_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        passthru_wndproc_inner(hwnd, msg, wparam, lparam)
    }));

    match result {
        Ok(lresult) => lresult,
        Err(e) => {
            error!("Panic in passthru_wndproc: {:?}", e);
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }
    }
}

fn passthru_wndproc_inner(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let Some(controller) = active() else {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    };

    let result = controller.dispatch(from_hwnd(hwnd), msg, |delegate| match delegate {
        Delegate::Original(procedure) => unsafe {
            call_original(procedure, hwnd, msg, wparam, lparam)
        },
        Delegate::Default => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }.0,
    });
    LRESULT(result)
}

unsafe fn call_original(
    procedure: WindowProc,
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> isize {
    // SAFETY: `procedure` was read from GWLP_WNDPROC and is non-null, so it is
    // a valid WNDPROC (or a handle CallWindowProcW knows how to resolve).
    let original: WNDPROC = std::mem::transmute::<usize, WNDPROC>(procedure.0);
    CallWindowProcW(original, hwnd, msg, wparam, lparam).0
}
