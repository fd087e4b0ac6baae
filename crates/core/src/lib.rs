//! Passthru Core
//!
//! Platform-agnostic input passthrough controller.
//!
//! This crate owns everything that decides *what* happens to the windows of
//! the current process when passthrough is toggled:
//! - Runtime settings (passthrough mode, hotkey, auto-repress guard)
//! - Hotkey edge detection
//! - The window registry and hook-procedure dispatch rules
//! - Style/foreground coordination and full restore
//! - The auto-repress input plan
//! - The worker loop tying them together
//!
//! The actual window manipulation is performed through the [`WindowSystem`],
//! [`KeyboardState`] and [`InputSink`] traits, implemented for Win32 by the
//! `passthru-platform-win32` crate and, with the `test-support` feature, in
//! memory by `fake`.

pub mod controller;
pub mod enumerate;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
pub mod hotkey;
pub mod keys;
pub mod registry;
pub mod settings;
pub mod simulator;
pub mod style;

use std::fmt;
use thiserror::Error;

pub use controller::{Backend, Controller, Delegate, Timing, WorkerState};
pub use enumerate::WindowWalk;
pub use hotkey::{Hotkey, HotkeyEdge, KeyboardState};
pub use registry::{Registry, WindowRecord};
pub use settings::Settings;
pub use simulator::{InputSink, InputStep, TaskScheduler, ThreadScheduler};

/// Window messages the hook procedure inspects.
///
/// Values are the Win32 message and hit-test codes and must stay bit-exact.
pub mod msg {
    /// Cursor-set notification.
    pub const WM_SETCURSOR: u32 = 0x0020;
    /// Non-client hit-test query.
    pub const WM_NCHITTEST: u32 = 0x0084;
    /// Mouse-move notification.
    pub const WM_MOUSEMOVE: u32 = 0x0200;
    /// Left button pressed.
    pub const WM_LBUTTONDOWN: u32 = 0x0201;

    /// Hit-test answer: let the window underneath receive the input.
    pub const HTTRANSPARENT: isize = -1;
    /// Hit-test answer: the point is in the client area.
    pub const HTCLIENT: isize = 1;
    /// Generic "message handled" return value.
    pub const TRUE: isize = 1;
}

/// Window style bits touched by the style coordinator.
pub mod styles {
    /// Extended style: window is transparent to mouse input.
    pub const WS_EX_TRANSPARENT: isize = 0x0000_0020;
    /// Extended style: layered (alpha-composited) window.
    pub const WS_EX_LAYERED: isize = 0x0008_0000;
    /// Extended style: window never becomes the foreground window on click.
    pub const WS_EX_NOACTIVATE: isize = 0x0800_0000;
    /// Normal style: window ignores input.
    pub const WS_DISABLED: isize = 0x0800_0000;
}

/// Opaque handle of a window owned by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub usize);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Address of a window message procedure.
///
/// This is a non-owning reference: the procedure belongs to whoever created
/// the window. A zero address means "no procedure".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowProc(pub usize);

impl WindowProc {
    /// The null procedure.
    pub const NONE: WindowProc = WindowProc(0);

    /// Whether this is the null procedure.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

/// Normal and extended style words of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowStyles {
    pub style: isize,
    pub ex_style: isize,
}

impl WindowStyles {
    /// Create a style pair.
    pub fn new(style: isize, ex_style: isize) -> Self {
        Self { style, ex_style }
    }
}

/// Errors reported by a [`WindowSystem`] backend.
#[derive(Debug, Error)]
pub enum WindowError {
    #[error("Failed to replace window procedure of {0}: {1}")]
    ProcedureSwapFailed(WindowHandle, String),

    #[error("Failed to write styles of {0}: {1}")]
    StyleWriteFailed(WindowHandle, String),

    #[error("Failed to reposition window {0}: {1}")]
    PositionFailed(WindowHandle, String),

    #[error("Window not found: {0}")]
    WindowNotFound(WindowHandle),
}

/// Errors from the controller lifecycle.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Worker thread is already running")]
    AlreadyStarted,

    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

/// Window operations the controller needs from the OS.
///
/// Implementations must be callable from any thread. Calls that may send
/// messages to a window (procedure swap, style write, repositioning) can
/// re-enter the hook procedure synchronously, so the controller never holds
/// its registry lock while calling them.
pub trait WindowSystem: Send + Sync {
    /// Address of the hook procedure this backend installs.
    fn hook_proc(&self) -> WindowProc;

    /// All top-level windows, in OS enumeration order.
    fn top_level_windows(&self) -> Vec<WindowHandle>;

    /// All descendants of `parent`, in OS enumeration order.
    fn child_windows(&self, parent: WindowHandle) -> Vec<WindowHandle>;

    /// Whether the handle still refers to a live window.
    fn is_window(&self, hwnd: WindowHandle) -> bool;

    /// Whether the window is visible.
    fn is_visible(&self, hwnd: WindowHandle) -> bool;

    /// Whether the window belongs to the current process.
    fn is_owned(&self, hwnd: WindowHandle) -> bool;

    /// The currently installed message procedure.
    fn window_proc(&self, hwnd: WindowHandle) -> WindowProc;

    /// Install `procedure` and return the one it replaced.
    fn set_window_proc(
        &self,
        hwnd: WindowHandle,
        procedure: WindowProc,
    ) -> Result<WindowProc, WindowError>;

    /// Current normal and extended styles.
    fn styles(&self, hwnd: WindowHandle) -> WindowStyles;

    /// Overwrite normal and extended styles.
    fn set_styles(&self, hwnd: WindowHandle, styles: WindowStyles) -> Result<(), WindowError>;

    /// Redraw the frame without moving, resizing or changing z-order.
    fn refresh_frame(&self, hwnd: WindowHandle) -> Result<(), WindowError>;

    /// Make the window topmost and redraw its frame without moving or resizing.
    fn raise_topmost(&self, hwnd: WindowHandle) -> Result<(), WindowError>;

    /// Ask for the window to become the foreground window.
    ///
    /// Returns `false` if the OS refused.
    fn force_foreground(&self, hwnd: WindowHandle) -> bool;

    /// Arrow cursor, cursor visible, clipping released.
    fn correct_cursor(&self);

    /// Release any cursor clipping rectangle.
    fn release_cursor_clip(&self);
}
