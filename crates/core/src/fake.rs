//! In-memory window system for tests and headless runs.
//!
//! [`FakeWindows`] implements [`WindowSystem`], [`KeyboardState`] and
//! [`InputSink`] over a plain window table and records every mutating call
//! as a [`FakeEvent`]. [`InlineScheduler`] runs submitted tasks on the
//! calling thread, and pauses are recorded instead of slept.

use crate::hotkey::KeyboardState;
use crate::simulator::{InputSink, Task, TaskScheduler};
use crate::{WindowError, WindowHandle, WindowProc, WindowStyles, WindowSystem};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Hook procedure address reported by [`FakeWindows`].
pub const FAKE_HOOK: WindowProc = WindowProc(0x0000_5EED);

/// Something observable that happened to the fake system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeEvent {
    SetProc(WindowHandle, WindowProc),
    SetStyles(WindowHandle, WindowStyles),
    RefreshFrame(WindowHandle),
    RaiseTopmost(WindowHandle),
    Foreground(WindowHandle),
    CursorCorrected,
    ClipReleased,
    Key { vk: u16, down: bool },
    LeftButton { down: bool },
    Pause(Duration),
}

/// A window in the fake table.
#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub parent: Option<WindowHandle>,
    pub visible: bool,
    pub owned: bool,
    pub alive: bool,
    pub procedure: WindowProc,
    pub styles: WindowStyles,
    pub topmost: bool,
}

impl Default for FakeWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWindow {
    /// A visible, owned, plain top-level window.
    pub fn new() -> Self {
        Self {
            parent: None,
            visible: true,
            owned: true,
            alive: true,
            procedure: WindowProc::NONE,
            styles: WindowStyles::default(),
            topmost: false,
        }
    }

    pub fn child_of(mut self, parent: WindowHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn foreign(mut self) -> Self {
        self.owned = false;
        self
    }

    pub fn with_styles(mut self, style: isize, ex_style: isize) -> Self {
        self.styles = WindowStyles::new(style, ex_style);
        self
    }

    pub fn with_proc(mut self, procedure: WindowProc) -> Self {
        self.procedure = procedure;
        self
    }
}

type Reentry = Arc<dyn Fn(WindowHandle) + Send + Sync>;

#[derive(Default)]
struct FakeState {
    next_handle: usize,
    windows: BTreeMap<WindowHandle, FakeWindow>,
    keys: HashSet<u16>,
    events: Vec<FakeEvent>,
    child_queries: usize,
    refuse_foreground: bool,
    fail_proc_writes: bool,
}

/// In-memory window system.
#[derive(Default)]
pub struct FakeWindows {
    state: Mutex<FakeState>,
    reentry: Mutex<Option<Reentry>>,
}

impl FakeWindows {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a window and return its handle.
    ///
    /// A window without a procedure gets a unique one derived from its handle.
    pub fn add(&self, mut window: FakeWindow) -> WindowHandle {
        let mut state = self.state();
        state.next_handle += 1;
        let hwnd = WindowHandle(0x100 * state.next_handle);
        if window.procedure.is_none() {
            window.procedure = WindowProc(0xA000 + hwnd.0);
        }
        state.windows.insert(hwnd, window);
        hwnd
    }

    /// Mark a window as destroyed.
    pub fn destroy(&self, hwnd: WindowHandle) {
        if let Some(window) = self.state().windows.get_mut(&hwnd) {
            window.alive = false;
        }
    }

    pub fn window(&self, hwnd: WindowHandle) -> Option<FakeWindow> {
        self.state().windows.get(&hwnd).cloned()
    }

    /// Overwrite the installed procedure behind the controller's back.
    pub fn install_raw(&self, hwnd: WindowHandle, procedure: WindowProc) {
        if let Some(window) = self.state().windows.get_mut(&hwnd) {
            window.procedure = procedure;
        }
    }

    /// Set the keys currently held down.
    pub fn hold_keys(&self, keys: &[u16]) {
        let mut state = self.state();
        state.keys.clear();
        state.keys.extend(keys.iter().copied());
    }

    pub fn refuse_foreground(&self, refuse: bool) {
        self.state().refuse_foreground = refuse;
    }

    pub fn fail_proc_writes(&self, fail: bool) {
        self.state().fail_proc_writes = fail;
    }

    /// Callback invoked from inside every mutating window call, emulating
    /// messages that Win32 sends synchronously to the window.
    pub fn on_window_call(&self, callback: impl Fn(WindowHandle) + Send + Sync + 'static) {
        *self.reentry.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    fn reenter(&self, hwnd: WindowHandle) {
        let callback = self
            .reentry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(hwnd);
        }
    }

    pub fn events(&self) -> Vec<FakeEvent> {
        self.state().events.clone()
    }

    pub fn take_events(&self) -> Vec<FakeEvent> {
        std::mem::take(&mut self.state().events)
    }

    /// Number of windows currently running `procedure`.
    pub fn count_with_proc(&self, procedure: WindowProc) -> usize {
        self.state()
            .windows
            .values()
            .filter(|w| w.alive && w.procedure == procedure)
            .count()
    }

    pub fn child_queries(&self) -> usize {
        self.state().child_queries
    }

    fn record(&self, event: FakeEvent) {
        self.state().events.push(event);
    }

    fn live(&self, hwnd: WindowHandle) -> Result<(), WindowError> {
        match self.state().windows.get(&hwnd) {
            Some(window) if window.alive => Ok(()),
            _ => Err(WindowError::WindowNotFound(hwnd)),
        }
    }
}

impl WindowSystem for FakeWindows {
    fn hook_proc(&self) -> WindowProc {
        FAKE_HOOK
    }

    fn top_level_windows(&self) -> Vec<WindowHandle> {
        self.state()
            .windows
            .iter()
            .filter(|(_, w)| w.alive && w.parent.is_none())
            .map(|(hwnd, _)| *hwnd)
            .collect()
    }

    fn child_windows(&self, parent: WindowHandle) -> Vec<WindowHandle> {
        let mut state = self.state();
        state.child_queries += 1;

        // Depth-first, like EnumChildWindows.
        let mut found = Vec::new();
        let mut stack = vec![parent];
        while let Some(current) = stack.pop() {
            let children: Vec<WindowHandle> = state
                .windows
                .iter()
                .filter(|(_, w)| w.alive && w.parent == Some(current))
                .map(|(hwnd, _)| *hwnd)
                .collect();
            for child in children.into_iter().rev() {
                stack.push(child);
            }
            if current != parent {
                found.push(current);
            }
        }
        found
    }

    fn is_window(&self, hwnd: WindowHandle) -> bool {
        self.live(hwnd).is_ok()
    }

    fn is_visible(&self, hwnd: WindowHandle) -> bool {
        self.state()
            .windows
            .get(&hwnd)
            .is_some_and(|w| w.alive && w.visible)
    }

    fn is_owned(&self, hwnd: WindowHandle) -> bool {
        self.state().windows.get(&hwnd).is_some_and(|w| w.owned)
    }

    fn window_proc(&self, hwnd: WindowHandle) -> WindowProc {
        self.state()
            .windows
            .get(&hwnd)
            .filter(|w| w.alive)
            .map(|w| w.procedure)
            .unwrap_or(WindowProc::NONE)
    }

    fn set_window_proc(
        &self,
        hwnd: WindowHandle,
        procedure: WindowProc,
    ) -> Result<WindowProc, WindowError> {
        self.live(hwnd)?;
        self.reenter(hwnd);

        let mut state = self.state();
        if state.fail_proc_writes {
            return Err(WindowError::ProcedureSwapFailed(hwnd, "access denied".into()));
        }
        let window = state
            .windows
            .get_mut(&hwnd)
            .ok_or(WindowError::WindowNotFound(hwnd))?;
        let previous = std::mem::replace(&mut window.procedure, procedure);
        state.events.push(FakeEvent::SetProc(hwnd, procedure));
        Ok(previous)
    }

    fn styles(&self, hwnd: WindowHandle) -> WindowStyles {
        self.state()
            .windows
            .get(&hwnd)
            .map(|w| w.styles)
            .unwrap_or_default()
    }

    fn set_styles(&self, hwnd: WindowHandle, styles: WindowStyles) -> Result<(), WindowError> {
        self.live(hwnd)?;
        self.reenter(hwnd);

        let mut state = self.state();
        if let Some(window) = state.windows.get_mut(&hwnd) {
            window.styles = styles;
        }
        state.events.push(FakeEvent::SetStyles(hwnd, styles));
        Ok(())
    }

    fn refresh_frame(&self, hwnd: WindowHandle) -> Result<(), WindowError> {
        self.live(hwnd)?;
        self.reenter(hwnd);
        self.record(FakeEvent::RefreshFrame(hwnd));
        Ok(())
    }

    fn raise_topmost(&self, hwnd: WindowHandle) -> Result<(), WindowError> {
        self.live(hwnd)?;
        self.reenter(hwnd);

        let mut state = self.state();
        if let Some(window) = state.windows.get_mut(&hwnd) {
            window.topmost = true;
        }
        state.events.push(FakeEvent::RaiseTopmost(hwnd));
        Ok(())
    }

    fn force_foreground(&self, hwnd: WindowHandle) -> bool {
        let mut state = self.state();
        if state.refuse_foreground {
            return false;
        }
        state.events.push(FakeEvent::Foreground(hwnd));
        true
    }

    fn correct_cursor(&self) {
        self.record(FakeEvent::CursorCorrected);
    }

    fn release_cursor_clip(&self) {
        self.record(FakeEvent::ClipReleased);
    }
}

impl KeyboardState for FakeWindows {
    fn is_down(&self, vk: u16) -> bool {
        self.state().keys.contains(&vk)
    }
}

impl InputSink for FakeWindows {
    fn key(&self, vk: u16, down: bool) {
        self.record(FakeEvent::Key { vk, down });
    }

    fn left_button(&self, down: bool) {
        self.record(FakeEvent::LeftButton { down });
    }

    fn pause(&self, duration: Duration) {
        self.record(FakeEvent::Pause(duration));
    }
}

/// Scheduler that runs every task immediately on the submitting thread.
#[derive(Debug, Default)]
pub struct InlineScheduler {
    submitted: Mutex<Vec<String>>,
}

impl InlineScheduler {
    /// Names of all tasks submitted so far.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TaskScheduler for InlineScheduler {
    fn submit(&self, name: &str, task: Task) -> std::io::Result<()> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_string());
        task();
        Ok(())
    }
}

/// Scheduler that keeps tasks until [`DeferredScheduler::run_all`] is called.
#[derive(Default)]
pub struct DeferredScheduler {
    queue: Mutex<Vec<Task>>,
}

impl DeferredScheduler {
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn run_all(&self) {
        let tasks = std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            task();
        }
    }
}

impl TaskScheduler for DeferredScheduler {
    fn submit(&self, _name: &str, task: Task) -> std::io::Result<()> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_assigns_unique_procs() {
        let fake = FakeWindows::new();
        let a = fake.add(FakeWindow::new());
        let b = fake.add(FakeWindow::new());
        assert_ne!(a, b);
        assert_ne!(fake.window_proc(a), fake.window_proc(b));
        assert_ne!(fake.window_proc(a), FAKE_HOOK);
    }

    #[test]
    fn test_destroyed_window_is_gone() {
        let fake = FakeWindows::new();
        let a = fake.add(FakeWindow::new());
        fake.destroy(a);
        assert!(!fake.is_window(a));
        assert!(fake.top_level_windows().is_empty());
        assert!(fake.set_styles(a, WindowStyles::default()).is_err());
        assert_eq!(fake.window_proc(a), WindowProc::NONE);
    }

    #[test]
    fn test_set_window_proc_returns_previous() {
        let fake = FakeWindows::new();
        let a = fake.add(FakeWindow::new().with_proc(WindowProc(0x77)));
        assert_eq!(fake.set_window_proc(a, FAKE_HOOK).unwrap(), WindowProc(0x77));
        assert_eq!(fake.window_proc(a), FAKE_HOOK);
    }
}
