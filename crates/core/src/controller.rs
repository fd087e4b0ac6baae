//! The input passthrough controller.
//!
//! [`Controller`] owns the runtime [`Settings`], the window [`Registry`] and
//! the worker thread. It is shared behind an `Arc` between:
//! - the worker loop (hotkey polling, window processing, pruning)
//! - the hook procedure, running on each intercepted window's UI thread
//! - the settings panel and the plugin lifecycle
//!
//! # Lock discipline
//!
//! The registry mutex is only held for map operations. Every call into the
//! [`WindowSystem`] that may send a message to a window happens with the lock
//! released, because that message re-enters [`Controller::dispatch`] on the
//! window's thread, which takes the lock again.

use crate::enumerate::WindowWalk;
use crate::hotkey::{Hotkey, HotkeyEdge, KeyboardState};
use crate::msg;
use crate::registry::Registry;
use crate::settings::Settings;
use crate::simulator::{self, InputSink, TaskScheduler};
use crate::style::{self, Activation};
use crate::{ControllerError, WindowHandle, WindowProc, WindowSystem};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// How often a worker waits for itself to stop during shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(5);

/// Loop cadence and housekeeping intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Sleep between cycles while passthrough is on.
    pub active_poll: Duration,
    /// Sleep between cycles while passthrough is off.
    pub idle_poll: Duration,
    /// Active cycles between two registry prunes.
    pub prune_interval: u32,
    /// How long shutdown waits for the worker before forcing a restore.
    pub shutdown_grace: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            active_poll: Duration::from_millis(10),
            idle_poll: Duration::from_millis(50),
            prune_interval: 100,
            shutdown_grace: Duration::from_millis(200),
        }
    }
}

/// The OS-facing services a controller runs against.
#[derive(Clone)]
pub struct Backend {
    pub windows: Arc<dyn WindowSystem>,
    pub keyboard: Arc<dyn KeyboardState>,
    pub input: Arc<dyn InputSink>,
    pub scheduler: Arc<dyn TaskScheduler>,
}

/// Where the hook procedure should forward a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delegate {
    /// The window's original procedure.
    Original(WindowProc),
    /// The platform's default window procedure.
    Default,
}

/// Per-thread state of the worker loop.
#[derive(Debug, Default)]
pub struct WorkerState {
    edge: HotkeyEdge,
    active_cycles: u32,
}

/// Clears the `simulating` flag when the replay task ends, even on panic.
struct SimulationGuard(Arc<Settings>);

impl Drop for SimulationGuard {
    fn drop(&mut self) {
        self.0.set_simulating(false);
    }
}

/// Input passthrough controller.
pub struct Controller {
    settings: Arc<Settings>,
    registry: Registry,
    windows: Arc<dyn WindowSystem>,
    keyboard: Arc<dyn KeyboardState>,
    input: Arc<dyn InputSink>,
    scheduler: Arc<dyn TaskScheduler>,
    timing: Timing,
    hook: WindowProc,
    stop_requested: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller with default settings and an empty registry.
    pub fn new(backend: Backend, timing: Timing) -> Self {
        let hook = backend.windows.hook_proc();
        Self {
            settings: Arc::new(Settings::default()),
            registry: Registry::new(hook),
            windows: backend.windows,
            keyboard: backend.keyboard,
            input: backend.input,
            scheduler: backend.scheduler,
            timing,
            hook,
            stop_requested: AtomicBool::new(false),
            worker: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Address of the hook procedure this controller installs.
    pub fn hook_proc(&self) -> WindowProc {
        self.hook
    }

    // ------------------------------------------------------------------
    // Mode
    // ------------------------------------------------------------------

    /// Set passthrough mode from outside the worker loop.
    ///
    /// Switching off restores every intercepted window before returning.
    pub fn set_passthrough(&self, enabled: bool) {
        let previous = self.settings.swap_passthrough(enabled);
        if previous != enabled {
            info!("Passthrough set: {}", if enabled { "ON" } else { "OFF" });
        }
        if !enabled {
            self.restore_all();
        }
    }

    /// Flip passthrough in response to the hotkey.
    ///
    /// Returns the new mode.
    pub fn toggle_passthrough(&self, hotkey: &Hotkey) -> bool {
        let enabled = !self.settings.passthrough();
        self.settings.swap_passthrough(enabled);
        info!("Passthrough toggled: {}", if enabled { "ON" } else { "OFF" });

        if !enabled {
            self.restore_all();
        }

        if self.settings.auto_repress() {
            self.schedule_repress(enabled, hotkey);
        }

        enabled
    }

    /// Replay the input consumed by a toggle on a detached task.
    fn schedule_repress(&self, enabled: bool, hotkey: &Hotkey) {
        let plan = simulator::repress_plan(enabled, hotkey);
        debug!("Scheduling auto-repress ({} steps) for {}", plan.len(), hotkey);

        self.settings.set_simulating(true);
        let guard = SimulationGuard(Arc::clone(&self.settings));
        let input = Arc::clone(&self.input);
        let task = Box::new(move || {
            let _guard = guard;
            simulator::play(&plan, input.as_ref());
        });

        // A task that never ran drops its guard, clearing the flag.
        if let Err(e) = self.scheduler.submit("auto-repress", task) {
            warn!("Auto-repress skipped: {}", e);
        }
    }

    // ------------------------------------------------------------------
    // Hooking
    // ------------------------------------------------------------------

    /// Make sure the window runs the hook procedure.
    ///
    /// Returns `false` when the window is left unmanaged for this cycle.
    pub fn install(&self, hwnd: WindowHandle) -> bool {
        let current = self.windows.window_proc(hwnd);
        if current.is_none() {
            return false;
        }

        if current == self.hook {
            if self.registry.contains(hwnd) {
                return true;
            }
            // Re-installing would lose the real original procedure.
            warn!(
                "Window {} already runs the hook procedure but has no record; leaving it unmanaged",
                hwnd
            );
            return false;
        }

        self.registry.record_original_proc(hwnd, current);
        match self.windows.set_window_proc(hwnd, self.hook) {
            Ok(previous) => {
                // Someone subclassed the window between our read and our write.
                if previous != current {
                    self.registry.record_original_proc(hwnd, previous);
                }
                trace!("Hooked window {}", hwnd);
                true
            }
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }

    /// Put the original procedure back if the hook is still installed.
    pub fn uninstall(&self, hwnd: WindowHandle) {
        if self.windows.window_proc(hwnd) != self.hook {
            return;
        }
        let Some(original) = self.registry.original_proc(hwnd) else {
            return;
        };
        if let Err(e) = self.windows.set_window_proc(hwnd, original) {
            warn!("{}", e);
        }
    }

    /// Where to forward a message for `hwnd`.
    pub fn resolve_delegate(&self, hwnd: WindowHandle) -> Delegate {
        let procedure = match self.registry.original_proc(hwnd) {
            Some(procedure) => procedure,
            None => self.windows.window_proc(hwnd),
        };

        if procedure == self.hook || procedure.is_none() {
            Delegate::Default
        } else {
            Delegate::Original(procedure)
        }
    }

    /// Hook procedure body.
    ///
    /// `forward` invokes the resolved delegate with the original message
    /// parameters and returns its result.
    pub fn dispatch(
        &self,
        hwnd: WindowHandle,
        message: u32,
        forward: impl FnOnce(Delegate) -> isize,
    ) -> isize {
        if self.settings.passthrough()
            && (message == msg::WM_SETCURSOR || message == msg::WM_MOUSEMOVE)
        {
            self.windows.correct_cursor();
            if message == msg::WM_SETCURSOR {
                return msg::TRUE;
            }
        }

        if message == msg::WM_LBUTTONDOWN {
            trace!("WM_LBUTTONDOWN on {}", hwnd);
        }

        let result = forward(self.resolve_delegate(hwnd));

        if self.settings.passthrough()
            && message == msg::WM_NCHITTEST
            && result == msg::HTTRANSPARENT
        {
            return msg::HTCLIENT;
        }

        result
    }

    // ------------------------------------------------------------------
    // Style coordination
    // ------------------------------------------------------------------

    /// Hook a window and make it interactable.
    pub fn process_window(&self, hwnd: WindowHandle) {
        if !self.install(hwnd) || !self.settings.passthrough() {
            return;
        }

        let current = self.windows.styles(hwnd);
        let Some(observation) = self.registry.observe(hwnd, current) else {
            // Restored concurrently.
            return;
        };

        let target = style::interactable(current);
        let changed = target != current;
        if changed {
            if let Err(e) = self.windows.set_styles(hwnd, target) {
                warn!("{}", e);
            }
        }

        match style::plan_activation(observation.is_overlay, observation.first_activation, changed)
        {
            Activation::RaiseAndFocus => {
                if let Err(e) = self.windows.raise_topmost(hwnd) {
                    warn!("{}", e);
                }
                if !self.windows.force_foreground(hwnd) {
                    debug!("Foreground request for {} was refused", hwnd);
                }
            }
            Activation::RefreshFrame => {
                if let Err(e) = self.windows.refresh_frame(hwnd) {
                    warn!("{}", e);
                }
            }
            Activation::None => {}
        }
    }

    /// Undo every style change and procedure swap, then empty the registry.
    ///
    /// Returns the number of live windows that were restored.
    pub fn restore_all(&self) -> usize {
        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            return 0;
        }
        info!("Restoring {} windows...", snapshot.len());

        let mut restored = 0;
        let mut done = Vec::with_capacity(snapshot.len());
        for (hwnd, record) in snapshot {
            if !self.windows.is_window(hwnd) {
                done.push(hwnd);
                continue;
            }

            if record.styles_modified {
                match self.windows.set_styles(hwnd, record.original_styles) {
                    Ok(()) => self.registry.mark_styles_restored(hwnd),
                    Err(e) => warn!("{}", e),
                }
                if let Err(e) = self.windows.refresh_frame(hwnd) {
                    warn!("{}", e);
                }
            }

            let current = self.windows.window_proc(hwnd);
            if current == self.hook {
                if let Err(e) = self.windows.set_window_proc(hwnd, record.original_proc) {
                    // Keep the record so the hook can still forward to the original.
                    warn!("{}", e);
                    continue;
                }
            } else if current != record.original_proc {
                // Subclassed on top of the hook: the newer procedure still
                // chains into the hook, which needs the record to forward.
                warn!(
                    "Window {} was subclassed over the hook procedure; keeping its record",
                    hwnd
                );
                continue;
            }

            done.push(hwnd);
            restored += 1;
        }

        self.registry.forget(&done);
        restored
    }

    /// Drop records of windows that no longer exist.
    pub fn prune(&self) -> usize {
        let dead: Vec<WindowHandle> = self
            .registry
            .handles()
            .into_iter()
            .filter(|hwnd| !self.windows.is_window(*hwnd))
            .collect();

        let removed = self.registry.forget(&dead);
        if removed > 0 {
            debug!("Pruned {} destroyed windows", removed);
        }
        removed
    }

    /// Fresh walk over every window the controller should process.
    pub fn owned_windows(&self) -> WindowWalk<'_> {
        WindowWalk::new(self.windows.as_ref())
    }

    // ------------------------------------------------------------------
    // Worker loop
    // ------------------------------------------------------------------

    /// One worker iteration. Returns how long to sleep before the next one.
    pub fn poll_cycle(&self, state: &mut WorkerState) -> Duration {
        let hotkey = self.settings.hotkey();
        if state.edge.poll(&hotkey, self.keyboard.as_ref()) && !self.settings.simulating() {
            self.toggle_passthrough(&hotkey);
        }

        if !self.settings.passthrough() {
            return self.timing.idle_poll;
        }

        for hwnd in self.owned_windows() {
            if self.stop_requested() {
                break;
            }
            self.process_window(hwnd);
        }

        state.active_cycles += 1;
        if state.active_cycles >= self.timing.prune_interval {
            self.prune();
            state.active_cycles = 0;
        }

        self.windows.release_cursor_clip();
        self.timing.active_poll
    }

    fn run_worker(&self) {
        info!("Worker thread started");
        let mut state = WorkerState::default();
        while !self.stop_requested() {
            let pause = self.poll_cycle(&mut state);
            std::thread::sleep(pause);
        }

        // Nothing may stay hooked once the loop has exited.
        self.restore_all();
        info!("Worker thread stopped");
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Whether a worker thread has been started and not yet shut down.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn the worker thread.
    pub fn start(self: &Arc<Self>) -> Result<(), ControllerError> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return Err(ControllerError::AlreadyStarted);
        }

        self.stop_requested.store(false, Ordering::SeqCst);
        let controller = Arc::clone(self);
        let handle = std::thread::Builder::new()
            .name("passthru-worker".to_string())
            .spawn(move || controller.run_worker())?;
        *worker = Some(handle);
        Ok(())
    }

    /// Stop the worker and restore every window.
    ///
    /// Waits up to the shutdown grace period for the worker to exit, then
    /// restores regardless of whether it did.
    pub fn shutdown(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            let deadline = Instant::now() + self.timing.shutdown_grace;
            while !handle.is_finished() && Instant::now() < deadline {
                std::thread::sleep(SHUTDOWN_POLL);
            }

            if handle.is_finished() {
                if handle.join().is_err() {
                    warn!("Worker thread panicked");
                }
            } else {
                warn!(
                    "Worker thread did not stop within {:?}; forcing restore",
                    self.timing.shutdown_grace
                );
            }
        }

        self.restore_all();
    }
}
