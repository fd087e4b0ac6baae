//! Registry of intercepted windows.
//!
//! One [`WindowRecord`] per window handle, guarded by a single mutex. The
//! registry never calls into the window system itself, so holding its lock
//! can never re-enter the hook procedure.

use crate::style;
use crate::{WindowHandle, WindowProc, WindowStyles};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Saved interception state of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRecord {
    /// Procedure that was installed before the hook. Never the hook itself.
    pub original_proc: WindowProc,
    /// Styles observed the first time the window was processed.
    pub original_styles: WindowStyles,
    /// Whether `original_styles` holds a snapshot.
    pub styles_modified: bool,
    /// Whether the window has been raised/focused once.
    pub activated: bool,
    /// Overlay classification, fixed at the first style snapshot.
    pub is_overlay: bool,
}

impl WindowRecord {
    fn new(original_proc: WindowProc) -> Self {
        Self {
            original_proc,
            original_styles: WindowStyles::default(),
            styles_modified: false,
            activated: false,
            is_overlay: false,
        }
    }
}

/// Result of recording a style observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// The window had never been activated before this observation.
    pub first_activation: bool,
    /// Overlay classification from the first snapshot.
    pub is_overlay: bool,
}

/// Mapping from window handle to interception state.
#[derive(Debug)]
pub struct Registry {
    hook: WindowProc,
    records: Mutex<HashMap<WindowHandle, WindowRecord>>,
}

impl Registry {
    /// Create an empty registry that refuses to record `hook` as an original.
    pub fn new(hook: WindowProc) -> Self {
        Self {
            hook,
            records: Mutex::new(HashMap::new()),
        }
    }

    // The hook procedure must keep working after a panic elsewhere, so a
    // poisoned lock is recovered rather than propagated.
    fn records(&self) -> MutexGuard<'_, HashMap<WindowHandle, WindowRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn contains(&self, hwnd: WindowHandle) -> bool {
        self.records().contains_key(&hwnd)
    }

    pub fn get(&self, hwnd: WindowHandle) -> Option<WindowRecord> {
        self.records().get(&hwnd).copied()
    }

    /// Recorded original procedure, if the window is registered.
    pub fn original_proc(&self, hwnd: WindowHandle) -> Option<WindowProc> {
        self.records()
            .get(&hwnd)
            .map(|record| record.original_proc)
            .filter(|proc_| !proc_.is_none())
    }

    /// Insert or update the original procedure of a window.
    ///
    /// Returns `false` without touching the registry when `procedure` is the
    /// hook itself or null.
    pub fn record_original_proc(&self, hwnd: WindowHandle, procedure: WindowProc) -> bool {
        if procedure == self.hook || procedure.is_none() {
            return false;
        }

        self.records()
            .entry(hwnd)
            .and_modify(|record| record.original_proc = procedure)
            .or_insert_with(|| WindowRecord::new(procedure));
        true
    }

    /// Record that the window was seen with `current` styles.
    ///
    /// Takes the style snapshot on first call and marks the window activated.
    /// Returns `None` if the window is not registered.
    pub fn observe(&self, hwnd: WindowHandle, current: WindowStyles) -> Option<Observation> {
        let mut records = self.records();
        let record = records.get_mut(&hwnd)?;

        if !record.styles_modified {
            record.original_styles = current;
            record.styles_modified = true;
            record.is_overlay = style::is_overlay(current);
        }

        let first_activation = !record.activated;
        record.activated = true;

        Some(Observation {
            first_activation,
            is_overlay: record.is_overlay,
        })
    }

    /// Note that the window's original styles have been written back.
    ///
    /// A record kept after a partial restore then only retries the
    /// procedure swap.
    pub fn mark_styles_restored(&self, hwnd: WindowHandle) {
        if let Some(record) = self.records().get_mut(&hwnd) {
            record.styles_modified = false;
        }
    }

    /// Copy of every record, for work done outside the lock.
    pub fn snapshot(&self) -> Vec<(WindowHandle, WindowRecord)> {
        self.records()
            .iter()
            .map(|(hwnd, record)| (*hwnd, *record))
            .collect()
    }

    pub fn handles(&self) -> Vec<WindowHandle> {
        self.records().keys().copied().collect()
    }

    /// Drop the records of the given windows.
    pub fn forget(&self, handles: &[WindowHandle]) -> usize {
        let mut records = self.records();
        handles
            .iter()
            .filter(|hwnd| records.remove(hwnd).is_some())
            .count()
    }

    pub fn clear(&self) {
        self.records().clear();
    }
}
