//! Pull-style enumeration of the windows the controller manages.

use crate::{WindowHandle, WindowSystem};
use std::collections::VecDeque;

/// Lazy walk over visible, process-owned top-level windows and their
/// descendants.
///
/// Top-level windows are listed when the walk is created; a window's
/// descendants are only fetched once that window has been yielded. Create a
/// new walk to restart from the current window set.
pub struct WindowWalk<'a> {
    system: &'a dyn WindowSystem,
    top_level: std::vec::IntoIter<WindowHandle>,
    children: VecDeque<WindowHandle>,
}

impl<'a> WindowWalk<'a> {
    pub fn new(system: &'a dyn WindowSystem) -> Self {
        Self {
            system,
            top_level: system.top_level_windows().into_iter(),
            children: VecDeque::new(),
        }
    }
}

impl Iterator for WindowWalk<'_> {
    type Item = WindowHandle;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(child) = self.children.pop_front() {
            return Some(child);
        }

        let system = self.system;
        let parent = self
            .top_level
            .find(|hwnd| system.is_owned(*hwnd) && system.is_visible(*hwnd))?;
        self.children.extend(system.child_windows(parent));
        Some(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeWindow, FakeWindows};

    #[test]
    fn test_walk_filters_and_orders() {
        let fake = FakeWindows::new();
        let a = fake.add(FakeWindow::new());
        let a_child = fake.add(FakeWindow::new().child_of(a));
        let hidden = fake.add(FakeWindow::new().hidden());
        let _hidden_child = fake.add(FakeWindow::new().child_of(hidden));
        let foreign = fake.add(FakeWindow::new().foreign());
        let b = fake.add(FakeWindow::new());

        let walked: Vec<_> = WindowWalk::new(&fake).collect();
        assert_eq!(walked, vec![a, a_child, b]);
        assert!(!walked.contains(&foreign));
    }

    #[test]
    fn test_walk_is_restartable() {
        let fake = FakeWindows::new();
        let a = fake.add(FakeWindow::new());
        assert_eq!(WindowWalk::new(&fake).collect::<Vec<_>>(), vec![a]);

        let b = fake.add(FakeWindow::new());
        assert_eq!(WindowWalk::new(&fake).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_walk_fetches_children_lazily() {
        let fake = FakeWindows::new();
        let a = fake.add(FakeWindow::new());
        let _ = fake.add(FakeWindow::new().child_of(a));
        let b = fake.add(FakeWindow::new());
        let _ = fake.add(FakeWindow::new().child_of(b));

        let mut walk = WindowWalk::new(&fake);
        assert_eq!(walk.next(), Some(a));
        assert_eq!(fake.child_queries(), 1);
        walk.next();
        assert_eq!(fake.child_queries(), 1);
        assert_eq!(walk.next(), Some(b));
        assert_eq!(fake.child_queries(), 2);
    }

    #[test]
    fn test_walk_includes_nested_descendants() {
        let fake = FakeWindows::new();
        let a = fake.add(FakeWindow::new());
        let child = fake.add(FakeWindow::new().child_of(a));
        let grandchild = fake.add(FakeWindow::new().child_of(child));

        let walked: Vec<_> = WindowWalk::new(&fake).collect();
        assert_eq!(walked, vec![a, child, grandchild]);
    }
}
