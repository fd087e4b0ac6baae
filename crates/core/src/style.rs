//! Style computations for making a window interactable.

use crate::styles::{WS_DISABLED, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TRANSPARENT};
use crate::WindowStyles;

/// Extended style bits that mark an input-transparent overlay surface.
pub const OVERLAY_EX_STYLES: isize = WS_EX_TRANSPARENT | WS_EX_LAYERED | WS_EX_NOACTIVATE;

/// Whether styles observed at first sight describe an overlay window.
pub fn is_overlay(original: WindowStyles) -> bool {
    original.ex_style & OVERLAY_EX_STYLES != 0
}

/// Styles with every input-blocking bit cleared.
pub fn interactable(current: WindowStyles) -> WindowStyles {
    WindowStyles {
        style: current.style & !WS_DISABLED,
        ex_style: current.ex_style & !OVERLAY_EX_STYLES,
    }
}

/// What to do with a window after its styles were reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Nothing changed and the window was activated before.
    None,
    /// Topmost z-order plus foreground (overlay windows).
    RaiseAndFocus,
    /// Frame-changed redraw only, z-order untouched.
    RefreshFrame,
}

/// Decide the activation step for a processed window.
pub fn plan_activation(is_overlay: bool, first_activation: bool, styles_changed: bool) -> Activation {
    if !first_activation && !styles_changed {
        Activation::None
    } else if is_overlay {
        Activation::RaiseAndFocus
    } else {
        Activation::RefreshFrame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WS_VISIBLE: isize = 0x1000_0000;
    const WS_EX_TOPMOST: isize = 0x0000_0008;

    #[test]
    fn test_overlay_classification() {
        assert!(is_overlay(WindowStyles::new(0, WS_EX_TRANSPARENT)));
        assert!(is_overlay(WindowStyles::new(0, WS_EX_LAYERED)));
        assert!(is_overlay(WindowStyles::new(0, WS_EX_NOACTIVATE)));
        assert!(!is_overlay(WindowStyles::new(WS_DISABLED, WS_EX_TOPMOST)));
    }

    #[test]
    fn test_interactable_clears_blocking_bits_only() {
        let current = WindowStyles::new(
            WS_VISIBLE | WS_DISABLED,
            WS_EX_TOPMOST | WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_NOACTIVATE,
        );
        let target = interactable(current);
        assert_eq!(target, WindowStyles::new(WS_VISIBLE, WS_EX_TOPMOST));
        assert_eq!(interactable(target), target);
    }

    #[test]
    fn test_activation_plan() {
        assert_eq!(plan_activation(true, true, false), Activation::RaiseAndFocus);
        assert_eq!(plan_activation(true, false, true), Activation::RaiseAndFocus);
        assert_eq!(plan_activation(true, false, false), Activation::None);
        assert_eq!(plan_activation(false, true, false), Activation::RefreshFrame);
        assert_eq!(plan_activation(false, false, true), Activation::RefreshFrame);
        assert_eq!(plan_activation(false, false, false), Activation::None);
    }
}
