//! Auto-repress input simulation.
//!
//! Toggling passthrough consumes the click or keystroke that triggered it.
//! After a toggle the controller replays an equivalent input so the surface
//! that now has focus (overlay or application) receives it.
//!
//! The replay is a plain list of [`InputStep`]s played on a detached task.

use crate::hotkey::Hotkey;
use std::time::Duration;
use tracing::warn;

/// Delay before the click when passthrough turns on.
pub const SETTLE_ON: Duration = Duration::from_millis(250);
/// Delay before the click when passthrough turns off.
pub const SETTLE_OFF: Duration = Duration::from_millis(450);
/// Delay between the click and the hotkey replay.
pub const CLICK_TO_COMBO: Duration = Duration::from_millis(200);
/// How long the left button is held.
pub const CLICK_HOLD: Duration = Duration::from_millis(50);
/// How long the hotkey's main key is held.
pub const KEY_HOLD: Duration = Duration::from_millis(150);
/// Quiet period after the sequence before new hotkey toggles are accepted.
pub const COOLDOWN: Duration = Duration::from_millis(200);

/// Destination for synthesized input.
pub trait InputSink: Send + Sync {
    /// Press or release a virtual key.
    fn key(&self, vk: u16, down: bool);

    /// Press or release the left mouse button at the current cursor position.
    fn left_button(&self, down: bool);

    /// Wait between steps.
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// One step of a synthesized input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStep {
    Wait(Duration),
    LeftButton { down: bool },
    Key { vk: u16, down: bool },
}

/// Left click: press, hold, release.
pub fn click() -> Vec<InputStep> {
    vec![
        InputStep::LeftButton { down: true },
        InputStep::Wait(CLICK_HOLD),
        InputStep::LeftButton { down: false },
    ]
}

/// Full press and release of a hotkey combination.
///
/// Modifiers go down first, the key is held, then modifiers are released in
/// reverse order.
pub fn press_combo(hotkey: &Hotkey) -> Vec<InputStep> {
    let modifiers = hotkey.modifiers();
    let mut steps: Vec<InputStep> = modifiers
        .iter()
        .map(|&vk| InputStep::Key { vk, down: true })
        .collect();

    steps.push(InputStep::Key {
        vk: hotkey.vk,
        down: true,
    });
    steps.push(InputStep::Wait(KEY_HOLD));
    steps.push(InputStep::Key {
        vk: hotkey.vk,
        down: false,
    });

    steps.extend(
        modifiers
            .iter()
            .rev()
            .map(|&vk| InputStep::Key { vk, down: false }),
    );
    steps
}

/// Input replayed after passthrough switched to `enabled`.
///
/// Turning on clicks and then replays the hotkey; turning off only clicks.
/// Both end with the cooldown wait.
pub fn repress_plan(enabled: bool, hotkey: &Hotkey) -> Vec<InputStep> {
    let mut steps = Vec::new();

    if enabled {
        steps.push(InputStep::Wait(SETTLE_ON));
        steps.extend(click());
        if !hotkey.is_disabled() {
            steps.push(InputStep::Wait(CLICK_TO_COMBO));
            steps.extend(press_combo(hotkey));
        }
    } else {
        steps.push(InputStep::Wait(SETTLE_OFF));
        steps.extend(click());
    }

    steps.push(InputStep::Wait(COOLDOWN));
    steps
}

/// Play a sequence into a sink.
pub fn play(steps: &[InputStep], sink: &dyn InputSink) {
    for step in steps {
        match *step {
            InputStep::Wait(duration) => sink.pause(duration),
            InputStep::LeftButton { down } => sink.left_button(down),
            InputStep::Key { vk, down } => sink.key(vk, down),
        }
    }
}

/// A unit of work with its own lifetime.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks that are never joined by their submitter.
pub trait TaskScheduler: Send + Sync {
    fn submit(&self, name: &str, task: Task) -> std::io::Result<()>;
}

/// Scheduler that runs each task on its own detached thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadScheduler;

impl TaskScheduler for ThreadScheduler {
    fn submit(&self, name: &str, task: Task) -> std::io::Result<()> {
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(task)
            .map(|_| ()) // Thread is detached, we don't track it
            .map_err(|e| {
                warn!("Failed to spawn {} thread: {}", name, e);
                e
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{VK_CONTROL, VK_HOME, VK_MENU, VK_SHIFT};
    use std::sync::mpsc;

    fn total_wait(steps: &[InputStep]) -> Duration {
        steps
            .iter()
            .filter_map(|step| match step {
                InputStep::Wait(d) => Some(*d),
                _ => None,
            })
            .sum()
    }

    #[test]
    fn test_plan_when_turning_on() {
        let hotkey = Hotkey {
            ctrl: true,
            ..Hotkey::key(VK_HOME)
        };
        let plan = repress_plan(true, &hotkey);

        assert_eq!(
            plan,
            vec![
                InputStep::Wait(SETTLE_ON),
                InputStep::LeftButton { down: true },
                InputStep::Wait(CLICK_HOLD),
                InputStep::LeftButton { down: false },
                InputStep::Wait(CLICK_TO_COMBO),
                InputStep::Key { vk: VK_CONTROL, down: true },
                InputStep::Key { vk: VK_HOME, down: true },
                InputStep::Wait(KEY_HOLD),
                InputStep::Key { vk: VK_HOME, down: false },
                InputStep::Key { vk: VK_CONTROL, down: false },
                InputStep::Wait(COOLDOWN),
            ]
        );
        assert_eq!(total_wait(&plan), Duration::from_millis(850));
    }

    #[test]
    fn test_plan_when_turning_off() {
        let plan = repress_plan(false, &Hotkey::default());
        assert_eq!(
            plan,
            vec![
                InputStep::Wait(SETTLE_OFF),
                InputStep::LeftButton { down: true },
                InputStep::Wait(CLICK_HOLD),
                InputStep::LeftButton { down: false },
                InputStep::Wait(COOLDOWN),
            ]
        );
    }

    #[test]
    fn test_combo_releases_modifiers_in_reverse() {
        let hotkey = Hotkey {
            vk: 0x41,
            ctrl: true,
            alt: true,
            shift: true,
        };
        let keys: Vec<(u16, bool)> = press_combo(&hotkey)
            .into_iter()
            .filter_map(|step| match step {
                InputStep::Key { vk, down } => Some((vk, down)),
                _ => None,
            })
            .collect();

        assert_eq!(
            keys,
            vec![
                (VK_CONTROL, true),
                (VK_MENU, true),
                (VK_SHIFT, true),
                (0x41, true),
                (0x41, false),
                (VK_SHIFT, false),
                (VK_MENU, false),
                (VK_CONTROL, false),
            ]
        );
    }

    #[test]
    fn test_disabled_hotkey_only_clicks() {
        let plan = repress_plan(true, &Hotkey::key(0));
        assert!(!plan.iter().any(|step| matches!(step, InputStep::Key { .. })));
    }

    #[test]
    fn test_thread_scheduler_runs_task() {
        let (tx, rx) = mpsc::channel();
        ThreadScheduler
            .submit("test-task", Box::new(move || tx.send(42).unwrap()))
            .unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }
}
