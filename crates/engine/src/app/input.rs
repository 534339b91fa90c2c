use winit::event::ElementState;
use winit::keyboard::{KeyCode, PhysicalKey};

use super::scene::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
    Attack,
    Quit,
}

impl InputAction {
    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Held state per action, packed one bit per action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: u8,
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        if is_down {
            self.down |= action.bit();
        } else {
            self.down &= !action.bit();
        }
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down & action.bit() != 0
    }
}

/// Keys that report a single press until consumed, ignoring OS key repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Jump,
    Attack,
    Pause,
    Save,
    Load,
    Revive,
    Overlay,
}

const TRIGGER_COUNT: usize = 7;

#[derive(Debug, Clone, Copy)]
enum Binding {
    Hold(InputAction),
    Press(Trigger),
    /// Held action whose press also raises a trigger.
    HoldAndPress(InputAction, Trigger),
    Quit,
}

fn binding_for(code: KeyCode) -> Option<Binding> {
    let binding = match code {
        KeyCode::KeyA | KeyCode::ArrowLeft => Binding::Hold(InputAction::MoveLeft),
        KeyCode::KeyD | KeyCode::ArrowRight => Binding::Hold(InputAction::MoveRight),
        KeyCode::Space | KeyCode::KeyW | KeyCode::ArrowUp => {
            Binding::HoldAndPress(InputAction::Jump, Trigger::Jump)
        }
        KeyCode::KeyJ | KeyCode::KeyX => Binding::HoldAndPress(InputAction::Attack, Trigger::Attack),
        KeyCode::KeyP => Binding::Press(Trigger::Pause),
        KeyCode::F5 => Binding::Press(Trigger::Save),
        KeyCode::F9 => Binding::Press(Trigger::Load),
        KeyCode::Enter | KeyCode::NumpadEnter => Binding::Press(Trigger::Revive),
        KeyCode::F3 => Binding::Press(Trigger::Overlay),
        KeyCode::Escape => Binding::Quit,
        _ => return None,
    };
    Some(binding)
}

/// Folds window keyboard events into per-tick snapshots.
#[derive(Debug, Default)]
pub(crate) struct KeyboardState {
    quit_requested: bool,
    held: ActionStates,
    trigger_down: [bool; TRIGGER_COUNT],
    trigger_pending: [bool; TRIGGER_COUNT],
}

impl KeyboardState {
    pub(crate) fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    pub(crate) fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub(crate) fn handle_key(&mut self, key: PhysicalKey, state: ElementState) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        let Some(binding) = binding_for(code) else {
            return;
        };
        let pressed = state == ElementState::Pressed;
        match binding {
            Binding::Hold(action) => self.held.set(action, pressed),
            Binding::Press(trigger) => self.update_trigger(trigger, pressed),
            Binding::HoldAndPress(action, trigger) => {
                // Two keys share one action, so the edge comes from the action, not the key.
                if pressed && !self.held.is_down(action) {
                    self.trigger_pending[trigger as usize] = true;
                }
                self.held.set(action, pressed);
            }
            Binding::Quit => {
                self.held.set(InputAction::Quit, pressed);
                if pressed {
                    self.request_quit();
                }
            }
        }
    }

    fn update_trigger(&mut self, trigger: Trigger, pressed: bool) {
        let slot = trigger as usize;
        if pressed && !self.trigger_down[slot] {
            self.trigger_pending[slot] = true;
        }
        self.trigger_down[slot] = pressed;
    }

    fn take(&mut self, trigger: Trigger) -> bool {
        std::mem::take(&mut self.trigger_pending[trigger as usize])
    }

    /// Key releases are not delivered while the window is unfocused.
    pub(crate) fn release_all(&mut self) {
        self.held = ActionStates::default();
        self.trigger_down = [false; TRIGGER_COUNT];
    }

    pub(crate) fn take_overlay_toggle(&mut self) -> bool {
        self.take(Trigger::Overlay)
    }

    /// Consumes pending presses so each one reaches exactly one tick.
    pub(crate) fn snapshot_for_tick(&mut self) -> InputSnapshot {
        InputSnapshot::new(
            self.quit_requested,
            self.held,
            self.take(Trigger::Jump),
            self.take(Trigger::Attack),
            self.take(Trigger::Pause),
            self.take(Trigger::Save),
            self.take(Trigger::Load),
            self.take(Trigger::Revive),
        )
    }
}
