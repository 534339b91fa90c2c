use std::error::Error;
use std::ops::{Add, Mul, Sub};

use thiserror::Error;

use super::input::{ActionStates, InputAction};
use super::rendering::RenderFrame;
use crate::content::ContentCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Fixed-step clock handed to every tick. `total_seconds` is simulation time, never wall-clock.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimTime {
    pub delta_seconds: f32,
    pub total_seconds: f64,
}

impl SimTime {
    pub fn new(delta_seconds: f32, total_seconds: f64) -> Self {
        Self {
            delta_seconds,
            total_seconds,
        }
    }

    /// Advances by one fixed step.
    pub fn advanced(self, delta_seconds: f32) -> Self {
        Self {
            delta_seconds,
            total_seconds: self.total_seconds + f64::from(delta_seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    jump_pressed: bool,
    attack_pressed: bool,
    pause_pressed: bool,
    save_pressed: bool,
    load_pressed: bool,
    revive_pressed: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        jump_pressed: bool,
        attack_pressed: bool,
        pause_pressed: bool,
        save_pressed: bool,
        load_pressed: bool,
        revive_pressed: bool,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            jump_pressed,
            attack_pressed,
            pause_pressed,
            save_pressed,
            load_pressed,
            revive_pressed,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// -1 for left, 1 for right, 0 when neither or both are held.
    pub fn move_axis(&self) -> f32 {
        let left = self.is_down(InputAction::MoveLeft);
        let right = self.is_down(InputAction::MoveRight);
        match (left, right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    pub fn jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    pub fn attack_pressed(&self) -> bool {
        self.attack_pressed
    }

    pub fn pause_pressed(&self) -> bool {
        self.pause_pressed
    }

    pub fn save_pressed(&self) -> bool {
        self.save_pressed
    }

    pub fn load_pressed(&self) -> bool {
        self.load_pressed
    }

    pub fn revive_pressed(&self) -> bool {
        self.revive_pressed
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    /// Marks a fresh jump press; also holds the button, as a real press would.
    pub fn with_jump_pressed(mut self, jump_pressed: bool) -> Self {
        self.jump_pressed = jump_pressed;
        if jump_pressed {
            self.actions.set(InputAction::Jump, true);
        }
        self
    }

    pub fn with_attack_pressed(mut self, attack_pressed: bool) -> Self {
        self.attack_pressed = attack_pressed;
        if attack_pressed {
            self.actions.set(InputAction::Attack, true);
        }
        self
    }

    pub fn with_pause_pressed(mut self, pause_pressed: bool) -> Self {
        self.pause_pressed = pause_pressed;
        self
    }

    pub fn with_save_pressed(mut self, save_pressed: bool) -> Self {
        self.save_pressed = save_pressed;
        self
    }

    pub fn with_load_pressed(mut self, load_pressed: bool) -> Self {
        self.load_pressed = load_pressed;
        self
    }

    pub fn with_revive_pressed(mut self, revive_pressed: bool) -> Self {
        self.revive_pressed = revive_pressed;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned box in world units, y grows downward. Edges follow half-open
/// semantics: `left <= x < right`, `top <= y < bottom`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn translated(&self, offset: Vec2) -> Rect {
        Rect::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Strict overlap; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }
}

#[derive(Debug, Error)]
#[error("{context}: {source}")]
pub struct SceneLoadError {
    context: String,
    #[source]
    source: Box<dyn Error + Send + Sync>,
}

impl SceneLoadError {
    pub fn new(context: impl Into<String>, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            context: context.into(),
            source: source.into(),
        }
    }
}

pub trait Scene {
    fn load(&mut self, content: &ContentCatalog) -> Result<(), SceneLoadError>;
    fn update(&mut self, time: SimTime, input: &InputSnapshot) -> SceneCommand;
    fn render(&self, frame: &mut RenderFrame);
    fn unload(&mut self);

    fn debug_lines(&self) -> Vec<String> {
        Vec::new()
    }

    fn debug_title(&self) -> Option<String> {
        None
    }
}
