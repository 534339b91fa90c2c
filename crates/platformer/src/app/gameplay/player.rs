use engine::{InputAction, InputSnapshot, Rect, SimTime, Vec2};

use super::combat::CombatStats;
use super::kinematics::{bounding_rect, resolve_motion, Facing};
use super::tile_grid::TileGrid;

const MOVE_ACCELERATION: f32 = 13_000.0;
const MAX_MOVE_SPEED: f32 = 1_750.0;
const GROUND_DRAG_FACTOR: f32 = 0.48;
const AIR_DRAG_FACTOR: f32 = 0.58;
const GRAVITY_ACCELERATION: f32 = 3_400.0;
const MAX_FALL_SPEED: f32 = 550.0;
const JUMP_LAUNCH_VELOCITY: f32 = -3_500.0;
const MAX_JUMP_TIME: f32 = 0.35;
const JUMP_CONTROL_POWER: f32 = 0.14;
const RUN_SPEED_THRESHOLD: f32 = 0.02;

pub(crate) const ATTACK_WINDOW_SECONDS: f64 = 0.3;
pub(crate) const MELEE_REACH: f32 = 24.0;
pub(crate) const INVULNERABILITY_SECONDS: f64 = 1.0;
pub(crate) const PLAYER_LOCAL_BOUNDS: Rect = Rect::new(-10.0, -44.0, 20.0, 44.0);

/// Logical per-tick controls; decoupled from devices so tests can drive the player directly.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PlayerInput {
    pub move_axis: f32,
    pub jump_held: bool,
    pub jump_pressed: bool,
    pub attack_pressed: bool,
}

impl PlayerInput {
    pub(crate) fn from_snapshot(input: &InputSnapshot) -> Self {
        Self {
            move_axis: input.move_axis(),
            jump_held: input.is_down(InputAction::Jump),
            jump_pressed: input.jump_pressed(),
            attack_pressed: input.attack_pressed(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayerState {
    Idle,
    Running,
    Jumping,
    Attacking,
    Hurt,
    Dead,
}

#[derive(Debug, Clone)]
pub(crate) struct Player {
    pub position: Vec2,
    pub velocity: Vec2,
    pub on_ground: bool,
    pub facing: Facing,
    pub stats: CombatStats,
    alive: bool,
    attack_until: Option<f64>,
    invulnerable_until: Option<f64>,
    jump_time: f32,
    was_jumping: bool,
}

impl Player {
    pub(crate) fn new(position: Vec2, stats: CombatStats) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            on_ground: false,
            facing: Facing::Right,
            alive: stats.hit_points > 0,
            stats,
            attack_until: None,
            invulnerable_until: None,
            jump_time: 0.0,
            was_jumping: false,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive
    }

    pub(crate) fn is_attacking(&self) -> bool {
        self.attack_until.is_some()
    }

    pub(crate) fn is_invulnerable(&self) -> bool {
        self.invulnerable_until.is_some()
    }

    pub(crate) fn bounding_rect(&self) -> Rect {
        bounding_rect(self.position, PLAYER_LOCAL_BOUNDS)
    }

    /// Hitbox directly ahead of the facing edge, only while an attack window is open.
    pub(crate) fn melee_rect(&self) -> Option<Rect> {
        if !self.is_attacking() {
            return None;
        }
        let body = self.bounding_rect();
        let x = match self.facing {
            Facing::Right => body.right(),
            Facing::Left => body.left() - MELEE_REACH,
        };
        Some(Rect::new(x, body.top(), MELEE_REACH, body.height))
    }

    pub(crate) fn state(&self) -> PlayerState {
        if !self.alive {
            PlayerState::Dead
        } else if self.is_attacking() {
            PlayerState::Attacking
        } else if self.is_invulnerable() {
            PlayerState::Hurt
        } else if !self.on_ground {
            PlayerState::Jumping
        } else if self.velocity.x.abs() > RUN_SPEED_THRESHOLD {
            PlayerState::Running
        } else {
            PlayerState::Idle
        }
    }

    pub(crate) fn update(&mut self, grid: &TileGrid, input: PlayerInput, time: SimTime) {
        let now = time.total_seconds;
        let dt = time.delta_seconds;
        self.expire_windows(now);

        let input = if self.alive {
            input
        } else {
            PlayerInput::default()
        };

        if input.attack_pressed && !self.is_attacking() {
            self.attack_until = Some(now + ATTACK_WINDOW_SECONDS);
        }
        if input.move_axis < 0.0 {
            self.facing = Facing::Left;
        } else if input.move_axis > 0.0 {
            self.facing = Facing::Right;
        }

        self.velocity.x += input.move_axis * MOVE_ACCELERATION * dt;
        self.velocity.y =
            (self.velocity.y + GRAVITY_ACCELERATION * dt).clamp(-MAX_FALL_SPEED, MAX_FALL_SPEED);
        self.velocity.y = self.apply_jump(self.velocity.y, input, dt);

        let drag = if self.on_ground {
            GROUND_DRAG_FACTOR
        } else {
            AIR_DRAG_FACTOR
        };
        self.velocity.x = (self.velocity.x * drag).clamp(-MAX_MOVE_SPEED, MAX_MOVE_SPEED);

        let motion = resolve_motion(grid, self.position, self.velocity, PLAYER_LOCAL_BOUNDS, dt);
        self.position = motion.position;
        self.velocity = motion.velocity;
        self.on_ground = motion.on_ground;
        if motion.hit_ceiling {
            self.jump_time = 0.0;
        }
    }

    /// A jump starts on a fresh press while grounded and keeps lifting while held,
    /// with lift decaying over `MAX_JUMP_TIME`. A press released before the tick ran
    /// still counts as held for that tick.
    fn apply_jump(&mut self, velocity_y: f32, input: PlayerInput, dt: f32) -> f32 {
        let mut velocity_y = velocity_y;
        let holding = input.jump_held || input.jump_pressed;
        if holding {
            let starting = input.jump_pressed && !self.was_jumping && self.on_ground;
            if starting || self.jump_time > 0.0 {
                self.jump_time += dt;
            }
            if self.jump_time > 0.0 && self.jump_time <= MAX_JUMP_TIME {
                velocity_y = JUMP_LAUNCH_VELOCITY
                    * (1.0 - (self.jump_time / MAX_JUMP_TIME).powf(JUMP_CONTROL_POWER));
            } else {
                self.jump_time = 0.0;
            }
        } else {
            self.jump_time = 0.0;
        }
        self.was_jumping = holding;
        velocity_y
    }

    fn expire_windows(&mut self, now: f64) {
        if self.attack_until.is_some_and(|until| now >= until) {
            self.attack_until = None;
        }
        if self.invulnerable_until.is_some_and(|until| now >= until) {
            self.invulnerable_until = None;
        }
    }

    /// Applies an already-gated hit. Returns true when this hit killed the player.
    pub(crate) fn take_damage(&mut self, amount: i32, now: f64) -> bool {
        if !self.alive {
            return false;
        }
        self.stats.hit_points = (self.stats.hit_points - amount.max(0)).max(0);
        self.invulnerable_until = Some(now + INVULNERABILITY_SECONDS);
        if self.stats.hit_points == 0 {
            self.kill();
            return true;
        }
        false
    }

    /// Returns false when the player was already dead.
    pub(crate) fn kill(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.attack_until = None;
        self.velocity.x = 0.0;
        self.jump_time = 0.0;
        true
    }
}
