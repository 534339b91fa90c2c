use engine::{Rect, SimTime, SpeciesDef, SpeciesId, Vec2};

use super::combat::CombatStats;
use super::kinematics::{bounding_rect, resolve_motion, Facing};
use super::player::INVULNERABILITY_SECONDS;
use super::tile_grid::{EnemySpawn, TileCollision, TileGrid, TILE_HEIGHT, TILE_WIDTH};

pub(crate) const MAX_WAIT_SECONDS: f32 = 0.5;
pub(crate) const DEATH_SECONDS: f32 = 1.0;
const PROBE_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum EnemyState {
    Patrolling,
    Waiting { remaining: f32 },
    /// Still drawn, no longer fights.
    Dying { remaining: f32 },
    /// Kept in the list so spawn order stays stable for snapshots.
    Removed,
}

#[derive(Debug, Clone)]
pub(crate) struct Enemy {
    pub species: SpeciesId,
    pub marker: char,
    pub position: Vec2,
    pub facing: Facing,
    pub local_bounds: Rect,
    pub move_speed: f32,
    pub stats: CombatStats,
    state: EnemyState,
    invulnerable_until: Option<f64>,
}

impl Enemy {
    pub(crate) fn spawn(spawn: &EnemySpawn, def: &SpeciesDef) -> Self {
        Self {
            species: spawn.species,
            marker: def.marker,
            position: spawn.position,
            facing: Facing::Left,
            local_bounds: Rect::new(
                -def.bounds_width * 0.5,
                -def.bounds_height,
                def.bounds_width,
                def.bounds_height,
            ),
            move_speed: def.move_speed,
            stats: CombatStats::new(def.max_hit_points, def.strength, def.dexterity, def.vitality),
            state: EnemyState::Patrolling,
            invulnerable_until: None,
        }
    }

    pub(crate) fn state(&self) -> EnemyState {
        self.state
    }

    pub(crate) fn is_alive(&self) -> bool {
        matches!(
            self.state,
            EnemyState::Patrolling | EnemyState::Waiting { .. }
        )
    }

    /// Alive or mid-death animation.
    pub(crate) fn is_present(&self) -> bool {
        self.state != EnemyState::Removed
    }

    pub(crate) fn is_invulnerable(&self) -> bool {
        self.invulnerable_until.is_some()
    }

    pub(crate) fn bounding_rect(&self) -> Rect {
        bounding_rect(self.position, self.local_bounds)
    }

    /// Advances patrol or death timers. Returns true on the tick the enemy is removed.
    pub(crate) fn update(&mut self, grid: &TileGrid, time: SimTime) -> bool {
        let dt = time.delta_seconds;
        if self
            .invulnerable_until
            .is_some_and(|until| time.total_seconds >= until)
        {
            self.invulnerable_until = None;
        }

        match self.state {
            EnemyState::Removed => false,
            EnemyState::Dying { remaining } => {
                let remaining = remaining - dt;
                if remaining <= 0.0 {
                    self.state = EnemyState::Removed;
                    true
                } else {
                    self.state = EnemyState::Dying { remaining };
                    false
                }
            }
            EnemyState::Waiting { remaining } => {
                self.state = if self.is_invulnerable() {
                    EnemyState::Waiting {
                        remaining: MAX_WAIT_SECONDS,
                    }
                } else {
                    let remaining = (remaining - dt).max(0.0);
                    if remaining <= 0.0 {
                        self.facing = self.facing.flipped();
                        EnemyState::Patrolling
                    } else {
                        EnemyState::Waiting { remaining }
                    }
                };
                false
            }
            EnemyState::Patrolling => {
                if self.is_invulnerable() || self.blocked_ahead(grid, self.move_speed * dt) {
                    self.start_waiting();
                    return false;
                }
                let velocity = Vec2::new(self.facing.sign() * self.move_speed, 0.0);
                let motion = resolve_motion(grid, self.position, velocity, self.local_bounds, dt);
                self.position = motion.position;
                if motion.hit_wall {
                    self.start_waiting();
                }
                false
            }
        }
    }

    fn start_waiting(&mut self) {
        self.state = EnemyState::Waiting {
            remaining: MAX_WAIT_SECONDS,
        };
    }

    /// Probes the column the leading edge would occupy after stepping `step` units:
    /// a wall at knee or head height, or no floor underfoot, stops the patrol.
    pub(crate) fn blocked_ahead(&self, grid: &TileGrid, step: f32) -> bool {
        let rect = self.bounding_rect();
        let probe_column = match self.facing {
            Facing::Right => ((rect.right() + step - PROBE_EPSILON) / TILE_WIDTH).floor(),
            Facing::Left => ((rect.left() - step) / TILE_WIDTH).floor(),
        } as i32;
        let feet_row = ((self.position.y + PROBE_EPSILON) / TILE_HEIGHT).floor() as i32;
        let head_row = ((rect.top() + PROBE_EPSILON) / TILE_HEIGHT).floor() as i32;

        let wall = (head_row..feet_row)
            .any(|row| grid.collision_at(probe_column, row) == TileCollision::Impassable);
        let gap = grid.collision_at(probe_column, feet_row) == TileCollision::Passable;
        wall || gap
    }

    /// Applies an already-gated hit. Returns true when this hit killed the enemy.
    pub(crate) fn take_damage(&mut self, amount: i32, now: f64) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.stats.hit_points = (self.stats.hit_points - amount.max(0)).max(0);
        self.invulnerable_until = Some(now + INVULNERABILITY_SECONDS);
        if self.stats.hit_points == 0 {
            self.state = EnemyState::Dying {
                remaining: DEATH_SECONDS,
            };
            return true;
        }
        false
    }

    /// Re-seeds a freshly spawned enemy from a snapshot entry.
    pub(crate) fn restore(&mut self, position: Vec2, alive: bool) {
        self.position = position;
        self.invulnerable_until = None;
        if alive {
            self.state = EnemyState::Patrolling;
        } else {
            self.stats.hit_points = 0;
            self.state = EnemyState::Removed;
        }
    }
}
