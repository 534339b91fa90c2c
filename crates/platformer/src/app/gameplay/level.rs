use engine::{SimTime, SpeciesDatabase, Vec2};
use tracing::debug;

use super::camera::Camera;
use super::combat::{resolve_combat, CombatStats};
use super::enemy::Enemy;
use super::messages::MessageQueue;
use super::player::{Player, PlayerInput};
use super::tile_grid::{LevelLayout, LevelLoadError, TileGrid};

pub(crate) const VIEWPORT_SIZE: Vec2 = Vec2::new(800.0, 600.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeathCause {
    Enemy { enemy_index: usize },
    FellOutOfWorld,
}

/// Signals produced during one tick, in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LevelEvent {
    PlayerDamaged { enemy_index: usize, damage: i32 },
    PlayerKilled { cause: DeathCause },
    EnemyDamaged { enemy_index: usize, damage: i32 },
    EnemyKilled { enemy_index: usize },
    EnemyRemoved { enemy_index: usize },
    ExitReached,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EnemySnapshot {
    pub position: Vec2,
    pub alive: bool,
}

/// Everything needed to resume a level on a fresh load of the same description.
/// Enemies are listed in spawn order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LevelSnapshot {
    pub player_position: Vec2,
    pub player_stats: CombatStats,
    pub enemies: Vec<EnemySnapshot>,
}

pub(crate) struct Level {
    grid: TileGrid,
    start: Vec2,
    exit: Option<Vec2>,
    player: Player,
    enemies: Vec<Enemy>,
    messages: MessageQueue,
    camera: Camera,
    reached_exit: bool,
    events: Vec<LevelEvent>,
    /// Advances only on ticks that run, so every window and timer shares one clock.
    clock: SimTime,
}

impl Level {
    pub(crate) fn load(
        text: &str,
        species: &SpeciesDatabase,
        player_stats: CombatStats,
    ) -> Result<Self, LevelLoadError> {
        let layout = LevelLayout::parse(text, species)?;
        let enemies = layout
            .spawns
            .iter()
            .map(|spawn| {
                species
                    .species(spawn.species)
                    .map(|def| Enemy::spawn(spawn, def))
                    .ok_or(LevelLoadError::UnknownSpecies(spawn.species))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut camera = Camera::default();
        camera.snap_to(layout.start, layout.grid.pixel_size(), VIEWPORT_SIZE);
        debug!(
            width = layout.grid.width(),
            height = layout.grid.height(),
            enemy_count = enemies.len(),
            has_exit = layout.exit.is_some(),
            "level_parsed"
        );

        Ok(Self {
            player: Player::new(layout.start, player_stats),
            grid: layout.grid,
            start: layout.start,
            exit: layout.exit,
            enemies,
            messages: MessageQueue::default(),
            camera,
            reached_exit: false,
            events: Vec::new(),
            clock: SimTime::default(),
        })
    }

    /// One fixed simulation step. Order matters: combat sees post-motion positions and
    /// the camera follows the final player position.
    pub(crate) fn tick(&mut self, delta_seconds: f32, input: PlayerInput) {
        self.clock = self.clock.advanced(delta_seconds);
        let time = self.clock;
        let now = time.total_seconds;
        self.events.clear();

        self.player.update(&self.grid, input, time);

        for (enemy_index, enemy) in self.enemies.iter_mut().enumerate() {
            if enemy.update(&self.grid, time) {
                debug!(enemy_index, "enemy_removed");
                self.events.push(LevelEvent::EnemyRemoved { enemy_index });
            }
        }

        resolve_combat(
            &mut self.player,
            &mut self.enemies,
            &mut self.messages,
            &mut self.events,
            now,
        );

        if !self.reached_exit && self.player_touches_exit() {
            self.reached_exit = true;
            debug!(x = self.player.position.x, y = self.player.position.y, "exit_reached");
            self.events.push(LevelEvent::ExitReached);
        }

        if self.player.bounding_rect().top() >= self.grid.pixel_size().y && self.player.kill() {
            debug!(x = self.player.position.x, "player_fell_out_of_world");
            self.events.push(LevelEvent::PlayerKilled {
                cause: DeathCause::FellOutOfWorld,
            });
        }

        self.messages.update(now, time.delta_seconds);

        self.camera
            .update(self.player.position, self.grid.pixel_size(), VIEWPORT_SIZE);
    }

    fn player_touches_exit(&self) -> bool {
        let Some(exit) = self.exit else {
            return false;
        };
        self.player.is_alive()
            && self.player.on_ground
            && self.player.bounding_rect().contains_point(exit)
    }

    pub(crate) fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            player_position: self.player.position,
            player_stats: self.player.stats,
            enemies: self
                .enemies
                .iter()
                .map(|enemy| EnemySnapshot {
                    position: enemy.position,
                    alive: enemy.is_alive(),
                })
                .collect(),
        }
    }

    /// Re-seeds the freshly loaded level. Nothing is touched when the enemy count differs.
    pub(crate) fn restore(&mut self, snapshot: &LevelSnapshot) -> Result<(), LevelLoadError> {
        if snapshot.enemies.len() != self.enemies.len() {
            return Err(LevelLoadError::EnemyCountMismatch {
                expected: self.enemies.len(),
                actual: snapshot.enemies.len(),
            });
        }
        self.player = Player::new(snapshot.player_position, snapshot.player_stats);
        for (enemy, saved) in self.enemies.iter_mut().zip(&snapshot.enemies) {
            enemy.restore(saved.position, saved.alive);
        }
        self.messages.clear();
        self.reached_exit = false;
        self.events.clear();
        self.camera
            .snap_to(self.player.position, self.grid.pixel_size(), VIEWPORT_SIZE);
        Ok(())
    }

    /// Simulated seconds since the level was loaded.
    pub(crate) fn now(&self) -> f64 {
        self.clock.total_seconds
    }

    pub(crate) fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub(crate) fn start(&self) -> Vec2 {
        self.start
    }

    pub(crate) fn exit(&self) -> Option<Vec2> {
        self.exit
    }

    pub(crate) fn player(&self) -> &Player {
        &self.player
    }

    pub(crate) fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub(crate) fn messages(&self) -> &MessageQueue {
        &self.messages
    }

    pub(crate) fn camera_offset(&self) -> Vec2 {
        self.camera.offset()
    }

    pub(crate) fn reached_exit(&self) -> bool {
        self.reached_exit
    }

    pub(crate) fn is_player_alive(&self) -> bool {
        self.player.is_alive()
    }

    /// Events from the most recent tick only.
    pub(crate) fn events(&self) -> &[LevelEvent] {
        &self.events
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    #[cfg(test)]
    pub(crate) fn enemies_mut(&mut self) -> &mut [Enemy] {
        &mut self.enemies
    }
}
