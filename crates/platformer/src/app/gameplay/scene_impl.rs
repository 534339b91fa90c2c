use std::path::PathBuf;

use engine::{
    Color, ContentCatalog, DrawCommand, DrawLayer, InputSnapshot, Rect, RenderFrame, Scene,
    SceneCommand, SceneLoadError, SimTime, Vec2,
};
use tracing::{info, warn};

use super::enemy::{EnemyState, DEATH_SECONDS};
use super::level::{Level, LevelEvent, VIEWPORT_SIZE};
use super::player::{PlayerInput, PlayerState};
use super::session::{GameSession, SessionCommand};
use super::tile_grid::{TileCollision, TileGrid};

/// Background layers, back to front, with their scroll factor and the flat color used
/// when the image is missing.
const BACKDROP_LAYERS: [(u8, f32, Color); 3] = [
    (0, 0.2, Color::rgb(24, 30, 58)),
    (1, 0.5, Color::rgb(38, 52, 86)),
    (2, 0.8, Color::rgb(52, 74, 104)),
];
const BACKDROP_VARIANTS: usize = 3;

const BLOCK_COLOR: Color = Color::rgb(112, 86, 62);
const PLATFORM_COLOR: Color = Color::rgb(156, 124, 82);
const DECORATION_COLOR: Color = Color::rgb(72, 112, 72);
const EXIT_COLOR: Color = Color::YELLOW;
const PLAYER_COLOR: Color = Color::rgb(70, 130, 230);
const PLATFORM_THICKNESS: f32 = 8.0;
const FLASH_PERIOD_SECONDS: f64 = 0.1;
const HUD_MARGIN: f32 = 8.0;
const HUD_LINE_HEIGHT: f32 = 12.0;

/// Hurt entities blink against level time, so the blink holds still while paused.
fn flash_off(now: f64) -> bool {
    (now / FLASH_PERIOD_SECONDS) as i64 % 2 == 1
}

fn enemy_color(marker: char) -> Color {
    match marker {
        'A' => Color::rgb(200, 80, 80),
        'B' => Color::rgb(170, 80, 200),
        'C' => Color::rgb(90, 170, 90),
        _ => Color::rgb(200, 200, 200),
    }
}

pub(crate) struct PlatformerScene {
    save_dir: PathBuf,
    start_level: usize,
    session: Option<GameSession>,
    status: Option<String>,
}

impl PlatformerScene {
    pub(crate) fn new(save_dir: PathBuf, start_level: usize) -> Self {
        Self {
            save_dir,
            start_level,
            session: None,
            status: None,
        }
    }

    /// Edge-triggered session controls. Enter revives a dead player, or restarts from the pause screen.
    fn commands_for(session: &GameSession, input: &InputSnapshot) -> Vec<SessionCommand> {
        let mut commands = Vec::new();
        if input.pause_pressed() {
            commands.push(SessionCommand::TogglePause);
        }
        if input.save_pressed() {
            commands.push(SessionCommand::Save);
        }
        if input.load_pressed() {
            commands.push(SessionCommand::Continue);
        }
        if input.revive_pressed() {
            if !session.level().is_player_alive() {
                commands.push(SessionCommand::Revive);
            } else if session.is_paused() {
                commands.push(SessionCommand::NewGame);
            }
        }
        commands
    }

    fn render_backdrops(frame: &mut RenderFrame, level_index: usize) {
        let variant = level_index % BACKDROP_VARIANTS;
        for (layer, scroll, fallback) in BACKDROP_LAYERS {
            frame.push(
                DrawLayer::Background,
                DrawCommand::Backdrop {
                    key: format!("layer{layer}_{variant}"),
                    scroll,
                    fallback,
                },
            );
        }
    }

    fn render_tiles(frame: &mut RenderFrame, grid: &TileGrid, camera: Vec2) {
        let visible = Rect::new(camera.x, camera.y, VIEWPORT_SIZE.x, VIEWPORT_SIZE.y);
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let Some(tile) = grid.tile(x, y) else {
                    continue;
                };
                if !tile.has_visual {
                    continue;
                }
                let cell = TileGrid::cell_bounds(x as i32, y as i32);
                if !cell.intersects(&visible) {
                    continue;
                }
                let (rect, color) = match tile.collision {
                    TileCollision::Impassable => (cell, BLOCK_COLOR),
                    TileCollision::Platform => (
                        Rect::new(cell.x, cell.y, cell.width, PLATFORM_THICKNESS),
                        PLATFORM_COLOR,
                    ),
                    TileCollision::Passable => (cell, DECORATION_COLOR),
                };
                frame.fill_rect(DrawLayer::Tiles, rect, color);
            }
        }
    }

    fn render_entities(&self, frame: &mut RenderFrame, level: &Level) {
        if let Some(exit) = level.exit() {
            let cell = Rect::new(exit.x - 16.0, exit.y - 16.0, 32.0, 32.0);
            frame.push(
                DrawLayer::Entities,
                DrawCommand::OutlineRect {
                    rect: cell,
                    color: EXIT_COLOR,
                },
            );
        }

        for enemy in level.enemies().iter().filter(|enemy| enemy.is_present()) {
            let color = match enemy.state() {
                EnemyState::Dying { remaining } => {
                    let fade = (remaining / DEATH_SECONDS).clamp(0.0, 1.0);
                    enemy_color(enemy.marker).with_alpha((fade * 255.0) as u8)
                }
                _ if enemy.is_invulnerable() && flash_off(level.now()) => {
                    enemy_color(enemy.marker).with_alpha(96)
                }
                _ => enemy_color(enemy.marker),
            };
            frame.fill_rect(DrawLayer::Entities, enemy.bounding_rect(), color);
        }

        let player = level.player();
        let color = match player.state() {
            PlayerState::Dead => PLAYER_COLOR.with_alpha(80),
            PlayerState::Hurt if flash_off(level.now()) => PLAYER_COLOR.with_alpha(96),
            _ => PLAYER_COLOR,
        };
        frame.fill_rect(DrawLayer::Entities, player.bounding_rect(), color);
        if let Some(melee) = player.melee_rect() {
            frame.push(
                DrawLayer::Entities,
                DrawCommand::OutlineRect {
                    rect: melee,
                    color: Color::WHITE,
                },
            );
        }
    }

    fn render_messages(&self, frame: &mut RenderFrame, level: &Level) {
        for message in level.messages().iter() {
            let fade = 1.0 - message.age_fraction(level.now());
            frame.text(
                DrawLayer::FloatingText,
                message.position,
                message.text.clone(),
                message.color.with_alpha((fade * 255.0) as u8),
            );
        }
    }

    fn render_hud(&self, frame: &mut RenderFrame, session: &GameSession) {
        let level = session.level();
        let stats = level.player().stats;
        let mut lines = vec![
            format!("HP {}/{}", stats.hit_points, stats.max_hit_points),
            format!(
                "LEVEL {}/{}",
                session.level_index() + 1,
                session.level_count()
            ),
        ];
        if let Some(status) = &self.status {
            lines.push(status.clone());
        }
        for (row, line) in lines.into_iter().enumerate() {
            frame.text(
                DrawLayer::Hud,
                Vec2::new(HUD_MARGIN, HUD_MARGIN + row as f32 * HUD_LINE_HEIGHT),
                line,
                Color::WHITE,
            );
        }

        let banner = if !level.is_player_alive() {
            Some(("YOU DIED  ENTER TO REVIVE", Color::RED))
        } else if session.is_paused() {
            Some(("PAUSED  P TO RESUME  ENTER FOR NEW GAME", Color::YELLOW))
        } else {
            None
        };
        if let Some((text, color)) = banner {
            let center = Vec2::new(VIEWPORT_SIZE.x * 0.5 - text.len() as f32 * 3.0, VIEWPORT_SIZE.y * 0.5);
            frame.text(DrawLayer::Hud, center, text, color);
        }
    }

}

impl Scene for PlatformerScene {
    fn load(&mut self, content: &ContentCatalog) -> Result<(), SceneLoadError> {
        let session = GameSession::start(content, self.save_dir.clone(), self.start_level)
            .map_err(|error| SceneLoadError::new("start game session", error))?;
        info!(
            level_index = session.level_index(),
            save_exists = session.save_exists(),
            sound_volume = session.options().sound_volume,
            music_volume = session.options().music_volume,
            "scene_loaded"
        );
        self.session = Some(session);
        self.status = None;
        Ok(())
    }

    fn update(&mut self, time: SimTime, input: &InputSnapshot) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        let Some(session) = self.session.as_mut() else {
            return SceneCommand::None;
        };

        for command in Self::commands_for(session, input) {
            match session.dispatch(command) {
                Ok(()) => {
                    self.status = match command {
                        SessionCommand::Save => Some("SAVED".to_string()),
                        SessionCommand::Continue => Some("LOADED".to_string()),
                        _ => None,
                    };
                }
                Err(error) => {
                    warn!(command = ?command, error = %error, "session_command_failed");
                    self.status = Some(format!("{command:?} FAILED"));
                }
            }
        }

        if let Err(error) = session.tick(time.delta_seconds, PlayerInput::from_snapshot(input)) {
            warn!(error = %error, "level_transition_failed");
            self.status = Some("LEVEL LOAD FAILED".to_string());
        }
        for event in session.level().events() {
            if let LevelEvent::PlayerKilled { cause } = event {
                info!(cause = ?cause, level_index = session.level_index(), "player_died");
            }
        }

        SceneCommand::None
    }

    fn render(&self, frame: &mut RenderFrame) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let level = session.level();
        let camera = level.camera_offset();
        frame.set_camera(camera);

        Self::render_backdrops(frame, session.level_index());
        Self::render_tiles(frame, level.grid(), camera);
        self.render_entities(frame, level);
        self.render_messages(frame, level);
        self.render_hud(frame, session);
    }

    fn unload(&mut self) {
        if let Some(session) = self.session.take() {
            info!(level_index = session.level_index(), "scene_unloaded");
        }
    }

    fn debug_lines(&self) -> Vec<String> {
        let Some(session) = self.session.as_ref() else {
            return vec!["session: none".to_string()];
        };
        let level = session.level();
        let player = level.player();
        let alive_enemies = level
            .enemies()
            .iter()
            .filter(|enemy| enemy.is_alive())
            .count();
        let checkpoint = session.checkpoint();
        vec![
            format!(
                "player: ({:.1}, {:.1}) v=({:.0}, {:.0}) {:?}",
                player.position.x,
                player.position.y,
                player.velocity.x,
                player.velocity.y,
                player.state()
            ),
            format!(
                "enemies: {alive_enemies}/{} alive  messages: {}",
                level.enemies().len(),
                level.messages().len()
            ),
            format!(
                "camera: ({:.0}, {:.0})  paused: {}",
                level.camera_offset().x,
                level.camera_offset().y,
                session.is_paused()
            ),
            format!(
                "checkpoint hp: {}/{}  start: ({:.0}, {:.0})",
                checkpoint.hit_points,
                checkpoint.max_hit_points,
                level.start().x,
                level.start().y
            ),
        ]
    }

    fn debug_title(&self) -> Option<String> {
        self.session
            .as_ref()
            .map(|session| format!("Level {}", session.level_index() + 1))
    }
}
