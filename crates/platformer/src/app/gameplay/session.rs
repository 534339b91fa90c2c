use std::path::{Path, PathBuf};

use engine::{ContentCatalog, LevelSource, SpeciesDatabase};
use thiserror::Error;
use tracing::{info, warn};

use super::combat::CombatStats;
use super::level::Level;
use super::player::PlayerInput;
use super::save::{
    read_save, write_save, OptionsRecord, SaveError, SaveRecord, OPTIONS_FILE_NAME, SAVE_FILE_NAME,
};
use super::tile_grid::LevelLoadError;

/// Stats a brand-new character starts with.
pub(crate) const NEW_GAME_STATS: CombatStats = CombatStats::new(20, 3, 0, 1);

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("level {index} is not in the catalog ({count} levels)")]
    MissingLevel { index: usize, count: usize },
    #[error("load level {index}: {source}")]
    Level {
        index: usize,
        #[source]
        source: LevelLoadError,
    },
    #[error(transparent)]
    Save(#[from] SaveError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionCommand {
    NewGame,
    Continue,
    TogglePause,
    Save,
    Revive,
    AdvanceLevel,
}

/// Cross-level game state: which level is loaded, the checkpoint it restarts from,
/// and whether simulation is paused.
pub(crate) struct GameSession {
    species: SpeciesDatabase,
    levels: Vec<LevelSource>,
    save_dir: PathBuf,
    start_level: usize,
    level_index: usize,
    checkpoint: CombatStats,
    level: Level,
    paused: bool,
    save_exists: bool,
    options: OptionsRecord,
}

impl GameSession {
    /// Starts a new game at `start_level`, wrapped into the catalog's range.
    pub(crate) fn start(
        catalog: &ContentCatalog,
        save_dir: PathBuf,
        start_level: usize,
    ) -> Result<Self, SessionError> {
        let count = catalog.levels.len();
        if count == 0 {
            return Err(SessionError::MissingLevel {
                index: start_level,
                count,
            });
        }
        let start_level = start_level % count;
        let level = build_level(&catalog.species, &catalog.levels, start_level, NEW_GAME_STATS)?;
        let save_exists = save_dir.join(SAVE_FILE_NAME).is_file();
        let options = load_options(&save_dir.join(OPTIONS_FILE_NAME));
        info!(
            level_index = start_level,
            level_count = count,
            save_exists,
            "session_started"
        );

        Ok(Self {
            species: catalog.species.clone(),
            levels: catalog.levels.clone(),
            save_dir,
            start_level,
            level_index: start_level,
            checkpoint: NEW_GAME_STATS,
            level,
            paused: false,
            save_exists,
            options,
        })
    }

    pub(crate) fn dispatch(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        match command {
            SessionCommand::NewGame => {
                self.enter_level(self.start_level, NEW_GAME_STATS)?;
                info!(level_index = self.level_index, "new_game");
            }
            SessionCommand::Continue => self.continue_from_save()?,
            SessionCommand::TogglePause => {
                self.paused = !self.paused;
                info!(paused = self.paused, "pause_toggled");
            }
            SessionCommand::Save => self.save()?,
            SessionCommand::Revive => {
                if self.level.is_player_alive() {
                    return Ok(());
                }
                self.enter_level(self.level_index, self.checkpoint)?;
                info!(level_index = self.level_index, "player_revived");
            }
            SessionCommand::AdvanceLevel => {
                let next = (self.level_index + 1) % self.levels.len();
                let carried = self.level.player().stats;
                self.enter_level(next, carried)?;
                info!(level_index = next, "level_advanced");
            }
        }
        Ok(())
    }

    /// Ticks the level unless paused. Level time stands still while paused, so no
    /// window or timer runs down. Reaching the exit moves on to the next level.
    pub(crate) fn tick(&mut self, delta_seconds: f32, input: PlayerInput) -> Result<(), SessionError> {
        if self.paused {
            return Ok(());
        }
        self.level.tick(delta_seconds, input);
        if self.level.reached_exit() {
            self.dispatch(SessionCommand::AdvanceLevel)?;
        }
        Ok(())
    }

    fn enter_level(&mut self, index: usize, stats: CombatStats) -> Result<(), SessionError> {
        self.level = build_level(&self.species, &self.levels, index, stats)?;
        self.level_index = index;
        self.checkpoint = stats;
        self.paused = false;
        Ok(())
    }

    fn save(&mut self) -> Result<(), SessionError> {
        if !self.level.is_player_alive() {
            return Err(SaveError::PlayerDead.into());
        }
        let source = self.level_source(self.level_index)?;
        let record =
            SaveRecord::from_snapshot(self.level_index, &source.fingerprint, &self.level.snapshot());
        let path = self.save_path();
        write_save(&path, &record)?;
        self.save_exists = true;
        info!(
            level_index = self.level_index,
            path = %path.display(),
            "game_saved"
        );
        Ok(())
    }

    /// Builds the saved level aside and only swaps it in once the snapshot applies cleanly.
    fn continue_from_save(&mut self) -> Result<(), SessionError> {
        let fingerprints: Vec<&str> = self
            .levels
            .iter()
            .map(|source| source.fingerprint.as_str())
            .collect();
        let record = read_save(&self.save_path(), &fingerprints)?;
        let snapshot = record.to_snapshot();

        let index = record.level_index;
        let mut level = build_level(&self.species, &self.levels, index, snapshot.player_stats)?;
        level
            .restore(&snapshot)
            .map_err(|source| SessionError::Level { index, source })?;

        self.level = level;
        self.level_index = index;
        self.checkpoint = snapshot.player_stats;
        self.paused = false;
        info!(level_index = index, "game_continued");
        Ok(())
    }

    fn level_source(&self, index: usize) -> Result<&LevelSource, SessionError> {
        self.levels.get(index).ok_or(SessionError::MissingLevel {
            index,
            count: self.levels.len(),
        })
    }

    fn save_path(&self) -> PathBuf {
        self.save_dir.join(SAVE_FILE_NAME)
    }

    pub(crate) fn level(&self) -> &Level {
        &self.level
    }

    pub(crate) fn level_index(&self) -> usize {
        self.level_index
    }

    pub(crate) fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub(crate) fn checkpoint(&self) -> CombatStats {
        self.checkpoint
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn save_exists(&self) -> bool {
        self.save_exists
    }

    pub(crate) fn options(&self) -> OptionsRecord {
        self.options
    }

    #[cfg(test)]
    pub(crate) fn level_mut(&mut self) -> &mut Level {
        &mut self.level
    }
}

/// Missing options are written out with defaults so the file exists for hand edits.
fn load_options(path: &Path) -> OptionsRecord {
    if !path.is_file() {
        let defaults = OptionsRecord::default();
        match defaults.store(path) {
            Ok(()) => info!(path = %path.display(), "options_defaults_written"),
            Err(error) => warn!(error = %error, "options_write_failed"),
        }
        return defaults;
    }
    OptionsRecord::load(path).unwrap_or_else(|error| {
        warn!(error = %error, "options_load_failed_using_defaults");
        OptionsRecord::default()
    })
}

fn build_level(
    species: &SpeciesDatabase,
    levels: &[LevelSource],
    index: usize,
    stats: CombatStats,
) -> Result<Level, SessionError> {
    let source = levels.get(index).ok_or(SessionError::MissingLevel {
        index,
        count: levels.len(),
    })?;
    let level = Level::load(&source.text, species, stats)
        .map_err(|source| SessionError::Level { index, source })?;
    info!(
        level_index = index,
        enemy_count = level.enemies().len(),
        "level_loaded"
    );
    Ok(level)
}
