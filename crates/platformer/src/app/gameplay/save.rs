use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::{write_text_atomic, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::combat::CombatStats;
use super::level::{EnemySnapshot, LevelSnapshot};

pub(crate) const SAVE_VERSION: u32 = 1;
pub(crate) const SAVE_FILE_NAME: &str = "save.json";
pub(crate) const OPTIONS_FILE_NAME: &str = "options.json";
const DEFAULT_VOLUME: f32 = 0.8;

#[derive(Debug, Error)]
pub(crate) enum SaveError {
    #[error("no save file at '{0}'")]
    Missing(PathBuf),
    #[error("read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("encode json: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Validation(String),
    #[error("cannot save while the player is dead")]
    PlayerDead,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SavedVec2 {
    pub x: f32,
    pub y: f32,
}

impl SavedVec2 {
    fn from_vec2(value: Vec2) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }

    fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SavedPlayer {
    pub stats: CombatStats,
    pub position: SavedVec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SavedEnemy {
    pub position: SavedVec2,
    pub alive: bool,
}

/// Persisted continue point. Enemies are stored in spawn order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SaveRecord {
    pub save_version: u32,
    pub level_index: usize,
    pub level_fingerprint: String,
    pub player: SavedPlayer,
    pub enemies: Vec<SavedEnemy>,
}

impl SaveRecord {
    pub(crate) fn from_snapshot(
        level_index: usize,
        level_fingerprint: &str,
        snapshot: &LevelSnapshot,
    ) -> Self {
        Self {
            save_version: SAVE_VERSION,
            level_index,
            level_fingerprint: level_fingerprint.to_string(),
            player: SavedPlayer {
                stats: snapshot.player_stats,
                position: SavedVec2::from_vec2(snapshot.player_position),
            },
            enemies: snapshot
                .enemies
                .iter()
                .map(|enemy| SavedEnemy {
                    position: SavedVec2::from_vec2(enemy.position),
                    alive: enemy.alive,
                })
                .collect(),
        }
    }

    pub(crate) fn to_snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            player_position: self.player.position.to_vec2(),
            player_stats: self.player.stats,
            enemies: self
                .enemies
                .iter()
                .map(|enemy| EnemySnapshot {
                    position: enemy.position.to_vec2(),
                    alive: enemy.alive,
                })
                .collect(),
        }
    }
}

pub(crate) fn write_save(path: &Path, record: &SaveRecord) -> Result<(), SaveError> {
    let json = serde_json::to_string_pretty(record)?;
    write_text_atomic(path, &json).map_err(|source| SaveError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads and validates a save against the shipped level fingerprints, indexed by level.
pub(crate) fn read_save(path: &Path, level_fingerprints: &[&str]) -> Result<SaveRecord, SaveError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Err(SaveError::Missing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(SaveError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let record = parse_save_json(&raw)?;
    validate_save(&record, level_fingerprints)?;
    Ok(record)
}

pub(crate) fn parse_save_json(raw: &str) -> Result<SaveRecord, SaveError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SaveRecord>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        if path.is_empty() || path == "." {
            SaveError::Parse(format!("parse save json: {source}"))
        } else {
            SaveError::Parse(format!("parse save json at {path}: {source}"))
        }
    })
}

fn validation_err(path: &str, message: impl Into<String>) -> SaveError {
    SaveError::Validation(format!("validation failed at {path}: {}", message.into()))
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> SaveError {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

fn validate_finite(path: &str, position: SavedVec2) -> Result<(), SaveError> {
    if !position.x.is_finite() {
        return Err(expected_actual(&format!("{path}.x"), "finite number", position.x));
    }
    if !position.y.is_finite() {
        return Err(expected_actual(&format!("{path}.y"), "finite number", position.y));
    }
    Ok(())
}

pub(crate) fn validate_save(record: &SaveRecord, level_fingerprints: &[&str]) -> Result<(), SaveError> {
    if record.save_version != SAVE_VERSION {
        return Err(expected_actual(
            "save_version",
            SAVE_VERSION,
            record.save_version,
        ));
    }

    let Some(expected_fingerprint) = level_fingerprints.get(record.level_index) else {
        return Err(expected_actual(
            "level_index",
            format!("index below {}", level_fingerprints.len()),
            record.level_index,
        ));
    };
    if record.level_fingerprint != *expected_fingerprint {
        return Err(validation_err(
            "level_fingerprint",
            format!(
                "level {} changed since the save was written",
                record.level_index
            ),
        ));
    }

    let stats = &record.player.stats;
    if stats.max_hit_points <= 0 {
        return Err(expected_actual(
            "player.stats.max_hit_points",
            "positive number",
            stats.max_hit_points,
        ));
    }
    if stats.hit_points <= 0 || stats.hit_points > stats.max_hit_points {
        return Err(expected_actual(
            "player.stats.hit_points",
            format!("1..={}", stats.max_hit_points),
            stats.hit_points,
        ));
    }
    validate_finite("player.position", record.player.position)?;

    for (index, enemy) in record.enemies.iter().enumerate() {
        validate_finite(&format!("enemies[{index}].position"), enemy.position)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct OptionsRecord {
    pub sound_volume: f32,
    pub music_volume: f32,
}

impl Default for OptionsRecord {
    fn default() -> Self {
        Self {
            sound_volume: DEFAULT_VOLUME,
            music_volume: DEFAULT_VOLUME,
        }
    }
}

impl OptionsRecord {
    /// Out-of-range and non-finite volumes fall back into `[0, 1]`.
    pub(crate) fn clamped(self) -> Self {
        let clamp = |volume: f32| {
            if volume.is_finite() {
                volume.clamp(0.0, 1.0)
            } else {
                DEFAULT_VOLUME
            }
        };
        Self {
            sound_volume: clamp(self.sound_volume),
            music_volume: clamp(self.music_volume),
        }
    }

    /// A missing file yields the defaults.
    pub(crate) fn load(path: &Path) -> Result<Self, SaveError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SaveError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let mut deserializer = serde_json::Deserializer::from_str(&raw);
        let options: Self = serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            SaveError::Parse(format!(
                "parse options json at {}: {}",
                error.path(),
                error.inner()
            ))
        })?;
        Ok(options.clamped())
    }

    pub(crate) fn store(&self, path: &Path) -> Result<(), SaveError> {
        let json = serde_json::to_string_pretty(&self.clamped())?;
        write_text_atomic(path, &json).map_err(|source| SaveError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const FINGERPRINTS: [&str; 2] = ["aaa", "bbb"];

    fn record() -> SaveRecord {
        SaveRecord {
            save_version: SAVE_VERSION,
            level_index: 1,
            level_fingerprint: "bbb".to_string(),
            player: SavedPlayer {
                stats: CombatStats::new(20, 3, 0, 1),
                position: SavedVec2 { x: 48.0, y: 96.0 },
            },
            enemies: vec![SavedEnemy {
                position: SavedVec2 { x: 144.0, y: 96.0 },
                alive: false,
            }],
        }
    }

    fn validation_message(record: &SaveRecord) -> String {
        match validate_save(record, &FINGERPRINTS) {
            Err(SaveError::Validation(message)) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn written_save_reads_back_identically() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("saves").join(SAVE_FILE_NAME);
        write_save(&path, &record()).expect("write");

        let loaded = read_save(&path, &FINGERPRINTS).expect("read");
        assert_eq!(loaded, record());
        assert!(!path.with_file_name("save.json.tmp").exists());
    }

    #[test]
    fn missing_save_is_reported_as_missing() {
        let temp = TempDir::new().expect("tempdir");
        let error = read_save(&temp.path().join(SAVE_FILE_NAME), &FINGERPRINTS).unwrap_err();
        assert!(matches!(error, SaveError::Missing(_)));
    }

    #[test]
    fn parse_error_names_the_json_path() {
        let raw = r#"{"save_version":1,"level_index":0,"level_fingerprint":"aaa",
            "player":{"stats":{"hit_points":"lots","max_hit_points":20,"strength":3,"dexterity":0,"vitality":1},
            "position":{"x":0,"y":0}},"enemies":[]}"#;
        let message = parse_save_json(raw).unwrap_err().to_string();
        assert!(message.starts_with("parse save json at player.stats.hit_points:"), "{message}");
    }

    #[test]
    fn validation_rejects_bad_records() {
        let mut wrong_version = record();
        wrong_version.save_version = 9;
        assert_eq!(
            validation_message(&wrong_version),
            "validation failed at save_version: expected 1, got 9"
        );

        let mut out_of_range = record();
        out_of_range.level_index = 2;
        assert!(validation_message(&out_of_range).starts_with("validation failed at level_index"));

        let mut edited_level = record();
        edited_level.level_fingerprint = "aaa".to_string();
        assert!(validation_message(&edited_level).contains("level_fingerprint"));

        let mut dead = record();
        dead.player.stats.hit_points = 0;
        assert_eq!(
            validation_message(&dead),
            "validation failed at player.stats.hit_points: expected 1..=20, got 0"
        );

        let mut overfull = record();
        overfull.player.stats.hit_points = 21;
        assert!(validation_message(&overfull).contains("got 21"));

        let mut nan_enemy = record();
        nan_enemy.enemies[0].position.y = f32::NAN;
        assert_eq!(
            validation_message(&nan_enemy),
            "validation failed at enemies[0].position.y: expected finite number, got NaN"
        );
    }

    #[test]
    fn options_clamp_and_default() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join(OPTIONS_FILE_NAME);
        assert_eq!(OptionsRecord::load(&path).expect("defaults"), OptionsRecord::default());

        fs::write(&path, r#"{"sound_volume": 3.5, "music_volume": -1.0}"#).expect("write");
        let loaded = OptionsRecord::load(&path).expect("load");
        assert_eq!(loaded.sound_volume, 1.0);
        assert_eq!(loaded.music_volume, 0.0);

        OptionsRecord {
            sound_volume: 0.25,
            music_volume: 0.5,
        }
        .store(&path)
        .expect("store");
        let stored = OptionsRecord::load(&path).expect("reload");
        assert_eq!(stored.sound_volume, 0.25);
        assert_eq!(stored.music_volume, 0.5);
    }
}
