use std::path::PathBuf;

use engine::{fingerprint_level_text, ContentCatalog, LevelSource, Vec2};
use tempfile::TempDir;

use super::combat::{CombatStats, ENEMY_DAMAGE_COLOR, PLAYER_DAMAGE_COLOR};
use super::enemy::EnemyState;
use super::level::{DeathCause, Level, LevelEvent};
use super::player::{PlayerInput, PlayerState};
use super::save::{write_save, OptionsRecord, SaveError, SaveRecord, OPTIONS_FILE_NAME, SAVE_FILE_NAME};
use super::session::{GameSession, SessionCommand, SessionError, NEW_GAME_STATS};
use super::tile_grid::tests::stock_species;
use super::tile_grid::LevelLoadError;

const DT: f32 = 1.0 / 60.0;

const RIGHT: PlayerInput = PlayerInput {
    move_axis: 1.0,
    jump_held: false,
    jump_pressed: false,
    attack_pressed: false,
};

fn load(text: &str, stats: CombatStats) -> Level {
    Level::load(text, &stock_species(), stats).expect("level")
}

fn catalog(texts: &[&str]) -> ContentCatalog {
    ContentCatalog {
        species: stock_species(),
        levels: texts
            .iter()
            .enumerate()
            .map(|(index, text)| LevelSource {
                index,
                path: PathBuf::from(format!("{index}.txt")),
                text: text.to_string(),
                fingerprint: fingerprint_level_text(text),
            })
            .collect(),
    }
}

fn count_events(level_events: &[Vec<LevelEvent>], wanted: impl Fn(&LevelEvent) -> bool) -> usize {
    level_events
        .iter()
        .flatten()
        .filter(|event| wanted(event))
        .count()
}

#[test]
fn walking_right_reaches_exit_while_grounded() {
    let mut level = load("1...X\n#####", NEW_GAME_STATS);
    let mut exit_events = 0;

    for _ in 0..120 {
        level.tick(DT, RIGHT);
        assert!(level.player().on_ground, "left the ground at x={}", level.player().position.x);
        exit_events += level
            .events()
            .iter()
            .filter(|event| **event == LevelEvent::ExitReached)
            .count();
        if level.reached_exit() {
            break;
        }
    }

    assert!(level.reached_exit());
    assert_eq!(exit_events, 1);
    assert!(level.player().position.x > 128.0);
}

#[test]
fn exit_needs_ground_contact() {
    let mut level = load("..1.\n..X.\n....", NEW_GAME_STATS);
    for _ in 0..60 {
        level.tick(DT, PlayerInput::default());
    }
    assert!(!level.reached_exit());
}

#[test]
fn contact_damage_lands_once_per_invulnerability_window() {
    let mut level = load("..1A...\n#######", CombatStats::new(3, 1, 0, 10));
    let mut history = Vec::new();

    for _ in 0..40 {
        level.tick(DT, PlayerInput::default());
        history.push(level.events().to_vec());
    }

    assert_eq!(level.player().stats.hit_points, 2);
    assert_eq!(
        count_events(&history, |event| matches!(
            event,
            LevelEvent::PlayerDamaged { damage: 1, .. }
        )),
        1
    );
    let message = level.messages().iter().next().expect("damage message");
    assert_eq!(message.text, "1");
    assert_eq!(message.color, PLAYER_DAMAGE_COLOR);
}

#[test]
fn attack_press_opens_melee_before_the_combat_pass() {
    let mut level = load("..1C...\n#######", NEW_GAME_STATS);
    let attack = PlayerInput {
        attack_pressed: true,
        ..PlayerInput::default()
    };

    level.tick(DT, attack);

    assert_eq!(level.player().state(), PlayerState::Attacking);
    assert_eq!(
        level.events(),
        &[LevelEvent::EnemyDamaged {
            enemy_index: 0,
            damage: 0
        }]
    );
    let message = level.messages().iter().next().expect("armour message");
    assert_eq!(message.text, "0");
    assert_eq!(message.color, ENEMY_DAMAGE_COLOR);
    assert_eq!(level.enemies()[0].stats.hit_points, 8);
    assert!(level.enemies()[0].is_invulnerable());
    assert_eq!(level.player().stats, NEW_GAME_STATS);
}

#[test]
fn falling_out_of_the_world_kills_exactly_once() {
    let mut level = load("1..\n...", NEW_GAME_STATS);
    let mut history = Vec::new();

    for _ in 0..180 {
        level.tick(DT, PlayerInput::default());
        history.push(level.events().to_vec());
    }

    assert!(!level.is_player_alive());
    assert_eq!(
        count_events(&history, |event| *event
            == LevelEvent::PlayerKilled {
                cause: DeathCause::FellOutOfWorld
            }),
        1
    );
}

#[test]
fn messages_expire_after_their_lifetime() {
    let mut level = load("..1A...\n#######", CombatStats::new(20, 1, 0, 0));
    let mut saw_message = false;
    for _ in 0..20 {
        level.tick(DT, PlayerInput::default());
        saw_message |= !level.messages().is_empty();
    }
    assert!(saw_message);

    level.player_mut().kill();
    for _ in 0..70 {
        level.tick(DT, PlayerInput::default());
    }
    assert!(level.messages().is_empty());
}

#[test]
fn snapshot_restores_positions_and_removes_dead_enemies() {
    let text = "1..A..B.\n########";
    let mut level = load(text, NEW_GAME_STATS);
    level.enemies_mut()[0].take_damage(99, 0.0);
    level.player_mut().position = Vec2::new(40.0, 32.0);
    let snapshot = level.snapshot();
    assert!(!snapshot.enemies[0].alive);
    assert!(snapshot.enemies[1].alive);

    let mut fresh = load(text, NEW_GAME_STATS);
    fresh.restore(&snapshot).expect("restore");

    assert_eq!(fresh.player().position, Vec2::new(40.0, 32.0));
    assert_eq!(fresh.enemies()[0].state(), EnemyState::Removed);
    assert_eq!(fresh.enemies()[1].state(), EnemyState::Patrolling);
    assert_eq!(fresh.enemies()[1].position, snapshot.enemies[1].position);
}

#[test]
fn snapshot_with_wrong_enemy_count_is_rejected_untouched() {
    let snapshot = load("1..A..B.\n########", NEW_GAME_STATS).snapshot();
    let mut other = load("1..A....\n########", NEW_GAME_STATS);
    let before = other.player().position;

    assert_eq!(
        other.restore(&snapshot).unwrap_err(),
        LevelLoadError::EnemyCountMismatch {
            expected: 1,
            actual: 2
        }
    );
    assert_eq!(other.player().position, before);
}

#[test]
fn removed_enemy_is_reported_once() {
    let mut level = load("1.....A.\n########", NEW_GAME_STATS);
    level.enemies_mut()[0].take_damage(99, 0.0);
    let mut history = Vec::new();
    for _ in 0..90 {
        level.tick(DT, PlayerInput::default());
        history.push(level.events().to_vec());
    }
    assert_eq!(
        count_events(&history, |event| *event == LevelEvent::EnemyRemoved { enemy_index: 0 }),
        1
    );
    assert!(!level.enemies()[0].is_present());
}

#[test]
fn session_save_then_continue_restores_state() {
    let temp = TempDir::new().expect("tempdir");
    let content = catalog(&["1......A\n########"]);
    let mut session = GameSession::start(&content, temp.path().to_path_buf(), 0).expect("start");
    for _ in 0..10 {
        session.tick(DT, RIGHT).expect("tick");
    }
    let saved_position = session.level().player().position;
    session.dispatch(SessionCommand::Save).expect("save");
    assert!(session.save_exists());
    assert!(temp.path().join(SAVE_FILE_NAME).is_file());

    for _ in 0..10 {
        session.tick(DT, RIGHT).expect("tick");
    }
    assert_ne!(session.level().player().position, saved_position);

    session.dispatch(SessionCommand::Continue).expect("continue");
    assert_eq!(session.level().player().position, saved_position);
}

#[test]
fn session_refuses_to_save_a_dead_player() {
    let temp = TempDir::new().expect("tempdir");
    let content = catalog(&["1...\n####"]);
    let mut session = GameSession::start(&content, temp.path().to_path_buf(), 0).expect("start");
    session.level_mut().player_mut().kill();

    let error = session.dispatch(SessionCommand::Save).unwrap_err();
    assert!(matches!(error, SessionError::Save(SaveError::PlayerDead)));
    assert!(!temp.path().join(SAVE_FILE_NAME).exists());
}

#[test]
fn revive_reloads_level_with_checkpoint_stats() {
    let temp = TempDir::new().expect("tempdir");
    let content = catalog(&["1...\n####"]);
    let mut session = GameSession::start(&content, temp.path().to_path_buf(), 0).expect("start");
    session.level_mut().player_mut().take_damage(5, 0.0);
    session.level_mut().player_mut().kill();

    session.dispatch(SessionCommand::Revive).expect("revive");
    let player = session.level().player();
    assert!(player.is_alive());
    assert_eq!(player.stats, NEW_GAME_STATS);
    assert_eq!(player.position, session.level().start());
}

#[test]
fn advancing_wraps_and_carries_stats() {
    let temp = TempDir::new().expect("tempdir");
    let content = catalog(&["1...\n####", "..1.\n####"]);
    let mut session = GameSession::start(&content, temp.path().to_path_buf(), 1).expect("start");
    assert_eq!(session.level_index(), 1);
    session.level_mut().player_mut().take_damage(4, 0.0);

    session.dispatch(SessionCommand::AdvanceLevel).expect("advance");
    assert_eq!(session.level_index(), 0);
    assert_eq!(session.level().player().stats.hit_points, 16);
    assert_eq!(session.checkpoint().hit_points, 16);
}

#[test]
fn start_level_wraps_into_range() {
    let temp = TempDir::new().expect("tempdir");
    let content = catalog(&["1...\n####", "..1.\n####"]);
    let session = GameSession::start(&content, temp.path().to_path_buf(), 5).expect("start");
    assert_eq!(session.level_index(), 1);
}

#[test]
fn reaching_the_exit_moves_to_the_next_level() {
    let temp = TempDir::new().expect("tempdir");
    let content = catalog(&["1...X\n#####", "..1.\n####"]);
    let mut session = GameSession::start(&content, temp.path().to_path_buf(), 0).expect("start");
    for _ in 0..120 {
        session.tick(DT, RIGHT).expect("tick");
        if session.level_index() == 1 {
            break;
        }
    }
    assert_eq!(session.level_index(), 1);
}

#[test]
fn paused_session_does_not_simulate() {
    let temp = TempDir::new().expect("tempdir");
    let content = catalog(&["1...\n####"]);
    let mut session = GameSession::start(&content, temp.path().to_path_buf(), 0).expect("start");
    session.dispatch(SessionCommand::TogglePause).expect("pause");
    let before = session.level().player().position;

    for _ in 0..10 {
        session.tick(DT, RIGHT).expect("tick");
    }
    assert!(session.is_paused());
    assert_eq!(session.level().player().position, before);

    session.dispatch(SessionCommand::NewGame).expect("new game");
    assert!(!session.is_paused());
}

#[test]
fn pause_freezes_invulnerability_and_messages() {
    let temp = TempDir::new().expect("tempdir");
    let content = catalog(&["..1A...\n#######"]);
    let mut session = GameSession::start(&content, temp.path().to_path_buf(), 0).expect("start");

    let mut hit = false;
    for _ in 0..60 {
        session.tick(DT, PlayerInput::default()).expect("tick");
        if session
            .level()
            .events()
            .iter()
            .any(|event| matches!(event, LevelEvent::PlayerDamaged { .. }))
        {
            hit = true;
            break;
        }
    }
    assert!(hit);
    let hit_points = session.level().player().stats.hit_points;
    let hit_at = session.level().now();

    session.dispatch(SessionCommand::TogglePause).expect("pause");
    for _ in 0..120 {
        session.tick(DT, PlayerInput::default()).expect("tick");
    }
    assert_eq!(session.level().now(), hit_at);
    session.dispatch(SessionCommand::TogglePause).expect("resume");
    session.tick(DT, PlayerInput::default()).expect("tick");

    let player = session.level().player();
    assert!(player.is_invulnerable());
    assert_eq!(player.stats.hit_points, hit_points);
    assert!(!session.level().messages().is_empty());
}

#[test]
fn continue_with_mismatched_enemy_count_keeps_current_game() {
    let temp = TempDir::new().expect("tempdir");
    let text = "1..A\n####";
    let content = catalog(&[text]);
    let mut session = GameSession::start(&content, temp.path().to_path_buf(), 0).expect("start");

    let mut snapshot = session.level().snapshot();
    snapshot.enemies.clear();
    snapshot.player_position = Vec2::new(80.0, 32.0);
    let record = SaveRecord::from_snapshot(0, &fingerprint_level_text(text), &snapshot);
    write_save(&temp.path().join(SAVE_FILE_NAME), &record).expect("write");

    let before = session.level().player().position;
    let error = session.dispatch(SessionCommand::Continue).unwrap_err();
    assert!(matches!(
        error,
        SessionError::Level {
            source: LevelLoadError::EnemyCountMismatch {
                expected: 1,
                actual: 0
            },
            ..
        }
    ));
    assert_eq!(session.level().player().position, before);
}

#[test]
fn continue_without_a_save_reports_missing() {
    let temp = TempDir::new().expect("tempdir");
    let content = catalog(&["1...\n####"]);
    let mut session = GameSession::start(&content, temp.path().to_path_buf(), 0).expect("start");
    let error = session.dispatch(SessionCommand::Continue).unwrap_err();
    assert!(matches!(error, SessionError::Save(SaveError::Missing(_))));
}

#[test]
fn first_start_writes_default_options() {
    let temp = TempDir::new().expect("tempdir");
    let content = catalog(&["1...\n####"]);
    let session = GameSession::start(&content, temp.path().to_path_buf(), 0).expect("start");

    assert_eq!(session.options(), OptionsRecord::default());
    let stored = OptionsRecord::load(&temp.path().join(OPTIONS_FILE_NAME)).expect("options");
    assert_eq!(stored, OptionsRecord::default());
}
