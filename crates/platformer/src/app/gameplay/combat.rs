use engine::{Color, Vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::enemy::Enemy;
use super::level::{DeathCause, LevelEvent};
use super::messages::MessageQueue;
use super::player::Player;

/// Damage text is spawned this far above the top of the struck body.
const MESSAGE_RISE_OFFSET: f32 = 12.0;
pub(crate) const PLAYER_DAMAGE_COLOR: Color = Color::RED;
pub(crate) const ENEMY_DAMAGE_COLOR: Color = Color::WHITE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CombatStats {
    pub hit_points: i32,
    pub max_hit_points: i32,
    pub strength: i32,
    pub dexterity: i32,
    pub vitality: i32,
}

impl CombatStats {
    /// Starts at full health.
    pub(crate) const fn new(max_hit_points: i32, strength: i32, dexterity: i32, vitality: i32) -> Self {
        Self {
            hit_points: max_hit_points,
            max_hit_points,
            strength,
            dexterity,
            vitality,
        }
    }
}

/// Contact damage an enemy deals; a landed hit always costs at least one point.
pub(crate) fn enemy_to_player_damage(attacker_strength: i32, defender_vitality: i32) -> i32 {
    (attacker_strength - defender_vitality).max(1)
}

/// Melee damage the player deals; armour can absorb it fully but never heals.
pub(crate) fn player_to_enemy_damage(attacker_strength: i32, defender_vitality: i32) -> i32 {
    (attacker_strength - defender_vitality).max(0)
}

/// One pass of pairwise checks, in enemy spawn order. Dying and removed enemies take no part.
pub(crate) fn resolve_combat(
    player: &mut Player,
    enemies: &mut [Enemy],
    messages: &mut MessageQueue,
    events: &mut Vec<LevelEvent>,
    now: f64,
) {
    for (index, enemy) in enemies.iter_mut().enumerate() {
        if !enemy.is_alive() {
            continue;
        }
        let enemy_rect = enemy.bounding_rect();

        if player.is_alive()
            && !player.is_invulnerable()
            && !player.is_attacking()
            && enemy_rect.intersects(&player.bounding_rect())
        {
            let damage = enemy_to_player_damage(enemy.stats.strength, player.stats.vitality);
            let killed = player.take_damage(damage, now);
            messages.push(
                damage.to_string(),
                message_origin(player.bounding_rect().top(), player.position.x),
                PLAYER_DAMAGE_COLOR,
                now,
            );
            debug!(
                enemy_index = index,
                damage,
                hit_points = player.stats.hit_points,
                "player_damaged"
            );
            events.push(LevelEvent::PlayerDamaged {
                enemy_index: index,
                damage,
            });
            if killed {
                events.push(LevelEvent::PlayerKilled {
                    cause: DeathCause::Enemy { enemy_index: index },
                });
            }
        }

        let Some(melee) = player.melee_rect() else {
            continue;
        };
        if !enemy.is_invulnerable() && enemy_rect.intersects(&melee) {
            let damage = player_to_enemy_damage(player.stats.strength, enemy.stats.vitality);
            let killed = enemy.take_damage(damage, now);
            messages.push(
                damage.to_string(),
                message_origin(enemy_rect.top(), enemy.position.x),
                ENEMY_DAMAGE_COLOR,
                now,
            );
            debug!(
                enemy_index = index,
                damage,
                hit_points = enemy.stats.hit_points,
                "enemy_damaged"
            );
            events.push(LevelEvent::EnemyDamaged {
                enemy_index: index,
                damage,
            });
            if killed {
                debug!(enemy_index = index, "enemy_killed");
                events.push(LevelEvent::EnemyKilled { enemy_index: index });
            }
        }
    }
}

fn message_origin(top: f32, center_x: f32) -> Vec2 {
    Vec2::new(center_x, top - MESSAGE_RISE_OFFSET)
}

#[cfg(test)]
mod tests {
    use engine::{SimTime, SpeciesDatabase};

    use super::super::enemy::Enemy;
    use super::super::player::PlayerInput;
    use super::super::tile_grid::tests::stock_species;
    use super::super::tile_grid::{EnemySpawn, LevelLayout};
    use super::*;

    fn enemy_at(species: &SpeciesDatabase, marker: char, position: Vec2) -> Enemy {
        let def = species.by_marker(marker).expect("species");
        Enemy::spawn(
            &EnemySpawn {
                species: def.id,
                position,
            },
            def,
        )
    }

    #[test]
    fn damage_floors_differ_by_direction() {
        assert_eq!(enemy_to_player_damage(5, 10), 1);
        assert_eq!(enemy_to_player_damage(25, 1), 24);
        assert_eq!(player_to_enemy_damage(20, 100), 0);
        assert_eq!(player_to_enemy_damage(3, 0), 3);
    }

    #[test]
    fn contact_hit_respects_invulnerability_window() {
        let species = stock_species();
        let mut player = Player::new(Vec2::new(100.0, 64.0), CombatStats::new(3, 1, 0, 10));
        let mut enemies = vec![enemy_at(&species, 'A', Vec2::new(110.0, 64.0))];
        let mut messages = MessageQueue::default();
        let mut events = Vec::new();

        resolve_combat(&mut player, &mut enemies, &mut messages, &mut events, 0.0);
        assert_eq!(player.stats.hit_points, 2);
        assert_eq!(messages.len(), 1);
        let message = messages.iter().next().expect("message");
        assert_eq!(message.text, "1");
        assert_eq!(message.color, PLAYER_DAMAGE_COLOR);

        resolve_combat(&mut player, &mut enemies, &mut messages, &mut events, 0.5);
        assert_eq!(player.stats.hit_points, 2);
        assert_eq!(messages.len(), 1);
        assert_eq!(
            events,
            vec![LevelEvent::PlayerDamaged {
                enemy_index: 0,
                damage: 1
            }]
        );
    }

    fn attacking_player(species: &SpeciesDatabase, stats: CombatStats) -> Player {
        let grid = LevelLayout::parse("1.......\n########", species)
            .expect("parse")
            .grid;
        let mut player = Player::new(Vec2::new(100.0, 32.0), stats);
        let input = PlayerInput {
            attack_pressed: true,
            ..PlayerInput::default()
        };
        player.update(&grid, input, SimTime::new(1.0 / 60.0, 0.0));
        player
    }

    #[test]
    fn armoured_enemy_takes_zero_and_shows_it() {
        let species = stock_species();
        let mut player = attacking_player(&species, CombatStats::new(20, 20, 0, 1));
        let melee = player.melee_rect().expect("attacking");
        let mut enemies = vec![enemy_at(&species, 'C', Vec2::new(melee.center().x, 32.0))];
        let mut messages = MessageQueue::default();
        let mut events = Vec::new();

        resolve_combat(&mut player, &mut enemies, &mut messages, &mut events, 0.0);

        assert_eq!(enemies[0].stats.hit_points, 8);
        assert!(enemies[0].is_invulnerable());
        let message = messages.iter().next().expect("message");
        assert_eq!(message.text, "0");
        assert_eq!(message.color, ENEMY_DAMAGE_COLOR);
        assert_eq!(player.stats.hit_points, 20);
    }

    #[test]
    fn lethal_melee_kills_enemy_once() {
        let species = stock_species();
        let mut player = attacking_player(&species, CombatStats::new(20, 5, 0, 1));
        let x = player.melee_rect().expect("attacking").center().x;
        let mut enemies = vec![enemy_at(&species, 'A', Vec2::new(x, 32.0))];
        let mut messages = MessageQueue::default();
        let mut events = Vec::new();

        resolve_combat(&mut player, &mut enemies, &mut messages, &mut events, 0.0);
        resolve_combat(&mut player, &mut enemies, &mut messages, &mut events, 0.1);

        assert!(!enemies[0].is_alive());
        let kills = events
            .iter()
            .filter(|event| matches!(event, LevelEvent::EnemyKilled { .. }))
            .count();
        assert_eq!(kills, 1);
        assert_eq!(messages.len(), 1);
    }
}
