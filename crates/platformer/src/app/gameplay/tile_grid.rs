use engine::{Rect, SpeciesDatabase, SpeciesId, Vec2};
use thiserror::Error;

pub(crate) const TILE_WIDTH: f32 = 32.0;
pub(crate) const TILE_HEIGHT: f32 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TileCollision {
    Passable,
    Impassable,
    /// Solid only when landed on from above.
    Platform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tile {
    pub has_visual: bool,
    pub collision: TileCollision,
}

impl Tile {
    const EMPTY: Tile = Tile {
        has_visual: false,
        collision: TileCollision::Passable,
    };
    const BLOCK: Tile = Tile {
        has_visual: true,
        collision: TileCollision::Impassable,
    };
    const PLATFORM: Tile = Tile {
        has_visual: true,
        collision: TileCollision::Platform,
    };
    const DECORATION: Tile = Tile {
        has_visual: true,
        collision: TileCollision::Passable,
    };
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum LevelLoadError {
    #[error("level description is empty")]
    Empty,
    #[error("row {row} has width {actual}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("unknown tile character '{ch}' at row {row}, column {column}")]
    UnknownTile { ch: char, row: usize, column: usize },
    #[error("duplicate start marker at row {row}, column {column}")]
    DuplicateStart { row: usize, column: usize },
    #[error("duplicate exit marker at row {row}, column {column}")]
    DuplicateExit { row: usize, column: usize },
    #[error("level has no start marker")]
    MissingStart,
    #[error("spawn references species {0:?} missing from the species database")]
    UnknownSpecies(SpeciesId),
    #[error("snapshot holds {actual} enemies but the level spawned {expected}")]
    EnemyCountMismatch { expected: usize, actual: usize },
}

/// Immutable collision grid for one level. Cell `(x, y)` covers
/// `[x*32, (x+1)*32) x [y*32, (y+1)*32)` in world units, y down.
#[derive(Debug, Clone)]
pub(crate) struct TileGrid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn height(&self) -> usize {
        self.height
    }

    pub(crate) fn pixel_size(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * TILE_WIDTH,
            self.height as f32 * TILE_HEIGHT,
        )
    }

    pub(crate) fn tile(&self, x: usize, y: usize) -> Option<Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get(y * self.width + x).copied()
    }

    /// Sides of the level are walls; above and below are open air.
    pub(crate) fn collision_at(&self, x: i32, y: i32) -> TileCollision {
        if x < 0 || x as usize >= self.width {
            return TileCollision::Impassable;
        }
        if y < 0 || y as usize >= self.height {
            return TileCollision::Passable;
        }
        self.tiles[y as usize * self.width + x as usize].collision
    }

    pub(crate) fn cell_bounds(x: i32, y: i32) -> Rect {
        Rect::new(
            x as f32 * TILE_WIDTH,
            y as f32 * TILE_HEIGHT,
            TILE_WIDTH,
            TILE_HEIGHT,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EnemySpawn {
    pub species: SpeciesId,
    pub position: Vec2,
}

/// A parsed level description: the grid plus the markers found while scanning it.
#[derive(Debug, Clone)]
pub(crate) struct LevelLayout {
    pub grid: TileGrid,
    pub start: Vec2,
    pub exit: Option<Vec2>,
    /// Row-major scan order; this order is the enemy identity used by snapshots.
    pub spawns: Vec<EnemySpawn>,
}

impl LevelLayout {
    /// Parses one line per row. A trailing `\r` per line and one trailing newline are tolerated.
    pub(crate) fn parse(text: &str, species: &SpeciesDatabase) -> Result<Self, LevelLoadError> {
        let mut rows: Vec<&str> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        if rows.last().is_some_and(|row| row.is_empty()) {
            rows.pop();
        }
        if rows.is_empty() || rows.iter().all(|row| row.is_empty()) {
            return Err(LevelLoadError::Empty);
        }

        let width = rows[0].chars().count();
        let height = rows.len();
        let mut tiles = Vec::with_capacity(width * height);
        let mut start = None;
        let mut exit = None;
        let mut spawns = Vec::new();

        for (row, line) in rows.iter().enumerate() {
            let actual = line.chars().count();
            if actual != width {
                return Err(LevelLoadError::RaggedRow {
                    row,
                    expected: width,
                    actual,
                });
            }

            for (column, ch) in line.chars().enumerate() {
                let cell = TileGrid::cell_bounds(column as i32, row as i32);
                let bottom_center = Vec2::new(cell.center().x, cell.bottom());
                let tile = match ch {
                    '.' => Tile::EMPTY,
                    '#' => Tile::BLOCK,
                    'T' => Tile::PLATFORM,
                    '0' => Tile::DECORATION,
                    '1' => {
                        if start.replace(bottom_center).is_some() {
                            return Err(LevelLoadError::DuplicateStart { row, column });
                        }
                        Tile::EMPTY
                    }
                    'X' => {
                        if exit.replace(cell.center()).is_some() {
                            return Err(LevelLoadError::DuplicateExit { row, column });
                        }
                        Tile::EMPTY
                    }
                    other => {
                        let def = species
                            .by_marker(other)
                            .ok_or(LevelLoadError::UnknownTile {
                                ch: other,
                                row,
                                column,
                            })?;
                        spawns.push(EnemySpawn {
                            species: def.id,
                            position: bottom_center,
                        });
                        Tile::EMPTY
                    }
                };
                tiles.push(tile);
            }
        }

        let start = start.ok_or(LevelLoadError::MissingStart)?;
        Ok(Self {
            grid: TileGrid {
                width,
                height,
                tiles,
            },
            start,
            exit,
            spawns,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use engine::{SpeciesDatabase, SpeciesDef, SpeciesId};

    use super::*;

    pub(crate) fn stock_species() -> SpeciesDatabase {
        let def = |name: &str, marker: char, hp: i32, strength: i32, vitality: i32| SpeciesDef {
            id: SpeciesId(0),
            def_name: name.to_string(),
            label: name.to_string(),
            marker,
            max_hit_points: hp,
            strength,
            dexterity: 0,
            vitality,
            move_speed: 84.0,
            bounds_width: 22.0,
            bounds_height: 40.0,
        };
        SpeciesDatabase::from_defs(vec![
            def("EnemyA", 'A', 3, 5, 0),
            def("EnemyB", 'B', 10, 25, 2),
            def("EnemyC", 'C', 8, 10, 100),
        ])
    }

    fn parse(text: &str) -> Result<LevelLayout, LevelLoadError> {
        LevelLayout::parse(text, &stock_species())
    }

    #[test]
    fn out_of_bounds_is_wall_at_sides_and_air_above_and_below() {
        let layout = parse("1..\n###\n").expect("parse");
        let grid = &layout.grid;

        assert_eq!(grid.collision_at(-1, 0), TileCollision::Impassable);
        assert_eq!(grid.collision_at(3, 1), TileCollision::Impassable);
        assert_eq!(grid.collision_at(-5, -5), TileCollision::Impassable);
        assert_eq!(grid.collision_at(1, -1), TileCollision::Passable);
        assert_eq!(grid.collision_at(1, 2), TileCollision::Passable);
        assert_eq!(grid.collision_at(1, 1), TileCollision::Impassable);
        assert_eq!(grid.collision_at(1, 0), TileCollision::Passable);
    }

    #[test]
    fn markers_resolve_to_positions() {
        let layout = parse("1.A.X\r\n..T0.\r\n#####").expect("parse");

        assert_eq!(layout.grid.width(), 5);
        assert_eq!(layout.grid.height(), 3);
        assert_eq!(layout.start, Vec2::new(16.0, 32.0));
        assert_eq!(layout.exit, Some(Vec2::new(144.0, 16.0)));
        assert_eq!(layout.spawns.len(), 1);
        assert_eq!(layout.spawns[0].position, Vec2::new(80.0, 32.0));
        assert_eq!(layout.grid.collision_at(2, 1), TileCollision::Platform);
        assert_eq!(
            layout.grid.tile(3, 1),
            Some(Tile {
                has_visual: true,
                collision: TileCollision::Passable
            })
        );
    }

    #[test]
    fn spawns_keep_scan_order() {
        let layout = parse("C.1.A\nB....\n#####").expect("parse");
        let species = stock_species();
        let names: Vec<_> = layout
            .spawns
            .iter()
            .filter_map(|spawn| species.species(spawn.species))
            .map(|def| def.def_name.as_str())
            .collect();
        assert_eq!(names, vec!["EnemyC", "EnemyA", "EnemyB"]);
    }

    #[test]
    fn malformed_levels_are_rejected() {
        assert_eq!(parse("").unwrap_err(), LevelLoadError::Empty);
        assert_eq!(
            parse("1..\n##\n").unwrap_err(),
            LevelLoadError::RaggedRow {
                row: 1,
                expected: 3,
                actual: 2
            }
        );
        assert_eq!(
            parse("1.Z\n###").unwrap_err(),
            LevelLoadError::UnknownTile {
                ch: 'Z',
                row: 0,
                column: 2
            }
        );
        assert_eq!(
            parse("1.1\n###").unwrap_err(),
            LevelLoadError::DuplicateStart { row: 0, column: 2 }
        );
        assert_eq!(
            parse("1XX\n###").unwrap_err(),
            LevelLoadError::DuplicateExit { row: 0, column: 2 }
        );
        assert_eq!(parse("..X\n###").unwrap_err(), LevelLoadError::MissingStart);
    }

    #[test]
    fn exit_is_optional() {
        let layout = parse("1..\n###").expect("parse");
        assert!(layout.exit.is_none());
    }
}
