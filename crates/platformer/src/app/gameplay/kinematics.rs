use engine::{Rect, Vec2};

use super::tile_grid::{TileCollision, TileGrid, TILE_HEIGHT, TILE_WIDTH};

/// Slack used when deciding which cells an edge touches, so an actor resting
/// exactly on a cell boundary is not treated as overlapping the next cell.
const EDGE_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Facing {
    Left,
    Right,
}

impl Facing {
    pub(crate) fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub(crate) fn flipped(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

/// Actor-space box relative to the bottom-center anchor.
pub(crate) fn bounding_rect(position: Vec2, local_bounds: Rect) -> Rect {
    local_bounds.translated(position)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MotionResult {
    pub position: Vec2,
    pub velocity: Vec2,
    pub on_ground: bool,
    pub hit_wall: bool,
    pub hit_ceiling: bool,
}

/// Moves an actor by `velocity * dt`, X first and then Y, stopping at the first
/// blocking cell on each axis. Platforms only stop downward motion that starts above them.
pub(crate) fn resolve_motion(
    grid: &TileGrid,
    position: Vec2,
    velocity: Vec2,
    local_bounds: Rect,
    dt: f32,
) -> MotionResult {
    let mut result = MotionResult {
        position,
        velocity,
        on_ground: false,
        hit_wall: false,
        hit_ceiling: false,
    };

    let dx = velocity.x * dt;
    if dx != 0.0 {
        let rect = bounding_rect(result.position, local_bounds);
        match sweep_x(grid, rect, dx) {
            Some(clamped_dx) => {
                result.position.x += clamped_dx;
                result.velocity.x = 0.0;
                result.hit_wall = true;
            }
            None => result.position.x += dx,
        }
    }

    let dy = velocity.y * dt;
    if dy > 0.0 {
        let rect = bounding_rect(result.position, local_bounds);
        match sweep_down(grid, rect, dy) {
            Some(clamped_dy) => {
                result.position.y += clamped_dy;
                result.velocity.y = 0.0;
                result.on_ground = true;
            }
            None => result.position.y += dy,
        }
    } else if dy < 0.0 {
        let rect = bounding_rect(result.position, local_bounds);
        match sweep_up(grid, rect, dy) {
            Some(clamped_dy) => {
                result.position.y += clamped_dy;
                result.velocity.y = 0.0;
                result.hit_ceiling = true;
            }
            None => result.position.y += dy,
        }
    }

    if !result.on_ground && result.velocity.y >= 0.0 {
        result.on_ground = is_grounded(grid, result.position, local_bounds);
    }
    result
}

/// Resting check: feet on a row boundary with a solid or platform cell directly below.
pub(crate) fn is_grounded(grid: &TileGrid, position: Vec2, local_bounds: Rect) -> bool {
    let rect = bounding_rect(position, local_bounds);
    let row_boundary = (rect.bottom() / TILE_HEIGHT).round();
    if (rect.bottom() - row_boundary * TILE_HEIGHT).abs() > EDGE_EPSILON {
        return false;
    }
    let row = row_boundary as i32;
    columns_spanned(rect).any(|column| supports_landing(grid.collision_at(column, row)))
}

fn supports_landing(collision: TileCollision) -> bool {
    matches!(
        collision,
        TileCollision::Impassable | TileCollision::Platform
    )
}

fn columns_spanned(rect: Rect) -> impl Iterator<Item = i32> {
    let first = ((rect.left() + EDGE_EPSILON) / TILE_WIDTH).floor() as i32;
    let last = ((rect.right() - EDGE_EPSILON) / TILE_WIDTH).floor() as i32;
    first..=last
}

fn rows_spanned(rect: Rect) -> impl Iterator<Item = i32> {
    let first = ((rect.top() + EDGE_EPSILON) / TILE_HEIGHT).floor() as i32;
    let last = ((rect.bottom() - EDGE_EPSILON) / TILE_HEIGHT).floor() as i32;
    first..=last
}

fn column_blocks(grid: &TileGrid, column: i32, rect: Rect) -> bool {
    rows_spanned(rect).any(|row| grid.collision_at(column, row) == TileCollision::Impassable)
}

/// Returns the allowed displacement when a wall is hit.
fn sweep_x(grid: &TileGrid, rect: Rect, dx: f32) -> Option<f32> {
    if dx > 0.0 {
        let old_edge = rect.right();
        let new_edge = old_edge + dx;
        let first = ((old_edge - EDGE_EPSILON) / TILE_WIDTH).floor() as i32 + 1;
        let last = ((new_edge - EDGE_EPSILON) / TILE_WIDTH).floor() as i32;
        (first..=last)
            .find(|column| column_blocks(grid, *column, rect))
            .map(|column| column as f32 * TILE_WIDTH - old_edge)
    } else {
        let old_edge = rect.left();
        let new_edge = old_edge + dx;
        let first = ((old_edge + EDGE_EPSILON) / TILE_WIDTH).floor() as i32 - 1;
        let last = ((new_edge + EDGE_EPSILON) / TILE_WIDTH).floor() as i32;
        (last..=first)
            .rev()
            .find(|column| column_blocks(grid, *column, rect))
            .map(|column| (column + 1) as f32 * TILE_WIDTH - old_edge)
    }
}

fn sweep_down(grid: &TileGrid, rect: Rect, dy: f32) -> Option<f32> {
    let old_edge = rect.bottom();
    let new_edge = old_edge + dy;
    let first = ((old_edge - EDGE_EPSILON) / TILE_HEIGHT).ceil() as i32;
    let last = (new_edge / TILE_HEIGHT).ceil() as i32 - 1;
    (first..=last)
        .find(|row| {
            columns_spanned(rect).any(|column| supports_landing(grid.collision_at(column, *row)))
        })
        .map(|row| row as f32 * TILE_HEIGHT - old_edge)
}

fn sweep_up(grid: &TileGrid, rect: Rect, dy: f32) -> Option<f32> {
    let old_edge = rect.top();
    let new_edge = old_edge + dy;
    let first = ((old_edge + EDGE_EPSILON) / TILE_HEIGHT).floor() as i32 - 1;
    let last = ((new_edge + EDGE_EPSILON) / TILE_HEIGHT).floor() as i32;
    (last..=first)
        .rev()
        .find(|row| {
            columns_spanned(rect)
                .any(|column| grid.collision_at(column, *row) == TileCollision::Impassable)
        })
        .map(|row| (row + 1) as f32 * TILE_HEIGHT - old_edge)
}

#[cfg(test)]
mod tests {
    use super::super::tile_grid::tests::stock_species;
    use super::super::tile_grid::LevelLayout;
    use super::*;

    const BODY: Rect = Rect::new(-10.0, -28.0, 20.0, 28.0);
    const DT: f32 = 1.0 / 60.0;

    fn grid(text: &str) -> TileGrid {
        LevelLayout::parse(text, &stock_species())
            .expect("parse")
            .grid
    }

    #[test]
    fn falling_actor_lands_on_block_top() {
        let grid = grid("1...\n....\n####");
        let result = resolve_motion(&grid, Vec2::new(48.0, 60.0), Vec2::new(0.0, 600.0), BODY, DT);

        assert_eq!(result.position.y, 64.0);
        assert_eq!(result.velocity.y, 0.0);
        assert!(result.on_ground);
    }

    #[test]
    fn fast_fall_does_not_tunnel_through_floor() {
        let grid = grid("1...\n....\n####");
        let result = resolve_motion(&grid, Vec2::new(48.0, 10.0), Vec2::new(0.0, 9000.0), BODY, DT);

        assert_eq!(result.position.y, 64.0);
        assert!(result.on_ground);
    }

    #[test]
    fn platform_catches_from_above_only() {
        let grid = grid("1...\n.TT.\n....\n####");

        let landing = resolve_motion(&grid, Vec2::new(48.0, 30.0), Vec2::new(0.0, 300.0), BODY, DT);
        assert_eq!(landing.position.y, 32.0);
        assert!(landing.on_ground);

        let rising = resolve_motion(&grid, Vec2::new(48.0, 96.0), Vec2::new(0.0, -1200.0), BODY, DT);
        assert!((rising.position.y - 76.0).abs() < 0.001);
        assert!(!rising.hit_ceiling);
        assert!(!rising.on_ground);
    }

    #[test]
    fn platform_does_not_block_sideways() {
        let grid = grid("1...\n.T..\n####");
        let result = resolve_motion(&grid, Vec2::new(80.0, 64.0), Vec2::new(-600.0, 0.0), BODY, DT);

        assert!((result.position.x - 70.0).abs() < 0.001);
        assert!(!result.hit_wall);
        assert!(result.on_ground);
    }

    #[test]
    fn wall_clamps_to_cell_edge() {
        let grid = grid("1..#\n...#\n####");
        let result = resolve_motion(&grid, Vec2::new(80.0, 64.0), Vec2::new(1200.0, 0.0), BODY, DT);

        assert_eq!(result.position.x, 86.0);
        assert_eq!(result.velocity.x, 0.0);
        assert!(result.hit_wall);
    }

    #[test]
    fn level_sides_act_as_walls() {
        let grid = grid("1...\n####");
        let result = resolve_motion(&grid, Vec2::new(12.0, 32.0), Vec2::new(-600.0, 0.0), BODY, DT);

        assert_eq!(result.position.x, 10.0);
        assert!(result.hit_wall);
    }

    #[test]
    fn ceiling_stops_upward_motion() {
        let grid = grid("####\n1...\n....\n####");
        let result = resolve_motion(&grid, Vec2::new(48.0, 64.0), Vec2::new(0.0, -1200.0), BODY, DT);

        assert_eq!(result.position.y, 60.0);
        assert!(result.hit_ceiling);
        assert_eq!(result.velocity.y, 0.0);
    }

    #[test]
    fn bottom_of_grid_is_open() {
        let grid = grid("1...\n....");
        let result = resolve_motion(&grid, Vec2::new(48.0, 60.0), Vec2::new(0.0, 600.0), BODY, DT);

        assert_eq!(result.position.y, 70.0);
        assert!(!result.on_ground);
    }

    #[test]
    fn grounded_requires_support_under_feet() {
        let grid = grid("1...\n##..");
        assert!(is_grounded(&grid, Vec2::new(16.0, 32.0), BODY));
        assert!(is_grounded(&grid, Vec2::new(68.0, 32.0), BODY));
        assert!(!is_grounded(&grid, Vec2::new(112.0, 32.0), BODY));
        assert!(!is_grounded(&grid, Vec2::new(16.0, 30.0), BODY));
    }

    #[test]
    fn zero_velocity_keeps_position() {
        let grid = grid("1...\n####");
        let result = resolve_motion(&grid, Vec2::new(48.0, 32.0), Vec2::ZERO, BODY, DT);
        assert_eq!(result.position, Vec2::new(48.0, 32.0));
        assert!(result.on_ground);
    }
}
