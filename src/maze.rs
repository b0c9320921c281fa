use std::collections::{HashSet, VecDeque};

use crate::constants::{LOOP_PUNCH_CHANCE, MIN_MAZE_SIZE, STRUCTURE_FOOTPRINT};
use crate::grid::{Grid, GridError};
use crate::rng::Rng;
use crate::types::{Cell, Direction, DoorState, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructureSide {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Clone, Debug)]
pub struct GeneratedMaze {
    pub grid: Grid,
    pub door_positions: Vec<Vec2>,
    pub portal: Vec2,
    pub structure_side: StructureSide,
}

pub const CARVE_START: Vec2 = Vec2::new(1, 1);

pub fn generate_maze(rows: i32, cols: i32, rng: &mut Rng) -> Result<GeneratedMaze, GridError> {
    if rows < MIN_MAZE_SIZE || cols < MIN_MAZE_SIZE || rows % 2 == 0 || cols % 2 == 0 {
        return Err(GridError::InvalidDimensions {
            rows,
            cols,
            min: MIN_MAZE_SIZE,
        });
    }

    let mut grid = Grid::filled(cols, rows, Cell::Wall);
    stamp_border(&mut grid)?;
    carve_passages(&mut grid, rng)?;
    remove_dead_ends(&mut grid, rng)?;
    stamp_border(&mut grid)?;

    let structure_side = match rng.int(0, 3) {
        0 => StructureSide::Top,
        1 => StructureSide::Bottom,
        2 => StructureSide::Left,
        _ => StructureSide::Right,
    };
    let (portal, door) = inject_portal_structure(&mut grid, structure_side)?;

    Ok(GeneratedMaze {
        grid,
        door_positions: vec![door],
        portal,
        structure_side,
    })
}

pub fn add_zone(grid: &mut Grid, origin: Vec2, fill: Cell) -> Result<(), GridError> {
    for y in origin.y..origin.y + 3 {
        for x in origin.x..origin.x + 3 {
            if !is_interior(grid, x, y) || grid.cell_at(x, y)?.is_structure() {
                continue;
            }
            grid.set_cell(x, y, fill)?;
        }
    }
    Ok(())
}

pub fn zone_origin_around(center: Vec2) -> Vec2 {
    Vec2::new(center.x - 1, center.y - 1)
}

pub fn toggle_doors(
    grid: &mut Grid,
    door_positions: &[Vec2],
    state: DoorState,
) -> Result<(), GridError> {
    for door in door_positions {
        grid.set_cell(door.x, door.y, state.cell())?;
    }
    Ok(())
}

pub fn reachable_cells(
    grid: &Grid,
    start: Vec2,
    passable: impl Fn(Cell) -> bool,
) -> HashSet<Vec2> {
    let mut out = HashSet::new();
    if !grid.at(start).map(&passable).unwrap_or(false) {
        return out;
    }

    let mut queue = VecDeque::new();
    out.insert(start);
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        for dir in Direction::CARDINAL {
            let next = pos.step(dir);
            if !grid.at(next).map(&passable).unwrap_or(false) {
                continue;
            }
            if out.insert(next) {
                queue.push_back(next);
            }
        }
    }

    out
}

fn is_interior(grid: &Grid, x: i32, y: i32) -> bool {
    x >= 1 && y >= 1 && x < grid.width() - 1 && y < grid.height() - 1
}

fn stamp_border(grid: &mut Grid) -> Result<(), GridError> {
    let (width, height) = (grid.width(), grid.height());
    for x in 0..width {
        grid.set_cell(x, 0, Cell::Border)?;
        grid.set_cell(x, height - 1, Cell::Border)?;
    }
    for y in 0..height {
        grid.set_cell(0, y, Cell::Border)?;
        grid.set_cell(width - 1, y, Cell::Border)?;
    }
    Ok(())
}

struct CarveFrame {
    pos: Vec2,
    dirs: [Direction; 4],
    next: usize,
}

fn shuffled_directions(rng: &mut Rng) -> [Direction; 4] {
    let mut dirs = Direction::CARDINAL;
    rng.shuffle(&mut dirs);
    dirs
}

fn carve_passages(grid: &mut Grid, rng: &mut Rng) -> Result<(), GridError> {
    grid.set_cell(CARVE_START.x, CARVE_START.y, Cell::Path)?;
    let mut stack = vec![CarveFrame {
        pos: CARVE_START,
        dirs: shuffled_directions(rng),
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        if frame.next >= frame.dirs.len() {
            stack.pop();
            continue;
        }
        let dir = frame.dirs[frame.next];
        frame.next += 1;
        let pos = frame.pos;

        let mid = pos.step(dir);
        let target = mid.step(dir);
        if !is_interior(grid, target.x, target.y) || grid.at(target) != Some(Cell::Wall) {
            continue;
        }
        grid.set_cell(mid.x, mid.y, Cell::Path)?;
        grid.set_cell(target.x, target.y, Cell::Path)?;

        if rng.bool(LOOP_PUNCH_CHANCE) {
            let extra = target.step(Direction::CARDINAL[rng.pick_index(4)]);
            if is_interior(grid, extra.x, extra.y) && grid.at(extra) == Some(Cell::Wall) {
                grid.set_cell(extra.x, extra.y, Cell::Path)?;
            }
        }

        stack.push(CarveFrame {
            pos: target,
            dirs: shuffled_directions(rng),
            next: 0,
        });
    }
    Ok(())
}

fn remove_dead_ends(grid: &mut Grid, rng: &mut Rng) -> Result<(), GridError> {
    for y in 1..grid.height() - 1 {
        for x in 1..grid.width() - 1 {
            let pos = Vec2::new(x, y);
            if grid.at(pos) != Some(Cell::Path) {
                continue;
            }
            let exits = Direction::CARDINAL
                .iter()
                .filter(|dir| grid.at(pos.step(**dir)) == Some(Cell::Path))
                .count();
            if exits != 1 {
                continue;
            }
            for dir in shuffled_directions(rng) {
                let next = pos.step(dir);
                if is_interior(grid, next.x, next.y) && grid.at(next) == Some(Cell::Wall) {
                    grid.set_cell(next.x, next.y, Cell::Path)?;
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Returns `(portal, door)`.
fn inject_portal_structure(
    grid: &mut Grid,
    side: StructureSide,
) -> Result<(Vec2, Vec2), GridError> {
    let size = STRUCTURE_FOOTPRINT;
    let center = grid.center();
    let origin = match side {
        StructureSide::Top => Vec2::new(center.x - size / 2, 1),
        StructureSide::Bottom => Vec2::new(center.x - size / 2, grid.height() - 1 - size),
        StructureSide::Left => Vec2::new(1, center.y - size / 2),
        StructureSide::Right => Vec2::new(grid.width() - 1 - size, center.y - size / 2),
    };

    let last = size - 1;
    let mid = size / 2;
    for ly in 0..size {
        for lx in 0..size {
            let cell = if lx == 0 || ly == 0 || lx == last || ly == last {
                Cell::Path
            } else if lx == 1 || ly == 1 || lx == last - 1 || ly == last - 1 {
                Cell::Wall
            } else if lx == mid && ly == mid {
                Cell::Portal
            } else {
                Cell::StructureFloor
            };
            grid.set_cell(origin.x + lx, origin.y + ly, cell)?;
        }
    }

    let door_local = match side {
        StructureSide::Top => Vec2::new(mid, last - 1),
        StructureSide::Bottom => Vec2::new(mid, 1),
        StructureSide::Left => Vec2::new(last - 1, mid),
        StructureSide::Right => Vec2::new(1, mid),
    };
    let door = Vec2::new(origin.x + door_local.x, origin.y + door_local.y);
    grid.set_cell(door.x, door.y, DoorState::Locked.cell())?;

    Ok((Vec2::new(origin.x + mid, origin.y + mid), door))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(cell: Cell) -> bool {
        !cell.is_wall()
    }

    fn assert_border_closed(grid: &Grid) {
        for x in 0..grid.width() {
            assert!(grid.get(x, 0).map(Cell::is_wall).unwrap_or(false));
            assert!(grid.get(x, grid.height() - 1).map(Cell::is_wall).unwrap_or(false));
        }
        for y in 0..grid.height() {
            assert!(grid.get(0, y).map(Cell::is_wall).unwrap_or(false));
            assert!(grid.get(grid.width() - 1, y).map(Cell::is_wall).unwrap_or(false));
        }
    }

    #[test]
    fn every_open_cell_is_reachable_from_carve_start() {
        for seed in 0..200u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(29, 29, &mut rng).expect("valid dimensions");
            let reachable = reachable_cells(&maze.grid, CARVE_START, open);
            let open_cells = maze.grid.positions_of(open);
            assert_eq!(
                reachable.len(),
                open_cells.len(),
                "disconnected maze: seed={seed}"
            );
        }
    }

    #[test]
    fn larger_mazes_stay_connected() {
        for (seed, size) in [(1u32, 31), (2, 41), (3, 61), (4, 45)] {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(size, size, &mut rng).expect("valid dimensions");
            let reachable = reachable_cells(&maze.grid, CARVE_START, open);
            assert_eq!(reachable.len(), maze.grid.positions_of(open).len());
        }
    }

    #[test]
    fn border_is_never_opened() {
        for seed in 0..200u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(29, 33, &mut rng).expect("valid dimensions");
            assert_eq!(maze.grid.width(), 33);
            assert_eq!(maze.grid.height(), 29);
            assert_border_closed(&maze.grid);
        }
    }

    #[test]
    fn exactly_one_portal_and_one_locked_doorway() {
        for seed in 0..100u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(29, 29, &mut rng).expect("valid dimensions");
            let portals = maze.grid.positions_of(|cell| cell == Cell::Portal);
            assert_eq!(portals, vec![maze.portal]);
            assert!(!maze.door_positions.is_empty());
            assert_eq!(
                maze.grid.positions_of(Cell::is_door),
                maze.door_positions
            );
            for door in &maze.door_positions {
                assert_eq!(maze.grid.at(*door), Some(Cell::DoorLocked));
            }
        }
    }

    #[test]
    fn portal_room_is_sealed_except_for_the_doorway() {
        for seed in 0..100u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(29, 29, &mut rng).expect("valid dimensions");
            let reachable = reachable_cells(&maze.grid, CARVE_START, |cell| {
                !cell.is_wall() && !cell.is_door()
            });
            assert!(!reachable.contains(&maze.portal), "seed={seed}");
        }
    }

    #[test]
    fn spawn_zones_never_breach_the_portal_room_on_the_smallest_maze() {
        for seed in 0..100u32 {
            let mut rng = Rng::new(seed);
            let mut maze =
                generate_maze(MIN_MAZE_SIZE, MIN_MAZE_SIZE, &mut rng).expect("valid dimensions");
            let (w, h) = (maze.grid.width(), maze.grid.height());
            let center = maze.grid.center();
            add_zone(&mut maze.grid, zone_origin_around(center), Cell::SafeZone)
                .expect("zone in bounds");
            for origin in [
                Vec2::new(1, 1),
                Vec2::new(w - 4, 1),
                Vec2::new(1, h - 4),
                Vec2::new(w - 4, h - 4),
            ] {
                add_zone(&mut maze.grid, origin, Cell::Path).expect("zone in bounds");
            }
            let reachable = reachable_cells(&maze.grid, CARVE_START, |cell| {
                !cell.is_wall() && !cell.is_door()
            });
            assert!(
                !reachable.contains(&maze.portal),
                "seed={seed} side={:?}",
                maze.structure_side
            );
        }
    }

    #[test]
    fn dead_end_pass_leaves_no_single_exit_paths() {
        for seed in 0..50u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(29, 29, &mut rng).expect("valid dimensions");
            for pos in maze.grid.positions_of(|cell| cell == Cell::Path) {
                let exits = Direction::CARDINAL
                    .iter()
                    .filter(|dir| maze.grid.at(pos.step(**dir)).map(open).unwrap_or(false))
                    .count();
                assert!(exits >= 2, "dead end at {pos:?}: seed={seed}");
            }
        }
    }

    #[test]
    fn all_structure_sides_appear() {
        let mut seen = HashSet::new();
        for seed in 0..200u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(29, 29, &mut rng).expect("valid dimensions");
            seen.insert(format!("{:?}", maze.structure_side));
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn rejects_even_or_tiny_dimensions() {
        let mut rng = Rng::new(1);
        assert!(matches!(
            generate_maze(28, 29, &mut rng),
            Err(GridError::InvalidDimensions { .. })
        ));
        assert!(generate_maze(9, 9, &mut rng).is_err());
        assert!(generate_maze(MIN_MAZE_SIZE - 2, MIN_MAZE_SIZE, &mut rng).is_err());
        assert!(generate_maze(MIN_MAZE_SIZE, MIN_MAZE_SIZE, &mut rng).is_ok());
    }

    #[test]
    fn toggle_doors_touches_only_door_cells() {
        let mut rng = Rng::new(42);
        let mut maze = generate_maze(29, 29, &mut rng).expect("valid dimensions");
        let before = maze.grid.clone();
        toggle_doors(&mut maze.grid, &maze.door_positions, DoorState::Unlocked)
            .expect("doors in bounds");
        for pos in maze.grid.positions() {
            if maze.door_positions.contains(&pos) {
                assert_eq!(maze.grid.at(pos), Some(Cell::DoorUnlocked));
            } else {
                assert_eq!(maze.grid.at(pos), before.at(pos));
            }
        }
    }

    #[test]
    fn add_zone_opens_three_by_three_and_skips_border() {
        let mut grid = Grid::filled(11, 11, Cell::Wall);
        add_zone(&mut grid, Vec2::new(4, 4), Cell::SafeZone).expect("zone in bounds");
        assert_eq!(grid.positions_of(|cell| cell == Cell::SafeZone).len(), 9);

        let mut edge = Grid::filled(11, 11, Cell::Border);
        add_zone(&mut edge, Vec2::new(-1, -1), Cell::Path).expect("zone clipped to interior");
        assert_eq!(edge.positions_of(|cell| cell == Cell::Path), vec![Vec2::new(1, 1)]);
    }

    #[test]
    fn same_seed_generates_same_maze() {
        let a = generate_maze(31, 31, &mut Rng::new(77)).expect("valid dimensions");
        let b = generate_maze(31, 31, &mut Rng::new(77)).expect("valid dimensions");
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.door_positions, b.door_positions);
    }
}
