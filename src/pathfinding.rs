use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::grid::Grid;
use crate::types::{Cell, Direction, Vec2};

pub fn normal_walkable(cell: Cell) -> bool {
    matches!(cell, Cell::Path | Cell::StructureFloor | Cell::DoorUnlocked)
}

pub fn phasing_walkable(cell: Cell) -> bool {
    cell != Cell::Border
}

pub fn player_walkable(cell: Cell) -> bool {
    !cell.is_wall() && !matches!(cell, Cell::DoorLocked | Cell::DoorIncorrect)
}

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    f: f32,
    order: u64,
    pos: Vec2,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    // BinaryHeap is a max-heap: lowest f first, then earliest insertion.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.order.cmp(&self.order))
    }
}

pub fn find_path(
    start: Vec2,
    goal: Vec2,
    grid: &Grid,
    walkable: impl Fn(Cell) -> bool,
) -> Vec<Vec2> {
    if start == goal || !grid.within_bounds(start.x, start.y) {
        return Vec::new();
    }
    if !grid.at(goal).map(&walkable).unwrap_or(false) {
        return Vec::new();
    }

    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<Vec2, Vec2> = HashMap::new();
    let mut g_score: HashMap<Vec2, u32> = HashMap::new();
    let mut order = 0u64;

    g_score.insert(start, 0);
    open.push(OpenNode {
        f: start.distance(goal),
        order,
        pos: start,
    });

    while let Some(OpenNode { pos: current, f, .. }) = open.pop() {
        if current == goal {
            return reconstruct_path(&came_from, start, goal);
        }
        let current_g = g_score.get(&current).copied().unwrap_or(u32::MAX);
        if f > current_g as f32 + current.distance(goal) + f32::EPSILON {
            continue;
        }

        for dir in [
            Direction::Right,
            Direction::Left,
            Direction::Down,
            Direction::Up,
        ] {
            let next = current.step(dir);
            if !grid.at(next).map(&walkable).unwrap_or(false) {
                continue;
            }
            let tentative = current_g + 1;
            if tentative < g_score.get(&next).copied().unwrap_or(u32::MAX) {
                came_from.insert(next, current);
                g_score.insert(next, tentative);
                order += 1;
                open.push(OpenNode {
                    f: tentative as f32 + next.distance(goal),
                    order,
                    pos: next,
                });
            }
        }
    }

    Vec::new()
}

fn reconstruct_path(came_from: &HashMap<Vec2, Vec2>, start: Vec2, goal: Vec2) -> Vec<Vec2> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(prev) = came_from.get(&current) {
        if *prev == start {
            break;
        }
        path.push(*prev);
        current = *prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::{generate_maze, reachable_cells, CARVE_START};
    use crate::rng::Rng;

    fn open_grid(size: i32) -> Grid {
        Grid::filled(size, size, Cell::Path)
    }

    fn assert_contiguous(start: Vec2, path: &[Vec2]) {
        let mut prev = start;
        for step in path {
            assert_eq!(prev.manhattan(*step), 1, "path jumps from {prev:?} to {step:?}");
            prev = *step;
        }
    }

    #[test]
    fn open_grid_path_has_manhattan_length() {
        let grid = open_grid(5);
        let start = Vec2::new(1, 1);
        let goal = Vec2::new(3, 3);
        let path = find_path(start, goal, &grid, |_| true);
        assert_eq!(path.len(), 4);
        assert_eq!(path.last().copied(), Some(goal));
        assert!(!path.contains(&start));
        assert_contiguous(start, &path);
    }

    #[test]
    fn walled_in_goal_is_unreachable() {
        let mut grid = open_grid(7);
        let goal = Vec2::new(3, 3);
        for dir in Direction::CARDINAL {
            let wall = goal.step(dir);
            grid.set_cell(wall.x, wall.y, Cell::Wall).expect("in bounds");
        }
        let path = find_path(Vec2::new(1, 1), goal, &grid, normal_walkable);
        assert!(path.is_empty());
    }

    #[test]
    fn phasing_walks_through_walls_that_block_normal_agents() {
        let mut grid = open_grid(7);
        for y in 0..7 {
            grid.set_cell(3, y, Cell::Wall).expect("in bounds");
        }
        let start = Vec2::new(1, 3);
        let goal = Vec2::new(5, 3);
        assert!(find_path(start, goal, &grid, normal_walkable).is_empty());
        let phased = find_path(start, goal, &grid, phasing_walkable);
        assert_eq!(phased.len(), 4);
        assert_contiguous(start, &phased);
    }

    #[test]
    fn goal_outside_grid_or_equal_to_start_gives_empty_path() {
        let grid = open_grid(5);
        assert!(find_path(Vec2::new(1, 1), Vec2::new(9, 9), &grid, |_| true).is_empty());
        assert!(find_path(Vec2::new(1, 1), Vec2::new(1, 1), &grid, |_| true).is_empty());
    }

    #[test]
    fn paths_in_generated_mazes_are_shortest() {
        for seed in 0..30u32 {
            let mut rng = Rng::new(seed);
            let maze = generate_maze(29, 29, &mut rng).expect("valid dimensions");
            let reachable = reachable_cells(&maze.grid, CARVE_START, normal_walkable);
            let goal = Vec2::new(27, 27);
            if !reachable.contains(&goal) {
                continue;
            }
            let path = find_path(CARVE_START, goal, &maze.grid, normal_walkable);
            assert_eq!(path.last().copied(), Some(goal));
            assert_contiguous(CARVE_START, &path);
            assert_eq!(path.len(), bfs_distance(&maze.grid, CARVE_START, goal));
        }
    }

    fn bfs_distance(grid: &Grid, start: Vec2, goal: Vec2) -> usize {
        let mut dist = HashMap::new();
        let mut queue = std::collections::VecDeque::new();
        dist.insert(start, 0usize);
        queue.push_back(start);
        while let Some(pos) = queue.pop_front() {
            if pos == goal {
                return dist[&pos];
            }
            for dir in Direction::CARDINAL {
                let next = pos.step(dir);
                if grid.at(next).map(normal_walkable).unwrap_or(false) && !dist.contains_key(&next)
                {
                    dist.insert(next, dist[&pos] + 1);
                    queue.push_back(next);
                }
            }
        }
        usize::MAX
    }
}
