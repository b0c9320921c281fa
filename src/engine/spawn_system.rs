use super::*;

use crate::constants::{
    enemy_roster_entry, max_enemies_for_floor, maze_size_for_floor,
    ITEM_MIN_DISTANCE_FROM_CENTER, ITEM_MIN_DISTANCE_FROM_EACH_OTHER,
    ITEM_MIN_DISTANCE_FROM_STRUCTURE, PLACEMENT_ATTEMPTS_PER_RELAX, PLACEMENT_RELAX_FACTOR,
};
use crate::maze::{add_zone, generate_maze, zone_origin_around};
use crate::pathfinding::normal_walkable;

use super::utils::{corner_origins, enemy_id, zone_slot};

pub fn select_roster(floor: u32, rng: &mut Rng) -> Vec<EnemyKind> {
    let cap = max_enemies_for_floor(floor);
    let mut roster = Vec::with_capacity(cap);
    let mut pool = Vec::new();
    for kind in EnemyKind::ALL {
        let (unlock_floor, weight) = enemy_roster_entry(kind);
        if weight < 0.0 {
            roster.push(kind);
        } else if floor >= unlock_floor {
            pool.push((kind, weight));
        }
    }

    while roster.len() < cap {
        let weights: Vec<f32> = pool.iter().map(|(_, weight)| *weight).collect();
        let Some(idx) = rng.weighted_index(&weights) else {
            break;
        };
        roster.push(pool.remove(idx).0);
    }
    roster
}

pub fn build_floor(
    number: u32,
    config: &GameConfig,
    rng: &mut Rng,
    now: f64,
) -> Result<FloorState, EngineError> {
    let size = maze_size_for_floor(number);
    let maze = generate_maze(size, size, rng)?;
    let mut grid = maze.grid;
    let center = grid.center();
    add_zone(&mut grid, zone_origin_around(center), Cell::SafeZone)?;

    let roster = select_roster(number, rng);
    let enemies = spawn_enemies(&mut grid, &roster, number, center, now, config, rng)?;

    let key_cells = place_spread(&grid, config.keys_per_floor, &[], &[], rng);
    let real_idx = rng.pick_index(key_cells.len());
    let keys = key_cells
        .into_iter()
        .enumerate()
        .map(|(idx, pos)| Key {
            pos,
            is_real: idx == real_idx,
            collected: false,
        })
        .collect();

    Ok(FloorState {
        number,
        growth: maze_growth_factor(size),
        doors: DoorSet::locked(maze.door_positions),
        portal: maze.portal,
        structure_side: maze.structure_side,
        grid,
        enemies,
        keys,
        powerups: Vec::new(),
        safe_zone_center: center,
    })
}

fn spawn_enemies(
    grid: &mut Grid,
    roster: &[EnemyKind],
    floor: u32,
    player_tile: Vec2,
    now: f64,
    config: &GameConfig,
    rng: &mut Rng,
) -> Result<Vec<Enemy>, GridError> {
    let corners = corner_origins(grid);
    for origin in corners {
        add_zone(grid, origin, Cell::Path)?;
    }

    let mut enemies = Vec::with_capacity(roster.len());
    for (batch, chunk) in roster.chunks(corners.len()).enumerate() {
        let mut order = corners;
        rng.shuffle(&mut order);
        for (slot, kind) in chunk.iter().enumerate() {
            let spawn = spawn_cell(grid, order[slot], batch);
            enemies.push(Enemy::new(
                enemy_id(floor, enemies.len()),
                *kind,
                spawn,
                player_tile,
                now,
                config,
            ));
        }
    }
    Ok(enemies)
}

fn spawn_cell(grid: &Grid, origin: Vec2, batch: usize) -> Vec2 {
    (0..9)
        .map(|offset| zone_slot(origin, batch + offset))
        .find(|pos| grid.at(*pos).map(normal_walkable).unwrap_or(false))
        .unwrap_or_else(|| zone_slot(origin, batch))
}

fn place_spread(
    grid: &Grid,
    count: usize,
    spaced_from: &[Vec2],
    blocked: &[Vec2],
    rng: &mut Rng,
) -> Vec<Vec2> {
    let center = grid.center();
    let structure = grid.positions_of(Cell::is_structure);
    let candidates: Vec<Vec2> = grid
        .positions_of(|cell| cell == Cell::Path)
        .into_iter()
        .filter(|pos| !blocked.contains(pos) && !spaced_from.contains(pos))
        .collect();

    let mut placed: Vec<Vec2> = Vec::with_capacity(count);
    let mut scale = 1.0f32;
    let mut attempts = 0usize;
    while placed.len() < count && placed.len() < candidates.len() {
        attempts += 1;
        if attempts % PLACEMENT_ATTEMPTS_PER_RELAX == 0 {
            scale *= PLACEMENT_RELAX_FACTOR;
        }
        let pos = candidates[rng.pick_index(candidates.len())];
        if placed.contains(&pos) {
            continue;
        }
        let spaced = spaced_from
            .iter()
            .chain(placed.iter())
            .all(|other| other.distance(pos) >= ITEM_MIN_DISTANCE_FROM_EACH_OTHER * scale);
        if spaced
            && pos.distance(center) >= ITEM_MIN_DISTANCE_FROM_CENTER * scale
            && structure_clearance(&structure, pos) >= ITEM_MIN_DISTANCE_FROM_STRUCTURE * scale
        {
            placed.push(pos);
        }
    }
    placed
}

fn structure_clearance(structure: &[Vec2], pos: Vec2) -> f32 {
    structure
        .iter()
        .map(|cell| cell.distance(pos))
        .fold(f32::INFINITY, f32::min)
}

impl GameEngine {
    pub(super) fn spawn_powerup_if_due(&mut self) {
        if self.now < self.next_powerup_at {
            return;
        }
        self.next_powerup_at = self.now + self.config.powerup_spawn_interval_seconds as f64;
        if self.floor.powerups.len() >= self.config.max_field_powerups {
            return;
        }

        let weights: Vec<f32> = PowerupType::ALL
            .iter()
            .map(|kind| powerup_profile(*kind).1)
            .collect();
        let Some(idx) = self.rng.weighted_index(&weights) else {
            return;
        };
        let kind = PowerupType::ALL[idx];
        let spaced_from: Vec<Vec2> = self.floor.powerups.iter().map(|p| p.pos).collect();
        let blocked: Vec<Vec2> = self
            .floor
            .keys
            .iter()
            .filter(|key| !key.collected)
            .map(|key| key.pos)
            .collect();
        let Some(pos) = place_spread(
            &self.floor.grid,
            1,
            &spaced_from,
            &blocked,
            &mut self.rng,
        )
        .pop() else {
            return;
        };

        self.floor.powerups.push(Powerup::new(pos, kind));
        self.events.push(RuntimeEvent::PowerupSpawned {
            kind,
            x: pos.x,
            y: pos.y,
        });
    }
}
