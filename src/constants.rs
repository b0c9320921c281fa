use crate::types::{EnemyKind, PowerupType};

pub const BASE_MAZE_SIZE: i32 = 29;
pub const MAX_MAZE_SIZE: i32 = 61;
pub const MAZE_GROWTH_FLOOR_STEP: u32 = 2;
pub const MIN_MAZE_SIZE: i32 = 19;
pub const LOOP_PUNCH_CHANCE: f32 = 0.05;

pub const STRUCTURE_FOOTPRINT: i32 = 7;

pub const PLAYER_BASE_SPEED: f32 = 7.2;
pub const TILE_SIZE: f32 = 16.0;
pub const COLLISION_INSET: f32 = 0.25;
pub const ANIMATION_FRAME_SECONDS: f32 = 0.1;
pub const ANIMATION_FRAME_COUNT: usize = 4;

pub const INITIAL_TIME_SECONDS: f32 = 90.0;
pub const PORTAL_DWELL_SECONDS: f32 = 1.0;
pub const DOOR_RELOCK_SECONDS: f32 = 2.5;

pub const KEYS_PER_FLOOR: usize = 4;
pub const ITEM_MIN_DISTANCE_FROM_CENTER: f32 = 12.0;
pub const ITEM_MIN_DISTANCE_FROM_EACH_OTHER: f32 = 8.0;
pub const ITEM_MIN_DISTANCE_FROM_STRUCTURE: f32 = 12.0;
pub const PLACEMENT_ATTEMPTS_PER_RELAX: usize = 200;
pub const PLACEMENT_RELAX_FACTOR: f32 = 0.85;

pub const POWERUP_SPAWN_INTERVAL_SECONDS: f32 = 8.0;
pub const POWERUP_ACTIVATE_COOLDOWN_SECONDS: f32 = 1.0;
pub const MAX_FIELD_POWERUPS: usize = 3;
pub const ROCKET_BOOST_BONUS: f32 = 0.5;
pub const RETREAT_PENALTY: f32 = 0.75;
pub const SLOW_MOVE_PENALTY: f32 = 0.25;

pub const INITIAL_MAX_ENEMIES: usize = 2;
pub const ENEMY_GROWTH_FLOOR_STEP: u32 = 2;
pub const ENEMY_ROSTER_CAP: usize = 6;

pub const FEIGNER_THRESHOLD: f32 = 8.0;
pub const GLIMMER_THRESHOLD: f32 = 6.0;
pub const SLENDER_PHASE_THRESHOLD: f32 = 10.0;
pub const AMBUSH_LOOKAHEAD: i32 = 4;
pub const SPECTER_COOLDOWN_SECONDS: f32 = 4.0;
pub const SPECTER_CHARGE_SECONDS: f32 = 2.0;

pub fn enemy_base_speed(kind: EnemyKind) -> f32 {
    match kind {
        EnemyKind::Pursuer => 5.0,
        EnemyKind::Feigner => 5.4,
        EnemyKind::Glimmer => 5.0,
        EnemyKind::Ambusher => 5.2,
        EnemyKind::Specter => 4.4,
        EnemyKind::Slender => 4.2,
    }
}

pub fn enemy_roster_entry(kind: EnemyKind) -> (u32, f32) {
    match kind {
        EnemyKind::Pursuer => (1, -1.0),
        EnemyKind::Feigner => (1, 1.0),
        EnemyKind::Glimmer => (2, 0.9),
        EnemyKind::Ambusher => (3, 0.8),
        EnemyKind::Specter => (4, 0.6),
        EnemyKind::Slender => (5, 0.5),
    }
}

pub fn powerup_profile(kind: PowerupType) -> (f32, f32) {
    match kind {
        PowerupType::RocketBoost => (4.0, 1.0),
        PowerupType::Retreat => (2.5, 0.85),
        PowerupType::Immunity => (5.0, 0.75),
        PowerupType::SlowMove => (5.0, 0.95),
    }
}

pub fn maze_size_for_floor(floor: u32) -> i32 {
    let steps = (floor.max(1) - 1) / MAZE_GROWTH_FLOOR_STEP;
    (BASE_MAZE_SIZE + steps as i32 * 2).min(MAX_MAZE_SIZE)
}

pub fn maze_growth_factor(rows: i32) -> f32 {
    rows as f32 / BASE_MAZE_SIZE as f32
}

pub fn max_enemies_for_floor(floor: u32) -> usize {
    let extra = ((floor.max(1) - 1) / ENEMY_GROWTH_FLOOR_STEP) as usize;
    (INITIAL_MAX_ENEMIES + extra).min(ENEMY_ROSTER_CAP)
}

pub fn floor_time_bonus(floor: u32) -> f32 {
    (30.0 + 5.0 * (floor.max(1) - 1) as f32).min(60.0)
}
