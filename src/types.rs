use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    AMBUSH_LOOKAHEAD, COLLISION_INSET, DOOR_RELOCK_SECONDS, FEIGNER_THRESHOLD, GLIMMER_THRESHOLD,
    INITIAL_TIME_SECONDS, KEYS_PER_FLOOR, MAX_FIELD_POWERUPS, PLAYER_BASE_SPEED,
    PORTAL_DWELL_SECONDS, POWERUP_ACTIVATE_COOLDOWN_SECONDS, POWERUP_SPAWN_INTERVAL_SECONDS,
    SLENDER_PHASE_THRESHOLD, SPECTER_CHARGE_SECONDS, SPECTER_COOLDOWN_SECONDS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn manhattan(self, other: Vec2) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    pub const CARDINAL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::None => (0, 0),
        }
    }

    pub fn from_delta(dx: i32, dy: i32) -> Self {
        match (dx.signum(), dy.signum()) {
            (1, _) => Direction::Right,
            (-1, _) => Direction::Left,
            (0, 1) => Direction::Down,
            (0, -1) => Direction::Up,
            _ => Direction::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Up,
    Down,
    Left,
    Right,
    Special,
}

impl From<Direction> for Facing {
    fn from(dir: Direction) -> Self {
        match dir {
            Direction::Up => Facing::Up,
            Direction::Left => Facing::Left,
            Direction::Right => Facing::Right,
            Direction::Down | Direction::None => Facing::Down,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Wall,
    Border,
    Path,
    SafeZone,
    StructureFloor,
    Portal,
    DoorLocked,
    DoorUnlocked,
    DoorIncorrect,
}

impl Cell {
    pub fn glyph(self) -> char {
        match self {
            Cell::Wall => '#',
            Cell::Border => 'B',
            Cell::Path => '.',
            Cell::SafeZone => 'z',
            Cell::StructureFloor => 's',
            Cell::Portal => 'P',
            Cell::DoorLocked => 'L',
            Cell::DoorUnlocked => 'U',
            Cell::DoorIncorrect => 'I',
        }
    }

    pub fn is_wall(self) -> bool {
        matches!(self, Cell::Wall | Cell::Border)
    }

    pub fn is_door(self) -> bool {
        matches!(
            self,
            Cell::DoorLocked | Cell::DoorUnlocked | Cell::DoorIncorrect
        )
    }

    pub fn is_structure(self) -> bool {
        self.is_door() || matches!(self, Cell::StructureFloor | Cell::Portal)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    Locked,
    Unlocked,
    Incorrect,
}

impl DoorState {
    pub fn cell(self) -> Cell {
        match self {
            DoorState::Locked => Cell::DoorLocked,
            DoorState::Unlocked => Cell::DoorUnlocked,
            DoorState::Incorrect => Cell::DoorIncorrect,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Pursuer,
    Feigner,
    Glimmer,
    Ambusher,
    Specter,
    Slender,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 6] = [
        EnemyKind::Pursuer,
        EnemyKind::Feigner,
        EnemyKind::Glimmer,
        EnemyKind::Ambusher,
        EnemyKind::Specter,
        EnemyKind::Slender,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupType {
    RocketBoost,
    Retreat,
    Immunity,
    SlowMove,
}

impl PowerupType {
    pub const ALL: [PowerupType; 4] = [
        PowerupType::RocketBoost,
        PowerupType::Retreat,
        PowerupType::Immunity,
        PowerupType::SlowMove,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    Caught,
    Timeout,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    KeyCollected {
        real: bool,
    },
    DoorUnlocked,
    DoorRejected,
    DoorRelocked,
    PowerupSpawned {
        kind: PowerupType,
        x: i32,
        y: i32,
    },
    PowerupCollected {
        kind: PowerupType,
    },
    PowerupActivated {
        kind: PowerupType,
    },
    PowerupExpired {
        kind: PowerupType,
    },
    FloorAdvanced {
        floor: u32,
    },
    GameOver {
        reason: GameOverReason,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub use_powerup: bool,
    pub try_unlock_door: bool,
}

impl InputState {
    pub fn pressed_directions(&self) -> Vec<Direction> {
        let mut out = Vec::new();
        if self.up {
            out.push(Direction::Up);
        }
        if self.down {
            out.push(Direction::Down);
        }
        if self.left {
            out.push(Direction::Left);
        }
        if self.right {
            out.push(Direction::Right);
        }
        out
    }

    pub fn toward(dir: Direction) -> Self {
        Self {
            up: dir == Direction::Up,
            down: dir == Direction::Down,
            left: dir == Direction::Left,
            right: dir == Direction::Right,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepOutcome {
    Continue,
    FloorAdvanced { floor: u32 },
    GameOver { reason: GameOverReason },
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "floatX")]
    pub float_x: f32,
    #[serde(rename = "floatY")]
    pub float_y: f32,
    pub facing: Facing,
    pub frame: usize,
    #[serde(rename = "hasKey")]
    pub has_key: bool,
    #[serde(rename = "heldPowerup")]
    pub held_powerup: Option<PowerupType>,
    #[serde(rename = "isImmune")]
    pub is_immune: bool,
    #[serde(rename = "speedMultiplier")]
    pub speed_multiplier: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnemyView {
    pub id: String,
    pub kind: EnemyKind,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "floatX")]
    pub float_x: f32,
    #[serde(rename = "floatY")]
    pub float_y: f32,
    pub facing: Facing,
    pub frame: usize,
    pub phasing: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct KeyView {
    pub x: i32,
    pub y: i32,
    pub collected: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct PowerupView {
    pub kind: PowerupType,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub floor: u32,
    #[serde(rename = "timeLeft")]
    pub time_left: f32,
    pub width: i32,
    pub height: i32,
    #[serde(rename = "tileSize")]
    pub tile_size: f32,
    pub tiles: Vec<String>,
    #[serde(rename = "doorState")]
    pub door_state: DoorState,
    pub player: PlayerView,
    pub enemies: Vec<EnemyView>,
    pub keys: Vec<KeyView>,
    pub powerups: Vec<PowerupView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be a positive finite number")]
    NotPositive { field: &'static str },
    #[error("{field} must be at least {min}")]
    TooSmall { field: &'static str, min: i64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub player_speed: f32,
    pub enemy_speed_scale: f32,
    pub initial_time_seconds: f32,
    pub door_relock_seconds: f32,
    pub portal_dwell_seconds: f32,
    pub powerup_spawn_interval_seconds: f32,
    pub powerup_activate_cooldown_seconds: f32,
    pub max_field_powerups: usize,
    pub keys_per_floor: usize,
    pub feigner_threshold: f32,
    pub glimmer_threshold: f32,
    pub slender_phase_threshold: f32,
    pub ambush_lookahead: i32,
    pub specter_cooldown_seconds: f32,
    pub specter_charge_seconds: f32,
    pub collision_inset: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_speed: PLAYER_BASE_SPEED,
            enemy_speed_scale: 1.0,
            initial_time_seconds: INITIAL_TIME_SECONDS,
            door_relock_seconds: DOOR_RELOCK_SECONDS,
            portal_dwell_seconds: PORTAL_DWELL_SECONDS,
            powerup_spawn_interval_seconds: POWERUP_SPAWN_INTERVAL_SECONDS,
            powerup_activate_cooldown_seconds: POWERUP_ACTIVATE_COOLDOWN_SECONDS,
            max_field_powerups: MAX_FIELD_POWERUPS,
            keys_per_floor: KEYS_PER_FLOOR,
            feigner_threshold: FEIGNER_THRESHOLD,
            glimmer_threshold: GLIMMER_THRESHOLD,
            slender_phase_threshold: SLENDER_PHASE_THRESHOLD,
            ambush_lookahead: AMBUSH_LOOKAHEAD,
            specter_cooldown_seconds: SPECTER_COOLDOWN_SECONDS,
            specter_charge_seconds: SPECTER_CHARGE_SECONDS,
            collision_inset: COLLISION_INSET,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("playerSpeed", self.player_speed),
            ("enemySpeedScale", self.enemy_speed_scale),
            ("initialTimeSeconds", self.initial_time_seconds),
            ("doorRelockSeconds", self.door_relock_seconds),
            ("portalDwellSeconds", self.portal_dwell_seconds),
            ("powerupSpawnIntervalSeconds", self.powerup_spawn_interval_seconds),
            ("feignerThreshold", self.feigner_threshold),
            ("glimmerThreshold", self.glimmer_threshold),
            ("slenderPhaseThreshold", self.slender_phase_threshold),
            ("specterCooldownSeconds", self.specter_cooldown_seconds),
            ("specterChargeSeconds", self.specter_charge_seconds),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field });
            }
        }
        if !(0.0..0.5).contains(&self.collision_inset) {
            return Err(ConfigError::NotPositive {
                field: "collisionInset",
            });
        }
        if self.powerup_activate_cooldown_seconds < 0.0 {
            return Err(ConfigError::NotPositive {
                field: "powerupActivateCooldownSeconds",
            });
        }
        if self.keys_per_floor < 1 {
            return Err(ConfigError::TooSmall {
                field: "keysPerFloor",
                min: 1,
            });
        }
        if self.ambush_lookahead < 1 {
            return Err(ConfigError::TooSmall {
                field: "ambushLookahead",
                min: 1,
            });
        }
        Ok(())
    }
}
