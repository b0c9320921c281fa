use thiserror::Error;

use crate::constants::{
    maze_growth_factor, powerup_profile, RETREAT_PENALTY, ROCKET_BOOST_BONUS, SLOW_MOVE_PENALTY,
    TILE_SIZE,
};
use crate::grid::{Grid, GridError};
use crate::maze::StructureSide;
use crate::rng::Rng;
use crate::types::{
    Cell, ConfigError, EnemyKind, GameConfig, GameOverReason, InputState, PowerupType,
    RuntimeEvent, Snapshot, StepOutcome, Vec2,
};

mod enemy;
mod items;
mod motion;
mod player;
mod spawn_system;
mod utils;

pub use self::enemy::{Enemy, PlayerTarget, SpecterPhase, TargetContext, TargetPolicy};
pub use self::items::{collect_key, collect_powerup, ActiveEffect, DoorCheck, DoorSet, Key, Powerup};
pub use self::motion::{Animation, Motion, MoveState};
pub use self::player::Player;
pub use self::spawn_system::{build_floor, select_roster};

use self::utils::agents_overlap;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Clone, Debug)]
pub struct GameEngineOptions {
    pub seed: u32,
    pub config: GameConfig,
    pub auto_unlock_doors: bool,
    pub start_floor: u32,
}

impl Default for GameEngineOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            config: GameConfig::default(),
            auto_unlock_doors: true,
            start_floor: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FloorState {
    pub number: u32,
    pub grid: Grid,
    pub doors: DoorSet,
    pub portal: Vec2,
    pub structure_side: StructureSide,
    pub enemies: Vec<Enemy>,
    pub keys: Vec<Key>,
    pub powerups: Vec<Powerup>,
    pub safe_zone_center: Vec2,
    pub growth: f32,
}

impl FloorState {
    pub fn door_approach(&self) -> Option<Vec2> {
        self.doors.approach(&self.grid)
    }
}

#[derive(Clone, Debug)]
pub struct GameEngine {
    pub config: GameConfig,
    pub floor: FloorState,
    pub player: Player,

    rng: Rng,
    events: Vec<RuntimeEvent>,
    effects: Vec<ActiveEffect>,
    now: f64,
    tick_counter: u64,
    ended: bool,
    end_reason: Option<GameOverReason>,
    next_powerup_at: f64,
    powerup_ready_at: f64,
    auto_unlock_doors: bool,
    enemy_speed_multiplier: f32,
}

impl GameEngine {
    pub fn new(options: GameEngineOptions) -> Result<Self, EngineError> {
        options.config.validate()?;
        let mut rng = Rng::new(options.seed);
        let floor_number = options.start_floor.max(1);
        let floor = build_floor(floor_number, &options.config, &mut rng, 0.0)?;
        let player = Player::new(floor.safe_zone_center, floor_number, &options.config);

        Ok(Self {
            next_powerup_at: options.config.powerup_spawn_interval_seconds as f64,
            config: options.config,
            floor,
            player,
            rng,
            events: Vec::new(),
            effects: Vec::new(),
            now: 0.0,
            tick_counter: 0,
            ended: false,
            end_reason: None,
            powerup_ready_at: 0.0,
            auto_unlock_doors: options.auto_unlock_doors,
            enemy_speed_multiplier: 1.0,
        })
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn end_reason(&self) -> Option<GameOverReason> {
        self.end_reason
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn active_effects(&self) -> &[ActiveEffect] {
        &self.effects
    }

    pub fn step(&mut self, dt: f32, input: InputState) -> Result<StepOutcome, EngineError> {
        if let Some(reason) = self.end_reason {
            return Ok(StepOutcome::GameOver { reason });
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Ok(StepOutcome::Continue);
        }
        self.tick_counter += 1;
        self.now += dt as f64;

        self.expire_effects();
        if self.floor.doors.relock_if_due(&mut self.floor.grid, self.now)? {
            self.events.push(RuntimeEvent::DoorRelocked);
        }
        self.spawn_powerup_if_due();
        if input.use_powerup {
            self.activate_powerup();
        }

        let target = PlayerTarget {
            tile: self.player.tile(),
            heading: self.player.facing_direction(),
        };
        self.update_player(dt, &input)?;
        self.update_enemies(dt, target);

        if self.player_collides() {
            return Ok(self.finish(GameOverReason::Caught));
        }
        self.player.timer -= dt;
        if self.player.timer <= 0.0 {
            self.player.timer = 0.0;
            return Ok(self.finish(GameOverReason::Timeout));
        }
        if self.player.portal_dwell() >= self.config.portal_dwell_seconds {
            self.advance_floor()?;
            return Ok(StepOutcome::FloorAdvanced {
                floor: self.player.floor,
            });
        }
        Ok(StepOutcome::Continue)
    }

    pub fn advance_floor(&mut self) -> Result<(), EngineError> {
        let next = self.player.floor + 1;
        let floor = build_floor(next, &self.config, &mut self.rng, self.now)?;
        self.player.floor_up(floor.safe_zone_center);
        self.floor = floor;
        self.next_powerup_at = self.now + self.config.powerup_spawn_interval_seconds as f64;
        self.events.push(RuntimeEvent::FloorAdvanced { floor: next });
        Ok(())
    }

    pub fn try_unlock_door(&mut self) -> Result<DoorCheck, EngineError> {
        let check = self.floor.doors.try_unlock(
            &mut self.floor.grid,
            &mut self.player,
            self.now,
            self.config.door_relock_seconds,
        )?;
        match check {
            DoorCheck::Unlocked => self.events.push(RuntimeEvent::DoorUnlocked),
            DoorCheck::Rejected => self.events.push(RuntimeEvent::DoorRejected),
            _ => {}
        }
        Ok(check)
    }

    pub fn player_collides(&self) -> bool {
        if self.player.is_immune {
            return false;
        }
        self.floor.enemies.iter().any(|enemy| {
            agents_overlap(&self.player.motion, &enemy.motion, self.config.collision_inset)
        })
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        Snapshot {
            tick: self.tick_counter,
            floor: self.player.floor,
            time_left: self.player.timer,
            width: self.floor.grid.width(),
            height: self.floor.grid.height(),
            tile_size: TILE_SIZE,
            tiles: self.floor.grid.to_rows(),
            door_state: self.floor.doors.state,
            player: self.player.view(),
            enemies: self.floor.enemies.iter().map(Enemy::view).collect(),
            keys: self.floor.keys.iter().map(Key::view).collect(),
            powerups: self.floor.powerups.iter().map(Powerup::view).collect(),
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    fn update_player(&mut self, dt: f32, input: &InputState) -> Result<(), EngineError> {
        let pressed = input.pressed_directions();
        self.player.steer(&pressed, &self.floor.grid);
        self.player.update(dt, &self.floor.grid);

        if let Some(real) = collect_key(&mut self.floor.keys, &mut self.player) {
            self.events.push(RuntimeEvent::KeyCollected { real });
        }
        if let Some(kind) = collect_powerup(&mut self.floor.powerups, &mut self.player) {
            self.events.push(RuntimeEvent::PowerupCollected { kind });
        }
        if self.auto_unlock_doors || input.try_unlock_door {
            self.try_unlock_door()?;
        }
        Ok(())
    }

    fn update_enemies(&mut self, dt: f32, player: PlayerTarget) {
        let ctx = TargetContext {
            grid: &self.floor.grid,
            player,
            growth: self.floor.growth,
            config: &self.config,
            now: self.now,
        };
        for enemy in &mut self.floor.enemies {
            enemy.speed_multiplier = self.enemy_speed_multiplier;
            enemy.update(dt, &ctx, &mut self.rng);
        }
    }

    fn activate_powerup(&mut self) {
        if self.now < self.powerup_ready_at {
            return;
        }
        let Some(powerup) = self.player.held_powerup.take() else {
            return;
        };
        self.effects.retain(|effect| effect.kind != powerup.kind);
        self.effects.push(ActiveEffect {
            kind: powerup.kind,
            expires_at: self.now + powerup.duration as f64,
        });
        self.powerup_ready_at = self.now + self.config.powerup_activate_cooldown_seconds as f64;
        self.events.push(RuntimeEvent::PowerupActivated { kind: powerup.kind });
        self.apply_effects();
    }

    fn expire_effects(&mut self) {
        let now = self.now;
        let (expired, active): (Vec<ActiveEffect>, Vec<ActiveEffect>) = self
            .effects
            .drain(..)
            .partition(|effect| effect.expires_at <= now);
        self.effects = active;
        for effect in expired {
            if effect.kind == PowerupType::Retreat {
                let home = self.player.safe_zone_center;
                self.player.place_at(home);
            }
            self.events
                .push(RuntimeEvent::PowerupExpired { kind: effect.kind });
        }
        self.apply_effects();
    }

    fn apply_effects(&mut self) {
        let boost = self.effect_active(PowerupType::RocketBoost);
        let retreat = self.effect_active(PowerupType::Retreat);
        let immune = self.effect_active(PowerupType::Immunity);
        let slowed = self.effect_active(PowerupType::SlowMove);

        let mut multiplier = 1.0;
        if boost {
            multiplier += ROCKET_BOOST_BONUS;
        }
        if retreat {
            multiplier -= RETREAT_PENALTY;
        }
        self.player.speed_multiplier = multiplier;
        self.player.is_immune = immune;
        self.player.can_collect = !immune;
        self.enemy_speed_multiplier = if slowed { 1.0 - SLOW_MOVE_PENALTY } else { 1.0 };
    }

    fn effect_active(&self, kind: PowerupType) -> bool {
        self.effects.iter().any(|effect| effect.kind == kind)
    }

    fn finish(&mut self, reason: GameOverReason) -> StepOutcome {
        self.ended = true;
        self.end_reason = Some(reason);
        self.events.push(RuntimeEvent::GameOver { reason });
        StepOutcome::GameOver { reason }
    }
}
