use crate::constants::enemy_base_speed;
use crate::grid::Grid;
use crate::pathfinding::{find_path, normal_walkable, phasing_walkable};
use crate::rng::Rng;
use crate::types::{Cell, Direction, EnemyKind, EnemyView, Facing, GameConfig, Vec2};

use super::motion::{Animation, Motion};

const CHARGE_SPEED_FACTOR: f32 = 2.0;
const STALK_SPEED_FACTOR: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerTarget {
    pub tile: Vec2,
    pub heading: Direction,
}

#[derive(Clone, Copy, Debug)]
pub struct TargetContext<'a> {
    pub grid: &'a Grid,
    pub player: PlayerTarget,
    pub growth: f32,
    pub config: &'a GameConfig,
    pub now: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecterPhase {
    Stalk,
    Charge,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TargetPolicy {
    Pursuer,
    Feigner {
        roam: Option<Vec2>,
    },
    Glimmer {
        roam: Option<Vec2>,
    },
    Ambusher,
    Specter {
        phase: SpecterPhase,
        phase_ends_at: f64,
        remembered: Vec2,
    },
    Slender {
        phasing: bool,
    },
}

impl TargetPolicy {
    pub fn for_kind(kind: EnemyKind, player_tile: Vec2, now: f64, config: &GameConfig) -> Self {
        match kind {
            EnemyKind::Pursuer => TargetPolicy::Pursuer,
            EnemyKind::Feigner => TargetPolicy::Feigner { roam: None },
            EnemyKind::Glimmer => TargetPolicy::Glimmer { roam: None },
            EnemyKind::Ambusher => TargetPolicy::Ambusher,
            EnemyKind::Specter => TargetPolicy::Specter {
                phase: SpecterPhase::Stalk,
                phase_ends_at: now + config.specter_cooldown_seconds as f64,
                remembered: player_tile,
            },
            EnemyKind::Slender => TargetPolicy::Slender { phasing: false },
        }
    }
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: String,
    pub kind: EnemyKind,
    pub motion: Motion,
    pub facing: Facing,
    pub animation: Animation,
    pub base_speed: f32,
    pub speed_multiplier: f32,
    pub policy: TargetPolicy,
}

impl Enemy {
    pub fn new(
        id: String,
        kind: EnemyKind,
        spawn: Vec2,
        player_tile: Vec2,
        now: f64,
        config: &GameConfig,
    ) -> Self {
        Self {
            id,
            kind,
            motion: Motion::at(spawn),
            facing: Facing::Down,
            animation: Animation::default(),
            base_speed: enemy_base_speed(kind),
            speed_multiplier: 1.0,
            policy: TargetPolicy::for_kind(kind, player_tile, now, config),
        }
    }

    pub fn tile(&self) -> Vec2 {
        self.motion.tile
    }

    pub fn is_phasing(&self) -> bool {
        matches!(self.policy, TargetPolicy::Slender { phasing: true })
    }

    pub fn is_charging(&self) -> bool {
        matches!(
            self.policy,
            TargetPolicy::Specter {
                phase: SpecterPhase::Charge,
                ..
            }
        )
    }

    pub fn current_speed(&self, config: &GameConfig) -> f32 {
        let phase_factor = match &self.policy {
            TargetPolicy::Specter {
                phase: SpecterPhase::Charge,
                ..
            } => CHARGE_SPEED_FACTOR,
            TargetPolicy::Specter { .. } => STALK_SPEED_FACTOR,
            _ => 1.0,
        };
        self.base_speed * self.speed_multiplier.max(0.0) * phase_factor * config.enemy_speed_scale
    }

    pub fn walkable(&self) -> fn(Cell) -> bool {
        if self.is_phasing() {
            phasing_walkable
        } else {
            normal_walkable
        }
    }

    pub fn select_target(&mut self, ctx: &TargetContext, rng: &mut Rng) -> Vec2 {
        let here = self.motion.tile;
        let player = ctx.player.tile;
        let distance = here.distance(player);
        match &mut self.policy {
            TargetPolicy::Pursuer => player,
            TargetPolicy::Feigner { roam } => {
                let threshold = ctx.config.feigner_threshold * ctx.growth;
                if distance > threshold {
                    *roam = None;
                    return player;
                }
                if roam.is_none() || *roam == Some(here) {
                    *roam = sample_roam_cell(ctx.grid, player, rng, |d| d > 0.0 && d < threshold);
                }
                roam.unwrap_or(player)
            }
            TargetPolicy::Glimmer { roam } => {
                let threshold = ctx.config.glimmer_threshold * ctx.growth;
                if distance < threshold {
                    *roam = None;
                    return player;
                }
                if roam.is_none() || *roam == Some(here) {
                    *roam = sample_roam_cell(ctx.grid, player, rng, |d| d > threshold);
                }
                roam.unwrap_or(player)
            }
            TargetPolicy::Ambusher => ambush_point(ctx),
            TargetPolicy::Specter {
                phase, remembered, ..
            } => match phase {
                SpecterPhase::Charge => *remembered,
                SpecterPhase::Stalk => player,
            },
            TargetPolicy::Slender { phasing } => {
                let threshold = ctx.config.slender_phase_threshold * ctx.growth;
                let inside_wall = !ctx.grid.at(here).map(normal_walkable).unwrap_or(false);
                *phasing = distance > threshold || inside_wall;
                player
            }
        }
    }

    pub fn update(&mut self, dt: f32, ctx: &TargetContext, rng: &mut Rng) {
        self.cycle_phase(ctx);

        if !self.motion.is_moving() {
            let goal = self.select_target(ctx, rng);
            let mut path = find_path(self.motion.tile, goal, ctx.grid, self.walkable());
            if path.is_empty() && self.kind == EnemyKind::Ambusher && goal != ctx.player.tile {
                path = find_path(self.motion.tile, ctx.player.tile, ctx.grid, self.walkable());
            }
            match path.first() {
                Some(next) => self.motion.begin(*next),
                None => self.forget_roam(),
            }
        }

        if let Some(facing) = self.motion.travel_facing() {
            self.facing = facing;
        }
        if self.motion.advance(dt * self.current_speed(ctx.config)) {
            self.on_arrival(ctx);
        }
        if self.is_charging() || self.is_phasing() {
            self.facing = Facing::Special;
        }
        self.animation.advance(dt);
    }

    pub fn view(&self) -> EnemyView {
        EnemyView {
            id: self.id.clone(),
            kind: self.kind,
            x: self.motion.tile.x,
            y: self.motion.tile.y,
            float_x: self.motion.float_x,
            float_y: self.motion.float_y,
            facing: self.facing,
            frame: self.animation.frame,
            phasing: self.is_phasing(),
        }
    }

    fn forget_roam(&mut self) {
        if let TargetPolicy::Feigner { roam } | TargetPolicy::Glimmer { roam } = &mut self.policy {
            *roam = None;
        }
    }

    fn cycle_phase(&mut self, ctx: &TargetContext) {
        let TargetPolicy::Specter {
            phase,
            phase_ends_at,
            remembered,
        } = &mut self.policy
        else {
            return;
        };
        if ctx.now < *phase_ends_at {
            return;
        }
        match phase {
            SpecterPhase::Stalk => {
                *phase = SpecterPhase::Charge;
                *phase_ends_at = ctx.now + ctx.config.specter_charge_seconds as f64;
            }
            SpecterPhase::Charge => {
                *phase = SpecterPhase::Stalk;
                *phase_ends_at = ctx.now + ctx.config.specter_cooldown_seconds as f64;
                *remembered = ctx.player.tile;
            }
        }
    }

    fn on_arrival(&mut self, ctx: &TargetContext) {
        let here = self.motion.tile;
        if let TargetPolicy::Specter {
            phase,
            phase_ends_at,
            remembered,
        } = &mut self.policy
        {
            if *phase == SpecterPhase::Charge && *remembered == here {
                *phase = SpecterPhase::Stalk;
                *phase_ends_at = ctx.now + ctx.config.specter_cooldown_seconds as f64;
                *remembered = ctx.player.tile;
            }
        }
    }
}

fn sample_roam_cell(
    grid: &Grid,
    player: Vec2,
    rng: &mut Rng,
    accept: impl Fn(f32) -> bool,
) -> Option<Vec2> {
    let candidates: Vec<Vec2> = grid
        .positions_of(normal_walkable)
        .into_iter()
        .filter(|pos| accept(pos.distance(player)))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.pick_index(candidates.len())])
}

/// Projects the player's heading forward, stopping at the last open cell.
fn ambush_point(ctx: &TargetContext) -> Vec2 {
    let mut point = ctx.player.tile;
    if ctx.player.heading == Direction::None {
        return point;
    }
    for _ in 0..ctx.config.ambush_lookahead {
        let next = point.step(ctx.player.heading);
        if !ctx.grid.at(next).map(normal_walkable).unwrap_or(false) {
            break;
        }
        point = next;
    }
    point
}
