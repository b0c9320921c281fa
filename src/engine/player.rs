use crate::constants::floor_time_bonus;
use crate::grid::Grid;
use crate::pathfinding::player_walkable;
use crate::types::{Cell, Direction, Facing, GameConfig, PlayerView, Vec2};

use super::items::Powerup;
use super::motion::{Animation, Motion};

const REQUEST_ARRIVALS: u8 = 2;
const MIN_SPEED_MULTIPLIER: f32 = 0.1;

#[derive(Clone, Debug)]
pub struct Player {
    pub motion: Motion,
    pub base_speed: f32,
    pub speed_multiplier: f32,
    pub facing: Facing,
    pub animation: Animation,
    pub has_key: bool,
    pub key_is_real: bool,
    pub held_powerup: Option<Powerup>,
    pub is_immune: bool,
    pub can_collect: bool,
    pub safe_zone_center: Vec2,
    pub floor: u32,
    pub timer: f32,
    requested: Option<Direction>,
    request_arrivals: u8,
    portal_dwell: f32,
}

impl Player {
    pub fn new(spawn: Vec2, floor: u32, config: &GameConfig) -> Self {
        Self {
            motion: Motion::at(spawn),
            base_speed: config.player_speed,
            speed_multiplier: 1.0,
            facing: Facing::Down,
            animation: Animation::default(),
            has_key: false,
            key_is_real: false,
            held_powerup: None,
            is_immune: false,
            can_collect: true,
            safe_zone_center: spawn,
            floor,
            timer: config.initial_time_seconds,
            requested: None,
            request_arrivals: 0,
            portal_dwell: 0.0,
        }
    }

    pub fn tile(&self) -> Vec2 {
        self.motion.tile
    }

    pub fn heading(&self) -> Direction {
        self.motion.heading()
    }

    pub fn facing_direction(&self) -> Direction {
        match self.facing {
            Facing::Up => Direction::Up,
            Facing::Down => Direction::Down,
            Facing::Left => Direction::Left,
            Facing::Right => Direction::Right,
            Facing::Special => Direction::None,
        }
    }

    pub fn requested(&self) -> Option<Direction> {
        self.requested
    }

    pub fn can_move_in_direction(&self, dir: Direction, grid: &Grid) -> bool {
        if dir == Direction::None {
            return false;
        }
        grid.at(self.motion.tile.step(dir))
            .map(player_walkable)
            .unwrap_or(false)
    }

    pub fn request_move(&mut self, dir: Direction, grid: &Grid) -> bool {
        if dir == Direction::None {
            return false;
        }
        if !self.motion.is_moving() && self.can_move_in_direction(dir, grid) {
            self.begin_move(dir);
            return true;
        }
        self.buffer(dir);
        false
    }

    pub fn steer(&mut self, pressed: &[Direction], grid: &Grid) {
        if pressed.is_empty() {
            // Releasing input keeps a pending turn but never an extra straight tile.
            if self.requested == Some(self.heading()) {
                self.requested = None;
            }
            return;
        }

        if self.motion.is_moving() {
            let heading = self.heading();
            let dir = pressed
                .iter()
                .copied()
                .find(|dir| *dir != heading)
                .unwrap_or(heading);
            self.buffer(dir);
            return;
        }

        if let Some(dir) = pressed
            .iter()
            .copied()
            .find(|dir| self.can_move_in_direction(*dir, grid))
        {
            self.begin_move(dir);
            return;
        }
        self.buffer(pressed[0]);
    }

    pub fn update(&mut self, dt: f32, grid: &Grid) {
        if let Some(facing) = self.motion.travel_facing() {
            self.facing = facing;
        }
        let step = dt * self.base_speed * self.speed_multiplier.max(MIN_SPEED_MULTIPLIER);
        if self.motion.advance(step) {
            self.retry_request(grid);
        }
        self.animation.advance(dt);

        if grid.at(self.motion.tile) == Some(Cell::Portal) {
            self.portal_dwell += dt;
        } else {
            self.portal_dwell = 0.0;
        }
    }

    pub fn portal_dwell(&self) -> f32 {
        self.portal_dwell
    }

    pub fn place_at(&mut self, tile: Vec2) {
        self.motion.snap(tile);
        self.requested = None;
        self.request_arrivals = 0;
        self.portal_dwell = 0.0;
    }

    pub fn take_key(&mut self) -> Option<bool> {
        if !self.has_key {
            return None;
        }
        self.has_key = false;
        Some(std::mem::take(&mut self.key_is_real))
    }

    /// Carries the player into the next floor: bonus time, no key.
    pub fn floor_up(&mut self, spawn: Vec2) {
        self.floor += 1;
        self.timer += floor_time_bonus(self.floor);
        self.has_key = false;
        self.key_is_real = false;
        self.safe_zone_center = spawn;
        self.place_at(spawn);
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            x: self.motion.tile.x,
            y: self.motion.tile.y,
            float_x: self.motion.float_x,
            float_y: self.motion.float_y,
            facing: self.facing,
            frame: self.animation.frame,
            has_key: self.has_key,
            held_powerup: self.held_powerup.as_ref().map(|powerup| powerup.kind),
            is_immune: self.is_immune,
            speed_multiplier: self.speed_multiplier,
        }
    }

    fn begin_move(&mut self, dir: Direction) {
        self.motion.begin(self.motion.tile.step(dir));
        self.facing = Facing::from(dir);
        self.requested = None;
        self.request_arrivals = 0;
    }

    fn buffer(&mut self, dir: Direction) {
        self.requested = Some(dir);
        self.request_arrivals = REQUEST_ARRIVALS;
    }

    fn retry_request(&mut self, grid: &Grid) {
        let Some(dir) = self.requested else {
            return;
        };
        if self.can_move_in_direction(dir, grid) {
            self.begin_move(dir);
            return;
        }
        self.request_arrivals = self.request_arrivals.saturating_sub(1);
        if self.request_arrivals == 0 {
            self.requested = None;
        }
    }
}
