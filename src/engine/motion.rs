use crate::constants::{ANIMATION_FRAME_COUNT, ANIMATION_FRAME_SECONDS};
use crate::types::{Direction, Facing, Vec2};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MoveState {
    Idle,
    Moving {
        from: (f32, f32),
        to: Vec2,
        progress: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Motion {
    pub tile: Vec2,
    pub float_x: f32,
    pub float_y: f32,
    pub state: MoveState,
}

impl Motion {
    pub fn at(tile: Vec2) -> Self {
        Self {
            tile,
            float_x: tile.x as f32,
            float_y: tile.y as f32,
            state: MoveState::Idle,
        }
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.state, MoveState::Moving { .. })
    }

    pub fn target(&self) -> Option<Vec2> {
        match self.state {
            MoveState::Moving { to, .. } => Some(to),
            MoveState::Idle => None,
        }
    }

    pub fn destination(&self) -> Vec2 {
        self.target().unwrap_or(self.tile)
    }

    pub fn heading(&self) -> Direction {
        match self.target() {
            Some(to) => Direction::from_delta(to.x - self.tile.x, to.y - self.tile.y),
            None => Direction::None,
        }
    }

    pub fn begin(&mut self, to: Vec2) {
        self.state = MoveState::Moving {
            from: (self.float_x, self.float_y),
            to,
            progress: 0.0,
        };
    }

    /// Facing from the sign of `target - float position`, x axis first.
    pub fn travel_facing(&self) -> Option<Facing> {
        let to = self.target()?;
        let dx = to.x as f32 - self.float_x;
        let dy = to.y as f32 - self.float_y;
        if dx > 0.0 {
            Some(Facing::Right)
        } else if dx < 0.0 {
            Some(Facing::Left)
        } else if dy > 0.0 {
            Some(Facing::Down)
        } else if dy < 0.0 {
            Some(Facing::Up)
        } else {
            None
        }
    }

    pub fn advance(&mut self, step: f32) -> bool {
        let MoveState::Moving { from, to, progress } = self.state else {
            return false;
        };
        let t = (progress + step.max(0.0)).min(1.0);
        if t >= 1.0 {
            self.snap(to);
            return true;
        }
        self.float_x = (1.0 - t) * from.0 + t * to.x as f32;
        self.float_y = (1.0 - t) * from.1 + t * to.y as f32;
        self.state = MoveState::Moving {
            from,
            to,
            progress: t,
        };
        false
    }

    pub fn snap(&mut self, tile: Vec2) {
        *self = Self::at(tile);
    }

    pub fn within_one_tile(&self) -> bool {
        (self.float_x - self.tile.x as f32).abs() < 1.0
            && (self.float_y - self.tile.y as f32).abs() < 1.0
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Animation {
    pub frame: usize,
    timer: f32,
}

impl Animation {
    pub fn advance(&mut self, dt: f32) {
        self.timer += dt;
        if self.timer >= ANIMATION_FRAME_SECONDS {
            self.timer = 0.0;
            self.frame = (self.frame + 1) % ANIMATION_FRAME_COUNT;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_interpolates_and_snaps() {
        let mut motion = Motion::at(Vec2::new(2, 2));
        motion.begin(Vec2::new(3, 2));
        assert!(!motion.advance(0.25));
        assert!((motion.float_x - 2.25).abs() < 1e-5);
        assert_eq!(motion.tile, Vec2::new(2, 2));
        assert_eq!(motion.travel_facing(), Some(Facing::Right));
        assert!(motion.within_one_tile());

        assert!(motion.advance(0.9));
        assert_eq!(motion.tile, Vec2::new(3, 2));
        assert_eq!(motion.float_x, 3.0);
        assert_eq!(motion.float_y, 2.0);
        assert!(!motion.is_moving());
    }

    #[test]
    fn facing_prefers_x_axis_then_y() {
        let mut motion = Motion::at(Vec2::new(2, 2));
        motion.begin(Vec2::new(2, 1));
        assert_eq!(motion.travel_facing(), Some(Facing::Up));
        assert_eq!(motion.heading(), Direction::Up);
    }

    #[test]
    fn idle_motion_ignores_advance() {
        let mut motion = Motion::at(Vec2::new(1, 1));
        assert!(!motion.advance(1.0));
        assert_eq!(motion.destination(), Vec2::new(1, 1));
    }

    #[test]
    fn animation_cycles_frames_on_fixed_period() {
        let mut animation = Animation::default();
        for _ in 0..ANIMATION_FRAME_COUNT {
            animation.advance(ANIMATION_FRAME_SECONDS);
        }
        assert_eq!(animation.frame, 0);
        animation.advance(ANIMATION_FRAME_SECONDS / 2.0);
        assert_eq!(animation.frame, 0);
        animation.advance(ANIMATION_FRAME_SECONDS / 2.0);
        assert_eq!(animation.frame, 1);
    }
}
