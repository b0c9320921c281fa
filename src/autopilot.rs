use crate::engine::GameEngine;
use crate::pathfinding::{find_path, player_walkable};
use crate::types::{Direction, DoorState, InputState, Vec2};

const DEFAULT_DANGER_RADIUS: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutopilotGoal {
    Key(Vec2),
    Door(Vec2),
    Portal(Vec2),
    Idle,
}

impl AutopilotGoal {
    pub fn tile(self) -> Option<Vec2> {
        match self {
            AutopilotGoal::Key(pos) | AutopilotGoal::Door(pos) | AutopilotGoal::Portal(pos) => {
                Some(pos)
            }
            AutopilotGoal::Idle => None,
        }
    }
}

/// Walks to keys, then the doorway, then the portal.
#[derive(Clone, Debug)]
pub struct Autopilot {
    pub danger_radius: f32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            danger_radius: DEFAULT_DANGER_RADIUS,
        }
    }
}

impl Autopilot {
    pub fn goal(&self, engine: &GameEngine) -> AutopilotGoal {
        let floor = &engine.floor;
        if floor.doors.state == DoorState::Unlocked {
            return AutopilotGoal::Portal(floor.portal);
        }
        if engine.player.has_key {
            return floor
                .door_approach()
                .map(AutopilotGoal::Door)
                .unwrap_or(AutopilotGoal::Idle);
        }
        let here = engine.player.tile();
        floor
            .keys
            .iter()
            .filter(|key| !key.collected)
            .min_by(|a, b| here.distance(a.pos).total_cmp(&here.distance(b.pos)))
            .map(|key| AutopilotGoal::Key(key.pos))
            .unwrap_or(AutopilotGoal::Idle)
    }

    pub fn next_input(&self, engine: &GameEngine) -> InputState {
        let player = &engine.player;
        let mut input = match self.goal(engine).tile() {
            Some(goal) => {
                let from = player.motion.destination();
                let path = find_path(from, goal, &engine.floor.grid, player_walkable);
                match path.first() {
                    Some(next) => InputState::toward(Direction::from_delta(
                        next.x - from.x,
                        next.y - from.y,
                    )),
                    None => InputState::default(),
                }
            }
            None => InputState::default(),
        };

        input.try_unlock_door = player.has_key;
        input.use_powerup = player.held_powerup.is_some() && self.enemy_nearby(engine);
        input
    }

    fn enemy_nearby(&self, engine: &GameEngine) -> bool {
        let motion = &engine.player.motion;
        engine.floor.enemies.iter().any(|enemy| {
            let dx = enemy.motion.float_x - motion.float_x;
            let dy = enemy.motion.float_y - motion.float_y;
            (dx * dx + dy * dy).sqrt() <= self.danger_radius
        })
    }
}
