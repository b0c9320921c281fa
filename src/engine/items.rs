use crate::constants::powerup_profile;
use crate::grid::{Grid, GridError};
use crate::maze::toggle_doors;
use crate::types::{Cell, Direction, DoorState, KeyView, PowerupType, PowerupView, Vec2};

use super::player::Player;

#[derive(Clone, Debug, PartialEq)]
pub struct Key {
    pub pos: Vec2,
    pub is_real: bool,
    pub collected: bool,
}

impl Key {
    pub fn view(&self) -> KeyView {
        KeyView {
            x: self.pos.x,
            y: self.pos.y,
            collected: self.collected,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Powerup {
    pub pos: Vec2,
    pub kind: PowerupType,
    pub duration: f32,
    pub collected: bool,
}

impl Powerup {
    pub fn new(pos: Vec2, kind: PowerupType) -> Self {
        Self {
            pos,
            kind,
            duration: powerup_profile(kind).0,
            collected: false,
        }
    }

    pub fn view(&self) -> PowerupView {
        PowerupView {
            kind: self.kind,
            x: self.pos.x,
            y: self.pos.y,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveEffect {
    pub kind: PowerupType,
    pub expires_at: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DoorSet {
    pub positions: Vec<Vec2>,
    pub state: DoorState,
    pub relock_at: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorCheck {
    NoKey,
    NotAdjacent,
    AlreadyOpen,
    Unlocked,
    Rejected,
}

impl DoorSet {
    pub fn locked(positions: Vec<Vec2>) -> Self {
        Self {
            positions,
            state: DoorState::Locked,
            relock_at: None,
        }
    }

    pub fn set(&mut self, grid: &mut Grid, state: DoorState) -> Result<(), GridError> {
        toggle_doors(grid, &self.positions, state)?;
        self.state = state;
        Ok(())
    }

    pub fn is_adjacent(&self, pos: Vec2) -> bool {
        self.positions.iter().any(|door| door.manhattan(pos) == 1)
    }

    pub fn approach(&self, grid: &Grid) -> Option<Vec2> {
        self.positions.iter().find_map(|door| {
            Direction::CARDINAL
                .iter()
                .map(|dir| door.step(*dir))
                .find(|pos| grid.at(*pos) == Some(Cell::Path))
        })
    }

    /// Reverts an `Incorrect` penalty once its deadline passes.
    pub fn relock_if_due(&mut self, grid: &mut Grid, now: f64) -> Result<bool, GridError> {
        match self.relock_at {
            Some(at) if now >= at && self.state == DoorState::Incorrect => {
                self.set(grid, DoorState::Locked)?;
                self.relock_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn try_unlock(
        &mut self,
        grid: &mut Grid,
        player: &mut Player,
        now: f64,
        relock_seconds: f32,
    ) -> Result<DoorCheck, GridError> {
        if !player.has_key {
            return Ok(DoorCheck::NoKey);
        }
        if !self.is_adjacent(player.tile()) {
            return Ok(DoorCheck::NotAdjacent);
        }
        if self.state == DoorState::Unlocked {
            return Ok(DoorCheck::AlreadyOpen);
        }
        let real = player.take_key().unwrap_or(false);
        if real {
            self.set(grid, DoorState::Unlocked)?;
            self.relock_at = None;
            Ok(DoorCheck::Unlocked)
        } else {
            self.set(grid, DoorState::Incorrect)?;
            self.relock_at = Some(now + relock_seconds as f64);
            Ok(DoorCheck::Rejected)
        }
    }
}

pub fn collect_key(keys: &mut [Key], player: &mut Player) -> Option<bool> {
    if player.has_key || !player.can_collect {
        return None;
    }
    let tile = player.tile();
    let key = keys
        .iter_mut()
        .find(|key| !key.collected && key.pos == tile)?;
    key.collected = true;
    player.has_key = true;
    player.key_is_real = key.is_real;
    Some(key.is_real)
}

pub fn collect_powerup(powerups: &mut Vec<Powerup>, player: &mut Player) -> Option<PowerupType> {
    if player.held_powerup.is_some() || !player.can_collect {
        return None;
    }
    let tile = player.tile();
    let idx = powerups
        .iter()
        .position(|powerup| !powerup.collected && powerup.pos == tile)?;
    let mut powerup = powerups.remove(idx);
    powerup.collected = true;
    let kind = powerup.kind;
    player.held_powerup = Some(powerup);
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameConfig;

    fn doorway() -> (Grid, DoorSet) {
        let mut grid = Grid::filled(5, 5, Cell::Wall);
        for x in 1..4 {
            grid.set_cell(x, 1, Cell::Path).expect("in bounds");
        }
        grid.set_cell(2, 2, Cell::DoorLocked).expect("in bounds");
        grid.set_cell(2, 3, Cell::StructureFloor).expect("in bounds");
        (grid, DoorSet::locked(vec![Vec2::new(2, 2)]))
    }

    fn player_with_key(real: bool) -> Player {
        let mut player = Player::new(Vec2::new(2, 1), 1, &GameConfig::default());
        player.has_key = true;
        player.key_is_real = real;
        player
    }

    #[test]
    fn decoy_key_sets_penalty_and_relocks_after_delay() {
        let (mut grid, mut doors) = doorway();
        let mut player = player_with_key(false);
        let check = doors
            .try_unlock(&mut grid, &mut player, 10.0, 2.5)
            .expect("doors in bounds");
        assert_eq!(check, DoorCheck::Rejected);
        assert!(!player.has_key);
        assert_eq!(grid.at(Vec2::new(2, 2)), Some(Cell::DoorIncorrect));

        assert!(!doors.relock_if_due(&mut grid, 12.0).expect("in bounds"));
        assert!(doors.relock_if_due(&mut grid, 12.5).expect("in bounds"));
        assert_eq!(doors.state, DoorState::Locked);
        assert_eq!(grid.at(Vec2::new(2, 2)), Some(Cell::DoorLocked));
    }

    #[test]
    fn real_key_supersedes_pending_relock() {
        let (mut grid, mut doors) = doorway();
        let mut decoy = player_with_key(false);
        doors
            .try_unlock(&mut grid, &mut decoy, 0.0, 2.5)
            .expect("doors in bounds");
        let mut player = player_with_key(true);
        let check = doors
            .try_unlock(&mut grid, &mut player, 1.0, 2.5)
            .expect("doors in bounds");
        assert_eq!(check, DoorCheck::Unlocked);
        assert!(!doors.relock_if_due(&mut grid, 10.0).expect("in bounds"));
        assert_eq!(grid.at(Vec2::new(2, 2)), Some(Cell::DoorUnlocked));
    }

    #[test]
    fn key_is_kept_when_far_from_door_or_doors_open() {
        let (mut grid, mut doors) = doorway();
        let mut player = player_with_key(true);
        player.place_at(Vec2::new(1, 1));
        let check = doors
            .try_unlock(&mut grid, &mut player, 0.0, 2.5)
            .expect("doors in bounds");
        assert_eq!(check, DoorCheck::NotAdjacent);
        assert!(player.has_key);

        doors
            .set(&mut grid, DoorState::Unlocked)
            .expect("doors in bounds");
        player.place_at(Vec2::new(2, 1));
        let check = doors
            .try_unlock(&mut grid, &mut player, 0.0, 2.5)
            .expect("doors in bounds");
        assert_eq!(check, DoorCheck::AlreadyOpen);
        assert!(player.has_key);
    }

    #[test]
    fn approach_is_the_maze_side_neighbor() {
        let (grid, doors) = doorway();
        assert_eq!(doors.approach(&grid), Some(Vec2::new(2, 1)));
    }

    #[test]
    fn collection_respects_capacity_and_immunity() {
        let mut player = Player::new(Vec2::new(3, 3), 1, &GameConfig::default());
        let mut keys = vec![
            Key {
                pos: Vec2::new(3, 3),
                is_real: false,
                collected: false,
            },
            Key {
                pos: Vec2::new(3, 3),
                is_real: true,
                collected: false,
            },
        ];
        player.can_collect = false;
        assert_eq!(collect_key(&mut keys, &mut player), None);
        player.can_collect = true;
        assert_eq!(collect_key(&mut keys, &mut player), Some(false));
        assert_eq!(collect_key(&mut keys, &mut player), None);
        assert!(!keys[1].collected);

        let mut powerups = vec![
            Powerup::new(Vec2::new(3, 3), PowerupType::Immunity),
            Powerup::new(Vec2::new(3, 3), PowerupType::SlowMove),
        ];
        assert_eq!(
            collect_powerup(&mut powerups, &mut player),
            Some(PowerupType::Immunity)
        );
        assert_eq!(collect_powerup(&mut powerups, &mut player), None);
        assert_eq!(powerups.len(), 1);
    }
}
