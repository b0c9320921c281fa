use crate::grid::Grid;
use crate::types::Vec2;

use super::motion::Motion;

const ZONE_SLOTS: [(i32, i32); 9] = [
    (1, 1),
    (0, 0),
    (2, 2),
    (0, 2),
    (2, 0),
    (1, 0),
    (0, 1),
    (2, 1),
    (1, 2),
];

/// Axis-aligned overlap of two unit tiles, each shrunk by `inset` per side.
pub(super) fn agents_overlap(a: &Motion, b: &Motion, inset: f32) -> bool {
    let reach = 1.0 - 2.0 * inset;
    (a.float_x - b.float_x).abs() < reach && (a.float_y - b.float_y).abs() < reach
}

pub(super) fn corner_origins(grid: &Grid) -> [Vec2; 4] {
    let (w, h) = (grid.width(), grid.height());
    [
        Vec2::new(1, 1),
        Vec2::new(w - 4, 1),
        Vec2::new(1, h - 4),
        Vec2::new(w - 4, h - 4),
    ]
}

pub(super) fn zone_slot(origin: Vec2, batch: usize) -> Vec2 {
    let (dx, dy) = ZONE_SLOTS[batch % ZONE_SLOTS.len()];
    Vec2::new(origin.x + dx, origin.y + dy)
}

pub(super) fn enemy_id(floor: u32, index: usize) -> String {
    format!("enemy_{floor}_{}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    #[test]
    fn overlap_uses_inset_tolerance() {
        let a = Motion::at(Vec2::new(4, 4));
        let mut b = Motion::at(Vec2::new(4, 4));
        assert!(agents_overlap(&a, &b, 0.25));

        b.float_x = 4.49;
        assert!(agents_overlap(&a, &b, 0.25));
        b.float_x = 4.5;
        assert!(!agents_overlap(&a, &b, 0.25));
        // Diagonal neighbors never touch.
        let c = Motion::at(Vec2::new(5, 5));
        assert!(!agents_overlap(&a, &c, 0.0));
    }

    #[test]
    fn corner_zones_fit_inside_the_border() {
        let grid = Grid::filled(29, 29, Cell::Wall);
        for origin in corner_origins(&grid) {
            for batch in 0..ZONE_SLOTS.len() {
                let slot = zone_slot(origin, batch);
                assert!(slot.x >= 1 && slot.y >= 1 && slot.x <= 27 && slot.y <= 27);
            }
        }
    }

    #[test]
    fn zone_slots_are_distinct_per_batch() {
        let origin = Vec2::new(1, 1);
        let slots: std::collections::HashSet<Vec2> =
            (0..ZONE_SLOTS.len()).map(|batch| zone_slot(origin, batch)).collect();
        assert_eq!(slots.len(), ZONE_SLOTS.len());
    }
}
