use thiserror::Error;

use crate::types::{Cell, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell ({x}, {y}) is outside a {width}x{height} grid")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    #[error("maze dimensions {rows}x{cols} must be odd and at least {min}")]
    InvalidDimensions { rows: i32, cols: i32, min: i32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn filled(width: i32, height: i32, cell: Cell) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            cells: vec![cell; (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn within_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn cell_at(&self, x: i32, y: i32) -> Result<Cell, GridError> {
        self.get(x, y).ok_or_else(|| self.out_of_bounds(x, y))
    }

    pub fn set_cell(&mut self, x: i32, y: i32, cell: Cell) -> Result<(), GridError> {
        let idx = self.index(x, y).ok_or_else(|| self.out_of_bounds(x, y))?;
        self.cells[idx] = cell;
        Ok(())
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        self.index(x, y).map(|idx| self.cells[idx])
    }

    pub fn at(&self, pos: Vec2) -> Option<Cell> {
        self.get(pos.x, pos.y)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2, self.height / 2)
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Vec2::new(x, y)))
    }

    pub fn positions_of(&self, predicate: impl Fn(Cell) -> bool) -> Vec<Vec2> {
        self.positions()
            .filter(|pos| self.at(*pos).map(&predicate).unwrap_or(false))
            .collect()
    }

    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width.max(1) as usize)
            .map(|row| row.iter().map(|cell| cell.glyph()).collect())
            .collect()
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.within_bounds(x, y) {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    fn out_of_bounds(&self, x: i32, y: i32) -> GridError {
        GridError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Grid, GridError};
    use crate::types::Cell;

    #[test]
    fn out_of_bounds_reads_fail() {
        let grid = Grid::filled(5, 3, Cell::Wall);
        assert_eq!(grid.cell_at(4, 2), Ok(Cell::Wall));
        assert!(matches!(
            grid.cell_at(5, 0),
            Err(GridError::OutOfBounds { x: 5, y: 0, .. })
        ));
        assert!(grid.cell_at(-1, 0).is_err());
        assert!(grid.cell_at(0, 3).is_err());
    }

    #[test]
    fn set_cell_only_touches_one_cell() {
        let mut grid = Grid::filled(4, 4, Cell::Wall);
        grid.set_cell(2, 1, Cell::Path).expect("in bounds");
        assert_eq!(grid.positions_of(|cell| cell == Cell::Path).len(), 1);
        assert_eq!(grid.get(2, 1), Some(Cell::Path));
        assert!(grid.set_cell(4, 0, Cell::Path).is_err());
    }

    #[test]
    fn rows_render_one_glyph_per_cell() {
        let mut grid = Grid::filled(3, 2, Cell::Wall);
        grid.set_cell(1, 1, Cell::Portal).expect("in bounds");
        assert_eq!(grid.to_rows(), vec!["###".to_string(), "#P#".to_string()]);
    }
}
