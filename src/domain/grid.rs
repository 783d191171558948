/// WorldGrid: the authoritative cell matrix.
///
/// The world is a torus: every coordinate is taken modulo the grid
/// dimensions before indexing, so callers may pass negative or overflowing
/// values freely. There are no out-of-range errors by construction.

use crate::domain::cell::Cell;

pub struct WorldGrid {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl WorldGrid {
    /// All-background grid.
    pub fn new(cols: usize, rows: usize) -> Self {
        assert!(cols > 0 && rows > 0, "grid dimensions must be non-zero");
        WorldGrid {
            cols,
            rows,
            cells: vec![Cell::Background; cols * rows],
        }
    }

    /// Construct from map-file rows (one string per row, one char per cell).
    /// Column count comes from the longest row; short rows pad with
    /// background, so a truncated file still loads.
    pub fn from_rows(rows: &[String]) -> Result<Self, String> {
        if rows.is_empty() {
            return Err("map has no rows".to_string());
        }
        let cols = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        if cols == 0 {
            return Err("map rows are empty".to_string());
        }
        let mut grid = WorldGrid::new(cols, rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                grid.cells[y * cols + x] = Cell::from_char(c);
            }
        }
        Ok(grid)
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Normalize a logical coordinate onto the torus.
    #[inline]
    pub fn wrap(&self, x: i32, y: i32) -> (usize, usize) {
        (
            x.rem_euclid(self.cols as i32) as usize,
            y.rem_euclid(self.rows as i32) as usize,
        )
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Cell {
        let (x, y) = self.wrap(x, y);
        self.cells[y * self.cols + x]
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) {
        let (x, y) = self.wrap(x, y);
        self.cells[y * self.cols + x] = cell;
    }

    /// Export as flat row-major symbol rows for persistence.
    pub fn to_rows(&self) -> Vec<String> {
        (0..self.rows)
            .map(|y| {
                self.cells[y * self.cols..(y + 1) * self.cols]
                    .iter()
                    .map(|c| c.to_char())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::Hue;

    #[test]
    fn wrap_is_total() {
        let grid = WorldGrid::new(7, 5);
        for dx in -20..20 {
            for dy in -20..20 {
                let (x, y) = grid.wrap(3 + dx, 2 + dy);
                assert!(x < 7 && y < 5);
                // get() must never panic for any logical coordinate
                let _ = grid.get(3 + dx, 2 + dy);
            }
        }
    }

    #[test]
    fn set_and_get_wrap_identically() {
        let mut grid = WorldGrid::new(10, 10);
        grid.set(-1, -1, Cell::Black);
        assert_eq!(grid.get(9, 9), Cell::Black);
        grid.set(23, 5, Cell::White);
        assert_eq!(grid.get(3, 5), Cell::White);
    }

    #[test]
    fn both_axes_wrap_independently() {
        let mut grid = WorldGrid::new(4, 3);
        grid.set(4, 3, Cell::Shade(Hue::Blue, 2));
        assert_eq!(grid.get(0, 0), Cell::Shade(Hue::Blue, 2));
    }

    #[test]
    fn from_rows_pads_short_rows() {
        let rows = vec!["12".to_string(), "3".to_string()];
        let grid = WorldGrid::from_rows(&rows).unwrap();
        assert_eq!(grid.cols(), 2);
        assert_eq!(grid.get(1, 1), Cell::Background);
        assert_eq!(grid.get(0, 1), Cell::Shade(Hue::Green, 3));
    }

    #[test]
    fn to_rows_round_trips() {
        let rows = vec!["-12q".to_string(), "abtr".to_string()];
        let grid = WorldGrid::from_rows(&rows).unwrap();
        assert_eq!(grid.to_rows(), rows);
    }

    #[test]
    fn empty_map_is_rejected() {
        assert!(WorldGrid::from_rows(&[]).is_err());
        assert!(WorldGrid::from_rows(&[String::new()]).is_err());
    }
}
