/// Map persistence — the one fallible boundary of the core.
///
/// The format is deliberately flat: one line per row, one palette char per
/// cell, written verbatim. A failed save never touches the in-memory grid,
/// so saving is always retryable.
///
/// When no map file exists, a fresh one is generated with the historical
/// contribution-level weights (mostly background, sparse bright cells).

use std::path::Path;

use rand::rngs::SmallRng;
use rand::Rng;

use crate::domain::cell::{Cell, Hue};
use crate::domain::grid::WorldGrid;
use crate::sim::world::WorldState;

/// Load the map file into a grid.
pub fn load_map(path: &Path) -> Result<WorldGrid, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read {}: {e}", path.display()))?;
    parse_map(&raw)
}

pub fn parse_map(raw: &str) -> Result<WorldGrid, String> {
    let rows: Vec<String> = raw
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    WorldGrid::from_rows(&rows)
}

/// Weighted random map, green intensity levels 0-4.
pub fn generate_map(cols: usize, rows: usize, rng: &mut SmallRng) -> WorldGrid {
    const WEIGHTS: [f32; 5] = [0.5, 0.2, 0.15, 0.10, 0.05];
    let mut grid = WorldGrid::new(cols, rows);
    for y in 0..rows as i32 {
        for x in 0..cols as i32 {
            let mut roll: f32 = rng.gen();
            let mut level = 0u8;
            for (i, w) in WEIGHTS.iter().enumerate() {
                if roll < *w {
                    level = i as u8;
                    break;
                }
                roll -= w;
            }
            if level > 0 {
                grid.set(x, y, Cell::Shade(Hue::Green, level));
            }
        }
    }
    grid
}

/// Export the grid for persistence: overlay regions (mosaics, stamped
/// text) are masked back to background in the exported copy only.
pub fn export_rows(world: &WorldState) -> Vec<String> {
    let mut rows = world.grid.to_rows();
    for rect in &world.overlay_rects {
        for dy in 0..rect.h as i32 {
            let y = rect.y + dy;
            if y < 0 || y >= rows.len() as i32 {
                continue;
            }
            let row = &mut rows[y as usize];
            let mut chars: Vec<char> = row.chars().collect();
            for dx in 0..rect.w as i32 {
                let x = rect.x + dx;
                if x < 0 || x >= chars.len() as i32 {
                    continue;
                }
                chars[x as usize] = '-';
            }
            *row = chars.into_iter().collect();
        }
    }
    rows
}

/// Write rows newline-joined, verbatim.
pub fn save_map(path: &Path, rows: &[String]) -> Result<(), String> {
    let mut content = rows.join("\n");
    content.push('\n');
    std::fs::write(path, content).map_err(|e| format!("save failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::sim::world::CellRect;
    use rand::SeedableRng;

    #[test]
    fn parse_skips_blank_lines_and_trailing_whitespace() {
        let grid = parse_map("-12-\n-34-  \n\n").unwrap();
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.rows(), 2);
    }

    #[test]
    fn generated_map_is_mostly_background() {
        let mut rng = SmallRng::seed_from_u64(7);
        let grid = generate_map(100, 100, &mut rng);
        let background = grid
            .to_rows()
            .iter()
            .flat_map(|r| r.chars())
            .filter(|&c| c == '-')
            .count();
        // Expected ~50%; allow a generous band
        assert!(background > 3500 && background < 6500, "got {background}");
    }

    #[test]
    fn export_masks_overlay_regions_without_touching_the_grid() {
        let cfg = GameConfig::default();
        let grid = {
            let mut rng = SmallRng::seed_from_u64(1);
            generate_map(32, 32, &mut rng)
        };
        let mut world = WorldState::new(grid, &cfg);
        world.grid.set(10, 10, Cell::Shade(Hue::Red, 4));
        world.overlay_rects.push(CellRect { x: 10, y: 10, w: 4, h: 4 });

        let rows = export_rows(&world);
        for y in 10..14 {
            for x in 10..14 {
                assert_eq!(rows[y].chars().nth(x).unwrap(), '-');
            }
        }
        // In-memory state untouched
        assert_eq!(world.grid.get(10, 10), Cell::Shade(Hue::Red, 4));
    }

    #[test]
    fn export_serializes_consumed_as_background() {
        let cfg = GameConfig::default();
        let mut world = WorldState::new(WorldGrid::new(8, 8), &cfg);
        world.grid.set(3, 3, Cell::Consumed);
        let rows = export_rows(&world);
        assert_eq!(rows[3].chars().nth(3).unwrap(), '-');
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = std::env::temp_dir().join("contribgrid_save_test");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("map.txt");

        let rows = vec!["-123".to_string(), "abcd".to_string()];
        save_map(&path, &rows).unwrap();
        let grid = load_map(&path).unwrap();
        assert_eq!(grid.to_rows(), rows);

        let _ = std::fs::remove_file(&path);
    }
}
