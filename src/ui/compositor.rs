/// Off-screen buffer compositor.
///
/// Owns the two rasters the presenter samples:
///   - world buffer: `cols*STEP × rows*STEP` px, one rounded-rect glyph
///     per cell, built once from the grid
///   - minimap buffer: one pixel per 4×4-cell block
///
/// After the initial build the buffers are only ever PATCHED, one cell per
/// consumption/paint event. At 500×500 cells a full redraw per frame would
/// be 4M pixels; the patch path touches 16.

use crate::config::TextOverlay;
use crate::domain::cell::Cell;
use crate::domain::grid::WorldGrid;
use crate::domain::mosaic::MosaicSpec;
use crate::sim::event::SimEvent;
use crate::sim::world::CellRect;
use crate::ui::font;
use crate::ui::palette::{self, CANVAS_BG};
use crate::ui::surface::{inside_round_rect, Raster, Rgb, Surface};

/// Cell edge in buffer pixels.
pub const CELL_PX: usize = 3;
pub const GAP_PX: usize = 1;
pub const STEP_PX: usize = CELL_PX + GAP_PX;
const RADIUS_PX: usize = 1;
/// Grid cells per minimap pixel, each axis.
pub const MINIMAP_BLOCK: usize = 4;

/// A mosaic registry entry bound to its decoded source image.
pub struct MosaicOverlay {
    pub x0: i32,
    pub y0: i32,
    pub blocks: usize,
    image: Raster,
}

impl MosaicOverlay {
    /// Decode the registry entry's image file. Failures are reported, not
    /// fatal — the caller skips the overlay and the grid shows plain
    /// cells there.
    pub fn load(entry: &MosaicSpec) -> Result<Self, String> {
        let img = image::open(&entry.image)
            .map_err(|e| format!("{}: {e}", entry.image.display()))?
            .to_rgb8();
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Err(format!("{}: empty image", entry.image.display()));
        }
        let mut raster = Raster::new(w as usize, h as usize, CANVAS_BG);
        for (x, y, p) in img.enumerate_pixels() {
            raster.set_pixel(x as usize, y as usize, Rgb::new(p.0[0], p.0[1], p.0[2]));
        }
        Ok(MosaicOverlay {
            x0: entry.offset_x,
            y0: entry.offset_y,
            blocks: entry.blocks,
            image: raster,
        })
    }

    /// Build from an in-memory raster (tests, procedural overlays).
    pub fn from_raster(x0: i32, y0: i32, blocks: usize, image: Raster) -> Self {
        MosaicOverlay { x0, y0, blocks, image }
    }

    #[inline]
    fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0
            && x < self.x0 + self.blocks as i32
            && y >= self.y0
            && y < self.y0 + self.blocks as i32
    }
}

pub struct GridCompositor {
    world: Raster,
    minimap: Raster,
    overlays: Vec<MosaicOverlay>,
}

impl GridCompositor {
    pub fn new(grid: &WorldGrid, overlays: Vec<MosaicOverlay>) -> Self {
        let mut comp = GridCompositor {
            world: Raster::new(grid.cols() * STEP_PX, grid.rows() * STEP_PX, CANVAS_BG),
            minimap: Raster::new(
                grid.cols().div_ceil(MINIMAP_BLOCK),
                grid.rows().div_ceil(MINIMAP_BLOCK),
                CANVAS_BG,
            ),
            overlays,
        };
        comp.build(grid);
        comp
    }

    /// One-time full render: every cell into the world buffer, every 4th
    /// cell into the minimap, then the mosaics on top.
    fn build(&mut self, grid: &WorldGrid) {
        for y in 0..grid.rows() as i32 {
            for x in 0..grid.cols() as i32 {
                self.draw_cell(x as usize, y as usize, palette::color_of(grid.get(x, y)));
            }
        }
        for y in (0..grid.rows()).step_by(MINIMAP_BLOCK) {
            for x in (0..grid.cols()).step_by(MINIMAP_BLOCK) {
                let color = palette::color_of(grid.get(x as i32, y as i32));
                self.minimap
                    .set_pixel(x / MINIMAP_BLOCK, y / MINIMAP_BLOCK, color);
            }
        }
        for i in 0..self.overlays.len() {
            let (x0, y0, blocks) = {
                let ov = &self.overlays[i];
                (ov.x0, ov.y0, ov.blocks)
            };
            for v in 0..blocks as i32 {
                for u in 0..blocks as i32 {
                    let (cx, cy) = (x0 + u, y0 + v);
                    if cx < 0
                        || cy < 0
                        || cx >= grid.cols() as i32
                        || cy >= grid.rows() as i32
                    {
                        continue;
                    }
                    self.draw_mosaic_cell(i, cx, cy, false);
                }
            }
        }
    }

    pub fn world_raster(&self) -> &Raster {
        &self.world
    }

    pub fn minimap_raster(&self) -> &Raster {
        &self.minimap
    }

    /// Representative color of a cell in the world buffer (its center px).
    #[inline]
    pub fn sample_cell(&self, x: usize, y: usize) -> Rgb {
        self.world
            .pixel(x * STEP_PX + CELL_PX / 2, y * STEP_PX + CELL_PX / 2)
    }

    /// Patch the buffers for one simulation/editor event. This is the only
    /// mutation path after `new`, and it repaints exactly one cell.
    pub fn apply(&mut self, grid: &WorldGrid, event: &SimEvent) {
        match *event {
            SimEvent::CellConsumed { x, y } => self.patch(grid, x, y),
            SimEvent::CellPainted { x, y, .. } => self.patch(grid, x, y),
        }
    }

    fn patch(&mut self, grid: &WorldGrid, x: i32, y: i32) {
        let cell = grid.get(x, y);
        let (ux, uy) = grid.wrap(x, y);

        if cell == Cell::Consumed {
            if let Some(i) = self.overlay_at(x, y) {
                // Eaten-but-still-visible: the mosaic sub-image, grayscale
                self.draw_mosaic_cell(i, x, y, true);
            } else {
                self.draw_cell(ux, uy, palette::color_of(cell));
            }
        } else {
            self.draw_cell(ux, uy, palette::color_of(cell));
        }

        self.minimap.set_pixel(
            ux / MINIMAP_BLOCK,
            uy / MINIMAP_BLOCK,
            palette::color_of(cell),
        );
    }

    /// Stamp a text overlay: glyph cells become `t` terrain in the grid,
    /// painted with the overlay color in both buffers. Returns the block
    /// rectangle so the caller can exclude it from saves.
    pub fn stamp_text(&mut self, grid: &mut WorldGrid, overlay: &TextOverlay) -> CellRect {
        let color = palette::color_of(Cell::from_char(overlay.color));
        let chars: Vec<char> = overlay.text.chars().collect();

        for (i, &c) in chars.iter().enumerate() {
            let Some(rows) = font::glyph(c) else { continue };
            let gx0 = overlay.x + (i * font::ADVANCE) as i32;

            for (dy, bits) in rows.iter().enumerate() {
                for dx in 0..font::GLYPH_W {
                    if bits & (1 << (font::GLYPH_W - 1 - dx)) == 0 {
                        continue;
                    }
                    let (cx, cy) = (gx0 + dx as i32, overlay.y + dy as i32);
                    if cx < 0
                        || cy < 0
                        || cx >= grid.cols() as i32
                        || cy >= grid.rows() as i32
                    {
                        continue;
                    }
                    grid.set(cx, cy, Cell::Text);
                    self.draw_cell(cx as usize, cy as usize, color);
                    self.minimap.set_pixel(
                        cx as usize / MINIMAP_BLOCK,
                        cy as usize / MINIMAP_BLOCK,
                        color,
                    );
                }
            }
        }

        CellRect {
            x: overlay.x,
            y: overlay.y,
            w: chars.len() * font::ADVANCE,
            h: font::GLYPH_H,
        }
    }

    // ── Internal drawing ──

    /// Clear one cell's pixel rectangle and redraw its rounded glyph.
    fn draw_cell(&mut self, x: usize, y: usize, color: Rgb) {
        let (px, py) = (x * STEP_PX, y * STEP_PX);
        self.world.fill_rect(px, py, STEP_PX, STEP_PX, CANVAS_BG);
        self.world
            .round_rect(px, py, CELL_PX, CELL_PX, RADIUS_PX, color);
    }

    fn overlay_at(&self, x: i32, y: i32) -> Option<usize> {
        self.overlays.iter().position(|ov| ov.contains(x, y))
    }

    /// Draw one cell of a mosaic: the nearest-mapped sub-rectangle of the
    /// source image, clipped to the cell's rounded glyph.
    fn draw_mosaic_cell(&mut self, overlay_idx: usize, x: i32, y: i32, faded: bool) {
        let (u, v, iw, ih, blocks) = {
            let ov = &self.overlays[overlay_idx];
            (
                (x - ov.x0) as usize,
                (y - ov.y0) as usize,
                ov.image.width(),
                ov.image.height(),
                ov.blocks,
            )
        };
        let (px, py) = (x as usize * STEP_PX, y as usize * STEP_PX);
        let span = blocks * CELL_PX;

        self.world.fill_rect(px, py, STEP_PX, STEP_PX, CANVAS_BG);
        for j in 0..CELL_PX {
            for i in 0..CELL_PX {
                if !inside_round_rect(i, j, CELL_PX, CELL_PX, RADIUS_PX) {
                    continue;
                }
                let sx = ((u * CELL_PX + i) * iw) / span;
                let sy = ((v * CELL_PX + j) * ih) / span;
                let mut c = self.overlays[overlay_idx].image.pixel(sx, sy);
                if faded {
                    c = c.grayscale();
                }
                self.world.set_pixel(px + i, py + j, c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::Hue;

    fn grid_20() -> WorldGrid {
        let mut grid = WorldGrid::new(20, 20);
        grid.set(5, 7, Cell::Shade(Hue::Green, 2));
        grid
    }

    fn diff_pixels(a: &[Rgb], b: &[Rgb], width: usize) -> Vec<(usize, usize)> {
        a.iter()
            .zip(b.iter())
            .enumerate()
            .filter(|(_, (x, y))| x != y)
            .map(|(i, _)| (i % width, i / width))
            .collect()
    }

    #[test]
    fn consumption_patches_exactly_one_cell() {
        let mut grid = grid_20();
        let mut comp = GridCompositor::new(&grid, vec![]);
        let world_before = comp.world_raster().snapshot();
        let minimap_before = comp.minimap_raster().snapshot();

        grid.set(5, 7, Cell::Consumed);
        comp.apply(&grid, &SimEvent::CellConsumed { x: 5, y: 7 });

        let changed = diff_pixels(
            &world_before,
            &comp.world_raster().snapshot(),
            comp.world_raster().width(),
        );
        assert!(!changed.is_empty());
        for (px, py) in changed {
            assert!(
                (20..24).contains(&px) && (28..32).contains(&py),
                "pixel ({px},{py}) outside the patched cell"
            );
        }

        let mm_changed = diff_pixels(
            &minimap_before,
            &comp.minimap_raster().snapshot(),
            comp.minimap_raster().width(),
        );
        assert!(mm_changed.len() <= 1);
        assert_eq!(comp.sample_cell(5, 7), palette::BACKGROUND);
    }

    #[test]
    fn build_populates_both_buffers() {
        let grid = grid_20();
        let comp = GridCompositor::new(&grid, vec![]);
        assert_eq!(comp.sample_cell(5, 7), palette::color_of(Cell::Shade(Hue::Green, 2)));
        assert_eq!(comp.sample_cell(0, 0), palette::BACKGROUND);
        // Minimap samples block origins: cell (4,4) block is pixel (1,1)
        assert_eq!(
            comp.minimap_raster().pixel(0, 0),
            palette::BACKGROUND
        );
    }

    #[test]
    fn consumed_mosaic_cell_fades_to_grayscale() {
        let mut grid = WorldGrid::new(16, 16);
        grid.set(4, 4, Cell::Shade(Hue::Green, 3));
        let mut img = Raster::new(8, 8, Rgb::new(200, 30, 30));
        img.fill_rect(0, 0, 8, 8, Rgb::new(200, 30, 30));
        let overlay = MosaicOverlay::from_raster(4, 4, 2, img);
        let mut comp = GridCompositor::new(&grid, vec![overlay]);

        // Composited: cell center shows the red source image
        let before = comp.sample_cell(4, 4);
        assert_eq!(before, Rgb::new(200, 30, 30));

        grid.set(4, 4, Cell::Consumed);
        comp.apply(&grid, &SimEvent::CellConsumed { x: 4, y: 4 });
        let after = comp.sample_cell(4, 4);
        assert_eq!(after.r, after.g);
        assert_eq!(after.g, after.b);
        // Neighboring mosaic cell untouched
        assert_eq!(comp.sample_cell(5, 4), Rgb::new(200, 30, 30));
    }

    #[test]
    fn paint_patches_the_painted_cell() {
        let mut grid = grid_20();
        let mut comp = GridCompositor::new(&grid, vec![]);
        grid.set(2, 2, Cell::Shade(Hue::Purple, 4));
        comp.apply(
            &grid,
            &SimEvent::CellPainted { x: 2, y: 2, cell: Cell::Shade(Hue::Purple, 4) },
        );
        assert_eq!(
            comp.sample_cell(2, 2),
            palette::color_of(Cell::Shade(Hue::Purple, 4))
        );
    }

    #[test]
    fn stamp_text_marks_glyph_cells_and_buffers() {
        let mut grid = WorldGrid::new(32, 32);
        let mut comp = GridCompositor::new(&grid, vec![]);
        let overlay = TextOverlay { text: "HI".to_string(), x: 2, y: 2, color: '4' };
        let rect = comp.stamp_text(&mut grid, &overlay);

        assert_eq!(rect.w, 2 * font::ADVANCE);
        assert_eq!(rect.h, font::GLYPH_H);
        // 'H' top-left bit is lit
        assert_eq!(grid.get(2, 2), Cell::Text);
        // 'H' top-middle bit is not
        assert_eq!(grid.get(3, 2), Cell::Background);
        // Buffer shows the overlay color at a lit cell
        assert_eq!(
            comp.sample_cell(2, 2),
            palette::color_of(Cell::from_char('4'))
        );
    }
}
