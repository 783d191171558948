/// WorldState: the complete snapshot of a running session.
///
/// ## Camera / Viewport
///
/// World coordinates and screen coordinates are separate:
///   - `camera.target` — integer top-left viewport cell, recomputed from
///     the snake head each tick with a margin rule
///   - `camera.smoothed` — float offset the renderer actually samples at,
///     eased toward `target` every frame independent of the tick rate
///   - Renderer maps: `screen(sx, sy) = world(floor(smoothed) + sx, ...)`
///
/// The tick driver mutates grid/snake/target; the frame driver alone
/// mutates `smoothed` (and the cosmetic shake scalar). Both run on one
/// thread, so mutation and read never interleave mid-operation.

use crate::config::{GameConfig, Tuning};
use crate::domain::cell::Cell;
use crate::domain::grid::WorldGrid;
use crate::domain::mosaic::MosaicSpec;
use crate::domain::snake::Snake;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Intro overlay. Simulation suspended until a key is pressed.
    Welcome,
    /// Normal play: the snake roams and eats.
    Roaming,
    /// Map editor: simulation frozen, camera under direct control.
    Editing,
}

/// A rectangle of grid cells, used to track overlay regions (mosaics,
/// stamped text) that are excluded from persisted state on save.
#[derive(Clone, Copy, Debug)]
pub struct CellRect {
    pub x: i32,
    pub y: i32,
    pub w: usize,
    pub h: usize,
}

/// Camera: a viewport into the world.
///
/// `target` is clamped to `[0, cols - view_w] × [0, rows - view_h]`; the
/// world itself wraps but the viewport never straddles the seam — the
/// snake carries the viewport with it around the torus instead.
#[derive(Clone, Debug)]
pub struct Camera {
    pub target: (i32, i32),
    pub smoothed: (f32, f32),
    /// Viewport size in world cells; set from terminal size during render.
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera {
            target: (0, 0),
            smoothed: (0.0, 0.0),
            view_w: 0,
            view_h: 0,
        }
    }

    /// Margin rule: shift the target only when the tracked head comes
    /// within `margin` cells of a viewport edge, each axis independent.
    pub fn follow(&mut self, head_x: i32, head_y: i32, cols: usize, rows: usize, margin: i32) {
        if self.view_w == 0 || self.view_h == 0 {
            return;
        }
        let vw = self.view_w as i32;
        let vh = self.view_h as i32;

        let mut tx = self.target.0;
        let mut ty = self.target.1;

        if head_x - tx < margin {
            tx = head_x - margin;
        } else if head_x - tx > vw - margin {
            tx = head_x - (vw - margin);
        }
        if head_y - ty < margin {
            ty = head_y - margin;
        } else if head_y - ty > vh - margin {
            ty = head_y - (vh - margin);
        }

        self.target = (
            tx.clamp(0, (cols as i32 - vw).max(0)),
            ty.clamp(0, (rows as i32 - vh).max(0)),
        );
    }

    /// Center the viewport on a position. Used at session start and when
    /// a non-playing phase wants the snake on screen.
    pub fn center_on(&mut self, x: i32, y: i32, cols: usize, rows: usize) {
        if self.view_w == 0 || self.view_h == 0 {
            return;
        }
        let vw = self.view_w as i32;
        let vh = self.view_h as i32;
        self.target = (
            (x - vw / 2).clamp(0, (cols as i32 - vw).max(0)),
            (y - vh / 2).clamp(0, (rows as i32 - vh).max(0)),
        );
    }

    /// Edit-mode pan: move the target directly and snap the eased offset,
    /// so editing stays responsive.
    pub fn pan(&mut self, dx: i32, dy: i32, cols: usize, rows: usize) {
        let vw = self.view_w as i32;
        let vh = self.view_h as i32;
        self.target = (
            (self.target.0 + dx).clamp(0, (cols as i32 - vw).max(0)),
            (self.target.1 + dy).clamp(0, (rows as i32 - vh).max(0)),
        );
        self.snap();
    }

    /// Drop interpolation: jump `smoothed` straight onto `target`.
    pub fn snap(&mut self) {
        self.smoothed = (self.target.0 as f32, self.target.1 as f32);
    }

    /// Per-frame exponential easing toward the tick-driven target.
    pub fn ease(&mut self, lerp: f32) {
        self.smoothed.0 += (self.target.0 as f32 - self.smoothed.0) * lerp;
        self.smoothed.1 += (self.target.1 as f32 - self.smoothed.1) * lerp;
    }
}

pub struct WorldState {
    pub grid: WorldGrid,
    pub snake: Snake,
    pub camera: Camera,
    pub tuning: Tuning,

    pub phase: Phase,
    pub paused: bool,
    pub tick: u64,
    /// Cells eaten this session.
    pub consumed: u64,

    // ── Cosmetics ──
    /// Boost screen-shake intensity, 0..=1. Frame-driver owned.
    pub shake: f32,
    pub anim_tick: u32,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    /// Hover tooltip: terminal (col, row) anchor + text.
    pub tooltip: Option<(u16, u16, String)>,

    // ── Edit mode ──
    /// Index into `Cell::paintable()`.
    pub paint_idx: usize,
    /// Within edit mode: true = mouse drags paint, false = they pan.
    pub paint_active: bool,

    // ── Overlays ──
    pub mosaics: Vec<MosaicSpec>,
    /// Regions masked back to background on export.
    pub overlay_rects: Vec<CellRect>,
}

impl WorldState {
    pub fn new(grid: WorldGrid, config: &GameConfig) -> Self {
        let start = (grid.cols() as i32 / 2, grid.rows() as i32 / 2);
        let snake = Snake::new(start.0, start.1, config.tuning.base_len);
        WorldState {
            grid,
            snake,
            camera: Camera::new(),
            tuning: config.tuning.clone(),
            phase: Phase::Welcome,
            paused: false,
            tick: 0,
            consumed: 0,
            shake: 0.0,
            anim_tick: 0,
            message: String::new(),
            message_timer: 0,
            tooltip: None,
            paint_idx: 1,
            paint_active: false,
            mosaics: config.mosaics.clone(),
            overlay_rects: Vec::new(),
        }
    }

    /// Is the tick driver's body skipped right now? The timer itself keeps
    /// running so resume is instantaneous.
    #[inline]
    pub fn suspended(&self) -> bool {
        self.phase != Phase::Roaming || self.paused
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Selected paint symbol.
    pub fn paint_cell(&self) -> Cell {
        let palette = Cell::paintable();
        palette[self.paint_idx % palette.len()]
    }

    pub fn cycle_paint(&mut self, delta: i32) {
        let n = Cell::paintable().len() as i32;
        self.paint_idx = (self.paint_idx as i32 + delta).rem_euclid(n) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(vw: usize, vh: usize) -> Camera {
        let mut c = Camera::new();
        c.view_w = vw;
        c.view_h = vh;
        c
    }

    #[test]
    fn margin_rule_far_edge() {
        // vw=20, margin=10, head at x=15, target x=0:
        // offset 15 > vw - margin = 10, so target becomes head - 10 = 5.
        let mut cam = camera(20, 20);
        cam.follow(15, 10, 500, 500, 10);
        assert_eq!(cam.target.0, 5);
    }

    #[test]
    fn margin_rule_near_edge() {
        let mut cam = camera(20, 20);
        cam.target = (40, 40);
        cam.follow(45, 55, 500, 500, 10);
        // x: 45-40=5 < 10 → 45-10=35. y: 55-40=15 in dead zone? 15>10 → far
        // edge shift: 55-10=45.
        assert_eq!(cam.target, (35, 45));
    }

    #[test]
    fn target_clamps_to_world() {
        let mut cam = camera(20, 20);
        cam.follow(2, 498, 500, 500, 10);
        assert_eq!(cam.target.0, 0);
        assert_eq!(cam.target.1, 480);
    }

    #[test]
    fn dead_zone_leaves_target_alone() {
        let mut cam = camera(40, 40);
        cam.target = (100, 100);
        cam.follow(120, 120, 500, 500, 10);
        assert_eq!(cam.target, (100, 100));
    }

    #[test]
    fn ease_converges_and_snap_is_instant() {
        let mut cam = camera(20, 20);
        cam.target = (10, 0);
        for _ in 0..200 {
            cam.ease(0.18);
        }
        assert!((cam.smoothed.0 - 10.0).abs() < 1e-3);

        cam.target = (50, 7);
        cam.snap();
        assert_eq!(cam.smoothed, (50.0, 7.0));
    }

    #[test]
    fn pan_clamps_and_snaps() {
        let mut cam = camera(20, 20);
        cam.pan(-5, 3, 500, 500);
        assert_eq!(cam.target, (0, 3));
        assert_eq!(cam.smoothed, (0.0, 3.0));
    }

    #[test]
    fn follow_without_viewport_is_a_no_op() {
        let mut cam = Camera::new();
        cam.follow(250, 250, 500, 500, 10);
        assert_eq!(cam.target, (0, 0));
    }
}
