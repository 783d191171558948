/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The world itself is never re-rendered here: the frame samples the
/// compositor's off-screen rasters. One game cell maps to two terminal
/// columns; the minimap uses half-block characters for two pixels per
/// terminal row.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::domain::cell::Cell as GridCell;
use crate::sim::world::{Phase, WorldState};
use crate::ui::compositor::{GridCompositor, MINIMAP_BLOCK};
use crate::ui::palette::{self, CANVAS_BG};
use crate::ui::surface::{Rgb, Surface};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, matching
    /// the canvas background so inter-row gaps never flash a different
    /// color on VTE terminals.
    const BASE_BG: Color = rgb(CANVAS_BG);

    const BLANK: Cell = Cell {
        ch: ' ',
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel used to invalidate the back buffer: differs from any real
    /// cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: '?',
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

const fn rgb(c: Rgb) -> Color {
    Color::Rgb { r: c.r, g: c.g, b: c.b }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.set(cx, y, Cell::new(ch, fg, bg));
            cx += 1;
        }
    }
}

// ── Renderer ──

/// Each game cell = 2 terminal columns.
const CELL_W: usize = 2;

/// Vertical layout
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

/// Minimap panel, inner size in terminal cells (each row = 2 px tall).
const MM_W: usize = 26;
const MM_H: usize = 13;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    rng: SmallRng,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            DisableMouseCapture,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Terminal (col, row) → world cell under it, if inside the viewport.
    /// Uses the integer camera target, matching the paint/hit-test rule.
    pub fn screen_to_world(&self, world: &WorldState, col: u16, row: u16) -> Option<(i32, i32)> {
        let row = row as usize;
        if row < MAP_ROW || row >= MAP_ROW + world.camera.view_h {
            return None;
        }
        let vx = col as usize / CELL_W;
        if vx >= world.camera.view_w {
            return None;
        }
        let vy = row - MAP_ROW;
        Some((
            world.camera.target.0 + vx as i32,
            world.camera.target.1 + vy as i32,
        ))
    }

    pub fn render(&mut self, world: &mut WorldState, comp: &GridCompositor) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let resized = tw as usize != self.term_w || th as usize != self.term_h;
        if resized {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Viewport dimensions from terminal size
        let cols = world.grid.cols();
        let rows = world.grid.rows();
        let reserved_rows = MAP_ROW + 4; // HUD + gap + msg + help
        world.camera.view_w = (self.term_w / CELL_W).min(cols).max(1);
        world.camera.view_h = if self.term_h > reserved_rows {
            (self.term_h - reserved_rows).min(rows)
        } else {
            1
        };
        if resized {
            // Re-clamp the target to the new viewport and drop interpolation
            world.camera.pan(0, 0, cols, rows);
        }

        // Welcome: keep the start position centered behind the overlay
        if world.phase == Phase::Welcome {
            let (hx, hy) = world.snake.head();
            world.camera.center_on(hx, hy, cols, rows);
            world.camera.snap();
        }

        // Phase change → clear for clean transition
        let phase_changed = self.last_phase != Some(world.phase);
        if phase_changed {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        // Frame-driver state: eased camera + boost shake (cosmetic only,
        // never persisted back into `smoothed`)
        world.camera.ease(world.tuning.lerp);
        let boosting = world.phase == Phase::Roaming && !world.paused && world.snake.boost;
        if boosting {
            world.shake += (1.0 - world.shake) * 0.2;
        } else {
            world.shake *= 0.85;
            if world.shake < 0.01 {
                world.shake = 0.0;
            }
        }

        // Build front buffer
        self.front.clear();

        let (sx, sy) = self.compose_world(world, comp);
        match world.phase {
            Phase::Welcome => {
                self.compose_welcome(world);
            }
            Phase::Roaming => {
                self.compose_snake(world, comp, sx, sy);
                self.compose_minimap(world, comp);
                self.compose_hud(world);
                self.compose_message(world);
                self.compose_help(" ←↑↓→/WASD steer   SPACE boost   E edit   P pause   ESC quit");
                if world.paused {
                    self.compose_pause(world);
                }
                self.compose_tooltip(world);
            }
            Phase::Editing => {
                self.compose_minimap(world, comp);
                self.compose_hud(world);
                self.compose_palette_bar(world);
                self.compose_message(world);
                self.compose_help(" ←↑↓→ pan   B brush   [ ] color   S save   drag pan/paint   ESC back");
                self.compose_tooltip(world);
            }
        }

        // Diff and emit
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors at start of frame; never ResetColor here —
        // the terminal's native default may differ from BASE_BG.
        queue!(
            self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                if cell == prev {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;

                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: world viewport ──

    /// Sample the visible window of the world buffer. Returns the integer
    /// source origin in cells, which the snake pass reuses.
    fn compose_world(&mut self, world: &WorldState, comp: &GridCompositor) -> (i32, i32) {
        let cols = world.grid.cols();
        let rows = world.grid.rows();
        let cam = &world.camera;
        let (vw, vh) = (cam.view_w, cam.view_h);

        // Draw-time offset: eased camera plus boost jitter. The jitter is
        // applied here only; `smoothed` itself stays on its easing path.
        let mag = world.shake * world.tuning.shake;
        let jx: f32 = if mag > 0.0 { self.rng.gen_range(-mag..=mag) } else { 0.0 };
        let jy: f32 = if mag > 0.0 { self.rng.gen_range(-mag..=mag) } else { 0.0 };
        let max_x = (cols as i32 - vw as i32).max(0) as f32;
        let max_y = (rows as i32 - vh as i32).max(0) as f32;
        let ox = (cam.smoothed.0 + jx).clamp(0.0, max_x);
        let oy = (cam.smoothed.1 + jy).clamp(0.0, max_y);
        let sx = ox.floor() as i32;
        let sy = oy.floor() as i32;

        for vy in 0..vh {
            let gy = sy + vy as i32;
            let row = MAP_ROW + vy;
            if row >= self.front.height || gy < 0 || gy >= rows as i32 {
                continue;
            }
            for vx in 0..vw {
                let gx = sx + vx as i32;
                let col = vx * CELL_W;
                if col + 1 >= self.front.width || gx < 0 || gx >= cols as i32 {
                    continue;
                }
                let bg = rgb(comp.sample_cell(gx as usize, gy as usize));
                self.front.set(col, row, Cell::new(' ', Color::White, bg));
                self.front.set(col + 1, row, Cell::new(' ', Color::White, bg));
            }
        }

        (sx, sy)
    }

    /// Snake segments over the viewport, shrinking head → tail.
    fn compose_snake(&mut self, world: &WorldState, comp: &GridCompositor, sx: i32, sy: i32) {
        let cam = &world.camera;
        let n = world.snake.len();
        let snake_fg = rgb(palette::SNAKE);

        for (i, &(gx, gy)) in world.snake.segments().enumerate() {
            let vx = gx - sx;
            let vy = gy - sy;
            if vx < 0 || vy < 0 || vx >= cam.view_w as i32 || vy >= cam.view_h as i32 {
                continue;
            }
            let row = MAP_ROW + vy as usize;
            let col = vx as usize * CELL_W;
            if row >= self.front.height || col + 1 >= self.front.width {
                continue;
            }

            // Single segment: no interpolation (and no zero division)
            let scale = if n <= 1 {
                1.0
            } else {
                let t = i as f32 / (n - 1) as f32;
                1.0 + (world.tuning.min_tail_scale - 1.0) * t
            };
            let ch = if scale >= 0.9 {
                '█'
            } else if scale >= 0.7 {
                '▓'
            } else if scale >= 0.45 {
                '▒'
            } else {
                '░'
            };

            let under = rgb(comp.sample_cell(
                gx.rem_euclid(world.grid.cols() as i32) as usize,
                gy.rem_euclid(world.grid.rows() as i32) as usize,
            ));
            self.front.set(col, row, Cell::new(ch, snake_fg, under));
            self.front.set(col + 1, row, Cell::new(ch, snake_fg, under));
        }
    }

    // ── Compose: minimap panel ──

    fn compose_minimap(&mut self, world: &WorldState, comp: &GridCompositor) {
        let cam = &world.camera;
        if cam.view_h < MM_H + 3 || cam.view_w * CELL_W < MM_W + 6 {
            return; // terminal too small for the panel
        }

        let mm = comp.minimap_raster();
        let (mw, mh) = (mm.width(), mm.height());
        let x0 = (cam.view_w * CELL_W).min(self.front.width) - MM_W - 2;
        let y0 = MAP_ROW + cam.view_h - MM_H - 2;

        let head = world.snake.head();
        let head_px = (
            head.0 as usize / MINIMAP_BLOCK,
            head.1 as usize / MINIMAP_BLOCK,
        );

        // Viewport extent rectangle, in minimap pixels
        let rx0 = cam.smoothed.0 as usize / MINIMAP_BLOCK;
        let ry0 = cam.smoothed.1 as usize / MINIMAP_BLOCK;
        let rx1 = (rx0 + cam.view_w / MINIMAP_BLOCK).min(mw.saturating_sub(1));
        let ry1 = (ry0 + cam.view_h / MINIMAP_BLOCK).min(mh.saturating_sub(1));

        let sample = |px: usize, py: usize| -> Rgb {
            let px = px.min(mw.saturating_sub(1));
            let py = py.min(mh.saturating_sub(1));
            // Head marker wins, then the viewport rectangle outline
            if px == head_px.0 && py == head_px.1 {
                return palette::SNAKE;
            }
            let on_x_edge = (px == rx0 || px == rx1) && (ry0..=ry1).contains(&py);
            let on_y_edge = (py == ry0 || py == ry1) && (rx0..=rx1).contains(&px);
            let base = mm.pixel(px, py);
            if on_x_edge || on_y_edge {
                base.blend(Rgb::new(255, 255, 255), 0.35)
            } else {
                base
            }
        };

        // Border
        let border_fg = Color::White;
        for i in 0..MM_W + 2 {
            self.front.set(x0 + i, y0, Cell::new('─', border_fg, Cell::BASE_BG));
            self.front
                .set(x0 + i, y0 + MM_H + 1, Cell::new('─', border_fg, Cell::BASE_BG));
        }
        for j in 0..MM_H + 2 {
            self.front.set(x0, y0 + j, Cell::new('│', border_fg, Cell::BASE_BG));
            self.front
                .set(x0 + MM_W + 1, y0 + j, Cell::new('│', border_fg, Cell::BASE_BG));
        }
        self.front.set(x0, y0, Cell::new('┌', border_fg, Cell::BASE_BG));
        self.front
            .set(x0 + MM_W + 1, y0, Cell::new('┐', border_fg, Cell::BASE_BG));
        self.front
            .set(x0, y0 + MM_H + 1, Cell::new('└', border_fg, Cell::BASE_BG));
        self.front
            .set(x0 + MM_W + 1, y0 + MM_H + 1, Cell::new('┘', border_fg, Cell::BASE_BG));

        // Interior: half-block downsample, 2 minimap px per terminal row
        for j in 0..MM_H {
            for i in 0..MM_W {
                let px = i * mw / MM_W;
                let py_top = (2 * j) * mh / (2 * MM_H);
                let py_bot = (2 * j + 1) * mh / (2 * MM_H);
                let top = sample(px, py_top);
                let bot = sample(px, py_bot);
                self.front.set(
                    x0 + 1 + i,
                    y0 + 1 + j,
                    Cell::new('▀', rgb(top), rgb(bot)),
                );
            }
        }
    }

    // ── Compose: chrome ──

    fn compose_hud(&mut self, world: &WorldState) {
        let hud_bg = Color::Rgb { r: 20, g: 20, b: 60 };
        for x in 0..self.front.width {
            self.front.set(x, HUD_ROW, Cell::new(' ', Color::White, hud_bg));
        }
        let (hx, hy) = world.snake.head();
        let mode = match world.phase {
            Phase::Editing => {
                if world.paint_active {
                    "EDIT·BRUSH"
                } else {
                    "EDIT"
                }
            }
            _ if world.paused => "PAUSED",
            _ if world.snake.boost => "BOOST",
            _ => "",
        };
        let hud = format!(
            " contribgrid  ({:>3},{:>3})  eaten:{:<6} len:{:<3} {}",
            hx, hy, world.consumed, world.snake.len(), mode,
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, hud_bg);
    }

    fn compose_message(&mut self, world: &WorldState) {
        let msg_row = MAP_ROW + world.camera.view_h + 1;
        if msg_row >= self.front.height || world.message.is_empty() {
            return;
        }
        let msg_bg = Color::Rgb { r: 200, g: 180, b: 50 };
        let msg = format!(" ◈ {} ", world.message);
        for x in 0..self.front.width {
            self.front.set(x, msg_row, Cell::new(' ', Color::Black, msg_bg));
        }
        self.front.put_str(0, msg_row, &msg, Color::Black, msg_bg);
    }

    fn compose_help(&mut self, text: &str) {
        let help_row = self.front.height.saturating_sub(1);
        self.front.put_str(0, help_row, text, Color::DarkGrey, Cell::BASE_BG);
    }

    /// Edit-mode palette bar on the spare row between HUD and map.
    fn compose_palette_bar(&mut self, world: &WorldState) {
        let row = HUD_ROW + 1;
        let palette_cells = GridCell::paintable();
        let selected = world.paint_idx % palette_cells.len();

        let mut x = 1;
        for (i, &cell) in palette_cells.iter().enumerate() {
            if x + 2 >= self.front.width {
                break;
            }
            let color = rgb(palette::color_of(cell));
            let marker = if i == selected { '▾' } else { ' ' };
            self.front.set(x, row, Cell::new(marker, Color::White, Cell::BASE_BG));
            self.front.set(x + 1, row, Cell::new('█', color, Cell::BASE_BG));
            x += 2;
        }
        let label = format!("  paint '{}'", world.paint_cell().to_char());
        self.front.put_str(x, row, &label, Color::DarkGrey, Cell::BASE_BG);
    }

    fn compose_tooltip(&mut self, world: &WorldState) {
        let Some((col, row, ref text)) = world.tooltip else {
            return;
        };
        let tip = format!(" {} ", text);
        let w = tip.chars().count();
        let x = (col as usize + 2).min(self.front.width.saturating_sub(w));
        let y = (row as usize + 1).min(self.front.height.saturating_sub(1));
        let bg = Color::Rgb { r: 40, g: 44, b: 52 };
        self.front.put_str(x, y, &tip, Color::Rgb { r: 220, g: 220, b: 220 }, bg);
    }

    // ── Compose: overlays ──

    fn compose_welcome(&mut self, world: &WorldState) {
        let cam = &world.camera;
        let view_cols = cam.view_w * CELL_W;
        let lines = [
            "╔══════════════════════════════════════╗",
            "║       C O N T R I B G R I D          ║",
            "║                                      ║",
            "║   A snake grazes the contribution    ║",
            "║   graph. Steer it, eat the greens.   ║",
            "║                                      ║",
            "║   ←↑↓→ / WASD   steer                ║",
            "║   SPACE (hold)  boost                ║",
            "║   E             map editor           ║",
            "║   ESC           quit                 ║",
            "╚══════════════════════════════════════╝",
        ];
        let box_w = lines[0].chars().count();
        let bx = view_cols.saturating_sub(box_w) / 2;
        let by = MAP_ROW + cam.view_h.saturating_sub(lines.len() + 4) / 2;
        let fg = Color::Rgb { r: 255, g: 220, b: 50 };
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(bx, by + i, line, fg, Cell::BASE_BG);
        }

        let blink = (world.anim_tick / 5) % 2 == 0;
        if blink {
            let prompt = "▸▸▸ PRESS ANY KEY ◂◂◂";
            let px = view_cols.saturating_sub(prompt.chars().count()) / 2;
            self.front.put_str(
                px,
                by + lines.len() + 2,
                prompt,
                Color::Rgb { r: 80, g: 255, b: 80 },
                Cell::BASE_BG,
            );
        }
    }

    fn compose_pause(&mut self, world: &WorldState) {
        let cam = &world.camera;
        let view_cols = cam.view_w * CELL_W;
        let blink = (world.anim_tick / 8) % 2 == 0;
        let label = if blink { "║  ▶  PAUSED  ◀  ║" } else { "║     PAUSED     ║" };
        let top = "╔════════════════╗";
        let hint = "║  [P] Resume    ║";
        let bottom = "╚════════════════╝";
        let bx = view_cols.saturating_sub(top.chars().count()) / 2;
        let by = MAP_ROW + cam.view_h / 2;
        let fg = Color::Rgb { r: 255, g: 220, b: 50 };
        let bg = Color::Rgb { r: 40, g: 40, b: 40 };
        self.front.put_str(bx, by.saturating_sub(1), top, fg, bg);
        self.front.put_str(bx, by, label, fg, bg);
        self.front.put_str(bx, by + 1, hint, Color::Rgb { r: 100, g: 200, b: 255 }, bg);
        self.front.put_str(bx, by + 2, bottom, fg, bg);
    }
}
