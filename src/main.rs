/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use config::GameConfig;
use domain::mosaic;
use domain::snake::Dir;
use sim::event::SimEvent;
use sim::save;
use sim::step;
use sim::world::{CellRect, Phase, WorldState};
use ui::compositor::{GridCompositor, MosaicOverlay};
use ui::gamepad::GamepadState;
use ui::input::{InputState, MouseIntent, MouseMode, MouseRouter};
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();

    // Map file, or a fresh weighted-random world when it's missing
    let grid = match save::load_map(&config.map.path) {
        Ok(g) => g,
        Err(e) => {
            eprintln!(
                "Note: {e} — generating a {}×{} map",
                config.map.cols, config.map.rows
            );
            let mut rng = SmallRng::from_entropy();
            save::generate_map(config.map.cols, config.map.rows, &mut rng)
        }
    };

    let mut world = WorldState::new(grid, &config);

    // Decode mosaic images. A missing/broken image just skips its overlay.
    // Solid mosaics claim their cells as non-collectible terrain before
    // the buffers are built, and are excluded from saves.
    let mut overlays = Vec::new();
    for entry in &config.mosaics {
        match MosaicOverlay::load(entry) {
            Ok(ov) => {
                if entry.solid {
                    for v in 0..entry.blocks as i32 {
                        for u in 0..entry.blocks as i32 {
                            let (x, y) = (entry.offset_x + u, entry.offset_y + v);
                            if x >= 0
                                && y >= 0
                                && x < world.grid.cols() as i32
                                && y < world.grid.rows() as i32
                            {
                                world.grid.set(x, y, domain::cell::Cell::Text);
                            }
                        }
                    }
                    world.overlay_rects.push(CellRect {
                        x: entry.offset_x,
                        y: entry.offset_y,
                        w: entry.blocks,
                        h: entry.blocks,
                    });
                }
                overlays.push(ov);
            }
            Err(e) => eprintln!("Warning: skipping mosaic: {e}"),
        }
    }

    let mut compositor = GridCompositor::new(&world.grid, overlays);

    // Text overlays: stamped into the grid and both buffers
    for overlay in &config.texts {
        let rect = compositor.stamp_text(&mut world.grid, overlay);
        world.overlay_rects.push(rect);
    }

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut world, &mut compositor, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Cells grazed: {}", world.consumed);
}

fn game_loop(
    world: &mut WorldState,
    compositor: &mut GridCompositor,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut mouse = MouseRouter::new();

    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(world.tuning.tick_rate_ms);

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, &gp, config) {
            break;
        }
        route_input(world, compositor, renderer, &kb, &gp, &mut mouse);

        if last_tick.elapsed() >= tick_rate {
            // Suspension skips the body; the timer itself keeps running so
            // resuming is instantaneous.
            if !world.suspended() {
                let events = step::step(world);
                for ev in &events {
                    compositor.apply(&world.grid, ev);
                }
            }

            world.anim_tick = world.anim_tick.wrapping_add(1);
            if world.message_timer > 0 {
                world.message_timer -= 1;
                if world.message_timer == 0 {
                    world.message.clear();
                }
            }

            last_tick = Instant::now();
        }

        renderer.render(world, compositor)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_BOOST: &[KeyCode] = &[KeyCode::Char(' ')];
const KEYS_EDIT: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Char('E')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::F(1)];
const KEYS_BRUSH: &[KeyCode] = &[KeyCode::Char('b'), KeyCode::Char('B')];
const KEYS_SAVE: &[KeyCode] = &[KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

/// Direction edges this frame, keyboard + gamepad, in press order.
fn detect_dirs(kb: &InputState, gp: &GamepadState) -> Vec<Dir> {
    let mut dirs = Vec::new();
    if kb.any_pressed(KEYS_UP) {
        dirs.push(Dir::UP);
    }
    if kb.any_pressed(KEYS_DOWN) {
        dirs.push(Dir::DOWN);
    }
    if kb.any_pressed(KEYS_LEFT) {
        dirs.push(Dir::LEFT);
    }
    if kb.any_pressed(KEYS_RIGHT) {
        dirs.push(Dir::RIGHT);
    }
    dirs.extend(gp.dirs_pressed());
    dirs
}

/// Phase transitions and mode commands. Returns true to quit.
fn handle_meta(
    world: &mut WorldState,
    kb: &InputState,
    gp: &GamepadState,
    config: &GameConfig,
) -> bool {
    let esc = kb.any_pressed(&[KeyCode::Esc]);

    match world.phase {
        // ── Welcome overlay ──
        Phase::Welcome => {
            if esc || kb.any_pressed(KEYS_QUIT) {
                return true;
            }
            if kb.any_key_pressed() || gp.confirm_pressed() {
                world.phase = Phase::Roaming;
            }
        }

        // ── Roaming ──
        Phase::Roaming => {
            if esc || kb.any_pressed(KEYS_QUIT) {
                return true;
            }

            if config.tuning.pausable && kb.any_pressed(KEYS_PAUSE) {
                world.paused = !world.paused;
                if world.paused {
                    world.set_message("PAUSED  [P] Resume", 0);
                } else {
                    world.message.clear();
                    world.message_timer = 0;
                }
                return false;
            }

            if !world.paused && kb.any_pressed(KEYS_EDIT) {
                world.phase = Phase::Editing;
                world.paint_active = false;
                world.camera.snap();
                world.set_message("Edit mode — [B] brush  [ ] color  [S] save", 40);
            }
        }

        // ── Editing ──
        Phase::Editing => {
            if esc || kb.any_pressed(KEYS_EDIT) {
                world.phase = Phase::Roaming;
                world.message.clear();
                world.message_timer = 0;
                return false;
            }

            if kb.any_pressed(KEYS_BRUSH) {
                world.paint_active = !world.paint_active;
                let state = if world.paint_active { "on" } else { "off" };
                world.set_message(&format!("Brush {state}"), 30);
            }
            if kb.any_pressed(&[KeyCode::Char('[')]) {
                world.cycle_paint(-1);
            }
            if kb.any_pressed(&[KeyCode::Char(']')]) {
                world.cycle_paint(1);
            }

            // The one fallible external call: report the outcome, leave
            // the in-memory grid untouched either way.
            if kb.any_pressed(KEYS_SAVE) {
                let rows = save::export_rows(world);
                match save::save_map(&config.map.path, &rows) {
                    Ok(()) => world.set_message(
                        &format!("Map saved → {}", config.map.path.display()),
                        40,
                    ),
                    Err(e) => world.set_message(&format!("Save failed: {e}"), 60),
                }
            }
        }
    }

    false
}

/// Movement, boost, pans and paints — everything below the meta layer.
fn route_input(
    world: &mut WorldState,
    compositor: &mut GridCompositor,
    renderer: &Renderer,
    kb: &InputState,
    gp: &GamepadState,
    mouse: &mut MouseRouter,
) {
    match world.phase {
        Phase::Welcome => {}

        Phase::Roaming => {
            if world.paused {
                world.snake.boost = false;
                return;
            }
            for dir in detect_dirs(kb, gp) {
                world.snake.push_dir(dir);
            }
            world.snake.boost = kb.any_held(KEYS_BOOST) || gp.boost_held();

            for intent in mouse.route(&kb.mouse_events, MouseMode::Roam) {
                match intent {
                    MouseIntent::Swipe(dir) => {
                        world.snake.push_dir(dir);
                    }
                    MouseIntent::Hover { col, row } => {
                        update_tooltip(world, renderer, col, row);
                    }
                    MouseIntent::Click { col, row } => {
                        if let Some((wx, wy)) = renderer.screen_to_world(world, col, row) {
                            if let Some(m) = mosaic::hit_test(&world.mosaics, wx, wy) {
                                let msg = match &m.href {
                                    Some(href) => format!("↗ {href}"),
                                    None => m.tooltip.clone(),
                                };
                                world.set_message(&msg, 50);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        Phase::Editing => {
            let cols = world.grid.cols();
            let rows = world.grid.rows();

            // Directional keys pan the camera directly, no easing
            if kb.any_pressed(&[KeyCode::Left]) {
                world.camera.pan(-1, 0, cols, rows);
            }
            if kb.any_pressed(&[KeyCode::Right]) {
                world.camera.pan(1, 0, cols, rows);
            }
            if kb.any_pressed(&[KeyCode::Up]) {
                world.camera.pan(0, -1, cols, rows);
            }
            if kb.any_pressed(&[KeyCode::Down]) {
                world.camera.pan(0, 1, cols, rows);
            }

            let mode = if world.paint_active {
                MouseMode::Paint
            } else {
                MouseMode::Pan
            };
            for intent in mouse.route(&kb.mouse_events, mode) {
                match intent {
                    MouseIntent::Pan { dx, dy } => {
                        world.camera.pan(dx, dy, cols, rows);
                    }
                    MouseIntent::Paint { col, row } => {
                        if let Some((wx, wy)) = renderer.screen_to_world(world, col, row) {
                            let cell = world.paint_cell();
                            world.grid.set(wx, wy, cell);
                            compositor.apply(
                                &world.grid,
                                &SimEvent::CellPainted { x: wx, y: wy, cell },
                            );
                        }
                    }
                    MouseIntent::Hover { col, row } => {
                        update_tooltip(world, renderer, col, row);
                    }
                    _ => {}
                }
            }
        }
    }
}

fn update_tooltip(world: &mut WorldState, renderer: &Renderer, col: u16, row: u16) {
    let tip = renderer
        .screen_to_world(world, col, row)
        .and_then(|(wx, wy)| mosaic::hit_test(&world.mosaics, wx, wy))
        .map(|m| m.tooltip.clone());
    world.tooltip = tip.map(|text| (col, row, text));
}
