/// Input state tracker and mouse gesture router.
///
/// Keyboard: tracks which keys are currently held (continuous boost) and
/// which were freshly pressed this frame (edge-triggered turns, mode
/// keys). Uses crossterm's keyboard enhancement for Release events when
/// available, falling back to timeout-based expiry.
///
/// Mouse: raw events are collected per frame and resolved into intents by
/// `MouseRouter` according to the current mode — a swipe becomes one
/// direction push, an edit-mode drag pans the camera (re-basing its
/// reference point each event), a paint-mode drag paints every cell it
/// crosses.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};

use crate::domain::snake::Dir;

/// After this duration without a Press/Repeat event, consider the key
/// released. Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Terminal cells a drag must cover before it resolves as a swipe.
const SWIPE_THRESHOLD: i32 = 2;

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned "not held" → "held" during the most recent
    /// drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Raw mouse events collected during drain, routed by MouseRouter.
    pub mouse_events: Vec<MouseEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            mouse_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call once per loop iteration, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
        self.mouse_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => {
                    self.raw_events.push(key);

                    match key.kind {
                        KeyEventKind::Release if self.honor_release => {
                            self.last_active.remove(&key.code);
                        }
                        KeyEventKind::Release => {
                            // Rely on timeout-based expiry instead
                        }
                        _ => {
                            let was_held = self.is_held_inner(key.code);
                            self.last_active.insert(key.code, Instant::now());
                            if !was_held {
                                self.fresh_presses.push(key.code);
                            }
                        }
                    }
                }
                Ok(Event::Mouse(mouse)) => {
                    self.mouse_events.push(mouse);
                }
                _ => {}
            }
        }

        // Expire keys that have timed out (terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Is this key currently held down? (continuous actions: boost)
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.is_held_inner(code)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Did any key at all go down this frame? (welcome screen dismissal)
    pub fn any_key_pressed(&self) -> bool {
        !self.fresh_presses.is_empty()
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        use crossterm::event::KeyModifiers;
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    // ── Internal ──

    fn is_held_inner(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}

// ── Mouse routing ──

/// How mouse gestures are interpreted this frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MouseMode {
    /// Normal play: swipes queue turns, moves hover, clicks activate.
    Roam,
    /// Edit mode, brush off: drags pan the camera.
    Pan,
    /// Edit mode, brush on: press/drag paints cells.
    Paint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseIntent {
    Swipe(Dir),
    /// Camera pan in world cells (already sign-flipped: content follows
    /// the pointer).
    Pan { dx: i32, dy: i32 },
    Paint { col: u16, row: u16 },
    Hover { col: u16, row: u16 },
    Click { col: u16, row: u16 },
}

/// Gesture state machine. One swipe per press-drag-release gesture; pans
/// re-base on every event and carry the sub-cell column remainder (a cell
/// is two terminal columns wide).
pub struct MouseRouter {
    press: Option<(i32, i32)>,
    last: Option<(i32, i32)>,
    swiped: bool,
    col_accum: i32,
}

impl MouseRouter {
    pub fn new() -> Self {
        MouseRouter {
            press: None,
            last: None,
            swiped: false,
            col_accum: 0,
        }
    }

    pub fn route(&mut self, events: &[MouseEvent], mode: MouseMode) -> Vec<MouseIntent> {
        let mut out = Vec::new();

        for ev in events {
            let (cx, cy) = (ev.column as i32, ev.row as i32);
            match ev.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    self.press = Some((cx, cy));
                    self.last = Some((cx, cy));
                    self.swiped = false;
                    self.col_accum = 0;
                    if mode == MouseMode::Paint {
                        out.push(MouseIntent::Paint { col: ev.column, row: ev.row });
                    }
                }
                MouseEventKind::Drag(MouseButton::Left) => match mode {
                    MouseMode::Roam => {
                        let Some((ox, oy)) = self.press else { continue };
                        if self.swiped {
                            continue;
                        }
                        // Terminal cells are twice as tall as wide: halve
                        // the column delta before comparing axes.
                        let dx = (cx - ox) / 2;
                        let dy = cy - oy;
                        if dx.abs().max(dy.abs()) >= SWIPE_THRESHOLD {
                            let dir = if dx.abs() > dy.abs() {
                                if dx > 0 { Dir::RIGHT } else { Dir::LEFT }
                            } else if dy > 0 {
                                Dir::DOWN
                            } else {
                                Dir::UP
                            };
                            out.push(MouseIntent::Swipe(dir));
                            self.swiped = true;
                        }
                    }
                    MouseMode::Pan => {
                        let (lx, ly) = self.last.unwrap_or((cx, cy));
                        self.col_accum += cx - lx;
                        let dx = self.col_accum / 2;
                        self.col_accum %= 2;
                        let dy = cy - ly;
                        if dx != 0 || dy != 0 {
                            out.push(MouseIntent::Pan { dx: -dx, dy: -dy });
                        }
                        self.last = Some((cx, cy));
                    }
                    MouseMode::Paint => {
                        out.push(MouseIntent::Paint { col: ev.column, row: ev.row });
                    }
                },
                MouseEventKind::Up(MouseButton::Left) => {
                    if mode == MouseMode::Roam && !self.swiped {
                        if let Some((ox, oy)) = self.press {
                            if (cx - ox).abs() < 2 && (cy - oy).abs() < 2 {
                                out.push(MouseIntent::Click { col: ev.column, row: ev.row });
                            }
                        }
                    }
                    self.press = None;
                    self.last = None;
                    self.swiped = false;
                }
                MouseEventKind::Moved => {
                    out.push(MouseIntent::Hover { col: ev.column, row: ev.row });
                }
                _ => {}
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn ev(kind: MouseEventKind, col: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column: col,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn drag_resolves_to_dominant_axis_once() {
        let mut router = MouseRouter::new();
        let events = vec![
            ev(MouseEventKind::Down(MouseButton::Left), 10, 10),
            ev(MouseEventKind::Drag(MouseButton::Left), 16, 11),
            ev(MouseEventKind::Drag(MouseButton::Left), 20, 11),
            ev(MouseEventKind::Up(MouseButton::Left), 20, 11),
        ];
        let intents = router.route(&events, MouseMode::Roam);
        assert_eq!(intents, vec![MouseIntent::Swipe(Dir::RIGHT)]);
    }

    #[test]
    fn vertical_drag_swipes_vertically() {
        let mut router = MouseRouter::new();
        let events = vec![
            ev(MouseEventKind::Down(MouseButton::Left), 10, 10),
            ev(MouseEventKind::Drag(MouseButton::Left), 11, 6),
        ];
        let intents = router.route(&events, MouseMode::Roam);
        assert_eq!(intents, vec![MouseIntent::Swipe(Dir::UP)]);
    }

    #[test]
    fn short_drag_is_not_a_swipe() {
        let mut router = MouseRouter::new();
        let events = vec![
            ev(MouseEventKind::Down(MouseButton::Left), 10, 10),
            ev(MouseEventKind::Drag(MouseButton::Left), 11, 10),
        ];
        assert!(router.route(&events, MouseMode::Roam).is_empty());
    }

    #[test]
    fn pan_rebases_and_accumulates_half_cells() {
        let mut router = MouseRouter::new();
        let down = [ev(MouseEventKind::Down(MouseButton::Left), 10, 10)];
        router.route(&down, MouseMode::Pan);

        // One column: below a full cell, nothing emitted yet
        let d1 = [ev(MouseEventKind::Drag(MouseButton::Left), 11, 10)];
        assert!(router.route(&d1, MouseMode::Pan).is_empty());

        // Second column completes one cell leftward pan
        let d2 = [ev(MouseEventKind::Drag(MouseButton::Left), 12, 10)];
        assert_eq!(
            router.route(&d2, MouseMode::Pan),
            vec![MouseIntent::Pan { dx: -1, dy: 0 }]
        );

        // Vertical pans are 1:1
        let d3 = [ev(MouseEventKind::Drag(MouseButton::Left), 12, 13)];
        assert_eq!(
            router.route(&d3, MouseMode::Pan),
            vec![MouseIntent::Pan { dx: 0, dy: -3 }]
        );
    }

    #[test]
    fn stationary_press_is_a_click() {
        let mut router = MouseRouter::new();
        let events = vec![
            ev(MouseEventKind::Down(MouseButton::Left), 7, 3),
            ev(MouseEventKind::Up(MouseButton::Left), 7, 3),
        ];
        assert_eq!(
            router.route(&events, MouseMode::Roam),
            vec![MouseIntent::Click { col: 7, row: 3 }]
        );
    }

    #[test]
    fn paint_mode_paints_on_press_and_drag() {
        let mut router = MouseRouter::new();
        let events = vec![
            ev(MouseEventKind::Down(MouseButton::Left), 4, 4),
            ev(MouseEventKind::Drag(MouseButton::Left), 5, 4),
            ev(MouseEventKind::Drag(MouseButton::Left), 6, 5),
        ];
        let intents = router.route(&events, MouseMode::Paint);
        assert_eq!(intents.len(), 3);
        assert!(matches!(intents[0], MouseIntent::Paint { col: 4, row: 4 }));
    }

    #[test]
    fn moves_hover() {
        let mut router = MouseRouter::new();
        let events = vec![ev(MouseEventKind::Moved, 30, 12)];
        assert_eq!(
            router.route(&events, MouseMode::Roam),
            vec![MouseIntent::Hover { col: 30, row: 12 }]
        );
    }
}
