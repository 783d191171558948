/// The step function: advances the world by one tick.
///
/// Per repetition (boost runs `boost_mult` repetitions, else one):
///   1. Pop at most one queued turn into the heading
///   2. Next head = (head + heading) mod (cols, rows)
///   3. Collectible cell there → mark Consumed, emit a patch event,
///      optionally grow
///   4. Push head, trim tail to target_len
/// Then the camera target is recomputed from the final head position.
///
/// Each repetition re-checks the queue, so multiple queued turns can
/// resolve within one boosted timer tick.

use crate::sim::event::SimEvent;
use crate::sim::world::{Phase, WorldState};
use crate::domain::cell::Cell;

pub fn step(world: &mut WorldState) -> Vec<SimEvent> {
    if world.phase != Phase::Roaming || world.paused {
        return vec![];
    }

    let mut events = Vec::new();
    world.tick += 1;

    let reps = if world.snake.boost { world.tuning.boost_mult } else { 1 };
    let cols = world.grid.cols();
    let rows = world.grid.rows();

    for _ in 0..reps {
        let dir = world.snake.take_heading();
        let (hx, hy) = world.snake.head();
        let (nx, ny) = world.grid.wrap(hx + dir.dx, hy + dir.dy);
        let (nx, ny) = (nx as i32, ny as i32);

        if world.grid.get(nx, ny).is_collectible() {
            world.grid.set(nx, ny, Cell::Consumed);
            world.consumed += 1;
            events.push(SimEvent::CellConsumed { x: nx, y: ny });
            if world.tuning.grows_on_eat {
                world.snake.grow(world.tuning.max_len);
            }
        }

        world.snake.advance((nx, ny));
    }

    let (hx, hy) = world.snake.head();
    world.camera.follow(hx, hy, cols, rows, world.tuning.margin);

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::cell::{Cell, Hue};
    use crate::domain::grid::WorldGrid;
    use crate::domain::snake::Dir;

    fn world_500() -> WorldState {
        let cfg = GameConfig::default();
        let mut w = WorldState::new(WorldGrid::new(500, 500), &cfg);
        w.phase = Phase::Roaming;
        w
    }

    #[test]
    fn twenty_ticks_reach_and_consume_a_cell() {
        let mut w = world_500();
        w.grid.set(250, 270, Cell::Shade(Hue::Green, 2));
        w.snake.heading = Dir::DOWN;

        let mut consumed_events = 0;
        for _ in 0..20 {
            consumed_events += step(&mut w).len();
        }

        assert_eq!(w.snake.head(), (250, 270));
        assert_eq!(w.grid.get(250, 270), Cell::Consumed);
        assert_eq!(consumed_events, 1);
        assert_eq!(w.consumed, 1);
        // Everything else untouched
        assert_eq!(w.grid.get(250, 271), Cell::Background);
        assert_eq!(w.grid.get(250, 250), Cell::Background);
    }

    #[test]
    fn boost_advances_multiple_cells_per_tick() {
        let mut w = world_500();
        w.snake.boost = true;
        let (x0, y0) = w.snake.head();
        step(&mut w);
        assert_eq!(w.snake.head(), (x0 + 3, y0));
    }

    #[test]
    fn queued_turns_resolve_within_one_boosted_tick() {
        let mut w = world_500();
        w.snake.boost = true;
        w.snake.push_dir(Dir::DOWN);
        w.snake.push_dir(Dir::RIGHT);
        let (x0, y0) = w.snake.head();
        step(&mut w);
        // rep 1: Down, rep 2: Right, rep 3: Right (queue empty)
        assert_eq!(w.snake.head(), (x0 + 2, y0 + 1));
    }

    #[test]
    fn head_wraps_across_both_borders() {
        let mut w = world_500();
        w.snake.heading = Dir::LEFT;
        for _ in 0..251 {
            step(&mut w);
        }
        assert_eq!(w.snake.head(), (499, 250));
    }

    #[test]
    fn consumed_cells_are_not_re_eaten() {
        let mut w = world_500();
        w.grid.set(251, 250, Cell::Shade(Hue::Green, 4));
        step(&mut w);
        assert_eq!(w.consumed, 1);
        // Come back around the torus to the same cell
        for _ in 0..500 {
            step(&mut w);
        }
        assert_eq!(w.snake.head(), (251, 250));
        assert_eq!(w.consumed, 1, "consumed cell must not be eaten twice");
    }

    #[test]
    fn text_cells_are_passed_over() {
        let mut w = world_500();
        w.grid.set(251, 250, Cell::Text);
        assert!(step(&mut w).is_empty());
        assert_eq!(w.snake.head(), (251, 250));
        assert_eq!(w.grid.get(251, 250), Cell::Text);
        assert_eq!(w.consumed, 0);
    }

    #[test]
    fn growth_on_eat_raises_target_len() {
        let mut w = world_500();
        w.tuning.grows_on_eat = true;
        let before = w.snake.target_len;
        w.grid.set(251, 250, Cell::Shade(Hue::Blue, 1));
        step(&mut w);
        assert_eq!(w.snake.target_len, before + 1);
    }

    #[test]
    fn suspended_world_does_not_move() {
        let mut w = world_500();
        w.paused = true;
        let head = w.snake.head();
        assert!(step(&mut w).is_empty());
        assert_eq!(w.snake.head(), head);
        assert_eq!(w.tick, 0);
    }
}
