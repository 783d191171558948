/// Events emitted by the simulation and the editor.
/// The compositor consumes these to patch its buffers one cell at a time.

use crate::domain::cell::Cell;

#[derive(Clone, Copy, Debug)]
pub enum SimEvent {
    /// The snake crossed a collectible cell; the grid now holds `Consumed`.
    CellConsumed { x: i32, y: i32 },
    /// The editor wrote `cell` at (x, y).
    CellPainted { x: i32, y: i32, cell: Cell },
}
