/// Fixed symbol → display color table (GitHub contribution-graph hues).
/// The rest of the crate treats this as an opaque lookup and never
/// computes colors itself.

use crate::domain::cell::{Cell, Hue};
use crate::ui::surface::Rgb;

/// Page background behind the grid (the inter-cell gap color).
pub const CANVAS_BG: Rgb = Rgb::new(0x0d, 0x11, 0x17);
/// Unfilled cell.
pub const BACKGROUND: Rgb = Rgb::new(0x16, 0x1b, 0x22);
/// Snake body.
pub const SNAKE: Rgb = Rgb::new(0xc0, 0x84, 0xfc);
/// Text/image marker terrain.
pub const TEXT_MARKER: Rgb = Rgb::new(0x30, 0x36, 0x3d);

const GREENS: [Rgb; 4] = [
    Rgb::new(0x0e, 0x44, 0x29),
    Rgb::new(0x00, 0x6d, 0x32),
    Rgb::new(0x26, 0xa6, 0x41),
    Rgb::new(0x39, 0xd3, 0x53),
];

const BLUES: [Rgb; 4] = [
    Rgb::new(0x0a, 0x30, 0x69),
    Rgb::new(0x09, 0x69, 0xda),
    Rgb::new(0x54, 0xae, 0xff),
    Rgb::new(0xb6, 0xe3, 0xff),
];

const REDS: [Rgb; 4] = [
    Rgb::new(0x4c, 0x00, 0x00),
    Rgb::new(0x80, 0x00, 0x00),
    Rgb::new(0xb3, 0x00, 0x00),
    Rgb::new(0xff, 0x00, 0x00),
];

const ORANGES: [Rgb; 4] = [
    Rgb::new(0x63, 0x1c, 0x03),
    Rgb::new(0xbd, 0x56, 0x1d),
    Rgb::new(0xfa, 0x7a, 0x18),
    Rgb::new(0xfd, 0xdf, 0x68),
];

const PURPLES: [Rgb; 4] = [
    Rgb::new(0x3c, 0x1e, 0x70),
    Rgb::new(0x5e, 0x2c, 0xa5),
    Rgb::new(0x7d, 0x3f, 0xcf),
    Rgb::new(0xa5, 0x6e, 0xff),
];

pub fn color_of(cell: Cell) -> Rgb {
    match cell {
        Cell::Background | Cell::Consumed => BACKGROUND,
        Cell::Shade(hue, level) => {
            let i = (level.clamp(1, 4) - 1) as usize;
            match hue {
                Hue::Green => GREENS[i],
                Hue::Blue => BLUES[i],
                Hue::Red => REDS[i],
                Hue::Orange => ORANGES[i],
                Hue::Purple => PURPLES[i],
            }
        }
        Cell::Black => Rgb::new(0x00, 0x00, 0x00),
        Cell::White => Rgb::new(0xff, 0xff, 0xff),
        Cell::Text => TEXT_MARKER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumed_renders_as_background() {
        assert_eq!(color_of(Cell::Consumed), color_of(Cell::Background));
    }

    #[test]
    fn intensity_levels_differ() {
        let c1 = color_of(Cell::Shade(Hue::Green, 1));
        let c4 = color_of(Cell::Shade(Hue::Green, 4));
        assert_ne!(c1, c4);
    }
}
