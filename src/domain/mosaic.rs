/// Mosaic / icon registry entries: rectangular image hot-zones on the grid.
/// Pure configuration plus point-in-rectangle hit-testing; the image
/// pixels themselves live with the compositor.

use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct MosaicSpec {
    pub image: PathBuf,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Square size in grid cells.
    pub blocks: usize,
    pub tooltip: String,
    pub href: Option<String>,
    /// Solid mosaics mark their cells as text/image terrain so the snake
    /// passes over without eating them.
    pub solid: bool,
}

impl MosaicSpec {
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.offset_x
            && x < self.offset_x + self.blocks as i32
            && y >= self.offset_y
            && y < self.offset_y + self.blocks as i32
    }
}

/// First registry entry covering a world cell, front-to-back.
pub fn hit_test(mosaics: &[MosaicSpec], x: i32, y: i32) -> Option<&MosaicSpec> {
    mosaics.iter().find(|m| m.contains(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(x: i32, y: i32, blocks: usize) -> MosaicSpec {
        MosaicSpec {
            image: PathBuf::from("img.png"),
            offset_x: x,
            offset_y: y,
            blocks,
            tooltip: "tip".to_string(),
            href: None,
            solid: false,
        }
    }

    #[test]
    fn bounding_box_is_half_open() {
        let m = spec(10, 20, 4);
        assert!(m.contains(10, 20));
        assert!(m.contains(13, 23));
        assert!(!m.contains(14, 23));
        assert!(!m.contains(13, 24));
        assert!(!m.contains(9, 20));
    }

    #[test]
    fn hit_test_returns_first_match() {
        let list = vec![spec(0, 0, 8), spec(4, 4, 8)];
        let hit = hit_test(&list, 5, 5).unwrap();
        assert_eq!(hit.offset_x, 0);
        assert!(hit_test(&list, 50, 50).is_none());
    }
}
