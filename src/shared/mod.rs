//! Shared geometry types
//!
//! Rectangles used by the menu layout, navigation and the X11 backend.

/// Rectangle in root-window coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (exclusive)
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Bottom edge (exclusive)
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Whether a point lies strictly inside the rectangle.
    ///
    /// The outermost pixel row/column counts as outside, so a pointer resting
    /// on the frame of a menu is not over any item.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x > self.x && y > self.y && x < self.right() && y < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_excludes_edges() {
        let g = Geometry::new(10, 20, 100, 50);
        assert!(g.contains(11, 21));
        assert!(g.contains(109, 69));
        assert!(!g.contains(10, 40));
        assert!(!g.contains(110, 40));
        assert!(!g.contains(50, 70));
        assert_eq!(g.right(), 110);
        assert_eq!(g.bottom(), 70);
    }
}
