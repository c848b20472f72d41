use super::Point;
use serde::{Deserialize, Serialize};

/// Integer axis-aligned box, `x..x + w` by `y..y + h` (exclusive ends).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x as f64 + 0.5 * self.w as f64,
            self.y as f64 + 0.5 * self.h as f64,
        )
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.w as i64 * self.h as i64
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x1 > x0 && y1 > y0).then(|| Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.x as f64
            && p.x < self.right() as f64
            && p.y >= self.y as f64
            && p.y < self.bottom() as f64
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn grown(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x - dx, self.y - dy, self.w + 2 * dx, self.h + 2 * dy)
    }

    /// Vertical overlap in pixels, negative when the boxes are apart.
    pub fn y_overlap(&self, other: &Rect) -> i32 {
        self.bottom().min(other.bottom()) - self.y.max(other.y)
    }

    /// Horizontal overlap in pixels, negative when the boxes are apart.
    pub fn x_overlap(&self, other: &Rect) -> i32 {
        self.right().min(other.right()) - self.x.max(other.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_negative_for_separated_boxes() {
        let a = Rect::new(0, 0, 4, 10);
        let b = Rect::new(0, 14, 4, 10);
        assert_eq!(a.y_overlap(&b), -4);
        assert!(!a.intersects(&b));
        assert_eq!(a.union(&b), Rect::new(0, 0, 4, 24));
    }

    #[test]
    fn intersection_is_clipped() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 8, 10, 10);
        assert_eq!(a.intersection(&b), Some(Rect::new(5, 8, 5, 2)));
        assert_eq!(a.y_overlap(&b), 2);
    }
}
