use crate::geometry::{Point, Segment};

/// Global sheet skew, as the slope `dy/dx` of staff lines.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Skew {
    slope: f64,
    cos: f64,
    sin: f64,
}

impl Skew {
    pub fn new(slope: f64) -> Self {
        let angle = slope.atan();
        Self {
            slope,
            cos: angle.cos(),
            sin: angle.sin(),
        }
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Coordinates in the deskewed frame where staff lines are horizontal.
    pub fn deskewed(&self, p: &Point) -> Point {
        Point::new(
            p.x * self.cos + p.y * self.sin,
            p.y * self.cos - p.x * self.sin,
        )
    }

    /// Line through `p` perpendicular to staff lines.
    pub fn skewed_vertical(&self, p: &Point) -> Segment {
        Segment::new(*p, Point::new(p.x - 100.0 * self.slope, p.y + 100.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deskew_flattens_points_of_a_staff_line() {
        let skew = Skew::new(0.02);
        let a = skew.deskewed(&Point::new(0.0, 10.0));
        let b = skew.deskewed(&Point::new(500.0, 20.0));
        assert!((a.y - b.y).abs() < 1e-9, "dy={}", a.y - b.y);
    }

    #[test]
    fn skewed_vertical_is_perpendicular() {
        let skew = Skew::new(0.05);
        let v = skew.skewed_vertical(&Point::new(10.0, 10.0));
        let d = v.p2 - v.p1;
        let staff = nalgebra::Vector2::new(1.0, 0.05);
        assert!(d.dot(&staff).abs() < 1e-9);
    }
}
