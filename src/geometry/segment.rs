use super::{Point, Rect, EPS};
use nalgebra::Vector3;

/// Finite line segment, usually oriented from top to bottom for stems and
/// from left to right for beams.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub p1: Point,
    pub p2: Point,
}

impl Segment {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    /// Degenerate segment reduced to a single point.
    pub fn at(p: Point) -> Self {
        Self { p1: p, p2: p }
    }

    /// Homogeneous line `(a, b, c)` through both endpoints.
    pub fn homogeneous(&self) -> Vector3<f64> {
        let a = Vector3::new(self.p1.x, self.p1.y, 1.0);
        let b = Vector3::new(self.p2.x, self.p2.y, 1.0);
        a.cross(&b)
    }

    /// Intersection of the infinite lines supporting both segments.
    pub fn intersection(&self, other: &Segment) -> Option<Point> {
        let h = self.homogeneous().cross(&other.homogeneous());
        if h.z.abs() <= EPS {
            return None;
        }
        let p = Point::new(h.x / h.z, h.y / h.z);
        (p.x.is_finite() && p.y.is_finite()).then_some(p)
    }

    /// True when the two finite segments cross or touch.
    pub fn intersects(&self, other: &Segment) -> bool {
        let d1 = orient(&other.p1, &other.p2, &self.p1);
        let d2 = orient(&other.p1, &other.p2, &self.p2);
        let d3 = orient(&self.p1, &self.p2, &other.p1);
        let d4 = orient(&self.p1, &self.p2, &other.p2);
        if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
            && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
        {
            return true;
        }
        (d1.abs() <= EPS && on_segment(&other.p1, &other.p2, &self.p1))
            || (d2.abs() <= EPS && on_segment(&other.p1, &other.p2, &self.p2))
            || (d3.abs() <= EPS && on_segment(&self.p1, &self.p2, &other.p1))
            || (d4.abs() <= EPS && on_segment(&self.p1, &self.p2, &other.p2))
    }

    /// Abscissa of the supporting line at ordinate `y`.
    pub fn x_at_y(&self, y: f64) -> f64 {
        let dy = self.p2.y - self.p1.y;
        if dy.abs() <= EPS {
            return self.p1.x;
        }
        self.p1.x + (y - self.p1.y) * (self.p2.x - self.p1.x) / dy
    }

    /// Ordinate of the supporting line at abscissa `x`.
    pub fn y_at_x(&self, x: f64) -> f64 {
        let dx = self.p2.x - self.p1.x;
        if dx.abs() <= EPS {
            return self.p1.y;
        }
        self.p1.y + (x - self.p1.x) * (self.p2.y - self.p1.y) / dx
    }

    /// Point of the supporting line at abscissa `x`.
    pub fn point_at_x(&self, x: f64) -> Point {
        Point::new(x, self.y_at_x(x))
    }

    /// `dx/dy`, NaN for a horizontal segment.
    pub fn inverted_slope(&self) -> f64 {
        let dy = self.p2.y - self.p1.y;
        if dy.abs() <= EPS {
            return f64::NAN;
        }
        (self.p2.x - self.p1.x) / dy
    }

    /// `dy/dx`, NaN for a vertical segment.
    pub fn slope(&self) -> f64 {
        let dx = self.p2.x - self.p1.x;
        if dx.abs() <= EPS {
            return f64::NAN;
        }
        (self.p2.y - self.p1.y) / dx
    }

    /// Distance from `p` to the infinite supporting line.
    pub fn line_distance(&self, p: &Point) -> f64 {
        let l = self.homogeneous();
        let norm = (l.x * l.x + l.y * l.y).sqrt();
        if norm <= EPS {
            return (p - self.p1).norm();
        }
        (l.x * p.x + l.y * p.y + l.z).abs() / norm
    }

    pub fn min_y(&self) -> f64 {
        self.p1.y.min(self.p2.y)
    }

    pub fn max_y(&self) -> f64 {
        self.p1.y.max(self.p2.y)
    }

    pub fn mid_y(&self) -> f64 {
        0.5 * (self.p1.y + self.p2.y)
    }

    /// Smallest integer box containing both endpoints.
    pub fn bounds(&self) -> Rect {
        let x0 = self.p1.x.min(self.p2.x).floor() as i32;
        let y0 = self.p1.y.min(self.p2.y).floor() as i32;
        let x1 = self.p1.x.max(self.p2.x).ceil() as i32;
        let y1 = self.p1.y.max(self.p2.y).ceil() as i32;
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

fn orient(a: &Point, b: &Point, c: &Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: &Point, b: &Point, p: &Point) -> bool {
    p.x >= a.x.min(b.x) - EPS
        && p.x <= a.x.max(b.x) + EPS
        && p.y >= a.y.min(b.y) - EPS
        && p.y <= a.y.max(b.y) + EPS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::pt;

    #[test]
    fn crossing_lines_meet_at_expected_point() {
        let v = Segment::new(pt(10.0, 0.0), pt(10.0, 50.0));
        let h = Segment::new(pt(0.0, 20.0), pt(40.0, 30.0));
        let p = v.intersection(&h).expect("lines are not parallel");
        assert!((p.x - 10.0).abs() < 1e-9);
        assert!((p.y - 22.5).abs() < 1e-9, "unexpected y {}", p.y);
    }

    #[test]
    fn parallel_lines_have_no_intersection() {
        let a = Segment::new(pt(0.0, 0.0), pt(0.0, 10.0));
        let b = Segment::new(pt(3.0, 0.0), pt(3.0, 10.0));
        assert!(a.intersection(&b).is_none());
        assert!(!a.intersects(&b));
    }

    #[test]
    fn finite_intersection_respects_extent() {
        let v = Segment::new(pt(10.0, 0.0), pt(10.0, 5.0));
        let h = Segment::new(pt(0.0, 20.0), pt(40.0, 20.0));
        assert!(!v.intersects(&h));
        let longer = Segment::new(pt(10.0, 0.0), pt(10.0, 25.0));
        assert!(longer.intersects(&h));
    }

    #[test]
    fn abscissa_follows_slanted_line() {
        let s = Segment::new(pt(0.0, 0.0), pt(5.0, 100.0));
        assert!((s.x_at_y(50.0) - 2.5).abs() < 1e-9);
        assert!((s.inverted_slope() - 0.05).abs() < 1e-9);
        assert!(s.line_distance(&pt(0.0, 100.0)) > 4.9);
    }
}
