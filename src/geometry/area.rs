use super::{Point, Rect, Segment, EPS};

/// Convex polygon used as lookup area. Vertices are kept in drawing order.
#[derive(Clone, Debug, PartialEq)]
pub struct Area {
    vertices: Vec<Point>,
}

impl Area {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Quadrilateral whose top and bottom edges are horizontal-ish lines
    /// `left -> right` offset by `±height / 2`, as used around a beam median.
    pub fn horizontal_parallelogram(left: Point, right: Point, height: f64) -> Self {
        let dy = 0.5 * height;
        Self::new(vec![
            Point::new(left.x, left.y - dy),
            Point::new(right.x, right.y - dy),
            Point::new(right.x, right.y + dy),
            Point::new(left.x, left.y + dy),
        ])
    }

    fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| Segment::new(self.vertices[i], self.vertices[(i + 1) % n]))
    }

    pub fn contains(&self, p: &Point) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        let mut sign = 0.0f64;
        for e in self.edges() {
            let cross = (e.p2.x - e.p1.x) * (p.y - e.p1.y) - (e.p2.y - e.p1.y) * (p.x - e.p1.x);
            if cross.abs() <= EPS {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    /// True when the polygon and the box share some surface.
    pub fn intersects(&self, rect: &Rect) -> bool {
        if rect.is_empty() || self.vertices.len() < 3 {
            return false;
        }
        let bounds = self.bounds();
        if !bounds.grown(1, 1).intersects(rect) {
            return false;
        }
        let (x0, y0) = (rect.x as f64, rect.y as f64);
        let (x1, y1) = (rect.right() as f64, rect.bottom() as f64);
        let corners = [
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ];
        if corners.iter().any(|c| self.contains(c)) {
            return true;
        }
        if self
            .vertices
            .iter()
            .any(|v| v.x > x0 && v.x < x1 && v.y > y0 && v.y < y1)
        {
            return true;
        }
        let sides = [
            Segment::new(corners[0], corners[1]),
            Segment::new(corners[1], corners[2]),
            Segment::new(corners[2], corners[3]),
            Segment::new(corners[3], corners[0]),
        ];
        self.edges().any(|e| sides.iter().any(|s| s.intersects(&e)))
    }

    pub fn bounds(&self) -> Rect {
        let mut x0 = f64::INFINITY;
        let mut y0 = f64::INFINITY;
        let mut x1 = f64::NEG_INFINITY;
        let mut y1 = f64::NEG_INFINITY;
        for v in &self.vertices {
            x0 = x0.min(v.x);
            y0 = y0.min(v.y);
            x1 = x1.max(v.x);
            y1 = y1.max(v.y);
        }
        if !x0.is_finite() {
            return Rect::default();
        }
        let (ix, iy) = (x0.floor() as i32, y0.floor() as i32);
        Rect::new(ix, iy, x1.ceil() as i32 - ix, y1.ceil() as i32 - iy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::pt;

    fn square() -> Area {
        Area::new(vec![
            pt(0.0, 0.0),
            pt(10.0, 0.0),
            pt(10.0, 10.0),
            pt(0.0, 10.0),
        ])
    }

    #[test]
    fn contains_interior_points_only() {
        let a = square();
        assert!(a.contains(&pt(5.0, 5.0)));
        assert!(!a.contains(&pt(11.0, 5.0)));
    }

    #[test]
    fn intersects_overlapping_and_enclosing_boxes() {
        let a = square();
        assert!(a.intersects(&Rect::new(8, 8, 5, 5)));
        assert!(a.intersects(&Rect::new(-5, -5, 30, 30)));
        assert!(!a.intersects(&Rect::new(20, 20, 3, 3)));
    }

    #[test]
    fn slanted_area_rejects_box_inside_its_bounds() {
        let a = Area::new(vec![pt(0.0, 0.0), pt(2.0, 0.0), pt(22.0, 20.0), pt(20.0, 20.0)]);
        assert!(!a.intersects(&Rect::new(0, 15, 3, 3)));
        assert!(a.intersects(&Rect::new(10, 9, 2, 2)));
    }
}
