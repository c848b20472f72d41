use super::section::{Section, SectionId};
use crate::geometry::{Area, Point, Rect, Segment};
use serde::{Deserialize, Serialize};

/// Identifier of a registered glyph within one system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlyphId(pub u32);

/// Immutable ink blob made of sections.
#[derive(Clone, Debug)]
pub struct Glyph {
    pub id: GlyphId,
    sections: Vec<SectionId>,
    bounds: Rect,
    weight: i32,
    centroid: Point,
    line: Segment,
    mean_distance: f64,
}

impl Glyph {
    /// Compute glyph attributes from its member sections (sorted by id).
    pub(crate) fn from_sections(id: GlyphId, members: &[&Section]) -> Self {
        let mut bounds = Rect::default();
        let mut n = 0.0f64;
        let (mut sx, mut sy, mut syy, mut sxy) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for s in members {
            bounds = bounds.union(&s.bounds());
            for (x, run) in s.columns() {
                let len = run.len as f64;
                let y0 = run.start as f64;
                let y1 = (run.end() - 1) as f64;
                let sum_y = 0.5 * len * (y0 + y1);
                // Sum of squares of start..=end-1
                let sum_yy = sum_sq(y1) - sum_sq(y0 - 1.0);
                n += len;
                sx += x as f64 * len;
                sy += sum_y;
                syy += sum_yy;
                sxy += x as f64 * sum_y;
            }
        }
        let mut ids: Vec<SectionId> = members.iter().map(|s| s.id).collect();
        ids.sort();
        ids.dedup();

        let (mx, my) = if n > 0.0 { (sx / n, sy / n) } else { (0.0, 0.0) };
        let var_y = if n > 0.0 { syy / n - my * my } else { 0.0 };
        // Fit x = a * y + b
        let a = if var_y > 1e-9 {
            (sxy / n - mx * my) / var_y
        } else {
            0.0
        };
        let b = mx - a * my;
        let top = bounds.y as f64;
        let bottom = bounds.bottom() as f64;
        let line = Segment::new(Point::new(a * top + b, top), Point::new(a * bottom + b, bottom));

        let mut dist = 0.0f64;
        for s in members {
            for (x, run) in s.columns() {
                for y in run.start..run.end() {
                    dist += (x as f64 - (a * y as f64 + b)).abs();
                }
            }
        }

        Self {
            id,
            sections: ids,
            bounds,
            weight: n as i32,
            centroid: Point::new(mx, my),
            line,
            mean_distance: if n > 0.0 { dist / n } else { 0.0 },
        }
    }

    pub fn sections(&self) -> &[SectionId] {
        &self.sections
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    pub fn centroid(&self) -> Point {
        self.centroid
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    pub fn height(&self) -> i32 {
        self.bounds.h
    }

    /// Fitted center line from the top border to the (exclusive) bottom border.
    pub fn center_line(&self) -> Segment {
        self.line
    }

    /// Mean horizontal distance of pixels to the center line.
    pub fn mean_distance(&self) -> f64 {
        self.mean_distance
    }

    /// Weight divided by height.
    pub fn mean_thickness(&self) -> f64 {
        if self.bounds.h > 0 {
            self.weight as f64 / self.bounds.h as f64
        } else {
            0.0
        }
    }

    pub fn intersects(&self, area: &Area) -> bool {
        area.intersects(&self.bounds)
    }
}

fn sum_sq(k: f64) -> f64 {
    // 0^2 + 1^2 + ... + k^2 for integer k >= -1
    if k < 0.0 {
        0.0
    } else {
        k * (k + 1.0) * (2.0 * k + 1.0) / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::section::Run;

    fn column_section(id: u32, x: i32, start: i32, len: i32, width: usize) -> Section {
        Section::new(SectionId(id), x, vec![Run { start, len }; width])
    }

    #[test]
    fn vertical_bar_has_vertical_center_line() {
        let s = column_section(0, 10, 5, 40, 3);
        let g = Glyph::from_sections(GlyphId(0), &[&s]);
        let line = g.center_line();
        assert!((line.p1.x - 11.0).abs() < 1e-9);
        assert!((line.p2.x - 11.0).abs() < 1e-9);
        assert_eq!(line.p1.y, 5.0);
        assert_eq!(line.p2.y, 45.0);
        assert_eq!(g.weight(), 120);
        assert!((g.mean_distance() - 2.0 / 3.0).abs() < 1e-9);
        assert!((g.mean_thickness() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn slanted_stack_fits_slope() {
        // One pixel wide runs drifting one column every 10 rows
        let sections: Vec<Section> = (0..4)
            .map(|i| column_section(i, 10 + i as i32, 10 * i as i32, 10, 1))
            .collect();
        let refs: Vec<&Section> = sections.iter().collect();
        let g = Glyph::from_sections(GlyphId(1), &refs);
        let inv = g.center_line().inverted_slope();
        assert!(inv > 0.08 && inv < 0.12, "inverted slope {inv}");
    }
}
