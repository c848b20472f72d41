use super::grade::GradeImpacts;
use crate::geometry::{Point, Rect, Segment};
use crate::glyph::GlyphId;
use crate::sheet::{HorizontalSide, VerticalSide};
use serde::{Deserialize, Serialize};

/// Identifier of an interpretation within one system graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterId(pub u32);

/// Note head shapes known to the linker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeadShape {
    Black,
    Void,
    BlackSmall,
    VoidSmall,
    Whole,
}

impl HeadShape {
    pub fn is_small(self) -> bool {
        matches!(self, HeadShape::BlackSmall | HeadShape::VoidSmall)
    }

    pub fn is_void(self) -> bool {
        matches!(self, HeadShape::Void | HeadShape::VoidSmall)
    }

    /// Whether a head of this shape must carry a stem.
    pub fn needs_stem(self) -> bool {
        !matches!(self, HeadShape::Whole)
    }
}

#[derive(Clone, Debug)]
pub struct Head {
    pub shape: HeadShape,
    pub bounds: Rect,
    pub grade: f64,
    pub vip: bool,
    /// Set when a stem was needed but none could be linked.
    pub abnormal: bool,
}

impl Head {
    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    /// Point a stem on side `side` is expected to pass by: the box border
    /// at mid height.
    pub fn stem_ref_point(&self, side: HorizontalSide) -> Point {
        let x = match side {
            HorizontalSide::Left => self.bounds.x as f64,
            HorizontalSide::Right => self.bounds.right() as f64,
        };
        Point::new(x, self.center().y)
    }
}

#[derive(Clone, Debug)]
pub struct Beam {
    /// Median line, left to right.
    pub median: Segment,
    pub height: f64,
    pub grade: f64,
    pub hook: bool,
    /// Beam group identifier.
    pub group: usize,
    /// Identity of the underlying glyph, shared by beams seen from two
    /// systems and by a beam/hook ambiguity.
    pub glyph: Option<u32>,
    pub vip: bool,
}

impl Beam {
    /// Border line on the given side, parallel to the median.
    pub fn border(&self, side: VerticalSide) -> Segment {
        let dy = side.direction() as f64 * 0.5 * self.height;
        Segment::new(
            Point::new(self.median.p1.x, self.median.p1.y + dy),
            Point::new(self.median.p2.x, self.median.p2.y + dy),
        )
    }

    pub fn bounds(&self) -> Rect {
        let top = self.border(VerticalSide::Top).bounds();
        let bottom = self.border(VerticalSide::Bottom).bounds();
        top.union(&bottom)
    }

    pub fn center(&self) -> Point {
        Point::new(
            0.5 * (self.median.p1.x + self.median.p2.x),
            0.5 * (self.median.p1.y + self.median.p2.y),
        )
    }

    pub fn width(&self) -> f64 {
        (self.median.p2 - self.median.p1).norm()
    }

    pub fn left_x(&self) -> f64 {
        self.median.p1.x.min(self.median.p2.x)
    }

    pub fn right_x(&self) -> f64 {
        self.median.p1.x.max(self.median.p2.x)
    }

    /// Whether both beams stand for the same physical glyph.
    pub fn same_glyph(&self, other: &Beam) -> bool {
        matches!((self.glyph, other.glyph), (Some(a), Some(b)) if a == b)
    }

    /// Integer box of the beam slice around abscissa `x`.
    pub fn slice_at(&self, x: f64) -> Rect {
        let y = self.median.y_at_x(x);
        let half = 0.5 * self.height;
        let top = (y - half).floor() as i32;
        let bottom = (y + half).ceil() as i32;
        Rect::new(x.floor() as i32, top, 1, bottom - top)
    }
}

#[derive(Clone, Debug)]
pub struct Stem {
    pub glyph: GlyphId,
    /// Center line, top to bottom.
    pub line: Segment,
    pub bounds: Rect,
    pub grade: f64,
    pub impacts: GradeImpacts,
    /// Created without passing the checks, to support a beam side.
    pub artificial: bool,
}

#[derive(Clone, Debug)]
pub enum InterKind {
    Head(Head),
    Beam(Beam),
    Stem(Stem),
}

#[derive(Clone, Debug)]
pub struct Inter {
    pub id: InterId,
    pub kind: InterKind,
    pub removed: bool,
}

impl Inter {
    pub fn grade(&self) -> f64 {
        match &self.kind {
            InterKind::Head(h) => h.grade,
            InterKind::Beam(b) => b.grade,
            InterKind::Stem(s) => s.grade,
        }
    }

    pub fn is_vip(&self) -> bool {
        match &self.kind {
            InterKind::Head(h) => h.vip,
            InterKind::Beam(b) => b.vip,
            InterKind::Stem(_) => false,
        }
    }

    pub fn bounds(&self) -> Rect {
        match &self.kind {
            InterKind::Head(h) => h.bounds,
            InterKind::Beam(b) => b.bounds(),
            InterKind::Stem(s) => s.bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beam_borders_follow_median() {
        let beam = Beam {
            median: Segment::new(Point::new(10.0, 50.0), Point::new(110.0, 40.0)),
            height: 10.0,
            grade: 0.8,
            hook: false,
            group: 0,
            glyph: None,
            vip: false,
        };
        let top = beam.border(VerticalSide::Top);
        let bottom = beam.border(VerticalSide::Bottom);
        assert_eq!(top.p1.y, 45.0);
        assert_eq!(bottom.p2.y, 45.0);
        let slice = beam.slice_at(60.0);
        assert_eq!(slice.y, 40);
        assert_eq!(slice.bottom(), 50);
    }

    #[test]
    fn head_reference_points_sit_on_box_sides() {
        let head = Head {
            shape: HeadShape::Black,
            bounds: Rect::new(100, 200, 24, 20),
            grade: 0.7,
            vip: false,
            abnormal: false,
        };
        assert_eq!(head.stem_ref_point(HorizontalSide::Left), Point::new(100.0, 210.0));
        assert_eq!(head.stem_ref_point(HorizontalSide::Right), Point::new(124.0, 210.0));
    }
}
