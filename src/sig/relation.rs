//! Typed relations and their geometric checks.
//!
//! Every check measures a horizontal and a vertical gap between the two
//! partners and maps them to a grade with
//! `sqrt((1 - dx / dxMax) * (1 - dy / dyMax))`, zero beyond either bound.
//! Maxima are interline fractions that loosen with the profile.

use super::inter::{Beam, Head};
use crate::geometry::{Point, Rect, Segment};
use crate::sheet::{HorizontalSide, Profile, Profiled, Scale, VerticalSide};
use serde::Serialize;

/// Relations graded below this value are not created.
pub const MIN_RELATION_GRADE: f64 = 0.1;

/// Where a head sits along its stem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StemPortion {
    /// Head at the top end of the stem, stem going down.
    Top,
    Middle,
    /// Head at the bottom end of the stem, stem going up.
    Bottom,
}

/// Where a stem hits its beam.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BeamPortion {
    Left,
    Center,
    Right,
}

impl BeamPortion {
    pub fn side(self) -> Option<HorizontalSide> {
        match self {
            BeamPortion::Left => Some(HorizontalSide::Left),
            BeamPortion::Right => Some(HorizontalSide::Right),
            BeamPortion::Center => None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadStemRelation {
    pub head_side: HorizontalSide,
    pub portion: StemPortion,
    /// Point the stem must reach to cover the head.
    pub ext: [f64; 2],
    /// Positive when the stem lies outside the head, in pixels.
    pub x_gap: f64,
    pub y_gap: f64,
    pub grade: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamStemRelation {
    pub portion: BeamPortion,
    /// Point where the stem ends within the beam.
    pub ext: [f64; 2],
    /// Positive when the stem lies beyond the beam end, in pixels.
    pub x_gap: f64,
    pub y_gap: f64,
    pub grade: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamHeadRelation {
    pub grade: f64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Relation {
    HeadStem(HeadStemRelation),
    BeamStem(BeamStemRelation),
    BeamHead(BeamHeadRelation),
    Exclusion,
}

impl Relation {
    pub fn grade(&self) -> f64 {
        match self {
            Relation::HeadStem(r) => r.grade,
            Relation::BeamStem(r) => r.grade,
            Relation::BeamHead(r) => r.grade,
            Relation::Exclusion => 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Relation::HeadStem(_) => "headStem",
            Relation::BeamStem(_) => "beamStem",
            Relation::BeamHead(_) => "beamHead",
            Relation::Exclusion => "exclusion",
        }
    }
}

/// Interline fractions driving head/stem checks.
#[derive(Clone, Debug)]
pub struct HeadStemConstants {
    pub x_in_gap_max: Profiled<f64>,
    pub x_out_gap_max: Profiled<f64>,
    pub y_gap_max: Profiled<f64>,
    /// Margin around the head center, as ratio of head height, used to
    /// classify the stem portion.
    pub anchor_height_ratio: f64,
    pub head_support_coeff: f64,
    pub stem_support_coeff: f64,
}

impl Default for HeadStemConstants {
    fn default() -> Self {
        Self {
            x_in_gap_max: Profiled::new(0.2).with(Profile::STANDARD, 0.4),
            x_out_gap_max: Profiled::new(0.15)
                .with(Profile::STANDARD, 0.25)
                .with(Profile::POOR, 0.35),
            y_gap_max: Profiled::new(0.8).with(Profile::STANDARD, 1.2),
            anchor_height_ratio: 0.275,
            head_support_coeff: 4.0,
            stem_support_coeff: 10.0,
        }
    }
}

/// Interline fractions driving beam/stem checks.
#[derive(Clone, Debug)]
pub struct BeamStemConstants {
    pub x_in_gap_max: Profiled<f64>,
    pub x_out_gap_max: Profiled<f64>,
    pub y_gap_max: Profiled<f64>,
    pub side_portion_width: f64,
    pub beam_support_coeff: f64,
    pub stem_support_coeff: f64,
}

impl Default for BeamStemConstants {
    fn default() -> Self {
        Self {
            x_in_gap_max: Profiled::new(1.0),
            x_out_gap_max: Profiled::new(0.15)
                .with(Profile::STANDARD, 0.25)
                .with(Profile::POOR, 0.35),
            y_gap_max: Profiled::new(0.5)
                .with(Profile::STANDARD, 0.8)
                .with(Profile::POOR, 1.2),
            side_portion_width: 0.3,
            beam_support_coeff: 4.0,
            stem_support_coeff: 5.0,
        }
    }
}

/// Grade from horizontal and vertical gaps against their maxima.
pub fn gap_grade(dx: f64, dx_max: f64, dy: f64, dy_max: f64) -> f64 {
    if dx_max <= 0.0 || dy_max <= 0.0 || dx >= dx_max || dy >= dy_max {
        return 0.0;
    }
    ((1.0 - dx / dx_max) * (1.0 - dy / dy_max)).sqrt()
}

/// Stem portion the head occupies.
pub fn stem_portion(head: &Head, stem_line: &Segment, anchor_height_ratio: f64) -> StemPortion {
    let margin = head.bounds.h as f64 * anchor_height_ratio;
    let y_mid = head.center().y;
    if stem_line.min_y() >= y_mid - margin {
        StemPortion::Top
    } else if stem_line.max_y() <= y_mid + margin {
        StemPortion::Bottom
    } else {
        StemPortion::Middle
    }
}

impl HeadStemRelation {
    /// Check the connection between `head` (on its `side`) and a stem.
    pub fn check(
        head: &Head,
        side: HorizontalSide,
        stem_line: &Segment,
        stem_bounds: &Rect,
        scale: &Scale,
        constants: &HeadStemConstants,
        profile: Profile,
    ) -> Option<Self> {
        let center = head.center();
        let ref_pt = head.stem_ref_point(side);
        let x_stem = stem_line.x_at_y(center.y);
        let x_gap = side.direction() as f64 * (x_stem - ref_pt.x);
        let dx_max = if x_gap > 0.0 {
            scale.to_pixels_f(constants.x_out_gap_max.get(profile))
        } else {
            scale.to_pixels_f(constants.x_in_gap_max.get(profile))
        };
        let y_gap = (-stem_bounds.y_overlap(&head.bounds)).max(0) as f64;
        let dy_max = scale.to_pixels_f(constants.y_gap_max.get(profile));
        let grade = gap_grade(x_gap.abs(), dx_max, y_gap, dy_max);
        if grade < MIN_RELATION_GRADE {
            return None;
        }
        let portion = stem_portion(head, stem_line, constants.anchor_height_ratio);
        let ext_y = match portion {
            StemPortion::Top => head.bounds.y as f64,
            StemPortion::Bottom => (head.bounds.bottom() - 1) as f64,
            StemPortion::Middle => center.y,
        };
        Some(Self {
            head_side: side,
            portion,
            ext: [x_stem, ext_y],
            x_gap,
            y_gap,
            grade,
        })
    }

    /// Contribution brought by a stem of grade `stem_grade` to the head.
    pub fn head_support(&self, stem_grade: f64, constants: &HeadStemConstants) -> f64 {
        super::grade::support(stem_grade, constants.head_support_coeff, self.grade)
    }

    /// Contribution of this relation from the stem point of view.
    pub fn stem_contribution(&self, stem_grade: f64, constants: &HeadStemConstants) -> f64 {
        super::grade::support(stem_grade, constants.stem_support_coeff, self.grade)
    }
}

/// Two stems sharing a head the canonical way: a stem going down on the
/// left and a stem going up on the right.
pub fn is_canonical_share(
    head: &Head,
    left: (&HeadStemRelation, &Segment),
    right: (&HeadStemRelation, &Segment),
) -> bool {
    let y = head.center().y;
    left.0.head_side == HorizontalSide::Left
        && right.0.head_side == HorizontalSide::Right
        && left.0.portion == StemPortion::Top
        && right.0.portion == StemPortion::Bottom
        && y < left.1.mid_y()
        && y > right.1.mid_y()
}

impl BeamStemRelation {
    /// Check the connection between `beam` and a stem whose tail goes in
    /// direction `y_dir` away from the beam.
    pub fn check(
        beam: &Beam,
        stem_line: &Segment,
        stem_bounds: &Rect,
        y_dir: i32,
        scale: &Scale,
        constants: &BeamStemConstants,
        profile: Profile,
    ) -> Option<Self> {
        let cross = stem_line.intersection(&beam.median)?;
        let portion = beam_portion(beam, cross.x, scale, constants);
        let x_gap = match portion {
            BeamPortion::Left => beam.left_x() - cross.x,
            BeamPortion::Right => cross.x - beam.right_x(),
            BeamPortion::Center => 0.0,
        };
        let dx_max = if x_gap > 0.0 {
            scale.to_pixels_f(constants.x_out_gap_max.get(profile))
        } else {
            scale.to_pixels_f(constants.x_in_gap_max.get(profile))
        };
        let border_y = beam.border(VerticalSide::of(y_dir)).y_at_x(cross.x);
        let y_gap = if y_dir > 0 {
            stem_bounds.y as f64 - border_y
        } else {
            border_y - stem_bounds.bottom() as f64
        }
        .max(0.0);
        let dy_max = scale.to_pixels_f(constants.y_gap_max.get(profile));
        let grade = gap_grade(x_gap.abs(), dx_max, y_gap, dy_max);
        if grade < MIN_RELATION_GRADE {
            return None;
        }
        Some(Self {
            portion,
            ext: far_border_point(beam, cross, y_dir),
            x_gap,
            y_gap,
            grade,
        })
    }

    /// Relation given to a sibling beam crossed by an already linked stem.
    pub fn sibling(
        beam: &Beam,
        stem_line: &Segment,
        y_dir: i32,
        grade: f64,
        scale: &Scale,
        constants: &BeamStemConstants,
    ) -> Option<Self> {
        let cross = stem_line.intersection(&beam.median)?;
        if cross.x < beam.left_x() - 1.0 || cross.x > beam.right_x() + 1.0 {
            return None;
        }
        Some(Self {
            portion: beam_portion(beam, cross.x, scale, constants),
            ext: far_border_point(beam, cross, y_dir),
            x_gap: 0.0,
            y_gap: 0.0,
            grade,
        })
    }
}

pub fn beam_portion(beam: &Beam, x: f64, scale: &Scale, constants: &BeamStemConstants) -> BeamPortion {
    let side_width = scale.to_pixels_f(constants.side_portion_width);
    if x < beam.left_x() + side_width {
        BeamPortion::Left
    } else if x > beam.right_x() - side_width {
        BeamPortion::Right
    } else {
        BeamPortion::Center
    }
}

fn far_border_point(beam: &Beam, cross: Point, y_dir: i32) -> [f64; 2] {
    [cross.x, cross.y - y_dir as f64 * 0.5 * beam.height]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sig::HeadShape;

    fn head() -> Head {
        Head {
            shape: HeadShape::Black,
            bounds: Rect::new(100, 200, 24, 20),
            grade: 0.7,
            vip: false,
            abnormal: false,
        }
    }

    fn beam() -> Beam {
        Beam {
            median: Segment::new(Point::new(100.0, 100.0), Point::new(200.0, 100.0)),
            height: 10.0,
            grade: 0.8,
            hook: false,
            group: 0,
            glyph: None,
            vip: false,
        }
    }

    fn vertical(x: f64, top: f64, bottom: f64) -> (Segment, Rect) {
        let line = Segment::new(Point::new(x, top), Point::new(x, bottom));
        let rect = Rect::new((x - 1.5) as i32, top as i32, 3, (bottom - top) as i32);
        (line, rect)
    }

    #[test]
    fn stem_down_on_left_is_top_portion() {
        let scale = Scale::default();
        let constants = HeadStemConstants::default();
        let (line, rect) = vertical(99.5, 205.0, 270.0);
        let rel = HeadStemRelation::check(
            &head(),
            HorizontalSide::Left,
            &line,
            &rect,
            &scale,
            &constants,
            Profile::STANDARD,
        )
        .expect("relation");
        assert_eq!(rel.portion, StemPortion::Top);
        assert_eq!(rel.y_gap, 0.0);
        assert!(rel.x_gap > 0.0 && rel.grade > 0.8);
        assert_eq!(rel.ext[1], 200.0);
    }

    #[test]
    fn far_stem_is_rejected() {
        let scale = Scale::default();
        let constants = HeadStemConstants::default();
        let (line, rect) = vertical(90.0, 205.0, 270.0);
        assert!(HeadStemRelation::check(
            &head(),
            HorizontalSide::Left,
            &line,
            &rect,
            &scale,
            &constants,
            Profile::POOR,
        )
        .is_none());
    }

    #[test]
    fn canonical_share_needs_down_left_and_up_right() {
        let scale = Scale::default();
        let constants = HeadStemConstants::default();
        let h = head();
        let (down, down_box) = vertical(99.5, 205.0, 270.0);
        let (up, up_box) = vertical(124.5, 140.0, 215.0);
        let left = HeadStemRelation::check(
            &h,
            HorizontalSide::Left,
            &down,
            &down_box,
            &scale,
            &constants,
            Profile::STANDARD,
        )
        .expect("left");
        let right = HeadStemRelation::check(
            &h,
            HorizontalSide::Right,
            &up,
            &up_box,
            &scale,
            &constants,
            Profile::STANDARD,
        )
        .expect("right");
        assert_eq!(right.portion, StemPortion::Bottom);
        assert!(is_canonical_share(&h, (&left, &down), (&right, &up)));
        assert!(!is_canonical_share(&h, (&right, &up), (&left, &down)));
    }

    #[test]
    fn beam_portions_and_gaps() {
        let scale = Scale::default();
        let constants = BeamStemConstants::default();
        let b = beam();
        let (line, rect) = vertical(101.0, 95.0, 170.0);
        let rel =
            BeamStemRelation::check(&b, &line, &rect, 1, &scale, &constants, Profile::STRICT)
                .expect("left relation");
        assert_eq!(rel.portion, BeamPortion::Left);
        assert_eq!(rel.y_gap, 0.0);
        assert_eq!(rel.ext, [101.0, 95.0]);

        let (line, rect) = vertical(150.0, 112.0, 170.0);
        let rel =
            BeamStemRelation::check(&b, &line, &rect, 1, &scale, &constants, Profile::POOR)
                .expect("center relation");
        assert_eq!(rel.portion, BeamPortion::Center);
        assert_eq!(rel.y_gap, 7.0);

        let (line, rect) = vertical(150.0, 130.0, 170.0);
        assert!(
            BeamStemRelation::check(&b, &line, &rect, 1, &scale, &constants, Profile::POOR)
                .is_none()
        );
    }
}
