//! Linking constants.
//!
//! [`Constants`] lists every geometric threshold as a fraction of the
//! interline, deserializable from the tool configuration. [`Parameters`]
//! holds the same values resolved to pixels for one sheet scale.

use crate::sheet::{Profile, Profiled, Scale};
use crate::sig::relation::{BeamStemConstants, HeadStemConstants};
use serde::{Deserialize, Serialize};

/// Interline fractions (unless stated otherwise) driving the stem linker.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Constants {
    /// Margin around a box when looking for neighbors.
    pub vicinity_margin: f64,
    /// Slope margin on both sides of a lookup area (tangent).
    pub slope_margin: f64,
    /// Maximum overlap ratio between a seed and a no-stem area.
    pub max_bar_overlap: f64,
    /// Maximum abscissa distance between aligned beam sides.
    pub max_beam_side_dx: f64,
    /// Maximum ordinate distance between beams of one group.
    pub max_beam_group_dy: f64,
    /// Minimum ordinate distance between a head and a beam.
    pub min_beam_head_dy: f64,
    /// Maximum abscissa distance to reuse an existing beam anchor.
    pub max_beam_linker_dx: f64,
    /// Half width of a beam lookup area.
    pub half_beam_lu_dx: f64,
    /// Minimum contribution of a seed beyond a beam border to be a stump.
    pub min_seed_contrib: f64,
    /// Abscissa margin of a beam seed area.
    pub max_beam_seed_dx: f64,
    /// Ratio applied to the beam/stem vertical gap for the seed area (ratio).
    pub max_beam_seed_dy_ratio: f64,
    /// Minimum abscissa distance between two stems of one beam.
    pub min_beam_stems_dx: f64,
    /// Minimum protrusion of a stump beyond its beam group.
    pub min_beam_stump_dy: f64,
    /// Maximum distance between a seed and the theoretical line.
    pub max_line_seed_dx: f64,
    /// Maximum distance between a section and the theoretical line.
    pub max_line_section_dx: f64,
    /// Maximum deskewed abscissa shift between aligned glyphs.
    pub max_stem_alignment_dx: f64,
    /// Ordinate distance above which alignment is not checked.
    pub max_stem_alignment_dy: f64,
    /// Minimum ordinate distance between two heads on one stem.
    pub min_head_head_dy: f64,
    /// Backward ordinate margin of a head lookup area.
    pub max_head_seed_dy: f64,
    /// Half height of a beam side stump area.
    pub stump_area_dy_half: f64,
    /// Inner abscissa margin of a beam side stump area.
    pub stump_area_dx_in: f64,
    /// Outer abscissa margin of a beam side stump area.
    pub stump_area_dx_out: f64,
    /// Minimum stem length for an anchor to count as concretely started.
    pub min_linker_length: f64,
    /// Grade given to a stem built on a beam side without passing checks (grade).
    pub artificial_stem_grade: f64,
    /// Stem length from head center below which a head link fails.
    pub min_stem_tail: f64,
    /// Stem length from head center a head link tries to reach.
    pub best_stem_tail: f64,
    /// Junction ratio between run lengths of consecutive section columns (ratio).
    pub max_section_length_ratio: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            vicinity_margin: 1.0,
            slope_margin: 0.015,
            max_bar_overlap: 0.25,
            max_beam_side_dx: 0.25,
            max_beam_group_dy: 5.0,
            min_beam_head_dy: 1.0,
            max_beam_linker_dx: 0.25,
            half_beam_lu_dx: 0.3,
            min_seed_contrib: 0.5,
            max_beam_seed_dx: 0.1,
            max_beam_seed_dy_ratio: 0.5,
            min_beam_stems_dx: 1.0,
            min_beam_stump_dy: 0.5,
            max_line_seed_dx: 0.15,
            max_line_section_dx: 0.3,
            max_stem_alignment_dx: 0.15,
            max_stem_alignment_dy: 4.0,
            min_head_head_dy: 0.25,
            max_head_seed_dy: 0.25,
            stump_area_dy_half: 0.2,
            stump_area_dx_in: 0.1,
            stump_area_dx_out: 0.1,
            min_linker_length: 0.85,
            artificial_stem_grade: 0.4,
            min_stem_tail: 2.0,
            best_stem_tail: 2.5,
            max_section_length_ratio: 2.0,
        }
    }
}

impl Constants {
    /// Maximum vertical gap tolerated within a stem, per profile.
    pub fn max_y_gap() -> Profiled<f64> {
        Profiled::new(0.0)
            .with(Profile::STANDARD, 0.3)
            .with(Profile::POOR, 0.6)
            .with(Profile::BEAM_SEED, 2.0)
            .with(Profile::BEAM_SIDE, 4.0)
    }
}

/// Linking constants resolved to pixels (slopes and ratios unchanged).
#[derive(Clone, Debug)]
pub struct Parameters {
    pub vicinity_margin: i32,
    pub slope_margin: f64,
    pub max_bar_overlap: f64,
    pub max_beam_side_dx: f64,
    pub max_beam_group_dy: f64,
    pub min_beam_head_dy: f64,
    pub max_beam_linker_dx: f64,
    pub half_beam_lu_dx: f64,
    pub min_seed_contrib: f64,
    pub max_beam_seed_dx: f64,
    pub max_beam_seed_dy_ratio: f64,
    pub min_beam_stems_dx: f64,
    pub min_beam_stump_dy: f64,
    pub max_line_seed_dx: f64,
    pub max_line_section_dx: f64,
    pub max_stem_alignment_dx: f64,
    pub max_stem_alignment_dy: f64,
    pub min_head_head_dy: f64,
    pub max_head_seed_dy: f64,
    pub stump_area_dy_half: f64,
    pub stump_area_dx_in: f64,
    pub stump_area_dx_out: f64,
    pub min_linker_length: f64,
    pub artificial_stem_grade: f64,
    pub min_stem_tail: f64,
    pub best_stem_tail: f64,
    pub max_section_length_ratio: f64,
    pub main_stem_thickness: i32,
    pub max_stem_thickness: i32,
    /// Tolerated gap in pixels per profile.
    pub max_y_gap: Profiled<f64>,
    /// Head lookup half widths, outside and inside the head, in pixels.
    pub max_head_out_dx: f64,
    pub max_head_in_dx: f64,
    pub head_stem: HeadStemConstants,
    pub beam_stem: BeamStemConstants,
}

impl Parameters {
    pub fn new(constants: &Constants, scale: &Scale) -> Self {
        let px = |frac: f64| scale.to_pixels_f(frac);
        let head_stem = HeadStemConstants::default();
        let beam_stem = BeamStemConstants::default();
        let fractions = Constants::max_y_gap();
        let mut max_y_gap = Profiled::new(px(fractions.get(Profile::STRICT)));
        for profile in Profile::all().skip(1) {
            max_y_gap = max_y_gap.with(profile, px(fractions.get(profile)));
        }
        Self {
            vicinity_margin: scale.to_pixels(constants.vicinity_margin),
            slope_margin: constants.slope_margin,
            max_bar_overlap: constants.max_bar_overlap,
            max_beam_side_dx: px(constants.max_beam_side_dx),
            max_beam_group_dy: px(constants.max_beam_group_dy),
            min_beam_head_dy: px(constants.min_beam_head_dy),
            max_beam_linker_dx: px(constants.max_beam_linker_dx),
            half_beam_lu_dx: px(constants.half_beam_lu_dx),
            min_seed_contrib: px(constants.min_seed_contrib),
            max_beam_seed_dx: px(constants.max_beam_seed_dx),
            max_beam_seed_dy_ratio: constants.max_beam_seed_dy_ratio,
            min_beam_stems_dx: px(constants.min_beam_stems_dx),
            min_beam_stump_dy: px(constants.min_beam_stump_dy),
            max_line_seed_dx: px(constants.max_line_seed_dx),
            max_line_section_dx: px(constants.max_line_section_dx),
            max_stem_alignment_dx: px(constants.max_stem_alignment_dx),
            max_stem_alignment_dy: px(constants.max_stem_alignment_dy),
            min_head_head_dy: px(constants.min_head_head_dy),
            max_head_seed_dy: px(constants.max_head_seed_dy),
            stump_area_dy_half: px(constants.stump_area_dy_half),
            stump_area_dx_in: px(constants.stump_area_dx_in),
            stump_area_dx_out: px(constants.stump_area_dx_out),
            min_linker_length: px(constants.min_linker_length),
            artificial_stem_grade: constants.artificial_stem_grade,
            min_stem_tail: px(constants.min_stem_tail),
            best_stem_tail: px(constants.best_stem_tail),
            max_section_length_ratio: constants.max_section_length_ratio,
            main_stem_thickness: scale.main_stem,
            max_stem_thickness: scale.max_stem,
            max_y_gap,
            max_head_out_dx: px(head_stem.x_out_gap_max.get(Profile::MAX)),
            max_head_in_dx: px(head_stem.x_in_gap_max.get(Profile::MAX)),
            head_stem,
            beam_stem,
        }
    }

    /// Vertical half-thickness of the beam seed area for `profile`.
    pub fn beam_seed_dy(&self, scale: &Scale, profile: Profile) -> f64 {
        self.max_beam_seed_dy_ratio * scale.to_pixels_f(self.beam_stem.y_gap_max.get(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_resolve_to_pixels() {
        let scale = Scale::new(20, 3, 4);
        let params = Parameters::new(&Constants::default(), &scale);
        assert_eq!(params.vicinity_margin, 20);
        assert!((params.min_stem_tail - 40.0).abs() < 1e-9);
        assert!((params.max_y_gap.get(Profile::STRICT)).abs() < 1e-9);
        assert!((params.max_y_gap.get(Profile::POOR) - 12.0).abs() < 1e-9);
        assert!((params.max_y_gap.get(Profile::BEAM_SIDE) - 80.0).abs() < 1e-9);
        assert!((params.beam_seed_dy(&scale, Profile::BEAM_SEED) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let constants: Constants =
            serde_json::from_str(r#"{ "minStemTail": 1.5, "slopeMargin": 0.02 }"#)
                .expect("constants");
        assert_eq!(constants.min_stem_tail, 1.5);
        assert_eq!(constants.slope_margin, 0.02);
        assert_eq!(constants.best_stem_tail, 2.5);
    }
}
