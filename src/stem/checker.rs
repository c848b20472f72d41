//! Stem checks.
//!
//! The "Seed" suite grades a candidate glyph as a stem. Checks run in order
//! because `Clean` computes the black, white and gap measures that the
//! following checks read. A check whose weight is not positive still runs
//! for its side effects but does not count in the grade.

use crate::glyph::Glyph;
use crate::image::Foreground;
use crate::sheet::{Profile, Profiled, Scale};
use crate::sig::grade::ramp;
use crate::sig::GradeImpacts;
use log::trace;

/// Minimum grade for a stem to be created.
pub const MIN_GRADE: f64 = 0.2;
/// Grade above which a stem is considered good.
pub const GOOD_GRADE: f64 = 0.5;

#[derive(Clone, Debug)]
pub struct CheckConstants {
    /// Maximum tangent difference with the sheet vertical.
    pub max_slope: f64,
    /// Maximum mean distance to the fitted line (interline).
    pub max_straight: f64,
    pub length_low: f64,
    pub length_high: f64,
    pub clean_low: Profiled<f64>,
    pub clean_high: f64,
    pub black_low: Profiled<f64>,
    pub black_high: Profiled<f64>,
    pub black_ratio_low: Profiled<f64>,
    pub max_y_gap: Profiled<f64>,
    /// Width of the belt scanned on each side of the stem (interline).
    pub belt: f64,
    /// Candidates leaning more than this inverted slope are not clean.
    pub max_clean_slope: f64,
}

impl Default for CheckConstants {
    fn default() -> Self {
        Self {
            max_slope: 0.08,
            max_straight: 0.2,
            length_low: 1.25,
            length_high: 3.5,
            clean_low: Profiled::new(0.5)
                .with(Profile::STANDARD, 0.3)
                .with(Profile::POOR, 0.2)
                .with(Profile::BEAM_SEED, 0.0),
            clean_high: 2.0,
            black_low: Profiled::new(1.25).with(Profile::STANDARD, 0.625),
            black_high: Profiled::new(2.5).with(Profile::STANDARD, 1.25),
            black_ratio_low: Profiled::new(0.5)
                .with(Profile::STANDARD, 0.3)
                .with(Profile::POOR, 0.2)
                .with(Profile::BEAM_SEED, 0.1),
            max_y_gap: super::params::Constants::max_y_gap(),
            belt: 0.15,
            max_clean_slope: 0.5,
        }
    }
}

/// Pixel measures gathered by the clean scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanScan {
    /// Rows with ink and no ink in either belt.
    pub clean: i32,
    /// Rows with ink between the side lines.
    pub black: i32,
    /// Interior rows without ink.
    pub white: i32,
    /// Largest run of interior white rows.
    pub gap: i32,
}

#[derive(Clone, Debug)]
pub struct StemChecker {
    scale: Scale,
    slope: f64,
    constants: CheckConstants,
}

impl StemChecker {
    pub fn new(scale: Scale, slope: f64) -> Self {
        Self {
            scale,
            slope,
            constants: CheckConstants::default(),
        }
    }

    pub fn min_grade(&self) -> f64 {
        MIN_GRADE
    }

    pub fn check<F: Foreground>(&self, glyph: &Glyph, profile: Profile, ink: &F) -> GradeImpacts {
        let c = &self.constants;
        let frac = |px: f64| self.scale.pixels_to_frac(px);
        let line = glyph.center_line();
        let mut impacts = GradeImpacts::default();

        // Sheet vertical has inverted slope -slope
        let slope_gap = (line.inverted_slope() + self.slope).abs();
        let slope_gap = if slope_gap.is_finite() { slope_gap } else { f64::MAX };
        impacts.push("slope", slope_gap, ramp(slope_gap, 0.0, c.max_slope, false), 1.0);

        let straight = frac(glyph.mean_distance());
        impacts.push(
            "straight",
            straight,
            ramp(straight, 0.0, c.max_straight, false),
            1.0,
        );

        let length = frac(line.p2.y - line.p1.y);
        impacts.push(
            "length",
            length,
            ramp(length, c.length_low, c.length_high, true),
            2.0,
        );

        let scan = self.clean_scan(glyph, ink);
        let clean = frac(scan.clean as f64);
        let clean_weight = if profile >= Profile::BEAM_SIDE { -1.0 } else { 2.0 };
        impacts.push(
            "clean",
            clean,
            ramp(clean, c.clean_low.get(profile), c.clean_high, true),
            clean_weight,
        );

        let black = frac(scan.black as f64);
        impacts.push(
            "black",
            black,
            ramp(black, c.black_low.get(profile), c.black_high.get(profile), true),
            1.0,
        );

        let total = scan.black + scan.white;
        let ratio = if total > 0 {
            scan.black as f64 / total as f64
        } else {
            0.0
        };
        impacts.push(
            "blackRatio",
            ratio,
            ramp(ratio, c.black_ratio_low.get(profile), 1.0, true),
            1.0,
        );

        let gap = frac(scan.gap as f64);
        impacts.push("gap", gap, ramp(gap, 0.0, c.max_y_gap.get(profile), false), 5.0);

        let grade = impacts.compute_grade();
        trace!("check {:?} at {profile}: grade {grade:.3}", glyph.id);
        impacts
    }

    /// Scan glyph rows between side lines at half the maximum stem
    /// thickness around the fitted line, plus one belt on each side.
    pub fn clean_scan<F: Foreground>(&self, glyph: &Glyph, ink: &F) -> CleanScan {
        let line = glyph.center_line();
        let inv = line.inverted_slope();
        if !inv.is_finite() || inv.abs() > self.constants.max_clean_slope {
            return CleanScan::default();
        }
        let half = 0.5 * (self.scale.max_stem - 1) as f64;
        let belt = self.scale.to_pixels(self.constants.belt).max(1);
        let bounds = glyph.bounds();

        let mut scan = CleanScan::default();
        let mut white_run = 0;
        let mut seen_black = false;
        for y in bounds.y..bounds.bottom() {
            let xc = line.x_at_y(y as f64);
            let xl = (xc - half).round() as i32;
            let xr = (xc + half).round() as i32;
            if !ink.any_ink(y, xl, xr) {
                if seen_black {
                    white_run += 1;
                }
                continue;
            }
            seen_black = true;
            scan.black += 1;
            scan.white += white_run;
            scan.gap = scan.gap.max(white_run);
            white_run = 0;
            let left = ink.any_ink(y, xl - belt, xl - 1);
            let right = ink.any_ink(y, xr + 1, xr + belt);
            if !left && !right {
                scan.clean += 1;
            }
        }
        scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::glyph::{build_vertical_sections, GlyphIndex, SectionId};
    use crate::image::io::GrayImageU8;
    use crate::image::DEFAULT_INK_THRESHOLD;

    fn glyph_of(image: &GrayImageU8) -> (Glyph, GrayImageU8) {
        let ink = image.as_view().binary(DEFAULT_INK_THRESHOLD);
        let sections = build_vertical_sections(&ink, image.width(), image.height(), 2.0);
        let ids: Vec<SectionId> = sections.iter().map(|s| s.id).collect();
        let mut index = GlyphIndex::new();
        let id = index.register(&sections, &ids).expect("glyph");
        (index.get(id).clone(), image.clone())
    }

    #[test]
    fn straight_bar_is_a_good_stem() {
        let mut image = GrayImageU8::blank(40, 100);
        image.fill_rect(&Rect::new(10, 10, 3, 70));
        let (glyph, image) = glyph_of(&image);
        let ink = image.as_view().binary(DEFAULT_INK_THRESHOLD);
        let checker = StemChecker::new(Scale::new(20, 3, 4), 0.0);
        let scan = checker.clean_scan(&glyph, &ink);
        assert_eq!(scan, CleanScan { clean: 70, black: 70, white: 0, gap: 0 });
        let impacts = checker.check(&glyph, Profile::STRICT, &ink);
        assert!(impacts.grade > 0.9, "grade {}", impacts.grade);
    }

    #[test]
    fn gapped_bar_needs_a_loose_profile() {
        let mut image = GrayImageU8::blank(40, 100);
        image.fill_rect(&Rect::new(10, 10, 3, 30));
        image.fill_rect(&Rect::new(10, 50, 3, 30));
        let (glyph, image) = glyph_of(&image);
        let ink = image.as_view().binary(DEFAULT_INK_THRESHOLD);
        let checker = StemChecker::new(Scale::new(20, 3, 4), 0.0);
        let scan = checker.clean_scan(&glyph, &ink);
        assert_eq!(scan.gap, 10);
        assert_eq!(scan.white, 10);
        assert_eq!(checker.check(&glyph, Profile::STRICT, &ink).grade, 0.0);
        let loose = checker.check(&glyph, Profile::BEAM_SEED, &ink);
        assert!(loose.grade > MIN_GRADE, "grade {}", loose.grade);
        assert_eq!(loose.get("gap").map(|i| i.result), Some(0.75));
    }

    #[test]
    fn neighbor_ink_spoils_cleanliness() {
        let mut image = GrayImageU8::blank(60, 100);
        image.fill_rect(&Rect::new(20, 10, 3, 70));
        // Head-like blob glued on the left over 12 rows
        image.fill_rect(&Rect::new(8, 60, 12, 12));
        let ink = image.as_view().binary(DEFAULT_INK_THRESHOLD);
        let sections = build_vertical_sections(&ink, image.width(), image.height(), 2.0);
        let stem: Vec<SectionId> = sections
            .iter()
            .filter(|s| s.bounds().x >= 20)
            .map(|s| s.id)
            .collect();
        let mut index = GlyphIndex::new();
        let id = index.register(&sections, &stem).expect("stem glyph");
        let checker = StemChecker::new(Scale::new(20, 3, 4), 0.0);
        let scan = checker.clean_scan(index.get(id), &ink);
        assert_eq!(scan.black, 70);
        assert_eq!(scan.clean, 58);
    }
}
