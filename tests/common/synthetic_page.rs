//! Painted pages with their upstream detections, interline 20.

use omr_stems::config::PageFixture;
use omr_stems::engine::{BeamInput, HeadInput, SystemInput};
use omr_stems::geometry::{pt, Rect};
use omr_stems::image::io::GrayImageU8;
use omr_stems::sheet::{PartBounds, Scale, SystemInfo};
use omr_stems::sig::HeadShape;

pub const WIDTH: usize = 300;
pub const HEIGHT: usize = 200;

pub fn scale() -> Scale {
    Scale::new(20, 3, 4)
}

pub fn system_info(id: usize, y: i32) -> SystemInfo {
    SystemInfo {
        id,
        bounds: Rect::new(0, y, WIDTH as i32, HEIGHT as i32),
        parts: vec![PartBounds {
            top: y,
            bottom: y + HEIGHT as i32 - 1,
        }],
        staff_top: (y + 60) as f64,
        staff_bottom: (y + 140) as f64,
    }
}

pub fn empty_system(info: SystemInfo) -> SystemInput {
    SystemInput {
        info,
        heads: Vec::new(),
        beams: Vec::new(),
        seeds: Vec::new(),
        no_stem_areas: Vec::new(),
        exclusions: Vec::new(),
    }
}

pub fn black_head(bounds: Rect) -> HeadInput {
    HeadInput {
        bounds,
        shape: HeadShape::Black,
        grade: 0.8,
        vip: false,
    }
}

pub fn beam(x0: f64, x1: f64, y: f64) -> BeamInput {
    BeamInput {
        p1: [x0, y],
        p2: [x1, y],
        height: 10.0,
        grade: 0.8,
        hook: false,
        group: Some(0),
        glyph: None,
        vip: false,
    }
}

/// Black head with a stem going up from its right side.
pub fn quarter_note() -> (GrayImageU8, PageFixture) {
    let mut image = GrayImageU8::blank(WIDTH, HEIGHT);
    let head = Rect::new(100, 100, 23, 18);
    image.fill_ellipse(&head);
    image.fill_rect(&Rect::new(123, 40, 3, 68));

    let mut system = empty_system(system_info(0, 0));
    system.heads.push(black_head(head));
    system.seeds.push(Rect::new(120, 36, 10, 76));
    (image, fixture(vec![system]))
}

/// Two heads joined by stems to one beam above them.
pub fn beamed_pair() -> (GrayImageU8, PageFixture) {
    let mut image = GrayImageU8::blank(WIDTH, HEIGHT);
    let left = Rect::new(100, 130, 23, 18);
    let right = Rect::new(180, 120, 23, 18);
    image.fill_ellipse(&left);
    image.fill_ellipse(&right);
    image.fill_rect(&Rect::new(123, 40, 3, 98));
    image.fill_rect(&Rect::new(203, 40, 3, 88));
    image.fill_band(pt(123.0, 45.0), pt(206.0, 45.0), 10.0);

    let mut system = empty_system(system_info(0, 0));
    system.heads.push(black_head(left));
    system.heads.push(black_head(right));
    system.beams.push(beam(123.0, 206.0, 45.0));
    system.seeds.push(Rect::new(120, 36, 9, 104));
    system.seeds.push(Rect::new(200, 36, 6, 94));
    (image, fixture(vec![system]))
}

/// The beamed pair with a second beam of the same group under the first.
pub fn beamed_pair_under_two_beams() -> (GrayImageU8, PageFixture) {
    let (mut image, mut fixture) = beamed_pair();
    image.fill_band(pt(123.0, 61.0), pt(206.0, 61.0), 10.0);
    fixture.systems[0].beams.push(beam(123.0, 206.0, 61.0));
    (image, fixture)
}

/// Beam reported upstream over blank paper.
pub fn ghost_beam() -> (GrayImageU8, PageFixture) {
    let image = GrayImageU8::blank(WIDTH, HEIGHT);
    let mut system = empty_system(system_info(0, 0));
    system.beams.push(beam(100.0, 200.0, 80.0));
    (image, fixture(vec![system]))
}

pub fn fixture(systems: Vec<SystemInput>) -> PageFixture {
    PageFixture {
        scale: scale(),
        slope: 0.0,
        systems,
    }
}
