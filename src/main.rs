use omr_stems::image::io::GrayImageU8;
use omr_stems::prelude::*;
use omr_stems::sheet::PartBounds;

fn main() {
    // Demo page: one black head with its stem going up on the right side
    let (w, h) = (300usize, 200usize);
    let mut gray = GrayImageU8::blank(w, h);
    let head = Rect::new(100, 100, 23, 18);
    gray.fill_ellipse(&head);
    gray.fill_rect(&Rect::new(123, 40, 3, 68));

    let system = SystemInput {
        info: SystemInfo {
            id: 0,
            bounds: Rect::new(0, 0, w as i32, h as i32),
            parts: vec![PartBounds { top: 0, bottom: h as i32 - 1 }],
            staff_top: 60.0,
            staff_bottom: 140.0,
        },
        heads: vec![HeadInput {
            bounds: head,
            shape: HeadShape::Black,
            grade: 0.8,
            vip: false,
        }],
        beams: Vec::new(),
        seeds: vec![Rect::new(120, 36, 10, 76)],
        no_stem_areas: Vec::new(),
        exclusions: Vec::new(),
    };
    let page = Page {
        image: gray.as_view(),
        scale: Scale::new(20, 3, 4),
        slope: 0.0,
        systems: vec![system],
    };

    let report = StemEngine::default().process(&page);
    println!(
        "stems={} head_links={} latency_ms={:.3}",
        report.stem_count(),
        report.systems.iter().map(|s| s.counts.head_stem_links).sum::<usize>(),
        report.timings.total_ms
    );
}
