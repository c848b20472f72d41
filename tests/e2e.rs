mod common;

use common::synthetic_page::{beamed_pair, beamed_pair_under_two_beams, ghost_beam, quarter_note};
use omr_stems::config::{load_config, load_page_fixture, PageFixture};
use omr_stems::image::io::{load_grayscale_image, save_grayscale_u8, write_json_file, GrayImageU8};
use omr_stems::sheet::HorizontalSide;
use omr_stems::sig::Relation;
use omr_stems::{LinkingReport, StemEngine};
use std::fs;
use std::path::PathBuf;

fn run(image: &GrayImageU8, fixture: PageFixture) -> LinkingReport {
    let page = fixture.into_page(image.as_view()).expect("valid fixture");
    StemEngine::default().process(&page)
}

fn assert_graph_invariants(report: &LinkingReport) {
    for system in &report.systems {
        for head in 0..system.counts.heads {
            let stems = system.stems_of_head(head);
            assert!(stems.len() <= 2, "head {head} keeps {} stems", stems.len());
        }
        for beam in 0..system.counts.beams {
            let linked = !system.stems_of_beam(beam).is_empty();
            let removed = system.removed_beams.contains(&beam);
            assert!(linked != removed, "beam {beam}: linked={linked} removed={removed}");
        }
        for stem in &system.stems {
            assert!(stem.top[1] <= stem.bottom[1]);
            assert!((0.0..=1.0).contains(&stem.grade));
        }
    }
}

#[test]
fn quarter_note_gets_one_stem_on_its_right() {
    let (image, fixture) = quarter_note();
    let report = run(&image, fixture);

    assert_eq!(report.systems.len(), 1);
    let system = &report.systems[0];
    assert_eq!(system.counts.stems, 1, "stems: {:?}", system.stems);
    assert_eq!(system.counts.head_stem_links, 1);
    assert!(system.abnormal_heads.is_empty());

    let stems = system.stems_of_head(0);
    assert_eq!(stems.len(), 1);
    assert!(stems[0].top[1] < 60.0, "stem top at {:?}", stems[0].top);

    let side = system.relations.iter().find_map(|r| match &r.relation {
        Relation::HeadStem(rel) => Some(rel.head_side),
        _ => None,
    });
    assert_eq!(side, Some(HorizontalSide::Right));
    assert_graph_invariants(&report);
}

#[test]
fn beam_over_blank_paper_is_removed() {
    let (image, fixture) = ghost_beam();
    let report = run(&image, fixture);

    let system = &report.systems[0];
    assert_eq!(system.removed_beams, vec![0]);
    assert!(system.stems.is_empty());
    assert_eq!(system.counts.beam_stem_links, 0);
}

#[test]
fn beamed_heads_keep_a_consistent_graph() {
    let (image, fixture) = beamed_pair();
    let report = run(&image, fixture);

    let system = &report.systems[0];
    assert_eq!(system.counts.heads, 2);
    assert_eq!(system.counts.beams, 1);
    assert!(system.removed_beams.is_empty());
    assert_eq!(system.counts.stems, 2, "stems: {:?}", system.stems);
    assert_eq!(system.counts.head_stem_links, 2);
    assert_eq!(system.counts.beam_stem_links, 2);
    for head in 0..2 {
        assert_eq!(system.stems_of_head(head).len(), 1, "head {head}");
    }
    assert_eq!(system.stems_of_beam(0).len(), 2);
    assert_graph_invariants(&report);
}

#[test]
fn both_beams_of_a_group_carry_both_stems() {
    let (image, fixture) = beamed_pair_under_two_beams();
    let report = run(&image, fixture);

    let system = &report.systems[0];
    assert_eq!(system.counts.beams, 2);
    assert!(system.removed_beams.is_empty(), "removed: {:?}", system.removed_beams);
    assert_eq!(system.counts.stems, 2, "stems: {:?}", system.stems);
    assert_eq!(system.counts.head_stem_links, 2);
    assert_eq!(system.counts.beam_stem_links, 4);
    for beam in 0..2 {
        assert_eq!(system.stems_of_beam(beam).len(), 2, "beam {beam}");
    }
    for head in 0..2 {
        assert_eq!(system.stems_of_head(head).len(), 1, "head {head}");
    }
    assert_graph_invariants(&report);
}

#[test]
fn linking_is_deterministic() {
    let (image, fixture) = beamed_pair();
    let first = run(&image, fixture.clone());
    let second = run(&image, fixture);

    let strip = |report: &LinkingReport| {
        let mut value = serde_json::to_value(report).expect("report serializes");
        value["timings"] = serde_json::Value::Null;
        value
    };
    assert_eq!(strip(&first), strip(&second));
}

#[test]
fn config_files_drive_the_same_run() {
    let dir = std::env::temp_dir().join(format!("omr_stems_e2e_{}", std::process::id()));
    let (image, fixture) = quarter_note();
    let expected = run(&image, fixture.clone());

    let image_path = dir.join("page.png");
    let page_path = dir.join("page.json");
    let config_path = dir.join("config.json");
    let report_path: PathBuf = dir.join("out").join("report.json");
    save_grayscale_u8(&image, &image_path).expect("image saved");
    write_json_file(&page_path, &fixture).expect("fixture saved");
    let config = serde_json::json!({
        "page": page_path,
        "image": image_path,
        "output": { "report": report_path },
        "engine": { "maxHeadProfile": 2 }
    });
    write_json_file(&config_path, &config).expect("config saved");

    let config = load_config(&config_path).expect("config loads");
    let fixture = load_page_fixture(&config.page).expect("fixture loads");
    let gray = load_grayscale_image(&config.image).expect("image loads");
    let page = fixture.into_page(gray.as_view()).expect("valid fixture");
    let report = config.to_engine().process(&page);
    write_json_file(&config.output.report, &report).expect("report saved");

    assert_eq!(report.stem_count(), expected.stem_count());
    assert!(report_path.exists());
    let _ = fs::remove_dir_all(&dir);
}
