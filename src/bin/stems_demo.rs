use omr_stems::config::{load_config, load_page_fixture};
use omr_stems::image::io::{load_grayscale_image, write_json_file};
use std::env;
use std::path::Path;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_config(Path::new(&config_path))?;

    let fixture = load_page_fixture(&config.page)?;
    let gray = load_grayscale_image(&config.image)?;
    let page = fixture.into_page(gray.as_view())?;

    let engine = config.to_engine();
    let report = engine.process(&page);

    write_json_file(&config.output.report, &report)?;

    println!(
        "Linked {} stems over {} systems in {:.3} ms",
        report.stem_count(),
        report.systems.len(),
        report.timings.total_ms
    );
    for system in &report.systems {
        let c = &system.counts;
        println!(
            "  System#{}: {} stems, {} head links, {} beam links, {} removed beams, {} abnormal heads",
            system.id,
            c.stems,
            c.head_stem_links,
            c.beam_stem_links,
            system.removed_beams.len(),
            system.abnormal_heads.len()
        );
    }
    println!("Saved report to {}", config.output.report.display());
    Ok(())
}

fn usage() -> String {
    "Usage: stems_demo <config.json>".to_string()
}
