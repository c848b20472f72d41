#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod image;

// Building blocks of the linker, public for tools and tests.
pub mod geometry;
pub mod glyph;
pub mod sheet;
pub mod sig;
pub mod stem;

// --- High-level re-exports -------------------------------------------------

pub use crate::diagnostics::{LinkingReport, SystemReport};
pub use crate::engine::{EngineParams, Page, StemEngine, SystemInput};
pub use crate::stem::Constants;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use omr_stems::prelude::*;
///
/// # fn main() {
/// let (w, h) = (400usize, 200usize);
/// let gray = vec![255u8; w * h];
/// let image = ImageU8 { w, h, stride: w, data: &gray };
///
/// let page = Page {
///     image,
///     scale: Scale::new(20, 3, 4),
///     slope: 0.0,
///     systems: Vec::new(),
/// };
/// let report = StemEngine::default().process(&page);
/// println!("stems={} total_ms={:.3}", report.stem_count(), report.timings.total_ms);
/// # }
/// ```
pub mod prelude {
    pub use crate::engine::{BeamInput, HeadInput, InterRef};
    pub use crate::geometry::Rect;
    pub use crate::image::ImageU8;
    pub use crate::sheet::{Profile, Scale, SystemInfo};
    pub use crate::sig::HeadShape;
    pub use crate::{Constants, EngineParams, LinkingReport, Page, StemEngine, SystemInput};
}
