//! Ink geometry: vertical sections, glyphs built from them and the glyph
//! registry.
//!
//! Overview
//! - [`section`] splits the binary page into vertical sections, i.e. vertical
//!   runs stacked over consecutive columns with one-to-one junctions.
//! - [`glyph`] computes the attributes the stem stage relies on: bounds,
//!   weight, centroid, fitted center line and straightness.
//! - [`index`] registers each distinct set of sections once, so that the
//!   union of the same glyphs always maps to the same [`GlyphId`].
//! - [`compound`] grows a section set while tracking its width, used for
//!   stumps and chunks.

pub mod compound;
pub mod glyph;
pub mod index;
pub mod section;

pub use compound::SectionCompound;
pub use glyph::{Glyph, GlyphId};
pub use index::GlyphIndex;
pub use section::{build_vertical_sections, Run, Section, SectionId};
