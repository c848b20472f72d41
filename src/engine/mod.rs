//! Page-level stem linking.
//!
//! Overview
//! - [`input`] describes a page: its image, scale, slope and, per system,
//!   the heads, beams, seed boxes and no-stem areas found upstream.
//! - [`params`] holds the engine knobs.
//! - `pipeline` holds [`StemEngine`], which runs inspection and linking
//!   for every system (in parallel with the `parallel` feature), waits for
//!   all of them, then finalizes the sheet.

pub mod input;
pub mod params;
mod pipeline;

pub use input::{BeamInput, HeadInput, InterRef, Page, SystemInput};
pub use params::EngineParams;
pub use pipeline::StemEngine;
