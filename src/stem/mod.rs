//! Stem retrieval and linking.
//!
//! Overview
//! - [`params`] resolves the interline-fraction constants into pixels.
//! - [`checker`] grades a candidate glyph as a stem.
//! - [`item`] models what a stem meets along one direction of travel and
//!   the lengths reachable per profile.
//! - [`linker`] is the anchor arena shared by head corners and beam
//!   anchors, with their `linked`/`closed` states.
//! - [`builder`] gathers seeds, chunks and target anchors for one search.
//! - [`head_linker`] and [`beam_linker`] inspect then link head corners
//!   and beam sides/stumps.
//! - [`retriever`] drives one system through inspection and linking.
//! - [`finalizer`] runs once every system is linked; [`cleaner`] trims
//!   heads carrying too many stems.

pub mod beam_linker;
pub mod builder;
pub mod checker;
pub mod cleaner;
pub mod finalizer;
pub mod head_linker;
pub mod item;
pub mod linker;
pub mod params;
pub mod retriever;

pub use checker::{StemChecker, GOOD_GRADE, MIN_GRADE};
pub use cleaner::HeadStemsCleaner;
pub use finalizer::{finalize, FinalizePasses, FinalizeStats};
pub use item::{StemItem, StemItems};
pub use params::{Constants, Parameters};
pub use retriever::{SheetContext, SystemContext};
