//! Per-system interpretation graph.
//!
//! Overview
//! - [`inter`] holds the interpretations (heads, beams, stems) kept in an
//!   arena keyed by [`InterId`].
//! - [`relation`] holds the typed, graded edges and their geometric checks.
//! - [`graph`] is the arena itself with bidirectional edge lookup, removal
//!   flags and partitions of mutually compatible inters.
//! - [`grade`] holds the grading primitives shared by checks and relations.

pub mod grade;
pub mod graph;
pub mod inter;
pub mod relation;

pub use grade::{contextual, CheckImpact, GradeImpacts};
pub use graph::{EdgeId, Sig};
pub use inter::{Beam, Head, HeadShape, Inter, InterId, InterKind, Stem};
pub use relation::{
    BeamHeadRelation, BeamPortion, BeamStemRelation, HeadStemRelation, Relation, StemPortion,
};
