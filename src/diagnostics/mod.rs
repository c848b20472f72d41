//! Serializable report of a linking run.
//!
//! [`LinkingReport`] is returned by the engine and written as JSON by the
//! demo tool: per-system counters, created stems with their check impacts,
//! the relations of the final graph, and stage timings.

pub mod report;
pub mod timing;

pub use report::{
    InputDescriptor, LinkingReport, RelationRecord, StemRecord, SystemCounts, SystemReport,
    UndefinedSide,
};
pub use timing::{StageTiming, TimingBreakdown};
