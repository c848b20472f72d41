//! Stem engine running a page through both phases.
//!
//! Typical usage:
//! ```no_run
//! use omr_stems::engine::{Page, StemEngine};
//!
//! # fn example(page: Page) {
//! let engine = StemEngine::default();
//! let report = engine.process(&page);
//! println!("stems: {}", report.stem_count());
//! # }
//! ```

use super::input::{Page, SystemInput};
use super::params::EngineParams;
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::{InputDescriptor, LinkingReport, SystemReport, TimingBreakdown};
use crate::stem::{finalize, Constants, SheetContext, SystemContext};
use log::debug;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Links stems to heads and beams over a whole page.
#[derive(Clone, Debug, Default)]
pub struct StemEngine {
    params: EngineParams,
    constants: Constants,
}

impl StemEngine {
    pub fn new(params: EngineParams, constants: Constants) -> Self {
        Self { params, constants }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// Process all systems of `page`. Systems are handled top-down; every
    /// system completes inspection and linking before any is finalized.
    pub fn process(&self, page: &Page) -> LinkingReport {
        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();

        let sheet = timings.measure("sheet", || {
            SheetContext::new(
                page.image,
                page.scale,
                page.slope,
                &self.constants,
                self.params.max_head_profile,
            )
        });

        let mut inputs: Vec<&SystemInput> = page.systems.iter().collect();
        inputs.sort_by_key(|s| (s.info.bounds.y, s.info.id));

        let mut systems: Vec<SystemContext<'_>> = timings.measure("systems", || {
            inputs
                .iter()
                .map(|input| SystemContext::new(&sheet, input))
                .collect()
        });

        timings.measure("link", || link_systems(&mut systems));

        let stats = timings.measure("finalize", || {
            finalize(&mut systems, &self.params.finalize)
        });

        let reports: Vec<SystemReport> = timings.measure("report", || {
            systems
                .iter()
                .zip(stats)
                .map(|(system, stats)| SystemReport::from_system(system, stats))
                .collect()
        });

        timings.total_ms = elapsed_ms(total_start);
        debug!(
            "Page linked: {} systems, {} stems in {:.3} ms",
            reports.len(),
            reports.iter().map(|r| r.stems.len()).sum::<usize>(),
            timings.total_ms
        );

        LinkingReport {
            input: InputDescriptor {
                width: page.image.w,
                height: page.image.h,
                interline: page.scale.interline,
                slope: page.slope,
                systems: page.systems.len(),
            },
            timings,
            systems: reports,
        }
    }
}

/// Phase 1 for every system. Returns once all of them are done.
fn link_systems(systems: &mut [SystemContext<'_>]) {
    #[cfg(feature = "parallel")]
    {
        systems.par_iter_mut().for_each(|system| system.process());
    }
    #[cfg(not(feature = "parallel"))]
    {
        systems.iter_mut().for_each(|system| system.process());
    }
}
