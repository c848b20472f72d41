//! Phase 2: finalization once every system of the sheet is linked.
//!
//! Orphan beams are detected across vertically adjacent systems through
//! shared borrows only; each system is then finalized on its own.

use super::checker::GOOD_GRADE;
use super::cleaner::HeadStemsCleaner;
use super::retriever::SystemContext;
use crate::sig::{BeamHeadRelation, InterId, Relation};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Which finalization passes run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FinalizePasses {
    pub purge_seeds: bool,
    pub orphan_beams: bool,
    pub boost_beam_sides: bool,
    pub clean_head_stems: bool,
    pub flag_abnormal_heads: bool,
    pub mutual_exclusions: bool,
}

impl Default for FinalizePasses {
    fn default() -> Self {
        Self {
            purge_seeds: true,
            orphan_beams: true,
            boost_beam_sides: true,
            clean_head_stems: true,
            flag_abnormal_heads: true,
            mutual_exclusions: true,
        }
    }
}

/// Counters of one system finalization.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeStats {
    pub purged_seeds: usize,
    pub orphan_beams: usize,
    pub beam_head_links: usize,
    pub cleaned_relations: usize,
    pub abnormal_heads: usize,
    pub exclusions: usize,
}

/// Finalize all systems of a sheet, given in top-down order.
pub fn finalize(systems: &mut [SystemContext<'_>], passes: &FinalizePasses) -> Vec<FinalizeStats> {
    let orphans: Vec<Vec<InterId>> = if passes.orphan_beams {
        (0..systems.len())
            .map(|i| orphan_beams(systems, i))
            .collect()
    } else {
        vec![Vec::new(); systems.len()]
    };

    systems
        .iter_mut()
        .zip(orphans)
        .map(|(system, orphans)| system.finalize(&orphans, passes))
        .collect()
}

/// Beams of system `index` lacking stems whose glyph is already carried,
/// with stems, by a beam of the adjacent system they lie towards.
fn orphan_beams(systems: &[SystemContext<'_>], index: usize) -> Vec<InterId> {
    let system = &systems[index];
    let mut orphans = Vec::new();
    for &beam in &system.beams {
        let Some(b) = system.sig.beam(beam) else {
            continue;
        };
        let Some(glyph) = b.glyph else {
            continue;
        };
        if !system.sig.beam_stems(beam).is_empty() {
            continue;
        }
        let y = b.center().y;
        let neighbor = if y < system.info.staff_top {
            index.checked_sub(1)
        } else if y > system.info.staff_bottom {
            Some(index + 1).filter(|n| *n < systems.len())
        } else {
            None
        };
        let Some(other) = neighbor.map(|n| &systems[n]) else {
            continue;
        };
        let carried = other.beams.iter().any(|&ob| {
            other.sig.beam(ob).is_some_and(|o| o.glyph == Some(glyph))
                && !other.sig.beam_stems(ob).is_empty()
        });
        if carried {
            orphans.push(beam);
        }
    }
    orphans
}

impl<'a> SystemContext<'a> {
    /// Finalize this system. `orphans` come from [`finalize`].
    pub fn finalize(&mut self, orphans: &[InterId], passes: &FinalizePasses) -> FinalizeStats {
        let mut stats = FinalizeStats::default();

        if passes.purge_seeds {
            stats.purged_seeds = self.purge_no_stem_seeds();
            self.purged_seeds += stats.purged_seeds;
        }
        if passes.orphan_beams {
            for &beam in orphans {
                if !self.sig.is_removed(beam) {
                    self.remove_beam(beam, "orphan of adjacent system");
                    stats.orphan_beams += 1;
                }
            }
        }
        if passes.boost_beam_sides {
            stats.beam_head_links = self.boost_beam_sides();
        }
        if passes.clean_head_stems {
            stats.cleaned_relations = self.check_head_stems();
        }
        if passes.flag_abnormal_heads {
            stats.abnormal_heads = self.flag_abnormal_heads();
        }
        if passes.mutual_exclusions {
            stats.exclusions = self.insert_stem_exclusions();
        }

        debug!("System#{} finalized: {:?}", self.info.id, stats);
        stats
    }

    /// Link good beams to the heads of their side stems.
    fn boost_beam_sides(&mut self) -> usize {
        let mut links = Vec::new();
        for &beam in &self.beams {
            let Some(b) = self.sig.beam(beam) else {
                continue;
            };
            if b.grade < GOOD_GRADE {
                continue;
            }
            for (_, stem, bs) in self.sig.beam_stems(beam) {
                if bs.portion.side().is_none() {
                    continue;
                }
                for (_, head, hs) in self.sig.stem_heads(stem) {
                    if self.sig.relation(beam, head).is_none() {
                        links.push((beam, head, (bs.grade + hs.grade) / 2.0));
                    }
                }
            }
        }

        let mut count = 0;
        for (beam, head, grade) in links {
            if self.sig.relation(beam, head).is_some() {
                continue;
            }
            let rel = Relation::BeamHead(BeamHeadRelation { grade });
            if self.sig.add_edge(beam, head, rel).is_some() {
                count += 1;
            }
        }
        count
    }

    /// Reduce the stems of each head to a legal configuration.
    fn check_head_stems(&mut self) -> usize {
        let cleaner = HeadStemsCleaner::new(&self.sheet.params.head_stem);
        let mut removed = 0;
        for head in self.head_inputs.clone() {
            if self.sig.is_removed(head) {
                continue;
            }
            let stems: Vec<InterId> = self
                .sig
                .head_stems(head)
                .into_iter()
                .map(|(_, stem, _)| stem)
                .collect();
            if stems.len() < 2 {
                continue;
            }
            for set in self.sig.partitions(&stems) {
                if set.len() > 1 {
                    removed += cleaner.check(&mut self.sig, head, &set).len();
                }
            }
        }
        removed
    }

    /// Flag heads needing a stem but left without one.
    fn flag_abnormal_heads(&mut self) -> usize {
        let mut count = 0;
        for head in self.heads.clone() {
            if self.sig.is_removed(head) || !self.sig.head_stems(head).is_empty() {
                continue;
            }
            let vip = self.is_vip(head);
            if let Some(h) = self.sig.head_mut(head) {
                h.abnormal = true;
                count += 1;
                if vip {
                    info!("VIP System#{} head {:?} has no stem", self.info.id, head);
                }
            }
        }
        count
    }

    /// Stems whose boxes intersect exclude each other.
    fn insert_stem_exclusions(&mut self) -> usize {
        let mut stems: Vec<(InterId, crate::geometry::Rect)> =
            self.sig.stems().map(|(id, s)| (id, s.bounds)).collect();
        stems.sort_by(|a, b| a.1.x.cmp(&b.1.x).then(a.0.cmp(&b.0)));

        let mut count = 0;
        for (i, (a, ba)) in stems.iter().enumerate() {
            for (b, bb) in &stems[i + 1..] {
                if bb.x >= ba.right() {
                    break;
                }
                if ba.intersects(bb) && self.sig.insert_exclusion(*a, *b).is_some() {
                    count += 1;
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BeamInput, HeadInput, SystemInput};
    use crate::geometry::Rect;
    use crate::image::io::GrayImageU8;
    use crate::sheet::{PartBounds, Profile, Scale, SystemInfo};
    use crate::sig::HeadShape;
    use crate::stem::params::Constants;
    use crate::stem::retriever::SheetContext;

    fn info(id: usize, top: i32) -> SystemInfo {
        SystemInfo {
            id,
            bounds: Rect::new(0, top, 300, 200),
            parts: vec![PartBounds { top, bottom: top + 199 }],
            staff_top: top as f64 + 60.0,
            staff_bottom: top as f64 + 140.0,
        }
    }

    fn system(info: SystemInfo) -> SystemInput {
        SystemInput {
            info,
            heads: Vec::new(),
            beams: Vec::new(),
            seeds: Vec::new(),
            no_stem_areas: Vec::new(),
            exclusions: Vec::new(),
        }
    }

    fn beam(y: f64, glyph: u32) -> BeamInput {
        BeamInput {
            p1: [100.0, y],
            p2: [200.0, y],
            height: 10.0,
            grade: 0.8,
            hook: false,
            group: None,
            glyph: Some(glyph),
            vip: false,
        }
    }

    #[test]
    fn head_without_stem_is_flagged_abnormal() {
        let image = GrayImageU8::blank(300, 200);
        let sheet = SheetContext::new(
            image.as_view(),
            Scale::new(20, 3, 4),
            0.0,
            &Constants::default(),
            Profile::POOR,
        );
        let input = SystemInput {
            heads: vec![
                HeadInput {
                    bounds: Rect::new(50, 90, 23, 18),
                    shape: HeadShape::Black,
                    grade: 0.8,
                    vip: false,
                },
                HeadInput {
                    bounds: Rect::new(150, 90, 27, 18),
                    shape: HeadShape::Whole,
                    grade: 0.8,
                    vip: false,
                },
            ],
            ..system(info(0, 0))
        };
        let mut systems = vec![SystemContext::new(&sheet, &input)];
        for s in systems.iter_mut() {
            s.process();
        }
        let stats = finalize(&mut systems, &FinalizePasses::default());
        assert_eq!(stats[0].abnormal_heads, 1);
        let sig = &systems[0].sig;
        assert!(sig.head(systems[0].head_inputs[0]).is_some_and(|h| h.abnormal));
        assert!(
            sig.head(systems[0].head_inputs[1]).is_some_and(|h| !h.abnormal),
            "whole notes need no stem"
        );
    }

    #[test]
    fn orphan_beam_is_detected_in_adjacent_system() {
        let image = GrayImageU8::blank(300, 400);
        let sheet = SheetContext::new(
            image.as_view(),
            Scale::new(20, 3, 4),
            0.0,
            &Constants::default(),
            Profile::POOR,
        );
        let upper = SystemInput {
            beams: vec![beam(180.0, 7)],
            ..system(info(0, 0))
        };
        let lower = SystemInput {
            beams: vec![beam(220.0, 7)],
            ..system(info(1, 200))
        };
        let mut systems = vec![
            SystemContext::new(&sheet, &upper),
            SystemContext::new(&sheet, &lower),
        ];
        // Give the lower beam a stem as if it had been linked
        let lower_beam = systems[1].beam_inputs[0];
        let stem = systems[1].sig.add_stem(crate::sig::Stem {
            glyph: crate::glyph::GlyphId(0),
            line: crate::geometry::Segment::new(
                crate::geometry::pt(150.0, 215.0),
                crate::geometry::pt(150.0, 280.0),
            ),
            bounds: Rect::new(149, 215, 3, 65),
            grade: 0.7,
            impacts: Default::default(),
            artificial: false,
        });
        systems[1].sig.add_edge(
            lower_beam,
            stem,
            Relation::BeamStem(crate::sig::BeamStemRelation {
                portion: crate::sig::BeamPortion::Center,
                ext: [150.0, 215.0],
                x_gap: 0.0,
                y_gap: 0.0,
                grade: 0.8,
            }),
        );

        assert_eq!(orphan_beams(&systems, 0), vec![systems[0].beam_inputs[0]]);
        assert!(orphan_beams(&systems, 1).is_empty());

        let upper_beam = systems[0].beam_inputs[0];
        let stats = finalize(&mut systems, &FinalizePasses::default());
        assert_eq!(stats[0].orphan_beams, 1);
        assert!(systems[0].sig.is_removed(upper_beam));
        assert!(!systems[1].sig.is_removed(lower_beam));
    }
}
