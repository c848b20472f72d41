//! Per-system stem retrieval.
//!
//! A [`SystemContext`] owns everything one system needs: its relation
//! graph, seeds, beams and heads, the anchor arena and the linkers built
//! on it. Processing runs in two phases:
//! - `inspect` allocates a linker for every beam and head and runs every
//!   search, read-only with respect to the graph;
//! - `link` mutates the graph, beams widest first, then heads best first
//!   in a normal pass and an append pass.
//!
//! Sheet-wide data shared by all systems lives in [`SheetContext`].

use super::beam_linker::BeamLinker;
use super::builder::y_overlap;
use super::checker::StemChecker;
use super::head_linker::HeadLinker;
use super::item::{LinkerRef, Owner, StemItem};
use super::linker::{AnchorArena, AnchorId};
use super::params::{Constants, Parameters};
use crate::engine::{InterRef, SystemInput};
use crate::geometry::Rect;
use crate::glyph::{build_vertical_sections, GlyphId, GlyphIndex, Section, SectionId};
use crate::image::{BinaryView, ImageU8, DEFAULT_INK_THRESHOLD};
use crate::sheet::{HorizontalSide, Profile, Scale, Skew, SystemInfo};
use crate::sig::{InterId, Sig};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

/// Read-only data shared by every system of a sheet.
pub struct SheetContext<'a> {
    pub scale: Scale,
    pub skew: Skew,
    pub params: Parameters,
    pub checker: StemChecker,
    pub ink: BinaryView<'a>,
    /// Vertical sections of the whole page, indexed by [`SectionId`].
    pub sections: Vec<Section>,
    /// Highest profile a head linking may escalate to.
    pub max_head_profile: Profile,
}

impl<'a> SheetContext<'a> {
    pub fn new(
        image: ImageU8<'a>,
        scale: Scale,
        slope: f64,
        constants: &Constants,
        max_head_profile: Profile,
    ) -> Self {
        let ink = image.binary(DEFAULT_INK_THRESHOLD);
        let params = Parameters::new(constants, &scale);
        let sections = build_vertical_sections(
            &ink,
            ink.width(),
            ink.height(),
            params.max_section_length_ratio,
        );
        debug!("Sheet: {} vertical sections", sections.len());
        Self {
            scale,
            skew: Skew::new(slope),
            params,
            checker: StemChecker::new(scale, slope),
            ink,
            sections,
            max_head_profile,
        }
    }
}

/// Mutable state of one system.
pub struct SystemContext<'a> {
    pub(crate) sheet: &'a SheetContext<'a>,
    pub info: SystemInfo,
    pub sig: Sig,
    pub(crate) glyphs: GlyphIndex,
    /// Sections of this system.
    pub(crate) sections: Vec<SectionId>,
    /// Sections already used by a seed.
    pub(crate) seed_sections: HashSet<SectionId>,
    pub(crate) seeds: Vec<GlyphId>,
    /// Heads that need a stem.
    pub(crate) heads: Vec<InterId>,
    pub(crate) beams: Vec<InterId>,
    pub(crate) arena: AnchorArena,
    pub(crate) head_linkers: Vec<HeadLinker>,
    head_index: HashMap<InterId, usize>,
    pub(crate) beam_linkers: Vec<BeamLinker>,
    beam_index: HashMap<InterId, usize>,
    /// Stem registered per glyph.
    pub(crate) stems: HashMap<GlyphId, InterId>,
    pub(crate) no_stem_areas: Vec<Rect>,
    /// Head sides left undecided, both directions being viable.
    pub undefined: Vec<(InterId, HorizontalSide)>,
    pub removed_beams: Vec<InterId>,
    /// Inter of each input head, in input order.
    pub head_inputs: Vec<InterId>,
    /// Inter of each input beam, in input order.
    pub beam_inputs: Vec<InterId>,
    /// Seeds purged for lying on a no-stem area.
    pub purged_seeds: usize,
}

impl<'a> SystemContext<'a> {
    pub fn new(sheet: &'a SheetContext<'a>, input: &SystemInput) -> Self {
        let info = input.info.clone();
        let mut sig = Sig::new();

        let sections: Vec<SectionId> = sheet
            .sections
            .iter()
            .filter(|s| s.bounds().intersects(&info.bounds))
            .map(|s| s.id)
            .collect();

        let mut head_inputs = Vec::with_capacity(input.heads.len());
        let mut heads = Vec::new();
        for head in &input.heads {
            let id = sig.add_head(head.to_head());
            head_inputs.push(id);
            if head.shape.needs_stem() {
                heads.push(id);
            }
        }

        let mut beam_inputs = Vec::with_capacity(input.beams.len());
        for (i, beam) in input.beams.iter().enumerate() {
            beam_inputs.push(sig.add_beam(beam.to_beam(usize::MAX - i)));
        }

        let mut glyphs = GlyphIndex::new();
        let mut seeds = Vec::new();
        let mut seed_sections = HashSet::new();
        for rect in &input.seeds {
            let members: Vec<SectionId> = sections
                .iter()
                .copied()
                .filter(|id| rect.contains_point(&sheet.sections[id.0 as usize].centroid()))
                .collect();
            match glyphs.register(&sheet.sections, &members) {
                Some(glyph) if !seeds.contains(&glyph) => {
                    seed_sections.extend(members.iter().copied());
                    seeds.push(glyph);
                }
                Some(_) => {}
                None => debug!("System#{} seed box {:?} holds no ink", info.id, rect),
            }
        }

        for (a, b) in &input.exclusions {
            let resolve = |r: &InterRef| match *r {
                InterRef::Head(i) => head_inputs.get(i).copied(),
                InterRef::Beam(i) => beam_inputs.get(i).copied(),
                InterRef::Stem(_) => None,
            };
            match (resolve(a), resolve(b)) {
                (Some(x), Some(y)) => {
                    sig.insert_exclusion(x, y);
                }
                _ => warn!("System#{} ignoring exclusion {:?} / {:?}", info.id, a, b),
            }
        }

        debug!(
            "System#{}: {} heads ({} needing stem), {} beams, {} seeds, {} sections",
            info.id,
            head_inputs.len(),
            heads.len(),
            beam_inputs.len(),
            seeds.len(),
            sections.len()
        );

        Self {
            sheet,
            info,
            sig,
            glyphs,
            sections,
            seed_sections,
            seeds,
            heads,
            beams: beam_inputs.clone(),
            arena: AnchorArena::new(),
            head_linkers: Vec::new(),
            head_index: HashMap::new(),
            beam_linkers: Vec::new(),
            beam_index: HashMap::new(),
            stems: HashMap::new(),
            no_stem_areas: input.no_stem_areas.clone(),
            undefined: Vec::new(),
            removed_beams: Vec::new(),
            head_inputs,
            beam_inputs,
            purged_seeds: 0,
        }
    }

    /// Phase 1: inspection then linking.
    pub fn process(&mut self) {
        self.inspect();
        self.link();
    }

    /// Allocate linkers and run every search.
    pub fn inspect(&mut self) {
        self.purged_seeds += self.purge_no_stem_seeds();

        let beams = self.beams_by(|a, b| a.left_x().total_cmp(&b.left_x()));
        for beam in &beams {
            self.create_beam_linker(*beam);
        }
        for head in self.heads.clone() {
            self.create_head_linker(head);
        }
        for beam in &beams {
            self.inspect_beam(*beam);
        }
        for head in self.heads.clone() {
            self.inspect_head(head);
        }
        debug!(
            "System#{} inspected: {} anchors, {} glyphs",
            self.info.id,
            self.arena.len(),
            self.glyphs.len()
        );
    }

    /// Link beams widest first, then heads best first.
    pub fn link(&mut self) {
        let beams = self.beams_by(|a, b| b.width().total_cmp(&a.width()));
        for beam in beams {
            if self.sig.is_removed(beam) {
                continue;
            }
            if self.link_beam_sides(beam) {
                self.link_beam_stumps(beam);
            } else {
                self.remove_beam(beam, "unlinked side");
            }
        }

        let mut heads: Vec<InterId> = self
            .heads
            .iter()
            .copied()
            .filter(|h| !self.sig.is_removed(*h))
            .collect();
        heads.sort_by(|a, b| {
            let ga = self.sig.inter(*a).grade();
            let gb = self.sig.inter(*b).grade();
            gb.total_cmp(&ga).then(a.cmp(b))
        });
        let max_profile = self.sheet.max_head_profile;
        let mut failed = Vec::new();
        for head in heads {
            if !self.link_head_sides(head, Profile::STANDARD, max_profile, false) {
                failed.push(head);
            }
        }
        for head in &failed {
            self.link_head_sides(*head, Profile::STANDARD, max_profile, true);
        }
        debug!(
            "System#{} linked: {} stems, {} heads retried in append mode",
            self.info.id,
            self.sig.stems().count(),
            failed.len()
        );
    }

    /// Live beams, stable-sorted with `cmp`.
    fn beams_by<F>(&self, cmp: F) -> Vec<InterId>
    where
        F: Fn(&crate::sig::Beam, &crate::sig::Beam) -> std::cmp::Ordering,
    {
        let mut beams: Vec<InterId> = self
            .beams
            .iter()
            .copied()
            .filter(|b| self.sig.beam(*b).is_some())
            .collect();
        beams.sort_by(|a, b| match (self.sig.beam(*a), self.sig.beam(*b)) {
            (Some(x), Some(y)) => cmp(x, y).then(a.cmp(b)),
            _ => a.cmp(b),
        });
        beams
    }

    pub(crate) fn remove_beam(&mut self, beam: InterId, reason: &str) {
        if self.sig.is_removed(beam) {
            return;
        }
        if self.is_vip(beam) {
            info!("VIP System#{} removing beam {:?}: {reason}", self.info.id, beam);
        } else {
            debug!("System#{} removing beam {:?}: {reason}", self.info.id, beam);
        }
        self.sig.remove(beam);
        self.removed_beams.push(beam);
        if let Some(linker) = self.beam_linker(beam) {
            let anchors = linker.anchor_ids();
            for anchor in anchors {
                self.arena.set_closed(anchor);
            }
        }
    }

    pub fn is_vip(&self, id: InterId) -> bool {
        self.sig.inter(id).is_vip()
    }

    pub(crate) fn head_linker(&self, head: InterId) -> Option<&HeadLinker> {
        self.head_index.get(&head).map(|i| &self.head_linkers[*i])
    }

    pub(crate) fn register_head_linker(&mut self, linker: HeadLinker) {
        self.head_index.insert(linker.head, self.head_linkers.len());
        self.head_linkers.push(linker);
    }

    pub(crate) fn beam_linker(&self, beam: InterId) -> Option<&BeamLinker> {
        self.beam_index.get(&beam).map(|i| &self.beam_linkers[*i])
    }

    pub(crate) fn beam_linker_mut(&mut self, beam: InterId) -> Option<&mut BeamLinker> {
        match self.beam_index.get(&beam) {
            Some(i) => self.beam_linkers.get_mut(*i),
            None => None,
        }
    }

    pub(crate) fn register_beam_linker(&mut self, linker: BeamLinker) {
        self.beam_index.insert(linker.beam, self.beam_linkers.len());
        self.beam_linkers.push(linker);
    }

    /// Item standing for `anchor` in a sequence, contributing by the part
    /// of its stump within `y_range`.
    pub(crate) fn anchor_item(&self, anchor: AnchorId, start: bool, y_range: (f64, f64)) -> StemItem {
        let a = self.arena.get(anchor);
        let owner = a.kind.owner();
        let extent = match owner {
            Owner::Head(h) => self.sig.head(h).map(|head| head.bounds),
            Owner::Beam(b) => self.sig.beam(b).map(|beam| beam.slice_at(a.ref_pt.x)),
        };
        let stump_line = a.stump.map(|g| self.glyphs.get(g).center_line());
        let contrib = stump_line
            .map(|line| y_overlap(&line, y_range).max(0.0))
            .unwrap_or(0.0);
        StemItem::linker(
            LinkerRef {
                anchor,
                owner,
                glyph: a.stump,
                extent,
                ref_pt: a.ref_pt,
                start,
            },
            stump_line,
            contrib,
        )
    }

    /// Seeds within the full-height box around `rect`, widened by the
    /// vicinity margin.
    pub(crate) fn neighbor_seeds(&self, rect: &Rect) -> Vec<GlyphId> {
        let fat = self.fat_box(rect);
        self.seeds
            .iter()
            .copied()
            .filter(|s| self.glyphs.get(*s).bounds().intersects(&fat))
            .collect()
    }

    pub(crate) fn fat_box(&self, rect: &Rect) -> Rect {
        let margin = self.sheet.params.vicinity_margin;
        Rect::new(
            rect.x - margin,
            self.info.bounds.y,
            rect.w + 2 * margin,
            self.info.bounds.h,
        )
    }

    /// Drop seeds lying on a no-stem area, returns how many went.
    pub(crate) fn purge_no_stem_seeds(&mut self) -> usize {
        if self.no_stem_areas.is_empty() {
            return 0;
        }
        let max_ratio = self.sheet.params.max_bar_overlap;
        let before = self.seeds.len();
        let glyphs = &self.glyphs;
        let areas = &self.no_stem_areas;
        let system = self.info.id;
        self.seeds.retain(|seed| {
            let bounds = glyphs.get(*seed).bounds();
            let hit = areas.iter().any(|area| match bounds.intersection(area) {
                Some(common) => {
                    let smaller = bounds.area().min(area.area()) as f64;
                    common.area() as f64 > max_ratio * smaller
                }
                None => false,
            });
            if hit {
                debug!("System#{system} seed {seed:?} purged on no-stem area");
            }
            !hit
        });
        before - self.seeds.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BeamInput, HeadInput};
    use crate::image::io::GrayImageU8;
    use crate::sheet::PartBounds;
    use crate::sig::HeadShape;

    fn info() -> SystemInfo {
        SystemInfo {
            id: 0,
            bounds: Rect::new(0, 0, 200, 200),
            parts: vec![PartBounds { top: 0, bottom: 199 }],
            staff_top: 60.0,
            staff_bottom: 140.0,
        }
    }

    #[test]
    fn seeds_are_registered_and_purged_on_no_stem_areas() {
        let mut image = GrayImageU8::blank(200, 200);
        image.fill_rect(&Rect::new(50, 20, 3, 60));
        image.fill_rect(&Rect::new(120, 20, 3, 60));
        let sheet = SheetContext::new(
            image.as_view(),
            Scale::new(20, 3, 4),
            0.0,
            &Constants::default(),
            Profile::POOR,
        );
        let input = SystemInput {
            info: info(),
            heads: vec![HeadInput {
                bounds: Rect::new(30, 80, 23, 18),
                shape: HeadShape::Black,
                grade: 0.8,
                vip: false,
            }],
            beams: vec![BeamInput {
                p1: [40.0, 20.0],
                p2: [130.0, 20.0],
                height: 10.0,
                grade: 0.9,
                hook: false,
                group: None,
                glyph: None,
                vip: false,
            }],
            seeds: vec![Rect::new(48, 18, 8, 64), Rect::new(118, 18, 8, 64), Rect::new(0, 150, 5, 5)],
            no_stem_areas: vec![Rect::new(118, 0, 6, 200)],
            exclusions: vec![(InterRef::Head(0), InterRef::Beam(0))],
        };
        let mut system = SystemContext::new(&sheet, &input);
        assert_eq!(system.seeds.len(), 2, "empty seed box must be ignored");
        assert!(system.sig.excludes(system.head_inputs[0], system.beam_inputs[0]));
        assert_eq!(system.purge_no_stem_seeds(), 1);
        assert_eq!(system.seeds.len(), 1);
        let left = system.glyphs.get(system.seeds[0]).bounds();
        assert_eq!(left.x, 50, "seed left of the barline survives");
    }
}
