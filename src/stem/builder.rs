//! Stem builder.
//!
//! For one starting anchor and direction, gathers every reachable glyph
//! (seeds, then chunks grown from loose vertical sections) and every
//! target anchor found in the lookup area, drops glyphs not aligned with
//! the others, and assembles them into a [`StemItems`] sequence.

use super::item::{StemItem, StemItems};
use super::linker::AnchorId;
use super::retriever::SystemContext;
use crate::geometry::{Area, Rect, Segment};
use crate::glyph::{Glyph, GlyphId, SectionCompound, SectionId};
use crate::sheet::{Profile, Skew};
use crate::sig::{InterId, Stem};
use log::debug;

/// Immutable result of one search.
#[derive(Clone, Debug)]
pub struct StemBuilder {
    pub anchor: AnchorId,
    pub theo_line: Segment,
    pub items: StemItems,
    pub max_profile: Profile,
}

impl StemBuilder {
    pub fn y_dir(&self) -> i32 {
        self.items.y_dir()
    }

    pub fn length(&self, profile: Profile) -> f64 {
        self.items.length(profile.min(self.max_profile))
    }

    pub fn total_length(&self) -> f64 {
        self.items.total_length()
    }

    pub fn has_heads(&self) -> bool {
        self.items.items().iter().skip(1).any(|it| it.head().is_some())
    }
}

/// What a search starts from and looks into.
#[derive(Clone, Debug)]
pub struct BuildRequest {
    pub anchor: AnchorId,
    pub y_dir: i32,
    pub theo_line: Segment,
    pub lu_area: Area,
    pub seeds: Vec<GlyphId>,
    pub targets: Vec<AnchorId>,
    /// Ordinate range `(min, max)` a glyph must overlap to contribute.
    pub y_range: (f64, f64),
    /// Box of the starting beam: seeds overlapping it vertically are skipped.
    pub start_box: Option<Rect>,
    pub max_profile: Profile,
}

/// Two glyphs are aligned when their deskewed centroids are close in
/// abscissa. Glyphs far apart vertically are deemed aligned.
pub fn are_aligned(skew: &Skew, max_dx: f64, max_dy: f64, one: &Glyph, two: &Glyph) -> bool {
    let c1 = skew.deskewed(&one.centroid());
    let c2 = skew.deskewed(&two.centroid());
    if (c1.y - c2.y).abs() > max_dy {
        return true;
    }
    (c1.x - c2.x).abs() <= max_dx
}

/// Overlap of `line` with ordinate range `(min, max)`, negative when apart.
pub(crate) fn y_overlap(line: &Segment, range: (f64, f64)) -> f64 {
    line.max_y().min(range.1) - line.min_y().max(range.0)
}

impl<'a> SystemContext<'a> {
    pub(crate) fn build_stem(&mut self, request: BuildRequest) -> StemBuilder {
        let sheet = self.sheet;
        let params = &sheet.params;
        let dir = request.y_dir as f64;
        let start_stump = self.arena.get(request.anchor).stump;
        let start_is_beam = request.start_box.is_some();

        // Heads beyond the last target head are irrelevant from a beam
        let last_head_y = if start_is_beam {
            request
                .targets
                .iter()
                .filter(|t| matches!(self.arena.get(**t).kind.owner(), super::item::Owner::Head(_)))
                .map(|t| self.arena.get(*t).ref_pt.y)
                .max_by(|a, b| (dir * a).total_cmp(&(dir * b)))
        } else {
            None
        };

        let target_stumps: Vec<GlyphId> = request
            .targets
            .iter()
            .filter_map(|t| self.arena.get(*t).stump)
            .collect();

        let mut seeds: Vec<GlyphId> = Vec::new();
        for seed in &request.seeds {
            if Some(*seed) == start_stump || target_stumps.contains(seed) || seeds.contains(seed) {
                continue;
            }
            let glyph = self.glyphs.get(*seed);
            if let Some(start_box) = request.start_box {
                if glyph.bounds().y_overlap(&start_box) > 0 {
                    continue;
                }
            }
            if let Some(y) = last_head_y {
                if dir * (glyph.center().y - y) >= 0.0 {
                    continue;
                }
            }
            seeds.push(*seed);
        }

        let chunks = self.lookup_chunks(&request, start_stump, last_head_y);
        for chunk in chunks {
            if Some(chunk) != start_stump
                && !target_stumps.contains(&chunk)
                && !seeds.contains(&chunk)
            {
                seeds.push(chunk);
            }
        }

        // Alignment filter over stump, target stumps and seeds
        let mut pool: Vec<GlyphId> = target_stumps.clone();
        pool.extend(seeds.iter().copied());
        // Top down, or bottom up
        pool.sort_by_key(|g| {
            let bounds = self.glyphs.get(*g).bounds();
            let start = if request.y_dir > 0 { bounds.y } else { -bounds.bottom() };
            (start, *g)
        });
        if let Some(stump) = start_stump {
            pool.insert(0, stump);
        }
        let kept = self.filter_unaligned(pool, start_stump);

        let mut others = Vec::new();
        for target in &request.targets {
            let anchor = self.arena.get(*target);
            if let Some(stump) = anchor.stump {
                if !kept.contains(&stump) {
                    continue;
                }
            }
            others.push(self.anchor_item(*target, false, request.y_range));
        }
        for seed in seeds.iter().filter(|s| kept.contains(s)) {
            let line = self.glyphs.get(*seed).center_line();
            let contrib = y_overlap(&line, request.y_range);
            if contrib > 0.0 {
                others.push(StemItem::glyph(*seed, line, contrib));
            }
        }

        let start = self.anchor_item(request.anchor, true, request.y_range);
        let items = StemItems::assemble(
            start,
            others,
            request.y_dir,
            request.theo_line.p1.y,
            &params.max_y_gap,
            request.max_profile,
        );
        debug!(
            "System#{} anchor {:?} dir {}: {} items, length {:.1}",
            self.info.id,
            request.anchor,
            request.y_dir,
            items.len(),
            items.total_length()
        );
        StemBuilder {
            anchor: request.anchor,
            theo_line: request.theo_line,
            items,
            max_profile: request.max_profile,
        }
    }

    /// Walk the ordered pool and remove, from every consecutive pair found
    /// unaligned, the shorter glyph. The protected glyph (starting stump)
    /// is never removed.
    fn filter_unaligned(&self, mut pool: Vec<GlyphId>, protected: Option<GlyphId>) -> Vec<GlyphId> {
        let sheet = self.sheet;
        let params = &sheet.params;
        let mut i = 0;
        while i + 1 < pool.len() {
            let (g1, g2) = (self.glyphs.get(pool[i]), self.glyphs.get(pool[i + 1]));
            if are_aligned(
                &sheet.skew,
                params.max_stem_alignment_dx,
                params.max_stem_alignment_dy,
                g1,
                g2,
            ) {
                i += 1;
                continue;
            }
            let drop_first = if Some(pool[i]) == protected {
                false
            } else if Some(pool[i + 1]) == protected {
                true
            } else {
                g1.height() < g2.height()
            };
            // The survivor is compared with the next one
            pool.remove(if drop_first { i } else { i + 1 });
        }
        pool
    }

    /// Grow glyphs from loose vertical sections close to the theoretical
    /// line.
    fn lookup_chunks(
        &mut self,
        request: &BuildRequest,
        stump: Option<GlyphId>,
        last_head_y: Option<f64>,
    ) -> Vec<GlyphId> {
        let sheet = self.sheet;
        let params = &sheet.params;
        let dir = request.y_dir as f64;
        let stump_box = stump.map(|s| self.glyphs.get(s).bounds());
        let head_boxes: Vec<Rect> = self
            .heads
            .iter()
            .filter_map(|h| self.sig.head(*h).map(|head| head.bounds))
            .collect();

        let mut candidates: Vec<SectionId> = Vec::new();
        for id in &self.sections {
            let section = &sheet.sections[id.0 as usize];
            let bounds = section.bounds();
            if section.width() > params.max_stem_thickness
                || self.seed_sections.contains(id)
                || !request.lu_area.intersects(&bounds)
            {
                continue;
            }
            if head_boxes.iter().any(|h| h.intersection(&bounds) == Some(bounds)) {
                continue;
            }
            if let Some(sb) = stump_box {
                if sb.intersects(&bounds) && bounds.h < sb.h {
                    continue;
                }
            }
            let c = section.centroid();
            if let Some(y) = last_head_y {
                if dir * (c.y - y) >= 0.0 {
                    continue;
                }
            }
            if (c.x - request.theo_line.x_at_y(c.y)).abs() > params.max_line_section_dx {
                continue;
            }
            let top = bounds.y as f64;
            let bottom = bounds.bottom() as f64;
            if bottom.min(request.y_range.1) - top.max(request.y_range.0) <= 0.0 {
                continue;
            }
            candidates.push(*id);
        }
        candidates.sort_by_key(|id| {
            let b = sheet.sections[id.0 as usize].bounds();
            (b.y, b.x)
        });

        // Chain touching sections into filaments
        let mut filaments: Vec<SectionCompound> = Vec::new();
        for id in candidates {
            let section = &sheet.sections[id.0 as usize];
            let bounds = section.bounds();
            let host = filaments.iter_mut().find(|f| {
                let fb = f.bounds();
                fb.x_overlap(&bounds) >= 0 && fb.y_overlap(&bounds) >= -1
            });
            match host {
                Some(f) => f.add(section),
                None => {
                    let mut f = SectionCompound::new();
                    f.add(section);
                    filaments.push(f);
                }
            }
        }

        let mut chunks = Vec::new();
        for mut filament in filaments {
            self.trim_wide_chunk(&mut filament, &request.theo_line);
            if let Some(glyph) = self.glyphs.register(&sheet.sections, filament.members()) {
                if !chunks.contains(&glyph) {
                    chunks.push(glyph);
                }
            }
        }
        chunks
    }

    /// Drop sections farthest from the line until the chunk is thin enough.
    fn trim_wide_chunk(&self, chunk: &mut SectionCompound, line: &Segment) {
        let sheet = self.sheet;
        let max = sheet.params.max_stem_thickness as f64;
        while chunk.mean_thickness() > max && chunk.members().len() > 1 {
            let farthest = chunk.members().iter().copied().max_by(|a, b| {
                let da = dx_to_line(&sheet.sections[a.0 as usize].centroid(), line);
                let db = dx_to_line(&sheet.sections[b.0 as usize].centroid(), line);
                da.total_cmp(&db)
            });
            match farthest {
                Some(id) => chunk.remove(&sheet.sections, id),
                None => break,
            }
        }
    }

    /// Build the union of `glyphs` and return its stem, reusing the stem
    /// already registered for that exact glyph.
    pub fn create_stem(&mut self, glyphs: &[GlyphId], profile: Profile) -> Option<InterId> {
        let sheet = self.sheet;
        let glyph = self.glyphs.union(&sheet.sections, glyphs)?;
        if let Some(stem) = self.stems.get(&glyph) {
            if !self.sig.is_removed(*stem) {
                return Some(*stem);
            }
        }
        let g = self.glyphs.get(glyph);
        let impacts = sheet.checker.check(g, profile, &sheet.ink);
        let (grade, artificial) = if impacts.grade >= sheet.checker.min_grade() {
            (impacts.grade, false)
        } else if profile >= Profile::BEAM_SIDE {
            (sheet.params.artificial_stem_grade, true)
        } else {
            debug!(
                "System#{} glyph {:?} rejected as stem at {profile} (grade {:.3})",
                self.info.id, glyph, impacts.grade
            );
            return None;
        };
        let stem = Stem {
            glyph,
            line: g.center_line(),
            bounds: g.bounds(),
            grade,
            impacts,
            artificial,
        };
        let id = self.sig.add_stem(stem);
        self.stems.insert(glyph, id);
        debug!(
            "System#{} stem {:?} from {:?} grade {:.3}{}",
            self.info.id,
            id,
            glyph,
            grade,
            if artificial { " (artificial)" } else { "" }
        );
        Some(id)
    }
}

fn dx_to_line(p: &crate::geometry::Point, line: &Segment) -> f64 {
    (p.x - line.x_at_y(p.y)).abs()
}
