//! Beam linker.
//!
//! A beam offers anchors on its sides and on interior stumps, i.e. seeds
//! that cross the beam and stick out of its group. Each anchor may search
//! up and down (a VLinker): the area runs from the beam border to the part
//! limit or to the first alien beam, and collects sibling beams, heads and
//! seeds.
//!
//! Linking resolves both sides first. A non-hook beam must link every side
//! anchor it has, otherwise it is removed; stumps are linked afterwards.

use super::builder::{BuildRequest, StemBuilder};
use super::head_linker::provisional_stem;
use super::item::{ItemKind, Owner};
use super::linker::{lookup_area, theoretical_line, AnchorId, AnchorKind, Search};
use super::retriever::SystemContext;
use crate::geometry::{Area, Point, Rect, Segment};
use crate::glyph::{GlyphId, SectionCompound, SectionId};
use crate::sheet::{HorizontalSide, Profile, VerticalSide};
use crate::sig::relation::beam_portion;
use crate::sig::{Beam, BeamStemRelation, HeadStemRelation, InterId, Relation, StemPortion};
use log::{debug, info, warn};
use std::sync::Arc;

/// Anchor of a beam with the directions it searches.
#[derive(Clone, Debug)]
pub struct BeamAnchor {
    pub id: AnchorId,
    pub directions: Vec<VerticalSide>,
}

#[derive(Clone, Debug)]
pub struct BeamLinker {
    pub beam: InterId,
    /// Seeds in the beam vicinity.
    pub seeds: Vec<GlyphId>,
    pub anchors: Vec<BeamAnchor>,
    /// Side anchors by [`HorizontalSide::index`].
    pub sides: [Option<AnchorId>; 2],
}

impl BeamLinker {
    pub fn anchor_ids(&self) -> Vec<AnchorId> {
        self.anchors.iter().map(|a| a.id).collect()
    }

    pub fn is_side(&self, anchor: AnchorId) -> bool {
        self.sides.contains(&Some(anchor))
    }
}

impl<'a> SystemContext<'a> {
    pub(crate) fn create_beam_linker(&mut self, beam: InterId) {
        let Some(b) = self.sig.beam(beam).cloned() else {
            return;
        };
        let seeds = self.neighbor_seeds(&b.bounds());
        let stumps = self.beam_stumps(&b, &seeds);
        let sheet = self.sheet;
        let scale = sheet.scale;
        let constants = &sheet.params.beam_stem;

        let mut linker = BeamLinker {
            beam,
            seeds,
            anchors: Vec::new(),
            sides: [None, None],
        };
        let mut used: Vec<GlyphId> = Vec::new();
        for hs in HorizontalSide::BOTH {
            let candidate = match hs {
                HorizontalSide::Left => stumps.first(),
                HorizontalSide::Right => stumps.last(),
            }
            .filter(|(_, cross)| beam_portion(&b, cross.x, &scale, constants).side() == Some(hs))
            .map(|(g, _)| *g)
            .filter(|g| !used.contains(g));
            let stump = candidate.or_else(|| self.side_stump(&b, hs));

            let side_x = match hs {
                HorizontalSide::Left => b.left_x(),
                HorizontalSide::Right => b.right_x(),
            };
            // A stump inside the group keeps an anchor without search
            let (ref_pt, directions) = match stump {
                Some(g) => {
                    used.push(g);
                    let line = self.glyphs.get(g).center_line();
                    let ref_pt = line
                        .intersection(&b.median)
                        .unwrap_or_else(|| b.median.point_at_x(side_x));
                    (ref_pt, self.stump_directions(beam, g, ref_pt.x))
                }
                None => {
                    if !self.is_outer_at(beam, side_x) {
                        continue;
                    }
                    let half = 0.5 * sheet.params.main_stem_thickness as f64;
                    let x = side_x - hs.direction() as f64 * half;
                    (b.median.point_at_x(x), VerticalSide::BOTH.to_vec())
                }
            };
            let state = self.arena.new_state();
            let id = self.arena.add(AnchorKind::BeamSide { beam, h_side: hs }, ref_pt, stump, state);
            linker.sides[hs.index()] = Some(id);
            linker.anchors.push(BeamAnchor { id, directions });
        }

        for (glyph, cross) in stumps {
            if used.contains(&glyph) {
                continue;
            }
            let directions = self.stump_directions(beam, glyph, cross.x);
            let state = self.arena.new_state();
            let id = self.arena.add(AnchorKind::BeamStump { beam }, cross, Some(glyph), state);
            linker.anchors.push(BeamAnchor { id, directions });
        }

        if b.vip {
            info!(
                "VIP System#{} beam {:?}: {} anchors, sides {:?}",
                self.info.id,
                beam,
                linker.anchors.len(),
                linker.sides
            );
        }
        self.register_beam_linker(linker);
    }

    /// Seeds crossing the beam seed area, sorted by abscissa of their
    /// crossing with the median, too close pairs being purged.
    fn beam_stumps(&self, b: &Beam, seeds: &[GlyphId]) -> Vec<(GlyphId, Point)> {
        let sheet = self.sheet;
        let params = &sheet.params;
        let dx = params.max_beam_seed_dx;
        let dy = params.beam_seed_dy(&sheet.scale, Profile::BEAM_SEED);
        let left = b.median.point_at_x(b.left_x() - dx);
        let right = b.median.point_at_x(b.right_x() + dx);
        let area = Area::horizontal_parallelogram(left, right, b.height + 2.0 * dy);

        let mut found: Vec<(GlyphId, Point)> = seeds
            .iter()
            .filter(|s| self.glyphs.get(**s).intersects(&area))
            .filter_map(|s| {
                let cross = self.glyphs.get(*s).center_line().intersection(&b.median)?;
                (cross.x >= left.x && cross.x <= right.x).then_some((*s, cross))
            })
            .collect();
        found.sort_by(|a, b| a.1.x.total_cmp(&b.1.x).then(a.0.cmp(&b.0)));

        let mut kept: Vec<(GlyphId, Point)> = Vec::new();
        for (glyph, cross) in found {
            let Some((prev, prev_cross)) = kept.last().copied() else {
                kept.push((glyph, cross));
                continue;
            };
            if cross.x - prev_cross.x >= params.min_beam_stems_dx {
                kept.push((glyph, cross));
                continue;
            }
            let (g1, g2) = (self.glyphs.get(prev), self.glyphs.get(glyph));
            let replace = if g1.bounds().y_overlap(&g2.bounds()) > 0 {
                g2.height() > g1.height()
            } else {
                let d1 = (g1.center().y - b.median.y_at_x(g1.center().x)).abs();
                let d2 = (g2.center().y - b.median.y_at_x(g2.center().x)).abs();
                d2 < d1
            };
            if replace {
                kept.pop();
                kept.push((glyph, cross));
            }
        }
        kept
    }

    /// Build a stump from thin sections at the beam end on `side`.
    fn side_stump(&mut self, b: &Beam, side: HorizontalSide) -> Option<GlyphId> {
        let sheet = self.sheet;
        let params = &sheet.params;
        let max_width = params.max_stem_thickness;
        let (x0, x1) = match side {
            HorizontalSide::Left => (
                b.left_x() - params.stump_area_dx_out,
                b.left_x() + params.stump_area_dx_in + max_width as f64,
            ),
            HorizontalSide::Right => (
                b.right_x() - params.stump_area_dx_in - max_width as f64,
                b.right_x() + params.stump_area_dx_out,
            ),
        };
        let side_x = 0.5 * (x0 + x1);
        let y_mid = b.median.y_at_x(side_x);
        let half = 0.5 * b.height + params.stump_area_dy_half;
        let area = Rect::new(
            x0.floor() as i32,
            (y_mid - half).floor() as i32,
            (x1 - x0).ceil() as i32,
            (2.0 * half).ceil() as i32,
        );

        let mut candidates: Vec<SectionId> = self
            .sections
            .iter()
            .copied()
            .filter(|id| {
                let section = &sheet.sections[id.0 as usize];
                section.width() <= max_width && section.bounds().h >= 2 && section.bounds().intersects(&area)
            })
            .collect();
        // Outermost sections first
        candidates.sort_by(|a, b| {
            let xa = sheet.sections[a.0 as usize].centroid().x;
            let xb = sheet.sections[b.0 as usize].centroid().x;
            let (ka, kb) = match side {
                HorizontalSide::Left => (xa, xb),
                HorizontalSide::Right => (-xa, -xb),
            };
            ka.total_cmp(&kb).then(a.cmp(b))
        });

        let mut compound = SectionCompound::new();
        for id in candidates {
            let section = &sheet.sections[id.0 as usize];
            let mut trial = compound.clone();
            trial.add(section);
            if trial.width() <= max_width {
                compound = trial;
            }
        }
        if compound.members().is_empty() {
            return None;
        }
        let glyph = self.glyphs.register(&sheet.sections, compound.members())?;
        debug!(
            "System#{} beam side {:?} stump {:?} from {} sections",
            self.info.id,
            side,
            glyph,
            compound.members().len()
        );
        Some(glyph)
    }

    /// Whether `a` and `b` stand for the same beam glyph.
    fn same_beam(&self, a: InterId, b: InterId) -> bool {
        if a == b {
            return true;
        }
        match (self.sig.beam(a), self.sig.beam(b)) {
            (Some(x), Some(y)) => x.same_glyph(y),
            _ => false,
        }
    }

    /// Live beams of the group of `beam` found at abscissa `x`, top down.
    pub(crate) fn sibling_beams_at(&self, beam: InterId, x: f64) -> Vec<InterId> {
        let params = &self.sheet.params;
        let Some(group) = self.sig.beam(beam).map(|b| b.group) else {
            return Vec::new();
        };
        let mut siblings: Vec<(InterId, f64)> = self
            .beams
            .iter()
            .filter(|id| !self.sig.is_removed(**id))
            .filter_map(|id| {
                let b = self.sig.beam(*id)?;
                (b.group == group
                    && x >= b.left_x() - params.max_beam_side_dx
                    && x <= b.right_x() + params.max_beam_side_dx)
                    .then(|| (*id, b.median.y_at_x(x)))
            })
            .collect();
        siblings.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        siblings.into_iter().map(|(id, _)| id).collect()
    }

    /// Directions a stump sticks out of the beam group.
    fn stump_directions(&self, beam: InterId, stump: GlyphId, x: f64) -> Vec<VerticalSide> {
        let params = &self.sheet.params;
        let siblings = self.sibling_beams_at(beam, x);
        let (Some(first), Some(last)) = (siblings.first().copied(), siblings.last().copied()) else {
            return Vec::new();
        };
        let bounds = self.glyphs.get(stump).bounds();
        let mut directions = Vec::new();
        if self.same_beam(first, beam) {
            if let Some(b1) = self.sig.beam(first) {
                let top = b1.border(VerticalSide::Top).y_at_x(x);
                if bounds.y as f64 <= top - params.min_beam_stump_dy {
                    directions.push(VerticalSide::Top);
                }
            }
        }
        if self.same_beam(last, beam) {
            if let Some(b2) = self.sig.beam(last) {
                let bottom = b2.border(VerticalSide::Bottom).y_at_x(x);
                if bounds.bottom() as f64 >= bottom + params.min_beam_stump_dy {
                    directions.push(VerticalSide::Bottom);
                }
            }
        }
        directions
    }

    /// Whether `beam` is the first or last member of its group at `x`.
    fn is_outer_at(&self, beam: InterId, x: f64) -> bool {
        let siblings = self.sibling_beams_at(beam, x);
        siblings.first().is_some_and(|b| self.same_beam(*b, beam))
            || siblings.last().is_some_and(|b| self.same_beam(*b, beam))
    }

    /// Anchor of `beam` where `line` crosses it: the closest existing one,
    /// or a new ad-hoc anchor.
    pub(crate) fn find_beam_anchor(&mut self, beam: InterId, line: &Segment) -> Option<AnchorId> {
        let cross = line.intersection(&self.sig.beam(beam)?.median)?;
        let max_dx = self.sheet.params.max_beam_linker_dx;
        let linker = self.beam_linker(beam)?;
        let nearest = linker
            .anchors
            .iter()
            .map(|a| (a.id, (self.arena.get(a.id).ref_pt.x - cross.x).abs()))
            .filter(|(_, dx)| *dx <= max_dx)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        if let Some((id, _)) = nearest {
            return Some(id);
        }
        let state = self.arena.new_state();
        let id = self.arena.add(AnchorKind::AdHoc { beam }, cross, None, state);
        self.beam_linker_mut(beam)?.anchors.push(BeamAnchor {
            id,
            directions: Vec::new(),
        });
        Some(id)
    }

    pub(crate) fn inspect_beam(&mut self, beam: InterId) {
        let Some(linker) = self.beam_linker(beam).cloned() else {
            return;
        };
        for anchor in &linker.anchors {
            let profile = if linker.is_side(anchor.id) {
                Profile::BEAM_SIDE
            } else {
                Profile::BEAM_SEED
            };
            for vs in &anchor.directions {
                self.inspect_vlinker(beam, &linker, anchor.id, *vs, profile);
            }
        }
    }

    /// First alien beam crossing `theo_line`: not in the group, not a hook.
    fn first_alien(&self, beam: &Beam, beam_id: InterId, theo_line: &Segment, y_dir: i32) -> Option<(InterId, Point)> {
        let params = &self.sheet.params;
        let dir = y_dir as f64;
        let ref_y = theo_line.p1.y;
        let reach = dir * (theo_line.p2.y - ref_y);
        let mut best: Option<(InterId, Point, f64)> = None;
        for id in &self.beams {
            if *id == beam_id || self.sig.is_removed(*id) {
                continue;
            }
            let Some(other) = self.sig.beam(*id) else {
                continue;
            };
            if other.group == beam.group || other.hook {
                continue;
            }
            let Some(cross) = theo_line.intersection(&other.median) else {
                continue;
            };
            if cross.x < other.left_x() || cross.x > other.right_x() {
                continue;
            }
            let dy = dir * (cross.y - ref_y);
            if dy <= 0.0 || dy > reach {
                continue;
            }
            let side_dx = (other.left_x() - beam.left_x())
                .abs()
                .min((other.right_x() - beam.right_x()).abs());
            if dy <= params.max_beam_group_dy && side_dx < params.max_beam_side_dx {
                continue;
            }
            if best.as_ref().map_or(true, |b| dy < b.2) {
                best = Some((*id, cross, dy));
            }
        }
        best.map(|(id, cross, _)| (id, cross))
    }

    fn inspect_vlinker(
        &mut self,
        beam: InterId,
        linker: &BeamLinker,
        anchor: AnchorId,
        v_side: VerticalSide,
        profile: Profile,
    ) {
        let sheet = self.sheet;
        let params = &sheet.params;
        let Some(b) = self.sig.beam(beam).cloned() else {
            return;
        };
        let ref_pt = self.arena.get(anchor).ref_pt;
        let y_dir = v_side.direction();
        let dir = y_dir as f64;

        let mut y_limit = self.info.part_limit(&ref_pt, y_dir);
        let mut theo_line = theoretical_line(&sheet.skew, ref_pt, y_limit);
        if let Some((alien, cross)) = self.first_alien(&b, beam, &theo_line, y_dir) {
            if let Some(other) = self.sig.beam(alien) {
                y_limit = other.border(v_side.opposite()).y_at_x(cross.x);
                theo_line = theoretical_line(&sheet.skew, ref_pt, y_limit);
            }
        }

        let border = b.border(v_side);
        let shift = params.beam_seed_dy(&sheet.scale, profile);
        let xl = ref_pt.x - params.half_beam_lu_dx;
        let xr = ref_pt.x + params.half_beam_lu_dx;
        let pl = Point::new(xl, border.y_at_x(xl) - dir * shift);
        let pr = Point::new(xr, border.y_at_x(xr) - dir * shift);
        let lu_area = lookup_area(&sheet.skew, pl, pr, y_limit, y_dir, params.slope_margin);

        // Sibling beams further in the search direction
        let siblings: Vec<InterId> = self
            .sibling_beams_at(beam, ref_pt.x)
            .into_iter()
            .filter(|s| !self.same_beam(*s, beam))
            .filter(|s| {
                self.sig
                    .beam(*s)
                    .is_some_and(|sb| dir * (sb.median.y_at_x(ref_pt.x) - ref_pt.y) > 0.0)
            })
            .collect();
        let mut group_end = border.y_at_x(ref_pt.x);
        for s in &siblings {
            if let Some(sb) = self.sig.beam(*s) {
                let y = sb.border(v_side).y_at_x(ref_pt.x);
                if dir * (y - group_end) > 0.0 {
                    group_end = y;
                }
            }
        }
        let mut targets = Vec::new();
        for s in &siblings {
            if let Some(a) = self.find_beam_anchor(*s, &theo_line) {
                targets.push(a);
            }
        }

        let mut group: Vec<InterId> = siblings.clone();
        group.push(beam);
        let imposed = if y_dir > 0 {
            HorizontalSide::Right
        } else {
            HorizontalSide::Left
        };
        for head in &self.heads {
            let Some(h) = self.sig.head(*head) else {
                continue;
            };
            if h.shape.is_small() || group.iter().any(|g| self.sig.excludes(*g, *head)) {
                continue;
            }
            let Some(head_linker) = self.head_linker(*head) else {
                continue;
            };
            for hs in HorizontalSide::BOTH {
                if h.shape.is_void() && hs != imposed {
                    continue;
                }
                let corner = head_linker.corner(hs, v_side.opposite());
                let pt = self.arena.get(corner).ref_pt;
                if dir * (pt.y - group_end) >= params.min_beam_head_dy && lu_area.contains(&pt) {
                    targets.push(corner);
                }
            }
        }

        let seeds = linker
            .seeds
            .iter()
            .copied()
            .filter(|s| self.glyphs.get(*s).intersects(&lu_area))
            .collect();
        let beam_y = border.y_at_x(ref_pt.x);
        let y_range = if y_dir > 0 {
            (beam_y, y_limit)
        } else {
            (y_limit, beam_y)
        };
        let builder = self.build_stem(BuildRequest {
            anchor,
            y_dir,
            theo_line,
            lu_area: lu_area.clone(),
            seeds,
            targets,
            y_range,
            start_box: Some(b.slice_at(ref_pt.x)),
            max_profile: Profile::MAX,
        });
        if b.vip {
            info!(
                "VIP System#{} beam {:?} anchor {:?} {:?}: {} items, heads {}",
                self.info.id,
                beam,
                anchor,
                v_side,
                builder.items.len(),
                builder.has_heads()
            );
        }
        self.arena.set_search(
            anchor,
            v_side,
            Search {
                y_dir,
                lu_area,
                theo_line,
                builder: Some(Arc::new(builder)),
            },
        );
    }

    /// Index of the head item the stem departing from the beam should stop
    /// at, if any.
    pub(crate) fn expand(&self, builder: &StemBuilder, profile: Profile) -> Option<usize> {
        let sheet = self.sheet;
        let params = &sheet.params;
        let items = &builder.items;
        let y_dir = items.y_dir();
        let dir = y_dir as f64;
        let ref_y = builder.theo_line.p1.y;
        let imposed = if y_dir > 0 {
            HorizontalSide::Right
        } else {
            HorizontalSide::Left
        };
        let end_portion = if y_dir > 0 {
            StemPortion::Bottom
        } else {
            StemPortion::Top
        };

        let mut tolerance = params.max_y_gap.get(profile);
        let mut stop: Option<usize> = None;
        for i in 1..items.len() {
            let item = items.get(i);
            match &item.kind {
                ItemKind::Gap => {
                    if item.contrib > tolerance {
                        if stop.is_none() {
                            return None;
                        }
                        break;
                    }
                }
                ItemKind::Glyph(_) => {}
                ItemKind::Linker(linker) => {
                    let Owner::Head(head) = linker.owner else {
                        continue;
                    };
                    let AnchorKind::HeadCorner { h_side, .. } = self.arena.get(linker.anchor).kind else {
                        continue;
                    };
                    let Some(h) = self.sig.head(head) else {
                        continue;
                    };
                    if let Some(s) = stop {
                        let gap = items.last_gap_before(i).filter(|g| *g > s);
                        let short = gap.is_some_and(|g| items.get(g).contrib < params.min_linker_length);
                        let away = self.head_linker(head).map(|l| l.corner(h_side.opposite(), VerticalSide::of(y_dir)));
                        if short && away.is_some_and(|c| self.has_concrete_start(c, profile)) {
                            break;
                        }
                    }
                    // Stem from the beam down (or up) to the head reference
                    let span = (ref_y.min(linker.ref_pt.y), ref_y.max(linker.ref_pt.y));
                    let (line, bounds) = provisional_stem(&builder.theo_line, span, params.main_stem_thickness);
                    let Some(rel) =
                        HeadStemRelation::check(h, h_side, &line, &bounds, &sheet.scale, &params.head_stem, profile)
                    else {
                        continue;
                    };
                    if h_side == imposed && rel.portion == end_portion && dir * (linker.ref_pt.y - ref_y) > 0.0 {
                        stop = Some(i);
                        tolerance = tolerance.min(params.max_y_gap.get(Profile::STANDARD));
                    }
                }
            }
        }
        stop
    }

    /// Link one beam anchor search. Linking an already linked anchor is a
    /// no-op.
    fn link_vlinker(&mut self, beam: InterId, anchor: AnchorId, v_side: VerticalSide, profile: Profile) -> bool {
        if self.arena.is_linked(anchor) {
            return true;
        }
        let Some(builder) = self.arena.builder(anchor, v_side) else {
            return false;
        };
        if !builder.has_heads() {
            return false;
        }
        let Some(stop) = self.expand(&builder, profile) else {
            return false;
        };
        let items = &builder.items;
        let y_dir = items.y_dir();
        let sheet = self.sheet;
        let params = &sheet.params;

        // A head already linked on that side brings its stem
        let reused = items.get(stop).linker_ref().and_then(|l| {
            let AnchorKind::HeadCorner { head, h_side, .. } = self.arena.get(l.anchor).kind else {
                return None;
            };
            if !self.arena.is_linked(l.anchor) {
                return None;
            }
            let stems: Vec<InterId> = self
                .sig
                .head_stems(head)
                .into_iter()
                .filter(|(_, _, rel)| rel.head_side == h_side)
                .map(|(_, s, _)| s)
                .collect();
            (stems.len() == 1).then(|| stems[0])
        });
        let stem = match reused {
            Some(stem) => stem,
            None => {
                let glyphs = items.glyphs_until(stop);
                if glyphs.is_empty() {
                    return false;
                }
                match self.create_stem(&glyphs, profile) {
                    Some(stem) => stem,
                    None => return false,
                }
            }
        };
        let Some(grade) = self.connect_beam_stem(beam, stem, y_dir, profile) else {
            debug!(
                "System#{} beam {:?} anchor {:?}: no relation with stem {:?}",
                self.info.id, beam, anchor, stem
            );
            return false;
        };
        self.arena.set_linked(anchor);
        self.link_siblings(beam, stem, y_dir, grade);

        let Some((line, bounds)) = self.sig.stem(stem).map(|s| (s.line, s.bounds)) else {
            return true;
        };
        for item in items.items().iter().take(stop + 1).skip(1) {
            let Some(linker) = item.linker_ref() else {
                continue;
            };
            let AnchorKind::HeadCorner { head, h_side, .. } = self.arena.get(linker.anchor).kind else {
                continue;
            };
            let Some(h) = self.sig.head(head).cloned() else {
                continue;
            };
            if let Some(rel) =
                HeadStemRelation::check(&h, h_side, &line, &bounds, &sheet.scale, &params.head_stem, profile)
            {
                self.connect_head_stem(head, stem, rel);
                self.arena.set_linked(linker.anchor);
            }
        }
        if self.is_vip(beam) {
            info!(
                "VIP System#{} beam {:?} anchor {:?} {:?} linked to stem {:?} at {profile}",
                self.info.id, beam, anchor, v_side, stem
            );
        }
        true
    }

    /// Add the beam-stem relation, returning its grade.
    pub(crate) fn connect_beam_stem(&mut self, beam: InterId, stem: InterId, y_dir: i32, profile: Profile) -> Option<f64> {
        if self.sig.is_removed(beam) {
            warn!("System#{} beam {:?} is removed, no link with stem {:?}", self.info.id, beam, stem);
            return None;
        }
        if let Some((_, Relation::BeamStem(rel))) = self.sig.relation(beam, stem) {
            return Some(rel.grade);
        }
        let sheet = self.sheet;
        let b = self.sig.beam(beam)?;
        let s = self.sig.stem(stem)?;
        let rel = BeamStemRelation::check(
            b,
            &s.line,
            &s.bounds,
            y_dir,
            &sheet.scale,
            &sheet.params.beam_stem,
            profile,
        )?;
        let grade = rel.grade;
        self.sig.add_edge(beam, stem, Relation::BeamStem(rel))?;
        Some(grade)
    }

    /// Give every other beam of the group crossed by `stem` the same
    /// relation grade.
    pub(crate) fn link_siblings(&mut self, beam: InterId, stem: InterId, y_dir: i32, grade: f64) {
        let sheet = self.sheet;
        let params = &sheet.params;
        let Some(b) = self.sig.beam(beam).cloned() else {
            return;
        };
        let Some((line, bounds)) = self.sig.stem(stem).map(|s| (s.line, s.bounds)) else {
            return;
        };
        let Some(cross) = line.intersection(&b.median) else {
            return;
        };
        let dir = y_dir as f64;
        let beam_y = cross.y;
        for sibling in self.sibling_beams_at(beam, cross.x) {
            if sibling == beam || self.sig.relation(sibling, stem).is_some() {
                continue;
            }
            let Some(sb) = self.sig.beam(sibling) else {
                continue;
            };
            let y = sb.median.y_at_x(cross.x);
            let within = y >= bounds.y as f64 - 0.5 * sb.height && y <= bounds.bottom() as f64 + 0.5 * sb.height;
            let behind = dir * (y - beam_y) < 0.0 && (y - beam_y).abs() <= params.max_beam_group_dy;
            if !within && !behind {
                continue;
            }
            let Some(rel) = BeamStemRelation::sibling(sb, &line, y_dir, grade, &sheet.scale, &params.beam_stem) else {
                continue;
            };
            if self.sig.add_edge(sibling, stem, Relation::BeamStem(rel)).is_some() {
                if let Some(anchor) = self.find_beam_anchor(sibling, &line) {
                    self.arena.set_linked(anchor);
                }
            }
        }
    }

    fn link_beam_anchor(&mut self, beam: InterId, anchor: AnchorId, profile: Profile) -> bool {
        if self.arena.is_linked(anchor) {
            return true;
        }
        let mut sides = self.arena.search_sides(anchor);
        if sides.is_empty() {
            return true;
        }
        sides.sort_by(|a, b| {
            let la = self.arena.builder(anchor, *a).map_or(0.0, |x| x.total_length());
            let lb = self.arena.builder(anchor, *b).map_or(0.0, |x| x.total_length());
            lb.total_cmp(&la).then(a.cmp(b))
        });
        sides
            .into_iter()
            .any(|vs| self.link_vlinker(beam, anchor, vs, profile))
    }

    /// Link both side anchors of `beam`. False means the beam must go.
    pub(crate) fn link_beam_sides(&mut self, beam: InterId) -> bool {
        let Some(b) = self.sig.beam(beam).cloned() else {
            return false;
        };
        let Some(linker) = self.beam_linker(beam).cloned() else {
            return false;
        };
        let rivals: Vec<InterId> = self
            .beams
            .iter()
            .copied()
            .filter(|id| *id != beam)
            .filter(|id| self.sig.beam(*id).is_some_and(|o| o.same_glyph(&b)))
            .collect();
        let hook_rivals: Vec<InterId> = rivals
            .iter()
            .copied()
            .filter(|id| self.sig.beam(*id).is_some_and(|o| o.hook))
            .collect();
        let profile = if b.hook || !hook_rivals.is_empty() {
            self.sheet.max_head_profile
        } else {
            Profile::BEAM_SIDE
        };

        let mut linked = 0;
        for hs in HorizontalSide::BOTH {
            let Some(anchor) = linker.sides[hs.index()] else {
                continue;
            };
            if self.link_beam_anchor(beam, anchor, profile) {
                linked += 1;
            } else if !b.hook {
                debug!("System#{} beam {:?} {:?} side unlinked", self.info.id, beam, hs);
                return false;
            }
        }
        if b.hook && linked == 0 {
            return false;
        }
        if !b.hook && linked == 2 {
            for hook in hook_rivals {
                self.remove_beam(hook, "competing beam linked on both sides");
            }
        }
        true
    }

    pub(crate) fn link_beam_stumps(&mut self, beam: InterId) {
        let Some(linker) = self.beam_linker(beam).cloned() else {
            return;
        };
        for anchor in &linker.anchors {
            if linker.is_side(anchor.id) || anchor.directions.is_empty() {
                continue;
            }
            self.link_beam_anchor(beam, anchor.id, Profile::BEAM_SEED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BeamInput, HeadInput, SystemInput};
    use crate::image::io::GrayImageU8;
    use crate::sheet::{PartBounds, Scale, SystemInfo};
    use crate::sig::HeadShape;
    use crate::stem::params::Constants;
    use crate::stem::retriever::SheetContext;

    fn info() -> SystemInfo {
        SystemInfo {
            id: 0,
            bounds: Rect::new(0, 0, 300, 240),
            parts: vec![PartBounds { top: 0, bottom: 239 }],
            staff_top: 80.0,
            staff_bottom: 160.0,
        }
    }

    fn beam_input(x0: f64, x1: f64, y: f64) -> BeamInput {
        BeamInput {
            p1: [x0, y],
            p2: [x1, y],
            height: 10.0,
            grade: 0.8,
            hook: false,
            group: Some(0),
            glyph: None,
            vip: false,
        }
    }

    #[test]
    fn beam_without_stems_is_removed() {
        let mut image = GrayImageU8::blank(300, 240);
        image.fill_band(Point::new(100.0, 40.0), Point::new(200.0, 40.0), 10.0);
        let sheet = SheetContext::new(
            image.as_view(),
            Scale::new(20, 3, 4),
            0.0,
            &Constants::default(),
            Profile::POOR,
        );
        let input = SystemInput {
            info: info(),
            heads: Vec::new(),
            beams: vec![beam_input(100.0, 200.0, 40.0)],
            seeds: Vec::new(),
            no_stem_areas: Vec::new(),
            exclusions: Vec::new(),
        };
        let mut system = SystemContext::new(&sheet, &input);
        system.inspect();
        let beam = system.beam_inputs[0];
        let linker = system.beam_linker(beam).expect("linker");
        assert!(linker.sides.iter().all(|s| s.is_some()), "outer beam gets side anchors");
        assert!(!system.link_beam_sides(beam));
        system.link();
        assert!(system.sig.is_removed(beam));
        assert_eq!(system.removed_beams, vec![beam]);
    }

    #[test]
    fn stumps_point_out_of_the_group() {
        let mut image = GrayImageU8::blank(300, 240);
        image.fill_band(Point::new(100.0, 40.0), Point::new(200.0, 40.0), 10.0);
        image.fill_band(Point::new(100.0, 56.0), Point::new(200.0, 56.0), 10.0);
        // Stem from upper beam down to a head
        image.fill_rect(&Rect::new(150, 35, 3, 80));
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
                bounds: Rect::new(130, 108, 23, 16),
                shape: HeadShape::Black,
                grade: 0.7,
                vip: false,
            }],
            beams: vec![beam_input(100.0, 200.0, 40.0), beam_input(100.0, 200.0, 56.0)],
            seeds: vec![Rect::new(148, 30, 8, 90)],
            no_stem_areas: Vec::new(),
            exclusions: Vec::new(),
        };
        let mut system = SystemContext::new(&sheet, &input);
        system.inspect();
        let (upper, lower) = (system.beam_inputs[0], system.beam_inputs[1]);
        assert_eq!(system.sibling_beams_at(lower, 150.0), vec![upper, lower]);
        let stump = system.seeds[0];
        assert!(system.stump_directions(upper, stump, 151.0).is_empty());
        assert_eq!(system.stump_directions(lower, stump, 151.0), vec![VerticalSide::Bottom]);
    }

    /// Two heads under a pair of beams of one group, with a stem each.
    fn double_beam_input(extra: Vec<BeamInput>) -> (GrayImageU8, SystemInput) {
        let mut image = GrayImageU8::blank(300, 240);
        image.fill_ellipse(&Rect::new(100, 130, 23, 18));
        image.fill_ellipse(&Rect::new(180, 120, 23, 18));
        image.fill_rect(&Rect::new(123, 40, 3, 98));
        image.fill_rect(&Rect::new(203, 40, 3, 88));
        image.fill_band(Point::new(123.0, 45.0), Point::new(206.0, 45.0), 10.0);
        image.fill_band(Point::new(123.0, 61.0), Point::new(206.0, 61.0), 10.0);
        let head = |bounds| HeadInput {
            bounds,
            shape: HeadShape::Black,
            grade: 0.7,
            vip: false,
        };
        let mut beams = vec![beam_input(123.0, 206.0, 45.0), beam_input(123.0, 206.0, 61.0)];
        beams.extend(extra);
        let input = SystemInput {
            info: info(),
            heads: vec![head(Rect::new(100, 130, 23, 18)), head(Rect::new(180, 120, 23, 18))],
            beams,
            seeds: vec![Rect::new(120, 36, 9, 104), Rect::new(200, 36, 6, 94)],
            no_stem_areas: Vec::new(),
            exclusions: Vec::new(),
        };
        (image, input)
    }

    fn sheet(image: &GrayImageU8) -> SheetContext<'_> {
        SheetContext::new(
            image.as_view(),
            Scale::new(20, 3, 4),
            0.0,
            &Constants::default(),
            Profile::POOR,
        )
    }

    #[test]
    fn inner_beam_sides_link_without_search() {
        let (image, input) = double_beam_input(Vec::new());
        let sheet = sheet(&image);
        let mut system = SystemContext::new(&sheet, &input);
        system.inspect();
        let (upper, lower) = (system.beam_inputs[0], system.beam_inputs[1]);
        let linker = system.beam_linker(upper).cloned().expect("linker");
        for side in linker.sides {
            let anchor = side.expect("side anchor");
            assert!(system.arena.search_sides(anchor).is_empty());
        }
        let lower_linker = system.beam_linker(lower).cloned().expect("linker");
        for side in lower_linker.sides {
            let anchor = side.expect("side anchor");
            assert_eq!(system.arena.search_sides(anchor), vec![VerticalSide::Bottom]);
        }

        system.link();
        assert!(system.removed_beams.is_empty());
        assert_eq!(system.sig.stems().count(), 2);
        for beam in [upper, lower] {
            assert!(!system.sig.is_removed(beam));
            assert_eq!(system.sig.beam_stems(beam).len(), 2);
        }
        for head in system.head_inputs.clone() {
            assert_eq!(system.sig.head_stems(head).len(), 1);
        }
    }

    #[test]
    fn linked_side_anchor_links_once() {
        let (image, input) = double_beam_input(Vec::new());
        let sheet = sheet(&image);
        let mut system = SystemContext::new(&sheet, &input);
        system.process();
        let lower = system.beam_inputs[1];
        let anchor = system
            .beam_linker(lower)
            .and_then(|l| l.sides[HorizontalSide::Left.index()])
            .expect("left side");
        assert!(system.arena.is_linked(anchor));

        let edges = system.sig.edges().count();
        let stems = system.sig.stems().count();
        assert!(system.link_vlinker(lower, anchor, VerticalSide::Bottom, Profile::BEAM_SIDE));
        assert!(system.link_beam_anchor(lower, anchor, Profile::BEAM_SIDE));
        assert_eq!(system.sig.edges().count(), edges);
        assert_eq!(system.sig.stems().count(), stems);
    }

    #[test]
    fn beam_linked_on_both_sides_removes_competing_hook() {
        let hook = BeamInput {
            p1: [123.0, 45.0],
            p2: [140.0, 45.0],
            hook: true,
            group: Some(1),
            glyph: Some(1),
            ..beam_input(123.0, 140.0, 45.0)
        };
        let (image, mut input) = double_beam_input(vec![hook]);
        input.beams[0].glyph = Some(1);
        let sheet = sheet(&image);
        let mut system = SystemContext::new(&sheet, &input);
        system.inspect();
        let (upper, hook) = (system.beam_inputs[0], system.beam_inputs[2]);

        assert!(system.link_beam_sides(upper));
        assert!(!system.sig.is_removed(upper));
        assert!(system.sig.is_removed(hook));
        assert_eq!(system.removed_beams, vec![hook]);
    }
}
