//! Head linker.
//!
//! A head offers four corner anchors: left or right side, searching up or
//! down. Both corners of a side share one anchor state, so linking a side
//! in one direction closes the other direction.
//!
//! Inspection of a corner builds the lookup area and the theoretical line,
//! stopping at the first beam group whose median crosses the line, and
//! drives a [`StemBuilder`](super::builder::StemBuilder). Linking walks the
//! resulting items with a hard minimum tail and a soft target tail.

use super::builder::{BuildRequest, StemBuilder};
use super::checker::GOOD_GRADE;
use super::item::{ItemKind, Owner, StemItems};
use super::linker::{lookup_area, theoretical_line, AnchorId, AnchorKind, Search};
use super::retriever::SystemContext;
use crate::geometry::{Point, Rect, Segment};
use crate::sheet::{HorizontalSide, Profile, VerticalSide};
use crate::sig::{contextual, Head, HeadStemRelation, InterId, Relation};
use log::{debug, info};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct HeadLinker {
    pub head: InterId,
    /// Corner anchors by `[h_side][v_side]`.
    corners: [[AnchorId; 2]; 2],
}

impl HeadLinker {
    pub fn corner(&self, h_side: HorizontalSide, v_side: VerticalSide) -> AnchorId {
        self.corners[h_side.index()][v_side.index()]
    }
}

impl<'a> SystemContext<'a> {
    pub(crate) fn create_head_linker(&mut self, head: InterId) {
        let Some(ref_pts) = self
            .sig
            .head(head)
            .map(|h| HorizontalSide::BOTH.map(|hs| h.stem_ref_point(hs)))
        else {
            return;
        };
        let mut corners = [[AnchorId(0); 2]; 2];
        for hs in HorizontalSide::BOTH {
            let state = self.arena.new_state();
            for vs in VerticalSide::BOTH {
                corners[hs.index()][vs.index()] = self.arena.add(
                    AnchorKind::HeadCorner {
                        head,
                        h_side: hs,
                        v_side: vs,
                    },
                    ref_pts[hs.index()],
                    None,
                    state,
                );
            }
        }
        self.register_head_linker(HeadLinker { head, corners });
    }

    pub(crate) fn inspect_head(&mut self, head: InterId) {
        for hs in HorizontalSide::BOTH {
            for vs in VerticalSide::BOTH {
                self.inspect_corner(head, hs, vs);
            }
        }
    }

    /// Beams whose median crosses `theo_line` ahead of `ref_y`, at least
    /// `min_beam_head_dy` away, sorted by distance.
    pub(crate) fn crossing_beams(&self, theo_line: &Segment, ref_y: f64, y_dir: i32) -> Vec<(InterId, Point)> {
        let params = &self.sheet.params;
        let dir = y_dir as f64;
        let reach = dir * (theo_line.p2.y - ref_y);
        let mut found: Vec<(InterId, Point, f64)> = Vec::new();
        for id in &self.beams {
            if self.sig.is_removed(*id) {
                continue;
            }
            let Some(beam) = self.sig.beam(*id) else {
                continue;
            };
            let Some(cross) = theo_line.intersection(&beam.median) else {
                continue;
            };
            if cross.x < beam.left_x() || cross.x > beam.right_x() {
                continue;
            }
            let dy = dir * (cross.y - ref_y);
            if dy < params.min_beam_head_dy || dy > reach {
                continue;
            }
            found.push((*id, cross, dy));
        }
        found.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)));
        found.into_iter().map(|(id, cross, _)| (id, cross)).collect()
    }

    fn inspect_corner(&mut self, head: InterId, h_side: HorizontalSide, v_side: VerticalSide) {
        let sheet = self.sheet;
        let params = &sheet.params;
        let Some(h) = self.sig.head(head).cloned() else {
            return;
        };
        let Some(anchor) = self.head_linker(head).map(|l| l.corner(h_side, v_side)) else {
            return;
        };
        let y_dir = v_side.direction();
        let dir = y_dir as f64;
        let ref_pt = h.stem_ref_point(h_side);
        let mut y_limit = self.info.part_limit(&h.center(), y_dir);
        let mut theo_line = theoretical_line(&sheet.skew, ref_pt, y_limit);

        // First crossing group wins
        let crossings = self.crossing_beams(&theo_line, ref_pt.y, y_dir);
        let mut target_beam = None;
        let mut group_beams = Vec::new();
        if let Some((first, cross)) = crossings.first().copied() {
            let group = self.sig.beam(first).map(|b| b.group);
            let in_group: Vec<(InterId, Point)> = crossings
                .iter()
                .copied()
                .filter(|(b, _)| self.sig.beam(*b).map(|b| b.group) == group)
                .collect();
            if h.shape.is_small() {
                if let Some(beam) = self.sig.beam(first) {
                    y_limit = beam.border(VerticalSide::of(-y_dir)).y_at_x(cross.x) - dir;
                }
            } else if let Some((last, last_cross)) = in_group.last().copied() {
                if let Some(beam) = self.sig.beam(last) {
                    y_limit = beam.border(v_side).y_at_x(last_cross.x);
                }
                target_beam = Some(last);
                group_beams = in_group.iter().map(|(b, _)| *b).collect();
            }
            theo_line = theoretical_line(&sheet.skew, ref_pt, y_limit);
        }

        let mut targets: Vec<AnchorId> = Vec::new();
        for beam in group_beams {
            if let Some(linker) = self.find_beam_anchor(beam, &theo_line) {
                targets.push(linker);
            }
        }

        let (dx_left, dx_right) = match h_side {
            HorizontalSide::Left => (params.max_head_out_dx, params.max_head_in_dx),
            HorizontalSide::Right => (params.max_head_in_dx, params.max_head_out_dx),
        };
        let y0 = ref_pt.y - dir * params.max_head_seed_dy;
        let lu_area = lookup_area(
            &sheet.skew,
            Point::new(ref_pt.x - dx_left, y0),
            Point::new(ref_pt.x + dx_right, y0),
            y_limit,
            y_dir,
            params.slope_margin,
        );

        let seeds = self
            .seeds
            .iter()
            .copied()
            .filter(|s| self.glyphs.get(*s).intersects(&lu_area))
            .collect();

        for other in &self.heads {
            if *other == head || self.sig.is_removed(*other) || self.sig.excludes(head, *other) {
                continue;
            }
            match self.sig.head(*other) {
                Some(o) if o.shape == h.shape => {}
                _ => continue,
            }
            let Some(corner) = self.head_linker(*other).map(|l| l.corner(h_side, v_side)) else {
                continue;
            };
            let pt = self.arena.get(corner).ref_pt;
            if dir * (pt.y - ref_pt.y) >= params.min_head_head_dy && lu_area.contains(&pt) {
                targets.push(corner);
            }
        }

        let y_range = if y_dir > 0 {
            (h.bounds.bottom() as f64, y_limit)
        } else {
            (y_limit, h.bounds.y as f64)
        };
        let builder = self.build_stem(BuildRequest {
            anchor,
            y_dir,
            theo_line,
            lu_area: lu_area.clone(),
            seeds,
            targets,
            y_range,
            start_box: None,
            max_profile: sheet.max_head_profile,
        });
        if h.vip {
            info!(
                "VIP System#{} head {:?} corner {:?}-{:?}: {} items, length {:.1}, beam {:?}",
                self.info.id,
                head,
                h_side,
                v_side,
                builder.items.len(),
                builder.total_length(),
                target_beam
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

    /// Whether the corner search reaches at least the minimum linker
    /// length at `profile`.
    pub(crate) fn has_concrete_start(&self, corner: AnchorId, profile: Profile) -> bool {
        let AnchorKind::HeadCorner { v_side, .. } = self.arena.get(corner).kind else {
            return false;
        };
        self.arena
            .builder(corner, v_side)
            .is_some_and(|b| b.length(profile) >= self.sheet.params.min_linker_length)
    }

    fn can_link_corner(&self, corner: AnchorId, profile: Profile, append: bool) -> bool {
        let AnchorKind::HeadCorner { h_side, v_side, .. } = self.arena.get(corner).kind else {
            return false;
        };
        let Some(builder) = self.arena.builder(corner, v_side) else {
            return false;
        };
        if builder.length(profile) < self.sheet.params.min_linker_length {
            return false;
        }
        let items = &builder.items;
        let Some(next) = items.next_head_after(0) else {
            return true;
        };
        if items.last_gap_before(next).is_none() {
            return true;
        }
        let Some(next_linker) = items.get(next).head().and_then(|h| self.head_linker(h)) else {
            return true;
        };
        let back = v_side.opposite();
        let started = [
            next_linker.corner(h_side, back),
            next_linker.corner(h_side.opposite(), back),
        ]
        .into_iter()
        .any(|c| self.has_concrete_start(c, profile));
        if !started {
            return true;
        }
        append && self.arena.is_linked(next_linker.corner(h_side, v_side))
    }

    /// Contextual grade `head` would get from a stem following `theo_line`
    /// over `span`.
    fn head_strength(
        &self,
        head: &Head,
        h_side: HorizontalSide,
        theo_line: &Segment,
        span: (f64, f64),
        profile: Profile,
    ) -> f64 {
        let sheet = self.sheet;
        let params = &sheet.params;
        let (line, bounds) = provisional_stem(theo_line, span, params.main_stem_thickness);
        match HeadStemRelation::check(head, h_side, &line, &bounds, &sheet.scale, &params.head_stem, profile) {
            Some(rel) => contextual(head.grade, rel.head_support(GOOD_GRADE, &params.head_stem)),
            None => head.grade,
        }
    }

    /// Link a head corner at `profile`. Linking an already linked corner is
    /// a no-op.
    pub(crate) fn link_corner(&mut self, corner: AnchorId, profile: Profile) -> bool {
        if self.arena.is_linked(corner) {
            return true;
        }
        if self.arena.is_closed(corner) {
            return false;
        }
        let AnchorKind::HeadCorner { head, h_side, v_side } = self.arena.get(corner).kind else {
            return false;
        };
        let Some(builder) = self.arena.builder(corner, v_side) else {
            return false;
        };
        let Some((last, beam_index)) = self.corner_stop(corner, &builder, profile) else {
            return false;
        };
        let sheet = self.sheet;
        let params = &sheet.params;
        let items = &builder.items;
        let y_dir = items.y_dir();
        let glyphs = items.glyphs_until(last);
        if glyphs.is_empty() {
            return false;
        }
        let Some(stem) = self.create_stem(&glyphs, profile) else {
            return false;
        };
        let Some((line, bounds)) = self.sig.stem(stem).map(|s| (s.line, s.bounds)) else {
            return false;
        };
        let Some(h) = self.sig.head(head).cloned() else {
            return false;
        };
        let Some(rel) =
            HeadStemRelation::check(&h, h_side, &line, &bounds, &sheet.scale, &params.head_stem, profile)
        else {
            debug!(
                "System#{} head {:?} {:?}-{:?}: no relation with stem {:?}",
                self.info.id, head, h_side, v_side, stem
            );
            return false;
        };
        self.connect_head_stem(head, stem, rel);
        self.arena.set_linked(corner);

        // Other heads met on the way
        for item in items.items().iter().take(last + 1).skip(1) {
            let Some(linker) = item.linker_ref() else {
                continue;
            };
            let AnchorKind::HeadCorner { head: other, h_side: side, .. } = self.arena.get(linker.anchor).kind else {
                continue;
            };
            let Some(o) = self.sig.head(other).cloned() else {
                continue;
            };
            if let Some(rel) =
                HeadStemRelation::check(&o, side, &line, &bounds, &sheet.scale, &params.head_stem, profile)
            {
                self.connect_head_stem(other, stem, rel);
                self.arena.set_linked(linker.anchor);
            }
        }

        if let Some(b) = beam_index {
            if let (Some(beam), Some(linker)) = (items.get(b).beam(), items.get(b).linker_ref()) {
                let beam_anchor = linker.anchor;
                if let Some(grade) = self.connect_beam_stem(beam, stem, -y_dir, profile) {
                    self.arena.set_linked(beam_anchor);
                    self.link_siblings(beam, stem, -y_dir, grade);
                }
            }
        }

        if h.vip {
            info!(
                "VIP System#{} head {:?} {:?}-{:?} linked to stem {:?} at {profile}",
                self.info.id, head, h_side, v_side, stem
            );
        } else {
            debug!(
                "System#{} head {:?} {:?}-{:?} linked to stem {:?} at {profile}",
                self.info.id, head, h_side, v_side, stem
            );
        }

        // Carry on with the head beyond the stop
        if let Some(next) = items.next_head_after(last) {
            if let Some(linker) = items.get(next).linker_ref() {
                let next_corner = linker.anchor;
                if !self.arena.is_closed(next_corner) {
                    self.link_corner(next_corner, profile);
                }
            }
        }
        true
    }

    /// Index of the last item a stem from `corner` would take at `profile`,
    /// with the index of the beam it ends on, if any. The hard minimum tail
    /// never moves; the soft target moves past every strong head met.
    pub(crate) fn corner_stop(
        &self,
        corner: AnchorId,
        builder: &StemBuilder,
        profile: Profile,
    ) -> Option<(usize, Option<usize>)> {
        let AnchorKind::HeadCorner { head, h_side, v_side } = self.arena.get(corner).kind else {
            return None;
        };
        let sheet = self.sheet;
        let params = &sheet.params;
        let items = &builder.items;
        let y_dir = items.y_dir();
        let dir = y_dir as f64;
        let ref_y = builder.theo_line.p1.y;
        let tolerance = params.max_y_gap.get(profile);

        let mut soft_ref = ref_y;
        let mut last = 0;
        let mut prev_head = (head, 0usize, ref_y);
        let mut beam_index = None;
        for i in 1..items.len() {
            let item = items.get(i);
            match &item.kind {
                ItemKind::Gap => {
                    if item.contrib <= tolerance {
                        continue;
                    }
                    let reached = items.length_at(last);
                    if reached < params.min_stem_tail {
                        debug!(
                            "System#{} head {:?} {:?}-{:?}: gap {:.1} before tail {:.1} at {profile}",
                            self.info.id, head, h_side, v_side, item.contrib, reached
                        );
                        return None;
                    }
                    let soft = dir * (soft_ref - ref_y) + params.best_stem_tail;
                    if reached < soft {
                        let absorbable = profile
                            .next()
                            .is_some_and(|looser| item.contrib <= params.max_y_gap.get(looser));
                        if absorbable
                            && i + 1 < items.len()
                            && matches!(items.get(i + 1).kind, ItemKind::Glyph(_))
                        {
                            last = i + 1;
                        }
                    }
                    break;
                }
                ItemKind::Glyph(_) => last = i,
                ItemKind::Linker(linker) => match linker.owner {
                    Owner::Beam(_) => {
                        last = i;
                        beam_index = Some(i);
                        break;
                    }
                    Owner::Head(other) => {
                        let Some(other_head) = self.sig.head(other) else {
                            continue;
                        };
                        let (prev, prev_index, prev_y) = prev_head;
                        let no_gap = items.last_gap_before(i).map_or(true, |g| g < prev_index);
                        let prev_height = self.sig.head(prev).map_or(0.0, |h| h.bounds.h as f64);
                        if no_gap && dir * (linker.ref_pt.y - prev_y) < prev_height {
                            let claimed = [prev, other].into_iter().any(|h| {
                                self.head_linker(h).is_some_and(|l| {
                                    self.arena.is_linked(l.corner(h_side.opposite(), v_side))
                                })
                            });
                            if claimed {
                                break;
                            }
                        }
                        let span = items_span(items, i);
                        let span = (span.0.min(ref_y), span.1.max(ref_y));
                        let strength = self.head_strength(other_head, h_side, &builder.theo_line, span, profile);
                        if strength >= GOOD_GRADE {
                            soft_ref = linker.ref_pt.y;
                        }
                        prev_head = (other, i, linker.ref_pt.y);
                        last = i;
                    }
                },
            }
        }

        if last == 0 {
            return None;
        }
        if beam_index.is_none() && items.length_at(last) < params.min_stem_tail {
            return None;
        }
        Some((last, beam_index))
    }

    pub(crate) fn connect_head_stem(&mut self, head: InterId, stem: InterId, rel: HeadStemRelation) {
        if self.sig.relation(head, stem).is_none() {
            self.sig.add_edge(head, stem, Relation::HeadStem(rel));
        }
    }

    /// Link both horizontal sides of `head` starting at `profile`.
    /// Returns whether at least one side ends up linked.
    pub(crate) fn link_head_sides(
        &mut self,
        head: InterId,
        profile: Profile,
        max_profile: Profile,
        append: bool,
    ) -> bool {
        if self.sig.is_removed(head) {
            return false;
        }
        let mut linked = false;
        for hs in HorizontalSide::BOTH {
            if self.link_head_side(head, hs, profile, max_profile, append) {
                linked = true;
            }
        }
        linked
    }

    fn link_head_side(
        &mut self,
        head: InterId,
        h_side: HorizontalSide,
        profile: Profile,
        max_profile: Profile,
        append: bool,
    ) -> bool {
        let Some(linker) = self.head_linker(head).cloned() else {
            return false;
        };
        let top = linker.corner(h_side, VerticalSide::Top);
        if self.arena.is_linked(top) {
            return true;
        }
        if self.arena.is_closed(top) {
            return false;
        }
        let viable: Vec<AnchorId> = VerticalSide::BOTH
            .into_iter()
            .map(|vs| linker.corner(h_side, vs))
            .filter(|c| self.can_link_corner(*c, profile, append))
            .collect();
        match viable.as_slice() {
            [one] => {
                if self.link_corner(*one, profile) {
                    self.close_stem_heads(head, h_side);
                    return true;
                }
            }
            [_, _] => {
                if !self.undefined.contains(&(head, h_side)) {
                    self.undefined.push((head, h_side));
                }
                debug!(
                    "System#{} head {:?} {:?} undefined at {profile}",
                    self.info.id, head, h_side
                );
                return false;
            }
            _ => {}
        }

        let grade = self.sig.inter(head).grade();
        if grade < GOOD_GRADE && profile < max_profile {
            if let Some(looser) = profile.next() {
                return self.link_head_side(head, h_side, looser, max_profile, append);
            }
        }
        self.arena.set_closed(top);
        false
    }

    /// Close the same side of every head sharing the stem just linked on
    /// `h_side` of `head`.
    fn close_stem_heads(&mut self, head: InterId, h_side: HorizontalSide) {
        let stems: Vec<InterId> = self
            .sig
            .head_stems(head)
            .into_iter()
            .filter(|(_, _, rel)| rel.head_side == h_side)
            .map(|(_, stem, _)| stem)
            .collect();
        for stem in stems {
            let heads: Vec<(InterId, HorizontalSide)> = self
                .sig
                .stem_heads(stem)
                .into_iter()
                .map(|(_, h, rel)| (h, rel.head_side))
                .collect();
            for (other, side) in heads {
                if let Some(corner) = self.head_linker(other).map(|l| l.corner(side, VerticalSide::Top)) {
                    self.arena.set_closed(corner);
                }
            }
        }
    }
}

/// Ordinate span of non-gap items `0..=index`.
pub(crate) fn items_span(items: &StemItems, index: usize) -> (f64, f64) {
    let mut span = (f64::INFINITY, f64::NEG_INFINITY);
    for item in items.items().iter().take(index + 1).filter(|it| !it.is_gap()) {
        let (t, b) = item.span();
        span = (span.0.min(t), span.1.max(b));
    }
    span
}

/// Stem a search would produce along `theo_line` over ordinate `span`,
/// as line and bounds.
pub(crate) fn provisional_stem(theo_line: &Segment, span: (f64, f64), thickness: i32) -> (Segment, Rect) {
    let line = Segment::new(
        Point::new(theo_line.x_at_y(span.0), span.0),
        Point::new(theo_line.x_at_y(span.1), span.1),
    );
    let x = line.x_at_y(line.mid_y()).round() as i32;
    let top = span.0.floor() as i32;
    let bounds = Rect::new(
        x - thickness / 2,
        top,
        thickness,
        (span.1.ceil() as i32 - top).max(1),
    );
    (line, bounds)
}
