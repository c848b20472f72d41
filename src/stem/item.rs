//! Stem item sequence.
//!
//! A [`StemItems`] sequence lists, along one direction of travel, what a
//! stem departing from a starting anchor would meet: plain glyphs, other
//! anchors, and the vertical gaps between them. Lengths reachable per
//! profile are computed once, when the sequence is assembled.

use super::linker::AnchorId;
use crate::geometry::{Point, Rect, Segment};
use crate::glyph::GlyphId;
use crate::sheet::{Profile, Profiled};
use crate::sig::InterId;
use std::cmp::Ordering;

/// Gaps at or below this value (pixels) are not materialized.
pub const NEGLIGIBLE_GAP: f64 = 0.01;

/// Entity owning an anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    Head(InterId),
    Beam(InterId),
}

/// Reference to an anchor met along the line.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkerRef {
    pub anchor: AnchorId,
    pub owner: Owner,
    /// Stump glyph of the anchor, if any.
    pub glyph: Option<GlyphId>,
    /// Box occupied by the owner around the anchor (head box, beam slice).
    pub extent: Option<Rect>,
    pub ref_pt: Point,
    /// Starting anchor of the sequence.
    pub start: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ItemKind {
    Gap,
    Glyph(GlyphId),
    Linker(LinkerRef),
}

#[derive(Clone, Debug)]
pub struct StemItem {
    pub kind: ItemKind,
    /// Top to bottom.
    pub line: Segment,
    /// Ordinate contribution to the stem, in pixels.
    pub contrib: f64,
}

impl PartialEq for StemItem {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (ItemKind::Gap, ItemKind::Gap) => {
                self.line.min_y() == other.line.min_y() && self.line.max_y() == other.line.max_y()
            }
            (a, b) => a == b && self.line == other.line,
        }
    }
}

impl StemItem {
    pub fn gap(x: f64, top: f64, bottom: f64) -> Self {
        Self {
            kind: ItemKind::Gap,
            line: Segment::new(Point::new(x, top), Point::new(x, bottom)),
            contrib: bottom - top,
        }
    }

    pub fn glyph(glyph: GlyphId, line: Segment, contrib: f64) -> Self {
        Self {
            kind: ItemKind::Glyph(glyph),
            line,
            contrib,
        }
    }

    /// Anchor item. Without stump the line shrinks to the reference point.
    pub fn linker(linker: LinkerRef, stump_line: Option<Segment>, contrib: f64) -> Self {
        let line = stump_line.unwrap_or_else(|| Segment::at(linker.ref_pt));
        Self {
            kind: ItemKind::Linker(linker),
            line,
            contrib,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self.kind, ItemKind::Gap)
    }

    /// Glyph carried by the item, stump included.
    pub fn glyph_id(&self) -> Option<GlyphId> {
        match &self.kind {
            ItemKind::Glyph(g) => Some(*g),
            ItemKind::Linker(l) => l.glyph,
            ItemKind::Gap => None,
        }
    }

    pub fn linker_ref(&self) -> Option<&LinkerRef> {
        match &self.kind {
            ItemKind::Linker(l) => Some(l),
            _ => None,
        }
    }

    /// Head owning the item anchor, if any.
    pub fn head(&self) -> Option<InterId> {
        match self.linker_ref()?.owner {
            Owner::Head(h) => Some(h),
            Owner::Beam(_) => None,
        }
    }

    pub fn beam(&self) -> Option<InterId> {
        match self.linker_ref()?.owner {
            Owner::Beam(b) => Some(b),
            Owner::Head(_) => None,
        }
    }

    /// Ordinate span `(top, bottom)`, owner extent included.
    pub fn span(&self) -> (f64, f64) {
        let mut top = self.line.min_y();
        let mut bottom = self.line.max_y();
        if let Some(extent) = self.linker_ref().and_then(|l| l.extent) {
            top = top.min(extent.y as f64);
            bottom = bottom.max(extent.bottom() as f64);
        }
        (top, bottom)
    }

    /// `(start, stop)` ordinates along direction `y_dir`.
    fn ends(&self, y_dir: i32) -> (f64, f64) {
        let (top, bottom) = self.span();
        if y_dir > 0 {
            (top, bottom)
        } else {
            (bottom, top)
        }
    }
}

/// Order items along `y_dir`. Anchors sharing a stump glyph start with
/// that glyph and are ordered by their reference points; remaining ties go
/// glyphs first, then anchors, then by id.
pub fn compare_items(a: &StemItem, b: &StemItem, y_dir: i32) -> Ordering {
    a.sort_start(y_dir)
        .total_cmp(&b.sort_start(y_dir))
        .then(a.rank().cmp(&b.rank()))
        .then(a.sort_ref(y_dir).total_cmp(&b.sort_ref(y_dir)))
        .then(a.sort_id().cmp(&b.sort_id()))
}

impl StemItem {
    /// Start ordinate along `y_dir`, negated upwards so that smaller comes
    /// first. A stump anchor starts where its stump starts.
    fn sort_start(&self, y_dir: i32) -> f64 {
        let (top, bottom) = match self.linker_ref() {
            Some(l) if l.glyph.is_some() => (self.line.min_y(), self.line.max_y()),
            _ => self.span(),
        };
        if y_dir > 0 {
            top
        } else {
            -bottom
        }
    }

    fn rank(&self) -> u8 {
        match self.kind {
            ItemKind::Glyph(_) => 0,
            ItemKind::Linker(_) => 1,
            ItemKind::Gap => 2,
        }
    }

    fn sort_ref(&self, y_dir: i32) -> f64 {
        self.linker_ref().map_or(0.0, |l| y_dir as f64 * l.ref_pt.y)
    }

    fn sort_id(&self) -> u32 {
        match &self.kind {
            ItemKind::Glyph(g) => g.0,
            ItemKind::Linker(l) => l.anchor.0,
            ItemKind::Gap => 0,
        }
    }
}

/// Ordered items with their reachable lengths.
#[derive(Clone, Debug)]
pub struct StemItems {
    y_dir: i32,
    /// Ordinate lengths are measured from.
    ref_y: f64,
    items: Vec<StemItem>,
    max_profile: Profile,
    /// Reachable length per profile, `STRICT..=max_profile`.
    lengths: Vec<f64>,
}

impl StemItems {
    /// Sort `others` after `start`, insert gaps, truncate at the first gap
    /// beyond the `max_profile` tolerance and compute lengths.
    pub fn assemble(
        start: StemItem,
        mut others: Vec<StemItem>,
        y_dir: i32,
        ref_y: f64,
        tolerances: &Profiled<f64>,
        max_profile: Profile,
    ) -> Self {
        others.sort_by(|a, b| compare_items(a, b, y_dir));
        let dir = y_dir as f64;
        let max_gap = tolerances.get(max_profile);

        let mut last = start.ends(y_dir).1;
        let mut items = vec![start];
        for item in others {
            let (from, to) = item.ends(y_dir);
            let gap = dir * (from - last);
            if gap > max_gap {
                break;
            }
            if gap > NEGLIGIBLE_GAP {
                let x = item.line.x_at_y(from);
                let (top, bottom) = if y_dir > 0 { (last, from) } else { (from, last) };
                items.push(StemItem::gap(x, top, bottom));
            }
            if dir * (to - last) > NEGLIGIBLE_GAP {
                last = to;
            }
            items.push(item);
        }

        let mut sequence = Self {
            y_dir,
            ref_y,
            items,
            max_profile,
            lengths: Vec::new(),
        };
        sequence.lengths = sequence.retrieve_lengths(tolerances);
        sequence
    }

    fn retrieve_lengths(&self, tolerances: &Profiled<f64>) -> Vec<f64> {
        let profiles: Vec<Profile> = Profile::STRICT.up_to(self.max_profile).collect();
        let mut lengths: Vec<Option<f64>> = vec![None; profiles.len()];
        for (i, item) in self.items.iter().enumerate().filter(|(_, it)| it.is_gap()) {
            for (k, profile) in profiles.iter().enumerate() {
                if lengths[k].is_none() && item.contrib > tolerances.get(*profile) {
                    lengths[k] = Some(self.length_at(i - 1));
                }
            }
        }
        let full = self.length_at(self.max_index());
        lengths.into_iter().map(|l| l.unwrap_or(full)).collect()
    }

    pub fn y_dir(&self) -> i32 {
        self.y_dir
    }

    pub fn items(&self) -> &[StemItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> &StemItem {
        &self.items[index]
    }

    pub fn max_index(&self) -> usize {
        self.items.len().saturating_sub(1)
    }

    /// Length reachable through items `0..=index`, measured from the
    /// reference ordinate in the direction of travel.
    pub fn length_at(&self, index: usize) -> f64 {
        let mut top = f64::INFINITY;
        let mut bottom = f64::NEG_INFINITY;
        for item in self.items.iter().take(index + 1).filter(|it| !it.is_gap()) {
            let (t, b) = item.span();
            top = top.min(t);
            bottom = bottom.max(b);
        }
        if !top.is_finite() {
            return 0.0;
        }
        let length = if self.y_dir > 0 {
            bottom - self.ref_y
        } else {
            self.ref_y - top
        };
        length.max(0.0)
    }

    /// Length reachable without crossing a gap beyond the `profile`
    /// tolerance.
    pub fn length(&self, profile: Profile) -> f64 {
        let k = (profile.0 as usize).min(self.lengths.len().saturating_sub(1));
        self.lengths.get(k).copied().unwrap_or(0.0)
    }

    pub fn total_length(&self) -> f64 {
        self.length(Profile::MAX)
    }

    /// Index of the last gap strictly before `index`.
    pub fn last_gap_before(&self, index: usize) -> Option<usize> {
        (1..index.min(self.items.len())).rev().find(|&i| self.items[i].is_gap())
    }

    /// Distinct glyphs of items `0..=index`, in order.
    pub fn glyphs_until(&self, index: usize) -> Vec<GlyphId> {
        let mut glyphs = Vec::new();
        for item in self.items.iter().take(index + 1) {
            if let Some(g) = item.glyph_id() {
                if !glyphs.contains(&g) {
                    glyphs.push(g);
                }
            }
        }
        glyphs
    }

    /// First head item after `index`.
    pub fn next_head_after(&self, index: usize) -> Option<usize> {
        (index + 1..self.items.len()).find(|&i| self.items[i].head().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stem::params::Constants;

    fn tolerances() -> Profiled<f64> {
        // Interline of 20 pixels
        let fractions = Constants::max_y_gap();
        let mut t = Profiled::new(0.0);
        for p in Profile::all() {
            t = t.with(p, 20.0 * fractions.get(p));
        }
        t
    }

    fn seed(id: u32, top: f64, bottom: f64) -> StemItem {
        let line = Segment::new(Point::new(50.0, top), Point::new(50.0, bottom));
        StemItem::glyph(GlyphId(id), line, bottom - top)
    }

    fn start_at(y: f64) -> StemItem {
        let linker = LinkerRef {
            anchor: AnchorId(0),
            owner: Owner::Beam(InterId(0)),
            glyph: None,
            extent: None,
            ref_pt: Point::new(50.0, y),
            start: true,
        };
        StemItem::linker(linker, None, 0.0)
    }

    fn head_linker(anchor: u32, head: u32, bounds: Rect) -> StemItem {
        let linker = LinkerRef {
            anchor: AnchorId(anchor),
            owner: Owner::Head(InterId(head)),
            glyph: None,
            extent: Some(bounds),
            ref_pt: Point::new(50.0, bounds.center().y),
            start: false,
        };
        StemItem::linker(linker, None, 0.0)
    }

    #[test]
    fn adjacent_seeds_merge_without_gap() {
        let items = StemItems::assemble(
            start_at(10.0),
            vec![seed(2, 50.0, 90.0), seed(1, 10.0, 50.0)],
            1,
            10.0,
            &tolerances(),
            Profile::MAX,
        );
        assert_eq!(items.len(), 3);
        assert!(items.items().iter().all(|it| !it.is_gap()));
        assert_eq!(items.total_length(), 80.0);
        assert_eq!(items.length(Profile::STRICT), 80.0);
        assert_eq!(items.glyphs_until(2), vec![GlyphId(1), GlyphId(2)]);
    }

    #[test]
    fn gaps_are_inserted_and_sequence_truncated() {
        let items = StemItems::assemble(
            start_at(0.0),
            vec![
                seed(1, 0.0, 30.0),
                seed(2, 35.0, 60.0),
                seed(3, 60.005, 80.0),
                seed(4, 90.0, 120.0),
                // 100 pixels away, beyond every tolerance
                seed(5, 220.0, 260.0),
            ],
            1,
            0.0,
            &tolerances(),
            Profile::MAX,
        );
        let gaps: Vec<f64> = items
            .items()
            .iter()
            .filter(|it| it.is_gap())
            .map(|it| it.contrib)
            .collect();
        assert_eq!(gaps, vec![5.0, 10.0]);
        assert_eq!(items.glyphs_until(items.max_index()).len(), 4);
        assert_eq!(items.last_gap_before(items.max_index()), Some(5));
        assert_eq!(items.last_gap_before(2), None);
    }

    #[test]
    fn lengths_grow_with_profile() {
        let items = StemItems::assemble(
            start_at(0.0),
            vec![
                seed(1, 0.0, 30.0),
                seed(2, 35.0, 60.0),
                seed(3, 70.0, 100.0),
                seed(4, 140.0, 170.0),
            ],
            1,
            0.0,
            &tolerances(),
            Profile::MAX,
        );
        let lengths: Vec<f64> = Profile::all().map(|p| items.length(p)).collect();
        assert_eq!(lengths, vec![30.0, 60.0, 100.0, 170.0, 170.0]);
        for pair in lengths.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn upward_sequence_measures_from_reference() {
        let head = Rect::new(40, 200, 20, 16);
        let start = head_linker(0, 0, head);
        let items = StemItems::assemble(
            start,
            vec![seed(1, 150.0, 205.0), seed(2, 100.0, 148.0)],
            -1,
            208.0,
            &tolerances(),
            Profile::POOR,
        );
        assert_eq!(items.len(), 4);
        assert!(items.get(2).is_gap());
        assert_eq!(items.length(Profile::STRICT), 58.0);
        assert_eq!(items.length(Profile::STANDARD), 108.0);
        assert_eq!(items.total_length(), 108.0);
    }

    #[test]
    fn insertion_order_does_not_change_lengths() {
        let a = head_linker(1, 1, Rect::new(44, 120, 20, 16));
        let b = head_linker(2, 2, Rect::new(44, 150, 20, 16));
        let others = vec![seed(1, 10.0, 60.0), a.clone(), seed(2, 60.0, 118.0), b.clone()];
        let mut shuffled = others.clone();
        shuffled.reverse();
        shuffled.swap(0, 2);

        let t = tolerances();
        let one = StemItems::assemble(start_at(10.0), others, 1, 10.0, &t, Profile::MAX);
        let two = StemItems::assemble(start_at(10.0), shuffled, 1, 10.0, &t, Profile::MAX);
        assert_eq!(one.items(), two.items());
        for p in Profile::all() {
            assert_eq!(one.length(p), two.length(p));
        }
        assert_eq!(one.total_length(), 156.0);
        assert_eq!(one.next_head_after(0), Some(4));
    }

    #[test]
    fn ties_are_ordered_by_kind_then_id() {
        let stump = Segment::new(Point::new(50.0, 40.0), Point::new(50.0, 70.0));
        let stump_linker = |anchor: u32, y: f64| {
            let linker = LinkerRef {
                anchor: AnchorId(anchor),
                owner: Owner::Head(InterId(anchor)),
                glyph: Some(GlyphId(9)),
                extent: Some(Rect::new(30, y as i32 - 8, 20, 16)),
                ref_pt: Point::new(50.0, y),
                start: false,
            };
            StemItem::linker(linker, Some(stump), 0.0)
        };
        let items = vec![
            stump_linker(4, 66.0),
            seed(7, 40.0, 70.0),
            stump_linker(3, 44.0),
            seed(5, 40.0, 70.0),
        ];
        for y_dir in [1, -1] {
            let mut forward = items.clone();
            let mut backward: Vec<StemItem> = items.iter().rev().cloned().collect();
            forward.sort_by(|a, b| compare_items(a, b, y_dir));
            backward.sort_by(|a, b| compare_items(a, b, y_dir));
            assert_eq!(forward, backward);
            assert_eq!(forward[0].glyph_id(), Some(GlyphId(5)));
            assert_eq!(forward[1].glyph_id(), Some(GlyphId(7)));
        }
        let mut down = items.clone();
        down.sort_by(|a, b| compare_items(a, b, 1));
        let anchors: Vec<u32> = down.iter().filter_map(|it| it.linker_ref()).map(|l| l.anchor.0).collect();
        assert_eq!(anchors, vec![3, 4]);
        down.sort_by(|a, b| compare_items(a, b, -1));
        let anchors: Vec<u32> = down.iter().filter_map(|it| it.linker_ref()).map(|l| l.anchor.0).collect();
        assert_eq!(anchors, vec![4, 3]);
    }
}
