//! Head stems cleaner.
//!
//! A head may end up with more stems than it can carry. The cleaner drops
//! the relation bringing the lowest contribution until two remain at most,
//! and keeps a pair only when it is the canonical share: one stem down on
//! the left, one stem up on the right, both touching the head.

use crate::geometry::Segment;
use crate::sig::relation::{is_canonical_share, HeadStemConstants};
use crate::sig::{EdgeId, HeadStemRelation, InterId, Sig};
use crate::sheet::HorizontalSide;
use log::debug;

/// Vertical gaps below this value (pixels) count as touching.
const MAX_SHARED_Y_GAP: f64 = 0.5;

pub struct HeadStemsCleaner<'c> {
    constants: &'c HeadStemConstants,
}

struct Candidate {
    edge: EdgeId,
    stem: InterId,
    rel: HeadStemRelation,
    line: Segment,
    contribution: f64,
}

impl<'c> HeadStemsCleaner<'c> {
    pub fn new(constants: &'c HeadStemConstants) -> Self {
        Self { constants }
    }

    /// Reduce the relations between `head` and `stems`. Returns the
    /// removed edges.
    pub fn check(&self, sig: &mut Sig, head: InterId, stems: &[InterId]) -> Vec<EdgeId> {
        let mut candidates: Vec<Candidate> = sig
            .head_stems(head)
            .into_iter()
            .filter(|(_, stem, _)| stems.contains(stem))
            .filter_map(|(edge, stem, rel)| {
                let s = sig.stem(stem)?;
                Some(Candidate {
                    edge,
                    stem,
                    rel: rel.clone(),
                    line: s.line,
                    contribution: rel.stem_contribution(s.grade, self.constants),
                })
            })
            .collect();

        let mut removed = Vec::new();
        while candidates.len() > 2 {
            if let Some(worst) = worst_index(&candidates) {
                removed.push(candidates.remove(worst).edge);
            }
        }

        if candidates.len() == 2 && !self.is_canonical(sig, head, &candidates) {
            if let Some(worst) = worst_index(&candidates) {
                removed.push(candidates.remove(worst).edge);
            }
        }

        for edge in &removed {
            sig.remove_edge(*edge);
        }
        if !removed.is_empty() {
            debug!(
                "Head {:?}: {} stem relation(s) cut, kept {:?}",
                head,
                removed.len(),
                candidates.iter().map(|c| c.stem).collect::<Vec<_>>()
            );
        }
        removed
    }

    fn is_canonical(&self, sig: &Sig, head: InterId, pair: &[Candidate]) -> bool {
        let Some(h) = sig.head(head) else {
            return false;
        };
        if pair.iter().any(|c| c.rel.y_gap > MAX_SHARED_Y_GAP) {
            return false;
        }
        let left = pair.iter().find(|c| c.rel.head_side == HorizontalSide::Left);
        let right = pair.iter().find(|c| c.rel.head_side == HorizontalSide::Right);
        match (left, right) {
            (Some(l), Some(r)) => is_canonical_share(h, (&l.rel, &l.line), (&r.rel, &r.line)),
            _ => false,
        }
    }
}

/// Lowest contribution, the latest stem losing ties.
fn worst_index(candidates: &[Candidate]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.contribution
                .total_cmp(&b.contribution)
                .then(b.stem.cmp(&a.stem))
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::glyph::GlyphId;
    use crate::sig::{GradeImpacts, Head, HeadShape, Relation, Stem, StemPortion};

    fn head(sig: &mut Sig) -> InterId {
        sig.add_head(Head {
            shape: HeadShape::Black,
            bounds: Rect::new(100, 50, 22, 18),
            grade: 0.7,
            vip: false,
            abnormal: false,
        })
    }

    fn stem(sig: &mut Sig, x: f64, top: f64, bottom: f64, grade: f64) -> InterId {
        sig.add_stem(Stem {
            glyph: GlyphId(x as u32),
            line: Segment::new(Point::new(x, top), Point::new(x, bottom)),
            bounds: Rect::new(x as i32 - 1, top as i32, 3, (bottom - top) as i32),
            grade,
            impacts: GradeImpacts::default(),
            artificial: false,
        })
    }

    fn rel(side: HorizontalSide, portion: StemPortion, y_gap: f64, grade: f64) -> Relation {
        Relation::HeadStem(HeadStemRelation {
            head_side: side,
            portion,
            ext: [0.0, 0.0],
            x_gap: 0.0,
            y_gap,
            grade,
        })
    }

    fn live_stems(sig: &Sig, head: InterId) -> Vec<InterId> {
        sig.head_stems(head).into_iter().map(|(_, s, _)| s).collect()
    }

    #[test]
    fn spurious_stem_with_vertical_gap_is_cut() {
        let mut sig = Sig::new();
        let h = head(&mut sig);
        // Down stem on the left, touching the head
        let good = stem(&mut sig, 101.0, 59.0, 120.0, 0.8);
        // Up stem on the right, leaving a gap under the head
        let spurious = stem(&mut sig, 121.0, 0.0, 44.0, 0.6);
        sig.add_edge(h, good, rel(HorizontalSide::Left, StemPortion::Top, 0.0, 0.9));
        sig.add_edge(h, spurious, rel(HorizontalSide::Right, StemPortion::Bottom, 6.0, 0.4));

        let constants = HeadStemConstants::default();
        let removed = HeadStemsCleaner::new(&constants).check(&mut sig, h, &[good, spurious]);
        assert_eq!(removed.len(), 1);
        assert_eq!(live_stems(&sig, h), vec![good]);
    }

    #[test]
    fn canonical_share_is_kept() {
        let mut sig = Sig::new();
        let h = head(&mut sig);
        let down = stem(&mut sig, 101.0, 59.0, 120.0, 0.8);
        let up = stem(&mut sig, 121.0, 0.0, 59.0, 0.7);
        sig.add_edge(h, down, rel(HorizontalSide::Left, StemPortion::Top, 0.0, 0.9));
        sig.add_edge(h, up, rel(HorizontalSide::Right, StemPortion::Bottom, 0.0, 0.8));

        let constants = HeadStemConstants::default();
        let removed = HeadStemsCleaner::new(&constants).check(&mut sig, h, &[down, up]);
        assert!(removed.is_empty(), "canonical pair must survive");
        assert_eq!(live_stems(&sig, h).len(), 2);
    }

    #[test]
    fn extra_stems_are_cut_down_to_at_most_two() {
        let mut sig = Sig::new();
        let h = head(&mut sig);
        let a = stem(&mut sig, 101.0, 59.0, 120.0, 0.8);
        let b = stem(&mut sig, 121.0, 0.0, 59.0, 0.7);
        let c = stem(&mut sig, 119.0, 0.0, 50.0, 0.3);
        sig.add_edge(h, a, rel(HorizontalSide::Left, StemPortion::Top, 0.0, 0.9));
        sig.add_edge(h, b, rel(HorizontalSide::Right, StemPortion::Bottom, 0.0, 0.8));
        sig.add_edge(h, c, rel(HorizontalSide::Right, StemPortion::Bottom, 0.0, 0.3));

        let constants = HeadStemConstants::default();
        HeadStemsCleaner::new(&constants).check(&mut sig, h, &[a, b, c]);
        let kept = live_stems(&sig, h);
        assert!(kept.len() <= 2);
        assert_eq!(kept, vec![a, b]);
    }
}
