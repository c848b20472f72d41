use super::inter::{Beam, Head, Inter, InterId, InterKind, Stem};
use super::relation::{BeamStemRelation, HeadStemRelation, Relation};
use log::warn;
use serde::Serialize;

/// Identifier of an edge within one system graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EdgeId(pub u32);

#[derive(Clone, Debug)]
pub struct Edge {
    pub source: InterId,
    pub target: InterId,
    pub relation: Relation,
    pub removed: bool,
}

/// Symbol interpretation graph of one system.
///
/// Inters and edges are never physically deleted: removal flips a flag so
/// that identifiers stay stable and iteration order stays deterministic.
#[derive(Clone, Debug, Default)]
pub struct Sig {
    inters: Vec<Inter>,
    edges: Vec<Edge>,
    /// Edge ids incident to each inter, in insertion order.
    incidence: Vec<Vec<EdgeId>>,
}

impl Sig {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_inter(&mut self, kind: InterKind) -> InterId {
        let id = InterId(self.inters.len() as u32);
        self.inters.push(Inter {
            id,
            kind,
            removed: false,
        });
        self.incidence.push(Vec::new());
        id
    }

    pub fn add_head(&mut self, head: Head) -> InterId {
        self.add_inter(InterKind::Head(head))
    }

    pub fn add_beam(&mut self, beam: Beam) -> InterId {
        self.add_inter(InterKind::Beam(beam))
    }

    pub fn add_stem(&mut self, stem: Stem) -> InterId {
        self.add_inter(InterKind::Stem(stem))
    }

    pub fn inter(&self, id: InterId) -> &Inter {
        &self.inters[id.0 as usize]
    }

    pub fn inters(&self) -> impl Iterator<Item = &Inter> {
        self.inters.iter().filter(|i| !i.removed)
    }

    pub fn is_removed(&self, id: InterId) -> bool {
        self.inters[id.0 as usize].removed
    }

    pub fn head(&self, id: InterId) -> Option<&Head> {
        match &self.inters.get(id.0 as usize)?.kind {
            InterKind::Head(h) => Some(h),
            _ => None,
        }
    }

    pub fn head_mut(&mut self, id: InterId) -> Option<&mut Head> {
        match &mut self.inters.get_mut(id.0 as usize)?.kind {
            InterKind::Head(h) => Some(h),
            _ => None,
        }
    }

    pub fn beam(&self, id: InterId) -> Option<&Beam> {
        match &self.inters.get(id.0 as usize)?.kind {
            InterKind::Beam(b) => Some(b),
            _ => None,
        }
    }

    pub fn stem(&self, id: InterId) -> Option<&Stem> {
        match &self.inters.get(id.0 as usize)?.kind {
            InterKind::Stem(s) => Some(s),
            _ => None,
        }
    }

    /// Live stems, in creation order.
    pub fn stems(&self) -> impl Iterator<Item = (InterId, &Stem)> {
        self.inters().filter_map(|i| match &i.kind {
            InterKind::Stem(s) => Some((i.id, s)),
            _ => None,
        })
    }

    /// Flag an inter as removed, together with all its edges.
    pub fn remove(&mut self, id: InterId) {
        let idx = id.0 as usize;
        if self.inters[idx].removed {
            return;
        }
        self.inters[idx].removed = true;
        for e in self.incidence[idx].clone() {
            self.edges[e.0 as usize].removed = true;
        }
    }

    /// Add an edge. Edges touching a removed inter are refused.
    pub fn add_edge(&mut self, source: InterId, target: InterId, relation: Relation) -> Option<EdgeId> {
        if self.is_removed(source) || self.is_removed(target) {
            warn!(
                "Refusing {} edge {:?} -> {:?} on removed inter",
                relation.name(),
                source,
                target
            );
            return None;
        }
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            source,
            target,
            relation,
            removed: false,
        });
        self.incidence[source.0 as usize].push(id);
        self.incidence[target.0 as usize].push(id);
        Some(id)
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0 as usize]
    }

    pub fn remove_edge(&mut self, id: EdgeId) {
        self.edges[id.0 as usize].removed = true;
    }

    /// Live edges, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.removed)
            .map(|(i, e)| (EdgeId(i as u32), e))
    }

    /// Live edges incident to `id`, whatever their direction.
    pub fn edges_of(&self, id: InterId) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.incidence[id.0 as usize]
            .iter()
            .map(move |e| (*e, &self.edges[e.0 as usize]))
            .filter(|(_, e)| !e.removed)
    }

    /// Live edge between both inters, in either direction.
    pub fn relation(&self, a: InterId, b: InterId) -> Option<(EdgeId, &Relation)> {
        self.edges_of(a)
            .find(|(_, e)| (e.source == a && e.target == b) || (e.source == b && e.target == a))
            .map(|(id, e)| (id, &e.relation))
    }

    /// Stems linked to a head, with their relation.
    pub fn head_stems(&self, head: InterId) -> Vec<(EdgeId, InterId, &HeadStemRelation)> {
        self.edges_of(head)
            .filter_map(|(id, e)| match &e.relation {
                Relation::HeadStem(r) if e.source == head => Some((id, e.target, r)),
                _ => None,
            })
            .collect()
    }

    /// Heads linked to a stem, with their relation.
    pub fn stem_heads(&self, stem: InterId) -> Vec<(EdgeId, InterId, &HeadStemRelation)> {
        self.edges_of(stem)
            .filter_map(|(id, e)| match &e.relation {
                Relation::HeadStem(r) if e.target == stem => Some((id, e.source, r)),
                _ => None,
            })
            .collect()
    }

    /// Stems linked to a beam, with their relation.
    pub fn beam_stems(&self, beam: InterId) -> Vec<(EdgeId, InterId, &BeamStemRelation)> {
        self.edges_of(beam)
            .filter_map(|(id, e)| match &e.relation {
                Relation::BeamStem(r) if e.source == beam => Some((id, e.target, r)),
                _ => None,
            })
            .collect()
    }

    /// Beams linked to a stem, with their relation.
    pub fn stem_beams(&self, stem: InterId) -> Vec<(EdgeId, InterId, &BeamStemRelation)> {
        self.edges_of(stem)
            .filter_map(|(id, e)| match &e.relation {
                Relation::BeamStem(r) if e.target == stem => Some((id, e.source, r)),
                _ => None,
            })
            .collect()
    }

    pub fn excludes(&self, a: InterId, b: InterId) -> bool {
        self.edges_of(a).any(|(_, e)| {
            matches!(e.relation, Relation::Exclusion)
                && ((e.source == a && e.target == b) || (e.source == b && e.target == a))
        })
    }

    /// Add an exclusion unless the pair is already related.
    pub fn insert_exclusion(&mut self, a: InterId, b: InterId) -> Option<EdgeId> {
        if a == b || self.relation(a, b).is_some() {
            return None;
        }
        self.add_edge(a, b, Relation::Exclusion)
    }

    /// Maximal subsets of `inters` containing no pair linked by an exclusion.
    /// Subsets list their members in input order, and are themselves ordered
    /// by their first differing member.
    pub fn partitions(&self, inters: &[InterId]) -> Vec<Vec<InterId>> {
        let n = inters.len();
        let conflicts: Vec<Vec<bool>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| i != j && self.excludes(inters[i], inters[j]))
                    .collect()
            })
            .collect();

        let mut result: Vec<Vec<usize>> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        grow(0, n, &conflicts, &mut current, &mut result);
        result
            .into_iter()
            .map(|set| set.into_iter().map(|i| inters[i]).collect())
            .collect()
    }
}

/// Enumerate maximal independent sets, deciding members in index order.
fn grow(
    index: usize,
    n: usize,
    conflicts: &[Vec<bool>],
    current: &mut Vec<usize>,
    result: &mut Vec<Vec<usize>>,
) {
    if index == n {
        let maximal = (0..n).all(|k| {
            current.contains(&k) || current.iter().any(|&m| conflicts[k][m])
        });
        if maximal {
            result.push(current.clone());
        }
        return;
    }
    if current.iter().all(|&m| !conflicts[index][m]) {
        current.push(index);
        grow(index + 1, n, conflicts, current, result);
        current.pop();
        // Skipping is only useful when some conflict may later justify it
        if (0..n).any(|k| conflicts[index][k]) {
            grow(index + 1, n, conflicts, current, result);
        }
    } else {
        grow(index + 1, n, conflicts, current, result);
    }
}
