use super::timing::TimingBreakdown;
use crate::engine::InterRef;
use crate::geometry::Rect;
use crate::sheet::HorizontalSide;
use crate::sig::{GradeImpacts, InterId, InterKind, Relation};
use crate::stem::{FinalizeStats, SystemContext};
use serde::Serialize;
use std::collections::HashMap;

/// Result of [`StemEngine::process`](crate::engine::StemEngine::process).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkingReport {
    pub input: InputDescriptor,
    pub timings: TimingBreakdown,
    pub systems: Vec<SystemReport>,
}

impl LinkingReport {
    pub fn stem_count(&self) -> usize {
        self.systems.iter().map(|s| s.stems.len()).sum()
    }

    pub fn system(&self, id: usize) -> Option<&SystemReport> {
        self.systems.iter().find(|s| s.id == id)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub width: usize,
    pub height: usize,
    pub interline: i32,
    pub slope: f64,
    pub systems: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemCounts {
    pub heads: usize,
    pub beams: usize,
    pub seeds: usize,
    pub purged_seeds: usize,
    pub stems: usize,
    pub head_stem_links: usize,
    pub beam_stem_links: usize,
    pub beam_head_links: usize,
    pub exclusions: usize,
}

/// Outcome of one system. Heads and beams are referred to by their index
/// in the system input, stems by their index in `stems`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemReport {
    pub id: usize,
    pub counts: SystemCounts,
    pub finalize: FinalizeStats,
    pub stems: Vec<StemRecord>,
    pub relations: Vec<RelationRecord>,
    pub removed_beams: Vec<usize>,
    pub abnormal_heads: Vec<usize>,
    pub undefined_sides: Vec<UndefinedSide>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StemRecord {
    pub index: usize,
    pub top: [f64; 2],
    pub bottom: [f64; 2],
    pub bounds: Rect,
    pub grade: f64,
    pub artificial: bool,
    pub heads: Vec<usize>,
    pub beams: Vec<usize>,
    pub impacts: GradeImpacts,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRecord {
    pub source: InterRef,
    pub target: InterRef,
    #[serde(flatten)]
    pub relation: Relation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndefinedSide {
    pub head: usize,
    pub side: HorizontalSide,
}

/// Maps graph inters back to input and output indices.
struct RefMap {
    refs: HashMap<InterId, InterRef>,
}

impl RefMap {
    fn new(system: &SystemContext<'_>) -> Self {
        let mut refs = HashMap::new();
        for (i, id) in system.head_inputs.iter().enumerate() {
            refs.insert(*id, InterRef::Head(i));
        }
        for (i, id) in system.beam_inputs.iter().enumerate() {
            refs.insert(*id, InterRef::Beam(i));
        }
        for (i, (id, _)) in system.sig.stems().enumerate() {
            refs.insert(id, InterRef::Stem(i));
        }
        Self { refs }
    }

    fn get(&self, id: InterId) -> Option<InterRef> {
        self.refs.get(&id).copied()
    }

    fn head(&self, id: InterId) -> Option<usize> {
        match self.get(id)? {
            InterRef::Head(i) => Some(i),
            _ => None,
        }
    }

    fn beam(&self, id: InterId) -> Option<usize> {
        match self.get(id)? {
            InterRef::Beam(i) => Some(i),
            _ => None,
        }
    }
}

impl SystemReport {
    pub fn from_system(system: &SystemContext<'_>, finalize: FinalizeStats) -> Self {
        let sig = &system.sig;
        let refs = RefMap::new(system);

        let stems: Vec<StemRecord> = sig
            .stems()
            .enumerate()
            .map(|(index, (id, stem))| {
                let (top, bottom) = if stem.line.p1.y <= stem.line.p2.y {
                    (stem.line.p1, stem.line.p2)
                } else {
                    (stem.line.p2, stem.line.p1)
                };
                StemRecord {
                    index,
                    top: [top.x, top.y],
                    bottom: [bottom.x, bottom.y],
                    bounds: stem.bounds,
                    grade: stem.grade,
                    artificial: stem.artificial,
                    heads: sig
                        .stem_heads(id)
                        .into_iter()
                        .filter_map(|(_, h, _)| refs.head(h))
                        .collect(),
                    beams: sig
                        .stem_beams(id)
                        .into_iter()
                        .filter_map(|(_, b, _)| refs.beam(b))
                        .collect(),
                    impacts: stem.impacts.clone(),
                }
            })
            .collect();

        let mut counts = SystemCounts {
            heads: system.head_inputs.len(),
            beams: system.beam_inputs.len(),
            seeds: system.seeds.len(),
            purged_seeds: system.purged_seeds,
            stems: stems.len(),
            ..SystemCounts::default()
        };
        let mut relations = Vec::new();
        for (_, edge) in sig.edges() {
            match edge.relation {
                Relation::HeadStem(_) => counts.head_stem_links += 1,
                Relation::BeamStem(_) => counts.beam_stem_links += 1,
                Relation::BeamHead(_) => counts.beam_head_links += 1,
                Relation::Exclusion => counts.exclusions += 1,
            }
            if let (Some(source), Some(target)) = (refs.get(edge.source), refs.get(edge.target)) {
                relations.push(RelationRecord {
                    source,
                    target,
                    relation: edge.relation.clone(),
                });
            }
        }

        let abnormal_heads = system
            .head_inputs
            .iter()
            .enumerate()
            .filter(|(_, id)| {
                matches!(&sig.inter(**id).kind, InterKind::Head(h) if h.abnormal)
            })
            .map(|(i, _)| i)
            .collect();

        Self {
            id: system.info.id,
            counts,
            finalize,
            stems,
            relations,
            removed_beams: system
                .removed_beams
                .iter()
                .filter_map(|b| refs.beam(*b))
                .collect(),
            abnormal_heads,
            undefined_sides: system
                .undefined
                .iter()
                .filter_map(|(h, side)| {
                    refs.head(*h).map(|head| UndefinedSide { head, side: *side })
                })
                .collect(),
        }
    }

    /// Stems linked to the input head `head`.
    pub fn stems_of_head(&self, head: usize) -> Vec<&StemRecord> {
        self.stems.iter().filter(|s| s.heads.contains(&head)).collect()
    }

    /// Stems linked to the input beam `beam`.
    pub fn stems_of_beam(&self, beam: usize) -> Vec<&StemRecord> {
        self.stems.iter().filter(|s| s.beams.contains(&beam)).collect()
    }
}
