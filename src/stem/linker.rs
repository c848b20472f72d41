//! Anchor arena.
//!
//! Every place a stem may depart from or arrive at is an [`Anchor`]: a head
//! corner, a beam side, a beam stump, or an ad-hoc point created on a beam
//! when a search crosses it. Anchors refer to each other only through
//! [`AnchorId`]s. Their `linked`/`closed` flags live in shared
//! [`AnchorState`] records: both corners of one head side share a state,
//! as do both vertical searches of one beam anchor.

use super::builder::StemBuilder;
use super::item::Owner;
use crate::geometry::{Area, Point, Segment};
use crate::glyph::GlyphId;
use crate::sheet::{HorizontalSide, Skew, VerticalSide};
use crate::sig::InterId;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnchorId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorKind {
    HeadCorner {
        head: InterId,
        h_side: HorizontalSide,
        v_side: VerticalSide,
    },
    BeamSide {
        beam: InterId,
        h_side: HorizontalSide,
    },
    BeamStump {
        beam: InterId,
    },
    AdHoc {
        beam: InterId,
    },
}

impl AnchorKind {
    pub fn owner(&self) -> Owner {
        match *self {
            AnchorKind::HeadCorner { head, .. } => Owner::Head(head),
            AnchorKind::BeamSide { beam, .. }
            | AnchorKind::BeamStump { beam }
            | AnchorKind::AdHoc { beam } => Owner::Beam(beam),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnchorState {
    /// Successfully connected.
    pub linked: bool,
    /// No further attempt allowed.
    pub closed: bool,
}

/// Search departing from an anchor in one vertical direction.
#[derive(Clone, Debug)]
pub struct Search {
    pub y_dir: i32,
    pub lu_area: Area,
    pub theo_line: Segment,
    pub builder: Option<Arc<StemBuilder>>,
}

#[derive(Clone, Debug)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub ref_pt: Point,
    pub stump: Option<GlyphId>,
    pub state: StateId,
    searches: [Option<Search>; 2],
}

#[derive(Clone, Debug, Default)]
pub struct AnchorArena {
    anchors: Vec<Anchor>,
    states: Vec<AnchorState>,
}

impl AnchorArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_state(&mut self) -> StateId {
        self.states.push(AnchorState::default());
        StateId(self.states.len() as u32 - 1)
    }

    pub fn add(
        &mut self,
        kind: AnchorKind,
        ref_pt: Point,
        stump: Option<GlyphId>,
        state: StateId,
    ) -> AnchorId {
        self.anchors.push(Anchor {
            kind,
            ref_pt,
            stump,
            state,
            searches: [None, None],
        });
        AnchorId(self.anchors.len() as u32 - 1)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn get(&self, id: AnchorId) -> &Anchor {
        &self.anchors[id.0 as usize]
    }

    pub fn state(&self, id: AnchorId) -> AnchorState {
        self.states[self.get(id).state.0 as usize]
    }

    pub fn is_linked(&self, id: AnchorId) -> bool {
        self.state(id).linked
    }

    pub fn is_closed(&self, id: AnchorId) -> bool {
        self.state(id).closed
    }

    /// Mark as linked, which also closes it.
    pub fn set_linked(&mut self, id: AnchorId) {
        let state = self.get(id).state.0 as usize;
        self.states[state] = AnchorState {
            linked: true,
            closed: true,
        };
    }

    pub fn set_closed(&mut self, id: AnchorId) {
        let state = self.get(id).state.0 as usize;
        self.states[state].closed = true;
    }

    pub fn search(&self, id: AnchorId, v_side: VerticalSide) -> Option<&Search> {
        self.get(id).searches[v_side.index()].as_ref()
    }

    pub fn set_search(&mut self, id: AnchorId, v_side: VerticalSide, search: Search) {
        self.anchors[id.0 as usize].searches[v_side.index()] = Some(search);
    }

    pub fn builder(&self, id: AnchorId, v_side: VerticalSide) -> Option<Arc<StemBuilder>> {
        self.search(id, v_side).and_then(|s| s.builder.clone())
    }

    /// Directions that received a search.
    pub fn search_sides(&self, id: AnchorId) -> Vec<VerticalSide> {
        VerticalSide::BOTH
            .into_iter()
            .filter(|v| self.search(id, *v).is_some())
            .collect()
    }
}

/// Line from `ref_pt` along the sheet vertical down (or up) to `y_limit`.
pub fn theoretical_line(skew: &Skew, ref_pt: Point, y_limit: f64) -> Segment {
    let vertical = skew.skewed_vertical(&ref_pt);
    let end = Point::new(vertical.x_at_y(y_limit), y_limit);
    Segment::new(ref_pt, end)
}

/// Lookup area starting on edge `pl -> pr` and extending to `y_limit`,
/// its sides following the sheet vertical widened by `slope_margin`.
pub fn lookup_area(
    skew: &Skew,
    pl: Point,
    pr: Point,
    y_limit: f64,
    y_dir: i32,
    slope_margin: f64,
) -> Area {
    let base = -skew.slope();
    let dir = y_dir as f64;
    let left = base - dir * slope_margin;
    let right = base + dir * slope_margin;
    let bl = Point::new(pl.x + (y_limit - pl.y) * left, y_limit);
    let br = Point::new(pr.x + (y_limit - pr.y) * right, y_limit);
    Area::new(vec![pl, pr, br, bl])
}
