use crate::geometry::{Point, Rect, Segment};
use crate::image::ImageU8;
use crate::sheet::{Scale, SystemInfo};
use crate::sig::{Beam, Head, HeadShape};
use serde::{Deserialize, Serialize};

/// Head detected upstream.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadInput {
    pub bounds: Rect,
    pub shape: HeadShape,
    pub grade: f64,
    #[serde(default)]
    pub vip: bool,
}

impl HeadInput {
    pub fn to_head(&self) -> Head {
        Head {
            shape: self.shape,
            bounds: self.bounds,
            grade: self.grade,
            vip: self.vip,
            abnormal: false,
        }
    }
}

/// Beam detected upstream, given by its median line and height.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamInput {
    pub p1: [f64; 2],
    pub p2: [f64; 2],
    pub height: f64,
    pub grade: f64,
    #[serde(default)]
    pub hook: bool,
    /// Beam group; beams without group form their own.
    #[serde(default)]
    pub group: Option<usize>,
    /// Identity of the underlying glyph.
    #[serde(default)]
    pub glyph: Option<u32>,
    #[serde(default)]
    pub vip: bool,
}

impl BeamInput {
    pub fn median(&self) -> Segment {
        let a = Point::new(self.p1[0], self.p1[1]);
        let b = Point::new(self.p2[0], self.p2[1]);
        if a.x <= b.x {
            Segment::new(a, b)
        } else {
            Segment::new(b, a)
        }
    }

    /// Beam inter; `fallback_group` is used when no group is given.
    pub fn to_beam(&self, fallback_group: usize) -> Beam {
        Beam {
            median: self.median(),
            height: self.height,
            grade: self.grade,
            hook: self.hook,
            group: self.group.unwrap_or(fallback_group),
            glyph: self.glyph,
            vip: self.vip,
        }
    }
}

/// Reference to an input or output entity by kind and index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "camelCase")]
pub enum InterRef {
    Head(usize),
    Beam(usize),
    Stem(usize),
}

/// Everything known about one system before stems are linked.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInput {
    pub info: SystemInfo,
    #[serde(default)]
    pub heads: Vec<HeadInput>,
    #[serde(default)]
    pub beams: Vec<BeamInput>,
    /// Boxes of candidate stem seeds; a seed is made of the sections whose
    /// centroid lies in its box.
    #[serde(default)]
    pub seeds: Vec<Rect>,
    /// Regions where no stem may lie, such as connected barlines.
    #[serde(default)]
    pub no_stem_areas: Vec<Rect>,
    #[serde(default)]
    pub exclusions: Vec<(InterRef, InterRef)>,
}

/// One page ready for stem linking.
#[derive(Clone, Debug)]
pub struct Page<'a> {
    pub image: ImageU8<'a>,
    pub scale: Scale,
    /// Global slope of staff lines.
    pub slope: f64,
    pub systems: Vec<SystemInput>,
}
