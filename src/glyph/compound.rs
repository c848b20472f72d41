use super::section::{Section, SectionId};
use crate::geometry::{Point, Rect};

/// Growing set of sections with incremental bounds and weight.
#[derive(Clone, Debug, Default)]
pub struct SectionCompound {
    members: Vec<SectionId>,
    bounds: Rect,
    weight: i32,
}

impl SectionCompound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(&self) -> &[SectionId] {
        &self.members
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    pub fn width(&self) -> i32 {
        self.bounds.w
    }

    /// Weight divided by height.
    pub fn mean_thickness(&self) -> f64 {
        if self.bounds.h > 0 {
            self.weight as f64 / self.bounds.h as f64
        } else {
            0.0
        }
    }

    pub fn add(&mut self, section: &Section) {
        if self.members.contains(&section.id) {
            return;
        }
        self.members.push(section.id);
        self.bounds = self.bounds.union(&section.bounds());
        self.weight += section.weight();
    }

    pub fn remove(&mut self, table: &[Section], id: SectionId) {
        self.members.retain(|m| *m != id);
        self.bounds = Rect::default();
        self.weight = 0;
        for m in &self.members {
            let s = &table[m.0 as usize];
            self.bounds = self.bounds.union(&s.bounds());
            self.weight += s.weight();
        }
    }

    /// Centroid of member centroids weighted by section weight.
    pub fn centroid(&self, table: &[Section]) -> Option<Point> {
        if self.weight == 0 {
            return None;
        }
        let (mut sx, mut sy) = (0.0, 0.0);
        for m in &self.members {
            let s = &table[m.0 as usize];
            let w = s.weight() as f64;
            sx += s.centroid().x * w;
            sy += s.centroid().y * w;
        }
        let w = self.weight as f64;
        Some(Point::new(sx / w, sy / w))
    }
}
