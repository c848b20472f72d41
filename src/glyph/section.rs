use crate::geometry::{Point, Rect};
use crate::image::Foreground;
use log::debug;
use serde::{Deserialize, Serialize};

/// Identifier of a section, equal to its index in the page section table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub u32);

/// Vertical run of ink pixels within one column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    pub start: i32,
    pub len: i32,
}

impl Run {
    #[inline]
    pub fn end(&self) -> i32 {
        self.start + self.len
    }

    #[inline]
    fn overlap(&self, other: &Run) -> i32 {
        self.end().min(other.end()) - self.start.max(other.start)
    }
}

/// Vertical section: one run per column, columns `first_x..first_x + runs.len()`.
#[derive(Clone, Debug)]
pub struct Section {
    pub id: SectionId,
    pub first_x: i32,
    pub runs: Vec<Run>,
    bounds: Rect,
    weight: i32,
    centroid: Point,
}

impl Section {
    pub fn new(id: SectionId, first_x: i32, runs: Vec<Run>) -> Self {
        let mut top = i32::MAX;
        let mut bottom = i32::MIN;
        let mut weight = 0i64;
        let (mut sx, mut sy) = (0.0f64, 0.0f64);
        for (i, run) in runs.iter().enumerate() {
            let x = first_x + i as i32;
            top = top.min(run.start);
            bottom = bottom.max(run.end());
            let n = run.len as f64;
            weight += run.len as i64;
            sx += x as f64 * n;
            // Sum of ordinates start..end-1
            sy += n * (run.start as f64 + 0.5 * (n - 1.0));
        }
        let w = weight.max(1) as f64;
        let bounds = if runs.is_empty() {
            Rect::default()
        } else {
            Rect::new(first_x, top, runs.len() as i32, bottom - top)
        };
        Self {
            id,
            first_x,
            runs,
            bounds,
            weight: weight as i32,
            centroid: Point::new(sx / w, sy / w),
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    pub fn centroid(&self) -> Point {
        self.centroid
    }

    /// Number of columns.
    pub fn width(&self) -> i32 {
        self.runs.len() as i32
    }

    /// Iterate over `(x, run)` pairs.
    pub fn columns(&self) -> impl Iterator<Item = (i32, &Run)> {
        self.runs
            .iter()
            .enumerate()
            .map(move |(i, r)| (self.first_x + i as i32, r))
    }
}

/// Split the ink of a `width x height` page into vertical sections.
///
/// A run extends the section of the previous column only through a
/// one-to-one junction whose length ratio stays within `max_length_ratio`;
/// any other junction starts a new section.
pub fn build_vertical_sections<F: Foreground>(
    ink: &F,
    width: usize,
    height: usize,
    max_length_ratio: f64,
) -> Vec<Section> {
    struct Growing {
        first_x: i32,
        runs: Vec<Run>,
    }

    let mut growing: Vec<Growing> = Vec::new();
    // Runs of previous column with the index of their section
    let mut prev: Vec<(Run, usize)> = Vec::new();

    for x in 0..width as i32 {
        let mut column = Vec::new();
        let mut y = 0i32;
        while y < height as i32 {
            if ink.is_ink(x, y) {
                let start = y;
                while y < height as i32 && ink.is_ink(x, y) {
                    y += 1;
                }
                column.push(Run {
                    start,
                    len: y - start,
                });
            } else {
                y += 1;
            }
        }

        let mut current = Vec::with_capacity(column.len());
        for run in &column {
            let mut links = prev.iter().filter(|(p, _)| p.overlap(run) > 0);
            let joined = match (links.next(), links.next()) {
                (Some((p, idx)), None) => {
                    let fan_out = column.iter().filter(|r| r.overlap(p) > 0).count();
                    let ratio = run.len.max(p.len) as f64 / run.len.min(p.len).max(1) as f64;
                    (fan_out == 1 && ratio <= max_length_ratio).then_some(*idx)
                }
                _ => None,
            };
            let idx = match joined {
                Some(idx) => {
                    growing[idx].runs.push(*run);
                    idx
                }
                None => {
                    growing.push(Growing {
                        first_x: x,
                        runs: vec![*run],
                    });
                    growing.len() - 1
                }
            };
            current.push((*run, idx));
        }
        prev = current;
    }

    let sections: Vec<Section> = growing
        .into_iter()
        .enumerate()
        .map(|(i, g)| Section::new(SectionId(i as u32), g.first_x, g.runs))
        .collect();
    debug!("build_vertical_sections {}x{} -> {} sections", width, height, sections.len());
    sections
}
