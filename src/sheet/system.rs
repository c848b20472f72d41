use crate::geometry::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Vertical extent of one part (group of staves) within a system.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartBounds {
    pub top: i32,
    pub bottom: i32,
}

/// Geometry of one system, the unit of independent processing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub id: usize,
    pub bounds: Rect,
    #[serde(default)]
    pub parts: Vec<PartBounds>,
    /// Ordinate of the first line of the first staff.
    pub staff_top: f64,
    /// Ordinate of the last line of the last staff.
    pub staff_bottom: f64,
}

impl SystemInfo {
    /// Ordinate where a vertical search from `center` must stop in
    /// direction `y_dir`: the enclosing part border, or the system border.
    pub fn part_limit(&self, center: &Point, y_dir: i32) -> f64 {
        let part = self
            .parts
            .iter()
            .find(|p| center.y >= p.top as f64 && center.y <= p.bottom as f64)
            .or_else(|| {
                self.parts.iter().min_by(|a, b| {
                    let da = dist_to_part(a, center.y);
                    let db = dist_to_part(b, center.y);
                    da.total_cmp(&db)
                })
            });
        match part {
            Some(p) if y_dir > 0 => p.bottom.max(self.bounds.y) as f64,
            Some(p) => p.top.min(self.bounds.bottom() - 1) as f64,
            None => self.system_limit(y_dir),
        }
    }

    /// System border in direction `y_dir`.
    pub fn system_limit(&self, y_dir: i32) -> f64 {
        if y_dir > 0 {
            (self.bounds.bottom() - 1) as f64
        } else {
            self.bounds.y as f64
        }
    }
}

fn dist_to_part(p: &PartBounds, y: f64) -> f64 {
    if y < p.top as f64 {
        p.top as f64 - y
    } else {
        (y - p.bottom as f64).max(0.0)
    }
}
