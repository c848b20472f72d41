//! Sheet-level context consumed by the stem stage.
//!
//! Modules
//! - [`scale`] – interline based conversions between fractions and pixels.
//! - [`skew`] – global sheet slope and deskewing.
//! - [`profiles`] – ordered strictness levels and per-profile constant tables.
//! - [`system`] – system geometry (bounds, parts, outer staff lines).

pub mod profiles;
pub mod scale;
pub mod skew;
pub mod system;

pub use profiles::{Profile, Profiled};
pub use scale::Scale;
pub use skew::Skew;
pub use system::{PartBounds, SystemInfo};

/// Horizontal side of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum HorizontalSide {
    Left,
    Right,
}

impl HorizontalSide {
    pub const BOTH: [HorizontalSide; 2] = [HorizontalSide::Left, HorizontalSide::Right];

    /// -1 for left, +1 for right.
    pub fn direction(self) -> i32 {
        match self {
            HorizontalSide::Left => -1,
            HorizontalSide::Right => 1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            HorizontalSide::Left => HorizontalSide::Right,
            HorizontalSide::Right => HorizontalSide::Left,
        }
    }

    pub fn index(self) -> usize {
        match self {
            HorizontalSide::Left => 0,
            HorizontalSide::Right => 1,
        }
    }
}

/// Vertical side of an entity, also used as search direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum VerticalSide {
    Top,
    Bottom,
}

impl VerticalSide {
    pub const BOTH: [VerticalSide; 2] = [VerticalSide::Top, VerticalSide::Bottom];

    /// -1 going up, +1 going down.
    pub fn direction(self) -> i32 {
        match self {
            VerticalSide::Top => -1,
            VerticalSide::Bottom => 1,
        }
    }

    pub fn of(y_dir: i32) -> Self {
        if y_dir < 0 {
            VerticalSide::Top
        } else {
            VerticalSide::Bottom
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            VerticalSide::Top => VerticalSide::Bottom,
            VerticalSide::Bottom => VerticalSide::Top,
        }
    }

    pub fn index(self) -> usize {
        match self {
            VerticalSide::Top => 0,
            VerticalSide::Bottom => 1,
        }
    }
}
