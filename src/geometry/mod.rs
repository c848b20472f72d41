//! Planar primitives shared by the stem search.
//!
//! Overview
//! - [`Rect`] is the integer bounding box used for glyphs, heads and systems.
//! - [`Segment`] is a finite line given by two points. Intersections go through
//!   the homogeneous form `ax + by + c = 0` so that nearly parallel lines are
//!   rejected instead of producing far-away points.
//! - [`Area`] is a convex polygon used as lookup area around a stem anchor.
//!
//! Ordinates grow downwards, as in image space.

mod area;
mod rect;
mod segment;

pub use area::Area;
pub use rect::Rect;
pub use segment::Segment;

/// Point in image space (x to the right, y downwards).
pub type Point = nalgebra::Point2<f64>;

pub(crate) const EPS: f64 = 1e-9;

/// Convenience constructor.
#[inline]
pub fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}
