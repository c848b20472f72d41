//! Raster access for the pixel-based stem checks.
//!
//! - `ImageU8`: borrowed 8-bit grayscale view, `BinaryView` thresholds it.
//! - `Foreground`: ink test used by the clean/black/gap measurements.
//! - `io`: owned buffers, painting helpers, image and JSON files.

pub mod io;
pub mod traits;
pub mod u8;

pub use self::traits::{Foreground, ImageView, Rows};
pub use self::u8::{BinaryView, ImageU8, DEFAULT_INK_THRESHOLD};
