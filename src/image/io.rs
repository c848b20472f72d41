//! I/O helpers for grayscale pages and JSON.
//!
//! - `GrayImageU8`: owned 8-bit buffer with a borrowed view and simple
//!   painting used to synthesize pages.
//! - `load_grayscale_image`: read a PNG/JPEG/etc. into an owned gray buffer.
//! - `save_grayscale_u8`: write an owned gray buffer to disk.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::ImageU8;
use crate::geometry::{Point, Rect};
use image::{DynamicImage, ImageBuffer, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const PAPER: u8 = 255;
pub const INK: u8 = 0;

/// Owned 8-bit grayscale buffer with stride and borrowed view conversion.
#[derive(Clone, Debug)]
pub struct GrayImageU8 {
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<u8>,
}

impl GrayImageU8 {
    /// Construct an owned grayscale buffer given raw bytes.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width,
            data,
        }
    }

    /// Blank page filled with paper color.
    pub fn blank(width: usize, height: usize) -> Self {
        Self::new(width, height, vec![PAPER; width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Borrow as a read-only `ImageU8` view
    pub fn as_view(&self) -> ImageU8<'_> {
        ImageU8 {
            w: self.width,
            h: self.height,
            stride: self.stride,
            data: &self.data,
        }
    }

    pub fn set(&mut self, x: i32, y: i32, value: u8) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        self.data[y as usize * self.stride + x as usize] = value;
    }

    /// Paint an ink rectangle, clipped to the page.
    pub fn fill_rect(&mut self, rect: &Rect) {
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                self.set(x, y, INK);
            }
        }
    }

    /// Paint an ink band of `height` pixels centered on the segment
    /// `left -> right` (beam-like shape).
    pub fn fill_band(&mut self, left: Point, right: Point, height: f64) {
        let x0 = left.x.round() as i32;
        let x1 = right.x.round() as i32;
        for x in x0..x1 {
            let t = if x1 > x0 {
                (x - x0) as f64 / (x1 - x0) as f64
            } else {
                0.0
            };
            let yc = left.y + t * (right.y - left.y);
            let top = (yc - 0.5 * height).round() as i32;
            let bottom = (yc + 0.5 * height).round() as i32;
            for y in top..bottom {
                self.set(x, y, INK);
            }
        }
    }

    /// Paint an ink ellipse inscribed in `rect` (note-head-like shape).
    pub fn fill_ellipse(&mut self, rect: &Rect) {
        let c = rect.center();
        let (rx, ry) = (0.5 * rect.w as f64, 0.5 * rect.h as f64);
        if rx <= 0.0 || ry <= 0.0 {
            return;
        }
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                let dx = (x as f64 + 0.5 - c.x) / rx;
                let dy = (y as f64 + 0.5 - c.y) / ry;
                if dx * dx + dy * dy <= 1.0 {
                    self.set(x, y, INK);
                }
            }
        }
    }
}

/// Load an image from disk and convert to 8-bit grayscale.
pub fn load_grayscale_image(path: &Path) -> Result<GrayImageU8, String> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
        .into_luma8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = img.into_raw();
    Ok(GrayImageU8::new(width, height, data))
}

/// Save an 8-bit grayscale buffer to a PNG.
pub fn save_grayscale_u8(buffer: &GrayImageU8, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let image: ImageBuffer<Luma<u8>, Vec<u8>> =
        ImageBuffer::from_raw(buffer.width as u32, buffer.height as u32, buffer.data.clone())
            .ok_or_else(|| "Failed to create image buffer".to_string())?;
    DynamicImage::ImageLuma8(image)
        .save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Foreground, DEFAULT_INK_THRESHOLD};

    #[test]
    fn painted_rect_reads_back_as_ink() {
        let mut page = GrayImageU8::blank(20, 20);
        page.fill_rect(&Rect::new(5, 2, 2, 10));
        let bin = page.as_view().binary(DEFAULT_INK_THRESHOLD);
        assert!(bin.is_ink(5, 2));
        assert!(bin.is_ink(6, 11));
        assert!(!bin.is_ink(7, 5));
        assert!(!bin.is_ink(5, 12));
    }
}
