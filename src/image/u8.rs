use super::traits::{Foreground, ImageView};

/// Gray level below which a pixel counts as ink.
pub const DEFAULT_INK_THRESHOLD: u8 = 128;

/// Borrowed 8-bit grayscale view (dark ink on light paper).
#[derive(Clone, Copy, Debug)]
pub struct ImageU8<'a> {
    pub w: usize,
    pub h: usize,
    pub stride: usize, // bytes between rows
    pub data: &'a [u8],
}

impl<'a> ImageU8<'a> {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.stride + x]
    }

    /// Pixel value, or `None` outside the image.
    #[inline]
    pub fn get_checked(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 || x as usize >= self.w || y as usize >= self.h {
            return None;
        }
        Some(self.get(x as usize, y as usize))
    }

    /// Binary view using the given ink threshold.
    pub fn binary(self, threshold: u8) -> BinaryView<'a> {
        BinaryView {
            image: self,
            threshold,
        }
    }
}

impl<'a> ImageView for ImageU8<'a> {
    type Pixel = u8;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

/// Thresholded view over an [`ImageU8`].
#[derive(Clone, Copy, Debug)]
pub struct BinaryView<'a> {
    pub image: ImageU8<'a>,
    pub threshold: u8,
}

impl<'a> BinaryView<'a> {
    pub fn width(&self) -> usize {
        self.image.w
    }

    pub fn height(&self) -> usize {
        self.image.h
    }
}

impl<'a> Foreground for BinaryView<'a> {
    #[inline]
    fn is_ink(&self, x: i32, y: i32) -> bool {
        matches!(self.image.get_checked(x, y), Some(v) if v < self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_pixels_are_background() {
        let data = vec![0u8; 4 * 3];
        let view = ImageU8 {
            w: 4,
            h: 3,
            stride: 4,
            data: &data,
        }
        .binary(DEFAULT_INK_THRESHOLD);
        assert!(view.is_ink(0, 0));
        assert!(!view.is_ink(-1, 0));
        assert!(!view.is_ink(4, 2));
        assert!(view.any_ink(1, -3, 0));
    }
}
