/// Read-only access to a row-major raster.
pub trait ImageView {
    type Pixel: Copy;

    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn stride(&self) -> usize;

    fn row(&self, y: usize) -> &[Self::Pixel];

    fn rows(&self) -> Rows<'_, Self>
    where
        Self: Sized,
    {
        Rows { image: self, y: 0 }
    }

    fn is_contiguous(&self) -> bool {
        self.stride() == self.width()
    }
}

/// Binary interpretation of a raster: ink (foreground) versus background.
///
/// Coordinates are signed so that callers scanning belts around a stem may
/// step outside the image; such pixels read as background.
pub trait Foreground {
    fn is_ink(&self, x: i32, y: i32) -> bool;

    /// True if at least one pixel of row `y` in `x0..=x1` is ink.
    fn any_ink(&self, y: i32, x0: i32, x1: i32) -> bool {
        (x0..=x1).any(|x| self.is_ink(x, y))
    }
}

pub struct Rows<'a, I: ?Sized + ImageView> {
    image: &'a I,
    y: usize,
}

impl<'a, I: ImageView> Iterator for Rows<'a, I> {
    type Item = &'a [I::Pixel];

    fn next(&mut self) -> Option<Self::Item> {
        if self.y >= self.image.height() {
            return None;
        }
        let y = self.y;
        self.y += 1;
        Some(self.image.row(y))
    }
}
