use serde::{Deserialize, Serialize};

/// Sheet scale: every geometric constant is expressed as a fraction of the
/// interline (distance between two staff lines) and converted here.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scale {
    /// Interline in pixels.
    pub interline: i32,
    /// Most frequent stem thickness in pixels.
    pub main_stem: i32,
    /// Maximum acceptable stem thickness in pixels.
    pub max_stem: i32,
}

impl Scale {
    pub fn new(interline: i32, main_stem: i32, max_stem: i32) -> Self {
        Self {
            interline: interline.max(1),
            main_stem: main_stem.max(1),
            max_stem: max_stem.max(main_stem.max(1)),
        }
    }

    /// Fraction of interline to (rounded) pixels.
    #[inline]
    pub fn to_pixels(&self, frac: f64) -> i32 {
        (frac * self.interline as f64).round() as i32
    }

    /// Fraction of interline to pixels, without rounding.
    #[inline]
    pub fn to_pixels_f(&self, frac: f64) -> f64 {
        frac * self.interline as f64
    }

    /// Pixels to fraction of interline.
    #[inline]
    pub fn pixels_to_frac(&self, pixels: f64) -> f64 {
        pixels / self.interline as f64
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::new(20, 3, 4)
    }
}
