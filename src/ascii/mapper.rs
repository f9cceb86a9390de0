//! Luminance to glyph mapping.

use super::cell::{Cell, ColorMode, Rgb};
use super::dither::dither_floyd_steinberg;
use super::frame::Frame;
use super::ramp::GlyphRamp;
use super::resample::SampleGrid;

/// Linear response; the default so that `index = floor(l * (len - 1))`.
pub const LINEAR_GAMMA: f32 = 1.0;

/// Maps luminance samples onto a glyph ramp.
///
/// Pure and deterministic: the same input always produces the same cell.
/// Luminance is optionally gamma corrected (`l' = l^(1/gamma)`) and then
/// quantized with `index = floor(l' * (len - 1))`, clamped to the ramp.
#[derive(Debug, Clone)]
pub struct GlyphMapper {
    ramp: GlyphRamp,
    color_mode: ColorMode,
    gamma: f32,
}

impl Default for GlyphMapper {
    fn default() -> Self {
        Self::new(GlyphRamp::default(), ColorMode::Mono)
    }
}

impl GlyphMapper {
    pub fn new(ramp: GlyphRamp, color_mode: ColorMode) -> Self {
        Self {
            ramp,
            color_mode,
            gamma: LINEAR_GAMMA,
        }
    }

    /// Use a display gamma other than linear. Non-positive or non-finite
    /// values fall back to linear.
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = if gamma.is_finite() && gamma > 0.0 {
            gamma
        } else {
            LINEAR_GAMMA
        };
        self
    }

    pub fn ramp(&self) -> &GlyphRamp {
        &self.ramp
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    /// Ramp bucket for a luminance value in `0.0..=1.0`.
    ///
    /// Out-of-range and NaN inputs are clamped (NaN counts as black).
    pub fn index(&self, luminance: f32) -> usize {
        let l = if luminance.is_nan() {
            0.0
        } else {
            luminance.clamp(0.0, 1.0)
        };
        let l = if self.gamma == LINEAR_GAMMA {
            l
        } else {
            l.powf(1.0 / self.gamma)
        };
        let last = self.ramp.len() - 1;
        ((l * last as f32).floor() as usize).min(last)
    }

    /// Luminance represented by a bucket, the inverse of [`index`](Self::index)
    /// at bucket boundaries. Used for error diffusion.
    pub fn bucket_luminance(&self, index: usize) -> f32 {
        let last = (self.ramp.len() - 1) as f32;
        let l = index.min(self.ramp.len() - 1) as f32 / last;
        if self.gamma == LINEAR_GAMMA {
            l
        } else {
            l.powf(self.gamma)
        }
    }

    /// Map a sample to a cell. The color is attached unchanged when color
    /// output is enabled and dropped otherwise.
    pub fn map(&self, luminance: f32, color: Option<Rgb>) -> Cell {
        let glyph = self.ramp.glyph(self.index(luminance));
        let color = if self.color_mode.is_color() {
            color
        } else {
            None
        };
        Cell::new(glyph, color)
    }

    /// Blank cell used for padding and placeholders.
    pub fn blank(&self) -> Cell {
        Cell::new(self.ramp.sparsest(), None)
    }

    /// Map a whole sample grid into a frame, optionally dithering.
    pub fn map_grid(&self, grid: &SampleGrid, dither: bool) -> Frame {
        let cells = if dither {
            dither_floyd_steinberg(grid, self)
        } else {
            grid.samples
                .iter()
                .map(|s| self.map(s.luminance, Some(s.color)))
                .collect()
        };
        // the grid always holds width * height samples
        Frame::new(grid.width, grid.height, cells)
            .unwrap_or_else(|_| Frame::filled(grid.width, grid.height, self.blank()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> GlyphMapper {
        GlyphMapper::default()
    }

    #[test]
    fn test_map_black_is_sparsest() {
        assert_eq!(standard().map(0.0, None).glyph(), ' ');
    }

    #[test]
    fn test_map_white_is_densest() {
        assert_eq!(standard().map(1.0, None).glyph(), '@');
    }

    #[test]
    fn test_index_formula() {
        let mapper = standard();
        // floor(0.5 * 9) = 4
        assert_eq!(mapper.index(0.5), 4);
        // floor(0.99 * 9) = 8
        assert_eq!(mapper.index(0.99), 8);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let mapper = standard();
        assert_eq!(mapper.index(-3.0), 0);
        assert_eq!(mapper.index(7.0), 9);
        assert_eq!(mapper.index(f32::NAN), 0);
    }

    #[test]
    fn test_mono_drops_color() {
        let cell = standard().map(0.5, Some(Rgb::new(255, 0, 0)));
        assert_eq!(cell.color(), None);
    }

    #[test]
    fn test_color_mode_keeps_color_unchanged() {
        let mapper = GlyphMapper::new(GlyphRamp::default(), ColorMode::Truecolor);
        let cell = mapper.map(0.5, Some(Rgb::new(12, 34, 56)));
        assert_eq!(cell.color(), Some(Rgb::new(12, 34, 56)));
    }

    #[test]
    fn test_gamma_brightens_midtones() {
        let linear = standard();
        let gamma = standard().with_gamma(2.2);
        assert!(gamma.index(0.25) > linear.index(0.25));
        assert_eq!(gamma.index(0.0), 0);
        assert_eq!(gamma.index(1.0), 9);
    }

    #[test]
    fn test_invalid_gamma_falls_back_to_linear() {
        assert_eq!(standard().with_gamma(0.0).gamma(), LINEAR_GAMMA);
        assert_eq!(standard().with_gamma(f32::NAN).gamma(), LINEAR_GAMMA);
    }

    #[test]
    fn test_bucket_luminance_round_trips_boundaries() {
        let mapper = standard();
        for i in 0..mapper.ramp().len() {
            assert_eq!(mapper.index(mapper.bucket_luminance(i)), i);
        }
    }
}
