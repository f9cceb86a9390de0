//! Character-grid rendering primitives shared by media conversion and avatars.
//!
//! The stages run in this order for every pixel buffer:
//!
//! 1. **Resampling** - area-average the source onto the target grid, cropping
//!    to compensate for the terminal cell aspect ratio
//! 2. **Luminance** - RGB to luminance using BT.601
//! 3. **Dithering** - optional Floyd-Steinberg error diffusion
//! 4. **Glyph mapping** - quantize luminance onto a density-ordered ramp
//!
//! # Ramps
//!
//! Ramps are ordered from sparsest to densest glyph, see [`GlyphRamp`]:
//! - `standard` - 10-level ASCII density ramp
//! - `blocks` - Unicode shade blocks
//! - `minimal` - 4-level clean look
//! - `dense` - 11-level ramp used for photo attachments

mod cell;
mod dimensions;
mod dither;
mod frame;
mod grayscale;
mod mapper;
mod ramp;
mod resample;

pub use cell::{Cell, ColorMode, Rgb};
pub use dimensions::{fit_grid, DEFAULT_CELL_ASPECT_RATIO};
pub use dither::dither_floyd_steinberg;
pub use frame::{Frame, FrameError};
pub use grayscale::luminance;
pub use mapper::GlyphMapper;
pub use ramp::{GlyphRamp, RampError, BLOCKS_RAMP, DENSE_RAMP, MINIMAL_RAMP, STANDARD_RAMP};
pub use resample::{resample, Sample, SampleGrid};
