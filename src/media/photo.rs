//! Still pictures converted once, for attaching to posts.

use std::path::Path;

use crate::ascii::{fit_grid, Frame, GlyphRamp, DEFAULT_CELL_ASPECT_RATIO};

use super::convert::{render_pixels, ConvertOptions};
use super::decode::Decoder;
use super::error::ConversionError;
use super::source::{MediaKind, MediaSource};

/// Columns of an attached photo.
pub const PHOTO_WIDTH: u16 = 60;

/// Rows a very tall photo is capped at.
pub const PHOTO_MAX_HEIGHT: u16 = 45;

/// Convert the picture at `path` into a mono frame `PHOTO_WIDTH` columns
/// wide, using the dense ramp. Animations contribute their first frame;
/// video is refused.
///
/// Blocks on file I/O, so callers on the UI task run it elsewhere.
pub fn ascii_photo(path: &Path) -> Result<Frame, ConversionError> {
    if MediaKind::detect(path)? == MediaKind::Video {
        return Err(ConversionError::UnsupportedFormat(format!(
            "{}: only pictures can be attached",
            path.display()
        )));
    }
    let mut decoder = Decoder::open(&MediaSource::file(path))?;
    let first = decoder
        .next_frame()
        .ok_or_else(|| ConversionError::decode(0, "picture has no frames"))??;

    let (width, height) = fit_grid(
        first.pixels.width(),
        first.pixels.height(),
        PHOTO_WIDTH,
        PHOTO_MAX_HEIGHT,
        DEFAULT_CELL_ASPECT_RATIO,
    );
    let opts = ConvertOptions::new(width, height).with_ramp(GlyphRamp::dense());
    let frame = render_pixels(&first.pixels, &opts)?;
    log::debug!("photo {} converted to {}x{}", path.display(), frame.width(), frame.height());
    Ok(frame)
}
