//! The conversion stream: decode, resample, map, dither.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ascii::{fit_grid, resample, ColorMode, Frame, GlyphMapper, GlyphRamp, DEFAULT_CELL_ASPECT_RATIO};

use super::decode::{DecodedFrame, Decoder};
use super::error::ConversionError;
use super::ffmpeg::FfmpegTools;
use super::source::{MediaSource, PixelBuffer};

/// Cooperative cancellation flag shared between the UI and a worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Target grid and glyph settings for one conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub width: u16,
    pub height: u16,
    pub mapper: GlyphMapper,
    pub dither: bool,
    /// Cell height divided by cell width.
    pub cell_aspect: f32,
    /// Treat `width x height` as a bound and shrink it to the source's
    /// aspect once the first picture is decoded.
    pub fit: bool,
    pub tools: FfmpegTools,
}

impl ConvertOptions {
    /// Standard ramp, mono, no dithering.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            mapper: GlyphMapper::default(),
            dither: false,
            cell_aspect: DEFAULT_CELL_ASPECT_RATIO,
            fit: false,
            tools: FfmpegTools::default(),
        }
    }

    pub fn with_mapper(mut self, mapper: GlyphMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_ramp(mut self, ramp: GlyphRamp) -> Self {
        self.mapper = GlyphMapper::new(ramp, self.mapper.color_mode()).with_gamma(self.mapper.gamma());
        self
    }

    pub fn with_color_mode(mut self, mode: ColorMode) -> Self {
        self.mapper = GlyphMapper::new(self.mapper.ramp().clone(), mode).with_gamma(self.mapper.gamma());
        self
    }

    pub fn with_dither(mut self, dither: bool) -> Self {
        self.dither = dither;
        self
    }

    pub fn with_cell_aspect(mut self, aspect: f32) -> Self {
        self.cell_aspect = aspect;
        self
    }

    pub fn with_fit(mut self, fit: bool) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_tools(mut self, tools: FfmpegTools) -> Self {
        self.tools = tools;
        self
    }

    /// Shrink a bounding grid to the aspect of a `src_w x src_h` picture.
    /// Leaves the grid alone if fitting would empty it.
    fn fit_to(&mut self, src_w: u32, src_h: u32) {
        let (w, h) = fit_grid(src_w, src_h, self.width, self.height, self.cell_aspect);
        if w > 0 && h > 0 {
            self.width = w;
            self.height = h;
        }
    }

    fn check_grid(&self) -> Result<(), ConversionError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConversionError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Resample one pixel buffer and map it to a frame of exactly
/// `opts.width x opts.height` cells.
///
/// This is the stage shared by media playback and avatars.
pub fn render_pixels(pixels: &PixelBuffer, opts: &ConvertOptions) -> Result<Frame, ConversionError> {
    opts.check_grid()?;
    if pixels.is_empty() {
        return Ok(Frame::filled(opts.width, opts.height, opts.mapper.blank()));
    }
    let grid = resample(
        pixels.data(),
        pixels.width(),
        pixels.height(),
        opts.width,
        opts.height,
        opts.cell_aspect,
    );
    Ok(opts.mapper.map_grid(&grid, opts.dither))
}

/// Start converting `source`. Nothing is decoded until the stream is pulled.
pub fn convert(source: &MediaSource, opts: ConvertOptions, cancel: CancelToken) -> FrameStream {
    FrameStream {
        source: source.clone(),
        opts,
        cancel,
        state: StreamState::Unopened,
    }
}

enum StreamState {
    Unopened,
    Open(Decoder),
    Finished,
}

/// A lazy, ordered, non-rewindable sequence of frames.
///
/// Ends after the source is exhausted, after the first error, or as soon as
/// cancellation is observed. On cancellation the decoder (and any ffmpeg
/// child) is dropped immediately.
pub struct FrameStream {
    source: MediaSource,
    opts: ConvertOptions,
    cancel: CancelToken,
    state: StreamState,
}

impl FrameStream {
    pub fn options(&self) -> &ConvertOptions {
        &self.opts
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn stop(&mut self) {
        if matches!(self.state, StreamState::Open(_)) {
            log::debug!("conversion of {} stopped", self.source);
        }
        self.state = StreamState::Finished;
    }

    /// Decode the next picture without mapping it.
    ///
    /// Lets a paced consumer drop late frames before paying for resampling.
    pub fn next_decoded(&mut self) -> Option<Result<DecodedFrame, ConversionError>> {
        if self.cancel.is_cancelled() {
            self.stop();
            return None;
        }
        if matches!(self.state, StreamState::Unopened) {
            let opened = self
                .opts
                .check_grid()
                .and_then(|_| Decoder::open_with(&self.source, &self.opts.tools));
            match opened {
                Ok(decoder) => self.state = StreamState::Open(decoder),
                Err(e) => {
                    self.state = StreamState::Finished;
                    return Some(Err(e));
                }
            }
        }
        let decoder = match &mut self.state {
            StreamState::Open(decoder) => decoder,
            _ => return None,
        };
        match decoder.next_frame() {
            Some(Ok(decoded)) => {
                if self.opts.fit {
                    self.opts.fit = false;
                    self.opts.fit_to(decoded.pixels.width(), decoded.pixels.height());
                    log::debug!("{} fitted to {}x{}", self.source, self.opts.width, self.opts.height);
                }
                Some(Ok(decoded))
            }
            Some(Err(e)) => {
                log::warn!("conversion of {} failed: {}", self.source, e);
                self.stop();
                Some(Err(e))
            }
            None => {
                self.stop();
                None
            }
        }
    }

    /// Map a decoded picture with this stream's options.
    pub fn render(&self, decoded: &DecodedFrame) -> Result<Frame, ConversionError> {
        render_pixels(&decoded.pixels, &self.opts)
    }
}

impl Iterator for FrameStream {
    type Item = Result<Frame, ConversionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let decoded = match self.next_decoded()? {
            Ok(decoded) => decoded,
            Err(e) => return Some(Err(e)),
        };
        let frame = self.render(&decoded);
        if self.cancel.is_cancelled() {
            self.stop();
            return None;
        }
        if frame.is_err() {
            self.stop();
        }
        Some(frame)
    }
}
