//! Media sources and raw pixel buffers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::decode::image_error;
use super::error::ConversionError;
use super::ffmpeg::{video_info, FfmpegTools};

/// A decoded picture in packed RGB24, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap packed RGB24 data, checking its length.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ConversionError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(ConversionError::BadPixelBuffer {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer where every pixel has the same color.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// A gray buffer of one luminance byte.
    pub fn gray(width: u32, height: u32, value: u8) -> Self {
        Self::solid(width, height, [value; 3])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// What kind of decoder a file needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// A single still picture.
    Image,
    /// An animated GIF, decoded frame by frame.
    Animation,
    /// A video container decoded through ffmpeg.
    Video,
}

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "webp", "tif", "tiff", "tga", "ico", "pnm", "ppm", "pgm", "qoi",
];
const ANIMATION_EXTENSIONS: &[&str] = &["gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "webm", "mkv", "avi", "mpg", "mpeg", "ogv"];

impl MediaKind {
    /// Classify a path by its extension.
    pub fn detect(path: &Path) -> Result<Self, ConversionError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| ConversionError::UnsupportedFormat(path.display().to_string()))?;

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Ok(MediaKind::Image)
        } else if ANIMATION_EXTENSIONS.contains(&ext.as_str()) {
            Ok(MediaKind::Animation)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Ok(MediaKind::Video)
        } else {
            Err(ConversionError::UnsupportedFormat(ext))
        }
    }
}

/// Something the engine can turn into frames.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
    /// A file on disk; the decoder is picked from the extension.
    File(PathBuf),
    /// An in-memory still picture.
    Pixels(Arc<PixelBuffer>),
    /// An in-memory clip played at a fixed frame interval.
    Sequence {
        frames: Arc<Vec<PixelBuffer>>,
        frame_interval: Duration,
    },
}

impl MediaSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        MediaSource::File(path.into())
    }

    pub fn pixels(buffer: PixelBuffer) -> Self {
        MediaSource::Pixels(Arc::new(buffer))
    }

    pub fn sequence(frames: Vec<PixelBuffer>, frame_interval: Duration) -> Self {
        MediaSource::Sequence {
            frames: Arc::new(frames),
            frame_interval,
        }
    }

    /// Pixel size of the source without decoding it. Video is measured with
    /// ffprobe; a clip reports its first frame.
    pub fn dimensions(&self) -> Result<(u32, u32), ConversionError> {
        match self {
            MediaSource::File(path) => match MediaKind::detect(path)? {
                MediaKind::Image | MediaKind::Animation => {
                    image::image_dimensions(path).map_err(|e| image_error(path, e))
                }
                MediaKind::Video => {
                    video_info(&FfmpegTools::default(), path).map(|info| (info.width, info.height))
                }
            },
            MediaSource::Pixels(buf) => Ok((buf.width(), buf.height())),
            MediaSource::Sequence { frames, .. } => Ok(frames
                .first()
                .map(|f| (f.width(), f.height()))
                .unwrap_or((0, 0))),
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::File(path) => write!(f, "{}", path.display()),
            MediaSource::Pixels(buf) => write!(f, "<{}x{} pixels>", buf.width(), buf.height()),
            MediaSource::Sequence { frames, .. } => write!(f, "<{} frame clip>", frames.len()),
        }
    }
}
