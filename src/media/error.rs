//! Conversion error taxonomy.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a conversion. They are contained by the engine: the job
/// moves to `Failed` and the UI shows the message in place of the frame.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The file type is not one we can decode.
    #[error("unsupported media format: {0}")]
    UnsupportedFormat(String),

    /// The source could not be opened or read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The decoder rejected the data, possibly after some frames.
    #[error("decode failed at frame {frame}: {message}")]
    Decode { frame: usize, message: String },

    /// Video decoding needs ffmpeg/ffprobe on PATH.
    #[error("ffmpeg not found; install ffmpeg to play video")]
    FfmpegNotFound,

    /// A pixel buffer did not match its declared size.
    #[error("pixel buffer of {width}x{height} needs {expected} bytes, got {actual}")]
    BadPixelBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// The requested grid has a zero side.
    #[error("cannot convert to an empty {width}x{height} grid")]
    EmptyGrid { width: u16, height: u16 },
}

impl ConversionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConversionError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(frame: usize, message: impl ToString) -> Self {
        ConversionError::Decode {
            frame,
            message: message.to_string(),
        }
    }
}
