//! Media conversion engine.
//!
//! Sources are decoded into RGB pixel buffers, resampled onto the target
//! cell grid and mapped to glyphs by [`crate::ascii`]. [`convert`] exposes
//! this as a lazy iterator; [`ConversionJob`] runs it on a worker thread and
//! feeds the bounded frame queue the UI drains on every tick.
//! [`ascii_photo`] converts a single picture for attaching to a post.

mod convert;
mod decode;
mod error;
mod ffmpeg;
mod job;
mod photo;
mod queue;
mod source;

pub use convert::{convert, render_pixels, CancelToken, ConvertOptions, FrameStream};
pub use decode::{DecodedFrame, Decoder};
pub use error::ConversionError;
pub use ffmpeg::{video_info, FfmpegReader, FfmpegTools, RawEnd, RawFrames, VideoInfo, MAX_DECODE_WIDTH};
pub use job::{ConversionJob, JobEvent, JobId, JobStatus};
pub use photo::{ascii_photo, PHOTO_MAX_HEIGHT, PHOTO_WIDTH};
pub use queue::{frame_queue, FrameReceiver, FrameSender, DEFAULT_QUEUE_CAPACITY};
pub use source::{MediaKind, MediaSource, PixelBuffer};
