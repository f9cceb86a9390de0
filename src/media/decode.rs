//! Decoders turning a [`MediaSource`] into raw pixel buffers.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageError};

use super::error::ConversionError;
use super::ffmpeg::{FfmpegReader, FfmpegTools};
use super::source::{MediaKind, MediaSource, PixelBuffer};

/// One decoded picture plus how long it should stay on screen.
///
/// `delay` is `None` for stills, which are shown until replaced.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub index: usize,
    pub pixels: PixelBuffer,
    pub delay: Option<Duration>,
}

/// A pull-based decoder over one source.
///
/// Every variant decodes lazily: nothing is read until the first call to
/// [`next_frame`](Decoder::next_frame).
pub enum Decoder {
    Still {
        path: PathBuf,
        done: bool,
    },
    Animation {
        path: PathBuf,
        frames: Option<image::Frames<'static>>,
        index: usize,
        done: bool,
    },
    Video {
        path: PathBuf,
        tools: FfmpegTools,
        reader: Option<FfmpegReader>,
        index: usize,
        done: bool,
    },
    Memory {
        frames: Arc<Vec<PixelBuffer>>,
        interval: Option<Duration>,
        index: usize,
    },
}

impl Decoder {
    /// Pick a decoder for `source`. Fails only for unknown file types.
    pub fn open(source: &MediaSource) -> Result<Self, ConversionError> {
        Self::open_with(source, &FfmpegTools::default())
    }

    /// Like [`open`](Decoder::open), running video through the given tools.
    pub fn open_with(source: &MediaSource, tools: &FfmpegTools) -> Result<Self, ConversionError> {
        match source {
            MediaSource::File(path) => Ok(match MediaKind::detect(path)? {
                MediaKind::Image => Decoder::Still {
                    path: path.clone(),
                    done: false,
                },
                MediaKind::Animation => Decoder::Animation {
                    path: path.clone(),
                    frames: None,
                    index: 0,
                    done: false,
                },
                MediaKind::Video => Decoder::Video {
                    path: path.clone(),
                    tools: tools.clone(),
                    reader: None,
                    index: 0,
                    done: false,
                },
            }),
            MediaSource::Pixels(buffer) => Ok(Decoder::Memory {
                frames: Arc::new(vec![buffer.as_ref().clone()]),
                interval: None,
                index: 0,
            }),
            MediaSource::Sequence {
                frames,
                frame_interval,
            } => Ok(Decoder::Memory {
                frames: Arc::clone(frames),
                interval: Some(*frame_interval),
                index: 0,
            }),
        }
    }

    /// Decode the next picture in source order.
    ///
    /// Returns `None` once the source is exhausted. After an `Err` the
    /// decoder is finished and keeps returning `None`.
    pub fn next_frame(&mut self) -> Option<Result<DecodedFrame, ConversionError>> {
        match self {
            Decoder::Still { path, done } => {
                if *done {
                    return None;
                }
                *done = true;
                Some(decode_still(path).map(|pixels| DecodedFrame {
                    index: 0,
                    pixels,
                    delay: None,
                }))
            }
            Decoder::Animation {
                path,
                frames,
                index,
                done,
            } => {
                if *done {
                    return None;
                }
                if frames.is_none() {
                    match open_gif(path) {
                        Ok(f) => *frames = Some(f),
                        Err(e) => {
                            *done = true;
                            return Some(Err(e));
                        }
                    }
                }
                let next = frames.as_mut().and_then(|f| f.next());
                match next {
                    None => {
                        *done = true;
                        *frames = None;
                        None
                    }
                    Some(Err(e)) => {
                        *done = true;
                        *frames = None;
                        Some(Err(ConversionError::decode(*index, e)))
                    }
                    Some(Ok(frame)) => {
                        let (numer, denom) = frame.delay().numer_denom_ms();
                        let delay_ms = if denom == 0 { 0 } else { numer / denom };
                        let rgb = DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8();
                        let (w, h) = rgb.dimensions();
                        let decoded = PixelBuffer::from_rgb(w, h, rgb.into_raw()).map(|pixels| {
                            DecodedFrame {
                                index: *index,
                                pixels,
                                delay: Some(Duration::from_millis(delay_ms as u64)),
                            }
                        });
                        *index += 1;
                        Some(decoded)
                    }
                }
            }
            Decoder::Video {
                path,
                tools,
                reader,
                index,
                done,
            } => {
                if *done {
                    return None;
                }
                if reader.is_none() {
                    match FfmpegReader::open(tools, path) {
                        Ok(r) => *reader = Some(r),
                        Err(e) => {
                            *done = true;
                            return Some(Err(e));
                        }
                    }
                }
                let r = reader.as_mut()?;
                let interval = r.frame_interval();
                match r.read_frame() {
                    Some(Ok(pixels)) => {
                        let decoded = DecodedFrame {
                            index: *index,
                            pixels,
                            delay: Some(interval),
                        };
                        *index += 1;
                        Some(Ok(decoded))
                    }
                    Some(Err(e)) => {
                        *done = true;
                        *reader = None;
                        Some(Err(e))
                    }
                    None => {
                        *done = true;
                        *reader = None;
                        None
                    }
                }
            }
            Decoder::Memory {
                frames,
                interval,
                index,
            } => {
                let pixels = frames.get(*index)?.clone();
                let decoded = DecodedFrame {
                    index: *index,
                    pixels,
                    delay: *interval,
                };
                *index += 1;
                Some(Ok(decoded))
            }
        }
    }
}

fn decode_still(path: &Path) -> Result<PixelBuffer, ConversionError> {
    let img = image::open(path).map_err(|e| image_error(path, e))?;
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    PixelBuffer::from_rgb(w, h, rgb.into_raw())
}

fn open_gif(path: &Path) -> Result<image::Frames<'static>, ConversionError> {
    let file = File::open(path).map_err(|e| ConversionError::io(path, e))?;
    let decoder = GifDecoder::new(BufReader::new(file)).map_err(|e| image_error(path, e))?;
    Ok(decoder.into_frames())
}

pub(crate) fn image_error(path: &Path, e: ImageError) -> ConversionError {
    match e {
        ImageError::IoError(io) => ConversionError::io(path, io),
        ImageError::Unsupported(u) => ConversionError::UnsupportedFormat(u.to_string()),
        other => ConversionError::decode(0, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_still_yields_once() {
        let mut dec = Decoder::open(&MediaSource::pixels(PixelBuffer::gray(2, 2, 9))).unwrap();
        let first = dec.next_frame().unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert!(first.delay.is_none());
        assert!(dec.next_frame().is_none());
    }

    #[test]
    fn test_memory_sequence_in_order() {
        let frames = (0..4).map(|v| PixelBuffer::gray(1, 1, v)).collect();
        let mut dec =
            Decoder::open(&MediaSource::sequence(frames, Duration::from_millis(40))).unwrap();
        let mut seen = Vec::new();
        while let Some(Ok(f)) = dec.next_frame() {
            assert_eq!(f.delay, Some(Duration::from_millis(40)));
            seen.push(f.pixels.data()[0]);
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_unknown_extension_fails_on_open() {
        let err = Decoder::open(&MediaSource::file("/tmp/readme.md")).err().unwrap();
        assert!(matches!(err, ConversionError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_still_is_io_error() {
        let mut dec = Decoder::open(&MediaSource::file("/nonexistent/tuitter/x.png")).unwrap();
        let err = dec.next_frame().unwrap().unwrap_err();
        assert!(matches!(err, ConversionError::Io { .. }));
        assert!(dec.next_frame().is_none());
    }

    #[test]
    fn test_decodes_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        image::RgbImage::from_pixel(3, 2, image::Rgb([255, 0, 0]))
            .save(&path)
            .unwrap();

        let mut dec = Decoder::open(&MediaSource::file(&path)).unwrap();
        let frame = dec.next_frame().unwrap().unwrap();
        assert_eq!((frame.pixels.width(), frame.pixels.height()), (3, 2));
        assert_eq!(&frame.pixels.data()[..3], &[255, 0, 0]);
    }

    // ==== Video ====

    #[cfg(unix)]
    fn fake_tools(dir: &Path, ffprobe: &str, ffmpeg: &str) -> FfmpegTools {
        use std::os::unix::fs::PermissionsExt;

        let write = |name: &str, body: &str| {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        };
        FfmpegTools {
            ffprobe: write("ffprobe", ffprobe),
            ffmpeg: write("ffmpeg", ffmpeg),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_video_frames_through_ffmpeg_pipe() {
        let dir = tempfile::tempdir().unwrap();
        // 4x2 rgb24 is 24 bytes a frame; two frames at 10 fps.
        let tools = fake_tools(dir.path(), "echo 4,2,10/1", "head -c 48 /dev/zero");
        let mut dec = Decoder::open_with(&MediaSource::file(dir.path().join("clip.mp4")), &tools).unwrap();

        let mut indices = Vec::new();
        while let Some(frame) = dec.next_frame() {
            let frame = frame.unwrap();
            assert_eq!((frame.pixels.width(), frame.pixels.height()), (4, 2));
            assert_eq!(frame.delay, Some(Duration::from_millis(100)));
            indices.push(frame.index);
        }
        assert_eq!(indices, vec![0, 1]);
        assert!(dec.next_frame().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_video_ffmpeg_failure_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let tools = fake_tools(dir.path(), "echo 4,2,25/1", "echo 'moov atom not found' >&2; exit 1");
        let mut dec = Decoder::open_with(&MediaSource::file(dir.path().join("clip.mkv")), &tools).unwrap();

        match dec.next_frame() {
            Some(Err(ConversionError::Decode { message, .. })) => assert!(message.contains("moov atom")),
            other => panic!("expected decode error, got {:?}", other.map(|r| r.map(|f| f.index))),
        }
        assert!(dec.next_frame().is_none());
    }

    #[test]
    fn test_video_without_ffmpeg_reports_not_found() {
        let tools = FfmpegTools {
            ffprobe: PathBuf::from("/nonexistent/tuitter/ffprobe"),
            ffmpeg: PathBuf::from("/nonexistent/tuitter/ffmpeg"),
        };
        let mut dec = Decoder::open_with(&MediaSource::file("/tmp/clip.mp4"), &tools).unwrap();
        assert!(matches!(dec.next_frame(), Some(Err(ConversionError::FfmpegNotFound))));
        assert!(dec.next_frame().is_none());
    }
}
