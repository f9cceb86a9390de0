//! Video decoding through an `ffmpeg` child process.
//!
//! `ffprobe` reports the stream size and frame rate, then `ffmpeg` scales the
//! video down and writes raw RGB24 frames to its stdout, one after another.

use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::error::ConversionError;
use super::source::PixelBuffer;

/// Widest frame we ask ffmpeg for. Cells are averaged down from this, so
/// anything larger only costs pipe bandwidth.
pub const MAX_DECODE_WIDTH: u32 = 640;

/// Fallback when the container reports no usable frame rate.
const DEFAULT_FRAME_RATE: f64 = 25.0;

/// The two external programs video decoding runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegTools {
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

/// Stream properties reported by `ffprobe`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

impl VideoInfo {
    /// Time between two frames.
    pub fn frame_interval(&self) -> Duration {
        let fps = if self.frame_rate.is_finite() && self.frame_rate > 0.0 {
            self.frame_rate
        } else {
            DEFAULT_FRAME_RATE
        };
        Duration::from_secs_f64(1.0 / fps)
    }
}

/// Map a spawn failure, turning a missing binary into `FfmpegNotFound`.
fn spawn_error(path: &Path, e: std::io::Error) -> ConversionError {
    if e.kind() == ErrorKind::NotFound {
        ConversionError::FfmpegNotFound
    } else {
        ConversionError::io(path, e)
    }
}

/// Ask `ffprobe` for the first video stream's geometry and frame rate.
pub fn video_info(tools: &FfmpegTools, path: &Path) -> Result<VideoInfo, ConversionError> {
    let output = Command::new(&tools.ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(path, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConversionError::decode(0, stderr.trim()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ConversionError::UnsupportedFormat(format!("{}: no video stream", path.display())))?;
    parse_stream_line(line).ok_or_else(|| ConversionError::decode(0, format!("unexpected ffprobe output: {line}")))
}

/// Parse `width,height,num/den` as printed by `ffprobe -of csv=p=0`.
pub(crate) fn parse_stream_line(line: &str) -> Option<VideoInfo> {
    let mut fields = line.trim().split(',');
    let width = fields.next()?.trim().parse().ok()?;
    let height = fields.next()?.trim().parse().ok()?;
    let frame_rate = fields
        .next()
        .and_then(parse_frame_rate)
        .unwrap_or(DEFAULT_FRAME_RATE);
    if width == 0 || height == 0 {
        return None;
    }
    Some(VideoInfo {
        width,
        height,
        frame_rate,
    })
}

/// Parse a rational (`30000/1001`) or plain (`25`) frame rate.
pub(crate) fn parse_frame_rate(s: &str) -> Option<f64> {
    let s = s.trim();
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Output size for ffmpeg's scaler: at most `max_width` wide, aspect kept,
/// both sides even as most pixel formats require.
pub(crate) fn scaled_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (even(width), even(height));
    }
    let scaled_h = (height as u64 * max_width as u64 / width as u64) as u32;
    (even(max_width), even(scaled_h))
}

fn even(v: u32) -> u32 {
    (v & !1).max(2)
}

/// Fixed-size RGB24 frames read back to back from a byte stream.
pub struct RawFrames<R> {
    reader: R,
    width: u32,
    height: u32,
    frames_read: usize,
    finished: bool,
}

/// How a raw frame stream ended.
#[derive(Debug)]
pub enum RawEnd {
    /// End of stream on a frame boundary.
    Clean,
    /// The stream stopped partway through a frame.
    Truncated,
    Failed(std::io::Error),
}

impl<R: Read> RawFrames<R> {
    pub fn new(reader: R, width: u32, height: u32) -> Self {
        Self {
            reader,
            width,
            height,
            frames_read: 0,
            finished: false,
        }
    }

    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Read one whole frame, or say why there is none.
    pub fn read_frame(&mut self) -> Result<PixelBuffer, RawEnd> {
        if self.finished {
            return Err(RawEnd::Clean);
        }
        let frame_len = self.width as usize * self.height as usize * 3;
        let mut data = vec![0u8; frame_len];
        let mut filled = 0;
        while filled < frame_len {
            match self.reader.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Err(RawEnd::Failed(e));
                }
            }
        }
        if filled == frame_len && frame_len > 0 {
            self.frames_read += 1;
            return PixelBuffer::from_rgb(self.width, self.height, data).map_err(|_| RawEnd::Truncated);
        }
        self.finished = true;
        if filled > 0 {
            Err(RawEnd::Truncated)
        } else {
            Err(RawEnd::Clean)
        }
    }
}

/// A running ffmpeg decode producing raw RGB24 frames.
///
/// Dropping the reader kills and reaps the child process.
pub struct FfmpegReader {
    path: PathBuf,
    child: Child,
    frames: RawFrames<ChildStdout>,
    stderr_thread: Option<JoinHandle<Vec<String>>>,
    interval: Duration,
    size: (u32, u32),
}

impl FfmpegReader {
    /// Read the stream info and start decoding `path`.
    pub fn open(tools: &FfmpegTools, path: &Path) -> Result<Self, ConversionError> {
        let info = video_info(tools, path)?;
        let (width, height) = scaled_size(info.width, info.height, MAX_DECODE_WIDTH);
        log::debug!(
            "ffmpeg decode {}: {}x{} @ {:.3} fps scaled to {}x{}",
            path.display(),
            info.width,
            info.height,
            info.frame_rate,
            width,
            height
        );

        let scale = format!("scale={width}:{height}");
        let mut child = Command::new(&tools.ffmpeg)
            .args(["-nostdin", "-v", "error", "-i"])
            .arg(path)
            .args(["-vf", &scale, "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(path, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConversionError::decode(0, "ffmpeg stdout unavailable"))?;

        let stderr_thread = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                BufReader::new(stderr)
                    .lines()
                    .map_while(Result::ok)
                    .inspect(|l| log::debug!("[ffmpeg] {l}"))
                    .collect()
            })
        });

        Ok(Self {
            path: path.to_path_buf(),
            child,
            frames: RawFrames::new(stdout, width, height),
            stderr_thread,
            interval: info.frame_interval(),
            size: (width, height),
        })
    }

    pub fn frame_interval(&self) -> Duration {
        self.interval
    }

    /// Size of the frames ffmpeg writes.
    pub fn frame_size(&self) -> (u32, u32) {
        self.size
    }

    /// Read the next frame. `None` at a clean end of stream.
    pub fn read_frame(&mut self) -> Option<Result<PixelBuffer, ConversionError>> {
        match self.frames.read_frame() {
            Ok(pixels) => Some(Ok(pixels)),
            Err(RawEnd::Failed(e)) => Some(Err(ConversionError::io(&self.path, e))),
            Err(RawEnd::Truncated) => Some(Err(ConversionError::decode(
                self.frames.frames_read(),
                "truncated frame from ffmpeg",
            ))),
            Err(RawEnd::Clean) => self.finish().err().map(Err),
        }
    }

    /// Reap the child after EOF and report a failed exit.
    fn finish(&mut self) -> Result<(), ConversionError> {
        let status = self
            .child
            .wait()
            .map_err(|e| ConversionError::io(&self.path, e))?;
        let stderr = self
            .stderr_thread
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if status.success() {
            return Ok(());
        }
        let reason = stderr
            .last()
            .cloned()
            .unwrap_or_else(|| format!("ffmpeg exited with {status}"));
        Err(ConversionError::decode(self.frames.frames_read(), reason))
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            log::debug!("stopping ffmpeg for {}", self.path.display());
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}
