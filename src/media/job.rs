//! Conversion jobs: one worker thread per conversion feeding the frame queue.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::ascii::{ColorMode, Frame};

use super::convert::{convert, CancelToken, ConvertOptions};
use super::queue::FrameSender;
use super::source::MediaSource;

/// Longest single sleep while pacing, so cancellation is noticed quickly.
const PACING_SLICE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Lifecycle of a conversion as seen through its events.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Running,
    /// Finished with a single frame (a still picture).
    Done(Arc<Frame>),
    /// A multi-frame source ran out of frames.
    Exhausted,
    Failed(String),
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done(_) => "done",
            JobStatus::Exhausted => "finished",
            JobStatus::Failed(_) => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

/// Messages a worker puts on the frame queue. `Finished` is always last.
#[derive(Debug, Clone)]
pub enum JobEvent {
    Frame {
        job: JobId,
        index: usize,
        frame: Arc<Frame>,
    },
    Finished {
        job: JobId,
        status: JobStatus,
    },
}

impl JobEvent {
    pub fn job(&self) -> JobId {
        match self {
            JobEvent::Frame { job, .. } | JobEvent::Finished { job, .. } => *job,
        }
    }
}

/// The UI's handle on a running conversion.
///
/// The worker owns the decoder; this handle only holds the cancel flag, the
/// thread handle, and the status mirrored from events.
pub struct ConversionJob {
    id: JobId,
    source: MediaSource,
    width: u16,
    height: u16,
    color_mode: ColorMode,
    status: JobStatus,
    latest: Option<Arc<Frame>>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for ConversionJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionJob")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("size", &(self.width, self.height))
            .field("status", &self.status.label())
            .finish_non_exhaustive()
    }
}

impl ConversionJob {
    /// Start converting `source` on a new worker thread.
    pub fn spawn(id: JobId, source: MediaSource, opts: ConvertOptions, sender: FrameSender) -> Self {
        let cancel = CancelToken::new();
        let (width, height, color_mode) = (opts.width, opts.height, opts.mapper.color_mode());
        log::info!("{id}: converting {source} to {width}x{height} ({color_mode})");

        let worker = {
            let source = source.clone();
            let cancel = cancel.clone();
            thread::Builder::new()
                .name(format!("convert-{}", id.0))
                .spawn(move || run_worker(id, source, opts, cancel, sender))
        };
        let (status, worker) = match worker {
            Ok(handle) => (JobStatus::Pending, Some(handle)),
            Err(e) => {
                log::warn!("{id}: cannot start worker: {e}");
                (JobStatus::Failed(format!("cannot start worker: {e}")), None)
            }
        };

        Self {
            id,
            source,
            width,
            height,
            color_mode,
            status,
            latest: None,
            cancel,
            worker,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    /// Most recent frame delivered, if any.
    pub fn latest_frame(&self) -> Option<&Arc<Frame>> {
        self.latest.as_ref()
    }

    /// Ask the worker to stop. It finishes with `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Apply an event from the queue. Events for other jobs are ignored and
    /// return `false`.
    pub fn observe(&mut self, event: &JobEvent) -> bool {
        if event.job() != self.id || self.status.is_terminal() {
            return false;
        }
        match event {
            JobEvent::Frame { frame, .. } => {
                self.status = JobStatus::Running;
                self.latest = Some(Arc::clone(frame));
            }
            JobEvent::Finished { status, .. } => {
                if let JobStatus::Done(frame) = status {
                    self.latest = Some(Arc::clone(frame));
                }
                log::info!("{}: {}", self.id, status.label());
                self.status = status.clone();
            }
        }
        true
    }

    /// Release the job once the UI has seen its final status: the worker
    /// thread is joined and the final status returned.
    pub fn acknowledge(mut self) -> JobStatus {
        self.cancel.cancel();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::warn!("{}: worker panicked", self.id);
            }
        }
        std::mem::replace(&mut self.status, JobStatus::Cancelled)
    }
}

impl Drop for ConversionJob {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn run_worker(id: JobId, source: MediaSource, opts: ConvertOptions, cancel: CancelToken, sender: FrameSender) {
    let mut stream = convert(&source, opts, cancel.clone());
    let clock = Instant::now();
    let mut due = Duration::ZERO;
    let mut delivered = 0usize;
    let mut skipped = 0usize;
    let mut last: Option<Arc<Frame>> = None;

    let status = loop {
        let decoded = match stream.next_decoded() {
            Some(Ok(decoded)) => decoded,
            Some(Err(e)) => break JobStatus::Failed(e.to_string()),
            None if cancel.is_cancelled() => break JobStatus::Cancelled,
            None => match (delivered, last.take()) {
                (1, Some(frame)) => break JobStatus::Done(frame),
                _ => break JobStatus::Exhausted,
            },
        };

        if let Some(delay) = decoded.delay.filter(|d| !d.is_zero()) {
            let slot_end = due + delay;
            if delivered > 0 && clock.elapsed() > slot_end {
                due = slot_end;
                skipped += 1;
                continue;
            }
            if !sleep_until(clock, due, &cancel) {
                break JobStatus::Cancelled;
            }
            due = slot_end;
        }

        let frame = match stream.render(&decoded) {
            Ok(frame) => Arc::new(frame),
            Err(e) => break JobStatus::Failed(e.to_string()),
        };
        if cancel.is_cancelled() {
            break JobStatus::Cancelled;
        }
        let sent = sender.send(JobEvent::Frame {
            job: id,
            index: decoded.index,
            frame: Arc::clone(&frame),
        });
        if !sent {
            log::debug!("{id}: frame queue closed, stopping");
            return;
        }
        delivered += 1;
        last = Some(frame);
    };

    if skipped > 0 {
        log::debug!("{id}: skipped {skipped} late frames");
    }
    sender.send(JobEvent::Finished { job: id, status });
}

/// Sleep until `clock` reaches `target`. Returns `false` if cancelled first.
fn sleep_until(clock: Instant, target: Duration, cancel: &CancelToken) -> bool {
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = clock.elapsed();
        if now >= target {
            return true;
        }
        thread::sleep((target - now).min(PACING_SLICE));
    }
}
