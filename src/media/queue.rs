//! Bounded frame queue between a conversion worker and the UI loop.
//!
//! Built on a tokio broadcast channel with exactly one receiver. Sending never
//! blocks; when the receiver falls behind, the oldest unread events are
//! evicted and the receiver skips past them.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::job::JobEvent;

/// Default queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 2;

/// Create a queue holding at most `capacity` unread events.
///
/// Broadcast channels round their capacity up to a power of two, so 3
/// behaves like 4. A capacity of 0 is treated as 1.
pub fn frame_queue(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = broadcast::channel(capacity.max(1));
    (FrameSender { tx }, FrameReceiver { rx, dropped: 0 })
}

/// Worker side of the queue.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: broadcast::Sender<JobEvent>,
}

impl FrameSender {
    /// Enqueue an event, evicting the oldest unread one if full.
    ///
    /// Returns `false` when the receiver is gone.
    pub fn send(&self, event: JobEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// UI side of the queue.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: broadcast::Receiver<JobEvent>,
    dropped: u64,
}

impl FrameReceiver {
    /// Next unread event without waiting.
    pub fn try_recv(&mut self) -> Option<JobEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(n)) => self.note_lag(n),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next event. `None` once every sender is gone and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<JobEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(n)) => self.note_lag(n),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Blocking variant for use outside the async runtime.
    pub fn blocking_recv(&mut self) -> Option<JobEvent> {
        loop {
            match self.rx.blocking_recv() {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(n)) => self.note_lag(n),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Events evicted before they were read.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn note_lag(&mut self, n: u64) {
        self.dropped += n;
        log::trace!("frame queue dropped {n} stale events");
    }
}
