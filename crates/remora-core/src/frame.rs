//! Latest-value frame cache.
//!
//! [`FrameBuffer`] holds exactly one current [`Frame`]. Publishing replaces it
//! and wakes every waiter at once; nothing is queued, so a slow reader skips
//! intermediate frames instead of falling behind. Readers track their own
//! cursor through a [`FrameSubscriber`], which only ever yields frames with a
//! strictly greater sequence number than the last one it returned.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// Wire image format of an encoded frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG (the default stream format).
    Jpeg,
    /// PNG.
    Png,
}

impl ImageFormat {
    /// MIME type used in `Content-Type` headers.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Conventional file extension (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// One encoded snapshot of the render surface.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Monotonically increasing sequence number, starting at 1.
    pub seq: u64,
    /// Encoded image bytes.
    pub data: Bytes,
    /// Encoding of `data`.
    pub format: ImageFormat,
    /// When the frame was captured.
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Why [`FrameSubscriber::next_frame`] returned without a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum WaitError {
    /// No newer frame was published within the timeout.
    #[error("no new frame within {0:?}")]
    Timeout(Duration),
    /// The frame buffer was dropped.
    #[error("frame buffer closed")]
    Closed,
}

type Slot = Option<Arc<Frame>>;

/// Thread-safe single-slot frame cache with broadcast notification.
#[derive(Debug)]
pub struct FrameBuffer {
    tx: watch::Sender<Slot>,
}

impl FrameBuffer {
    /// Create an empty frame buffer.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Replace the current frame and wake all waiters.
    ///
    /// Assigns and returns the next sequence number. Never waits on readers:
    /// the slot is overwritten in place whether or not anyone is listening.
    pub fn publish(&self, data: Bytes, format: ImageFormat) -> u64 {
        let mut seq = 0;
        self.tx.send_modify(|slot| {
            seq = slot.as_ref().map_or(0, |f| f.seq) + 1;
            *slot = Some(Arc::new(Frame {
                seq,
                data,
                format,
                captured_at: Utc::now(),
            }));
        });
        seq
    }

    /// The current frame, if any has been published.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.tx.borrow().clone()
    }

    /// Sequence number of the current frame (`0` before the first publish).
    pub fn latest_seq(&self) -> u64 {
        self.tx.borrow().as_ref().map_or(0, |f| f.seq)
    }

    /// Total number of frames published so far.
    ///
    /// Sequence numbers are dense, so this equals [`Self::latest_seq`].
    pub fn published(&self) -> u64 {
        self.latest_seq()
    }

    /// Wait until a frame newer than `after_seq` exists, or `timeout` elapses.
    pub async fn await_update(
        &self,
        after_seq: u64,
        timeout: Duration,
    ) -> Result<Arc<Frame>, WaitError> {
        self.subscribe_from(after_seq).next_frame(timeout).await
    }

    /// A subscriber that will first yield the current frame (if any).
    pub fn subscribe(&self) -> FrameSubscriber {
        self.subscribe_from(0)
    }

    /// A subscriber that has already seen everything up to `after_seq`.
    pub fn subscribe_from(&self, after_seq: u64) -> FrameSubscriber {
        FrameSubscriber {
            rx: self.tx.subscribe(),
            last_seq: after_seq,
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// A reader's cursor into a [`FrameBuffer`].
#[derive(Debug)]
pub struct FrameSubscriber {
    rx: watch::Receiver<Slot>,
    last_seq: u64,
}

impl FrameSubscriber {
    /// Wait for a frame newer than the last one returned.
    ///
    /// Returns the most recent frame at wake-up time, so intermediate frames
    /// published while the caller was busy are skipped, never replayed.
    pub async fn next_frame(&mut self, timeout: Duration) -> Result<Arc<Frame>, WaitError> {
        let last = self.last_seq;
        let waited = tokio::time::timeout(
            timeout,
            self.rx
                .wait_for(|slot| slot.as_ref().is_some_and(|f| f.seq > last)),
        )
        .await;
        let slot = match waited {
            Err(_) => return Err(WaitError::Timeout(timeout)),
            Ok(Err(_)) => return Err(WaitError::Closed),
            Ok(Ok(slot)) => (*slot).clone(),
        };
        let frame = slot.ok_or(WaitError::Closed)?;
        self.last_seq = frame.seq;
        Ok(frame)
    }

    /// The current frame without waiting or moving the cursor.
    pub fn current(&self) -> Option<Arc<Frame>> {
        self.rx.borrow().clone()
    }

    /// Sequence number of the last frame returned by [`Self::next_frame`].
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }
}
