//! Capture loop: one tick captures, encodes and publishes a frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use metrics::counter;
use remora_core::FrameBuffer;
use remora_core::metrics::{FRAMES_PUBLISHED_TOTAL, FRAMES_SKIPPED_TOTAL};
use tracing::{debug, warn};

use crate::encode::FrameEncoder;
use crate::surface::RenderSurface;

/// Shared on/off switch for streaming.
///
/// Turning streaming off makes capture ticks no-ops; the schedule itself
/// keeps running, so turning it back on resumes on the next tick.
#[derive(Clone, Debug)]
pub struct StreamSwitch(Arc<AtomicBool>);

impl StreamSwitch {
    /// A switch in the given initial state.
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    /// Whether streaming is on.
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the state.
    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Release);
    }

    /// Flip the state and return the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::AcqRel)
    }
}

impl Default for StreamSwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

/// What a capture tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A frame was published with this sequence number.
    Published(u64),
    /// Streaming is off.
    Disabled,
    /// The surface had nothing to capture.
    Empty,
    /// Capture or encoding failed; the tick was skipped.
    Failed,
}

/// Captures from a surface into a [`FrameBuffer`].
pub struct CaptureLoop {
    frames: Arc<FrameBuffer>,
    encoder: FrameEncoder,
    switch: StreamSwitch,
}

impl CaptureLoop {
    /// Create a capture loop publishing into `frames`.
    pub fn new(frames: Arc<FrameBuffer>, encoder: FrameEncoder, switch: StreamSwitch) -> Self {
        Self {
            frames,
            encoder,
            switch,
        }
    }

    /// The streaming switch this loop honours.
    pub fn switch(&self) -> &StreamSwitch {
        &self.switch
    }

    /// Run one tick. Never fails: problems skip the tick.
    pub async fn tick(&self, surface: &mut dyn RenderSurface) -> CaptureOutcome {
        if !self.switch.is_enabled() {
            return CaptureOutcome::Disabled;
        }

        let capture = match surface.capture_frame().await {
            Ok(Some(capture)) => capture,
            Ok(None) => {
                counter!(FRAMES_SKIPPED_TOTAL, "reason" => "empty").increment(1);
                debug!(surface = surface.name(), "capture returned no frame");
                return CaptureOutcome::Empty;
            }
            Err(error) => {
                counter!(FRAMES_SKIPPED_TOTAL, "reason" => "capture").increment(1);
                warn!(surface = surface.name(), %error, "capture failed, skipping tick");
                return CaptureOutcome::Failed;
            }
        };

        let encoder = self.encoder;
        let encoded = tokio::task::spawn_blocking(move || encoder.encode(capture)).await;
        match encoded {
            Ok(Ok((data, format))) => {
                let seq = self.frames.publish(data, format);
                counter!(FRAMES_PUBLISHED_TOTAL).increment(1);
                CaptureOutcome::Published(seq)
            }
            Ok(Err(error)) => {
                counter!(FRAMES_SKIPPED_TOTAL, "reason" => "encode").increment(1);
                warn!(%error, "frame encode failed, skipping tick");
                CaptureOutcome::Failed
            }
            Err(error) => {
                counter!(FRAMES_SKIPPED_TOTAL, "reason" => "encode").increment(1);
                warn!(%error, "encode task failed, skipping tick");
                CaptureOutcome::Failed
            }
        }
    }
}
