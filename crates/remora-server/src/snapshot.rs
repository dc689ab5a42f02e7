//! Polling fallback: a fixed-name JPEG in the asset directory that viewers
//! re-request on a timer, plus `GET /snapshot` for the in-memory frame.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header::{self, HeaderName};
use axum::response::{IntoResponse, Response};
use remora_core::constants::LIVE_VIEW_FILE;
use remora_core::{Frame, FrameBuffer, ImageFormat, WaitError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::ApiError;
use crate::server::AppState;

/// Headers that stop browsers and proxies from caching a polled frame.
pub const NO_CACHE_HEADERS: [(HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate, max-age=0"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

/// Keeps `<asset_dir>/live_view.jpg` in step with the frame buffer.
///
/// Each frame is written to a temporary sibling and renamed over the target,
/// so a concurrent reader sees either the old image or the new one, never a
/// torn file.
#[derive(Debug)]
pub struct SnapshotWriter {
    frames: Arc<FrameBuffer>,
    path: PathBuf,
}

impl SnapshotWriter {
    /// Writer for `<asset_dir>/live_view.jpg`.
    pub fn new(frames: Arc<FrameBuffer>, asset_dir: &Path) -> Self {
        Self {
            frames,
            path: asset_dir.join(LIVE_VIEW_FILE),
        }
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one frame atomically.
    ///
    /// Only JPEG frames are written; the file name promises JPEG to polling
    /// clients. Returns whether the file was replaced.
    pub async fn write(&self, frame: &Frame) -> std::io::Result<bool> {
        if frame.format != ImageFormat::Jpeg {
            debug!(seq = frame.seq, format = frame.format.extension(), "snapshot skipped, not jpeg");
            return Ok(false);
        }
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.path.with_extension("jpg.tmp");
        tokio::fs::write(&tmp, &frame.data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(true)
    }

    /// Rewrite the file on every new frame until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut subscriber = self.frames.subscribe();
        debug!(path = %self.path.display(), "snapshot writer started");
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                next = subscriber.next_frame(Duration::from_secs(60)) => next,
            };
            match next {
                Ok(frame) => {
                    if let Err(error) = self.write(&frame).await {
                        warn!(path = %self.path.display(), %error, "snapshot write failed");
                    }
                }
                Err(WaitError::Timeout(_)) => {}
                Err(WaitError::Closed) => break,
            }
        }
        debug!("snapshot writer stopped");
    }
}

/// GET /snapshot
pub async fn snapshot_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let frame = state
        .frames
        .latest()
        .ok_or(ApiError::NotFound("no frame captured yet"))?;
    Ok((
        NO_CACHE_HEADERS,
        [(header::CONTENT_TYPE, frame.format.mime())],
        frame.data.clone(),
    )
        .into_response())
}
