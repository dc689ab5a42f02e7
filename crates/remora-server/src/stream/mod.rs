//! `GET /stream`: push frames to a viewer until it goes away.
//!
//! Both transports share one loop shape. A session first gets the current
//! frame (if any), then waits on the frame buffer with the idle timeout. A
//! new frame is written as soon as it is published; on timeout the current
//! frame is written again (mjpeg) or a keep-alive comment is sent (sse), so a
//! vanished peer surfaces as a failed write within one idle period. The body
//! ends when the server shuts down; a failed write drops the body, which
//! drops the [`StreamSession`].

pub mod mjpeg;
pub mod session;
pub mod sse;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::Response;
use remora_core::{Frame, FrameBuffer, FrameSubscriber, WaitError};
use remora_settings::StreamTransport;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

pub use session::{SessionCounter, StreamSession};

use crate::errors::ApiError;
use crate::server::AppState;

/// Next thing a session should write.
#[derive(Debug)]
pub enum Feed {
    /// A frame newer than anything this session has seen.
    Frame(Arc<Frame>),
    /// Nothing new within the idle timeout; carries the current frame.
    Idle(Option<Arc<Frame>>),
    /// The buffer closed or the server is shutting down.
    Stop,
}

/// A session's view of the frame buffer.
pub struct FrameFeed {
    subscriber: FrameSubscriber,
    primed: Option<Arc<Frame>>,
    idle: Duration,
    cancel: CancellationToken,
}

impl FrameFeed {
    /// Start at the current frame.
    pub fn new(frames: &FrameBuffer, idle: Duration, cancel: CancellationToken) -> Self {
        let primed = frames.latest();
        let subscriber = frames.subscribe_from(primed.as_ref().map_or(0, |f| f.seq));
        Self {
            subscriber,
            primed,
            idle,
            cancel,
        }
    }

    /// Wait for the next thing to write.
    pub async fn next(&mut self) -> Feed {
        if let Some(frame) = self.primed.take() {
            return Feed::Frame(frame);
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Feed::Stop,
            next = self.subscriber.next_frame(self.idle) => match next {
                Ok(frame) => Feed::Frame(frame),
                Err(WaitError::Timeout(_)) => Feed::Idle(self.subscriber.current()),
                Err(WaitError::Closed) => Feed::Stop,
            },
        }
    }
}

/// `?transport=` override.
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    transport: Option<String>,
}

/// GET /stream
pub async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<Response, ApiError> {
    let transport = match query.transport.as_deref().map(str::trim) {
        None | Some("") => state.config.default_transport,
        Some(raw) => raw.parse::<StreamTransport>().map_err(ApiError::BadRequest)?,
    };
    let feed = FrameFeed::new(&state.frames, state.config.idle_timeout, state.shutdown.clone());
    let session = StreamSession::open(transport, &state.sessions);
    Ok(match transport {
        StreamTransport::Mjpeg => mjpeg::response(feed, session),
        StreamTransport::Sse => sse::response(feed, session),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use bytes::Bytes;
    use remora_core::ImageFormat;

    #[tokio::test]
    async fn feed_starts_with_current_frame() {
        let frames = FrameBuffer::new();
        let _ = frames.publish(Bytes::from_static(b"a"), ImageFormat::Jpeg);
        let mut feed = FrameFeed::new(&frames, Duration::from_millis(20), CancellationToken::new());
        assert_matches!(feed.next().await, Feed::Frame(f) if f.seq == 1);
        assert_matches!(feed.next().await, Feed::Idle(Some(f)) if f.seq == 1);
    }

    #[tokio::test]
    async fn feed_idles_empty_buffer() {
        let frames = FrameBuffer::new();
        let mut feed = FrameFeed::new(&frames, Duration::from_millis(10), CancellationToken::new());
        assert_matches!(feed.next().await, Feed::Idle(None));
        let _ = frames.publish(Bytes::from_static(b"b"), ImageFormat::Jpeg);
        assert_matches!(feed.next().await, Feed::Frame(f) if f.seq == 1);
    }

    #[tokio::test]
    async fn feed_skips_to_newest() {
        let frames = FrameBuffer::new();
        let mut feed = FrameFeed::new(&frames, Duration::from_millis(50), CancellationToken::new());
        for tag in [b"1", b"2", b"3"] {
            let _ = frames.publish(Bytes::from_static(tag), ImageFormat::Jpeg);
        }
        assert_matches!(feed.next().await, Feed::Frame(f) if f.seq == 3);
    }

    #[tokio::test]
    async fn feed_stops_on_cancel() {
        let frames = FrameBuffer::new();
        let cancel = CancellationToken::new();
        let mut feed = FrameFeed::new(&frames, Duration::from_secs(60), cancel.clone());
        cancel.cancel();
        assert_matches!(feed.next().await, Feed::Stop);
    }
}
