//! `text/event-stream` push transport: base64 frames as `frame` events.

use std::convert::Infallible;

use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::Stream;
use remora_core::Frame;

use super::{Feed, FrameFeed, StreamSession};

/// Event carrying one frame: `event: frame`, `id: <seq>`, base64 payload.
pub fn frame_event(frame: &Frame) -> Event {
    Event::default()
        .event("frame")
        .id(frame.seq.to_string())
        .data(STANDARD.encode(&frame.data))
}

/// Event stream for one session.
pub fn events(
    mut feed: FrameFeed,
    mut session: StreamSession,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    async_stream::stream! {
        loop {
            match feed.next().await {
                Feed::Frame(frame) => {
                    session.record(frame.seq);
                    yield Ok(frame_event(&frame));
                }
                Feed::Idle(_) => yield Ok(Event::default().comment("keep-alive")),
                Feed::Stop => break,
            }
        }
    }
}

/// Streaming response for one session.
pub fn response(feed: FrameFeed, session: StreamSession) -> Response {
    Sse::new(events(feed, session)).into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::header;
    use bytes::Bytes;
    use futures::StreamExt;
    use remora_core::{FrameBuffer, ImageFormat};
    use remora_settings::StreamTransport;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::stream::SessionCounter;

    #[tokio::test]
    async fn response_is_event_stream() {
        let frames = FrameBuffer::new();
        let _ = frames.publish(Bytes::from_static(b"abc"), ImageFormat::Jpeg);
        let counter = SessionCounter::default();
        let feed = FrameFeed::new(&frames, Duration::from_millis(10), CancellationToken::new());
        let response = response(feed, StreamSession::open(StreamTransport::Sse, &counter));
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

        let mut body = response.into_body().into_data_stream();
        let chunk = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.contains("event: frame\n"), "{text}");
        assert!(text.contains("id: 1\n"), "{text}");
        assert!(text.contains(&format!("data: {}\n", STANDARD.encode(b"abc"))), "{text}");
    }

    #[tokio::test]
    async fn idle_emits_keep_alive() {
        let frames = FrameBuffer::new();
        let counter = SessionCounter::default();
        let feed = FrameFeed::new(&frames, Duration::from_millis(10), CancellationToken::new());
        let mut stream = Box::pin(events(feed, StreamSession::open(StreamTransport::Sse, &counter)));
        assert!(stream.next().await.unwrap().is_ok());
        let _ = frames.publish(Bytes::from_static(b"z"), ImageFormat::Jpeg);
        // the next yield is either another keep-alive or the new frame
        assert!(stream.next().await.is_some());
    }
}
