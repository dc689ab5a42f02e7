//! `multipart/x-mixed-replace` push transport.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use remora_core::Frame;
use remora_core::constants::MULTIPART_BOUNDARY;

use super::{Feed, FrameFeed, StreamSession};

/// `Content-Type` of the stream response.
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Written while no frame exists yet. Bytes before the first boundary are
/// preamble, which multipart readers discard, so a dead peer surfaces as a
/// write error without disturbing live ones.
const KEEPALIVE: &[u8] = b"\r\n";

/// One multipart part: boundary, part headers, image bytes, CRLF.
pub fn part(frame: &Frame) -> Bytes {
    let head = format!(
        "--{MULTIPART_BOUNDARY}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
        frame.format.mime(),
        frame.len()
    );
    let mut buf = BytesMut::with_capacity(head.len() + frame.len() + 2);
    buf.extend_from_slice(head.as_bytes());
    buf.extend_from_slice(&frame.data);
    buf.extend_from_slice(b"\r\n");
    buf.freeze()
}

/// Body stream for one session.
pub fn parts(
    mut feed: FrameFeed,
    mut session: StreamSession,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        loop {
            match feed.next().await {
                Feed::Frame(frame) | Feed::Idle(Some(frame)) => {
                    session.record(frame.seq);
                    yield Ok(part(&frame));
                }
                Feed::Idle(None) => yield Ok(Bytes::from_static(KEEPALIVE)),
                Feed::Stop => break,
            }
        }
    }
}

/// Streaming response for one session.
pub fn response(feed: FrameFeed, session: StreamSession) -> Response {
    (
        [
            (header::CONTENT_TYPE, CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Body::from_stream(parts(feed, session)),
    )
        .into_response()
}
