//! Per-connection stream bookkeeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use metrics::{counter, gauge};
use remora_core::metrics::{STREAM_FRAMES_SENT_TOTAL, STREAM_SESSIONS_ACTIVE, STREAM_SESSIONS_TOTAL};
use remora_settings::StreamTransport;
use tracing::info;
use uuid::Uuid;

/// Count of open stream sessions, shared with `/status` and `/health`.
#[derive(Clone, Debug, Default)]
pub struct SessionCounter(Arc<AtomicUsize>);

impl SessionCounter {
    /// Open sessions right now.
    pub fn active(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/// Delivery state of one open `/stream` connection.
///
/// Dropping the session is the disconnect: it happens when the response
/// body is dropped, whether the client went away, a write failed or the
/// server is shutting down.
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    transport: StreamTransport,
    last_seq: u64,
    frames_sent: u64,
    opened: Instant,
    counter: SessionCounter,
}

impl StreamSession {
    /// Register a new session.
    pub fn open(transport: StreamTransport, counter: &SessionCounter) -> Self {
        let id = Uuid::now_v7();
        let active = counter.0.fetch_add(1, Ordering::Relaxed) + 1;
        counter!(STREAM_SESSIONS_TOTAL, "transport" => transport.as_str()).increment(1);
        #[allow(clippy::cast_precision_loss)]
        gauge!(STREAM_SESSIONS_ACTIVE).set(active as f64);
        info!(session = %id, transport = %transport, active, "stream session opened");
        Self {
            id,
            transport,
            last_seq: 0,
            frames_sent: 0,
            opened: Instant::now(),
            counter: counter.clone(),
        }
    }

    /// Session id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Sequence number of the newest frame delivered.
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Frames written so far, including idle re-sends.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Note one written frame.
    pub fn record(&mut self, seq: u64) {
        self.last_seq = self.last_seq.max(seq);
        self.frames_sent += 1;
        counter!(STREAM_FRAMES_SENT_TOTAL, "transport" => self.transport.as_str()).increment(1);
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        let active = self.counter.0.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        #[allow(clippy::cast_precision_loss)]
        gauge!(STREAM_SESSIONS_ACTIVE).set(active as f64);
        info!(
            session = %self.id,
            transport = %self.transport,
            last_seq = self.last_seq,
            frames_sent = self.frames_sent,
            duration_ms = u64::try_from(self.opened.elapsed().as_millis()).unwrap_or(u64::MAX),
            "stream session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remora_logging::test_utils::capture_logs;

    #[test]
    fn counter_tracks_open_sessions() {
        let counter = SessionCounter::default();
        let a = StreamSession::open(StreamTransport::Mjpeg, &counter);
        let b = StreamSession::open(StreamTransport::Sse, &counter);
        assert_eq!(counter.active(), 2);
        assert_ne!(a.id(), b.id());
        drop(a);
        assert_eq!(counter.active(), 1);
        drop(b);
        assert_eq!(counter.active(), 0);
    }

    #[test]
    fn record_keeps_highest_seq() {
        let counter = SessionCounter::default();
        let mut session = StreamSession::open(StreamTransport::Mjpeg, &counter);
        session.record(3);
        session.record(3);
        session.record(7);
        assert_eq!(session.last_seq(), 7);
        assert_eq!(session.frames_sent(), 3);
    }

    #[test]
    fn close_is_logged_not_raised() {
        let (logs, _guard) = capture_logs();
        let counter = SessionCounter::default();
        let mut session = StreamSession::open(StreamTransport::Sse, &counter);
        session.record(5);
        drop(session);
        assert!(logs.has_message("stream session opened"));
        assert!(logs.has_message("stream session closed"));
        assert_eq!(logs.count_problems(), 0);
        let closed = logs
            .events()
            .into_iter()
            .find(|e| e.message == "stream session closed")
            .unwrap();
        assert_eq!(closed.field("last_seq"), Some("5"));
    }
}
