//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server answers.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Open `/stream` sessions.
    pub stream_sessions: usize,
    /// Sequence number of the newest frame (`0` before the first capture).
    pub frame_seq: u64,
    /// Commands waiting for the dispatcher.
    pub queue_depth: usize,
}

/// Build a health response from live counters.
pub fn health_check(
    start_time: Instant,
    stream_sessions: usize,
    frame_seq: u64,
    queue_depth: usize,
) -> HealthResponse {
    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        stream_sessions,
        frame_seq,
        queue_depth,
    }
}
