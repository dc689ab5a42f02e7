//! `/status`: what the viewer needs to render its chrome.

use axum::Json;
use axum::extract::State;
use remora_core::QueueStats;
use remora_surface::SurfaceStatus;
use serde::Serialize;

use crate::server::AppState;

/// Surface state plus bridge counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Last known surface state.
    #[serde(flatten)]
    pub surface: SurfaceStatus,
    /// Sequence number of the newest frame.
    pub frame_seq: u64,
    /// Open `/stream` sessions.
    pub stream_sessions: usize,
    /// Command queue counters.
    pub queue: QueueStats,
}

/// GET /status
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let mut surface = state.status.borrow().clone();
    // the switch flips before the host's next status refresh
    surface.streaming = state.switch.is_enabled();
    Json(StatusResponse {
        surface,
        frame_seq: state.frames.latest_seq(),
        stream_sessions: state.sessions.active(),
        queue: state.queue.stats(),
    })
}
