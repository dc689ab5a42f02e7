//! Metric name constants shared by the surface and server crates.

/// Frames published to the frame buffer (counter).
pub const FRAMES_PUBLISHED_TOTAL: &str = "frames_published_total";
/// Capture ticks that produced no frame (counter, labels: reason).
pub const FRAMES_SKIPPED_TOTAL: &str = "frames_skipped_total";
/// Commands accepted by the queue (counter, labels: kind).
pub const COMMANDS_ENQUEUED_TOTAL: &str = "commands_enqueued_total";
/// Commands rejected because the queue was full (counter, labels: kind).
pub const COMMANDS_REJECTED_TOTAL: &str = "commands_rejected_total";
/// Commands applied to the render surface (counter, labels: kind).
pub const COMMANDS_APPLIED_TOTAL: &str = "commands_applied_total";
/// Commands that failed to apply (counter, labels: kind).
pub const COMMANDS_FAILED_TOTAL: &str = "commands_failed_total";
/// Stream sessions opened (counter, labels: transport).
pub const STREAM_SESSIONS_TOTAL: &str = "stream_sessions_total";
/// Currently open stream sessions (gauge).
pub const STREAM_SESSIONS_ACTIVE: &str = "stream_sessions_active";
/// Frames written to stream sessions (counter, labels: transport).
pub const STREAM_FRAMES_SENT_TOTAL: &str = "stream_frames_sent_total";
/// Screenshots saved to the asset directory (counter).
pub const SCREENSHOTS_SAVED_TOTAL: &str = "screenshots_saved_total";
