//! Settings type definitions.
//!
//! All types use camelCase JSON field names and `#[serde(default)]`, so a
//! settings file only needs to name the values it changes.

mod server;
mod surface;

pub use server::*;
pub use surface::*;

pub use remora_logging::{LogFormat, LogLevel};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9000, "defaultTransport": "sse" },
///   "surface": { "kind": "synthetic" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoraSettings {
    /// HTTP listener and streaming behaviour.
    pub server: ServerSettings,
    /// Capture loop schedule and encoding.
    pub capture: CaptureSettings,
    /// Command queue and dispatcher schedule.
    pub commands: CommandSettings,
    /// Which render surface to drive and how.
    pub surface: SurfaceSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl RemoraSettings {
    /// Reject values that would stall or break the running bridge.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: &str) -> Result<()> {
            Err(SettingsError::InvalidValue(msg.to_owned()))
        }

        if self.server.host.trim().is_empty() {
            return invalid("server.host must not be empty");
        }
        if self.server.idle_timeout_ms == 0 {
            return invalid("server.idleTimeoutMs must be > 0");
        }
        if self.capture.interval_ms == 0 {
            return invalid("capture.intervalMs must be > 0");
        }
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return invalid("capture.jpegQuality must be within 1..=100");
        }
        if self.commands.queue_capacity == 0 {
            return invalid("commands.queueCapacity must be > 0");
        }
        if self.commands.dispatch_interval_ms == 0 {
            return invalid("commands.dispatchIntervalMs must be > 0");
        }
        if self.surface.viewport_width == 0 || self.surface.viewport_height == 0 {
            return invalid("surface viewport dimensions must be > 0");
        }
        if self.surface.home_url.trim().is_empty() {
            return invalid("surface.homeUrl must not be empty");
        }
        if self.surface.kind == SurfaceKind::Cdp
            && !(self.surface.cdp_endpoint.starts_with("http://")
                || self.surface.cdp_endpoint.starts_with("https://"))
        {
            return invalid("surface.cdpEndpoint must be an http(s) URL");
        }
        Ok(())
    }
}

/// Log output configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (overridden by `RUST_LOG`).
    pub level: LogLevel,
    /// Line format.
    pub format: LogFormat,
}
