//! Render surface, capture and command settings.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use remora_core::constants::{
    DEFAULT_CAPTURE_INTERVAL, DEFAULT_DISPATCH_INTERVAL, DEFAULT_HOME_URL, DEFAULT_JPEG_QUALITY,
    DEFAULT_QUEUE_CAPACITY,
};
use serde::{Deserialize, Serialize};

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Capture loop settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    /// Capture period in milliseconds.
    pub interval_ms: u64,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// Whether streaming starts enabled.
    pub enabled: bool,
}

impl CaptureSettings {
    /// Capture period as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            interval_ms: millis(DEFAULT_CAPTURE_INTERVAL),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            enabled: true,
        }
    }
}

/// Command queue and dispatcher settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandSettings {
    /// Maximum number of pending commands.
    pub queue_capacity: usize,
    /// Dispatcher period in milliseconds.
    pub dispatch_interval_ms: u64,
}

impl CommandSettings {
    /// Dispatcher period as a [`Duration`].
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            dispatch_interval_ms: millis(DEFAULT_DISPATCH_INTERVAL),
        }
    }
}

/// Which render surface implementation to drive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    /// A Chromium instance reached over the DevTools protocol.
    #[default]
    Cdp,
    /// The in-process synthetic surface.
    Synthetic,
}

impl FromStr for SurfaceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cdp" | "chrome" | "chromium" => Ok(Self::Cdp),
            "synthetic" => Ok(Self::Synthetic),
            other => Err(format!("unknown surface '{other}' (expected cdp or synthetic)")),
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cdp => "cdp",
            Self::Synthetic => "synthetic",
        })
    }
}

/// Render surface settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurfaceSettings {
    /// Surface implementation.
    pub kind: SurfaceKind,
    /// DevTools HTTP endpoint of the browser (for `cdp`).
    pub cdp_endpoint: String,
    /// Page loaded by `Home` and by new tabs.
    pub home_url: String,
    /// Viewport width in CSS pixels.
    pub viewport_width: u32,
    /// Viewport height in CSS pixels.
    pub viewport_height: u32,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            kind: SurfaceKind::Cdp,
            cdp_endpoint: "http://127.0.0.1:9222".to_string(),
            home_url: DEFAULT_HOME_URL.to_string(),
            viewport_width: 1024,
            viewport_height: 768,
        }
    }
}
