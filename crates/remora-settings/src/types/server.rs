//! HTTP listener and streaming settings.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use remora_core::constants::DEFAULT_STREAM_IDLE_TIMEOUT;
use serde::{Deserialize, Serialize};

/// Push transport used by `/stream` when the request does not choose one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamTransport {
    /// `multipart/x-mixed-replace` JPEG parts.
    #[default]
    Mjpeg,
    /// `text/event-stream` with base64 frame payloads.
    Sse,
}

impl StreamTransport {
    /// Wire name, as used in `?transport=`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mjpeg => "mjpeg",
            Self::Sse => "sse",
        }
    }
}

impl FromStr for StreamTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mjpeg" => Ok(Self::Mjpeg),
            "sse" => Ok(Self::Sse),
            other => Err(format!("unknown transport '{other}' (expected mjpeg or sse)")),
        }
    }
}

impl fmt::Display for StreamTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port (`0` picks an ephemeral port).
    pub port: u16,
    /// Directory of viewer assets served for unmatched paths.
    pub asset_dir: PathBuf,
    /// Transport for `/stream` without `?transport=`.
    pub default_transport: StreamTransport,
    /// How long a stream session waits for a new frame before re-sending
    /// the current one.
    pub idle_timeout_ms: u64,
    /// Keep `<assetDir>/live_view.jpg` updated for polling viewers.
    pub polling_fallback: bool,
    /// Seconds to wait for open connections on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl ServerSettings {
    /// Idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            asset_dir: PathBuf::from("server_files"),
            default_transport: StreamTransport::Mjpeg,
            idle_timeout_ms: u64::try_from(DEFAULT_STREAM_IDLE_TIMEOUT.as_millis()).unwrap_or(1000),
            polling_fallback: true,
            shutdown_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transport_is_mjpeg() {
        assert_eq!(ServerSettings::default().default_transport, StreamTransport::Mjpeg);
    }

    #[test]
    fn transport_parse_is_exact() {
        assert_eq!("sse".parse::<StreamTransport>(), Ok(StreamTransport::Sse));
        assert_eq!("mjpeg".parse::<StreamTransport>(), Ok(StreamTransport::Mjpeg));
        assert!("SSE".parse::<StreamTransport>().is_err());
        assert!("websocket".parse::<StreamTransport>().is_err());
    }

    #[test]
    fn idle_timeout_default_one_second() {
        assert_eq!(ServerSettings::default().idle_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn transport_serde_lowercase() {
        assert_eq!(serde_json::to_string(&StreamTransport::Sse).unwrap(), "\"sse\"");
    }
}
