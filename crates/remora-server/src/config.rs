//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use remora_core::constants::DEFAULT_STREAM_IDLE_TIMEOUT;
use remora_settings::{ServerSettings, StreamTransport};

/// Runtime configuration for [`RemoraServer`](crate::RemoraServer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Directory served for unmatched paths.
    pub asset_dir: PathBuf,
    /// Transport for `/stream` without `?transport=`.
    pub default_transport: StreamTransport,
    /// Wait for a new frame before re-sending the current one.
    pub idle_timeout: Duration,
    /// Keep `<asset_dir>/live_view.jpg` updated for polling viewers.
    pub polling_fallback: bool,
    /// Grace period for open connections on shutdown.
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            asset_dir: settings.asset_dir.clone(),
            default_transport: settings.default_transport,
            idle_timeout: settings.idle_timeout(),
            polling_fallback: settings.polling_fallback,
            shutdown_timeout: settings.shutdown_timeout(),
        }
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            asset_dir: PathBuf::from("server_files"),
            default_transport: StreamTransport::Mjpeg,
            idle_timeout: DEFAULT_STREAM_IDLE_TIMEOUT,
            polling_fallback: false,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}
