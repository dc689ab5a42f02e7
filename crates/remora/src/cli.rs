//! Command-line flags, applied over the loaded settings.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use remora_settings::{
    LogFormat, LogLevel, RemoraSettings, StreamTransport, SurfaceKind, load_settings,
    load_settings_from_path,
};

/// Stream a browser surface to remote viewers and relay their input.
#[derive(Parser, Debug, Default)]
#[command(name = "remora", version, about)]
pub struct Cli {
    /// Settings file (default `~/.remora/settings.json`).
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Directory served to viewers and holding `live_view.jpg`.
    #[arg(long)]
    pub asset_dir: Option<PathBuf>,

    /// Render surface: `cdp` or `synthetic`.
    #[arg(long)]
    pub surface: Option<SurfaceKind>,

    /// DevTools HTTP endpoint of the browser.
    #[arg(long)]
    pub cdp_endpoint: Option<String>,

    /// Page loaded by `home` and new tabs.
    #[arg(long)]
    pub home_url: Option<String>,

    /// Default stream transport: `mjpeg` or `sse`.
    #[arg(long)]
    pub transport: Option<StreamTransport>,

    /// Keep `live_view.jpg` updated for polling viewers.
    #[arg(long)]
    pub polling_fallback: bool,

    /// Start with streaming paused.
    #[arg(long)]
    pub paused: bool,

    /// Minimum log level.
    #[arg(long)]
    pub log_level: Option<LogLevel>,

    /// Log JSON lines instead of compact text.
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Load the settings layers, fold in the flags, and validate.
    pub fn settings(&self) -> Result<RemoraSettings> {
        let mut settings = match &self.config {
            Some(path) => load_settings_from_path(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => load_settings().context("failed to load settings")?,
        };
        self.apply(&mut settings);
        settings.validate().context("invalid configuration")?;
        Ok(settings)
    }

    /// Overwrite every setting named by a flag.
    pub fn apply(&self, settings: &mut RemoraSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(dir) = &self.asset_dir {
            settings.server.asset_dir.clone_from(dir);
        }
        if let Some(transport) = self.transport {
            settings.server.default_transport = transport;
        }
        if self.polling_fallback {
            settings.server.polling_fallback = true;
        }
        if self.paused {
            settings.capture.enabled = false;
        }
        if let Some(kind) = self.surface {
            settings.surface.kind = kind;
        }
        if let Some(endpoint) = &self.cdp_endpoint {
            settings.surface.cdp_endpoint.clone_from(endpoint);
        }
        if let Some(home) = &self.home_url {
            settings.surface.home_url.clone_from(home);
        }
        if let Some(level) = self.log_level {
            settings.logging.level = level;
        }
        if self.log_json {
            settings.logging.format = LogFormat::Json;
        }
    }
}
