//! Wires settings into a running bridge: surface host plus HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use remora_core::{CommandQueue, FrameBuffer};
use remora_server::{Bridge, RemoraServer, ServerConfig, ShutdownCoordinator};
use remora_settings::{RemoraSettings, SurfaceKind};
use remora_surface::{
    CdpConfig, CdpSurface, FrameEncoder, HostConfig, RenderSurface, StreamSwitch, SurfaceHost,
    SyntheticSurface,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Build the configured render surface.
///
/// For `cdp` this connects to the browser, so it fails when none is
/// listening on the configured endpoint.
pub async fn build_surface(settings: &RemoraSettings) -> Result<Box<dyn RenderSurface>> {
    let surface = &settings.surface;
    match surface.kind {
        SurfaceKind::Synthetic => Ok(Box::new(SyntheticSurface::new(
            surface.home_url.clone(),
            surface.viewport_width,
            surface.viewport_height,
        ))),
        SurfaceKind::Cdp => {
            let config = CdpConfig {
                endpoint: surface.cdp_endpoint.clone(),
                home_url: surface.home_url.clone(),
                jpeg_quality: settings.capture.jpeg_quality,
                viewport: Some((surface.viewport_width, surface.viewport_height)),
            };
            let cdp = CdpSurface::connect(config).await.with_context(|| {
                format!("failed to attach to browser at {}", surface.cdp_endpoint)
            })?;
            Ok(Box::new(cdp))
        }
    }
}

/// A started bridge.
pub struct Running {
    addr: SocketAddr,
    shutdown: ShutdownCoordinator,
    tasks: Vec<JoinHandle<()>>,
    grace: Duration,
}

impl Running {
    /// Address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shutdown coordinator shared by every task.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Signal shutdown and wait up to the grace period for every task.
    ///
    /// Returns `false` when something had to be aborted.
    pub async fn stop(self) -> bool {
        self.shutdown.drain(self.tasks, self.grace).await
    }
}

/// Start the surface host and the HTTP server on `surface`.
pub async fn start_with(
    settings: &RemoraSettings,
    surface: Box<dyn RenderSurface>,
    metrics: Option<PrometheusHandle>,
) -> Result<Running> {
    let frames = Arc::new(FrameBuffer::new());
    let queue = Arc::new(CommandQueue::new(settings.commands.queue_capacity));
    let switch = StreamSwitch::new(settings.capture.enabled);
    let shutdown = ShutdownCoordinator::new();

    let host = SurfaceHost::new(
        surface,
        Arc::clone(&frames),
        Arc::clone(&queue),
        switch.clone(),
        FrameEncoder::new(settings.capture.jpeg_quality),
        HostConfig {
            capture_interval: settings.capture.interval(),
            dispatch_interval: settings.commands.dispatch_interval(),
        },
    );
    let status = host.status();

    let config = ServerConfig::from_settings(&settings.server);
    let grace = config.shutdown_timeout;
    let bridge = Bridge {
        frames,
        queue,
        switch,
        status,
    };
    let mut server = RemoraServer::new(config, bridge, shutdown.clone());
    if let Some(handle) = metrics {
        server = server.with_metrics(handle);
    }
    let (addr, server_task) = server.listen().await.context("failed to start HTTP server")?;

    let host = host.spawn(shutdown.token());
    let host_task = tokio::spawn(host.join());

    Ok(Running {
        addr,
        shutdown,
        tasks: vec![server_task, host_task],
        grace,
    })
}

/// Build the configured surface, then start everything around it.
pub async fn start(settings: &RemoraSettings, metrics: Option<PrometheusHandle>) -> Result<Running> {
    let surface = build_surface(settings).await?;
    info!(
        surface = surface.name(),
        capture_ms = settings.capture.interval_ms,
        dispatch_ms = settings.commands.dispatch_interval_ms,
        queue_capacity = settings.commands.queue_capacity,
        "render surface ready"
    );
    start_with(settings, surface, metrics).await
}

/// Run until ctrl-c, then shut down gracefully.
pub async fn run(settings: RemoraSettings, metrics: Option<PrometheusHandle>) -> Result<()> {
    let running = start(&settings, metrics).await?;
    info!(
        "remora listening on http://{} ({} stream by default)",
        running.addr(),
        settings.server.default_transport.as_str()
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("shutting down");
    if !running.stop().await {
        warn!("some tasks did not stop within the grace period");
    }
    info!("shutdown complete");
    Ok(())
}
