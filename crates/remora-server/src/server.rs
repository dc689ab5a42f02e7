//! `RemoraServer`: the axum application around the frame buffer and the
//! command queue.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use remora_core::{CommandQueue, FrameBuffer};
use remora_surface::{StreamSwitch, SurfaceStatus};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::assets;
use crate::config::ServerConfig;
use crate::control;
use crate::errors::{ApiError, ServerError};
use crate::gallery;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::snapshot::{self, SnapshotWriter};
use crate::status;
use crate::stream::{self, SessionCounter};

/// The state shared with the render surface's execution context.
#[derive(Clone)]
pub struct Bridge {
    /// Latest captured frame.
    pub frames: Arc<FrameBuffer>,
    /// Commands waiting for the dispatcher.
    pub queue: Arc<CommandQueue>,
    /// Capture on/off.
    pub switch: StreamSwitch,
    /// Surface state published by the host loop.
    pub status: watch::Receiver<SurfaceStatus>,
}

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Latest captured frame.
    pub frames: Arc<FrameBuffer>,
    /// Commands waiting for the dispatcher.
    pub queue: Arc<CommandQueue>,
    /// Capture on/off.
    pub switch: StreamSwitch,
    /// Surface state published by the host loop.
    pub status: watch::Receiver<SurfaceStatus>,
    /// Open stream sessions.
    pub sessions: SessionCounter,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Fires on shutdown; ends every open stream.
    pub shutdown: CancellationToken,
    /// When the server was built.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The remora HTTP server.
pub struct RemoraServer {
    config: Arc<ServerConfig>,
    bridge: Bridge,
    shutdown: ShutdownCoordinator,
    sessions: SessionCounter,
    metrics: Option<PrometheusHandle>,
    start_time: Instant,
}

impl RemoraServer {
    /// Create a server over `bridge`. Cancelling `shutdown` stops it.
    pub fn new(config: ServerConfig, bridge: Bridge, shutdown: ShutdownCoordinator) -> Self {
        Self {
            config: Arc::new(config),
            bridge,
            shutdown,
            sessions: SessionCounter::default(),
            metrics: None,
            start_time: Instant::now(),
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Open stream sessions.
    pub fn sessions(&self) -> &SessionCounter {
        &self.sessions
    }

    fn state(&self) -> AppState {
        AppState {
            frames: Arc::clone(&self.bridge.frames),
            queue: Arc::clone(&self.bridge.queue),
            switch: self.bridge.switch.clone(),
            status: self.bridge.status.clone(),
            sessions: self.sessions.clone(),
            config: Arc::clone(&self.config),
            shutdown: self.shutdown.token(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        }
    }

    /// Build the router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/stream", get(stream::stream_handler))
            .route("/navigate", get(control::navigate))
            .route("/click", get(control::click))
            .route("/scroll", get(control::scroll))
            .route("/type", get(control::key_input))
            .route("/switch_tab", get(control::switch_tab))
            .route("/new_tab", get(control::new_tab))
            .route("/back", get(control::back))
            .route("/forward", get(control::forward))
            .route("/reload", get(control::reload))
            .route("/home", get(control::home))
            .route("/toggle_stream", get(control::toggle_stream))
            .route("/snapshot", get(snapshot::snapshot_handler))
            .route("/screenshot", get(gallery::screenshot_handler))
            .route("/status", get(status::status_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .merge(assets::routes())
            .fallback_service(assets::files(&self.config.asset_dir))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state())
    }

    /// Bind and serve in the background.
    ///
    /// Returns the bound address and a handle that completes once the
    /// accept loop and every open connection have wound down after
    /// shutdown.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener.local_addr().map_err(ServerError::LocalAddr)?;
        let token = self.shutdown.token();

        let snapshots = self.config.polling_fallback.then(|| {
            let writer = SnapshotWriter::new(Arc::clone(&self.bridge.frames), &self.config.asset_dir);
            tokio::spawn(writer.run(token.clone()))
        });

        let router = self.router();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(error) = served {
                warn!(%error, "server stopped with error");
            }
            if let Some(task) = snapshots {
                let _ = task.await;
            }
            info!("server stopped");
        });

        info!(%local, asset_dir = %self.config.asset_dir.display(), "remora server listening");
        Ok((local, handle))
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.sessions.active(),
        state.frames.latest_seq(),
        state.queue.len(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            crate::metrics::render(handle),
        )
            .into_response(),
        None => ApiError::NotFound("metrics recorder not installed").into_response(),
    }
}
