//! The serialized execution context that owns the render surface.
//!
//! [`SurfaceHost`] runs a single task with two timers: capture ticks and
//! dispatch ticks. Both call into the surface from that one task, so no
//! surface method ever runs concurrently with another. Engine notifications
//! are drained after every tick and folded into a [`SurfaceStatus`] that
//! other contexts read through a `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use remora_core::constants::{DEFAULT_CAPTURE_INTERVAL, DEFAULT_DISPATCH_INTERVAL};
use remora_core::{CommandQueue, FrameBuffer};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::capture::{CaptureLoop, StreamSwitch};
use crate::dispatch::Dispatcher;
use crate::encode::FrameEncoder;
use crate::surface::{RenderSurface, SurfaceEvent};

/// Tick periods for the host loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostConfig {
    /// Capture period.
    pub capture_interval: Duration,
    /// Dispatch period.
    pub dispatch_interval: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            capture_interval: DEFAULT_CAPTURE_INTERVAL,
            dispatch_interval: DEFAULT_DISPATCH_INTERVAL,
        }
    }
}

/// Last known state of the render surface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceStatus {
    /// Surface implementation name.
    pub surface: &'static str,
    /// Whether the capture loop is publishing.
    pub streaming: bool,
    /// URL of the active tab.
    pub url: Option<String>,
    /// Title of the active tab.
    pub title: Option<String>,
    /// Whether a navigation is in progress.
    pub loading: bool,
    /// Index of the active tab.
    pub tab_index: usize,
    /// Number of open tabs.
    pub tab_count: usize,
}

impl SurfaceStatus {
    /// Fold one engine notification into the status.
    pub fn apply(&mut self, event: &SurfaceEvent) {
        match event {
            SurfaceEvent::LoadStarted => self.loading = true,
            SurfaceEvent::LoadFinished { url, title } => {
                self.loading = false;
                self.url = Some(url.clone());
                self.title = Some(title.clone());
            }
            SurfaceEvent::UrlChanged(url) => self.url = Some(url.clone()),
            SurfaceEvent::TitleChanged(title) => self.title = Some(title.clone()),
            SurfaceEvent::TabChanged { index, count } => {
                self.tab_index = *index;
                self.tab_count = *count;
            }
        }
    }
}

/// Owns a surface and drives capture and dispatch on one task.
pub struct SurfaceHost {
    surface: Box<dyn RenderSurface>,
    capture: CaptureLoop,
    dispatcher: Dispatcher,
    switch: StreamSwitch,
    config: HostConfig,
    status: watch::Sender<SurfaceStatus>,
}

impl SurfaceHost {
    /// Assemble a host around `surface`.
    pub fn new(
        surface: Box<dyn RenderSurface>,
        frames: Arc<FrameBuffer>,
        queue: Arc<CommandQueue>,
        switch: StreamSwitch,
        encoder: FrameEncoder,
        config: HostConfig,
    ) -> Self {
        let (status, _rx) = watch::channel(SurfaceStatus {
            surface: surface.name(),
            streaming: switch.is_enabled(),
            tab_count: 1,
            ..SurfaceStatus::default()
        });
        Self {
            capture: CaptureLoop::new(frames, encoder, switch.clone()),
            dispatcher: Dispatcher::new(queue),
            surface,
            switch,
            config,
            status,
        }
    }

    /// Subscribe to status updates.
    pub fn status(&self) -> watch::Receiver<SurfaceStatus> {
        self.status.subscribe()
    }

    /// Run on a new task until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> HostHandle {
        let status = self.status();
        let task = tokio::spawn(self.run(cancel));
        HostHandle { status, task }
    }

    /// Run the tick loop until `cancel` fires, then shut the surface down.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut capture_tick = interval(self.config.capture_interval);
        capture_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut dispatch_tick = interval(self.config.dispatch_interval);
        dispatch_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            surface = self.surface.name(),
            capture_ms = self.config.capture_interval.as_millis(),
            dispatch_ms = self.config.dispatch_interval.as_millis(),
            "surface host started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = dispatch_tick.tick() => {
                    let report = self.dispatcher.tick(self.surface.as_mut()).await;
                    if report.total() > 0 {
                        debug!(applied = report.applied, failed = report.failed, "dispatch tick");
                    }
                }
                _ = capture_tick.tick() => {
                    let _ = self.capture.tick(self.surface.as_mut()).await;
                }
            }
            self.refresh_status().await;
        }

        self.surface.shutdown().await;
        info!(surface = self.surface.name(), "surface host stopped");
    }

    async fn refresh_status(&mut self) {
        let events = self.surface.poll_events().await;
        let streaming = self.switch.is_enabled();
        let _ = self.status.send_if_modified(|status| {
            let before = status.clone();
            status.streaming = streaming;
            for event in &events {
                status.apply(event);
            }
            *status != before
        });
    }
}

/// Handle to a spawned [`SurfaceHost`].
pub struct HostHandle {
    status: watch::Receiver<SurfaceStatus>,
    task: JoinHandle<()>,
}

impl HostHandle {
    /// Subscribe to status updates.
    pub fn status(&self) -> watch::Receiver<SurfaceStatus> {
        self.status.clone()
    }

    /// Wait for the host task to finish.
    pub async fn join(self) {
        if let Err(error) = self.task.await {
            tracing::error!(%error, "surface host task failed");
        }
    }
}
