//! Graceful shutdown via one shared `CancellationToken`.
//!
//! The host loop, the snapshot writer, every open stream body and the axum
//! accept loop all watch the same token, so cancelling it winds the whole
//! bridge down.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Owns the shutdown token.
#[derive(Clone, Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the token for a task to watch.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signal every task to stop. Idempotent.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("shutdown requested");
        }
        self.token.cancel();
    }

    /// Whether shutdown has been signalled.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown, then wait up to `grace` for `tasks` to finish.
    ///
    /// Returns `false` if the grace period ran out; stragglers are aborted.
    pub async fn drain(&self, tasks: Vec<JoinHandle<()>>, grace: Duration) -> bool {
        self.shutdown();
        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
        info!(tasks = tasks.len(), grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX), "draining tasks");
        if tokio::time::timeout(grace, futures::future::join_all(tasks))
            .await
            .is_ok()
        {
            return true;
        }
        warn!(?grace, "shutdown grace period elapsed, aborting remaining tasks");
        for abort in aborts {
            abort.abort();
        }
        false
    }
}
