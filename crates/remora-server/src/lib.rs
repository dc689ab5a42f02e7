//! # remora-server
//!
//! Axum HTTP server for the remora bridge.
//!
//! - `/stream`: multipart JPEG or server-sent events, fed from the
//!   [`FrameBuffer`](remora_core::FrameBuffer), one [`StreamSession`] per
//!   connection
//! - control routes (`/navigate`, `/click`, `/scroll`, `/type`, tab and
//!   history actions): strict query validation, then a non-blocking enqueue
//!   onto the [`CommandQueue`](remora_core::CommandQueue)
//! - polling fallback (`live_view.jpg`, `/snapshot`), viewer assets,
//!   `/status`, `/health`, `/metrics`
//! - `/screenshot`: saves the current frame under a timestamped name and
//!   regenerates `gallery.html`
//! - graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod assets;
pub mod config;
pub mod control;
pub mod errors;
pub mod gallery;
pub mod health;
pub mod metrics;
pub mod params;
pub mod server;
pub mod shutdown;
pub mod snapshot;
pub mod status;
pub mod stream;

pub use config::ServerConfig;
pub use errors::{ApiError, ServerError};
pub use gallery::Gallery;
pub use server::{AppState, Bridge, RemoraServer};
pub use shutdown::ShutdownCoordinator;
pub use snapshot::SnapshotWriter;
pub use stream::{SessionCounter, StreamSession};
