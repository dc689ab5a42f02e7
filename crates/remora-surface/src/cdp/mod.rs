//! Chromium render surface over the DevTools protocol.
//!
//! Attaches to a browser started with `--remote-debugging-port`; every page
//! target is a tab. Only the handful of protocol methods the bridge needs are
//! used: screenshots, navigation, history, script evaluation and page events.

mod connection;
mod discovery;
mod scripts;
mod surface;

pub use connection::{CALL_TIMEOUT, CdpConnection, CdpEvent};
pub use discovery::{Discovery, TargetInfo};
pub use surface::{CdpConfig, CdpSurface};
