//! # remora-surface
//!
//! Everything that runs on the render surface's serialized execution context.
//!
//! - [`RenderSurface`]: the capability a browser engine exposes (capture,
//!   navigation, input synthesis, tab actions, event polling)
//! - [`CaptureLoop`]: one capture tick, encode and publish to the
//!   [`FrameBuffer`](remora_core::FrameBuffer)
//! - [`Dispatcher`]: one dispatch tick, drain the
//!   [`CommandQueue`](remora_core::CommandQueue) and apply in order
//! - [`SurfaceHost`]: owns the surface and drives both ticks from a single
//!   task, so the surface is never touched concurrently
//!
//! Two surfaces ship with the crate: [`CdpSurface`] drives a running
//! Chromium over the DevTools protocol, and [`SyntheticSurface`] is an
//! in-process stand-in that renders its own state.

#![deny(unsafe_code)]

pub mod capture;
pub mod cdp;
pub mod dispatch;
pub mod encode;
pub mod errors;
pub mod host;
pub mod surface;
pub mod synthetic;
pub mod testing;

pub use capture::{CaptureLoop, CaptureOutcome, StreamSwitch};
pub use cdp::{CdpConfig, CdpSurface};
pub use dispatch::{DispatchReport, Dispatcher};
pub use encode::FrameEncoder;
pub use errors::SurfaceError;
pub use host::{HostConfig, HostHandle, SurfaceHost, SurfaceStatus};
pub use surface::{Capture, ElementRef, RenderSurface, SurfaceEvent};
pub use synthetic::SyntheticSurface;
