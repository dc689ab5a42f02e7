//! # remora-core
//!
//! Shared vocabulary for the remora frame-distribution and command-relay bridge.
//!
//! This crate owns the only two pieces of state that cross execution contexts:
//!
//! - [`FrameBuffer`]: latest-value cache of the most recent encoded frame, with
//!   broadcast wake-up for every waiting stream session
//! - [`CommandQueue`]: bounded multi-producer / single-consumer FIFO of
//!   [`Command`]s, the serialization boundary in front of the render surface
//!
//! Everything here is I/O free. The capture loop and dispatcher live in
//! `remora-surface`; the HTTP surface lives in `remora-server`.

#![deny(unsafe_code)]

pub mod command;
pub mod constants;
pub mod frame;
pub mod metrics;
pub mod queue;

pub use command::{
    Command, Modifiers, ParseDirectionError, ScrollDirection, TabDirection, is_modifier_key,
    normalize_url,
};
pub use frame::{Frame, FrameBuffer, FrameSubscriber, ImageFormat, WaitError};
pub use queue::{CommandQueue, QueueFull, QueueStats};
