//! # remora
//!
//! Binary wiring for the remora bridge: parse flags, load settings, build
//! the render surface, then run the surface host and HTTP server until
//! ctrl-c.

#![deny(unsafe_code)]

pub mod app;
pub mod cli;

pub use app::{Running, build_surface, run, start, start_with};
pub use cli::Cli;
