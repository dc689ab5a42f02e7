//! # remora-settings
//!
//! Configuration for the remora bridge, loaded from three layers in priority
//! order:
//! 1. **Compiled defaults**: [`RemoraSettings::default()`]
//! 2. **Settings file**: `~/.remora/settings.json` or an explicit path,
//!    deep-merged over the defaults
//! 3. **Environment variables**: `REMORA_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the binary, after which
//! [`RemoraSettings::validate`] must pass before anything starts.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
