//! # remora-logging
//!
//! Structured logging with `tracing`.
//!
//! - [`init_subscriber`] installs the process-wide subscriber (stderr, compact
//!   or JSON lines, `RUST_LOG` overrides the configured level)
//! - [`test_utils::capture_logs`] records events in memory so tests can
//!   assert on what was logged

#![deny(unsafe_code)]

pub mod test_utils;
pub mod types;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};
pub use types::{LogFormat, LogLevel};

use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set and valid, otherwise `level`.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()))
}

/// Initialize the global tracing subscriber on stderr.
///
/// Call once at startup. Later calls are no-ops, so tests and embedders that
/// installed their own subscriber first keep it.
pub fn init_subscriber(level: LogLevel, format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init fails only when a global subscriber is already set
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_noop() {
        init_subscriber(LogLevel::Warn, LogFormat::Compact);
        init_subscriber(LogLevel::Debug, LogFormat::Json);
    }

    #[test]
    fn filter_uses_level_when_env_unset() {
        if std::env::var_os("RUST_LOG").is_none() {
            let filter = env_filter(LogLevel::Debug);
            assert_eq!(filter.to_string(), "debug");
        }
    }
}
