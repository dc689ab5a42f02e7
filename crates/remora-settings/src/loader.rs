//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RemoraSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `REMORA_*` environment overrides
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::RemoraSettings;

/// Default settings file location (`~/.remora/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".remora").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RemoraSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields the defaults; an unreadable or malformed file is an
/// error.
pub fn load_settings_from_path(path: &Path) -> Result<RemoraSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn read_settings_file(path: &Path) -> Result<RemoraSettings> {
    let defaults = serde_json::to_value(RemoraSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `REMORA_*` environment overrides.
///
/// Values that fail to parse or fall outside their range are ignored with a
/// warning, leaving the file/default value in place.
pub fn apply_env_overrides(settings: &mut RemoraSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary lookup (used by tests).
pub fn apply_overrides<F>(settings: &mut RemoraSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("REMORA_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.parsed("REMORA_PORT", |s| parse_u16_range(s, 0, u16::MAX)) {
        settings.server.port = v;
    }
    if let Some(v) = env.string("REMORA_ASSET_DIR") {
        settings.server.asset_dir = PathBuf::from(v);
    }
    if let Some(v) = env.parsed("REMORA_TRANSPORT", |s| s.parse().ok()) {
        settings.server.default_transport = v;
    }
    if let Some(v) = env.parsed("REMORA_IDLE_TIMEOUT_MS", |s| parse_u64_range(s, 50, 60_000)) {
        settings.server.idle_timeout_ms = v;
    }
    if let Some(v) = env.parsed("REMORA_POLLING_FALLBACK", parse_bool) {
        settings.server.polling_fallback = v;
    }

    // ── Capture / commands ──────────────────────────────────────────
    if let Some(v) = env.parsed("REMORA_CAPTURE_INTERVAL_MS", |s| parse_u64_range(s, 1, 10_000)) {
        settings.capture.interval_ms = v;
    }
    if let Some(v) = env.parsed("REMORA_JPEG_QUALITY", |s| parse_u8_range(s, 1, 100)) {
        settings.capture.jpeg_quality = v;
    }
    if let Some(v) = env.parsed("REMORA_STREAM_ENABLED", parse_bool) {
        settings.capture.enabled = v;
    }
    if let Some(v) = env.parsed("REMORA_QUEUE_CAPACITY", |s| parse_usize_range(s, 1, 100_000)) {
        settings.commands.queue_capacity = v;
    }
    if let Some(v) = env.parsed("REMORA_DISPATCH_INTERVAL_MS", |s| parse_u64_range(s, 1, 10_000))
    {
        settings.commands.dispatch_interval_ms = v;
    }

    // ── Surface ─────────────────────────────────────────────────────
    if let Some(v) = env.parsed("REMORA_SURFACE", |s| s.parse().ok()) {
        settings.surface.kind = v;
    }
    if let Some(v) = env.string("REMORA_CDP_ENDPOINT") {
        settings.surface.cdp_endpoint = v;
    }
    if let Some(v) = env.string("REMORA_HOME_URL") {
        settings.surface.home_url = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.parsed("REMORA_LOG_LEVEL", |s| s.parse().ok()) {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("REMORA_LOG_FORMAT", |s| s.parse().ok()) {
        settings.logging.format = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a boolean: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`,
/// case-insensitive.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a `u8` within `min..=max`.
pub fn parse_u8_range(val: &str, min: u8, max: u8) -> Option<u8> {
    let n: u8 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a `u16` within `min..=max`.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a `u64` within `min..=max`.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a `usize` within `min..=max`.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env override, ignoring");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::errors::SettingsError;
    use crate::types::{LogLevel, StreamTransport, SurfaceKind};

    fn overrides(pairs: &[(&str, &str)]) -> RemoraSettings {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mut settings = RemoraSettings::default();
        apply_overrides(&mut settings, |name| map.get(name).cloned());
        settings
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8000, "host": "0.0.0.0"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "0.0.0.0");
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_array_replaces() {
        let merged = deep_merge(
            serde_json::json!({"items": [1, 2, 3]}),
            serde_json::json!({"items": [4]}),
        );
        assert_eq!(merged["items"], serde_json::json!([4]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let merged = deep_merge(
            serde_json::json!({"a": {"nested": true}}),
            serde_json::json!({"a": 42}),
        );
        assert_eq!(merged["a"], 42);
    }

    // ── read_settings_file / load_settings_from_path ────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = read_settings_file(Path::new("/nonexistent/remora.json")).unwrap();
        assert_eq!(settings, RemoraSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9191, "defaultTransport": "sse"}, "surface": {"kind": "synthetic"}}"#,
        )
        .unwrap();

        let settings = read_settings_file(&path).unwrap();
        assert_eq!(settings.server.port, 9191);
        assert_eq!(settings.server.default_transport, StreamTransport::Sse);
        assert_eq!(settings.surface.kind, SurfaceKind::Synthetic);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.capture.interval_ms, 40);
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(read_settings_file(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn wrong_type_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": "eighty"}}"#).unwrap();
        assert!(matches!(read_settings_file(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn settings_path_under_dot_remora() {
        let path = settings_path();
        assert!(path.ends_with(".remora/settings.json"));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let settings = overrides(&[
            ("REMORA_PORT", "9000"),
            ("REMORA_HOST", "127.0.0.1"),
            ("REMORA_TRANSPORT", "sse"),
            ("REMORA_JPEG_QUALITY", "55"),
            ("REMORA_POLLING_FALLBACK", "off"),
            ("REMORA_SURFACE", "synthetic"),
            ("REMORA_LOG_LEVEL", "debug"),
            ("REMORA_QUEUE_CAPACITY", "16"),
        ]);
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.default_transport, StreamTransport::Sse);
        assert_eq!(settings.capture.jpeg_quality, 55);
        assert!(!settings.server.polling_fallback);
        assert_eq!(settings.surface.kind, SurfaceKind::Synthetic);
        assert_eq!(settings.logging.level, LogLevel::Debug);
        assert_eq!(settings.commands.queue_capacity, 16);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let settings = overrides(&[
            ("REMORA_PORT", "99999"),
            ("REMORA_JPEG_QUALITY", "0"),
            ("REMORA_TRANSPORT", "carrier-pigeon"),
            ("REMORA_CAPTURE_INTERVAL_MS", "fast"),
            ("REMORA_QUEUE_CAPACITY", "0"),
        ]);
        let defaults = RemoraSettings::default();
        assert_eq!(settings.server.port, defaults.server.port);
        assert_eq!(settings.capture.jpeg_quality, defaults.capture.jpeg_quality);
        assert_eq!(settings.server.default_transport, defaults.server.default_transport);
        assert_eq!(settings.capture.interval_ms, defaults.capture.interval_ms);
        assert_eq!(settings.commands.queue_capacity, defaults.commands.queue_capacity);
    }

    #[test]
    fn empty_env_value_is_ignored() {
        let settings = overrides(&[("REMORA_HOST", "")]);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in ["true", "1", "yes", "ON"] {
            assert_eq!(parse_bool(val), Some(true), "{val}");
        }
        for val in ["false", "0", "no", "Off"] {
            assert_eq!(parse_bool(val), Some(false), "{val}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u8_range("100", 1, 100), Some(100));
        assert_eq!(parse_u8_range("101", 1, 100), None);
        assert_eq!(parse_u16_range("0", 0, u16::MAX), Some(0));
        assert_eq!(parse_u64_range("49", 50, 60_000), None);
        assert_eq!(parse_usize_range("abc", 1, 10), None);
    }
}
