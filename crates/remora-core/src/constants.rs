//! Package-level constants and defaults.

use std::time::Duration;

/// Current version of remora (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "remora";

/// Default capture period (25 fps).
pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_millis(40);

/// Default command dispatch period.
pub const DEFAULT_DISPATCH_INTERVAL: Duration = Duration::from_millis(100);

/// Default idle wait before a stream session re-checks liveness.
pub const DEFAULT_STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default command queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

/// Page loaded by `Home` and by freshly opened tabs.
pub const DEFAULT_HOME_URL: &str = "https://www.google.com";

/// File name of the pull-based polling resource inside the asset directory.
pub const LIVE_VIEW_FILE: &str = "live_view.jpg";

/// Multipart boundary used by the push stream.
pub const MULTIPART_BOUNDARY: &str = "frame";
