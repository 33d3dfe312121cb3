//! Shared configuration constants for sitesnap
//!
//! Default values used by the config builder and the browser launcher.

use std::time::Duration;

/// Default navigation upper bound: 60 seconds
///
/// Covers DNS, connection, document load and the network idle wait.
/// Exceeding it fails the current target only.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Default post-navigation quiescence period: 3 seconds
///
/// Gives client-side rendering time to finish after network idle.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// How long the in-flight request count must stay at or below
/// [`DEFAULT_MAX_IDLE_CONNECTIONS`] before the network counts as idle.
pub const DEFAULT_NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// In-flight requests tolerated while still considered idle.
pub const DEFAULT_MAX_IDLE_CONNECTIONS: usize = 2;

/// DOM-stability polling defaults
pub const DEFAULT_DOM_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_DOM_QUIET_WINDOW: Duration = Duration::from_secs(1);
pub const DEFAULT_DOM_MAX_WAIT: Duration = Duration::from_secs(10);

pub const DEFAULT_SCREENSHOT_DIR: &str = "screenshots";
pub const DEFAULT_CONTENT_DIR: &str = "scraped-content";
pub const MANIFEST_FILE_NAME: &str = "capture-manifest.json";

pub const DEFAULT_WINDOW_WIDTH: u32 = 1920;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 1080;

/// Chrome user agent string
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Upper bound for releasing the browser session at the end of a run
///
/// A session that does not close in time is dropped, which kills its handler.
pub const SESSION_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);
