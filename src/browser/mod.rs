//! Browser capability seam
//!
//! The crawl driver and the capture unit only ever talk to these traits.
//! `chromium` provides the production implementation over the Chrome
//! DevTools Protocol; tests plug in scripted fakes.

pub mod chromium;
pub mod network_idle;

use anyhow::Result;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::{
    DEFAULT_MAX_IDLE_CONNECTIONS, DEFAULT_NETWORK_IDLE_WINDOW, DEFAULT_WINDOW_HEIGHT,
    DEFAULT_WINDOW_WIDTH,
};

pub use chromium::{ChromiumLauncher, ChromiumPage, ChromiumSession};
pub use network_idle::InflightTracker;

/// Options handed to [`BrowserLauncher::launch`]
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Explicit browser binary; auto-detected (or downloaded) when `None`
    pub chrome_executable: Option<PathBuf>,
    /// Profile directory; a per-process temp dir is created and removed when `None`
    pub user_data_dir: Option<PathBuf>,
    pub window_size: (u32, u32),
    /// Upper bound for a single CDP request, navigation included
    ///
    /// The config builder raises it to at least the navigation timeout.
    pub request_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            user_data_dir: None,
            window_size: (DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// The browser's own navigation deadline expired before the page loaded
#[derive(Debug, thiserror::Error)]
#[error("browser gave up waiting for {url} to load")]
pub struct NavigationTimedOut {
    pub url: String,
}

/// When navigation counts as settled on the network side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkIdle {
    /// In-flight requests tolerated while idle
    pub max_inflight: usize,
    /// How long the count must stay at or below `max_inflight`
    pub idle_window: Duration,
}

impl Default for NetworkIdle {
    fn default() -> Self {
        Self {
            max_inflight: DEFAULT_MAX_IDLE_CONNECTIONS,
            idle_window: DEFAULT_NETWORK_IDLE_WINDOW,
        }
    }
}

/// Starts browser sessions
pub trait BrowserLauncher: Send + Sync {
    type Session: BrowserSession;

    fn launch(&self, options: &LaunchOptions)
    -> impl Future<Output = Result<Self::Session>> + Send;
}

/// A running browser process. Closed exactly once by its owner.
pub trait BrowserSession: Send {
    type Page: PageContext;

    fn new_page(&self) -> impl Future<Output = Result<Self::Page>> + Send;

    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// A single tab, reused across navigations
pub trait PageContext: Send + Sync {
    /// Load `url` and return once the network is idle per `idle`.
    ///
    /// Not bounded in time here; the caller applies the navigation timeout.
    fn navigate(&self, url: &str, idle: &NetworkIdle) -> impl Future<Output = Result<()>> + Send;

    /// PNG bytes of the whole page, beyond the viewport
    fn screenshot_full_page(&self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Rendered visible text of the document body
    fn visible_text(&self) -> impl Future<Output = Result<String>> + Send;

    /// Serialized live DOM, not the original server response
    fn serialized_dom(&self) -> impl Future<Output = Result<String>> + Send;

    /// Cheap value that changes whenever the DOM changes shape
    fn dom_fingerprint(&self) -> impl Future<Output = Result<String>> + Send;
}
