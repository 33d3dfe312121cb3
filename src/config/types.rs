//! Core configuration types for capture runs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::browser::{LaunchOptions, NetworkIdle};
use crate::catalog::TargetCatalog;
use crate::utils::{
    DEFAULT_DOM_MAX_WAIT, DEFAULT_DOM_POLL_INTERVAL, DEFAULT_DOM_QUIET_WINDOW, DEFAULT_SETTLE_DELAY,
};

/// How to wait for client-side rendering after network idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SettleStrategy {
    /// Sleep for a fixed period
    Fixed {
        #[serde(with = "crate::utils::serde_millis")]
        delay: Duration,
    },
    /// Poll a DOM fingerprint until it stops changing for `quiet`,
    /// giving up (without error) after `max_wait`
    DomStable {
        #[serde(with = "crate::utils::serde_millis")]
        poll: Duration,
        #[serde(with = "crate::utils::serde_millis")]
        quiet: Duration,
        #[serde(with = "crate::utils::serde_millis")]
        max_wait: Duration,
    },
}

impl SettleStrategy {
    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed { delay }
    }

    /// DOM-stability polling with default intervals
    #[must_use]
    pub fn dom_stable() -> Self {
        Self::DomStable {
            poll: DEFAULT_DOM_POLL_INTERVAL,
            quiet: DEFAULT_DOM_QUIET_WINDOW,
            max_wait: DEFAULT_DOM_MAX_WAIT,
        }
    }
}

impl Default for SettleStrategy {
    fn default() -> Self {
        Self::fixed(DEFAULT_SETTLE_DELAY)
    }
}

/// Main configuration for a capture run
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Root under which the screenshot and content directories live
    pub(crate) output_root: PathBuf,
    pub(crate) screenshot_dir_name: String,
    pub(crate) content_dir_name: String,
    pub(crate) catalog: TargetCatalog,

    /// Upper bound for navigation, including the network idle wait
    ///
    /// Default: 60 seconds
    pub(crate) navigation_timeout: Duration,
    pub(crate) network_idle: NetworkIdle,
    pub(crate) settle: SettleStrategy,

    pub(crate) launch: LaunchOptions,

    /// Remove artifacts whose id is no longer in the catalog
    ///
    /// Default: true
    pub(crate) prune_stale: bool,

    /// Persist the run manifest next to the artifact directories
    ///
    /// Default: true
    pub(crate) write_manifest: bool,
}

impl CaptureConfig {
    /// Snapshot of the settings worth recording in a manifest
    #[must_use]
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            output_root: self.output_root.clone(),
            screenshot_dir: self.screenshot_dir(),
            content_dir: self.content_dir(),
            target_count: self.catalog.len(),
            navigation_timeout_ms: u64::try_from(self.navigation_timeout.as_millis())
                .unwrap_or(u64::MAX),
            settle: self.settle,
            headless: self.launch.headless,
        }
    }
}

/// Serializable view of a [`CaptureConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub output_root: PathBuf,
    pub screenshot_dir: PathBuf,
    pub content_dir: PathBuf,
    pub target_count: usize,
    pub navigation_timeout_ms: u64,
    pub settle: SettleStrategy,
    pub headless: bool,
}
