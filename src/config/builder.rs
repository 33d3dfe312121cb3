//! Type-safe builder for `CaptureConfig` using the typestate pattern
//!
//! `build()` only exists once both the output root and the catalog are set.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use super::types::{CaptureConfig, SettleStrategy};
use crate::browser::{LaunchOptions, NetworkIdle};
use crate::catalog::TargetCatalog;
use crate::utils::{DEFAULT_CONTENT_DIR, DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_SCREENSHOT_DIR};

// Type states for the builder
pub struct WithOutputRoot;
pub struct WithCatalog;

/// Optional settings, carried unchanged across state transitions
#[derive(Debug, Clone)]
struct Settings {
    screenshot_dir_name: String,
    content_dir_name: String,
    navigation_timeout: Duration,
    network_idle: NetworkIdle,
    settle: SettleStrategy,
    launch: LaunchOptions,
    prune_stale: bool,
    write_manifest: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            screenshot_dir_name: DEFAULT_SCREENSHOT_DIR.to_string(),
            content_dir_name: DEFAULT_CONTENT_DIR.to_string(),
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle: NetworkIdle::default(),
            settle: SettleStrategy::default(),
            launch: LaunchOptions::default(),
            prune_stale: true,
            write_manifest: true,
        }
    }
}

pub struct CaptureConfigBuilder<State = ()> {
    output_root: Option<PathBuf>,
    catalog: Option<TargetCatalog>,
    settings: Settings,
    _phantom: PhantomData<State>,
}

impl Default for CaptureConfigBuilder<()> {
    fn default() -> Self {
        Self {
            output_root: None,
            catalog: None,
            settings: Settings::default(),
            _phantom: PhantomData,
        }
    }
}

impl CaptureConfig {
    /// Create a builder for configuring a `CaptureConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> CaptureConfigBuilder<()> {
        CaptureConfigBuilder::default()
    }
}

impl<State> CaptureConfigBuilder<State> {
    fn into_state<Next>(self) -> CaptureConfigBuilder<Next> {
        CaptureConfigBuilder {
            output_root: self.output_root,
            catalog: self.catalog,
            settings: self.settings,
            _phantom: PhantomData,
        }
    }
}

impl CaptureConfigBuilder<()> {
    pub fn output_root(mut self, dir: impl Into<PathBuf>) -> CaptureConfigBuilder<WithOutputRoot> {
        self.output_root = Some(dir.into());
        self.into_state()
    }
}

impl CaptureConfigBuilder<WithOutputRoot> {
    pub fn catalog(mut self, catalog: TargetCatalog) -> CaptureConfigBuilder<WithCatalog> {
        self.catalog = Some(catalog);
        self.into_state()
    }
}

// Build method only available when all required fields are set
impl CaptureConfigBuilder<WithCatalog> {
    pub fn build(self) -> Result<CaptureConfig> {
        let Settings {
            screenshot_dir_name,
            content_dir_name,
            navigation_timeout,
            network_idle,
            settle,
            mut launch,
            prune_stale,
            write_manifest,
        } = self.settings;

        validate_dir_name("screenshot", &screenshot_dir_name)?;
        validate_dir_name("content", &content_dir_name)?;
        if screenshot_dir_name == content_dir_name {
            // pruning one kind would otherwise see the other's files
            return Err(anyhow!(
                "screenshot and content directories must differ (both '{screenshot_dir_name}')"
            ));
        }
        if navigation_timeout.is_zero() {
            return Err(anyhow!("navigation timeout must be greater than zero"));
        }
        if let SettleStrategy::DomStable { poll, .. } = settle
            && poll.is_zero()
        {
            return Err(anyhow!("DOM stability poll interval must be greater than zero"));
        }
        // chromiumoxide bounds goto() by the request timeout
        launch.request_timeout = launch.request_timeout.max(navigation_timeout);

        Ok(CaptureConfig {
            output_root: self
                .output_root
                .ok_or_else(|| anyhow!("output_root is required"))?,
            catalog: self.catalog.ok_or_else(|| anyhow!("catalog is required"))?,
            screenshot_dir_name,
            content_dir_name,
            navigation_timeout,
            network_idle,
            settle,
            launch,
            prune_stale,
            write_manifest,
        })
    }
}

fn validate_dir_name(label: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(anyhow!("invalid {label} directory name '{name}'"));
    }
    Ok(())
}

// Optional settings, available in any state
impl<State> CaptureConfigBuilder<State> {
    #[must_use]
    pub fn screenshot_dir_name(mut self, name: impl Into<String>) -> Self {
        self.settings.screenshot_dir_name = name.into();
        self
    }

    #[must_use]
    pub fn content_dir_name(mut self, name: impl Into<String>) -> Self {
        self.settings.content_dir_name = name.into();
        self
    }

    /// Upper bound for navigation including the network idle wait (default 60s)
    #[must_use]
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.settings.navigation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn network_idle(mut self, idle: NetworkIdle) -> Self {
        self.settings.network_idle = idle;
        self
    }

    /// Post-navigation wait (default: fixed 3s)
    #[must_use]
    pub fn settle(mut self, settle: SettleStrategy) -> Self {
        self.settings.settle = settle;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.settings.launch.headless = headless;
        self
    }

    #[must_use]
    pub fn chrome_executable(mut self, path: Option<PathBuf>) -> Self {
        self.settings.launch.chrome_executable = path;
        self
    }

    /// Chrome profile directory; a temporary one is used when unset
    #[must_use]
    pub fn chrome_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.settings.launch.user_data_dir = dir;
        self
    }

    #[must_use]
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.settings.launch.window_size = (width, height);
        self
    }

    #[must_use]
    pub fn prune_stale(mut self, prune: bool) -> Self {
        self.settings.prune_stale = prune;
        self
    }

    #[must_use]
    pub fn write_manifest(mut self, write: bool) -> Self {
        self.settings.write_manifest = write;
        self
    }
}
