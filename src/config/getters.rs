//! Getter methods for `CaptureConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{CaptureConfig, SettleStrategy};
use crate::browser::{LaunchOptions, NetworkIdle};
use crate::catalog::TargetCatalog;
use crate::utils::MANIFEST_FILE_NAME;

impl CaptureConfig {
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    #[must_use]
    pub fn screenshot_dir(&self) -> PathBuf {
        self.output_root.join(&self.screenshot_dir_name)
    }

    #[must_use]
    pub fn content_dir(&self) -> PathBuf {
        self.output_root.join(&self.content_dir_name)
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.output_root.join(MANIFEST_FILE_NAME)
    }

    #[must_use]
    pub fn catalog(&self) -> &TargetCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        self.navigation_timeout
    }

    #[must_use]
    pub fn network_idle(&self) -> &NetworkIdle {
        &self.network_idle
    }

    #[must_use]
    pub fn settle(&self) -> SettleStrategy {
        self.settle
    }

    #[must_use]
    pub fn launch_options(&self) -> &LaunchOptions {
        &self.launch
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.launch.headless
    }

    #[must_use]
    pub fn prune_stale(&self) -> bool {
        self.prune_stale
    }

    #[must_use]
    pub fn write_manifest(&self) -> bool {
        self.write_manifest
    }
}
