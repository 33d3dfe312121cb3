pub mod browser;
pub mod browser_setup;
pub mod catalog;
pub mod config;
pub mod content_saver;
pub mod crawl_engine;
pub mod utils;

pub use browser::{
    BrowserLauncher, BrowserSession, ChromiumLauncher, LaunchOptions, NavigationTimedOut, NetworkIdle,
    PageContext,
};
pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use catalog::{CatalogError, Target, TargetCatalog};
pub use config::{CaptureConfig, ConfigSummary, SettleStrategy};
pub use content_saver::{ArtifactStore, ManifestSummary, RunManifest, load_manifest, save_manifest};
pub use crawl_engine::{
    CancelSignal, CaptureError, CaptureOutcome, CaptureResult, CrawlDriver, FailureKind,
    LogProgress, NoOpProgress, PageCapture, ProgressReporter, RunError, RunReport, RunState,
    isolate_and_collect, isolate_and_collect_while,
};

/// Capture every target in `config` with a local Chrome, logging progress.
pub async fn capture_site(
    config: CaptureConfig,
    cancel: &CancelSignal,
) -> Result<RunReport, RunError> {
    CrawlDriver::new(ChromiumLauncher, config)
        .with_progress(LogProgress)
        .run(cancel)
        .await
}
