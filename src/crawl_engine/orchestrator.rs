//! Crawl driver: one browser session, one page, every target in order
//!
//! Coordinates a run with:
//! - Browser lifecycle (launch once, release exactly once)
//! - Sequential, fault-isolated capture of each catalog target
//! - Cancellation between and during targets
//! - Stale artifact pruning and the run manifest

use chrono::{DateTime, Utc};
use futures::FutureExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;

use super::cancel::CancelSignal;
use super::crawl_types::{CaptureResult, RunError, RunState};
use super::isolate::isolate_and_collect_while;
use super::page_capture::PageCapture;
use super::progress::{NoOpProgress, ProgressReporter};
use crate::browser::{BrowserLauncher, BrowserSession};
use crate::config::CaptureConfig;
use crate::content_saver::{ArtifactStore, RunManifest, save_manifest};
use crate::utils::SESSION_CLOSE_TIMEOUT;

/// What a run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub state: RunState,
    /// One entry per attempted target, in catalog order
    pub results: Vec<CaptureResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Cancellation was requested before the run finished
    pub cancelled: bool,
    pub launch_error: Option<String>,
}

impl RunReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaptureResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}

/// Runs a catalog through a single browser session.
///
/// A driver runs once; a second `run` is rejected.
pub struct CrawlDriver<L, R = NoOpProgress> {
    launcher: L,
    config: CaptureConfig,
    progress: R,
    state: RunState,
}

impl<L: BrowserLauncher> CrawlDriver<L, NoOpProgress> {
    pub fn new(launcher: L, config: CaptureConfig) -> Self {
        Self {
            launcher,
            config,
            progress: NoOpProgress,
            state: RunState::NotStarted,
        }
    }
}

impl<L: BrowserLauncher, R: ProgressReporter> CrawlDriver<L, R> {
    #[must_use]
    pub fn with_progress<P: ProgressReporter>(self, progress: P) -> CrawlDriver<L, P> {
        CrawlDriver {
            launcher: self.launcher,
            config: self.config,
            progress,
            state: self.state,
        }
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Launch the session, capture every target, release the session.
    ///
    /// Per-target failures are in the report. Errors are returned only when
    /// the session could not be started (nothing was attempted) or when the
    /// loop itself panicked; the session is released in both cases.
    pub async fn run(&mut self, cancel: &CancelSignal) -> Result<RunReport, RunError> {
        if self.state != RunState::NotStarted {
            return Err(RunError::Driver(format!(
                "driver already ran (state: {})",
                self.state
            )));
        }

        let started_at = Utc::now();
        info!(
            target: "sitesnap::driver",
            "Starting capture of {} target(s) into {}",
            self.config.catalog().len(),
            self.config.output_root().display()
        );

        self.advance(RunState::SessionLaunching);
        let session = match self.launcher.launch(self.config.launch_options()).await {
            Ok(session) => session,
            Err(e) => return Err(self.launch_failed(started_at, format!("{e:#}")).await),
        };

        let page = match session.new_page().await {
            Ok(page) => page,
            Err(e) => {
                self.close_session(session).await;
                let reason = format!("failed to open page: {e:#}");
                return Err(self.launch_failed(started_at, reason).await);
            }
        };

        self.advance(RunState::Iterating);
        let store = ArtifactStore::from_config(&self.config);
        self.prepare_store(&store).await;

        let iteration = AssertUnwindSafe(self.capture_all(&page, &store, cancel))
            .catch_unwind()
            .await;
        drop(page);

        self.advance(RunState::SessionClosing);
        self.close_session(session).await;
        self.advance(RunState::Done);

        let results = match iteration {
            Ok(results) => results,
            Err(panic) => {
                let message = panic_message(&*panic);
                self.progress
                    .report_error(&format!("Capture loop panicked: {message}"));
                return Err(RunError::Driver(format!("capture loop panicked: {message}")));
            }
        };

        let report = RunReport {
            state: self.state,
            results,
            started_at,
            finished_at: Utc::now(),
            cancelled: cancel.is_cancelled(),
            launch_error: None,
        };

        info!(
            target: "sitesnap::driver",
            "Run finished: {} succeeded, {} failed, {} skipped",
            report.succeeded(),
            report.failed(),
            self.config.catalog().len() - report.results.len()
        );
        self.persist_manifest(&report).await;

        Ok(report)
    }

    async fn capture_all<P>(
        &self,
        page: &P,
        store: &ArtifactStore,
        cancel: &CancelSignal,
    ) -> Vec<CaptureResult>
    where
        P: crate::browser::PageContext,
    {
        let capture = PageCapture::new(page, store, &self.config, cancel);
        let progress = &self.progress;
        let catalog = self.config.catalog();
        let total = catalog.len();
        let mut position = 0;

        // Ok and Err both carry the full record; the split only marks failures
        let collected = isolate_and_collect_while(
            catalog.iter(),
            || !cancel.is_cancelled(),
            |target| {
                let target = *target;
                position += 1;
                let position = position;
                async move {
                    progress.report_target_started(position, total, target);
                    let result = capture.capture(target).await;
                    progress.report_target_finished(position, total, &result);
                    if result.is_success() { Ok(result) } else { Err(result) }
                }
            },
        )
        .await;

        let results: Vec<CaptureResult> = collected
            .into_iter()
            .map(|entry| match entry.result {
                Ok(result) | Err(result) => result,
            })
            .collect();

        if cancel.is_cancelled() {
            self.progress.report_cancelled(total - results.len());
        }
        results
    }

    /// Directories are created only once a session exists; a failed launch
    /// creates no artifact directories.
    async fn prepare_store(&self, store: &ArtifactStore) {
        if let Err(e) = store.ensure_dirs().await {
            // each write will then fail for its own target
            warn!("Failed to create artifact directories: {e}");
            self.progress
                .report_error(&format!("Failed to create artifact directories: {e}"));
            return;
        }

        if self.config.prune_stale() {
            let keep = self.config.catalog().ids();
            if let Err(e) = store.prune_stale(&keep).await {
                warn!("Failed to prune stale artifacts: {e}");
            }
        }
    }

    async fn launch_failed(&mut self, started_at: DateTime<Utc>, reason: String) -> RunError {
        self.advance(RunState::LaunchFailed);
        self.progress
            .report_error(&format!("Browser session failed to launch: {reason}"));

        let report = RunReport {
            state: self.state,
            results: Vec::new(),
            started_at,
            finished_at: Utc::now(),
            cancelled: false,
            launch_error: Some(reason.clone()),
        };
        self.persist_manifest(&report).await;

        RunError::LaunchFailed(reason)
    }

    async fn close_session(&self, session: L::Session) {
        debug!(target: "sitesnap::cleanup", "Releasing browser session");
        match tokio::time::timeout(SESSION_CLOSE_TIMEOUT, session.close()).await {
            Ok(Ok(())) => debug!(target: "sitesnap::cleanup", "Browser session released"),
            Ok(Err(e)) => {
                warn!(target: "sitesnap::cleanup", "Browser session did not close cleanly: {e:#}");
                self.progress
                    .report_error(&format!("Browser session did not close cleanly: {e:#}"));
            }
            Err(_) => {
                warn!(
                    target: "sitesnap::cleanup",
                    "Browser session close timed out after {SESSION_CLOSE_TIMEOUT:?}"
                );
                self.progress.report_error("Browser session close timed out");
            }
        }
    }

    async fn persist_manifest(&self, report: &RunReport) {
        if !self.config.write_manifest() {
            return;
        }
        let manifest = RunManifest::from_report(report, &self.config);
        match save_manifest(&manifest, &self.config.manifest_path()).await {
            Ok(path) => info!("Run manifest written to {}", path.display()),
            Err(e) => {
                warn!("Failed to write run manifest: {e:#}");
                self.progress
                    .report_error(&format!("Failed to write run manifest: {e:#}"));
            }
        }
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid run state transition {} -> {next}",
            self.state
        );
        debug!(target: "sitesnap::driver", "Run state: {} -> {next}", self.state);
        self.state = next;
        self.progress.report_state(next);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
