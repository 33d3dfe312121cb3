//! Page capture unit: one target through the shared page
//!
//! navigate (bounded, network idle) -> settle -> screenshot -> visible text
//! -> serialized DOM, writing each artifact as soon as it is extracted.
//! Every step races the run's cancellation signal.

use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use super::cancel::CancelSignal;
use super::crawl_types::{CaptureError, CaptureResult};
use crate::browser::{NavigationTimedOut, NetworkIdle, PageContext};
use crate::catalog::Target;
use crate::config::{CaptureConfig, SettleStrategy};
use crate::content_saver::ArtifactStore;

/// Captures targets through one page context into one artifact store.
///
/// Holds only borrows; the driver builds it once per run.
pub struct PageCapture<'a, P> {
    page: &'a P,
    store: &'a ArtifactStore,
    cancel: &'a CancelSignal,
    navigation_timeout: Duration,
    network_idle: NetworkIdle,
    settle: SettleStrategy,
}

// manual impls: derive would require P: Clone/Copy
impl<P> Clone for PageCapture<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for PageCapture<'_, P> {}

impl<'a, P: PageContext> PageCapture<'a, P> {
    pub fn new(
        page: &'a P,
        store: &'a ArtifactStore,
        config: &CaptureConfig,
        cancel: &'a CancelSignal,
    ) -> Self {
        Self {
            page,
            store,
            cancel,
            navigation_timeout: config.navigation_timeout(),
            network_idle: *config.network_idle(),
            settle: config.settle(),
        }
    }

    /// Capture `target` and record the outcome. Never fails.
    pub async fn capture(&self, target: &Target) -> CaptureResult {
        let started = Instant::now();
        let result = self.try_capture(target).await;
        CaptureResult::from_attempt(target, result.as_ref().err(), started.elapsed())
    }

    /// The capture steps, stopping at the first failure.
    ///
    /// Artifacts written before a failure are left in place.
    pub async fn try_capture(&self, target: &Target) -> Result<(), CaptureError> {
        debug!("Capturing '{}' from {}", target.id, target.url);

        self.navigate(&target.url).await?;
        self.settle().await?;

        let png = self
            .extract("screenshot", self.page.screenshot_full_page())
            .await?;
        self.guard(self.store.write_screenshot(&target.id, png))
            .await??;

        let text = self.extract("visible text", self.page.visible_text()).await?;
        self.guard(self.store.write_text(&target.id, text)).await??;

        let html = self
            .extract("serialized DOM", self.page.serialized_dom())
            .await?;
        self.guard(self.store.write_html(&target.id, html)).await??;

        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
        let bounded = tokio::time::timeout(
            self.navigation_timeout,
            self.page.navigate(url, &self.network_idle),
        );

        match self.guard(bounded).await? {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.is::<NavigationTimedOut>() => Err(CaptureError::NavigationTimeout {
                url: url.to_string(),
                timeout: self.navigation_timeout,
            }),
            Ok(Err(e)) => Err(CaptureError::Navigation {
                url: url.to_string(),
                message: format!("{e:#}"),
            }),
            Err(_) => Err(CaptureError::NavigationTimeout {
                url: url.to_string(),
                timeout: self.navigation_timeout,
            }),
        }
    }

    async fn settle(&self) -> Result<(), CaptureError> {
        match self.settle {
            SettleStrategy::Fixed { delay } => self.guard(tokio::time::sleep(delay)).await,
            SettleStrategy::DomStable {
                poll,
                quiet,
                max_wait,
            } => self.guard(self.wait_for_stable_dom(poll, quiet, max_wait)).await,
        }
    }

    /// Poll the DOM fingerprint until it is unchanged for `quiet`.
    ///
    /// Gives up silently at `max_wait`; extraction then runs on whatever is there.
    async fn wait_for_stable_dom(&self, poll: Duration, quiet: Duration, max_wait: Duration) {
        let started = Instant::now();
        let deadline = started + max_wait;

        let mut last = match self.page.dom_fingerprint().await {
            Ok(fp) => fp,
            Err(e) => {
                warn!("DOM fingerprint unavailable, skipping stability wait: {e:#}");
                return;
            }
        };
        let mut unchanged_since = started;

        loop {
            let now = Instant::now();
            if now.duration_since(unchanged_since) >= quiet {
                debug!("DOM stable after {:?}", now.duration_since(started));
                return;
            }
            if now >= deadline {
                debug!("DOM still changing after {max_wait:?}, continuing anyway");
                return;
            }

            tokio::time::sleep(poll.min(deadline - now)).await;

            match self.page.dom_fingerprint().await {
                Ok(fp) if fp != last => {
                    last = fp;
                    unchanged_since = Instant::now();
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("DOM fingerprint failed mid-wait: {e:#}");
                    return;
                }
            }
        }
    }

    async fn extract<T>(
        &self,
        what: &'static str,
        step: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, CaptureError> {
        self.guard(step)
            .await?
            .map_err(|e| CaptureError::extraction(what, e))
    }

    /// Run `step` unless cancellation arrives first
    async fn guard<F: Future>(&self, step: F) -> Result<F::Output, CaptureError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(CaptureError::Cancelled),
            out = step => Ok(out),
        }
    }
}
