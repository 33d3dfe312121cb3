//! chromiumoxide-backed implementation of the browser traits

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use log::{debug, info, warn};
use std::path::PathBuf;
use tokio::task::JoinHandle;

use super::network_idle::goto_and_wait_for_idle;
use super::{BrowserLauncher, BrowserSession, LaunchOptions, NetworkIdle, PageContext};
use crate::browser_setup::launch_browser;

const VISIBLE_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

const DOM_FINGERPRINT_SCRIPT: &str = r"
    (function() {
        const root = document.documentElement;
        if (!root) return '0:0';
        return root.outerHTML.length + ':' + document.getElementsByTagName('*').length;
    })()
";

/// Launches a local Chrome/Chromium
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

impl BrowserLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn launch(&self, options: &LaunchOptions) -> Result<ChromiumSession> {
        let launched = launch_browser(options).await?;
        Ok(ChromiumSession {
            browser: launched.browser,
            resources: SessionResources::new(
                launched.handler,
                launched.owns_user_data_dir.then_some(launched.user_data_dir),
            ),
            window_size: options.window_size,
        })
    }
}

/// A running Chrome process and its CDP handler task
///
/// Dropping without a completed `close()` still aborts the handler and
/// removes the temporary profile; chromiumoxide kills the child process on drop.
pub struct ChromiumSession {
    browser: Browser,
    resources: SessionResources,
    window_size: (u32, u32),
}

impl ChromiumSession {
    async fn shutdown(&mut self) -> Result<()> {
        let mut errors = Vec::new();

        debug!(target: "sitesnap::cleanup", "Closing browser");
        if let Err(e) = self.browser.close().await {
            warn!(target: "sitesnap::cleanup", "Failed to close browser: {e}");
            errors.push(format!("browser close failed: {e}"));
        }

        // wait for the process to exit so the profile dir is no longer locked
        if let Err(e) = self.browser.wait().await {
            warn!(target: "sitesnap::cleanup", "Failed to wait for browser exit: {e}");
            errors.push(format!("browser wait failed: {e}"));
        }

        if let Err(e) = self.resources.release().await {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(errors.join("; ")))
        }
    }
}

/// Handler task and owned profile directory of a session
///
/// Anything not yet released when this is dropped is released synchronously,
/// so an interrupted `close()` leaks neither.
struct SessionResources {
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
    released: bool,
}

impl SessionResources {
    fn new(handler: JoinHandle<()>, user_data_dir: Option<PathBuf>) -> Self {
        Self {
            handler,
            user_data_dir,
            released: false,
        }
    }

    async fn release(&mut self) -> std::result::Result<(), String> {
        self.handler.abort();

        let Some(dir) = self.user_data_dir.clone() else {
            self.released = true;
            return Ok(());
        };
        let removed = tokio::fs::remove_dir_all(&dir).await;
        self.user_data_dir = None;
        self.released = true;
        removed.map_err(|e| {
            warn!(
                target: "sitesnap::cleanup",
                "Failed to remove Chrome data directory {}: {e}",
                dir.display()
            );
            format!("profile cleanup failed: {e}")
        })
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        info!(
            target: "sitesnap::cleanup",
            "Browser session dropped before close finished, aborting handler task"
        );
        self.handler.abort();
        if let Some(dir) = self.user_data_dir.take()
            && let Err(e) = std::fs::remove_dir_all(&dir)
        {
            warn!(
                target: "sitesnap::cleanup",
                "Failed to clean up temp directory {}: {e}. Manual cleanup may be required.",
                dir.display()
            );
        }
    }
}

impl BrowserSession for ChromiumSession {
    type Page = ChromiumPage;

    async fn new_page(&self) -> Result<ChromiumPage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to create blank page")?;

        let (width, height) = self.window_size;
        page.execute(
            SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(width))
                .height(i64::from(height))
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .map_err(anyhow::Error::msg)?,
        )
        .await
        .context("Failed to set viewport")?;

        Ok(ChromiumPage { page })
    }

    async fn close(mut self) -> Result<()> {
        self.shutdown().await
    }
}

/// One reusable Chrome tab
#[derive(Clone)]
pub struct ChromiumPage {
    page: Page,
}

impl PageContext for ChromiumPage {
    async fn navigate(&self, url: &str, idle: &NetworkIdle) -> Result<()> {
        goto_and_wait_for_idle(&self.page, url, idle).await
    }

    async fn screenshot_full_page(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        self.page
            .screenshot(params)
            .await
            .context("Failed to capture screenshot")
    }

    async fn visible_text(&self) -> Result<String> {
        self.page
            .evaluate(VISIBLE_TEXT_SCRIPT)
            .await
            .context("Failed to read visible text")?
            .into_value::<String>()
            .context("Visible text was not a string")
    }

    async fn serialized_dom(&self) -> Result<String> {
        self.page
            .content()
            .await
            .context("Failed to serialize DOM")
    }

    async fn dom_fingerprint(&self) -> Result<String> {
        self.page
            .evaluate(DOM_FINGERPRINT_SCRIPT)
            .await
            .context("Failed to fingerprint DOM")?
            .into_value::<String>()
            .context("DOM fingerprint was not a string")
    }
}
