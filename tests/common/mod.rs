//! Test utilities for the sitesnap test suite: a scripted in-memory browser
//! and config helpers.

#![allow(dead_code)]

use anyhow::{Result, anyhow, bail};
use sitesnap::{
    BrowserLauncher, BrowserSession, CaptureConfig, LaunchOptions, NetworkIdle, PageContext,
    Target, TargetCatalog,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// What the fake page does when navigated to a URL
#[derive(Debug, Clone)]
pub enum Behavior {
    Load,
    /// Navigation fails with this message
    NavError(&'static str),
    /// Navigation never completes
    Hang,
    /// Navigation completes after this long
    Slow(Duration),
    /// Navigation succeeds, the screenshot fails
    ScreenshotError,
    Panic,
}

/// Counters shared by every object the fake launcher hands out
#[derive(Debug, Default)]
pub struct BrowserLog {
    pub launches: AtomicUsize,
    pub pages: AtomicUsize,
    pub closes: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
}

impl BrowserLog {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    behaviors: Arc<HashMap<String, Behavior>>,
    fail_launch: Option<&'static str>,
    fail_new_page: bool,
    fail_close: bool,
    pub log: Arc<BrowserLog>,
}

impl FakeLauncher {
    /// Every URL loads successfully unless scripted otherwise
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, behavior: Behavior) -> Self {
        Arc::make_mut(&mut self.behaviors).insert(url.to_string(), behavior);
        self
    }

    pub fn failing_launch(mut self, reason: &'static str) -> Self {
        self.fail_launch = Some(reason);
        self
    }

    pub fn failing_new_page(mut self) -> Self {
        self.fail_new_page = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

impl BrowserLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self, _options: &LaunchOptions) -> Result<FakeSession> {
        self.log.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.fail_launch {
            bail!("{reason}");
        }
        Ok(FakeSession {
            behaviors: Arc::clone(&self.behaviors),
            fail_new_page: self.fail_new_page,
            fail_close: self.fail_close,
            log: Arc::clone(&self.log),
        })
    }
}

pub struct FakeSession {
    behaviors: Arc<HashMap<String, Behavior>>,
    fail_new_page: bool,
    fail_close: bool,
    log: Arc<BrowserLog>,
}

impl BrowserSession for FakeSession {
    type Page = FakePage;

    async fn new_page(&self) -> Result<FakePage> {
        if self.fail_new_page {
            bail!("target crashed while opening tab");
        }
        self.log.pages.fetch_add(1, Ordering::SeqCst);
        Ok(FakePage {
            behaviors: Arc::clone(&self.behaviors),
            log: Arc::clone(&self.log),
            current: Mutex::new(None),
        })
    }

    async fn close(self) -> Result<()> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            bail!("browser process already gone");
        }
        Ok(())
    }
}

pub struct FakePage {
    behaviors: Arc<HashMap<String, Behavior>>,
    log: Arc<BrowserLog>,
    current: Mutex<Option<String>>,
}

impl FakePage {
    fn current(&self) -> Result<String> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("no document loaded"))
    }

    fn behavior(&self, url: &str) -> Behavior {
        self.behaviors.get(url).cloned().unwrap_or(Behavior::Load)
    }
}

impl PageContext for FakePage {
    async fn navigate(&self, url: &str, _idle: &NetworkIdle) -> Result<()> {
        self.log.navigations.lock().unwrap().push(url.to_string());
        *self.current.lock().unwrap() = None;

        match self.behavior(url) {
            Behavior::NavError(message) => bail!("{message}"),
            Behavior::Hang => std::future::pending::<()>().await,
            Behavior::Slow(delay) => tokio::time::sleep(delay).await,
            Behavior::Panic => panic!("renderer exploded on {url}"),
            Behavior::Load | Behavior::ScreenshotError => {}
        }

        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn screenshot_full_page(&self) -> Result<Vec<u8>> {
        let url = self.current()?;
        if matches!(self.behavior(&url), Behavior::ScreenshotError) {
            bail!("Page.captureScreenshot returned no data");
        }
        Ok(format!("png:{url}").into_bytes())
    }

    async fn visible_text(&self) -> Result<String> {
        Ok(format!("text of {}", self.current()?))
    }

    async fn serialized_dom(&self) -> Result<String> {
        Ok(format!("<html><body>{}</body></html>", self.current()?))
    }

    async fn dom_fingerprint(&self) -> Result<String> {
        self.current()
    }
}

/// Creates a temporary directory for test output
pub fn create_test_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

pub fn catalog(entries: &[(&str, &str)]) -> TargetCatalog {
    TargetCatalog::new(entries.iter().map(|(id, url)| Target::new(*id, *url)).collect())
        .expect("valid test catalog")
}

/// Config with default timings, writing under `root`
pub fn config(root: &Path, entries: &[(&str, &str)]) -> CaptureConfig {
    CaptureConfig::builder()
        .output_root(root)
        .catalog(catalog(entries))
        .build()
        .expect("valid test config")
}

pub fn read(path: impl AsRef<Path>) -> String {
    std::fs::read_to_string(path).unwrap()
}
