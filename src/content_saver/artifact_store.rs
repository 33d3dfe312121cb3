//! Filesystem layout for captured artifacts
//!
//! ```text
//! <output root>/
//!   screenshots/<id>.png
//!   scraped-content/<id>.txt
//!   scraped-content/<id>.html
//! ```
//!
//! Every write replaces the previous file of the same name atomically
//! (temp file in the same directory, then rename).

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::CaptureConfig;
use crate::crawl_engine::CaptureError;

pub const SCREENSHOT_EXT: &str = "png";
pub const TEXT_EXT: &str = "txt";
pub const HTML_EXT: &str = "html";

/// Writes named artifacts into the screenshot and content directories.
///
/// Holds no state besides the two directory paths.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    screenshot_dir: PathBuf,
    content_dir: PathBuf,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(screenshot_dir: impl Into<PathBuf>, content_dir: impl Into<PathBuf>) -> Self {
        Self {
            screenshot_dir: screenshot_dir.into(),
            content_dir: content_dir.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.screenshot_dir(), config.content_dir())
    }

    #[must_use]
    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    #[must_use]
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Create both directories if absent. Never fails because they already exist.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.screenshot_dir).await?;
        tokio::fs::create_dir_all(&self.content_dir).await?;
        debug!(
            "Artifact directories ready: {} and {}",
            self.screenshot_dir.display(),
            self.content_dir.display()
        );
        Ok(())
    }

    #[must_use]
    pub fn screenshot_path(&self, id: &str) -> PathBuf {
        self.screenshot_dir.join(format!("{id}.{SCREENSHOT_EXT}"))
    }

    #[must_use]
    pub fn text_path(&self, id: &str) -> PathBuf {
        self.content_dir.join(format!("{id}.{TEXT_EXT}"))
    }

    #[must_use]
    pub fn html_path(&self, id: &str) -> PathBuf {
        self.content_dir.join(format!("{id}.{HTML_EXT}"))
    }

    pub async fn write_screenshot(&self, id: &str, bytes: Vec<u8>) -> Result<PathBuf, CaptureError> {
        write_replacing(self.screenshot_path(id), bytes).await
    }

    pub async fn write_text(&self, id: &str, content: String) -> Result<PathBuf, CaptureError> {
        write_replacing(self.text_path(id), content.into_bytes()).await
    }

    pub async fn write_html(&self, id: &str, content: String) -> Result<PathBuf, CaptureError> {
        write_replacing(self.html_path(id), content.into_bytes()).await
    }

    /// Remove artifacts whose stem is not in `keep`.
    ///
    /// Only `*.png` in the screenshot directory and `*.txt` / `*.html` in the
    /// content directory are considered; anything else is left untouched.
    /// Missing directories are not an error.
    pub async fn prune_stale(&self, keep: &HashSet<&str>) -> std::io::Result<Vec<PathBuf>> {
        let mut removed =
            prune_dir(&self.screenshot_dir, &[SCREENSHOT_EXT], keep).await?;
        removed.extend(prune_dir(&self.content_dir, &[TEXT_EXT, HTML_EXT], keep).await?);

        if !removed.is_empty() {
            info!("Removed {} stale artifact(s)", removed.len());
        }
        Ok(removed)
    }
}

async fn prune_dir(dir: &Path, exts: &[&str], keep: &HashSet<&str>) -> std::io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(removed),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }

        let ext_matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| exts.contains(&e));
        let stem = path.file_stem().and_then(|s| s.to_str());

        if let (true, Some(stem)) = (ext_matches, stem)
            && !keep.contains(stem)
        {
            debug!("Removing stale artifact {}", path.display());
            tokio::fs::remove_file(&path).await?;
            removed.push(path);
        }
    }

    Ok(removed)
}

/// Write `bytes` to `path` through a temp file in the same directory.
pub(crate) async fn write_replacing(path: PathBuf, bytes: Vec<u8>) -> Result<PathBuf, CaptureError> {
    let target = path.clone();
    let written = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(&bytes)?;
        temp_file.flush()?;
        temp_file.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await;

    match written {
        Ok(Ok(())) => Ok(path),
        Ok(Err(source)) => Err(CaptureError::Write { path, source }),
        Err(join_error) => Err(CaptureError::Write {
            path,
            source: std::io::Error::other(format!("write task failed: {join_error}")),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(root: &Path) -> ArtifactStore {
        ArtifactStore::new(root.join("screenshots"), root.join("scraped-content"))
    }

    #[tokio::test]
    async fn ensure_dirs_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());

        store.ensure_dirs().await.unwrap();
        store.ensure_dirs().await.unwrap();

        assert!(store.screenshot_dir().is_dir());
        assert!(store.content_dir().is_dir());
    }

    #[tokio::test]
    async fn writes_overwrite_previous_content() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());
        store.ensure_dirs().await.unwrap();

        store.write_text("home", "first".into()).await.unwrap();
        let path = store.write_text("home", "second".into()).await.unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "second");
    }

    #[tokio::test]
    async fn write_into_missing_dir_is_a_write_error() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());

        let err = store.write_html("home", "<html></html>".into()).await.unwrap_err();
        assert!(matches!(err, CaptureError::Write { .. }));
    }

    #[tokio::test]
    async fn prune_removes_only_unknown_artifacts() {
        let tmp = TempDir::new().unwrap();
        let store = store(tmp.path());
        store.ensure_dirs().await.unwrap();

        store.write_screenshot("keep", vec![1]).await.unwrap();
        store.write_screenshot("old", vec![2]).await.unwrap();
        store.write_text("old", "x".into()).await.unwrap();
        store.write_html("keep", "y".into()).await.unwrap();
        std::fs::write(store.content_dir().join("notes.md"), "unrelated").unwrap();

        let keep: HashSet<&str> = ["keep"].into_iter().collect();
        let removed: HashSet<PathBuf> = store.prune_stale(&keep).await.unwrap().into_iter().collect();

        let expected: HashSet<PathBuf> = [store.screenshot_path("old"), store.text_path("old")]
            .into_iter()
            .collect();
        assert_eq!(removed, expected);
        assert!(!store.screenshot_path("old").exists());
        assert!(!store.text_path("old").exists());
        assert!(store.screenshot_path("keep").exists());
        assert!(store.html_path("keep").exists());
        assert!(store.content_dir().join("notes.md").exists());
    }

    #[tokio::test]
    async fn prune_on_missing_dirs_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let removed = store(tmp.path()).prune_stale(&HashSet::new()).await.unwrap();
        assert!(removed.is_empty());
    }
}
