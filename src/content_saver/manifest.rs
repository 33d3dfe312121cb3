//! Run manifest: a JSON record of one driver run
//!
//! Written to `<output root>/capture-manifest.json` after the session is
//! released, including runs whose launch failed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;

use super::artifact_store::write_replacing;
use crate::config::{CaptureConfig, ConfigSummary};
use crate::crawl_engine::{CaptureResult, RunReport, RunState};

/// Upper bound for serializing a manifest off the async runtime
const SERIALIZATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: RunState,
    pub cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_error: Option<String>,
    pub config: ConfigSummary,
    pub summary: ManifestSummary,
    pub results: Vec<CaptureResult>,
}

/// Counts over the catalog; `skipped` are targets never attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSummary {
    pub targets: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunManifest {
    #[must_use]
    pub fn from_report(report: &RunReport, config: &CaptureConfig) -> Self {
        let targets = config.catalog().len();
        let attempted = report.results.len();
        let succeeded = report.succeeded();

        Self {
            started_at: report.started_at,
            finished_at: report.finished_at,
            state: report.state,
            cancelled: report.cancelled,
            launch_error: report.launch_error.clone(),
            config: config.summary(),
            summary: ManifestSummary {
                targets,
                attempted,
                succeeded,
                failed: attempted - succeeded,
                skipped: targets.saturating_sub(attempted),
            },
            results: report.results.clone(),
        }
    }
}

/// Serialize and atomically write the manifest, creating the parent directory
pub async fn save_manifest(manifest: &RunManifest, path: &Path) -> Result<PathBuf> {
    let manifest = manifest.clone();
    let blocking_task =
        tokio::task::spawn_blocking(move || serde_json::to_string_pretty(&manifest));

    let json = match timeout(SERIALIZATION_TIMEOUT, blocking_task).await {
        Ok(Ok(result)) => result.context("Failed to serialize run manifest")?,
        Ok(Err(e)) => anyhow::bail!("Manifest serialization task panicked: {e}"),
        Err(_) => anyhow::bail!(
            "Manifest serialization timed out after {SERIALIZATION_TIMEOUT:?}"
        ),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let saved = write_replacing(path.to_path_buf(), json.into_bytes()).await?;
    log::debug!("Run manifest written to {}", saved.display());
    Ok(saved)
}

pub async fn load_manifest(path: &Path) -> Result<RunManifest> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse manifest {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Target, TargetCatalog};
    use crate::crawl_engine::{CaptureOutcome, FailureKind};
    use tempfile::TempDir;

    fn config(root: &Path) -> CaptureConfig {
        let catalog = TargetCatalog::new(vec![
            Target::new("a", "https://a.example/"),
            Target::new("b", "https://b.example/"),
            Target::new("c", "https://c.example/"),
        ])
        .unwrap();
        CaptureConfig::builder()
            .output_root(root)
            .catalog(catalog)
            .build()
            .unwrap()
    }

    fn report() -> RunReport {
        let now = Utc::now();
        RunReport {
            state: RunState::Done,
            results: vec![
                CaptureResult {
                    target_id: "a".into(),
                    url: "https://a.example/".into(),
                    outcome: CaptureOutcome::Success,
                    elapsed: Duration::from_millis(1200),
                },
                CaptureResult {
                    target_id: "b".into(),
                    url: "https://b.example/".into(),
                    outcome: CaptureOutcome::Failure {
                        kind: FailureKind::Navigation,
                        reason: "net::ERR_NAME_NOT_RESOLVED".into(),
                    },
                    elapsed: Duration::from_millis(40),
                },
            ],
            started_at: now,
            finished_at: now,
            cancelled: true,
            launch_error: None,
        }
    }

    #[test]
    fn summary_counts_skipped_targets() {
        let tmp = TempDir::new().unwrap();
        let manifest = RunManifest::from_report(&report(), &config(tmp.path()));

        assert_eq!(
            manifest.summary,
            ManifestSummary {
                targets: 3,
                attempted: 2,
                succeeded: 1,
                failed: 1,
                skipped: 1,
            }
        );
        assert!(manifest.cancelled);
    }

    #[tokio::test]
    async fn save_then_load_preserves_results() {
        let tmp = TempDir::new().unwrap();
        let config = config(tmp.path());
        let manifest = RunManifest::from_report(&report(), &config);

        let path = save_manifest(&manifest, &config.manifest_path()).await.unwrap();
        let loaded = load_manifest(&path).await.unwrap();

        assert_eq!(loaded.results, manifest.results);
        assert_eq!(loaded.state, RunState::Done);
        assert_eq!(loaded.config.target_count, 3);
    }
}
