//! Persisting capture artifacts and run manifests

mod artifact_store;
mod manifest;

pub use artifact_store::{ArtifactStore, HTML_EXT, SCREENSHOT_EXT, TEXT_EXT};
pub use manifest::{ManifestSummary, RunManifest, load_manifest, save_manifest};
