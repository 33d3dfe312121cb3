//! Target catalog: the fixed, ordered list of pages a run visits.
//!
//! A catalog is validated once at startup. Everything downstream can assume
//! ids are unique, filename-safe, and that every URL is absolute http(s).

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// One named page to visit and capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Stable identifier, used as the filename stem of every artifact.
    pub id: String,
    /// Absolute http(s) URL.
    pub url: String,
}

impl Target {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    /// Parse the `id=URL` form accepted on the command line.
    pub fn parse_pair(pair: &str) -> Result<Self, CatalogError> {
        let (id, url) = pair
            .split_once('=')
            .ok_or_else(|| CatalogError::MalformedPair(pair.to_string()))?;
        Ok(Self::new(id.trim(), url.trim()))
    }
}

/// Errors raised while building or loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("target #{index} has an empty id")]
    EmptyId { index: usize },

    #[error("target '{id}' has an id that is not filename-safe")]
    InvalidId { id: String },

    #[error("target '{id}' has an empty url")]
    EmptyUrl { id: String },

    #[error("target '{id}' has an invalid url '{url}': {reason}")]
    InvalidUrl {
        id: String,
        url: String,
        reason: String,
    },

    #[error("duplicate target id '{0}'")]
    DuplicateId(String),

    #[error("expected id=URL, got '{0}'")]
    MalformedPair(String),

    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Ordered, duplicate-free sequence of targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TargetCatalog {
    targets: Vec<Target>,
}

impl TargetCatalog {
    /// Validate and wrap a list of targets, keeping their order.
    pub fn new(targets: Vec<Target>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(targets.len());

        for (index, target) in targets.iter().enumerate() {
            validate_id(index, &target.id)?;
            validate_url(target)?;
            if !seen.insert(target.id.as_str()) {
                return Err(CatalogError::DuplicateId(target.id.clone()));
            }
        }

        Ok(Self { targets })
    }

    /// Load a catalog from a JSON array of `{ "id", "url" }` objects.
    pub fn from_json_str(json: &str, origin: &str) -> Result<Self, CatalogError> {
        let targets: Vec<Target> =
            serde_json::from_str(json).map_err(|source| CatalogError::Parse {
                path: origin.to_string(),
                source,
            })?;
        Self::new(targets)
    }

    pub async fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let display = path.display().to_string();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Read {
                path: display.clone(),
                source,
            })?;
        Self::from_json_str(&json, &display)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        self.targets.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Unwrap into the ordered targets, e.g. to extend the catalog
    #[must_use]
    pub fn into_targets(self) -> Vec<Target> {
        self.targets
    }

    #[must_use]
    pub fn ids(&self) -> HashSet<&str> {
        self.targets.iter().map(|t| t.id.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a TargetCatalog {
    type Item = &'a Target;
    type IntoIter = std::slice::Iter<'a, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}

fn validate_id(index: usize, id: &str) -> Result<(), CatalogError> {
    if id.is_empty() {
        return Err(CatalogError::EmptyId { index });
    }

    let filename_safe = !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if !filename_safe {
        return Err(CatalogError::InvalidId { id: id.to_string() });
    }
    Ok(())
}

fn validate_url(target: &Target) -> Result<(), CatalogError> {
    if target.url.is_empty() {
        return Err(CatalogError::EmptyUrl {
            id: target.id.clone(),
        });
    }

    let invalid = |reason: String| CatalogError::InvalidUrl {
        id: target.id.clone(),
        url: target.url.clone(),
        reason,
    };

    let parsed = Url::parse(&target.url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_catalog_order() {
        let catalog = TargetCatalog::new(vec![
            Target::new("home", "https://example.com/"),
            Target::new("about", "https://example.com/about"),
            Target::new("blog", "https://example.com/blog"),
        ])
        .unwrap();

        let ids: Vec<_> = catalog.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["home", "about", "blog"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = TargetCatalog::new(vec![
            Target::new("home", "https://example.com/"),
            Target::new("home", "https://example.com/other"),
        ])
        .unwrap_err();

        assert!(matches!(err, CatalogError::DuplicateId(id) if id == "home"));
    }

    #[test]
    fn rejects_empty_fields() {
        let err = TargetCatalog::new(vec![Target::new("", "https://example.com/")]).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyId { index: 0 }));

        let err = TargetCatalog::new(vec![Target::new("home", "")]).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyUrl { .. }));
    }

    #[test]
    fn rejects_ids_that_escape_the_output_dir() {
        for bad in ["../etc", "a/b", ".hidden", "with space"] {
            let err = TargetCatalog::new(vec![Target::new(bad, "https://example.com/")])
                .unwrap_err();
            assert!(matches!(err, CatalogError::InvalidId { .. }), "{bad}");
        }
    }

    #[test]
    fn rejects_relative_and_non_http_urls() {
        let err = TargetCatalog::new(vec![Target::new("a", "/relative")]).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidUrl { .. }));

        let err = TargetCatalog::new(vec![Target::new("a", "ftp://example.com/")]).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidUrl { .. }));
    }

    #[test]
    fn parses_json_array() {
        let json = r#"[
            {"id": "pricing", "url": "https://example.com/pricing"},
            {"id": "docs", "url": "https://example.com/docs"}
        ]"#;
        let catalog = TargetCatalog::from_json_str(json, "inline").unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.iter().next().unwrap().id, "pricing");
    }

    #[test]
    fn parses_cli_pairs() {
        let target = Target::parse_pair("home=https://example.com/?a=b").unwrap();
        assert_eq!(target.id, "home");
        assert_eq!(target.url, "https://example.com/?a=b");

        assert!(matches!(
            Target::parse_pair("no-separator"),
            Err(CatalogError::MalformedPair(_))
        ));
    }
}
