//! Core types for capture runs.
//!
//! Per-target failures are [`CaptureError`]s and always end up inside a
//! [`CaptureResult`]. Only [`RunError`] can abort a run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::Target;

/// A failure confined to one target
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Navigation (load plus network idle) exceeded its upper bound
    #[error("navigation to {url} timed out after {}s", timeout.as_secs_f64())]
    NavigationTimeout { url: String, timeout: Duration },

    /// DNS, connection, or protocol failure while navigating
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// Screenshot, text or DOM could not be read from the page
    #[error("{what} extraction failed: {message}")]
    Extraction { what: &'static str, message: String },

    /// The artifact store rejected a write
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled while this target was in progress
    #[error("capture cancelled")]
    Cancelled,
}

impl CaptureError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NavigationTimeout { .. } => FailureKind::NavigationTimeout,
            Self::Navigation { .. } => FailureKind::Navigation,
            Self::Extraction { .. } => FailureKind::Extraction,
            Self::Write { .. } => FailureKind::Write,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }

    pub(crate) fn extraction(what: &'static str, err: anyhow::Error) -> Self {
        // {:#} keeps the whole context chain
        Self::Extraction {
            what,
            message: format!("{err:#}"),
        }
    }
}

/// Coarse classification of a per-target failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NavigationTimeout,
    Navigation,
    Extraction,
    Write,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NavigationTimeout => "navigation timeout",
            Self::Navigation => "navigation error",
            Self::Extraction => "extraction error",
            Self::Write => "write error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Outcome of one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaptureOutcome {
    Success,
    Failure { kind: FailureKind, reason: String },
}

impl CaptureOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<&CaptureError> for CaptureOutcome {
    fn from(err: &CaptureError) -> Self {
        Self::Failure {
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

/// Recorded once per attempted target, never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub target_id: String,
    pub url: String,
    #[serde(flatten)]
    pub outcome: CaptureOutcome,
    #[serde(with = "crate::utils::serde_millis")]
    pub elapsed: Duration,
}

impl CaptureResult {
    /// Record an attempt at `target` that took `elapsed`
    #[must_use]
    pub fn from_attempt(target: &Target, error: Option<&CaptureError>, elapsed: Duration) -> Self {
        Self {
            target_id: target.id.clone(),
            url: target.url.clone(),
            outcome: error.map_or(CaptureOutcome::Success, CaptureOutcome::from),
            elapsed,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Failure reason, if any
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match &self.outcome {
            CaptureOutcome::Success => None,
            CaptureOutcome::Failure { reason, .. } => Some(reason),
        }
    }

    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            CaptureOutcome::Success => None,
            CaptureOutcome::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Lifecycle of one driver run
///
/// ```text
/// NotStarted -> SessionLaunching -> Iterating -> SessionClosing -> Done
///                      |
///                      +-> LaunchFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    SessionLaunching,
    Iterating,
    SessionClosing,
    Done,
    LaunchFailed,
}

impl RunState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::LaunchFailed)
    }

    /// Whether `self -> next` is an allowed transition
    #[must_use]
    pub fn can_advance_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::SessionLaunching)
                | (Self::SessionLaunching, Self::Iterating)
                | (Self::SessionLaunching, Self::LaunchFailed)
                | (Self::Iterating, Self::SessionClosing)
                | (Self::SessionClosing, Self::Done)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "not started",
            Self::SessionLaunching => "launching session",
            Self::Iterating => "iterating",
            Self::SessionClosing => "closing session",
            Self::Done => "done",
            Self::LaunchFailed => "launch failed",
        };
        f.write_str(label)
    }
}

/// Errors that end a run
#[derive(Debug, Error)]
pub enum RunError {
    /// The browser (or its page context) could not be started; nothing was attempted
    #[error("browser session failed to launch: {0}")]
    LaunchFailed(String),

    /// Something outside per-target isolation broke, e.g. a panic in the loop
    #[error("crawl driver failed: {0}")]
    Driver(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_outcome_carries_kind_and_reason() {
        let err = CaptureError::NavigationTimeout {
            url: "https://example.com/".into(),
            timeout: Duration::from_secs(60),
        };
        let outcome = CaptureOutcome::from(&err);
        assert_eq!(
            outcome,
            CaptureOutcome::Failure {
                kind: FailureKind::NavigationTimeout,
                reason: "navigation to https://example.com/ timed out after 60s".into(),
            }
        );
    }

    #[test]
    fn run_state_transitions_follow_lifecycle() {
        use RunState::*;
        assert!(NotStarted.can_advance_to(SessionLaunching));
        assert!(SessionLaunching.can_advance_to(LaunchFailed));
        assert!(SessionClosing.can_advance_to(Done));
        assert!(!NotStarted.can_advance_to(Iterating));
        assert!(!LaunchFailed.can_advance_to(SessionClosing));
        assert!(!Done.can_advance_to(NotStarted));
        assert!(Done.is_terminal() && LaunchFailed.is_terminal());
        assert!(!Iterating.is_terminal());
    }

    #[test]
    fn result_serializes_flat() {
        let result = CaptureResult {
            target_id: "home".into(),
            url: "https://example.com/".into(),
            outcome: CaptureOutcome::Failure {
                kind: FailureKind::Write,
                reason: "disk full".into(),
            },
            elapsed: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["kind"], "write");
        assert_eq!(json["reason"], "disk full");
        assert_eq!(json["elapsed"], 1500);
    }
}
