//! Progress reporting abstraction for capture runs
//!
//! Defines the `ProgressReporter` trait for lifecycle event reporting,
//! a console implementation built on `log`, and a no-op implementation.

use log::{error, info, warn};

use super::crawl_types::{CaptureResult, RunState};
use crate::catalog::Target;

/// Trait for reporting run progress at key lifecycle events
///
/// Implementations can send updates to channels, log to console, update UI, etc.
/// Positions are 1-based.
pub trait ProgressReporter: Send + Sync {
    /// Report a driver state transition
    fn report_state(&self, state: RunState);

    /// Report that a target is about to be captured
    fn report_target_started(&self, position: usize, total: usize, target: &Target);

    /// Report a finished target, successful or not
    fn report_target_finished(&self, position: usize, total: usize, result: &CaptureResult);

    /// Report that remaining targets are skipped after cancellation
    fn report_cancelled(&self, skipped: usize);

    /// Report an error outside any single target (launch, close, manifest)
    fn report_error(&self, error: &str);
}

/// Progress reporter that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_state(&self, _state: RunState) {}

    #[inline(always)]
    fn report_target_started(&self, _position: usize, _total: usize, _target: &Target) {}

    #[inline(always)]
    fn report_target_finished(&self, _position: usize, _total: usize, _result: &CaptureResult) {}

    #[inline(always)]
    fn report_cancelled(&self, _skipped: usize) {}

    #[inline(always)]
    fn report_error(&self, _error: &str) {}
}

/// Console progress: one line per target start and finish
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report_state(&self, state: RunState) {
        match state {
            RunState::SessionLaunching => info!("Launching browser"),
            RunState::Iterating => info!("Browser ready"),
            RunState::SessionClosing => info!("Closing browser"),
            _ => {}
        }
    }

    fn report_target_started(&self, position: usize, total: usize, target: &Target) {
        info!("[{position}/{total}] Capturing {} ({})", target.id, target.url);
    }

    fn report_target_finished(&self, position: usize, total: usize, result: &CaptureResult) {
        let secs = result.elapsed.as_secs_f64();
        match result.reason() {
            None => info!("[{position}/{total}] {} captured in {secs:.1}s", result.target_id),
            Some(reason) => warn!(
                "[{position}/{total}] {} failed after {secs:.1}s: {reason}",
                result.target_id
            ),
        }
    }

    fn report_cancelled(&self, skipped: usize) {
        warn!("Run cancelled, {skipped} target(s) skipped");
    }

    fn report_error(&self, error: &str) {
        error!("{error}");
    }
}
