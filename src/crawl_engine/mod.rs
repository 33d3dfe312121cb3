//! Crawl Engine Module
//!
//! The sequential capture pipeline: the driver owns the browser session and
//! walks the catalog, the page capture unit handles one target at a time,
//! and every per-target failure is isolated into a result record.

// Sub-modules
pub mod cancel;
pub mod crawl_types;
pub mod isolate;
pub mod orchestrator;
pub mod page_capture;
pub mod progress;

pub use cancel::CancelSignal;
pub use crawl_types::{
    CaptureError, CaptureOutcome, CaptureResult, FailureKind, RunError, RunState,
};
pub use isolate::{Isolated, isolate_and_collect, isolate_and_collect_while};
pub use orchestrator::{CrawlDriver, RunReport};
pub use page_capture::PageCapture;
pub use progress::{LogProgress, NoOpProgress, ProgressReporter};
