//! Configuration module for capture runs
//!
//! This module provides the `CaptureConfig` struct and its type-safe builder
//! for configuring a run with validation and sensible defaults.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::{CaptureConfigBuilder, WithCatalog, WithOutputRoot};
pub use types::{CaptureConfig, ConfigSummary, SettleStrategy};
