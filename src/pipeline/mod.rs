//! End-to-end run orchestration.
//!
//! [`Pipeline`] takes a requirements document from disk to a persisted
//! dataset directory: extraction, per-use-case generation, coverage
//! enforcement, quality reporting, and export. [`PipelineConfig`] is the
//! one knob surface the CLI maps onto.

pub mod config;
pub mod runner;

pub use config::{PipelineConfig, DEFAULT_MIN_TEST_CASES, DEFAULT_SEED};
pub use runner::{Pipeline, RunSummary};
