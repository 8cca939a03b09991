//! Advisory dataset quality analysis.
//!
//! The quality report surfaces duplicates, suspicious placeholders, and
//! distribution skews for an operator to review. It never fails a run.

mod report;

pub use report::{analyze_examples, QualityReport};
