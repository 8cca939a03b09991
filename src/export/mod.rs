//! Dataset artifact export.
//!
//! A run persists four keyed JSON collections plus a manifest into one
//! output directory. Files are pretty-printed with a trailing newline so
//! they diff cleanly across runs.

mod writer;

pub use writer::{
    DatasetWriter, EXAMPLES_FILE, MANIFEST_FILE, POLICIES_FILE, TEST_CASES_FILE, USE_CASES_FILE,
};
