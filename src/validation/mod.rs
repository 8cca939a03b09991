//! Persisted-dataset validation.
//!
//! Loads the four JSON collections back from an output directory, re-checks
//! every entity against the schema invariants, and verifies referential
//! integrity by existence: every cross-reference must resolve against the
//! loaded collections. Violations are report strings, never errors; only a
//! missing or unreadable artifact fails the load itself.

mod integrity;
mod loader;
mod report;

pub use integrity::{check_referential_integrity, check_schemas};
pub use loader::{load_dataset, DatasetArtifacts};
pub use report::{validate_dataset, ValidationReport};
