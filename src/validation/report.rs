//! Human-readable validation report.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::ValidationError;

use super::integrity::{check_referential_integrity, check_schemas};
use super::loader::load_dataset;

/// Outcome of validating one persisted dataset.
#[derive(Debug)]
pub struct ValidationReport {
    pub use_cases: usize,
    pub policies: usize,
    pub test_cases: usize,
    pub examples: usize,
    pub schema_violations: Vec<String>,
    pub integrity_violations: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.schema_violations.is_empty() && self.integrity_violations.is_empty()
    }

    /// Renders the report for terminal output.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Dataset validation");
        let _ = writeln!(
            out,
            "  {} use cases, {} policies, {} test cases, {} examples",
            self.use_cases, self.policies, self.test_cases, self.examples
        );

        if self.is_clean() {
            let _ = writeln!(out, "  OK: all checks passed");
            return out;
        }

        if !self.schema_violations.is_empty() {
            let _ = writeln!(out, "  Schema violations ({}):", self.schema_violations.len());
            for violation in &self.schema_violations {
                let _ = writeln!(out, "    - {violation}");
            }
        }
        if !self.integrity_violations.is_empty() {
            let _ = writeln!(
                out,
                "  Integrity violations ({}):",
                self.integrity_violations.len()
            );
            for violation in &self.integrity_violations {
                let _ = writeln!(out, "    - {violation}");
            }
        }
        out
    }
}

/// Loads a dataset from `dir` and runs every check.
pub fn validate_dataset(dir: &Path) -> Result<ValidationReport, ValidationError> {
    let artifacts = load_dataset(dir)?;
    Ok(ValidationReport {
        use_cases: artifacts.use_cases.len(),
        policies: artifacts.policies.len(),
        test_cases: artifacts.test_cases.len(),
        examples: artifacts.examples.len(),
        schema_violations: check_schemas(&artifacts),
        integrity_violations: check_referential_integrity(&artifacts),
    })
}
