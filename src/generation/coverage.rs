//! Per-use-case coverage enforcement.
//!
//! Run-time gate applied after all generation tiers: a use case that still
//! holds fewer than the configured minimum of test cases fails the run.
//! Structural drift that does not reduce coverage (an example pointing at a
//! test case this gate has not seen, a test case with no example yet) is
//! reported as warnings; the persisted-dataset validator is the strict
//! authority on referential integrity.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::CoverageError;
use crate::models::{DatasetExample, TestCase};

/// Checks one use case's final artifact set against `min` test cases.
///
/// Returns advisory warnings on success.
pub fn enforce_coverage(
    use_case_id: &str,
    test_cases: &[TestCase],
    examples: &[DatasetExample],
    min: usize,
) -> Result<Vec<String>, CoverageError> {
    let owned: Vec<&TestCase> = test_cases
        .iter()
        .filter(|tc| tc.use_case_id == use_case_id)
        .collect();

    if owned.len() < min {
        return Err(CoverageError::BelowMinimum {
            use_case_id: use_case_id.to_string(),
            got: owned.len(),
            min,
        });
    }

    let mut warnings = Vec::new();
    let expected_prefix = format!("tc_{}_", use_case_id.trim_start_matches("uc_"));
    let known_ids: BTreeSet<&str> = owned.iter().map(|tc| tc.id.as_str()).collect();
    let covered: BTreeSet<&str> = examples
        .iter()
        .filter(|ex| ex.use_case_id == use_case_id)
        .map(|ex| ex.test_case_id.as_str())
        .collect();

    for tc in &owned {
        if !tc.id.starts_with(&expected_prefix) {
            warnings.push(format!(
                "test case '{}' does not carry the '{expected_prefix}' id prefix of its use case",
                tc.id
            ));
        }
        if !covered.contains(tc.id.as_str()) {
            warnings.push(format!("test case '{}' has no example", tc.id));
        }
    }

    for ex in examples.iter().filter(|ex| ex.use_case_id == use_case_id) {
        if !known_ids.contains(ex.test_case_id.as_str()) {
            warnings.push(format!(
                "example '{}' references unknown test case '{}'",
                ex.id, ex.test_case_id
            ));
        }
    }

    for warning in &warnings {
        warn!(use_case = use_case_id, "{warning}");
    }
    Ok(warnings)
}
