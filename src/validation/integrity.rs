//! Schema re-checks and existence-based referential integrity.

use std::collections::BTreeSet;

use crate::generation::engines::FALLBACK_POLICY_ID;

use super::loader::DatasetArtifacts;

/// Re-runs the structural invariants over every loaded entity.
pub fn check_schemas(artifacts: &DatasetArtifacts) -> Vec<String> {
    let mut violations = Vec::new();

    for uc in &artifacts.use_cases {
        if let Err(err) = uc.validate() {
            violations.push(format!("use case '{}': {err}", uc.id));
        }
    }
    for policy in &artifacts.policies {
        if let Err(err) = policy.validate() {
            violations.push(format!("policy '{}': {err}", policy.id));
        }
    }
    for tc in &artifacts.test_cases {
        if let Err(err) = tc.validate() {
            violations.push(format!("test case '{}': {err}", tc.id));
        }
    }
    for ex in &artifacts.examples {
        if let Err(err) = ex.validate() {
            violations.push(format!("example '{}': {err}", ex.id));
        }
    }
    violations
}

/// Checks every cross-reference against the loaded collections.
///
/// The `pol_unknown` sentinel marks an example whose policy linkage was
/// unrecoverable at generation time; it is self-describing and exempt from
/// the existence check.
pub fn check_referential_integrity(artifacts: &DatasetArtifacts) -> Vec<String> {
    let use_case_ids: BTreeSet<&str> =
        artifacts.use_cases.iter().map(|uc| uc.id.as_str()).collect();
    let policy_ids: BTreeSet<&str> =
        artifacts.policies.iter().map(|p| p.id.as_str()).collect();
    let test_case_ids: BTreeSet<&str> =
        artifacts.test_cases.iter().map(|tc| tc.id.as_str()).collect();

    let mut violations = Vec::new();

    for tc in &artifacts.test_cases {
        if !use_case_ids.contains(tc.use_case_id.as_str()) {
            violations.push(format!(
                "test case '{}' references unknown use case '{}'",
                tc.id, tc.use_case_id
            ));
        }
        for pol in &tc.policy_ids {
            if pol != FALLBACK_POLICY_ID && !policy_ids.contains(pol.as_str()) {
                violations.push(format!(
                    "test case '{}' references unknown policy '{pol}'",
                    tc.id
                ));
            }
        }
    }

    for ex in &artifacts.examples {
        if !use_case_ids.contains(ex.use_case_id.as_str()) {
            violations.push(format!(
                "example '{}' references unknown use case '{}'",
                ex.id, ex.use_case_id
            ));
        }
        if !test_case_ids.contains(ex.test_case_id.as_str()) {
            violations.push(format!(
                "example '{}' references unknown test case '{}'",
                ex.id, ex.test_case_id
            ));
        }
        for pol in &ex.policy_ids {
            if pol != FALLBACK_POLICY_ID && !policy_ids.contains(pol.as_str()) {
                violations.push(format!(
                    "example '{}' references unknown policy '{pol}'",
                    ex.id
                ));
            }
        }
    }

    violations
}
