//! Artifact loading.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ValidationError;
use crate::export::{EXAMPLES_FILE, MANIFEST_FILE, POLICIES_FILE, TEST_CASES_FILE, USE_CASES_FILE};
use crate::models::{DatasetExample, Policy, RunManifest, TestCase, UseCase};

/// The four collections of a persisted run, plus the manifest when present.
#[derive(Debug)]
pub struct DatasetArtifacts {
    pub use_cases: Vec<UseCase>,
    pub policies: Vec<Policy>,
    pub test_cases: Vec<TestCase>,
    pub examples: Vec<DatasetExample>,
    /// Older runs may predate the manifest; its absence is not an error.
    pub manifest: Option<RunManifest>,
}

#[derive(Deserialize)]
struct UseCasesFile {
    use_cases: Vec<UseCase>,
}

#[derive(Deserialize)]
struct PoliciesFile {
    policies: Vec<Policy>,
}

#[derive(Deserialize)]
struct TestCasesFile {
    test_cases: Vec<TestCase>,
}

#[derive(Deserialize)]
struct ExamplesFile {
    examples: Vec<DatasetExample>,
}

/// Loads a persisted dataset from `dir`.
///
/// Stops at the first missing collection file; a file that exists but does
/// not parse is a [`ValidationError::MalformedArtifact`].
pub fn load_dataset(dir: &Path) -> Result<DatasetArtifacts, ValidationError> {
    let use_cases: UseCasesFile = load_file(dir, USE_CASES_FILE)?;
    let policies: PoliciesFile = load_file(dir, POLICIES_FILE)?;
    let test_cases: TestCasesFile = load_file(dir, TEST_CASES_FILE)?;
    let examples: ExamplesFile = load_file(dir, EXAMPLES_FILE)?;

    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest = if manifest_path.exists() {
        Some(load_file(dir, MANIFEST_FILE)?)
    } else {
        None
    };

    Ok(DatasetArtifacts {
        use_cases: use_cases.use_cases,
        policies: policies.policies,
        test_cases: test_cases.test_cases,
        examples: examples.examples,
        manifest,
    })
}

fn load_file<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T, ValidationError> {
    let path = dir.join(name);
    if !path.exists() {
        return Err(ValidationError::MissingArtifact(path.display().to_string()));
    }
    let text = fs::read_to_string(&path)?;
    serde_json::from_str(&text).map_err(|e| ValidationError::MalformedArtifact {
        file: name.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::export::DatasetWriter;
    use crate::models::{DialogFormat, DialogMessage, Evidence, InputData};

    fn seed_dataset(dir: &Path) {
        let writer = DatasetWriter::new(dir).unwrap();
        let use_case = UseCase::new(
            "uc_001",
            "Order status",
            "The user asks where an order is.",
            vec![Evidence::new("rules.md", 1, 1, "quote").unwrap()],
        )
        .unwrap();
        let example = DatasetExample::new(
            "ex_001_single_turn_qa_000_deadbeef",
            "support_bot",
            DialogFormat::SingleTurnQa,
            "uc_001",
            "tc_001_single_turn_qa_000",
            InputData::new(vec![DialogMessage::user("q")], None).unwrap(),
            "a",
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec!["pol_001".to_string()],
            BTreeMap::new(),
        )
        .unwrap();
        writer
            .write_collections(&[use_case], &[], &[], &[example])
            .unwrap();
    }

    #[test]
    fn round_trips_what_the_writer_wrote() {
        let dir = tempfile::tempdir().unwrap();
        seed_dataset(dir.path());

        let artifacts = load_dataset(dir.path()).unwrap();
        assert_eq!(artifacts.use_cases.len(), 1);
        assert_eq!(artifacts.examples[0].format, DialogFormat::SingleTurnQa);
        assert!(artifacts.manifest.is_none());
    }

    #[test]
    fn missing_file_stops_the_load_early() {
        let dir = tempfile::tempdir().unwrap();
        seed_dataset(dir.path());
        std::fs::remove_file(dir.path().join(POLICIES_FILE)).unwrap();

        let err = load_dataset(dir.path()).unwrap_err();
        match err {
            ValidationError::MissingArtifact(path) => assert!(path.contains("policies.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_file_names_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        seed_dataset(dir.path());
        std::fs::write(dir.path().join(EXAMPLES_FILE), "{ not json").unwrap();

        let err = load_dataset(dir.path()).unwrap_err();
        match err {
            ValidationError::MalformedArtifact { file, .. } => assert_eq!(file, "examples.json"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
