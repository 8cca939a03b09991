//! JSON artifact writer.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::error::ExportError;
use crate::models::{DatasetExample, Policy, RunManifest, TestCase, UseCase};

pub const USE_CASES_FILE: &str = "use_cases.json";
pub const POLICIES_FILE: &str = "policies.json";
pub const TEST_CASES_FILE: &str = "test_cases.json";
pub const EXAMPLES_FILE: &str = "examples.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Writes a run's artifacts into one output directory.
pub struct DatasetWriter {
    out_dir: PathBuf,
}

impl DatasetWriter {
    /// Creates the output directory if needed.
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)
            .map_err(|_| ExportError::OutputDirFailed(out_dir.display().to_string()))?;
        Ok(Self { out_dir })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Writes the four keyed collections.
    pub fn write_collections(
        &self,
        use_cases: &[UseCase],
        policies: &[Policy],
        test_cases: &[TestCase],
        examples: &[DatasetExample],
    ) -> Result<(), ExportError> {
        self.write_file(USE_CASES_FILE, &json!({ "use_cases": use_cases }))?;
        self.write_file(POLICIES_FILE, &json!({ "policies": policies }))?;
        self.write_file(TEST_CASES_FILE, &json!({ "test_cases": test_cases }))?;
        self.write_file(EXAMPLES_FILE, &json!({ "examples": examples }))?;
        info!(
            out_dir = %self.out_dir.display(),
            use_cases = use_cases.len(),
            policies = policies.len(),
            test_cases = test_cases.len(),
            examples = examples.len(),
            "Wrote dataset collections"
        );
        Ok(())
    }

    /// Writes `manifest.json` beside the collections.
    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<(), ExportError> {
        self.write_file(MANIFEST_FILE, manifest)
    }

    fn write_file<T: Serialize>(&self, name: &str, value: &T) -> Result<(), ExportError> {
        let mut rendered = serde_json::to_string_pretty(value)?;
        rendered.push('\n');
        fs::write(self.out_dir.join(name), rendered)?;
        Ok(())
    }
}
