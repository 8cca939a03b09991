//! Run configuration.

use std::path::PathBuf;

use crate::llm::ModelConfig;

/// Default minimum number of test cases per use case.
pub const DEFAULT_MIN_TEST_CASES: usize = 3;

/// Default run seed.
pub const DEFAULT_SEED: u64 = 42;

/// Configuration for one end-to-end generation run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Markdown requirements document to forge from.
    pub input_path: PathBuf,
    /// Directory the artifact collections land in.
    pub out_dir: PathBuf,
    /// Seed for variation padding and (where supported) sampling.
    pub seed: u64,
    /// Coverage floor per use case.
    pub min_test_cases: usize,
    /// Model and sampling settings for every structured call.
    pub model: ModelConfig,
}

impl PipelineConfig {
    pub fn new(input_path: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            out_dir: out_dir.into(),
            seed: DEFAULT_SEED,
            min_test_cases: DEFAULT_MIN_TEST_CASES,
            model: ModelConfig::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_min_test_cases(mut self, min: usize) -> Self {
        self.min_test_cases = min;
        self
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }
}
