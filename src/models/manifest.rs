//! Run manifest written next to the exported dataset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// LLM configuration a run was executed with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub temperature: f64,
}

/// Counts of the four artifact collections produced by a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ArtifactCounts {
    pub use_cases: usize,
    pub policies: usize,
    pub test_cases: usize,
    pub examples: usize,
}

/// Everything needed to reproduce or audit a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub input_path: String,
    pub output_path: String,
    pub seed: u64,
    pub created_at: DateTime<Utc>,
    pub generator_version: String,
    pub llm: LlmSettings,
    /// Names of the synthesis backends that actually contributed rows.
    pub backends_used: Vec<String>,
    pub counts: ArtifactCounts,
}

impl RunManifest {
    pub fn new(
        input_path: impl Into<String>,
        output_path: impl Into<String>,
        seed: u64,
        llm: LlmSettings,
        backends_used: Vec<String>,
        counts: ArtifactCounts,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            seed,
            created_at: Utc::now(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            llm,
            backends_used,
            counts,
        }
    }
}
