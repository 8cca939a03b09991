//! End-to-end generation run.
//!
//! One run walks six numbered steps: read the document, extract use cases,
//! extract policies (with evidence checking over both), generate per use
//! case through the orchestrator, enforce coverage, then report quality and
//! export. Artifacts accumulate across use cases; the first hard error
//! aborts the run.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::export::DatasetWriter;
use crate::extraction::{check_evidence, RequirementsExtractor, SourceDocument};
use crate::generation::{builtin_backends, enforce_coverage, AxisConfig, Orchestrator};
use crate::llm::LlmProvider;
use crate::models::{
    ArtifactCounts, DatasetExample, LlmSettings, Policy, RunManifest, TestCase, UseCase,
};
use crate::quality::{analyze_examples, QualityReport};

use super::config::PipelineConfig;

/// Everything a completed run leaves behind in memory.
#[derive(Debug)]
pub struct RunSummary {
    pub manifest: RunManifest,
    pub evidence_warnings: Vec<String>,
    pub coverage_warnings: Vec<String>,
    pub quality: QualityReport,
}

/// Drives one document through extraction, generation, and export.
pub struct Pipeline {
    provider: Arc<dyn LlmProvider>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn LlmProvider>, config: PipelineConfig) -> Self {
        Self { provider, config }
    }

    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        info!(input = %self.config.input_path.display(), "Step 1/6: reading source document");
        let document = SourceDocument::read(&self.config.input_path)?;

        info!("Step 2/6: extracting use cases");
        let extractor =
            RequirementsExtractor::new(self.provider.clone(), self.config.model.clone());
        let use_cases = extractor.extract_use_cases(&document).await?;

        info!("Step 3/6: extracting policies");
        let policies = extractor.extract_policies(&document).await?;
        let evidence_warnings = check_all_evidence(&document, &use_cases, &policies);

        info!(
            use_cases = use_cases.len(),
            policies = policies.len(),
            "Step 4/6: generating test cases and examples"
        );
        let orchestrator = Orchestrator::new(
            self.provider.as_ref(),
            self.config.model.clone(),
            AxisConfig::builtin(),
            builtin_backends(),
            self.config.min_test_cases,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut test_cases: Vec<TestCase> = Vec::new();
        let mut examples: Vec<DatasetExample> = Vec::new();
        let mut backends_used: BTreeSet<String> = BTreeSet::new();

        for use_case in &use_cases {
            let artifacts = orchestrator
                .generate_for_use_case(use_case, &policies, &mut rng)
                .await?;
            test_cases.extend(artifacts.test_cases);
            examples.extend(artifacts.examples);
            backends_used.extend(artifacts.backends_used);
        }

        info!("Step 5/6: enforcing coverage");
        let mut coverage_warnings = Vec::new();
        for use_case in &use_cases {
            coverage_warnings.extend(enforce_coverage(
                &use_case.id,
                &test_cases,
                &examples,
                self.config.min_test_cases,
            )?);
        }

        info!(out_dir = %self.config.out_dir.display(), "Step 6/6: writing artifacts");
        let quality = analyze_examples(&examples);
        info!("{}", quality.render());

        let manifest = RunManifest::new(
            self.config.input_path.display().to_string(),
            self.config.out_dir.display().to_string(),
            self.config.seed,
            LlmSettings {
                provider: "openai".to_string(),
                model: self.config.model.model.clone(),
                temperature: self.config.model.temperature,
            },
            backends_used.into_iter().collect(),
            ArtifactCounts {
                use_cases: use_cases.len(),
                policies: policies.len(),
                test_cases: test_cases.len(),
                examples: examples.len(),
            },
        );

        let writer = DatasetWriter::new(&self.config.out_dir)?;
        writer.write_collections(&use_cases, &policies, &test_cases, &examples)?;
        writer.write_manifest(&manifest)?;

        Ok(RunSummary {
            manifest,
            evidence_warnings,
            coverage_warnings,
            quality,
        })
    }
}

/// Checks every evidence citation of both extractions; mismatches are
/// warnings only.
fn check_all_evidence(
    document: &SourceDocument,
    use_cases: &[UseCase],
    policies: &[Policy],
) -> Vec<String> {
    let mut warnings = Vec::new();
    let cited = use_cases
        .iter()
        .flat_map(|uc| uc.evidence.iter().map(move |e| (uc.id.as_str(), e)))
        .chain(
            policies
                .iter()
                .flat_map(|p| p.evidence.iter().map(move |e| (p.id.as_str(), e))),
        );
    for (owner, evidence) in cited {
        if let Some(problem) = check_evidence(document, evidence) {
            warn!(entity = owner, "{problem}");
            warnings.push(format!("{owner}: {problem}"));
        }
    }
    warnings
}
