//! CLI command definitions.
//!
//! Two subcommands: `generate` forges a dataset from a requirements
//! document, `validate` re-checks a persisted dataset directory.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use crate::llm::{ChatClient, ModelConfig};
use crate::pipeline::{Pipeline, PipelineConfig, DEFAULT_MIN_TEST_CASES, DEFAULT_SEED};
use crate::validation::validate_dataset;

/// Default model when neither the flag nor `OPENAI_MODEL` is set.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default output directory for generated datasets.
const DEFAULT_OUTPUT_DIR: &str = "./forged-dataset";

/// Requirements-to-dataset forge for support-assistant evaluation.
#[derive(Parser)]
#[command(name = "evalforge")]
#[command(about = "Forge labeled evaluation datasets from requirements documents")]
#[command(version)]
#[command(
    long_about = "evalforge extracts use cases and policies from a markdown requirements \
document via LLM calls, then synthesizes a labeled evaluation dataset with pairwise \
parameter variations.\n\nExample usage:\n  evalforge generate --input rules.md --output ./forged-dataset"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Forge a dataset from a markdown requirements document.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Validate a previously forged dataset directory.
    Validate(ValidateArgs),
}

/// Arguments for the generate command.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Markdown requirements document to forge from.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory the dataset collections are written to.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Model identifier for every structured call.
    #[arg(short, long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Sampling temperature.
    #[arg(long, default_value_t = 0.0)]
    pub temperature: f64,

    /// Run seed for reproducible variation padding.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Minimum test cases per use case.
    #[arg(long, default_value_t = DEFAULT_MIN_TEST_CASES)]
    pub min_test_cases: usize,
}

/// Arguments for the validate command.
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Dataset directory to validate.
    #[arg(short, long)]
    pub dir: PathBuf,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the parsed CLI command.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => run_generate(args).await,
        Commands::Validate(args) => run_validate(args),
    }
}

async fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let client = ChatClient::from_env()?;
    let model = ModelConfig {
        model: args.model,
        temperature: args.temperature,
        seed: Some(args.seed),
    };
    let config = PipelineConfig::new(args.input, args.output)
        .with_seed(args.seed)
        .with_min_test_cases(args.min_test_cases)
        .with_model(model);

    let summary = Pipeline::new(Arc::new(client), config).run().await?;

    for warning in &summary.evidence_warnings {
        warn!("evidence: {warning}");
    }
    for warning in &summary.coverage_warnings {
        warn!("coverage: {warning}");
    }
    let counts = &summary.manifest.counts;
    info!(
        use_cases = counts.use_cases,
        policies = counts.policies,
        test_cases = counts.test_cases,
        examples = counts.examples,
        "Forge run complete"
    );
    println!(
        "Forged {} test cases and {} examples from {} use cases into {}",
        counts.test_cases, counts.examples, counts.use_cases, summary.manifest.output_path
    );
    Ok(())
}

fn run_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let report = validate_dataset(&args.dir)?;
    print!("{}", report.render());
    if !report.is_clean() {
        anyhow::bail!(
            "validation failed: {} schema and {} integrity violations",
            report.schema_violations.len(),
            report.integrity_violations.len()
        );
    }
    Ok(())
}
