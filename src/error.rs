//! Error types for evalforge operations.
//!
//! Defines error types for all major subsystems:
//! - Schema/model construction invariants
//! - Requirements extraction from source documents
//! - Variation routing and dataset generation
//! - Coverage enforcement
//! - LLM API interactions
//! - Dataset validation and export

use thiserror::Error;

/// Errors raised when a canonical entity would violate a structural invariant.
///
/// These indicate a generation-path bug and are never caught or softened:
/// no code path is allowed to construct an invalid entity.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid id '{id}': expected prefix '{prefix}'")]
    InvalidIdPrefix { prefix: &'static str, id: String },

    #[error("Entity '{0}' requires at least one evidence citation")]
    EmptyEvidence(String),

    #[error("Invalid evidence line range: start {start}, end {end} (start must be >= 1 and end >= start)")]
    InvalidLineRange { start: usize, end: usize },

    #[error("Evidence quote must not be empty")]
    EmptyQuote,

    #[error("Test case '{id}' has {count} variation axes, expected 2 or 3")]
    AxisCardinality { id: String, count: usize },

    #[error("Example '{id}' has {count} evaluation criteria, minimum is 3")]
    TooFewCriteria { id: String, count: usize },

    #[error("Example '{id}' references no policies, minimum is 1")]
    EmptyPolicyIds { id: String },

    #[error("Input requires at least one message")]
    EmptyMessages,

    #[error("target_message_index {index} out of range for {len} messages")]
    TargetIndexOutOfRange { index: usize, len: usize },

    #[error("target_message_index {index} points at role '{role}', expected 'operator'")]
    TargetIndexNotOperator { index: usize, role: String },

    #[error("Unknown policy kind '{0}': must be 'must', 'must_not', 'escalate', 'style', or 'format'")]
    UnknownPolicyKind(String),

    #[error("Unknown dialog format '{0}'")]
    UnknownFormat(String),

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: OPENAI_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while extracting requirements from a source document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Source document '{0}' is empty")]
    EmptyDocument(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid extracted entity: {0}")]
    Model(#[from] ModelError),

    #[error("Extraction reply missing required field '{0}'")]
    MissingField(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during test-case and example generation.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid generated entity: {0}")]
    Model(#[from] ModelError),

    #[error("Example violates format '{format}' shape rules: {violations:?}")]
    FormatViolation {
        format: String,
        violations: Vec<String>,
    },

    #[error("Backend '{backend}' failed: {message}")]
    BackendFailed { backend: String, message: String },

    #[error("Last-resort generator failed for use case '{use_case_id}': {message}")]
    FallbackFailed {
        use_case_id: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during coverage enforcement.
#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("Use case '{use_case_id}' produced {got} test cases, minimum is {min}")]
    BelowMinimum {
        use_case_id: String,
        got: usize,
        min: usize,
    },
}

/// Errors that can occur while validating a persisted dataset.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing artifact file: {0}")]
    MissingArtifact(String),

    #[error("Artifact '{file}' has unexpected shape: {reason}")]
    MalformedArtifact { file: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Umbrella error for an end-to-end pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Coverage check failed: {0}")]
    Coverage(#[from] CoverageError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while writing dataset artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Output directory '{0}' could not be created")]
    OutputDirFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
