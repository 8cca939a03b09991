//! evalforge: requirements-to-dataset forge for LLM evaluation.
//!
//! This library extracts use cases and policies from natural-language
//! requirements documents and synthesizes labeled evaluation datasets with
//! pairwise parameter variations, multi-tier generation fallback, and
//! coverage enforcement.

pub mod cli;
pub mod error;
pub mod export;
pub mod extraction;
pub mod generation;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod quality;
pub mod utils;
pub mod validation;

// Re-export commonly used error types
pub use error::{
    CoverageError, ExportError, ExtractionError, GenerationError, LlmError, ModelError,
    PipelineError, ValidationError,
};
