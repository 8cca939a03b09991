//! LLM prompts for extraction, generation, and backend routing.
//!
//! Prompt text is opaque content as far as the pipeline is concerned: each
//! builder takes structured inputs and returns the user prompt string for
//! one call. The submodules mirror the pipeline stages:
//!
//! - [`extraction`] - use-case and policy extraction from numbered documents
//! - [`generation`] - format adapters, last-resort generation, classification
//! - [`routing`] - synthesis-backend tool selection

pub mod extraction;
pub mod generation;
pub mod routing;

pub use extraction::{
    build_policy_prompt, build_use_case_prompt, POLICY_EXTRACTION_SYSTEM,
    USE_CASE_EXTRACTION_SYSTEM,
};
pub use generation::{
    build_case_detection_prompt, build_example_prompt, build_fallback_prompt,
    build_source_kind_prompt, CASE_DETECTION_SYSTEM, EXAMPLE_GENERATION_SYSTEM,
    FALLBACK_GENERATION_SYSTEM, SOURCE_KIND_SYSTEM,
};
pub use routing::{build_routing_prompt, ROUTING_SYSTEM};
