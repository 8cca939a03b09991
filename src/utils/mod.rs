//! Shared utility functions for evalforge.
//!
//! This module provides common utilities used across multiple modules:
//! JSON extraction from LLM replies and fuzzy string similarity for
//! evidence checking.

pub mod fuzzy;
pub mod json_extraction;

pub use fuzzy::similarity_ratio;
pub use json_extraction::{
    extract_json_from_reply, find_matching_brace, find_matching_bracket,
};
