//! Requirements extraction from natural-language source documents.
//!
//! A source document is read and line-numbered ([`markdown`]), two structured
//! LLM calls pull use cases and policies out of it ([`extractor`]), and every
//! cited evidence span is checked against the actual source text
//! ([`evidence`]). Evidence mismatches are warnings, never errors: a sloppy
//! citation should not discard an otherwise good extraction.

pub mod evidence;
pub mod extractor;
pub mod markdown;

pub use evidence::{check_evidence, EVIDENCE_SIMILARITY_THRESHOLD};
pub use extractor::RequirementsExtractor;
pub use markdown::SourceDocument;
