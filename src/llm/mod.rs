//! LLM client layer for evalforge.
//!
//! Provides the OpenAI-compatible chat client, the retry wrapper that handles
//! rate-limit backoff at the call boundary, structured-generation helpers that
//! parse JSON replies into typed values, and the tool-routing call used to
//! select synthesis backends.

pub mod client;
pub mod retry;
pub mod structured;
pub mod tools;

pub use client::{
    ChatClient, Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, ModelConfig,
    Usage,
};
pub use retry::generate_with_retry;
pub use structured::{generate_structured, generate_text};
pub use tools::{route_tools, ToolInvocation, ToolSpec};
