//! Structured-generation helpers.
//!
//! One call, one typed value: a system/user prompt pair goes out, the JSON
//! payload of the reply is extracted and deserialized into the target type.
//! Rate limits are retried underneath; malformed replies surface as
//! `LlmError::ParseError`.

use serde::de::DeserializeOwned;

use crate::error::LlmError;
use crate::llm::client::{GenerationRequest, LlmProvider, Message, ModelConfig};
use crate::llm::retry::generate_with_retry;
use crate::utils::extract_json_from_reply;

/// Issues one structured call and parses the JSON reply into `T`.
pub async fn generate_structured<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    config: &ModelConfig,
    system: &str,
    user: &str,
) -> Result<T, LlmError> {
    let content = generate_text(provider, config, system, user).await?;

    let json = extract_json_from_reply(&content)
        .map_err(|e| LlmError::ParseError(format!("No JSON in reply: {}", e)))?;

    serde_json::from_str(&json)
        .map_err(|e| LlmError::ParseError(format!("Reply did not match schema: {}", e)))
}

/// Issues one call and returns the raw reply text.
pub async fn generate_text(
    provider: &dyn LlmProvider,
    config: &ModelConfig,
    system: &str,
    user: &str,
) -> Result<String, LlmError> {
    let request = GenerationRequest::with_config(
        config,
        vec![Message::system(system), Message::user(user)],
    );

    let response = generate_with_retry(provider, request).await?;
    response
        .first_content()
        .map(|s| s.to_string())
        .ok_or_else(|| LlmError::ParseError("No content in LLM response".to_string()))
}
