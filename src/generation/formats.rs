//! Format adapters: one generation strategy per interaction shape.
//!
//! The format set is closed ([`DialogFormat`]); dispatch goes through a
//! lookup from format to a static adapter implementing [`FormatAdapter`].
//! `generate_example` issues exactly one structured call and either returns
//! an example satisfying the format's shape rules or fails the call;
//! `validate_format` is the pure post-hoc re-check of those same rules.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GenerationError;
use crate::llm::{generate_structured, LlmProvider, ModelConfig};
use crate::models::{
    example_id, DatasetExample, DialogFormat, DialogMessage, InputData, Policy, UseCase,
    ROLE_OPERATOR, ROLE_USER,
};
use crate::prompts::{build_example_prompt, EXAMPLE_GENERATION_SYSTEM};

/// Everything an adapter needs to generate one example.
pub struct ExampleRequest<'a> {
    pub use_case: &'a UseCase,
    pub test_case_id: &'a str,
    pub case: &'a str,
    pub parameters: &'a BTreeMap<String, String>,
    pub policies: &'a [Policy],
}

/// Capability interface shared by the three generation strategies.
#[async_trait]
pub trait FormatAdapter: Send + Sync {
    /// Stable adapter name, used in logs and metadata.
    fn name(&self) -> &'static str;

    /// The format this adapter produces.
    fn format(&self) -> DialogFormat;

    /// Issues one structured generation call and returns a canonical
    /// example, or fails the call. No silent corruption: a reply that does
    /// not satisfy the format's shape rules is an error.
    async fn generate_example(
        &self,
        provider: &dyn LlmProvider,
        config: &ModelConfig,
        request: &ExampleRequest<'_>,
    ) -> Result<DatasetExample, GenerationError>;

    /// Pure structural re-check of this format's shape rules. Returns
    /// textual violations; never errors and makes no external calls.
    fn validate_format(&self, example: &DatasetExample) -> Vec<String>;
}

/// The adapter for a format, from the closed dispatch table.
pub fn adapter_for(format: DialogFormat) -> &'static dyn FormatAdapter {
    match format {
        DialogFormat::SingleTurnQa => &SingleTurnQaAdapter,
        DialogFormat::SingleUtteranceCorrection => &SingleUtteranceAdapter,
        DialogFormat::DialogLastTurnCorrection => &DialogCorrectionAdapter,
    }
}

/// Raw message row in a generation reply.
#[derive(Debug, Deserialize)]
struct RawMessage {
    role: String,
    content: String,
}

/// Raw generation reply, shared across formats.
#[derive(Debug, Deserialize)]
struct RawExample {
    #[serde(default)]
    messages: Vec<RawMessage>,
    #[serde(default)]
    expected_output: String,
    #[serde(default)]
    evaluation_criteria: Vec<String>,
    #[serde(default)]
    policy_ids: Vec<String>,
}

/// Renders the policies as a digest block for prompts.
pub(crate) fn policy_digest(policies: &[Policy]) -> String {
    if policies.is_empty() {
        return "(no policies extracted)".to_string();
    }
    policies
        .iter()
        .map(|p| format!("- {} ({}): {}", p.id, p.kind, p.statement))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a parameter assignment as generation constraints.
fn parameter_block(parameters: &BTreeMap<String, String>) -> String {
    parameters
        .iter()
        .map(|(axis, value)| format!("- {axis}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reply policy ids filtered to ones that exist; falls back to the first
/// extracted policy when the reply cites none that do.
pub(crate) fn resolve_policy_ids(raw: Vec<String>, policies: &[Policy]) -> Vec<String> {
    let mut resolved: Vec<String> = raw
        .into_iter()
        .filter(|id| policies.iter().any(|p| p.id == *id))
        .collect();
    resolved.dedup();

    if resolved.is_empty() {
        if let Some(first) = policies.first() {
            resolved.push(first.id.clone());
        } else {
            resolved.push("pol_unknown".to_string());
        }
    }
    resolved
}

fn generator_metadata(adapter: &'static str) -> BTreeMap<String, Value> {
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "generator".to_string(),
        Value::String(format!("format_adapter:{adapter}")),
    );
    metadata
}

/// One structured call shared by all adapters.
async fn generate_raw(
    provider: &dyn LlmProvider,
    config: &ModelConfig,
    request: &ExampleRequest<'_>,
    shape_instructions: &str,
) -> Result<RawExample, GenerationError> {
    let prompt = build_example_prompt(
        shape_instructions,
        &request.use_case.name,
        &request.use_case.description,
        &policy_digest(request.policies),
        &parameter_block(request.parameters),
    );
    let raw: RawExample =
        generate_structured(provider, config, EXAMPLE_GENERATION_SYSTEM, &prompt).await?;
    Ok(raw)
}

/// Builds the canonical example once the shape has been checked.
#[allow(clippy::too_many_arguments)]
fn build_example(
    adapter: &'static str,
    format: DialogFormat,
    request: &ExampleRequest<'_>,
    messages: Vec<DialogMessage>,
    target_message_index: Option<usize>,
    raw: RawExample,
) -> Result<DatasetExample, GenerationError> {
    let input = InputData::new(messages, target_message_index)?;
    let example = DatasetExample::new(
        example_id(request.test_case_id),
        request.case,
        format,
        &request.use_case.id,
        request.test_case_id,
        input,
        raw.expected_output,
        raw.evaluation_criteria,
        resolve_policy_ids(raw.policy_ids, request.policies),
        generator_metadata(adapter),
    )?;
    Ok(example)
}

fn shape_error(format: DialogFormat, violations: Vec<String>) -> GenerationError {
    GenerationError::FormatViolation {
        format: format.to_string(),
        violations,
    }
}

// ============================================================================
// single_turn_qa
// ============================================================================

/// One user question, one expected answer.
struct SingleTurnQaAdapter;

#[async_trait]
impl FormatAdapter for SingleTurnQaAdapter {
    fn name(&self) -> &'static str {
        "single_turn_qa"
    }

    fn format(&self) -> DialogFormat {
        DialogFormat::SingleTurnQa
    }

    async fn generate_example(
        &self,
        provider: &dyn LlmProvider,
        config: &ModelConfig,
        request: &ExampleRequest<'_>,
    ) -> Result<DatasetExample, GenerationError> {
        let raw = generate_raw(
            provider,
            config,
            request,
            "Exactly one message with role \"user\": the user's question. No other messages.",
        )
        .await?;

        let [message] = raw.messages.as_slice() else {
            return Err(shape_error(
                self.format(),
                vec![format!("expected exactly 1 message, got {}", raw.messages.len())],
            ));
        };
        if message.role != ROLE_USER {
            return Err(shape_error(
                self.format(),
                vec![format!("expected role 'user', got '{}'", message.role)],
            ));
        }

        let messages = vec![DialogMessage::user(message.content.clone())];
        build_example(self.name(), self.format(), request, messages, None, raw)
    }

    fn validate_format(&self, example: &DatasetExample) -> Vec<String> {
        let mut violations = Vec::new();
        let messages = &example.input.messages;
        if messages.len() != 1 {
            violations.push(format!("expected exactly 1 message, got {}", messages.len()));
        }
        if let Some(first) = messages.first() {
            if first.role != ROLE_USER {
                violations.push(format!("expected role 'user', got '{}'", first.role));
            }
        }
        if example.input.target_message_index.is_some() {
            violations.push("single_turn_qa must not set target_message_index".to_string());
        }
        violations
    }
}

// ============================================================================
// single_utterance_correction
// ============================================================================

/// One operator utterance to be corrected.
struct SingleUtteranceAdapter;

#[async_trait]
impl FormatAdapter for SingleUtteranceAdapter {
    fn name(&self) -> &'static str {
        "single_utterance_correction"
    }

    fn format(&self) -> DialogFormat {
        DialogFormat::SingleUtteranceCorrection
    }

    async fn generate_example(
        &self,
        provider: &dyn LlmProvider,
        config: &ModelConfig,
        request: &ExampleRequest<'_>,
    ) -> Result<DatasetExample, GenerationError> {
        let raw = generate_raw(
            provider,
            config,
            request,
            "Exactly one message with role \"operator\": a flawed operator utterance to be \
             corrected. The expected output is the corrected utterance.",
        )
        .await?;

        let [message] = raw.messages.as_slice() else {
            return Err(shape_error(
                self.format(),
                vec![format!("expected exactly 1 message, got {}", raw.messages.len())],
            ));
        };
        if message.role != ROLE_OPERATOR {
            return Err(shape_error(
                self.format(),
                vec![format!("expected role 'operator', got '{}'", message.role)],
            ));
        }

        let messages = vec![DialogMessage::operator(message.content.clone())];
        build_example(self.name(), self.format(), request, messages, Some(0), raw)
    }

    fn validate_format(&self, example: &DatasetExample) -> Vec<String> {
        let mut violations = Vec::new();
        let messages = &example.input.messages;
        if messages.len() != 1 {
            violations.push(format!("expected exactly 1 message, got {}", messages.len()));
        }
        if let Some(first) = messages.first() {
            if first.role != ROLE_OPERATOR {
                violations.push(format!("expected role 'operator', got '{}'", first.role));
            }
        }
        if example.input.target_message_index != Some(0) {
            violations.push(format!(
                "expected target_message_index 0, got {:?}",
                example.input.target_message_index
            ));
        }
        violations
    }
}

// ============================================================================
// dialog_last_turn_correction
// ============================================================================

/// A multi-turn dialog whose final operator turn is to be corrected.
struct DialogCorrectionAdapter;

#[async_trait]
impl FormatAdapter for DialogCorrectionAdapter {
    fn name(&self) -> &'static str {
        "dialog_last_turn_correction"
    }

    fn format(&self) -> DialogFormat {
        DialogFormat::DialogLastTurnCorrection
    }

    async fn generate_example(
        &self,
        provider: &dyn LlmProvider,
        config: &ModelConfig,
        request: &ExampleRequest<'_>,
    ) -> Result<DatasetExample, GenerationError> {
        let raw = generate_raw(
            provider,
            config,
            request,
            "At least two messages alternating roles \"user\" and \"operator\", ending with a \
             flawed operator turn to be corrected. The expected output is the corrected final \
             turn.",
        )
        .await?;

        let mut violations = Vec::new();
        if raw.messages.len() < 2 {
            violations.push(format!(
                "expected at least 2 messages, got {}",
                raw.messages.len()
            ));
        }
        if let Some(last) = raw.messages.last() {
            if last.role != ROLE_OPERATOR {
                violations.push(format!(
                    "expected last message role 'operator', got '{}'",
                    last.role
                ));
            }
        }
        if !violations.is_empty() {
            return Err(shape_error(self.format(), violations));
        }

        let target = raw.messages.len() - 1;
        let messages: Vec<DialogMessage> = raw
            .messages
            .iter()
            .map(|m| DialogMessage::new(m.role.clone(), m.content.clone()))
            .collect();
        build_example(self.name(), self.format(), request, messages, Some(target), raw)
    }

    fn validate_format(&self, example: &DatasetExample) -> Vec<String> {
        let mut violations = Vec::new();
        let messages = &example.input.messages;
        if messages.len() < 2 {
            violations.push(format!("expected at least 2 messages, got {}", messages.len()));
        }
        if let Some(last) = messages.last() {
            if last.role != ROLE_OPERATOR {
                violations.push(format!(
                    "expected last message role 'operator', got '{}'",
                    last.role
                ));
            }
        }
        let expected_target = messages.len().saturating_sub(1);
        if example.input.target_message_index != Some(expected_target) {
            violations.push(format!(
                "expected target_message_index {}, got {:?}",
                expected_target, example.input.target_message_index
            ));
        }
        violations
    }
}
