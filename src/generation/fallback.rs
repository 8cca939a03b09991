//! Last-resort direct generator.
//!
//! When the format adapters and the synthesis backends together still leave
//! a use case short of its minimum, one deficit-sized batch is requested
//! directly from the model. This is the final tier; its failure is terminal
//! for the use case.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::GenerationError;
use crate::llm::{generate_structured, LlmProvider, ModelConfig};
use crate::models::{
    example_id, test_case_id, DatasetExample, DialogFormat, DialogMessage, InputData, Policy,
    TestCase, UseCase,
};
use crate::prompts::{build_fallback_prompt, FALLBACK_GENERATION_SYSTEM};

use super::formats::{policy_digest, resolve_policy_ids};

#[derive(Debug, Deserialize)]
struct FallbackItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    question: String,
    expected_output: String,
    #[serde(default)]
    evaluation_criteria: Vec<String>,
    #[serde(default)]
    policy_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FallbackReply {
    #[serde(default)]
    items: Vec<FallbackItem>,
}

/// Generates `count` single-turn pairs in one batch call.
///
/// Test-case ids are minted starting at `index_offset` so the batch slots in
/// after whatever the earlier tiers produced. Any failure maps to
/// [`GenerationError::FallbackFailed`].
pub async fn generate_fallback_batch(
    provider: &dyn LlmProvider,
    config: &ModelConfig,
    use_case: &UseCase,
    policies: &[Policy],
    case: &str,
    count: usize,
    index_offset: usize,
) -> Result<Vec<(TestCase, DatasetExample)>, GenerationError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    info!(use_case = %use_case.id, count, "Running last-resort batch generation");

    let prompt = build_fallback_prompt(
        &use_case.name,
        &use_case.description,
        &policy_digest(policies),
        case,
        count,
    );
    let reply: FallbackReply =
        generate_structured(provider, config, FALLBACK_GENERATION_SYSTEM, &prompt)
            .await
            .map_err(|err| GenerationError::FallbackFailed {
                use_case_id: use_case.id.clone(),
                message: err.to_string(),
            })?;

    if reply.items.len() < count {
        return Err(GenerationError::FallbackFailed {
            use_case_id: use_case.id.clone(),
            message: format!("asked for {count} items, reply carried {}", reply.items.len()),
        });
    }

    let mut pairs = Vec::with_capacity(count);
    for (offset, item) in reply.items.into_iter().take(count).enumerate() {
        let pair = build_pair(use_case, policies, case, index_offset + offset, item).map_err(
            |err| GenerationError::FallbackFailed {
                use_case_id: use_case.id.clone(),
                message: err.to_string(),
            },
        )?;
        pairs.push(pair);
    }
    Ok(pairs)
}

fn build_pair(
    use_case: &UseCase,
    policies: &[Policy],
    case: &str,
    index: usize,
    item: FallbackItem,
) -> Result<(TestCase, DatasetExample), GenerationError> {
    let tc_id = test_case_id(&use_case.id, DialogFormat::SingleTurnQa, index);
    let axes = vec!["tone".to_string(), "adversarial".to_string()];
    let mut parameters = BTreeMap::new();
    parameters.insert("tone".to_string(), "neutral".to_string());
    parameters.insert("adversarial".to_string(), "none".to_string());

    let policy_ids = resolve_policy_ids(item.policy_ids, policies);

    let mut metadata = BTreeMap::new();
    metadata.insert(
        "generator".to_string(),
        Value::String("fallback:direct".to_string()),
    );

    let name = if item.name.trim().is_empty() {
        format!("fallback case {index}")
    } else {
        item.name
    };
    let description = if item.description.trim().is_empty() {
        format!("Last-resort example for '{}'", use_case.name)
    } else {
        item.description
    };

    let test_case = TestCase::new(
        &tc_id,
        &use_case.id,
        name,
        description,
        axes,
        parameters,
        policy_ids.clone(),
        metadata.clone(),
    )?;

    let input = InputData::new(vec![DialogMessage::user(item.question)], None)?;
    let example = DatasetExample::new(
        example_id(&tc_id),
        case,
        DialogFormat::SingleTurnQa,
        &use_case.id,
        &tc_id,
        input,
        item.expected_output,
        item.evaluation_criteria,
        policy_ids,
        metadata,
    )?;

    Ok((test_case, example))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::error::LlmError;
    use crate::llm::{Choice, GenerationRequest, GenerationResponse, Message};
    use crate::models::{Evidence, PolicyKind};

    struct CannedProvider {
        reply: Result<String, ()>,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            let reply = self
                .reply
                .clone()
                .map_err(|_| LlmError::RequestFailed("down".to_string()))?;
            Ok(GenerationResponse {
                id: "r".to_string(),
                model: "m".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(reply),
                    finish_reason: "stop".to_string(),
                }],
                usage: Default::default(),
            })
        }
    }

    fn use_case() -> UseCase {
        UseCase::new(
            "uc_002",
            "Refunds",
            "The user asks for a refund.",
            vec![Evidence::new("rules.md", 3, 3, "Refunds within 14 days.").unwrap()],
        )
        .unwrap()
    }

    fn policies() -> Vec<Policy> {
        vec![Policy::new(
            "pol_001",
            "Refund window",
            "Refunds are honored within 14 days.",
            PolicyKind::Must,
            vec![Evidence::new("rules.md", 3, 3, "Refunds within 14 days.").unwrap()],
            None,
        )
        .unwrap()]
    }

    fn item(question: &str) -> serde_json::Value {
        json!({
            "name": "refund ask",
            "description": "basic refund request",
            "question": question,
            "expected_output": "Yes, within 14 days of delivery.",
            "evaluation_criteria": ["mentions the 14-day window", "polite", "no invented terms"],
            "policy_ids": ["pol_001"]
        })
    }

    #[tokio::test]
    async fn batch_mints_ids_from_the_offset() {
        let provider = CannedProvider {
            reply: Ok(json!({"items": [item("Can I return this?"), item("Refund please?")]})
                .to_string()),
        };
        let pairs = generate_fallback_batch(
            &provider,
            &ModelConfig::default(),
            &use_case(),
            &policies(),
            "support_bot",
            2,
            5,
        )
        .await
        .unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0.id, "tc_002_single_turn_qa_005");
        assert_eq!(pairs[1].0.id, "tc_002_single_turn_qa_006");
        assert_eq!(pairs[0].1.test_case_id, pairs[0].0.id);
        assert_eq!(pairs[0].1.metadata.get("generator").unwrap(), "fallback:direct");
    }

    #[tokio::test]
    async fn short_reply_is_terminal() {
        let provider = CannedProvider {
            reply: Ok(json!({"items": [item("only one")]}).to_string()),
        };
        let err = generate_fallback_batch(
            &provider,
            &ModelConfig::default(),
            &use_case(),
            &policies(),
            "support_bot",
            3,
            0,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GenerationError::FallbackFailed { .. }));
    }

    #[tokio::test]
    async fn provider_failure_is_terminal() {
        let provider = CannedProvider { reply: Err(()) };
        let err = generate_fallback_batch(
            &provider,
            &ModelConfig::default(),
            &use_case(),
            &policies(),
            "support_bot",
            1,
            0,
        )
        .await
        .unwrap_err();
        match err {
            GenerationError::FallbackFailed { use_case_id, .. } => {
                assert_eq!(use_case_id, "uc_002");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn zero_count_makes_no_call() {
        let provider = CannedProvider { reply: Err(()) };
        let pairs = generate_fallback_batch(
            &provider,
            &ModelConfig::default(),
            &use_case(),
            &policies(),
            "support_bot",
            0,
            0,
        )
        .await
        .unwrap();
        assert!(pairs.is_empty());
    }
}
