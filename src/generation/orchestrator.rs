//! Per-use-case generation orchestration.
//!
//! An explicit state machine drives one use case from parameter variations
//! to a final (test_cases, examples) set:
//!
//! `VariationGenerated -> AdapterDispatch -> SupplementCheck ->
//! FrameworkSupplement -> FinalFallback -> Done`
//!
//! Tier semantics: per-example adapter failures, including replies whose
//! content cannot yield a valid example, are logged and skipped; the
//! supplement tier selects synthesis backends via a tool-routing call
//! (zero selections is fine) and invokes each defensively; the final
//! fallback generates exactly the remaining deficit in one call and is the
//! forward-progress guarantee. Only schema violations in entities the
//! orchestrator constructs itself propagate.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::llm::{route_tools, LlmProvider, ModelConfig, ToolSpec};
use crate::models::{test_case_id, DatasetExample, DialogFormat, Policy, TestCase, UseCase};

use super::axes::AxisConfig;
use super::classifier::{classify_source_kind, detect_case_profile, CaseProfile};
use super::engines::{adapt_record, SynthesisBackend};
use super::fallback::generate_fallback_batch;
use super::formats::{adapter_for, policy_digest, ExampleRequest};
use super::pairwise::{generate_variations, Variation};

/// Everything one use case produced, plus the audit trail.
#[derive(Debug)]
pub struct UseCaseArtifacts {
    pub case: String,
    pub test_cases: Vec<TestCase>,
    pub examples: Vec<DatasetExample>,
    /// Names of the supplement tiers that contributed pairs.
    pub backends_used: BTreeSet<String>,
}

/// Named states of the per-use-case machine.
enum Stage {
    VariationGenerated(Vec<Variation>),
    AdapterDispatch(Vec<Variation>),
    SupplementCheck,
    FrameworkSupplement { deficit: usize },
    FinalFallback { deficit: usize },
    Done,
}

/// Drives generation for one use case at a time.
pub struct Orchestrator<'a> {
    provider: &'a dyn LlmProvider,
    config: ModelConfig,
    axis_config: AxisConfig,
    backends: Vec<Box<dyn SynthesisBackend>>,
    min_test_cases: usize,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        provider: &'a dyn LlmProvider,
        config: ModelConfig,
        axis_config: AxisConfig,
        backends: Vec<Box<dyn SynthesisBackend>>,
        min_test_cases: usize,
    ) -> Self {
        Self {
            provider,
            config,
            axis_config,
            backends,
            min_test_cases,
        }
    }

    /// Runs the machine for one use case.
    ///
    /// Returns at least `min_test_cases` pairs or the terminal error of the
    /// final fallback tier.
    pub async fn generate_for_use_case(
        &self,
        use_case: &UseCase,
        policies: &[Policy],
        rng: &mut ChaCha8Rng,
    ) -> Result<UseCaseArtifacts, GenerationError> {
        let profile =
            detect_case_profile(self.provider, &self.config, use_case, &self.axis_config.known_cases())
                .await;
        info!(
            use_case = %use_case.id,
            case = %profile.case,
            formats = profile.formats.len(),
            "Starting generation"
        );

        let mut pairs: Vec<(TestCase, DatasetExample)> = Vec::new();
        let mut backends_used: BTreeSet<String> = BTreeSet::new();
        let mut next_index = 0usize;

        let mut stage = Stage::VariationGenerated(generate_variations(
            &self.axis_config,
            &profile.case,
            self.min_test_cases,
            rng,
        ));

        loop {
            stage = match stage {
                Stage::VariationGenerated(variations) => {
                    debug!(use_case = %use_case.id, count = variations.len(), "Variations ready");
                    Stage::AdapterDispatch(variations)
                }

                Stage::AdapterDispatch(variations) => {
                    for variation in &variations {
                        for &format in &profile.formats {
                            match self
                                .dispatch_one(use_case, policies, &profile, variation, format, next_index)
                                .await
                            {
                                Ok(Some(pair)) => {
                                    pairs.push(pair);
                                    next_index += 1;
                                }
                                Ok(None) => {}
                                Err(err) => return Err(err),
                            }
                        }
                    }
                    Stage::SupplementCheck
                }

                Stage::SupplementCheck => {
                    let deficit = self.min_test_cases.saturating_sub(pairs.len());
                    if deficit == 0 {
                        Stage::Done
                    } else {
                        info!(use_case = %use_case.id, deficit, "Below minimum after adapter tier");
                        Stage::FrameworkSupplement { deficit }
                    }
                }

                Stage::FrameworkSupplement { deficit } => {
                    let added = self
                        .run_supplement(use_case, policies, &profile, deficit, &mut pairs, &mut next_index, &mut backends_used)
                        .await?;
                    let remaining = deficit.saturating_sub(added);
                    if remaining == 0 {
                        Stage::Done
                    } else {
                        Stage::FinalFallback { deficit: remaining }
                    }
                }

                Stage::FinalFallback { deficit } => {
                    let batch = generate_fallback_batch(
                        self.provider,
                        &self.config,
                        use_case,
                        policies,
                        &profile.case,
                        deficit,
                        next_index,
                    )
                    .await?;
                    next_index += batch.len();
                    pairs.extend(batch);
                    backends_used.insert("fallback".to_string());
                    Stage::Done
                }

                Stage::Done => break,
            };
        }

        let (test_cases, examples) = pairs.into_iter().unzip();
        Ok(UseCaseArtifacts {
            case: profile.case.clone(),
            test_cases,
            examples,
            backends_used,
        })
    }

    /// One adapter call: any failure of the call itself, reply content
    /// included, is a logged per-example skip (`Ok(None)`). Schema
    /// violations from the test case built here propagate.
    async fn dispatch_one(
        &self,
        use_case: &UseCase,
        policies: &[Policy],
        profile: &CaseProfile,
        variation: &Variation,
        format: DialogFormat,
        index: usize,
    ) -> Result<Option<(TestCase, DatasetExample)>, GenerationError> {
        let tc_id = test_case_id(&use_case.id, format, index);
        let request = ExampleRequest {
            use_case,
            test_case_id: &tc_id,
            case: &profile.case,
            parameters: &variation.parameters,
            policies,
        };
        let adapter = adapter_for(format);

        let mut example = match adapter
            .generate_example(self.provider, &self.config, &request)
            .await
        {
            Ok(example) => example,
            Err(err) => {
                warn!(
                    use_case = %use_case.id,
                    format = %format,
                    error = %err,
                    "Adapter call failed, skipping variation"
                );
                return Ok(None);
            }
        };

        if profile.case == "support_bot" {
            let kind =
                classify_source_kind(self.provider, &self.config, use_case, &example, &variation.parameters)
                    .await;
            example
                .metadata
                .insert("source_kind".to_string(), Value::String(kind.to_string()));
        }

        // The test case records the same generation path as its example.
        let mut tc_metadata = BTreeMap::new();
        tc_metadata.insert(
            "generator".to_string(),
            example
                .metadata
                .get("generator")
                .cloned()
                .unwrap_or_else(|| Value::String("format_adapter".to_string())),
        );
        let test_case = TestCase::new(
            &tc_id,
            &use_case.id,
            variation_name(variation),
            format!(
                "Parameter variation of '{}' exercising {}",
                use_case.name,
                variation.dominant_axes.join(", ")
            ),
            variation.dominant_axes.clone(),
            variation.parameters.clone(),
            example.policy_ids.clone(),
            tc_metadata,
        )?;

        Ok(Some((test_case, example)))
    }

    /// Supplement tier: route to backends, adapt their records defensively.
    /// Returns how many pairs were added.
    #[allow(clippy::too_many_arguments)]
    async fn run_supplement(
        &self,
        use_case: &UseCase,
        policies: &[Policy],
        profile: &CaseProfile,
        deficit: usize,
        pairs: &mut Vec<(TestCase, DatasetExample)>,
        next_index: &mut usize,
        backends_used: &mut BTreeSet<String>,
    ) -> Result<usize, GenerationError> {
        // Document-grounded backends read a policy digest; the temp file is
        // cleaned up when the guard drops, on every path.
        let (_doc_guard, document) = write_policy_document(use_case, policies)?;

        let specs: Vec<ToolSpec> = self.backends.iter().map(|b| b.tool_spec()).collect();
        let summary = format!("{}: {}", use_case.name, use_case.description);
        let invocations =
            match route_tools(self.provider, &self.config, &summary, &specs).await {
                Ok(invocations) => invocations,
                Err(err) => {
                    warn!(use_case = %use_case.id, error = %err, "Backend routing failed, skipping supplement tier");
                    Vec::new()
                }
            };

        let mut added = 0usize;
        for invocation in invocations {
            if added >= deficit {
                break;
            }
            let Some(backend) = self.backends.iter().find(|b| b.name() == invocation.name) else {
                continue;
            };

            let want = deficit - added;
            let records = match backend
                .synthesize(self.provider, &self.config, &document, want)
                .await
            {
                Ok(records) => records,
                Err(err) => {
                    warn!(
                        use_case = %use_case.id,
                        backend = backend.name(),
                        error = %err,
                        "Backend failed, skipping"
                    );
                    continue;
                }
            };

            let mut contributed = false;
            for record in records.iter().take(want) {
                let adapted =
                    adapt_record(backend.name(), record, use_case, &profile.case, *next_index)?;
                if adapted.is_degraded() {
                    debug!(use_case = %use_case.id, backend = backend.name(), "Degraded record kept");
                }
                pairs.push(adapted.into_parts());
                *next_index += 1;
                added += 1;
                contributed = true;
            }
            if contributed {
                backends_used.insert(backend.name().to_string());
            }
        }
        Ok(added)
    }
}

/// Short test-case name from a variation's dominant axes.
fn variation_name(variation: &Variation) -> String {
    variation
        .dominant_axes
        .iter()
        .map(|axis| {
            let value = variation
                .parameters
                .get(axis)
                .map(String::as_str)
                .unwrap_or("?");
            format!("{axis}={value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Writes the per-use-case policy digest to a scoped temp file.
fn write_policy_document(
    use_case: &UseCase,
    policies: &[Policy],
) -> Result<(NamedTempFile, String), GenerationError> {
    let document = format!(
        "# Policies for {}\n\n{}\n",
        use_case.name,
        policy_digest(policies)
    );
    let mut file = NamedTempFile::new()?;
    file.write_all(document.as_bytes())?;
    Ok((file, document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::SeedableRng;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::error::LlmError;
    use crate::generation::engines::builtin_backends;
    use crate::llm::{Choice, GenerationRequest, GenerationResponse, Message};
    use crate::models::{Evidence, PolicyKind};
    use crate::prompts::{
        CASE_DETECTION_SYSTEM, EXAMPLE_GENERATION_SYSTEM, FALLBACK_GENERATION_SYSTEM,
        ROUTING_SYSTEM, SOURCE_KIND_SYSTEM,
    };

    /// Dispatches canned replies on the system prompt of each call; calls
    /// with no scripted reply fail as if the provider were down.
    struct ScriptedProvider {
        replies: Vec<(&'static str, serde_json::Value)>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<(&'static str, serde_json::Value)>) -> Self {
            Self {
                replies,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let system = request
                .messages
                .first()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            let reply = self
                .replies
                .iter()
                .find(|(prefix, _)| system.starts_with(prefix))
                .map(|(_, value)| value.to_string())
                .ok_or_else(|| LlmError::RequestFailed("no scripted reply".to_string()))?;
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
            "uc_001",
            "Order status",
            "The user asks where an order is.",
            vec![Evidence::new("rules.md", 1, 1, "Answer order questions.").unwrap()],
        )
        .unwrap()
    }

    fn policies() -> Vec<Policy> {
        vec![Policy::new(
            "pol_001",
            "Politeness",
            "Always stay polite.",
            PolicyKind::Must,
            vec![Evidence::new("rules.md", 2, 2, "Always stay polite.").unwrap()],
            None,
        )
        .unwrap()]
    }

    fn qa_reply() -> serde_json::Value {
        json!({
            "messages": [{"role": "user", "content": "Where is my order 4711?"}],
            "expected_output": "Your order 4711 ships tomorrow.",
            "evaluation_criteria": ["answers the question", "polite tone", "no invented data"],
            "policy_ids": ["pol_001"]
        })
    }

    fn fallback_reply(count: usize) -> serde_json::Value {
        let items: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                json!({
                    "name": format!("case {i}"),
                    "description": "fallback item",
                    "question": format!("Question number {i}?"),
                    "expected_output": "An ideal answer.",
                    "evaluation_criteria": ["grounded", "direct", "polite"],
                    "policy_ids": ["pol_001"]
                })
            })
            .collect();
        json!({"items": items})
    }

    fn orchestrator<'a>(provider: &'a dyn LlmProvider, min: usize) -> Orchestrator<'a> {
        Orchestrator::new(
            provider,
            ModelConfig::default(),
            AxisConfig::builtin(),
            builtin_backends(),
            min,
        )
    }

    #[tokio::test]
    async fn adapter_tier_alone_meets_the_minimum() {
        let provider = ScriptedProvider::new(vec![
            (CASE_DETECTION_SYSTEM, json!({"case": "support_bot"})),
            (SOURCE_KIND_SYSTEM, json!({"kind": "tickets"})),
            (EXAMPLE_GENERATION_SYSTEM, qa_reply()),
            (ROUTING_SYSTEM, json!({"invocations": []})),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let artifacts = orchestrator(&provider, 3)
            .generate_for_use_case(&use_case(), &policies(), &mut rng)
            .await
            .unwrap();

        assert!(artifacts.test_cases.len() >= 3);
        assert_eq!(artifacts.test_cases.len(), artifacts.examples.len());
        assert!(artifacts.backends_used.is_empty());
        // Pairs stay linked and entities stay valid.
        for (tc, ex) in artifacts.test_cases.iter().zip(&artifacts.examples) {
            assert_eq!(ex.test_case_id, tc.id);
            assert_eq!(
                tc.metadata.get("generator").unwrap(),
                "format_adapter:single_turn_qa"
            );
            // Adversarial variations classify as "corner" without an LLM
            // call; the rest follow the scripted reply.
            let kind = ex.metadata.get("source_kind").unwrap().as_str().unwrap();
            assert!(
                kind == "tickets" || kind == "corner",
                "unexpected source kind {kind}"
            );
            tc.validate().unwrap();
            ex.validate().unwrap();
        }
    }

    #[tokio::test]
    async fn malformed_adapter_reply_falls_through_to_later_tiers() {
        // Two criteria is below the example minimum; the adapter tier must
        // skip such replies per example rather than abort the use case.
        let bad_reply = json!({
            "messages": [{"role": "user", "content": "Where is my order?"}],
            "expected_output": "It ships tomorrow.",
            "evaluation_criteria": ["answers the question", "polite tone"],
            "policy_ids": ["pol_001"]
        });
        let provider = ScriptedProvider::new(vec![
            (CASE_DETECTION_SYSTEM, json!({"case": "support_bot"})),
            (EXAMPLE_GENERATION_SYSTEM, bad_reply),
            (FALLBACK_GENERATION_SYSTEM, fallback_reply(20)),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let artifacts = orchestrator(&provider, 3)
            .generate_for_use_case(&use_case(), &policies(), &mut rng)
            .await
            .unwrap();

        assert_eq!(artifacts.test_cases.len(), 3);
        assert!(artifacts.backends_used.contains("fallback"));
    }

    #[tokio::test]
    async fn every_tier_down_except_fallback_still_delivers() {
        // Case detection, adapters, and routing all fail; only the
        // last-resort batch succeeds.
        let provider = ScriptedProvider::new(vec![(
            FALLBACK_GENERATION_SYSTEM,
            fallback_reply(40),
        )]);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let artifacts = orchestrator(&provider, 5)
            .generate_for_use_case(&use_case(), &policies(), &mut rng)
            .await
            .unwrap();

        assert_eq!(artifacts.test_cases.len(), 5);
        assert_eq!(artifacts.case, "support_bot");
        assert!(artifacts.backends_used.contains("fallback"));
        for tc in &artifacts.test_cases {
            assert_eq!(tc.metadata.get("generator").unwrap(), "fallback:direct");
        }
    }

    #[tokio::test]
    async fn everything_down_is_terminal() {
        let provider = ScriptedProvider::new(vec![]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let err = orchestrator(&provider, 2)
            .generate_for_use_case(&use_case(), &policies(), &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::FallbackFailed { .. }));
    }

    #[tokio::test]
    async fn supplement_tier_fills_the_deficit() {
        let goldens: Vec<serde_json::Value> = (0..40)
            .map(|i| {
                json!({
                    "input": format!("Synth question {i}?"),
                    "expected_output": "Synth answer.",
                    "context": ["pol_001 applies"]
                })
            })
            .collect();
        let provider = ScriptedProvider::new(vec![
            (CASE_DETECTION_SYSTEM, json!({"case": "support_bot"})),
            (
                ROUTING_SYSTEM,
                json!({"invocations": [{"name": "deepeval", "arguments": {}}]}),
            ),
            (
                "You are a dataset-synthesis engine.",
                json!({"goldens": goldens}),
            ),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let artifacts = orchestrator(&provider, 4)
            .generate_for_use_case(&use_case(), &policies(), &mut rng)
            .await
            .unwrap();

        assert_eq!(artifacts.test_cases.len(), 4);
        assert!(artifacts.backends_used.contains("deepeval"));
        assert!(!artifacts.backends_used.contains("fallback"));
        assert!(artifacts.examples[0].policy_ids.contains(&"pol_001".to_string()));
    }

    #[tokio::test]
    async fn operator_quality_skips_source_kind_classification() {
        let correction_reply = json!({
            "messages": [{"role": "operator", "content": "ur order is late lol"}],
            "expected_output": "I am sorry, your order is delayed.",
            "evaluation_criteria": ["professional tone", "apology present", "no slang"],
            "policy_ids": ["pol_001"]
        });
        // No SOURCE_KIND_SYSTEM script: a classification attempt would fail,
        // but operator_quality must never attempt one. Both correction
        // formats share EXAMPLE_GENERATION_SYSTEM; the scripted reply fails
        // the dialog-correction shape checks, which exercises the
        // per-example skip path at the same time.
        let provider = ScriptedProvider::new(vec![
            (CASE_DETECTION_SYSTEM, json!({"case": "operator_quality"})),
            (EXAMPLE_GENERATION_SYSTEM, correction_reply),
            (ROUTING_SYSTEM, json!({"invocations": []})),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let artifacts = orchestrator(&provider, 2)
            .generate_for_use_case(&use_case(), &policies(), &mut rng)
            .await
            .unwrap();

        assert!(artifacts.test_cases.len() >= 2);
        for ex in &artifacts.examples {
            assert!(!ex.metadata.contains_key("source_kind"));
        }
    }
}
