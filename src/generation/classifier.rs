//! Case detection and source-kind classification.
//!
//! Both classifiers are heuristics-first with one LLM call as the tie
//! breaker and a safe default on any failure; classification never blocks
//! generation.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use crate::llm::{generate_structured, LlmProvider, ModelConfig};
use crate::models::{DatasetExample, DialogFormat, SourceKind, UseCase};
use crate::prompts::{
    build_case_detection_prompt, build_source_kind_prompt, CASE_DETECTION_SYSTEM,
    SOURCE_KIND_SYSTEM,
};

/// Keywords marking a use-case description as FAQ-derived.
const FAQ_KEYWORDS: [&str; 4] = ["faq", "frequently asked", "knowledge base", "help center"];

/// A use case's detected domain and the formats to generate for it.
#[derive(Debug, Clone)]
pub struct CaseProfile {
    pub case: String,
    pub formats: Vec<DialogFormat>,
}

impl CaseProfile {
    /// The safe default when detection fails.
    pub fn fallback() -> Self {
        Self {
            case: "support_bot".to_string(),
            formats: vec![DialogFormat::SingleTurnQa],
        }
    }

    /// Default formats for a known case.
    fn formats_for(case: &str) -> Vec<DialogFormat> {
        if case == "operator_quality" {
            vec![
                DialogFormat::SingleUtteranceCorrection,
                DialogFormat::DialogLastTurnCorrection,
            ]
        } else {
            vec![DialogFormat::SingleTurnQa]
        }
    }
}

#[derive(Debug, Deserialize)]
struct CaseReply {
    case: String,
}

/// Classifies a use case into one of `known_cases` via one structured call.
///
/// Any failure (call error, unknown case in the reply) yields the safe
/// default profile with a warning.
pub async fn detect_case_profile(
    provider: &dyn LlmProvider,
    config: &ModelConfig,
    use_case: &UseCase,
    known_cases: &[&str],
) -> CaseProfile {
    let prompt = build_case_detection_prompt(&use_case.name, &use_case.description, known_cases);
    let reply: Result<CaseReply, _> =
        generate_structured(provider, config, CASE_DETECTION_SYSTEM, &prompt).await;

    match reply {
        Ok(CaseReply { case }) if known_cases.contains(&case.as_str()) => {
            let formats = CaseProfile::formats_for(&case);
            CaseProfile { case, formats }
        }
        Ok(CaseReply { case }) => {
            warn!(use_case = %use_case.id, %case, "Case detection returned unknown case, using default");
            CaseProfile::fallback()
        }
        Err(err) => {
            warn!(use_case = %use_case.id, error = %err, "Case detection failed, using default");
            CaseProfile::fallback()
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourceKindReply {
    kind: String,
}

/// Classifies a support-bot example's primary user message.
///
/// Fast heuristics first: an explicit adversarial parameter means "corner",
/// an FAQ-flavored use-case description means "faq_paraphrase". The LLM is
/// consulted only when both are inconclusive; on classifier failure the
/// default is "tickets".
pub async fn classify_source_kind(
    provider: &dyn LlmProvider,
    config: &ModelConfig,
    use_case: &UseCase,
    example: &DatasetExample,
    parameters: &BTreeMap<String, String>,
) -> SourceKind {
    if let Some(adversarial) = parameters.get("adversarial") {
        if adversarial != "none" {
            return SourceKind::Corner;
        }
    }

    let description = use_case.description.to_lowercase();
    if FAQ_KEYWORDS.iter().any(|kw| description.contains(kw)) {
        return SourceKind::FaqParaphrase;
    }

    let Some(message) = example.input.primary_user_message() else {
        return SourceKind::Tickets;
    };

    let prompt = build_source_kind_prompt(message, &use_case.description);
    let reply: Result<SourceKindReply, _> =
        generate_structured(provider, config, SOURCE_KIND_SYSTEM, &prompt).await;

    match reply.map(|r| r.kind) {
        Ok(kind) => match kind.as_str() {
            "corner" => SourceKind::Corner,
            "faq_paraphrase" => SourceKind::FaqParaphrase,
            _ => SourceKind::Tickets,
        },
        Err(err) => {
            warn!(example = %example.id, error = %err, "Source-kind classification failed, defaulting to tickets");
            SourceKind::Tickets
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::error::LlmError;
    use crate::llm::{Choice, GenerationRequest, GenerationResponse, Message};
    use crate::models::{DialogMessage, Evidence, InputData};

    struct CountingProvider {
        reply: Result<String, ()>,
        calls: AtomicU32,
    }

    impl CountingProvider {
        fn replying(reply: serde_json::Value) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicU32::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for CountingProvider {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
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

    fn use_case(description: &str) -> UseCase {
        UseCase::new(
            "uc_001",
            "Order status",
            description,
            vec![Evidence::new("rules.md", 1, 1, "quote").unwrap()],
        )
        .unwrap()
    }

    fn params(adversarial: Option<&str>) -> BTreeMap<String, String> {
        let mut p = BTreeMap::new();
        if let Some(value) = adversarial {
            p.insert("adversarial".to_string(), value.to_string());
        }
        p
    }

    fn example() -> DatasetExample {
        DatasetExample::new(
            "ex_001_single_turn_qa_000_deadbeef",
            "support_bot",
            DialogFormat::SingleTurnQa,
            "uc_001",
            "tc_001_single_turn_qa_000",
            InputData::new(vec![DialogMessage::user("Where is my order?")], None).unwrap(),
            "expected",
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec!["pol_001".to_string()],
            BTreeMap::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn adversarial_parameter_short_circuits_to_corner() {
        let provider = CountingProvider::failing();
        let kind = classify_source_kind(
            &provider,
            &ModelConfig::default(),
            &use_case("Orders."),
            &example(),
            &params(Some("injection")),
        )
        .await;
        assert_eq!(kind, SourceKind::Corner);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn faq_description_short_circuits_to_faq_paraphrase() {
        let provider = CountingProvider::failing();
        let kind = classify_source_kind(
            &provider,
            &ModelConfig::default(),
            &use_case("Answers drawn from the FAQ page."),
            &example(),
            &params(None),
        )
        .await;
        assert_eq!(kind, SourceKind::FaqParaphrase);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn inconclusive_heuristics_consult_the_model() {
        let provider = CountingProvider::replying(json!({"kind": "corner"}));
        let kind = classify_source_kind(
            &provider,
            &ModelConfig::default(),
            &use_case("Orders."),
            &example(),
            &params(Some("none")),
        )
        .await;
        assert_eq!(kind, SourceKind::Corner);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn classifier_failure_defaults_to_tickets() {
        let provider = CountingProvider::failing();
        let kind = classify_source_kind(
            &provider,
            &ModelConfig::default(),
            &use_case("Orders."),
            &example(),
            &params(None),
        )
        .await;
        assert_eq!(kind, SourceKind::Tickets);
    }

    #[tokio::test]
    async fn case_detection_picks_known_case() {
        let provider = CountingProvider::replying(json!({"case": "operator_quality"}));
        let profile = detect_case_profile(
            &provider,
            &ModelConfig::default(),
            &use_case("Rate operator replies."),
            &["support_bot", "operator_quality"],
        )
        .await;
        assert_eq!(profile.case, "operator_quality");
        assert_eq!(
            profile.formats,
            vec![
                DialogFormat::SingleUtteranceCorrection,
                DialogFormat::DialogLastTurnCorrection
            ]
        );
    }

    #[tokio::test]
    async fn case_detection_failure_uses_safe_default() {
        let provider = CountingProvider::failing();
        let profile = detect_case_profile(
            &provider,
            &ModelConfig::default(),
            &use_case("Orders."),
            &["support_bot", "operator_quality"],
        )
        .await;
        assert_eq!(profile.case, "support_bot");
        assert_eq!(profile.formats, vec![DialogFormat::SingleTurnQa]);
    }

    #[tokio::test]
    async fn unknown_detected_case_uses_safe_default() {
        let provider = CountingProvider::replying(json!({"case": "weather_bot"}));
        let profile = detect_case_profile(
            &provider,
            &ModelConfig::default(),
            &use_case("Orders."),
            &["support_bot", "operator_quality"],
        )
        .await;
        assert_eq!(profile.case, "support_bot");
    }
}
