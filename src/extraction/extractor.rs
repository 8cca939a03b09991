//! LLM-driven extraction of use cases and policies.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::error::ExtractionError;
use crate::llm::{generate_structured, LlmProvider, ModelConfig};
use crate::models::{Evidence, Policy, PolicyKind, UseCase};
use crate::prompts::{
    build_policy_prompt, build_use_case_prompt, POLICY_EXTRACTION_SYSTEM,
    USE_CASE_EXTRACTION_SYSTEM,
};

use super::markdown::SourceDocument;

/// Raw evidence row as the extraction model replies with it.
#[derive(Debug, Deserialize)]
struct RawEvidence {
    line_start: usize,
    line_end: usize,
    quote: String,
}

#[derive(Debug, Deserialize)]
struct RawUseCase {
    name: String,
    description: String,
    #[serde(default)]
    evidence: Vec<RawEvidence>,
}

#[derive(Debug, Deserialize)]
struct UseCaseReply {
    #[serde(default)]
    use_cases: Vec<RawUseCase>,
}

#[derive(Debug, Deserialize)]
struct RawPolicy {
    name: String,
    statement: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    case: Option<String>,
    #[serde(default)]
    evidence: Vec<RawEvidence>,
}

#[derive(Debug, Deserialize)]
struct PolicyReply {
    #[serde(default)]
    policies: Vec<RawPolicy>,
}

/// Extracts canonical use cases and policies from a source document.
///
/// Ids are minted here (`uc_001`, `pol_001`, ...) in extraction order; the
/// model never supplies ids. Entities that would violate a structural
/// invariant (missing evidence, unknown policy kind) fail extraction: they
/// indicate the reply did not follow the schema.
pub struct RequirementsExtractor {
    provider: Arc<dyn LlmProvider>,
    config: ModelConfig,
}

impl RequirementsExtractor {
    pub fn new(provider: Arc<dyn LlmProvider>, config: ModelConfig) -> Self {
        Self { provider, config }
    }

    /// Extracts all use cases from the document via one structured call.
    pub async fn extract_use_cases(
        &self,
        document: &SourceDocument,
    ) -> Result<Vec<UseCase>, ExtractionError> {
        let prompt = build_use_case_prompt(&document.numbered_text());
        let reply: UseCaseReply = generate_structured(
            self.provider.as_ref(),
            &self.config,
            USE_CASE_EXTRACTION_SYSTEM,
            &prompt,
        )
        .await?;

        let mut use_cases = Vec::with_capacity(reply.use_cases.len());
        for (index, raw) in reply.use_cases.into_iter().enumerate() {
            let evidence = convert_evidence(&document.path, raw.evidence)?;
            let use_case = UseCase::new(
                format!("uc_{:03}", index + 1),
                raw.name,
                raw.description,
                evidence,
            )?;
            use_cases.push(use_case);
        }

        info!(count = use_cases.len(), document = %document.path, "Extracted use cases");
        Ok(use_cases)
    }

    /// Extracts all policies from the document via one structured call.
    pub async fn extract_policies(
        &self,
        document: &SourceDocument,
    ) -> Result<Vec<Policy>, ExtractionError> {
        let prompt = build_policy_prompt(&document.numbered_text());
        let reply: PolicyReply = generate_structured(
            self.provider.as_ref(),
            &self.config,
            POLICY_EXTRACTION_SYSTEM,
            &prompt,
        )
        .await?;

        let mut policies = Vec::with_capacity(reply.policies.len());
        for (index, raw) in reply.policies.into_iter().enumerate() {
            let kind: PolicyKind = raw.kind.parse()?;
            let evidence = convert_evidence(&document.path, raw.evidence)?;
            let policy = Policy::new(
                format!("pol_{:03}", index + 1),
                raw.name,
                raw.statement,
                kind,
                evidence,
                raw.case,
            )?;
            policies.push(policy);
        }

        info!(count = policies.len(), document = %document.path, "Extracted policies");
        Ok(policies)
    }
}

fn convert_evidence(
    input_file: &str,
    raw: Vec<RawEvidence>,
) -> Result<Vec<Evidence>, ExtractionError> {
    raw.into_iter()
        .map(|e| Ok(Evidence::new(input_file, e.line_start, e.line_end, e.quote)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::error::LlmError;
    use crate::llm::{Choice, GenerationRequest, GenerationResponse, Message};

    struct CannedProvider {
        reply: String,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            Ok(GenerationResponse {
                id: "r".to_string(),
                model: "m".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(self.reply.clone()),
                    finish_reason: "stop".to_string(),
                }],
                usage: Default::default(),
            })
        }
    }

    fn document() -> SourceDocument {
        SourceDocument::from_text(
            "rules.md",
            "Operators answer order questions.\nNever promise refunds.",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn mints_sequential_use_case_ids() {
        let reply = json!({
            "use_cases": [
                {
                    "name": "Order status",
                    "description": "The user asks where an order is.",
                    "evidence": [
                        {"line_start": 1, "line_end": 1, "quote": "Operators answer order questions."}
                    ]
                },
                {
                    "name": "Refund request",
                    "description": "The user asks for a refund.",
                    "evidence": [
                        {"line_start": 2, "line_end": 2, "quote": "Never promise refunds."}
                    ]
                }
            ]
        });
        let extractor = RequirementsExtractor::new(
            Arc::new(CannedProvider {
                reply: reply.to_string(),
            }),
            ModelConfig::default(),
        );
        let use_cases = extractor.extract_use_cases(&document()).await.unwrap();
        assert_eq!(use_cases.len(), 2);
        assert_eq!(use_cases[0].id, "uc_001");
        assert_eq!(use_cases[1].id, "uc_002");
        assert_eq!(use_cases[0].evidence[0].input_file, "rules.md");
    }

    #[tokio::test]
    async fn parses_policy_kinds_and_cases() {
        let reply = json!({
            "policies": [
                {
                    "name": "No refund promises",
                    "statement": "Never promise refunds.",
                    "type": "must_not",
                    "case": "support_bot",
                    "evidence": [
                        {"line_start": 2, "line_end": 2, "quote": "Never promise refunds."}
                    ]
                }
            ]
        });
        let extractor = RequirementsExtractor::new(
            Arc::new(CannedProvider {
                reply: reply.to_string(),
            }),
            ModelConfig::default(),
        );
        let policies = extractor.extract_policies(&document()).await.unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].id, "pol_001");
        assert_eq!(policies[0].kind, PolicyKind::MustNot);
        assert_eq!(policies[0].case.as_deref(), Some("support_bot"));
    }

    #[tokio::test]
    async fn missing_evidence_fails_extraction() {
        let reply = json!({
            "use_cases": [
                {"name": "Bad", "description": "no evidence", "evidence": []}
            ]
        });
        let extractor = RequirementsExtractor::new(
            Arc::new(CannedProvider {
                reply: reply.to_string(),
            }),
            ModelConfig::default(),
        );
        let err = extractor.extract_use_cases(&document()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Model(_)));
    }

    #[tokio::test]
    async fn unknown_policy_kind_fails_extraction() {
        let reply = json!({
            "policies": [
                {
                    "name": "Odd",
                    "statement": "s",
                    "type": "forbidden",
                    "evidence": [
                        {"line_start": 1, "line_end": 1, "quote": "Operators answer order questions."}
                    ]
                }
            ]
        });
        let extractor = RequirementsExtractor::new(
            Arc::new(CannedProvider {
                reply: reply.to_string(),
            }),
            ModelConfig::default(),
        );
        let err = extractor.extract_policies(&document()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Model(_)));
    }
}
