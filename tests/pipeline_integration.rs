//! End-to-end pipeline tests against a scripted provider.
//!
//! The provider dispatches canned replies on each call's system prompt, so
//! individual tiers can be switched off by omitting their script entry.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use evalforge::error::LlmError;
use evalforge::llm::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message};
use evalforge::pipeline::{Pipeline, PipelineConfig};
use evalforge::prompts::{
    CASE_DETECTION_SYSTEM, EXAMPLE_GENERATION_SYSTEM, FALLBACK_GENERATION_SYSTEM,
    POLICY_EXTRACTION_SYSTEM, ROUTING_SYSTEM, SOURCE_KIND_SYSTEM, USE_CASE_EXTRACTION_SYSTEM,
};
use evalforge::validation::validate_dataset;

struct ScriptedProvider {
    replies: Vec<(&'static str, serde_json::Value)>,
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
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

const RULES: &str = "\
Operators answer order-status questions politely.
Never promise refunds outside the 14-day window.
";

fn write_rules(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("rules.md");
    std::fs::write(&path, RULES).unwrap();
    path
}

fn extraction_replies() -> Vec<(&'static str, serde_json::Value)> {
    vec![
        (
            USE_CASE_EXTRACTION_SYSTEM,
            json!({
                "use_cases": [{
                    "name": "Order status",
                    "description": "The user asks where an order is.",
                    "evidence": [{
                        "line_start": 1,
                        "line_end": 1,
                        "quote": "Operators answer order-status questions politely."
                    }]
                }]
            }),
        ),
        (
            POLICY_EXTRACTION_SYSTEM,
            json!({
                "policies": [{
                    "name": "Refund window",
                    "statement": "Never promise refunds outside the 14-day window.",
                    "type": "must_not",
                    "evidence": [{
                        "line_start": 2,
                        "line_end": 2,
                        "quote": "Never promise refunds outside the 14-day window."
                    }]
                }]
            }),
        ),
    ]
}

fn qa_reply() -> serde_json::Value {
    json!({
        "messages": [{"role": "user", "content": "Where is my order 4711?"}],
        "expected_output": "Your order 4711 ships tomorrow.",
        "evaluation_criteria": ["answers the question", "polite tone", "no refund promises"],
        "policy_ids": ["pol_001"]
    })
}

fn fallback_reply(count: usize) -> serde_json::Value {
    let items: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            json!({
                "name": format!("case {i}"),
                "description": "fallback item",
                "question": format!("Fallback question number {i}?"),
                "expected_output": "An ideal, policy-compliant answer.",
                "evaluation_criteria": ["grounded", "direct", "polite"],
                "policy_ids": ["pol_001"]
            })
        })
        .collect();
    json!({"items": items})
}

#[tokio::test]
async fn happy_path_run_validates_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_rules(dir.path());
    let out = dir.path().join("out");

    let mut replies = extraction_replies();
    replies.push((CASE_DETECTION_SYSTEM, json!({"case": "support_bot"})));
    replies.push((SOURCE_KIND_SYSTEM, json!({"kind": "tickets"})));
    replies.push((EXAMPLE_GENERATION_SYSTEM, qa_reply()));
    replies.push((ROUTING_SYSTEM, json!({"invocations": []})));

    let pipeline = Pipeline::new(
        Arc::new(ScriptedProvider { replies }),
        PipelineConfig::new(&input, &out).with_min_test_cases(3),
    );
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.manifest.counts.use_cases, 1);
    assert!(summary.manifest.counts.test_cases >= 3);
    assert!(summary.evidence_warnings.is_empty());
    assert!(summary.coverage_warnings.is_empty());

    // The persisted dataset passes its own validator.
    let report = validate_dataset(&out).unwrap();
    assert!(report.is_clean(), "{}", report.render());
    assert_eq!(report.use_cases, 1);
    assert!(out.join("manifest.json").exists());
}

#[tokio::test]
async fn forward_progress_with_only_the_last_tier_alive() {
    // Case detection, adapters, and routing are all down; the run still
    // delivers exactly the minimum through the last-resort generator.
    let dir = tempfile::tempdir().unwrap();
    let input = write_rules(dir.path());
    let out = dir.path().join("out");

    let mut replies = extraction_replies();
    replies.push((FALLBACK_GENERATION_SYSTEM, fallback_reply(20)));

    let pipeline = Pipeline::new(
        Arc::new(ScriptedProvider { replies }),
        PipelineConfig::new(&input, &out).with_min_test_cases(4),
    );
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.manifest.counts.test_cases, 4);
    assert_eq!(summary.manifest.counts.examples, 4);
    assert!(summary
        .manifest
        .backends_used
        .contains(&"fallback".to_string()));

    let report = validate_dataset(&out).unwrap();
    assert!(report.is_clean(), "{}", report.render());
}

#[tokio::test]
async fn extraction_failure_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_rules(dir.path());
    let out = dir.path().join("out");

    let pipeline = Pipeline::new(
        Arc::new(ScriptedProvider { replies: vec![] }),
        PipelineConfig::new(&input, &out),
    );
    assert!(pipeline.run().await.is_err());
    assert!(!out.join("use_cases.json").exists());
}

#[tokio::test]
async fn sloppy_evidence_citation_is_a_warning_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_rules(dir.path());
    let out = dir.path().join("out");

    let mut replies = vec![
        (
            USE_CASE_EXTRACTION_SYSTEM,
            json!({
                "use_cases": [{
                    "name": "Order status",
                    "description": "The user asks where an order is.",
                    "evidence": [{
                        "line_start": 1,
                        "line_end": 1,
                        "quote": "completely different text that matches nothing"
                    }]
                }]
            }),
        ),
        (POLICY_EXTRACTION_SYSTEM, json!({"policies": []})),
    ];
    replies.push((CASE_DETECTION_SYSTEM, json!({"case": "support_bot"})));
    replies.push((SOURCE_KIND_SYSTEM, json!({"kind": "tickets"})));
    replies.push((EXAMPLE_GENERATION_SYSTEM, qa_reply()));
    replies.push((ROUTING_SYSTEM, json!({"invocations": []})));

    let pipeline = Pipeline::new(
        Arc::new(ScriptedProvider { replies }),
        PipelineConfig::new(&input, &out).with_min_test_cases(2),
    );
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.evidence_warnings.len(), 1);
    assert!(summary.evidence_warnings[0].starts_with("uc_001"));
}
