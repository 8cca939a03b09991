//! External synthesis-engine backends and their record adapters.
//!
//! Each backend derives candidate rows from a policy document using its own
//! technique and returns them in its native shape; the adapters map one
//! native record to one canonical TestCase/DatasetExample pair. Adapters are
//! defensive: a record that cannot be mapped cleanly comes back as
//! [`Adapted::Degraded`] with a minimal schema-valid pair and the reason, so
//! no index position is lost mid-supplement and the deficit accounting stays
//! intact. The only remaining error path is entity construction itself.

use std::collections::BTreeMap;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{GenerationError, ModelError};
use crate::llm::{generate_structured, LlmProvider, ModelConfig, ToolSpec};
use crate::models::{
    example_id, test_case_id, DatasetExample, DialogFormat, DialogMessage, InputData, TestCase,
    UseCase,
};

/// Policy id used when a record carries no recognizable policy reference.
pub const FALLBACK_POLICY_ID: &str = "pol_unknown";

/// Criteria for records whose evolution tag marks multi-step reasoning.
const REASONING_CRITERIA: [&str; 3] = [
    "answer shows correct multi-step reasoning",
    "intermediate steps are consistent with the source document",
    "conclusion follows from the stated steps",
];

/// Criteria for everything else.
const GENERIC_CRITERIA: [&str; 3] = [
    "answer is grounded in the source document",
    "answer addresses the question directly",
    "tone is appropriate for customer support",
];

// ============================================================================
// Native record shapes
// ============================================================================

/// deepeval-style golden: input plus expected output with context snippets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoldenRecord {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub actual_output: Option<String>,
    #[serde(default)]
    pub expected_output: Option<String>,
    #[serde(default)]
    pub context: Vec<String>,
}

/// ragas-style tabular row: loosely-typed named columns.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TabularRow {
    #[serde(flatten)]
    pub columns: BTreeMap<String, Value>,
}

impl TabularRow {
    /// First present string column from a precedence list.
    fn first_string(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .find_map(|name| self.columns.get(*name))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// giskard-style question row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionRow {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub reference_answer: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// One record in whatever shape its engine natively produces.
#[derive(Debug, Clone)]
pub enum NativeRecord {
    Golden(GoldenRecord),
    Tabular(TabularRow),
    Question(QuestionRow),
}

// ============================================================================
// Backends
// ============================================================================

/// An external synthesis engine behind a narrow contract.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Stable backend name, used for routing, audit, and metadata.
    fn name(&self) -> &'static str;

    /// The tool description offered to the routing call.
    fn tool_spec(&self) -> ToolSpec;

    /// Derives up to `count` native records from the policy document.
    async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        config: &ModelConfig,
        policy_document: &str,
        count: usize,
    ) -> Result<Vec<NativeRecord>, GenerationError>;
}

/// The shipped backend set.
pub fn builtin_backends() -> Vec<Box<dyn SynthesisBackend>> {
    vec![
        Box::new(DeepevalBackend),
        Box::new(RagasBackend),
        Box::new(GiskardBackend),
    ]
}

fn count_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "count": {"type": "integer", "minimum": 1, "description": "rows to synthesize"}
        }
    })
}

/// Golden-based synthesis in the deepeval manner.
pub struct DeepevalBackend;

#[derive(Debug, Deserialize)]
struct GoldenReply {
    #[serde(default)]
    goldens: Vec<GoldenRecord>,
}

#[async_trait]
impl SynthesisBackend for DeepevalBackend {
    fn name(&self) -> &'static str {
        "deepeval"
    }

    fn tool_spec(&self) -> ToolSpec {
        ToolSpec {
            name: "deepeval".to_string(),
            description: "Synthesizes golden input/expected-output pairs grounded in the policy \
                          document, with supporting context snippets."
                .to_string(),
            parameters: count_schema(),
        }
    }

    async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        config: &ModelConfig,
        policy_document: &str,
        count: usize,
    ) -> Result<Vec<NativeRecord>, GenerationError> {
        let prompt = format!(
            r#"Derive {count} golden question/answer pairs from the policy document below.
Each golden cites the policy lines it is grounded in as context snippets.

Policy document:
{policy_document}

Reply with this JSON shape:
{{"goldens": [{{"input": "...", "expected_output": "...", "context": ["..."]}}]}}"#
        );
        let reply: GoldenReply = generate_structured(
            provider,
            config,
            "You are a dataset-synthesis engine. Reply with JSON only.",
            &prompt,
        )
        .await?;
        Ok(reply.goldens.into_iter().map(NativeRecord::Golden).collect())
    }
}

/// Tabular-row synthesis in the ragas manner.
pub struct RagasBackend;

#[derive(Debug, Deserialize)]
struct TabularReply {
    #[serde(default)]
    rows: Vec<TabularRow>,
}

#[async_trait]
impl SynthesisBackend for RagasBackend {
    fn name(&self) -> &'static str {
        "ragas"
    }

    fn tool_spec(&self) -> ToolSpec {
        ToolSpec {
            name: "ragas".to_string(),
            description: "Synthesizes tabular question rows with ground truths and an \
                          evolution_type tag (simple, reasoning, multicontext, concretizing, \
                          constrained)."
                .to_string(),
            parameters: count_schema(),
        }
    }

    async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        config: &ModelConfig,
        policy_document: &str,
        count: usize,
    ) -> Result<Vec<NativeRecord>, GenerationError> {
        let prompt = format!(
            r#"Derive {count} evaluation rows from the policy document below. Vary the
evolution_type across simple, reasoning, multicontext, concretizing, constrained.

Policy document:
{policy_document}

Reply with this JSON shape:
{{"rows": [{{"question": "...", "ground_truth": "...", "contexts": ["..."], "evolution_type": "simple"}}]}}"#
        );
        let reply: TabularReply = generate_structured(
            provider,
            config,
            "You are a dataset-synthesis engine. Reply with JSON only.",
            &prompt,
        )
        .await?;
        Ok(reply.rows.into_iter().map(NativeRecord::Tabular).collect())
    }
}

/// Question-row synthesis in the giskard manner.
pub struct GiskardBackend;

#[derive(Debug, Deserialize)]
struct QuestionReply {
    #[serde(default)]
    questions: Vec<QuestionRow>,
}

#[async_trait]
impl SynthesisBackend for GiskardBackend {
    fn name(&self) -> &'static str {
        "giskard"
    }

    fn tool_spec(&self) -> ToolSpec {
        ToolSpec {
            name: "giskard".to_string(),
            description: "Synthesizes adversarially-flavored question rows with reference \
                          answers from the policy document."
                .to_string(),
            parameters: count_schema(),
        }
    }

    async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        config: &ModelConfig,
        policy_document: &str,
        count: usize,
    ) -> Result<Vec<NativeRecord>, GenerationError> {
        let prompt = format!(
            r#"Derive {count} tricky evaluation questions from the policy document below,
each with the reference answer a compliant assistant should give.

Policy document:
{policy_document}

Reply with this JSON shape:
{{"questions": [{{"question": "...", "reference_answer": "...", "metadata": {{"seed_topic": "..."}}}}]}}"#
        );
        let reply: QuestionReply = generate_structured(
            provider,
            config,
            "You are a dataset-synthesis engine. Reply with JSON only.",
            &prompt,
        )
        .await?;
        Ok(reply
            .questions
            .into_iter()
            .map(NativeRecord::Question)
            .collect())
    }
}

// ============================================================================
// Record adaptation
// ============================================================================

/// Outcome of adapting one native record.
///
/// `Degraded` still carries a schema-valid pair so the orchestration pass
/// keeps its index position; the reason tells the operator why the record
/// is a placeholder rather than trustworthy content.
#[derive(Debug)]
pub enum Adapted {
    Clean {
        test_case: TestCase,
        example: DatasetExample,
    },
    Degraded {
        test_case: TestCase,
        example: DatasetExample,
        reason: String,
    },
}

impl Adapted {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Adapted::Degraded { .. })
    }

    pub fn into_parts(self) -> (TestCase, DatasetExample) {
        match self {
            Adapted::Clean { test_case, example }
            | Adapted::Degraded {
                test_case, example, ..
            } => (test_case, example),
        }
    }
}

/// Maps one native record to a canonical pair. An unmappable record
/// degrades to a placeholder; only schema violations in the placeholder
/// itself propagate.
pub fn adapt_record(
    backend: &str,
    record: &NativeRecord,
    use_case: &UseCase,
    case: &str,
    index: usize,
) -> Result<Adapted, GenerationError> {
    match try_adapt(backend, record, use_case, case, index) {
        Ok((test_case, example)) => Ok(Adapted::Clean { test_case, example }),
        Err(reason) => {
            warn!(backend, index, %reason, "Record adaptation degraded to placeholder");
            let (test_case, example) = minimal_pair(backend, use_case, case, index)?;
            Ok(Adapted::Degraded {
                test_case,
                example,
                reason,
            })
        }
    }
}

/// Field-precedence extraction per engine shape.
fn extract_fields(record: &NativeRecord) -> (String, String, Option<String>, String) {
    match record {
        NativeRecord::Golden(golden) => {
            let question = golden
                .input
                .clone()
                .or_else(|| golden.actual_output.clone())
                .unwrap_or_else(|| "placeholder question".to_string());
            let answer = golden
                .expected_output
                .clone()
                .or_else(|| golden.actual_output.clone())
                .unwrap_or_else(|| "placeholder answer".to_string());
            (question, answer, None, golden.context.join("\n"))
        }
        NativeRecord::Tabular(row) => {
            let question = row
                .first_string(&["question", "user_input"])
                .unwrap_or_else(|| "placeholder question".to_string());
            let answer = row
                .first_string(&["ground_truth", "reference", "answer"])
                .unwrap_or_else(|| "placeholder answer".to_string());
            let evolution = row.first_string(&["evolution_type", "synthesizer_name"]);
            let context = row
                .columns
                .get("contexts")
                .map(|v| v.to_string())
                .unwrap_or_default();
            (question, answer, evolution, context)
        }
        NativeRecord::Question(row) => {
            let question = row
                .question
                .clone()
                .unwrap_or_else(|| "placeholder question".to_string());
            let answer = row
                .reference_answer
                .clone()
                .unwrap_or_else(|| "placeholder answer".to_string());
            let evolution = row.metadata.get("evolution").cloned();
            let context = row
                .metadata
                .values()
                .cloned()
                .collect::<Vec<_>>()
                .join("\n");
            (question, answer, evolution, context)
        }
    }
}

/// Criteria set selected by the record's evolution tag.
fn criteria_for(evolution: Option<&str>) -> Vec<String> {
    let reasoning = evolution
        .map(|tag| tag.to_lowercase().contains("reasoning"))
        .unwrap_or(false);
    let set = if reasoning {
        &REASONING_CRITERIA
    } else {
        &GENERIC_CRITERIA
    };
    set.iter().map(|s| s.to_string()).collect()
}

/// `pol_` ids mentioned anywhere in the record's context text.
fn extract_policy_ids(context: &str) -> Vec<String> {
    let Ok(pattern) = Regex::new(r"pol_\w+") else {
        return vec![FALLBACK_POLICY_ID.to_string()];
    };
    let mut ids: Vec<String> = pattern
        .find_iter(context)
        .map(|m| m.as_str().to_string())
        .collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        ids.push(FALLBACK_POLICY_ID.to_string());
    }
    ids
}

fn try_adapt(
    backend: &str,
    record: &NativeRecord,
    use_case: &UseCase,
    case: &str,
    index: usize,
) -> Result<(TestCase, DatasetExample), String> {
    let (question, answer, evolution, context) = extract_fields(record);
    if question.trim().is_empty() {
        return Err("record has an empty question".to_string());
    }

    let axes = vec!["tone".to_string(), "adversarial".to_string()];
    let mut parameters = BTreeMap::new();
    parameters.insert("tone".to_string(), "neutral".to_string());
    parameters.insert("adversarial".to_string(), "none".to_string());

    let policy_ids = extract_policy_ids(&context);
    let tc_id = test_case_id(&use_case.id, DialogFormat::SingleTurnQa, index);

    let mut tc_metadata = BTreeMap::new();
    tc_metadata.insert(
        "generator".to_string(),
        Value::String(format!("backend:{backend}")),
    );
    if let Some(tag) = &evolution {
        tc_metadata.insert("evolution".to_string(), Value::String(tag.clone()));
    }

    let test_case = TestCase::new(
        &tc_id,
        &use_case.id,
        format!("{} row {}", backend, index),
        format!("Synthesized by the {backend} backend for '{}'", use_case.name),
        axes,
        parameters,
        policy_ids.clone(),
        tc_metadata.clone(),
    )
    .map_err(|e| e.to_string())?;

    let input = InputData::new(vec![DialogMessage::user(question)], None)
        .map_err(|e| e.to_string())?;
    let example = DatasetExample::new(
        example_id(&tc_id),
        case,
        DialogFormat::SingleTurnQa,
        &use_case.id,
        &tc_id,
        input,
        answer,
        criteria_for(evolution.as_deref()),
        policy_ids,
        tc_metadata,
    )
    .map_err(|e| e.to_string())?;

    Ok((test_case, example))
}

/// Schema-valid placeholder pair for a record that could not be mapped.
///
/// Goes through the same fallible constructors as every other path, so a
/// placeholder can never bypass the entity invariants.
fn minimal_pair(
    backend: &str,
    use_case: &UseCase,
    case: &str,
    index: usize,
) -> Result<(TestCase, DatasetExample), ModelError> {
    let tc_id = test_case_id(&use_case.id, DialogFormat::SingleTurnQa, index);
    let axes = vec!["tone".to_string(), "adversarial".to_string()];
    let mut parameters = BTreeMap::new();
    parameters.insert("tone".to_string(), "neutral".to_string());
    parameters.insert("adversarial".to_string(), "none".to_string());
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "generator".to_string(),
        Value::String(format!("backend:{backend}")),
    );
    metadata.insert("degraded".to_string(), Value::Bool(true));

    let test_case = TestCase::new(
        &tc_id,
        &use_case.id,
        format!("{backend} placeholder {index}"),
        "Placeholder for a record that could not be adapted".to_string(),
        axes,
        parameters,
        vec![FALLBACK_POLICY_ID.to_string()],
        metadata.clone(),
    )?;

    let input = InputData::new(vec![DialogMessage::user("placeholder question")], None)?;
    let example = DatasetExample::new(
        example_id(&tc_id),
        case,
        DialogFormat::SingleTurnQa,
        &use_case.id,
        &tc_id,
        input,
        "placeholder answer".to_string(),
        GENERIC_CRITERIA.iter().map(|s| s.to_string()).collect(),
        vec![FALLBACK_POLICY_ID.to_string()],
        metadata,
    )?;

    Ok((test_case, example))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Evidence;

    fn use_case() -> UseCase {
        UseCase::new(
            "uc_001",
            "Order status",
            "The user asks where an order is.",
            vec![Evidence::new("rules.md", 1, 1, "quote").unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn golden_record_adapts_cleanly() {
        let record = NativeRecord::Golden(GoldenRecord {
            input: Some("Where is order 4711?".to_string()),
            actual_output: None,
            expected_output: Some("It ships tomorrow.".to_string()),
            context: vec!["pol_002: answer order questions".to_string()],
        });
        let adapted = adapt_record("deepeval", &record, &use_case(), "support_bot", 7).unwrap();
        assert!(!adapted.is_degraded());
        let (test_case, example) = adapted.into_parts();
        assert_eq!(test_case.id, "tc_001_single_turn_qa_007");
        assert_eq!(example.test_case_id, test_case.id);
        assert_eq!(example.policy_ids, vec!["pol_002"]);
        assert_eq!(test_case.validate().ok(), Some(()));
        assert_eq!(example.validate().ok(), Some(()));
    }

    #[test]
    fn golden_field_precedence_falls_back_to_actual_output() {
        let record = NativeRecord::Golden(GoldenRecord {
            input: None,
            actual_output: Some("What is the refund window?".to_string()),
            expected_output: None,
            context: vec![],
        });
        let adapted = adapt_record("deepeval", &record, &use_case(), "support_bot", 0).unwrap();
        let (_, example) = adapted.into_parts();
        assert_eq!(
            example.input.messages[0].content,
            "What is the refund window?"
        );
        assert_eq!(example.policy_ids, vec![FALLBACK_POLICY_ID]);
    }

    #[test]
    fn reasoning_evolution_selects_reasoning_criteria() {
        let mut columns = BTreeMap::new();
        columns.insert("question".to_string(), Value::String("Why?".to_string()));
        columns.insert(
            "ground_truth".to_string(),
            Value::String("Because.".to_string()),
        );
        columns.insert(
            "evolution_type".to_string(),
            Value::String("reasoning".to_string()),
        );
        let record = NativeRecord::Tabular(TabularRow { columns });
        let (_, example) = adapt_record("ragas", &record, &use_case(), "support_bot", 0)
            .unwrap()
            .into_parts();
        assert!(example.evaluation_criteria[0].contains("reasoning"));
    }

    #[test]
    fn tabular_precedence_tries_user_input_column() {
        let mut columns = BTreeMap::new();
        columns.insert(
            "user_input".to_string(),
            Value::String("Can I pay cash?".to_string()),
        );
        let record = NativeRecord::Tabular(TabularRow { columns });
        let (_, example) = adapt_record("ragas", &record, &use_case(), "support_bot", 0)
            .unwrap()
            .into_parts();
        assert_eq!(example.input.messages[0].content, "Can I pay cash?");
    }

    #[test]
    fn empty_question_degrades_to_placeholder() {
        let record = NativeRecord::Question(QuestionRow {
            question: Some("   ".to_string()),
            reference_answer: None,
            metadata: BTreeMap::new(),
        });
        let adapted = adapt_record("giskard", &record, &use_case(), "support_bot", 3).unwrap();
        assert!(adapted.is_degraded());
        let (test_case, example) = adapted.into_parts();
        // Placeholder is still schema-valid and keeps the index position.
        assert_eq!(test_case.validate().ok(), Some(()));
        assert_eq!(example.validate().ok(), Some(()));
        assert_eq!(test_case.id, "tc_001_single_turn_qa_003");
    }

    #[test]
    fn policy_ids_are_deduplicated() {
        let ids = extract_policy_ids("see pol_003 and pol_001, also pol_003 again");
        assert_eq!(ids, vec!["pol_001", "pol_003"]);
    }

    #[test]
    fn builtin_backends_have_distinct_tool_names() {
        let backends = builtin_backends();
        let names: Vec<_> = backends.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["deepeval", "ragas", "giskard"]);
        for backend in &backends {
            assert_eq!(backend.tool_spec().name, backend.name());
        }
    }
}
