//! Core entity definitions: use cases, policies, test cases, and examples.
//!
//! The artifact graph is rooted at [`UseCase`] and fans out to [`TestCase`]
//! and [`DatasetExample`]; [`Policy`] entities are referenced, never owned,
//! by downstream artifacts. All entities are immutable after construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

/// ID prefix for use cases.
pub const USE_CASE_PREFIX: &str = "uc_";
/// ID prefix for policies.
pub const POLICY_PREFIX: &str = "pol_";
/// ID prefix for test cases.
pub const TEST_CASE_PREFIX: &str = "tc_";
/// ID prefix for dataset examples.
pub const EXAMPLE_PREFIX: &str = "ex_";

/// Role tag for end-user messages in example inputs.
pub const ROLE_USER: &str = "user";
/// Role tag for operator messages in example inputs.
pub const ROLE_OPERATOR: &str = "operator";

/// Free-form metadata attached to generated artifacts.
///
/// `BTreeMap` keeps serialized output stable across runs.
pub type Metadata = BTreeMap<String, serde_json::Value>;

fn require_prefix(prefix: &'static str, id: &str) -> Result<(), ModelError> {
    if id.starts_with(prefix) && id.len() > prefix.len() {
        Ok(())
    } else {
        Err(ModelError::InvalidIdPrefix {
            prefix,
            id: id.to_string(),
        })
    }
}

// ============================================================================
// Evidence
// ============================================================================

/// A citation into the source document backing an extracted entity.
///
/// Line numbers are 1-based and inclusive. Whether `quote` actually matches
/// the cited lines is checked by the extraction layer, not here; this type
/// only guarantees the range and quote are well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Path of the source document the quote was taken from.
    pub input_file: String,
    /// First cited line, 1-based.
    pub line_start: usize,
    /// Last cited line, inclusive.
    pub line_end: usize,
    /// Verbatim quote from the cited range.
    pub quote: String,
}

impl Evidence {
    pub fn new(
        input_file: impl Into<String>,
        line_start: usize,
        line_end: usize,
        quote: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let evidence = Self {
            input_file: input_file.into(),
            line_start,
            line_end,
            quote: quote.into(),
        };
        evidence.validate()?;
        Ok(evidence)
    }

    /// Re-checks the structural invariants, e.g. after deserialization.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.line_start < 1 || self.line_end < self.line_start {
            return Err(ModelError::InvalidLineRange {
                start: self.line_start,
                end: self.line_end,
            });
        }
        if self.quote.trim().is_empty() {
            return Err(ModelError::EmptyQuote);
        }
        Ok(())
    }
}

// ============================================================================
// Use cases and policies
// ============================================================================

/// A discrete user goal or system behavior extracted from the source document.
///
/// Root of the artifact graph; created once by extraction and immutable
/// afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseCase {
    pub id: String,
    pub name: String,
    pub description: String,
    pub evidence: Vec<Evidence>,
}

impl UseCase {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        evidence: Vec<Evidence>,
    ) -> Result<Self, ModelError> {
        let use_case = Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            evidence,
        };
        use_case.validate()?;
        Ok(use_case)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require_prefix(USE_CASE_PREFIX, &self.id)?;
        if self.evidence.is_empty() {
            return Err(ModelError::EmptyEvidence(self.id.clone()));
        }
        for item in &self.evidence {
            item.validate()?;
        }
        Ok(())
    }
}

/// Classification of a policy statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// An obligation: the system must do this.
    Must,
    /// A prohibition: the system must never do this.
    MustNot,
    /// A trigger that requires escalation to a human.
    Escalate,
    /// A tone/style rule.
    Style,
    /// An output-format rule.
    Format,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Must => "must",
            PolicyKind::MustNot => "must_not",
            PolicyKind::Escalate => "escalate",
            PolicyKind::Style => "style",
            PolicyKind::Format => "format",
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PolicyKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "must" => Ok(PolicyKind::Must),
            "must_not" | "must not" => Ok(PolicyKind::MustNot),
            "escalate" => Ok(PolicyKind::Escalate),
            "style" => Ok(PolicyKind::Style),
            "format" => Ok(PolicyKind::Format),
            other => Err(ModelError::UnknownPolicyKind(other.to_string())),
        }
    }
}

/// A business rule extracted from the source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    /// The rule itself, in the wording of the source document.
    pub statement: String,
    #[serde(rename = "type")]
    pub kind: PolicyKind,
    pub evidence: Vec<Evidence>,
    /// Case/domain this policy applies to, when the document scopes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
}

impl Policy {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        statement: impl Into<String>,
        kind: PolicyKind,
        evidence: Vec<Evidence>,
        case: Option<String>,
    ) -> Result<Self, ModelError> {
        let policy = Self {
            id: id.into(),
            name: name.into(),
            statement: statement.into(),
            kind,
            evidence,
            case,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require_prefix(POLICY_PREFIX, &self.id)?;
        if self.evidence.is_empty() {
            return Err(ModelError::EmptyEvidence(self.id.clone()));
        }
        for item in &self.evidence {
            item.validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// Dialog formats and example input
// ============================================================================

/// The fixed set of interaction shapes a dataset example can take.
///
/// The set is closed: generation dispatches over these three variants by
/// lookup, no open-ended extension point exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogFormat {
    /// One user question, one expected answer.
    SingleTurnQa,
    /// One operator utterance to be corrected.
    SingleUtteranceCorrection,
    /// A multi-turn dialog whose final operator turn is to be corrected.
    DialogLastTurnCorrection,
}

impl DialogFormat {
    pub const ALL: [DialogFormat; 3] = [
        DialogFormat::SingleTurnQa,
        DialogFormat::SingleUtteranceCorrection,
        DialogFormat::DialogLastTurnCorrection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialogFormat::SingleTurnQa => "single_turn_qa",
            DialogFormat::SingleUtteranceCorrection => "single_utterance_correction",
            DialogFormat::DialogLastTurnCorrection => "dialog_last_turn_correction",
        }
    }
}

impl std::fmt::Display for DialogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DialogFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "single_turn_qa" => Ok(DialogFormat::SingleTurnQa),
            "single_utterance_correction" => Ok(DialogFormat::SingleUtteranceCorrection),
            "dialog_last_turn_correction" => Ok(DialogFormat::DialogLastTurnCorrection),
            other => Err(ModelError::UnknownFormat(other.to_string())),
        }
    }
}

/// One role-tagged message inside an example input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogMessage {
    pub role: String,
    pub content: String,
}

impl DialogMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Creates an end-user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ROLE_USER, content)
    }

    /// Creates an operator message.
    pub fn operator(content: impl Into<String>) -> Self {
        Self::new(ROLE_OPERATOR, content)
    }
}

/// The input side of a dataset example.
///
/// When `target_message_index` is present it must be in range and must point
/// at an operator message; correction formats use it to mark the turn under
/// evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputData {
    pub messages: Vec<DialogMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_message_index: Option<usize>,
}

impl InputData {
    pub fn new(
        messages: Vec<DialogMessage>,
        target_message_index: Option<usize>,
    ) -> Result<Self, ModelError> {
        let input = Self {
            messages,
            target_message_index,
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.messages.is_empty() {
            return Err(ModelError::EmptyMessages);
        }
        if let Some(index) = self.target_message_index {
            let Some(message) = self.messages.get(index) else {
                return Err(ModelError::TargetIndexOutOfRange {
                    index,
                    len: self.messages.len(),
                });
            };
            if message.role != ROLE_OPERATOR {
                return Err(ModelError::TargetIndexNotOperator {
                    index,
                    role: message.role.clone(),
                });
            }
        }
        Ok(())
    }

    /// Content of the first user-role message, if any.
    pub fn primary_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == ROLE_USER)
            .map(|m| m.content.as_str())
    }
}

// ============================================================================
// Test cases and examples
// ============================================================================

/// A parameterized variation of a use case along 2-3 labeled axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub use_case_id: String,
    pub name: String,
    pub description: String,
    /// The 2-3 axes this variation is exercising. Hard cardinality invariant.
    pub parameter_variation_axes: Vec<String>,
    /// Full axis -> value assignment for the variation.
    pub parameters: BTreeMap<String, String>,
    pub policy_ids: Vec<String>,
    /// Must record which generation path produced the test case
    /// (`generator` key).
    pub metadata: Metadata,
}

impl TestCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        use_case_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        parameter_variation_axes: Vec<String>,
        parameters: BTreeMap<String, String>,
        policy_ids: Vec<String>,
        metadata: Metadata,
    ) -> Result<Self, ModelError> {
        let test_case = Self {
            id: id.into(),
            use_case_id: use_case_id.into(),
            name: name.into(),
            description: description.into(),
            parameter_variation_axes,
            parameters,
            policy_ids,
            metadata,
        };
        test_case.validate()?;
        Ok(test_case)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require_prefix(TEST_CASE_PREFIX, &self.id)?;
        require_prefix(USE_CASE_PREFIX, &self.use_case_id)?;
        let count = self.parameter_variation_axes.len();
        if !(2..=3).contains(&count) {
            return Err(ModelError::AxisCardinality {
                id: self.id.clone(),
                count,
            });
        }
        for policy_id in &self.policy_ids {
            require_prefix(POLICY_PREFIX, policy_id)?;
        }
        Ok(())
    }
}

/// One concrete labeled input/expected-output instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetExample {
    pub id: String,
    /// Case/domain identifier the example belongs to.
    pub case: String,
    pub format: DialogFormat,
    pub use_case_id: String,
    pub test_case_id: String,
    pub input: InputData,
    pub expected_output: String,
    /// What an evaluator should score. Minimum 3 items, hard invariant.
    pub evaluation_criteria: Vec<String>,
    /// Policies the example exercises. Minimum 1, each `pol_`-prefixed.
    pub policy_ids: Vec<String>,
    pub metadata: Metadata,
}

impl DatasetExample {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        case: impl Into<String>,
        format: DialogFormat,
        use_case_id: impl Into<String>,
        test_case_id: impl Into<String>,
        input: InputData,
        expected_output: impl Into<String>,
        evaluation_criteria: Vec<String>,
        policy_ids: Vec<String>,
        metadata: Metadata,
    ) -> Result<Self, ModelError> {
        let example = Self {
            id: id.into(),
            case: case.into(),
            format,
            use_case_id: use_case_id.into(),
            test_case_id: test_case_id.into(),
            input,
            expected_output: expected_output.into(),
            evaluation_criteria,
            policy_ids,
            metadata,
        };
        example.validate()?;
        Ok(example)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require_prefix(EXAMPLE_PREFIX, &self.id)?;
        require_prefix(USE_CASE_PREFIX, &self.use_case_id)?;
        require_prefix(TEST_CASE_PREFIX, &self.test_case_id)?;
        self.input.validate()?;
        if self.evaluation_criteria.len() < 3 {
            return Err(ModelError::TooFewCriteria {
                id: self.id.clone(),
                count: self.evaluation_criteria.len(),
            });
        }
        if self.policy_ids.is_empty() {
            return Err(ModelError::EmptyPolicyIds {
                id: self.id.clone(),
            });
        }
        for policy_id in &self.policy_ids {
            require_prefix(POLICY_PREFIX, policy_id)?;
        }
        Ok(())
    }

    /// Which generation path produced this example, from metadata.
    pub fn generator(&self) -> Option<&str> {
        self.metadata.get("generator").and_then(|v| v.as_str())
    }
}

// ============================================================================
// ID minting
// ============================================================================

/// Mints a test-case ID scoped by use case, format, and position.
///
/// `uc_042` + qa format + index 3 becomes `tc_042_single_turn_qa_003`.
pub fn test_case_id(use_case_id: &str, format: DialogFormat, index: usize) -> String {
    let base = use_case_id
        .strip_prefix(USE_CASE_PREFIX)
        .unwrap_or(use_case_id);
    format!("{TEST_CASE_PREFIX}{base}_{format}_{index:03}")
}

/// Mints an example ID under a test case, with a short random suffix so
/// multiple examples per test case stay unique.
pub fn example_id(test_case_id: &str) -> String {
    let base = test_case_id
        .strip_prefix(TEST_CASE_PREFIX)
        .unwrap_or(test_case_id);
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{EXAMPLE_PREFIX}{base}_{}", &suffix[..8])
}

/// Classification of where a support-bot example's input plausibly came
/// from, attached as example metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Looks like a real support ticket.
    Tickets,
    /// Paraphrase of an FAQ entry.
    FaqParaphrase,
    /// Adversarial or degenerate input.
    Corner,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Tickets => "tickets",
            SourceKind::FaqParaphrase => "faq_paraphrase",
            SourceKind::Corner => "corner",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
