//! Prompts for example generation, fallback batches, and classification.

/// System prompt for format-adapter example generation.
pub const EXAMPLE_GENERATION_SYSTEM: &str = "\
You are a test-data designer. You produce one labeled evaluation example for \
a customer-support assistant, following the requested interaction shape \
exactly. Reply with JSON only, no prose.";

/// System prompt for the last-resort batch generator.
pub const FALLBACK_GENERATION_SYSTEM: &str = "\
You are a test-data designer. You produce a batch of labeled evaluation \
examples for a customer-support assistant. Every required field must be \
present; supply sensible defaults where the use case gives no detail. Reply \
with JSON only, no prose.";

/// System prompt for case/format detection.
pub const CASE_DETECTION_SYSTEM: &str = "\
You classify a use case into one of a fixed set of evaluation domains. \
Reply with JSON only, no prose.";

/// System prompt for source-kind classification.
pub const SOURCE_KIND_SYSTEM: &str = "\
You classify one user message from a support conversation. Reply with JSON \
only, no prose.";

/// Builds the user prompt for one format-adapter generation call.
///
/// `shape_instructions` carries the per-format message-shape rules;
/// `parameter_block` renders the variation's axis assignments as generation
/// constraints (tone, adversarial pressure, language, and so on).
pub fn build_example_prompt(
    shape_instructions: &str,
    use_case_name: &str,
    use_case_description: &str,
    policy_digest: &str,
    parameter_block: &str,
) -> String {
    format!(
        r#"Produce exactly one evaluation example.

Use case: {use_case_name}
{use_case_description}

Policies in force (cite the ids of every policy the example exercises):
{policy_digest}

Generation constraints from the parameter variation:
{parameter_block}

Interaction shape:
{shape_instructions}

Reply with this JSON shape:
{{
  "messages": [{{"role": "user", "content": "..."}}],
  "expected_output": "the ideal assistant response",
  "evaluation_criteria": ["at least three concrete scoring criteria"],
  "policy_ids": ["pol_..."]
}}"#
    )
}

/// Builds the user prompt for the last-resort direct generator.
pub fn build_fallback_prompt(
    use_case_name: &str,
    use_case_description: &str,
    policy_digest: &str,
    case: &str,
    count: usize,
) -> String {
    format!(
        r#"Produce exactly {count} evaluation examples for the "{case}" domain.

Use case: {use_case_name}
{use_case_description}

Policies in force (cite the ids of every policy each example exercises):
{policy_digest}

Each example is a single user question with an ideal answer. Vary tone and
difficulty across the batch.

Reply with this JSON shape:
{{
  "items": [
    {{
      "name": "short test-case name",
      "description": "what this example tests",
      "question": "the user message",
      "expected_output": "the ideal assistant response",
      "evaluation_criteria": ["at least three concrete scoring criteria"],
      "policy_ids": ["pol_..."]
    }}
  ]
}}"#
    )
}

/// Builds the user prompt classifying a use case into a known domain.
pub fn build_case_detection_prompt(
    use_case_name: &str,
    use_case_description: &str,
    known_cases: &[&str],
) -> String {
    let cases = known_cases.join(", ");
    format!(
        r#"Known domains: {cases}

Use case: {use_case_name}
{use_case_description}

Pick the single best-fitting domain.

Reply with this JSON shape:
{{"case": "one of the known domains"}}"#
    )
}

/// Builds the user prompt classifying a user message's plausible source.
pub fn build_source_kind_prompt(message: &str, use_case_description: &str) -> String {
    format!(
        r#"The assistant being evaluated handles this use case:
{use_case_description}

Classify the user message below as one of:
- "tickets": reads like a real support ticket
- "faq_paraphrase": a paraphrase of an FAQ-style question
- "corner": adversarial, degenerate, or otherwise a corner case

User message:
{message}

Reply with this JSON shape:
{{"kind": "tickets"}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_prompt_carries_all_sections() {
        let prompt = build_example_prompt(
            "Exactly one user message.",
            "Order status",
            "The user asks about an order.",
            "- pol_001: be polite",
            "- tone: aggressive",
        );
        assert!(prompt.contains("Order status"));
        assert!(prompt.contains("pol_001"));
        assert!(prompt.contains("tone: aggressive"));
        assert!(prompt.contains("Exactly one user message."));
    }

    #[test]
    fn fallback_prompt_states_exact_count() {
        let prompt = build_fallback_prompt("n", "d", "- pol_001", "support_bot", 4);
        assert!(prompt.contains("exactly 4"));
    }
}
