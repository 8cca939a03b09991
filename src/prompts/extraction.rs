//! Prompts for extracting use cases and policies from a source document.
//!
//! Both extraction calls receive the document with 1-based line numbers so
//! the model can cite exact evidence spans.

/// System prompt for use-case extraction.
pub const USE_CASE_EXTRACTION_SYSTEM: &str = "\
You are a requirements analyst. You read operating instructions for a \
customer-facing assistant and extract the discrete use cases it describes. \
Reply with JSON only, no prose.";

/// System prompt for policy extraction.
pub const POLICY_EXTRACTION_SYSTEM: &str = "\
You are a requirements analyst. You read operating instructions for a \
customer-facing assistant and extract the business rules (policies) it \
imposes. Reply with JSON only, no prose.";

/// Builds the user prompt for use-case extraction over a numbered document.
pub fn build_use_case_prompt(numbered_document: &str) -> String {
    format!(
        r#"The document below has line numbers in the form "N: text".

Extract every distinct use case: a discrete user goal or system behavior the
document describes. For each one cite the exact lines that support it.

Reply with this JSON shape:
{{
  "use_cases": [
    {{
      "name": "short name",
      "description": "one-paragraph description",
      "evidence": [
        {{"line_start": 1, "line_end": 2, "quote": "verbatim quoted text"}}
      ]
    }}
  ]
}}

Rules:
- "quote" must be copied verbatim from the cited lines.
- Every use case needs at least one evidence citation.
- Do not invent behavior that the document does not describe.

Document:
{numbered_document}"#
    )
}

/// Builds the user prompt for policy extraction over a numbered document.
pub fn build_policy_prompt(numbered_document: &str) -> String {
    format!(
        r#"The document below has line numbers in the form "N: text".

Extract every business rule (policy) the document imposes. Classify each one:
- "must": an obligation
- "must_not": a prohibition
- "escalate": a trigger that requires escalation to a human
- "style": a tone or style rule
- "format": an output-format rule

Reply with this JSON shape:
{{
  "policies": [
    {{
      "name": "short name",
      "statement": "the rule, in the document's wording",
      "type": "must",
      "case": "optional case/domain the document scopes the rule to, else null",
      "evidence": [
        {{"line_start": 1, "line_end": 1, "quote": "verbatim quoted text"}}
      ]
    }}
  ]
}}

Rules:
- "quote" must be copied verbatim from the cited lines.
- Every policy needs at least one evidence citation.

Document:
{numbered_document}"#
    )
}
