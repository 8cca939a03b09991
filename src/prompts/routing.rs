//! Prompt for the synthesis-backend tool-routing call.

use crate::llm::tools::ToolSpec;

/// System prompt for backend selection.
pub const ROUTING_SYSTEM: &str = "\
You decide which, if any, dataset-synthesis tools to invoke to supplement an \
under-covered use case. Selecting no tools is a valid answer. Reply with \
JSON only, no prose.";

/// Builds the user prompt offering `tools` for the given use-case summary.
pub fn build_routing_prompt(use_case_summary: &str, tools: &[ToolSpec]) -> String {
    let mut tool_block = String::new();
    for tool in tools {
        tool_block.push_str(&format!(
            "- {}: {}\n  parameters schema: {}\n",
            tool.name, tool.description, tool.parameters
        ));
    }

    format!(
        r#"A use case did not reach its minimum test-case count through the
primary generation path.

Use case summary:
{use_case_summary}

Available tools:
{tool_block}
Select zero or more tools to invoke, with arguments matching each tool's
parameter schema.

Reply with this JSON shape:
{{
  "invocations": [
    {{"name": "tool name", "arguments": {{}}}}
  ]
}}"#
    )
}
