//! Tool-routing call for synthesis-backend selection.
//!
//! The orchestrator describes each available backend as a named tool with a
//! JSON-schema parameter block and asks the model which, if any, to invoke
//! for a given use case. Zero selections is a valid outcome; unknown tool
//! names in the reply are dropped with a warning.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LlmError;
use crate::llm::client::{LlmProvider, ModelConfig};
use crate::llm::structured::generate_structured;
use crate::prompts::routing::{build_routing_prompt, ROUTING_SYSTEM};

/// A named backend-invocation tool offered to the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool's arguments.
    pub parameters: serde_json::Value,
}

/// One selected tool invocation from the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RoutingReply {
    #[serde(default)]
    invocations: Vec<ToolInvocation>,
}

/// Asks the model which of `tools` to invoke for the given use-case summary.
///
/// Returns the selected invocations in reply order, filtered to names that
/// actually exist in `tools`. An empty list means the model chose not to
/// supplement.
pub async fn route_tools(
    provider: &dyn LlmProvider,
    config: &ModelConfig,
    use_case_summary: &str,
    tools: &[ToolSpec],
) -> Result<Vec<ToolInvocation>, LlmError> {
    if tools.is_empty() {
        return Ok(Vec::new());
    }

    let prompt = build_routing_prompt(use_case_summary, tools);
    let reply: RoutingReply =
        generate_structured(provider, config, ROUTING_SYSTEM, &prompt).await?;

    let selected = reply
        .invocations
        .into_iter()
        .filter(|invocation| {
            let known = tools.iter().any(|t| t.name == invocation.name);
            if !known {
                warn!(tool = %invocation.name, "Router selected unknown tool, dropping");
            }
            known
        })
        .collect();

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::llm::client::{Choice, GenerationRequest, GenerationResponse, Message};

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

    fn tools() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "deepeval".to_string(),
                description: "Golden-based synthesis".to_string(),
                parameters: json!({"type": "object", "properties": {"count": {"type": "integer"}}}),
            },
            ToolSpec {
                name: "ragas".to_string(),
                description: "Tabular synthesis".to_string(),
                parameters: json!({"type": "object"}),
            },
        ]
    }

    #[tokio::test]
    async fn returns_selected_invocations_in_order() {
        let provider = CannedProvider {
            reply: json!({
                "invocations": [
                    {"name": "ragas", "arguments": {}},
                    {"name": "deepeval", "arguments": {"count": 5}},
                ]
            })
            .to_string(),
        };
        let selected = route_tools(&provider, &ModelConfig::default(), "summary", &tools())
            .await
            .unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].name, "ragas");
        assert_eq!(selected[1].arguments["count"], 5);
    }

    #[tokio::test]
    async fn tolerates_zero_selections() {
        let provider = CannedProvider {
            reply: json!({"invocations": []}).to_string(),
        };
        let selected = route_tools(&provider, &ModelConfig::default(), "summary", &tools())
            .await
            .unwrap();
        assert!(selected.is_empty());
    }

    #[tokio::test]
    async fn drops_unknown_tool_names() {
        let provider = CannedProvider {
            reply: json!({
                "invocations": [
                    {"name": "made_up_engine", "arguments": {}},
                    {"name": "deepeval", "arguments": {}},
                ]
            })
            .to_string(),
        };
        let selected = route_tools(&provider, &ModelConfig::default(), "summary", &tools())
            .await
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "deepeval");
    }

    #[tokio::test]
    async fn empty_tool_set_short_circuits() {
        let provider = CannedProvider {
            reply: "never called".to_string(),
        };
        let selected = route_tools(&provider, &ModelConfig::default(), "summary", &[])
            .await
            .unwrap();
        assert!(selected.is_empty());
    }
}
