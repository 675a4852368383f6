use super::agent::{build_prompt, complete};
use super::str_field;
use agentflow_core::resolve::format_input_context;
use agentflow_core::{CanvasNode, LlmProvider, NodeContext, NodeExecutor, NodeFuture, NodeOutput};
use serde_json::{Map, Value};
use std::sync::Arc;

struct Tool<'a> {
    name: &'a str,
    description: &'a str,
}

fn tools(node: &CanvasNode) -> Vec<Tool<'_>> {
    node.data_array("tools")
        .iter()
        .filter_map(|tool| {
            Some(Tool {
                name: str_field(tool, "name").filter(|n| !n.trim().is_empty())?,
                description: str_field(tool, "description").unwrap_or_default(),
            })
        })
        .collect()
}

fn tool_listing(tools: &[Tool<'_>]) -> String {
    if tools.is_empty() {
        return String::new();
    }
    let mut listing = String::from("Available tools:");
    for tool in tools {
        if tool.description.is_empty() {
            listing.push_str(&format!("\n- {}", tool.name));
        } else {
            listing.push_str(&format!("\n- {}: {}", tool.name, tool.description));
        }
    }
    listing
}

/// Agent that is told which tools exist and reports the one it chose.
pub struct ToolAgentExecutor {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl ToolAgentExecutor {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { provider }
    }
}

impl NodeExecutor for ToolAgentExecutor {
    fn kind(&self) -> &str {
        "tool-agent"
    }

    fn execute<'a>(&'a self, ctx: NodeContext<'a>) -> NodeFuture<'a> {
        Box::pin(async move {
            let node = ctx.current_node;
            let tools = tools(node);
            let listing = tool_listing(&tools);
            let input = format_input_context(&ctx);
            let prompt = build_prompt(node, &[&listing, &input]);

            let response = complete(self.provider.as_ref(), &ctx, self.kind(), prompt).await?;

            let reply = response.text.to_lowercase();
            let selected = tools
                .iter()
                .find(|tool| reply.contains(&tool.name.to_lowercase()))
                .map(|tool| tool.name.to_string());

            let mut out = Map::new();
            out.insert("output".to_string(), Value::String(response.text));
            if let Some(name) = selected {
                out.insert("selectedTool".to_string(), Value::String(name));
            }
            out.insert("llm".to_string(), response.raw);
            Ok(NodeOutput::Object(out))
        })
    }
}
