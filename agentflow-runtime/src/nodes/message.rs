use super::render_template;
use agentflow_core::resolve::format_input_context;
use agentflow_core::{NodeContext, NodeExecutor, NodeFuture, NodeOutput};
use serde_json::Value;

/// Looks `key` up in the node's `variables` object.
pub(crate) fn variable(variables: Option<&Value>, key: &str) -> Option<String> {
    match variables?.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Emits a fixed or templated text message.
pub struct MessageExecutor;

impl NodeExecutor for MessageExecutor {
    fn kind(&self) -> &str {
        "message"
    }

    fn execute<'a>(&'a self, ctx: NodeContext<'a>) -> NodeFuture<'a> {
        Box::pin(async move {
            let node = ctx.current_node;
            let input = format_input_context(&ctx);

            let text = if let Some(template) = node.data_text("template") {
                let variables = node.data_value("variables");
                render_template(template, |key| match key {
                    "input" => Some(input.clone()),
                    other => variable(variables, other),
                })
            } else if let Some(message) = node
                .data_text("message")
                .or_else(|| node.data_text("content"))
            {
                message.to_string()
            } else {
                input
            };

            Ok(NodeOutput::text(text))
        })
    }
}
