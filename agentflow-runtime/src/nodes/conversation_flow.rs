use super::{compile_pattern, object, str_field};
use agentflow_context::ConversationStore;
use agentflow_core::resolve::get_input_values;
use agentflow_core::{CanvasNode, NodeContext, NodeError, NodeExecutor, NodeFuture};
use regex::Regex;
use serde_json::Value;

const DEFAULT_HISTORY_LENGTH: usize = 5;

fn context_rules(node: &CanvasNode) -> Result<Vec<(Regex, String)>, NodeError> {
    node.data_array("contextRules")
        .iter()
        .filter_map(|rule| Some((str_field(rule, "pattern")?, str_field(rule, "context")?)))
        .map(|(pattern, context)| Ok((compile_pattern(pattern, false)?, context.to_string())))
        .collect()
}

/// Keeps a rolling message history per node and tags it with context rules.
pub struct ConversationFlowExecutor {
    histories: ConversationStore,
}

impl ConversationFlowExecutor {
    pub fn new(histories: ConversationStore) -> Self {
        Self { histories }
    }

    pub fn histories(&self) -> &ConversationStore {
        &self.histories
    }
}

impl NodeExecutor for ConversationFlowExecutor {
    fn kind(&self) -> &str {
        "conversation-flow"
    }

    fn execute<'a>(&'a self, ctx: NodeContext<'a>) -> NodeFuture<'a> {
        Box::pin(async move {
            let node = ctx.current_node;
            let rules = context_rules(node)?;
            // 0 keeps the whole history
            let limit = node
                .data_u64("historyLength")
                .map(|n| n as usize)
                .unwrap_or(DEFAULT_HISTORY_LENGTH);
            let message = get_input_values(&ctx).join("\n");

            let history = self
                .histories
                .update(&node.id, |history| {
                    if !message.is_empty() {
                        history.push(message);
                    }
                    if limit > 0 && history.len() > limit {
                        let excess = history.len() - limit;
                        history.drain(..excess);
                    }
                    history.clone()
                })
                .await;

            let active: Vec<Value> = rules
                .iter()
                .filter(|(pattern, _)| history.iter().any(|line| pattern.is_match(line)))
                .map(|(_, context)| Value::String(context.clone()))
                .collect();

            Ok(object([
                (
                    "history",
                    Value::Array(history.into_iter().map(Value::String).collect()),
                ),
                ("context", Value::Array(active)),
            ]))
        })
    }

    fn validate(&self, node: &CanvasNode) -> bool {
        context_rules(node).is_ok()
    }
}
