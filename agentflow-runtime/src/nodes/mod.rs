//! Built-in node executors.

mod agent;
mod conversation_flow;
mod decision_tree;
mod if_else;
mod knowledge_base;
mod message;
mod prompt_template;
mod state_machine;
mod template;
mod tool_agent;

#[cfg(test)]
mod tests;

pub use agent::AgentExecutor;
pub use conversation_flow::ConversationFlowExecutor;
pub use decision_tree::DecisionTreeExecutor;
pub use if_else::{Condition, IfElseExecutor, Operator};
pub use knowledge_base::KnowledgeBaseExecutor;
pub use message::MessageExecutor;
pub use prompt_template::PromptTemplateExecutor;
pub use state_machine::StateMachineExecutor;
pub use template::render_template;
pub use tool_agent::ToolAgentExecutor;

use agentflow_core::NodeError;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

/// Compiles a user-supplied pattern, case-insensitive unless asked otherwise.
pub(crate) fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<Regex, NodeError> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|source| NodeError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Reads a string field from a JSON object entry.
pub(crate) fn str_field<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value.get(key).and_then(Value::as_str)
}

/// `{ key: value, ... }` object output.
pub(crate) fn object<I>(entries: I) -> agentflow_core::NodeOutput
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    agentflow_core::NodeOutput::Object(
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}
