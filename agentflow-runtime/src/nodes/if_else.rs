use super::compile_pattern;
use agentflow_core::resolve::joined_input;
use agentflow_core::{CanvasNode, NodeContext, NodeError, NodeExecutor, NodeFuture, NodeOutput};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Contains,
    NotContains,
    Equals,
    StartsWith,
    EndsWith,
    Regex,
    IsEmpty,
    NotEmpty,
}

impl Operator {
    pub fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "contains" => Operator::Contains,
            "not-contains" => Operator::NotContains,
            "equals" => Operator::Equals,
            "starts-with" => Operator::StartsWith,
            "ends-with" => Operator::EndsWith,
            "regex" => Operator::Regex,
            "is-empty" => Operator::IsEmpty,
            "not-empty" => Operator::NotEmpty,
            _ => return None,
        };
        Some(op)
    }
}

/// A deterministic test over a node's joined input text.
#[derive(Debug, Clone)]
pub struct Condition {
    operator: Operator,
    value: String,
    case_sensitive: bool,
    pattern: Option<Regex>,
}

impl Condition {
    /// Reads `operator`, `value` (or `condition`) and `caseSensitive`.
    pub fn from_node(node: &CanvasNode) -> Result<Self, NodeError> {
        let name = node.data_text("operator").unwrap_or("contains");
        let operator = Operator::parse(name)
            .ok_or_else(|| NodeError::config(&node.id, format!("unknown operator `{name}`")))?;
        let value = node
            .data_str("value")
            .or_else(|| node.data_str("condition"))
            .unwrap_or_default()
            .to_string();
        let case_sensitive = node.data_bool("caseSensitive").unwrap_or(false);
        let pattern = match operator {
            Operator::Regex => Some(compile_pattern(&value, case_sensitive)?),
            _ => None,
        };

        Ok(Self {
            operator,
            value,
            case_sensitive,
            pattern,
        })
    }

    pub fn evaluate(&self, input: &str) -> bool {
        let (input, value) = if self.case_sensitive {
            (input.to_string(), self.value.clone())
        } else {
            (input.to_lowercase(), self.value.to_lowercase())
        };

        match self.operator {
            Operator::Contains => input.contains(&value),
            Operator::NotContains => !input.contains(&value),
            Operator::Equals => input.trim() == value.trim(),
            Operator::StartsWith => input.trim_start().starts_with(&value),
            Operator::EndsWith => input.trim_end().ends_with(&value),
            Operator::Regex => self
                .pattern
                .as_ref()
                .map(|re| re.is_match(&input))
                .unwrap_or(false),
            Operator::IsEmpty => input.trim().is_empty(),
            Operator::NotEmpty => !input.trim().is_empty(),
        }
    }
}

/// Emits `"true"` or `"false"`; the engine routes on it.
pub struct IfElseExecutor;

impl NodeExecutor for IfElseExecutor {
    fn kind(&self) -> &str {
        "if-else"
    }

    fn execute<'a>(&'a self, ctx: NodeContext<'a>) -> NodeFuture<'a> {
        Box::pin(async move {
            let condition = Condition::from_node(ctx.current_node)?;
            let input = joined_input(&ctx);
            let result = condition.evaluate(&input);
            tracing::debug!(node_id = %ctx.current_node.id, result, "condition evaluated");
            Ok(NodeOutput::text(result.to_string()))
        })
    }

    fn validate(&self, node: &CanvasNode) -> bool {
        Condition::from_node(node).is_ok()
    }
}
