use super::{compile_pattern, str_field};
use agentflow_core::resolve::joined_input;
use agentflow_core::{CanvasNode, NodeContext, NodeError, NodeExecutor, NodeFuture, NodeOutput};
use regex::Regex;

const DEFAULT_BRANCH: &str = "default";

/// Picks the branch of the first rule whose pattern matches the input.
pub struct DecisionTreeExecutor;

fn rules(node: &CanvasNode) -> Result<Vec<(Regex, String)>, NodeError> {
    node.data_array("rules")
        .iter()
        .filter_map(|rule| Some((str_field(rule, "pattern")?, str_field(rule, "branch")?)))
        .map(|(pattern, branch)| Ok((compile_pattern(pattern, false)?, branch.to_string())))
        .collect()
}

impl NodeExecutor for DecisionTreeExecutor {
    fn kind(&self) -> &str {
        "decision-tree"
    }

    fn execute<'a>(&'a self, ctx: NodeContext<'a>) -> NodeFuture<'a> {
        Box::pin(async move {
            let node = ctx.current_node;
            let rules = rules(node)?;
            let input = joined_input(&ctx);

            let branch = rules
                .iter()
                .find(|(pattern, _)| pattern.is_match(&input))
                .map(|(_, branch)| branch.as_str())
                .or_else(|| node.data_text("defaultBranch"))
                .unwrap_or(DEFAULT_BRANCH);

            tracing::debug!(node_id = %node.id, branch = %branch, "branch selected");
            Ok(NodeOutput::text(branch))
        })
    }

    fn validate(&self, node: &CanvasNode) -> bool {
        rules(node).is_ok()
    }
}
