use super::{compile_pattern, object, str_field};
use agentflow_context::MachineStateStore;
use agentflow_core::resolve::joined_input;
use agentflow_core::{CanvasNode, NodeContext, NodeError, NodeExecutor, NodeFuture};
use regex::Regex;
use serde_json::Value;

const DEFAULT_INITIAL_STATE: &str = "initial";

struct Transition {
    from: String,
    to: String,
    on: Regex,
}

fn transitions(node: &CanvasNode) -> Result<Vec<Transition>, NodeError> {
    node.data_array("transitions")
        .iter()
        .filter_map(|t| {
            Some((
                str_field(t, "from")?,
                str_field(t, "to")?,
                str_field(t, "on").unwrap_or_default(),
            ))
        })
        .map(|(from, to, on)| {
            Ok(Transition {
                from: from.to_string(),
                to: to.to_string(),
                on: compile_pattern(on, false)?,
            })
        })
        .collect()
}

/// Finite state machine whose current state survives across runs.
pub struct StateMachineExecutor {
    states: MachineStateStore,
}

impl StateMachineExecutor {
    pub fn new(states: MachineStateStore) -> Self {
        Self { states }
    }

    pub fn states(&self) -> &MachineStateStore {
        &self.states
    }
}

impl NodeExecutor for StateMachineExecutor {
    fn kind(&self) -> &str {
        "state-machine"
    }

    fn execute<'a>(&'a self, ctx: NodeContext<'a>) -> NodeFuture<'a> {
        Box::pin(async move {
            let node = ctx.current_node;
            let transitions = transitions(node)?;
            let initial = node
                .data_text("initialState")
                .unwrap_or(DEFAULT_INITIAL_STATE)
                .to_string();
            let input = joined_input(&ctx);

            let (previous, state) = self
                .states
                .update(&node.id, |current| {
                    if current.is_empty() {
                        *current = initial;
                    }
                    let previous = current.clone();
                    if let Some(t) = transitions
                        .iter()
                        .find(|t| t.from == previous && t.on.is_match(&input))
                    {
                        *current = t.to.clone();
                    }
                    (previous, current.clone())
                })
                .await;

            let transitioned = previous != state;
            if transitioned {
                tracing::debug!(node_id = %node.id, from = %previous, to = %state, "state transition");
            }
            Ok(object([
                ("output", Value::String(state.clone())),
                ("state", Value::String(state)),
                ("previous", Value::String(previous)),
                ("transitioned", Value::Bool(transitioned)),
            ]))
        })
    }

    fn validate(&self, node: &CanvasNode) -> bool {
        transitions(node).is_ok()
    }
}
