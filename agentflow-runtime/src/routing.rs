//! Conditional routing of outgoing edges.

use agentflow_core::{CanvasNode, Connection, NodeOutput};
use serde_json::Value;

pub const TRUE_PATH: &str = "true-path";
pub const FALSE_PATH: &str = "false-path";

/// Text a router's output is compared against: the string itself, else a
/// string `output` field, else compact JSON.
pub fn coerce_output(output: &NodeOutput) -> String {
    match output {
        NodeOutput::Text(text) => text.clone(),
        other => match other.field("output") {
            Some(Value::String(text)) => text.clone(),
            _ => other.to_json_string(),
        },
    }
}

/// How a finished node's outgoing edges are selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Every outgoing edge fires.
    All,
    /// Only `true-path` or only `false-path` edges fire; `None` fires nothing.
    Branch(Option<bool>),
    /// Edges whose `sourceOutput` equals the key fire.
    Match(String),
}

impl Route {
    /// Routing is keyed on the node's subtype only.
    pub fn for_node(node: &CanvasNode, output: &NodeOutput) -> Self {
        match node.subtype.as_deref() {
            Some("if-else") => match coerce_output(output).as_str() {
                "true" => Route::Branch(Some(true)),
                "false" => Route::Branch(Some(false)),
                _ => Route::Branch(None),
            },
            Some("decision-tree") => Route::Match(coerce_output(output)),
            _ => Route::All,
        }
    }

    pub fn fires(&self, conn: &Connection) -> bool {
        let port = conn.source_output.as_deref();
        match self {
            Route::All => true,
            Route::Branch(Some(true)) => port == Some(TRUE_PATH),
            Route::Branch(Some(false)) => port == Some(FALSE_PATH),
            Route::Branch(None) => false,
            Route::Match(key) => port == Some(key.as_str()),
        }
    }
}
