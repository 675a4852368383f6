//! Per-execution context handed to node executors.

use crate::model::{CanvasNode, Connection, NodeOutput};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Namespaced outputs of every transitive upstream node, keyed by node id.
pub type FlowContextBag = BTreeMap<String, NodeOutput>;

/// How a node's inputs were assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowMode {
    /// Inputs are derived from connections and the cumulative output map.
    #[serde(rename = "LegacyMode")]
    Legacy,
    /// Inputs arrive pre-resolved in the `inputs` map.
    #[serde(rename = "NewMode")]
    V2,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Scenario overrides supplied with a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<WorkingHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_rules: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Scenario>,
}

/// Diagnostics an executor may attach to its completion event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_raw: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
}

/// Write-once-per-execution slot for [`DebugInfo`].
#[derive(Debug, Default)]
pub struct DebugSlot(Mutex<Option<DebugInfo>>);

impl DebugSlot {
    pub fn set(&self, info: DebugInfo) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = Some(info);
        }
    }

    pub fn take(&self) -> Option<DebugInfo> {
        self.0.lock().ok().and_then(|mut guard| guard.take())
    }
}

/// Everything an executor may read while running one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    pub nodes: &'a [CanvasNode],
    pub connections: &'a [Connection],
    pub node_outputs: &'a HashMap<String, NodeOutput>,
    pub current_node: &'a CanvasNode,
    pub inputs: Option<&'a BTreeMap<String, NodeOutput>>,
    pub config: Option<&'a Value>,
    pub flow_context: Option<&'a FlowContextBag>,
    pub run_options: Option<&'a RunOptions>,
    pub mode: Option<FlowMode>,
    pub debug: Option<&'a DebugSlot>,
}

impl<'a> NodeContext<'a> {
    pub fn new(
        nodes: &'a [CanvasNode],
        connections: &'a [Connection],
        node_outputs: &'a HashMap<String, NodeOutput>,
        current_node: &'a CanvasNode,
    ) -> Self {
        Self {
            nodes,
            connections,
            node_outputs,
            current_node,
            inputs: None,
            config: None,
            flow_context: None,
            run_options: None,
            mode: None,
            debug: None,
        }
    }

    pub fn with_inputs(mut self, inputs: &'a BTreeMap<String, NodeOutput>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn with_config(mut self, config: &'a Value) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_flow_context(mut self, flow_context: &'a FlowContextBag) -> Self {
        self.flow_context = Some(flow_context);
        self
    }

    pub fn with_run_options(mut self, run_options: Option<&'a RunOptions>) -> Self {
        self.run_options = run_options;
        self
    }

    pub fn with_mode(mut self, mode: FlowMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_debug(mut self, debug: &'a DebugSlot) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn scenario(&self) -> Option<&'a Scenario> {
        self.run_options.and_then(|o| o.scenario.as_ref())
    }

    pub fn record_debug(&self, info: DebugInfo) {
        if let Some(slot) = self.debug {
            slot.set(info);
        }
    }
}
