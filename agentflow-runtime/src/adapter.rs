//! Engine events normalised for UI consumers.

use crate::engine::{EngineConfig, FlowEngine, NodeEvent};
use crate::registry::ExecutorRegistry;
use agentflow_core::{CanvasNode, Connection, DebugInfo, NodeOutput, RunOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// One finished node, as streamed to a UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub step_id: String,
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Epoch milliseconds.
    pub started_at: u64,
    pub ended_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<NodeOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStep {
    pub id: String,
    pub node_id: String,
    pub status: StepStatus,
    pub started_at: u64,
    pub ended_at: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<NodeOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn to_timeline(events: &[NormalizedEvent]) -> Vec<TimelineStep> {
    events
        .iter()
        .map(|e| TimelineStep {
            id: e.step_id.clone(),
            node_id: e.node_id.clone(),
            status: if e.error.is_some() {
                StepStatus::Error
            } else {
                StepStatus::Ok
            },
            started_at: e.started_at,
            ended_at: e.ended_at,
        })
        .collect()
}

/// Output, debug info and error of the last event.
pub fn to_inspector(events: &[NormalizedEvent]) -> InspectorPayload {
    events
        .last()
        .map(|e| InspectorPayload {
            output: e.output.clone(),
            debug: e.debug.clone(),
            error: e.error.clone(),
        })
        .unwrap_or_default()
}

fn epoch_ms(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Converts engine events, keeping timestamps non-decreasing across the stream.
#[derive(Debug, Default)]
pub struct EventNormalizer {
    last_ms: Mutex<u64>,
}

impl EventNormalizer {
    pub fn normalize(&self, event: NodeEvent) -> NormalizedEvent {
        let (started_at, ended_at) = match self.last_ms.lock() {
            Ok(mut last) => {
                let started = epoch_ms(event.started_at).max(*last);
                let ended = epoch_ms(event.ended_at).max(started);
                *last = ended;
                (started, ended)
            }
            Err(_) => {
                let started = epoch_ms(event.started_at);
                (started, epoch_ms(event.ended_at).max(started))
            }
        };

        NormalizedEvent {
            step_id: format!("{}-{}", ended_at, event.node_id),
            node_id: event.node_id,
            cause: Some(event.description),
            started_at,
            ended_at,
            output: Some(event.output),
            debug: event.debug,
            error: event.error,
        }
    }
}

/// Runs canvas graphs and streams [`NormalizedEvent`]s.
#[derive(Debug, Clone)]
pub struct EngineAdapter {
    registry: ExecutorRegistry,
    config: EngineConfig,
}

impl EngineAdapter {
    pub fn new(registry: ExecutorRegistry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    pub async fn run_flow(
        &self,
        nodes: Vec<CanvasNode>,
        edges: Vec<Connection>,
        start_node_id: Option<&str>,
        options: Option<RunOptions>,
        on_event: Option<&(dyn Fn(NormalizedEvent) + Send + Sync)>,
    ) -> HashMap<String, NodeOutput> {
        let mut engine =
            FlowEngine::new(nodes, edges, &self.registry).with_config(self.config.clone());
        if let Some(id) = start_node_id {
            engine.set_start_node(id);
        }
        if let Some(options) = options {
            engine = engine.with_run_options(options);
        }

        let normalizer = EventNormalizer::default();
        let forward = |event: NodeEvent| {
            if let Some(on_event) = on_event {
                on_event(normalizer.normalize(event));
            }
        };
        let sink: &(dyn Fn(NodeEvent) + Send + Sync) = &forward;
        engine.execute(Some(sink)).await
    }
}
