use agentflow_core::{CanvasNode, Connection, RunOptions, Scenario};
use agentflow_runtime::{EngineConfig, InputMode, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A saved canvas: nodes, connections and how to run them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<CanvasNode>,
    #[serde(default, alias = "edges")]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_node_id: Option<String>,
    #[serde(default)]
    pub options: DocumentOptions,
}

impl WorkflowDocument {
    pub fn new(nodes: Vec<CanvasNode>, connections: Vec<Connection>) -> Self {
        Self {
            nodes,
            connections,
            ..Default::default()
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("untitled workflow")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Scenario>,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderSettings>,
}

impl DocumentOptions {
    pub fn run_options(&self) -> Option<RunOptions> {
        self.scenario.clone().map(|scenario| RunOptions {
            scenario: Some(scenario),
        })
    }
}

/// Serialisable engine knobs; unset fields keep the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pacing_delay_ms: Option<u64>,
    /// `0` disables the per-node timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<InputMode>,
}

impl EngineSettings {
    pub fn to_engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(ms) = self.pacing_delay_ms {
            config = config.pacing_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.node_timeout_ms {
            config = config.node_timeout((ms > 0).then(|| Duration::from_millis(ms)));
        }
        if let Some(limit) = self.max_concurrency {
            config = config.max_concurrency(limit);
        }
        if let Some(mode) = self.input_mode {
            config = config.input_mode(mode);
        }
        config
    }
}

impl From<&EngineSettings> for EngineConfig {
    fn from(settings: &EngineSettings) -> Self {
        settings.to_engine_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_settings_conversion() {
        let settings = EngineSettings {
            pacing_delay_ms: Some(250),
            node_timeout_ms: Some(0),
            max_concurrency: Some(4),
            input_mode: Some(InputMode::Namespaced),
        };
        let config = EngineConfig::from(&settings);

        assert_eq!(config.pacing_delay, Duration::from_millis(250));
        assert_eq!(config.node_timeout, None);
        assert_eq!(config.max_concurrency, Some(4));
        assert_eq!(config.input_mode, InputMode::Namespaced);

        let defaults = EngineSettings::default().to_engine_config();
        assert_eq!(defaults.pacing_delay, Duration::ZERO);
        assert_eq!(defaults.node_timeout, EngineConfig::default().node_timeout);
    }

    #[test]
    fn test_edges_alias() {
        let doc: WorkflowDocument = serde_json::from_str(
            r#"{
                "nodes": [{ "id": "a", "type": "message" }],
                "edges": [{ "id": "e1", "sourceNode": "a", "targetNode": "a" }],
                "options": { "engine": { "inputMode": "namespaced" } }
            }"#,
        )
        .unwrap();

        assert_eq!(doc.connections.len(), 1);
        assert_eq!(doc.options.engine.input_mode, Some(InputMode::Namespaced));
        assert_eq!(doc.display_name(), "untitled workflow");
        assert!(doc.options.run_options().is_none());
    }
}
