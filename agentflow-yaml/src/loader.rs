use crate::config::WorkflowDocument;
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Non-fatal findings of [`WorkflowLoader::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Loads and saves workflow documents as JSON or YAML.
pub struct WorkflowLoader;

impl WorkflowLoader {
    /// Picks the format from the extension: `.yaml`/`.yml` is YAML, anything else JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<WorkflowDocument> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_file(path),
            _ => Self::from_json_file(path),
        }
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<WorkflowDocument> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read YAML file: {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<WorkflowDocument> {
        serde_yaml::from_str(content).with_context(|| "Failed to parse YAML workflow")
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<WorkflowDocument> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read JSON file: {:?}", path.as_ref()))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<WorkflowDocument> {
        serde_json::from_str(content).with_context(|| "Failed to parse JSON workflow")
    }

    pub fn save_to_yaml<P: AsRef<Path>>(document: &WorkflowDocument, path: P) -> Result<()> {
        let content = serde_yaml::to_string(document)
            .with_context(|| "Failed to serialize workflow to YAML")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write YAML file: {:?}", path.as_ref()))
    }

    pub fn save_to_json<P: AsRef<Path>>(document: &WorkflowDocument, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(document)
            .with_context(|| "Failed to serialize workflow to JSON")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write JSON file: {:?}", path.as_ref()))
    }

    /// Structural checks. Connections to unknown nodes are only warnings: the
    /// engine drops them.
    pub fn validate(document: &WorkflowDocument) -> Result<ValidationReport> {
        if document.nodes.is_empty() {
            bail!("Workflow must contain at least one node");
        }

        let mut node_ids = HashSet::new();
        for node in &document.nodes {
            if node.id.trim().is_empty() {
                bail!("Node ids cannot be empty");
            }
            if !node_ids.insert(node.id.as_str()) {
                bail!("Duplicate node ID: {}", node.id);
            }
        }

        let mut connection_ids = HashSet::new();
        let mut report = ValidationReport::default();
        for conn in &document.connections {
            if !connection_ids.insert(conn.id.as_str()) {
                bail!("Duplicate connection ID: {}", conn.id);
            }
            for endpoint in [&conn.source_node, &conn.target_node] {
                if !node_ids.contains(endpoint.as_str()) {
                    report.warnings.push(format!(
                        "Connection {} references unknown node {}",
                        conn.id, endpoint
                    ));
                }
            }
        }

        if let Some(start) = &document.start_node_id {
            if !node_ids.contains(start.as_str()) {
                bail!("Start node {start} does not exist");
            }
        }

        for warning in &report.warnings {
            tracing::warn!(workflow = document.display_name(), "{warning}");
        }
        Ok(report)
    }
}
