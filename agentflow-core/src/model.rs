//! Canvas document model: nodes, ports, connections and node outputs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node kinds rendered by the canvas but never dispatched to an executor.
pub const UI_KINDS: [&str; 2] = ["ui", "gui"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// A named input or output socket, unique within its node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
}

/// Whether a node waits for every upstream node or only the first one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExecutionPolicy {
    #[default]
    All,
    Any,
}

impl From<String> for ExecutionPolicy {
    fn from(value: String) -> Self {
        if value == "any" {
            ExecutionPolicy::Any
        } else {
            ExecutionPolicy::All
        }
    }
}

impl From<ExecutionPolicy> for String {
    fn from(value: ExecutionPolicy) -> Self {
        match value {
            ExecutionPolicy::All => "all".to_string(),
            ExecutionPolicy::Any => "any".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    #[serde(default)]
    pub policy: ExecutionPolicy,
}

/// A node placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub inputs: Vec<Port>,
    #[serde(default)]
    pub outputs: Vec<Port>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionSettings>,
}

impl CanvasNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            subtype: None,
            position: Position::default(),
            size: Size::default(),
            data: Value::Object(Map::new()),
            inputs: Vec::new(),
            outputs: Vec::new(),
            execution: None,
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.execution = Some(ExecutionSettings { policy });
        self
    }

    /// Dispatch key: the subtype when set and non-empty, otherwise the type.
    pub fn kind(&self) -> &str {
        match self.subtype.as_deref() {
            Some(subtype) if !subtype.is_empty() => subtype,
            _ => self.node_type.as_str(),
        }
    }

    pub fn policy(&self) -> ExecutionPolicy {
        self.execution
            .as_ref()
            .map(|e| e.policy)
            .unwrap_or_default()
    }

    pub fn is_ui(&self) -> bool {
        UI_KINDS.contains(&self.node_type.as_str())
            || self
                .subtype
                .as_deref()
                .map(|s| UI_KINDS.contains(&s))
                .unwrap_or(false)
    }

    /// `[type:subtype]` tag used in run logs.
    pub fn tag(&self) -> String {
        match self.subtype.as_deref() {
            Some(subtype) if !subtype.is_empty() => {
                format!("[{}:{}]", self.node_type, subtype)
            }
            _ => format!("[{}]", self.node_type),
        }
    }

    /// Display title: `data.title`, then `data.description`, then the id.
    pub fn title(&self) -> &str {
        self.data_str("title")
            .or_else(|| self.data_str("description"))
            .unwrap_or(self.id.as_str())
    }

    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Like [`data_str`](Self::data_str) but treats blank strings as absent.
    pub fn data_text(&self, key: &str) -> Option<&str> {
        self.data_str(key).filter(|s| !s.trim().is_empty())
    }

    pub fn data_u64(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(Value::as_u64)
    }

    pub fn data_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }

    pub fn data_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    pub fn data_array(&self, key: &str) -> &[Value] {
        self.data
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Output synthesised for UI nodes from their own configuration.
    ///
    /// Checks `content`, `message` and `inputValue` (non-blank strings only),
    /// then the last entry of `messages`, which may be a string or `{ text }`.
    pub fn ui_output(&self) -> String {
        for key in ["content", "message", "inputValue"] {
            if let Some(text) = self.data_text(key) {
                return text.to_string();
            }
        }
        match self.data_array("messages").last() {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Object(msg)) => msg
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        }
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_output: Option<String>,
    pub target_node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_input_id: Option<String>,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        source_node: impl Into<String>,
        target_node: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_node: source_node.into(),
            source_output: None,
            target_node: target_node.into(),
            target_input_id: None,
        }
    }

    pub fn with_source_output(mut self, port: impl Into<String>) -> Self {
        self.source_output = Some(port.into());
        self
    }

    pub fn with_target_input(mut self, port: impl Into<String>) -> Self {
        self.target_input_id = Some(port.into());
        self
    }
}

/// The result of executing one node.
///
/// Plain text, an object such as `{ output }`, `{ error }` or a provider
/// wrapper like `{ llm: <raw response> }`, or any other JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeOutput {
    Text(String),
    Object(Map<String, Value>),
    Value(Value),
}

impl NodeOutput {
    pub fn text(text: impl Into<String>) -> Self {
        NodeOutput::Text(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("error".to_string(), Value::String(message.into()));
        NodeOutput::Object(map)
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => NodeOutput::Text(text),
            Value::Object(map) => NodeOutput::Object(map),
            other => NodeOutput::Value(other),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            NodeOutput::Text(text) => Value::String(text.clone()),
            NodeOutput::Object(map) => Value::Object(map.clone()),
            NodeOutput::Value(value) => value.clone(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NodeOutput::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            NodeOutput::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    pub fn error_message(&self) -> Option<&str> {
        self.field("error").and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.error_message().is_some()
    }

    /// Compact JSON text of the output.
    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }
}

impl From<String> for NodeOutput {
    fn from(text: String) -> Self {
        NodeOutput::Text(text)
    }
}

impl From<&str> for NodeOutput {
    fn from(text: &str) -> Self {
        NodeOutput::Text(text.to_string())
    }
}

impl From<Value> for NodeOutput {
    fn from(value: Value) -> Self {
        NodeOutput::from_value(value)
    }
}
