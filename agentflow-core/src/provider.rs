//! LLM provider capability consumed by agent-style executors.

use crate::error::ProviderError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sampling parameters read from a node's configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

impl ProviderParams {
    /// Reads the parameters from node data, ignoring keys of the wrong type.
    pub fn from_data(data: &Value) -> Self {
        let model = data
            .get("model")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string);
        let stop_sequences = data
            .get("stopSequences")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            model,
            temperature: data.get("temperature").and_then(Value::as_f64),
            top_p: data.get("topP").and_then(Value::as_f64),
            top_k: data.get("topK").and_then(Value::as_u64),
            max_tokens: data.get("maxTokens").and_then(Value::as_u64),
            stop_sequences,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub params: ProviderParams,
}

impl ProviderRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_params(mut self, params: ProviderParams) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    /// Extracted reply text.
    pub text: String,
    /// Raw provider payload, passed downstream as `{ llm }`.
    pub raw: Value,
    pub tokens: Option<u64>,
}

impl ProviderResponse {
    pub fn new(text: impl Into<String>, raw: Value) -> Self {
        Self {
            text: text.into(),
            raw,
            tokens: None,
        }
    }

    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens = Some(tokens);
        self
    }
}

/// `invoke(prompt, params) -> text | error`.
pub trait LlmProvider: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn invoke(&self, request: ProviderRequest)
        -> BoxFuture<'_, Result<ProviderResponse, ProviderError>>;
}
