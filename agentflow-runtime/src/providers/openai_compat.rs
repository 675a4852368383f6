use agentflow_core::{LlmProvider, ProviderError, ProviderRequest, ProviderResponse};
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::{json, Value};

pub const DEFAULT_OPENAI_COMPAT_BASE: &str = "https://integrate.api.nvidia.com/v1";
pub const DEFAULT_OPENAI_COMPAT_MODEL: &str = "meta/llama-3.1-8b-instruct";

/// Trims trailing slashes and appends `/v1` unless the URL already ends in a
/// `/vN` segment.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let versioned = trimmed
        .rsplit('/')
        .next()
        .and_then(|segment| segment.strip_prefix('v'))
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()));
    if versioned {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

/// Chat-completions client for OpenAI-compatible endpoints such as NVIDIA NIM.
pub struct OpenAiCompatProvider {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_COMPAT_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_COMPAT_BASE.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn body(&self, request: &ProviderRequest) -> Value {
        let params = &request.params;
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut body = json!({
            "model": params.model.as_deref().unwrap_or(&self.model),
            "messages": messages,
            "stream": false,
        });
        if let Some(t) = params.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(p) = params.top_p {
            body["top_p"] = json!(p);
        }
        if let Some(max) = params.max_tokens {
            body["max_tokens"] = json!(max);
        }
        if !params.stop_sequences.is_empty() {
            body["stop"] = json!(params.stop_sequences);
        }
        body
    }
}

impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn invoke(
        &self,
        request: ProviderRequest,
    ) -> BoxFuture<'_, Result<ProviderResponse, ProviderError>> {
        Box::pin(async move {
            let url = format!("{}/chat/completions", self.base_url);
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&self.body(&request))
                .send()
                .await
                .map_err(|e| ProviderError::Transport {
                    provider: self.name().to_string(),
                    message: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Http {
                    provider: self.name().to_string(),
                    status: status.as_u16(),
                    body,
                });
            }

            let raw: Value = response.json().await.map_err(|e| ProviderError::Decode {
                provider: self.name().to_string(),
                message: e.to_string(),
            })?;
            let text = raw
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ProviderError::EmptyResponse(self.name().to_string()))?;
            let tokens = raw.pointer("/usage/total_tokens").and_then(Value::as_u64);

            let mut out = ProviderResponse::new(text, raw);
            out.tokens = tokens;
            Ok(out)
        })
    }
}
