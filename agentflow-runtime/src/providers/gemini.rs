use agentflow_core::{LlmProvider, ProviderError, ProviderRequest, ProviderResponse};
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::{json, Map, Value};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";

/// Google Gemini `generateContent` client.
pub struct GeminiProvider {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn body(request: &ProviderRequest) -> Value {
        let params = &request.params;
        let mut generation = Map::new();
        if let Some(t) = params.temperature {
            generation.insert("temperature".into(), json!(t));
        }
        if let Some(k) = params.top_k {
            generation.insert("topK".into(), json!(k));
        }
        if let Some(p) = params.top_p {
            generation.insert("topP".into(), json!(p));
        }
        if !params.stop_sequences.is_empty() {
            generation.insert("stopSequences".into(), json!(params.stop_sequences));
        }
        if let Some(max) = params.max_tokens {
            generation.insert("maxOutputTokens".into(), json!(max));
        }

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }]
        });
        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        if !generation.is_empty() {
            body["generationConfig"] = Value::Object(generation);
        }
        body
    }
}

/// Concatenated text parts of the first candidate.
pub(crate) fn candidate_text(raw: &Value) -> Option<String> {
    let parts = raw.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn invoke(
        &self,
        request: ProviderRequest,
    ) -> BoxFuture<'_, Result<ProviderResponse, ProviderError>> {
        Box::pin(async move {
            let model = request.params.model.as_deref().unwrap_or(&self.model);
            let url = format!("{}/models/{}:generateContent", self.base_url, model);

            let response = self
                .http
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&Self::body(&request))
                .send()
                .await
                .map_err(|e| ProviderError::Transport {
                    provider: "gemini".into(),
                    message: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Http {
                    provider: "gemini".into(),
                    status: status.as_u16(),
                    body,
                });
            }

            let raw: Value = response.json().await.map_err(|e| ProviderError::Decode {
                provider: "gemini".into(),
                message: e.to_string(),
            })?;
            let text =
                candidate_text(&raw).ok_or_else(|| ProviderError::EmptyResponse("gemini".into()))?;
            let tokens = raw
                .pointer("/usageMetadata/totalTokenCount")
                .and_then(Value::as_u64);

            let mut out = ProviderResponse::new(text, raw);
            out.tokens = tokens;
            Ok(out)
        })
    }
}
