//! LLM provider clients and provider selection.

mod static_provider;

#[cfg(feature = "http")]
mod gemini;
#[cfg(feature = "http")]
mod openai_compat;

pub use static_provider::StaticProvider;

#[cfg(feature = "http")]
pub use gemini::{GeminiProvider, DEFAULT_GEMINI_MODEL};
#[cfg(feature = "http")]
pub use openai_compat::{
    normalize_base_url, OpenAiCompatProvider, DEFAULT_OPENAI_COMPAT_BASE,
    DEFAULT_OPENAI_COMPAT_MODEL,
};

use agentflow_core::{LlmProvider, ProviderError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const NVIDIA_API_KEY_ENV: &str = "NVIDIA_API_KEY";
pub const NVIDIA_API_KEY_PUBLIC_ENV: &str = "NEXT_PUBLIC_NVIDIA_API_KEY";
pub const NVIDIA_BASE_URL_ENV: &str = "NVIDIA_BASE_URL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[serde(alias = "nvidia", alias = "openai")]
    OpenAiCompat,
    Static,
}

impl ProviderKind {
    fn label(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAiCompat => "openai-compat",
            ProviderKind::Static => "static",
        }
    }
}

/// Which provider to build and how to reach it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// User-supplied key; takes precedence over the hosted key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Fixed reply for the static provider; it echoes the prompt when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl ProviderSettings {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// BYOK key if set, else the hosted key from the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        match self.kind {
            ProviderKind::Gemini => env_value(GEMINI_API_KEY_ENV),
            ProviderKind::OpenAiCompat => {
                env_value(NVIDIA_API_KEY_ENV).or_else(|| env_value(NVIDIA_API_KEY_PUBLIC_ENV))
            }
            ProviderKind::Static => None,
        }
    }

    /// Configured base URL, else `NVIDIA_BASE_URL` for OpenAI-compatible providers.
    pub fn resolve_base_url(&self) -> Option<String> {
        self.base_url.clone().or_else(|| match self.kind {
            ProviderKind::OpenAiCompat => env_value(NVIDIA_BASE_URL_ENV),
            _ => None,
        })
    }

    pub fn build(&self) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        if self.kind == ProviderKind::Static {
            let provider = match &self.reply {
                Some(reply) => StaticProvider::reply(reply.clone()),
                None => StaticProvider::echo(),
            };
            return Ok(Arc::new(provider));
        }

        let api_key = self
            .resolve_api_key()
            .ok_or_else(|| ProviderError::MissingApiKey(self.kind.label().to_string()))?;
        self.build_http(api_key)
    }

    #[cfg(feature = "http")]
    fn build_http(&self, api_key: String) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let provider: Arc<dyn LlmProvider> = match self.kind {
            ProviderKind::Gemini => {
                let mut p = GeminiProvider::new(api_key);
                if let Some(model) = &self.model {
                    p = p.with_model(model.clone());
                }
                if let Some(url) = &self.base_url {
                    p = p.with_base_url(url.clone());
                }
                Arc::new(p)
            }
            _ => {
                let mut p = OpenAiCompatProvider::new(api_key);
                if let Some(model) = &self.model {
                    p = p.with_model(model.clone());
                }
                if let Some(url) = self.resolve_base_url() {
                    p = p.with_base_url(&url);
                }
                Arc::new(p)
            }
        };
        tracing::debug!(provider = provider.name(), "provider configured");
        Ok(provider)
    }

    #[cfg(not(feature = "http"))]
    fn build_http(&self, _api_key: String) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Err(ProviderError::Transport {
            provider: self.kind.label().to_string(),
            message: "built without the `http` feature".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byok_key_wins() {
        let settings = ProviderSettings {
            kind: ProviderKind::OpenAiCompat,
            api_key: Some("user-key".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.resolve_api_key().as_deref(), Some("user-key"));
    }

    #[test]
    fn test_kind_aliases() {
        let settings: ProviderSettings =
            serde_json::from_str(r#"{ "kind": "nvidia", "model": "m" }"#).unwrap();
        assert_eq!(settings.kind, ProviderKind::OpenAiCompat);
        let settings: ProviderSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.kind, ProviderKind::Gemini);
    }

    #[tokio::test]
    async fn test_static_build_needs_no_key() {
        let mut settings = ProviderSettings::new(ProviderKind::Static);
        settings.reply = Some("pong".to_string());
        let provider = settings.build().unwrap();
        let response = provider
            .invoke(agentflow_core::ProviderRequest::new("ping"))
            .await
            .unwrap();
        assert_eq!(response.text, "pong");
        assert_eq!(response.raw["choices"][0]["message"]["content"], "pong");
    }
}
