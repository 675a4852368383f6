use agentflow_core::{LlmProvider, ProviderError, ProviderRequest, ProviderResponse};
use futures::future::BoxFuture;
use serde_json::json;

/// Offline provider: answers with a fixed reply, or echoes the prompt.
///
/// Replies are wrapped in the OpenAI chat-completion shape so downstream
/// nodes unwrap them like any hosted response.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    reply: Option<String>,
}

impl StaticProvider {
    pub fn echo() -> Self {
        Self { reply: None }
    }

    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
        }
    }
}

impl LlmProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn invoke(
        &self,
        request: ProviderRequest,
    ) -> BoxFuture<'_, Result<ProviderResponse, ProviderError>> {
        Box::pin(async move {
            let text = self.reply.clone().unwrap_or(request.prompt);
            let raw = json!({
                "choices": [{ "message": { "role": "assistant", "content": text } }]
            });
            Ok(ProviderResponse::new(text, raw))
        })
    }
}
