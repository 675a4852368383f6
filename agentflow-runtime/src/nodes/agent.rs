use super::object;
use agentflow_core::resolve::format_input_context;
use agentflow_core::{
    CanvasNode, DebugInfo, LlmProvider, NodeContext, NodeError, NodeExecutor, NodeFuture,
    ProviderParams, ProviderRequest, ProviderResponse,
};
use serde_json::Value;
use std::sync::Arc;

/// `systemPrompt` (or `rules`) followed by the extra sections, blank-line separated.
pub(crate) fn build_prompt(node: &CanvasNode, sections: &[&str]) -> String {
    let instructions = node
        .data_text("systemPrompt")
        .or_else(|| node.data_text("rules"));
    instructions
        .into_iter()
        .chain(sections.iter().copied())
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Sends `prompt` to the provider and records the exchange in the debug slot.
pub(crate) async fn complete(
    provider: Option<&Arc<dyn LlmProvider>>,
    ctx: &NodeContext<'_>,
    kind: &str,
    prompt: String,
) -> Result<ProviderResponse, NodeError> {
    let node = ctx.current_node;
    let provider = provider.ok_or_else(|| NodeError::ProviderUnavailable {
        node_id: node.id.clone(),
        kind: kind.to_string(),
    })?;

    let params = ProviderParams::from_data(&node.data);
    tracing::debug!(
        node_id = %node.id,
        provider = provider.name(),
        model = params.model.as_deref().unwrap_or("default"),
        "invoking provider"
    );
    let request = ProviderRequest::new(prompt.clone()).with_params(params);
    let response = provider.invoke(request).await?;

    ctx.record_debug(DebugInfo {
        prompt: Some(prompt),
        response_raw: Some(response.raw.clone()),
        tokens: response.tokens,
    });
    Ok(response)
}

/// LLM-backed agent: `{ output, llm }`.
pub struct AgentExecutor {
    kind: String,
    provider: Option<Arc<dyn LlmProvider>>,
}

impl AgentExecutor {
    pub fn new(kind: impl Into<String>, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            kind: kind.into(),
            provider,
        }
    }
}

impl NodeExecutor for AgentExecutor {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn execute<'a>(&'a self, ctx: NodeContext<'a>) -> NodeFuture<'a> {
        Box::pin(async move {
            let input = format_input_context(&ctx);
            let prompt = build_prompt(ctx.current_node, &[&input]);
            let response = complete(self.provider.as_ref(), &ctx, &self.kind, prompt).await?;

            Ok(object([
                ("output", Value::String(response.text)),
                ("llm", response.raw),
            ]))
        })
    }
}
