use crate::config::WorkflowDocument;
use agentflow_context::{ConversationStore, MachineStateStore};
use agentflow_core::{LlmProvider, NodeOutput};
use agentflow_runtime::{
    CancellationToken, EmitLog, ExecutorRegistry, FlowEngine, ProviderSettings, RunReport,
};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Runs a [`WorkflowDocument`] with the built-in executors.
///
/// Conversation histories and state-machine states live in the runner, so
/// repeated runs of one runner continue where the previous run stopped.
pub struct DocumentRunner {
    document: WorkflowDocument,
    provider: Option<Arc<dyn LlmProvider>>,
    registry: ExecutorRegistry,
    conversations: ConversationStore,
    machines: MachineStateStore,
    start_override: Option<String>,
    cancel: Option<CancellationToken>,
}

impl DocumentRunner {
    /// Builds the provider from the document options. Without provider
    /// options the hosted Gemini key is tried; if that is missing too, the
    /// run proceeds and LLM nodes report the missing provider.
    pub fn new(document: WorkflowDocument) -> Result<Self> {
        let provider = match &document.options.provider {
            Some(settings) => Some(
                settings
                    .build()
                    .with_context(|| "Failed to configure LLM provider")?,
            ),
            None => match ProviderSettings::default().build() {
                Ok(provider) => Some(provider),
                Err(err) => {
                    tracing::warn!(error = %err, "no LLM provider available; agent nodes will fail");
                    None
                }
            },
        };
        Ok(Self::with_provider(document, provider))
    }

    pub fn with_provider(
        document: WorkflowDocument,
        provider: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        let conversations = ConversationStore::new();
        let machines = MachineStateStore::new();
        let registry = ExecutorRegistry::builtin_with_stores(
            provider.clone(),
            conversations.clone(),
            machines.clone(),
        );
        Self {
            document,
            provider,
            registry,
            conversations,
            machines,
            start_override: None,
            cancel: None,
        }
    }

    /// Overrides the document's `startNodeId`.
    pub fn with_start_node(mut self, node_id: impl Into<String>) -> Self {
        self.start_override = Some(node_id.into());
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn document(&self) -> &WorkflowDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut WorkflowDocument {
        &mut self.document
    }

    pub fn provider(&self) -> Option<&Arc<dyn LlmProvider>> {
        self.provider.as_ref()
    }

    pub fn registry_mut(&mut self) -> &mut ExecutorRegistry {
        &mut self.registry
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn machines(&self) -> &MachineStateStore {
        &self.machines
    }

    /// An engine over the current document.
    pub fn engine(&self) -> FlowEngine {
        let doc = &self.document;
        let mut engine = FlowEngine::new(doc.nodes.clone(), doc.connections.clone(), &self.registry)
            .with_config(doc.options.engine.to_engine_config());
        if let Some(start) = self.start_override.as_ref().or(doc.start_node_id.as_ref()) {
            engine.set_start_node(start.clone());
        }
        if let Some(options) = doc.options.run_options() {
            engine = engine.with_run_options(options);
        }
        if let Some(token) = &self.cancel {
            engine = engine.with_cancel_token(token.clone());
        }
        engine
    }

    #[tracing::instrument(skip_all, fields(workflow = self.document.display_name()))]
    pub async fn run(&self, emit_log: EmitLog<'_>) -> RunReport {
        self.engine().execute_detailed(emit_log).await
    }

    pub async fn run_outputs(&self) -> HashMap<String, NodeOutput> {
        self.run(None).await.outputs
    }
}
