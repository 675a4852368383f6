use crate::nodes::{
    AgentExecutor, ConversationFlowExecutor, DecisionTreeExecutor, IfElseExecutor,
    KnowledgeBaseExecutor, MessageExecutor, PromptTemplateExecutor, StateMachineExecutor,
    ToolAgentExecutor,
};
use agentflow_context::{ConversationStore, MachineStateStore};
use agentflow_core::{CanvasNode, LlmProvider, NodeExecutor};
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatch table from node kind (`subtype`, else `type`) to executor.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in executor, with fresh cross-run stores.
    pub fn builtin(provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self::builtin_with_stores(provider, ConversationStore::new(), MachineStateStore::new())
    }

    /// Every built-in executor, sharing the given stores.
    pub fn builtin_with_stores(
        provider: Option<Arc<dyn LlmProvider>>,
        conversations: ConversationStore,
        machines: MachineStateStore,
    ) -> Self {
        let mut registry = Self::new();
        for kind in ["agent", "generic"] {
            registry.register(AgentExecutor::new(kind, provider.clone()));
        }
        registry.register(ToolAgentExecutor::new(provider));
        registry.register(IfElseExecutor);
        registry.register(DecisionTreeExecutor);
        registry.register(StateMachineExecutor::new(machines));
        registry.register(KnowledgeBaseExecutor);
        registry.register(MessageExecutor);
        for kind in ["prompt-template", "template"] {
            registry.register(PromptTemplateExecutor::new(kind));
        }
        registry.register(ConversationFlowExecutor::new(conversations));
        registry
    }

    /// Registers `executor` under its own kind, replacing any previous one.
    pub fn register<E>(&mut self, executor: E) -> Option<Arc<dyn NodeExecutor>>
    where
        E: NodeExecutor + 'static,
    {
        let executor: Arc<dyn NodeExecutor> = Arc::new(executor);
        self.register_as(executor.kind().to_string(), executor)
    }

    /// Registers a shared executor under an explicit kind.
    pub fn register_as(
        &mut self,
        kind: impl Into<String>,
        executor: Arc<dyn NodeExecutor>,
    ) -> Option<Arc<dyn NodeExecutor>> {
        let kind = kind.into();
        tracing::debug!(kind = %kind, "executor registered");
        self.executors.insert(kind, executor)
    }

    pub fn with<E>(mut self, executor: E) -> Self
    where
        E: NodeExecutor + 'static,
    {
        self.register(executor);
        self
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.executors.get(kind).cloned()
    }

    /// Executor for a node, keyed by `subtype ?? type`.
    pub fn resolve(&self, node: &CanvasNode) -> Option<Arc<dyn NodeExecutor>> {
        self.get(node.kind())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.executors.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
