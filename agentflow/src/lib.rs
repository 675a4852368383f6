//! # AgentFlow - Dataflow Engine for Agent Workflows
//!
//! AgentFlow executes canvas graphs of typed nodes (agents, routers, memory,
//! messages) wired by directed connections, dispatching each node to an
//! executor that may call an LLM provider.
//!
//! ## Features
//!
//! - `http` (default): Gemini and OpenAI-compatible providers
//! - `yaml` (default): JSON/YAML workflow documents and the document runner
//! - `logger` (default): tracing setup and run summaries
//! - `cli` (default): the `agentflow` binary
//!
//! ## Quick Start
//!
//! ```rust
//! use agentflow::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let nodes = vec![
//!         CanvasNode::new("hello", "message").with_data(json!({ "content": "hi" })),
//!         CanvasNode::new("shout", "message").with_data(json!({ "template": "{{input}}!" })),
//!     ];
//!     let connections = vec![Connection::new("c1", "hello", "shout")];
//!
//!     let registry = ExecutorRegistry::builtin(None);
//!     let outputs = FlowEngine::new(nodes, connections, &registry).execute(None).await;
//!     assert_eq!(outputs["shout"], NodeOutput::text("hi!"));
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use agentflow_context as context;
pub use agentflow_core::*;
pub use agentflow_runtime as runtime;

#[cfg(feature = "yaml")]
#[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
pub use agentflow_yaml as yaml;

#[cfg(feature = "logger")]
#[cfg_attr(docsrs, doc(cfg(feature = "logger")))]
pub use agentflow_logger as logger;

/// Prelude module for easy imports
pub mod prelude {
    pub use agentflow_context::{ConversationStore, MachineStateStore, RunContext};
    pub use agentflow_core::prelude::*;
    pub use agentflow_runtime::{
        CancellationToken, EngineAdapter, EngineConfig, ExecutorRegistry, FlowEngine, InputMode,
        NodeEvent, NormalizedEvent, ProviderKind, ProviderSettings, RunReport, StaticProvider,
    };

    #[cfg(feature = "yaml")]
    #[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
    pub use agentflow_yaml::prelude::*;

    #[cfg(feature = "logger")]
    #[cfg_attr(docsrs, doc(cfg(feature = "logger")))]
    pub use agentflow_logger::Logger;
}
