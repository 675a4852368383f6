//! # AgentFlow Core
//!
//! Canvas data model, node executor contract, LLM provider capability and
//! the input resolution shared by every executor.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod context;
mod error;
mod executor;
mod model;
mod provider;
pub mod resolve;

#[cfg(test)]
mod tests;

pub use context::{
    DebugInfo, DebugSlot, FlowContextBag, FlowMode, NodeContext, RunOptions, Scenario,
    WorkingHours,
};
pub use error::{NodeError, ProviderError};
pub use executor::{NodeExecutor, NodeFuture, NodeResult};
pub use model::{
    CanvasNode, Connection, ExecutionPolicy, ExecutionSettings, NodeOutput, Port, Position, Size,
    UI_KINDS,
};
pub use provider::{LlmProvider, ProviderParams, ProviderRequest, ProviderResponse};

/// Prelude module for core functionality
pub mod prelude {
    pub use crate::resolve::{format_input_context, get_input_values};
    pub use crate::{
        CanvasNode, Connection, ExecutionPolicy, LlmProvider, NodeContext, NodeError,
        NodeExecutor, NodeFuture, NodeOutput, ProviderError, ProviderRequest, ProviderResponse,
        RunOptions, Scenario,
    };
}
