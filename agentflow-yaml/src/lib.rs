//! # AgentFlow YAML
//!
//! Workflow documents in JSON or YAML, their validation, and a runner that
//! wires a document into the flow engine

mod config;
mod loader;
mod runner;

pub use config::{DocumentOptions, EngineSettings, WorkflowDocument};
pub use loader::{ValidationReport, WorkflowLoader};
pub use runner::DocumentRunner;

/// Prelude module for document loading
pub mod prelude {
    pub use crate::{DocumentRunner, EngineSettings, WorkflowDocument, WorkflowLoader};
}
