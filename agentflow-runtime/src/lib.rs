//! # AgentFlow Runtime
//!
//! The flow engine, its executor registry, the built-in node executors,
//! conditional routing, the UI event adapter and LLM provider clients

mod adapter;
mod engine;
mod registry;
mod routing;

pub mod nodes;
pub mod providers;


pub use adapter::{
    to_inspector, to_timeline, EngineAdapter, EventNormalizer, InspectorPayload, NormalizedEvent,
    StepStatus, TimelineStep,
};
pub use engine::{
    EmitLog, EngineConfig, FlowEngine, InputMode, NodeEvent, NodeEventStatus, RunReport,
    LOOP_DETECTED,
};
pub use providers::{ProviderKind, ProviderSettings, StaticProvider};
pub use registry::ExecutorRegistry;
pub use routing::{coerce_output, Route, FALSE_PATH, TRUE_PATH};

/// Re-exported so callers can build cancellable engines without a direct dependency.
pub use tokio_util::sync::CancellationToken;
