//! # AgentFlow Context
//!
//! Per-run bookkeeping and cross-run node state for AgentFlow

mod store;

pub use store::{ConversationStore, MachineStateStore, NodeStateStore};

use std::time::{Duration, Instant};
use uuid::Uuid;

/// Bookkeeping for a single engine run: trace id, node logs and errors.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub trace_id: String,
    pub ok: bool,
    pub errors: Vec<String>,
    pub node_logs: Vec<NodeLog>,
}

#[derive(Debug, Clone)]
pub struct NodeLog {
    pub node_id: String,
    pub kind: String,
    pub start_time: Instant,
    pub end_time: Option<Instant>,
    pub status: NodeStatus,
    pub error_message: Option<String>,
    pub trace_id: String,
}

impl NodeLog {
    pub fn duration(&self) -> Duration {
        self.end_time
            .map(|end| end.duration_since(self.start_time))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Running,
    Success,
    Failed,
    Skipped,
    Timeout,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new_with_trace_id(Uuid::new_v4().to_string())
    }
}

impl RunContext {
    pub fn new_with_trace_id(trace_id: String) -> Self {
        Self {
            trace_id,
            ok: true,
            errors: Vec::new(),
            node_logs: Vec::new(),
        }
    }

    pub fn start_node(&mut self, node_id: &str, kind: &str) {
        self.node_logs.push(NodeLog {
            node_id: node_id.to_string(),
            kind: kind.to_string(),
            start_time: Instant::now(),
            end_time: None,
            status: NodeStatus::Running,
            error_message: None,
            trace_id: self.trace_id.clone(),
        });

        tracing::debug!(trace_id = %self.trace_id, node_id = %node_id, kind = %kind, "node starting");
    }

    pub fn end_node_success(&mut self, node_id: &str) {
        let trace_id = self.trace_id.clone();
        if let Some(log) = self.finish(node_id, NodeStatus::Success) {
            tracing::info!(trace_id = %trace_id, node_id = %node_id, duration_ms = log.duration().as_millis() as u64, "node success");
        }
    }

    pub fn end_node_failed(&mut self, node_id: &str, error: &str) {
        let trace_id = self.trace_id.clone();
        if let Some(log) = self.finish(node_id, NodeStatus::Failed) {
            log.error_message = Some(error.to_string());
            tracing::error!(trace_id = %trace_id, node_id = %node_id, duration_ms = log.duration().as_millis() as u64, error = %error, "node failed");
        }
        self.ok = false;
        self.errors
            .push(format!("[{}] {}: {}", self.trace_id, node_id, error));
    }

    /// Records a node that never ran: loop guard, missing executor, cancellation.
    pub fn end_node_skipped(&mut self, node_id: &str, kind: &str, reason: &str) {
        if !self.is_running(node_id) {
            self.start_node(node_id, kind);
        }
        let trace_id = self.trace_id.clone();
        if let Some(log) = self.finish(node_id, NodeStatus::Skipped) {
            log.error_message = Some(reason.to_string());
            tracing::warn!(trace_id = %trace_id, node_id = %node_id, reason = %reason, "node skipped");
        }
    }

    pub fn end_node_timeout(&mut self, node_id: &str) {
        let trace_id = self.trace_id.clone();
        if let Some(log) = self.finish(node_id, NodeStatus::Timeout) {
            tracing::error!(trace_id = %trace_id, node_id = %node_id, duration_ms = log.duration().as_millis() as u64, "node timeout");
        }
        self.ok = false;
        self.errors
            .push(format!("[{}] {}: timeout", self.trace_id, node_id));
    }

    pub fn node_log(&self, node_id: &str) -> Option<&NodeLog> {
        self.node_logs.iter().rev().find(|log| log.node_id == node_id)
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.node_logs
            .iter()
            .filter(|log| log.status == status)
            .count()
    }

    pub fn print_summary(&self) {
        tracing::info!(trace_id = %self.trace_id, total_nodes = self.node_logs.len(), "run summary");
        tracing::info!(
            success = self.count(NodeStatus::Success),
            failed = self.count(NodeStatus::Failed),
            skipped = self.count(NodeStatus::Skipped),
            timeout = self.count(NodeStatus::Timeout)
        );

        if !self.errors.is_empty() {
            tracing::info!(errors = self.errors.len(), "errors summary");
            for error in &self.errors {
                tracing::info!(error = %error);
            }
        }
    }

    fn is_running(&self, node_id: &str) -> bool {
        self.node_log(node_id)
            .map(|log| log.status == NodeStatus::Running)
            .unwrap_or(false)
    }

    fn finish(&mut self, node_id: &str, status: NodeStatus) -> Option<&mut NodeLog> {
        let log = self
            .node_logs
            .iter_mut()
            .rev()
            .find(|log| log.node_id == node_id && log.status == NodeStatus::Running)?;
        log.end_time = Some(Instant::now());
        log.status = status;
        Some(log)
    }
}
