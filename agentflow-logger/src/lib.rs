//! # AgentFlow Logger
//!
//! Tracing subscriber setup and run summaries for AgentFlow engines

use agentflow_context::{NodeStatus, RunContext};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Per-status node counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub timeout: usize,
    pub running: usize,
}

impl RunSummary {
    pub fn of(context: &RunContext) -> Self {
        Self {
            total: context.node_logs.len(),
            success: context.count(NodeStatus::Success),
            failed: context.count(NodeStatus::Failed),
            skipped: context.count(NodeStatus::Skipped),
            timeout: context.count(NodeStatus::Timeout),
            running: context.count(NodeStatus::Running),
        }
    }
}

/// Logging entry points for AgentFlow runs
pub struct Logger;

impl Logger {
    fn env_filter() -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }

    /// Installs a human-readable fmt subscriber filtered by `RUST_LOG`.
    /// Returns false if a global subscriber was already set.
    pub fn init_tracing() -> bool {
        tracing_subscriber::fmt()
            .with_env_filter(Self::env_filter())
            .with_target(false)
            .try_init()
            .is_ok()
    }

    /// Same as [`init_tracing`](Self::init_tracing), with one JSON object per line.
    pub fn init_json_tracing() -> bool {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(Self::env_filter())
            .try_init()
            .is_ok()
    }

    /// Log run context summary
    pub fn log_run_summary(context: &RunContext) -> RunSummary {
        let summary = RunSummary::of(context);
        info!(
            trace_id = %context.trace_id,
            total_nodes = summary.total,
            success = summary.success,
            failed = summary.failed,
            skipped = summary.skipped,
            timeout = summary.timeout,
            errors = context.errors.len(),
            "Run summary"
        );

        for error in &context.errors {
            error!(trace_id = %context.trace_id, "Run error: {}", error);
        }
        summary
    }

    /// Log one line per node log entry
    pub fn log_node_details(context: &RunContext) {
        for log in &context.node_logs {
            let duration_ms = log.duration().as_millis() as u64;
            match log.status {
                NodeStatus::Success => {
                    info!(
                        trace_id = %log.trace_id,
                        node_id = %log.node_id,
                        kind = %log.kind,
                        duration_ms,
                        "Node completed"
                    );
                }
                NodeStatus::Failed => {
                    error!(
                        trace_id = %log.trace_id,
                        node_id = %log.node_id,
                        kind = %log.kind,
                        duration_ms,
                        error = %log.error_message.as_deref().unwrap_or("Unknown error"),
                        "Node failed"
                    );
                }
                NodeStatus::Skipped => {
                    warn!(
                        trace_id = %log.trace_id,
                        node_id = %log.node_id,
                        kind = %log.kind,
                        reason = %log.error_message.as_deref().unwrap_or("unknown"),
                        "Node skipped"
                    );
                }
                NodeStatus::Timeout => {
                    error!(
                        trace_id = %log.trace_id,
                        node_id = %log.node_id,
                        kind = %log.kind,
                        duration_ms,
                        "Node timed out"
                    );
                }
                NodeStatus::Running => {
                    warn!(
                        trace_id = %log.trace_id,
                        node_id = %log.node_id,
                        kind = %log.kind,
                        "Node still running"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_statuses() {
        let mut context = RunContext::new_with_trace_id("t".to_string());
        context.start_node("a", "message");
        context.end_node_success("a");
        context.start_node("b", "agent");
        context.end_node_failed("b", "no provider");
        context.end_node_skipped("c", "ghost", "no executor");
        context.start_node("d", "agent");

        let summary = Logger::log_run_summary(&context);
        Logger::log_node_details(&context);

        assert_eq!(
            summary,
            RunSummary {
                total: 4,
                success: 1,
                failed: 1,
                skipped: 1,
                timeout: 0,
                running: 1,
            }
        );
    }

    #[test]
    fn test_second_init_is_refused() {
        Logger::init_tracing();
        assert!(!Logger::init_tracing());
    }
}
