//! Dataflow scheduler: readiness, batch-concurrent dispatch, routing and loop
//! detection.

use crate::registry::ExecutorRegistry;
use crate::routing::Route;
use agentflow_context::RunContext;
use agentflow_core::{
    CanvasNode, Connection, DebugInfo, DebugSlot, ExecutionPolicy, FlowContextBag, FlowMode,
    NodeContext, NodeError, NodeExecutor, NodeOutput, NodeResult, RunOptions,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const LOOP_DETECTED: &str = "Loop detected: node executed more than once in the same run.";

const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(120);

/// How executors receive their upstream values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    /// Executors scan connections and the cumulative output map.
    #[default]
    Connections,
    /// The engine fills `inputs` and `flow_context` for every node.
    Namespaced,
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay before each node is invoked; zero disables pacing.
    pub pacing_delay: Duration,
    /// Per-node time limit (None for unlimited)
    pub node_timeout: Option<Duration>,
    /// Maximum number of nodes in flight within a batch (None for unlimited)
    pub max_concurrency: Option<usize>,
    pub input_mode: InputMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pacing_delay: Duration::ZERO,
            node_timeout: Some(DEFAULT_NODE_TIMEOUT),
            max_concurrency: None,
            input_mode: InputMode::Connections,
        }
    }
}

impl EngineConfig {
    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    pub fn node_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.node_timeout = timeout;
        self
    }

    pub fn max_concurrency(mut self, concurrency: usize) -> Self {
        self.max_concurrency = Some(concurrency.max(1));
        self
    }

    pub fn input_mode(mut self, mode: InputMode) -> Self {
        self.input_mode = mode;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeEventStatus {
    Completed,
    Failed,
    TimedOut,
    LoopDetected,
}

/// Emitted once per finished node, in completion order.
#[derive(Debug, Clone)]
pub struct NodeEvent {
    pub node_id: String,
    /// `[type:subtype] Executed node: <title>`
    pub description: String,
    pub status: NodeEventStatus,
    pub output: NodeOutput,
    pub error: Option<String>,
    pub started_at: SystemTime,
    pub ended_at: SystemTime,
    pub debug: Option<DebugInfo>,
}

/// Callback receiving node events.
pub type EmitLog<'a> = Option<&'a (dyn Fn(NodeEvent) + Send + Sync)>;

/// Everything one `execute` call produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub trace_id: String,
    pub outputs: HashMap<String, NodeOutput>,
    pub context: RunContext,
    /// Nodes that received at least one input but never became ready.
    pub stalled: Vec<String>,
    /// Dispatched nodes without a registered executor.
    pub unexecutable: Vec<String>,
    pub cancelled: bool,
    pub duration: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.context.ok && !self.cancelled
    }
}

/// State of a single run; created by `execute` and dropped with it.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub(crate) outputs: HashMap<String, NodeOutput>,
    pub(crate) executed: HashSet<String>,
    pub(crate) arrived: HashMap<String, BTreeSet<String>>,
    visits: HashMap<String, u32>,
    pending: Vec<String>,
}

impl RunState {
    /// Counts a visit; false when the node was already visited this run.
    pub(crate) fn begin_visit(&mut self, node_id: &str) -> bool {
        let visits = self.visits.entry(node_id.to_string()).or_insert(0);
        *visits += 1;
        *visits == 1
    }

    pub(crate) fn enqueue(&mut self, node_id: &str) {
        if !self.pending.iter().any(|id| id == node_id) {
            self.pending.push(node_id.to_string());
        }
    }

    fn take_batch(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }

    fn record(&mut self, node_id: &str, output: NodeOutput) {
        self.outputs.insert(node_id.to_string(), output);
        self.executed.insert(node_id.to_string());
    }

    fn arrived_count(&self, node_id: &str) -> usize {
        self.arrived.get(node_id).map(BTreeSet::len).unwrap_or(0)
    }
}

/// A node about to be dispatched, with everything its context borrows.
struct Dispatch<'e> {
    node: &'e CanvasNode,
    executor: Arc<dyn NodeExecutor>,
    namespaced: Option<(BTreeMap<String, NodeOutput>, FlowContextBag)>,
    debug: DebugSlot,
}

struct Outcome {
    result: NodeResult,
    started_at: SystemTime,
    ended_at: SystemTime,
    debug: Option<DebugInfo>,
}

/// Executes a canvas graph.
///
/// Executors are resolved once, at construction. Run state lives inside each
/// `execute` call, so one engine can run its graph any number of times.
pub struct FlowEngine {
    nodes: Vec<CanvasNode>,
    connections: Vec<Connection>,
    index: HashMap<String, usize>,
    executors: HashMap<String, Arc<dyn NodeExecutor>>,
    upstream: HashMap<String, BTreeSet<String>>,
    outgoing: HashMap<String, Vec<usize>>,
    start_node: Option<String>,
    config: EngineConfig,
    run_options: Option<RunOptions>,
    cancel: CancellationToken,
}

impl FlowEngine {
    pub fn new(
        nodes: Vec<CanvasNode>,
        connections: Vec<Connection>,
        registry: &ExecutorRegistry,
    ) -> Self {
        let mut index = HashMap::new();
        for (pos, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), pos).is_some() {
                tracing::warn!(node_id = %node.id, "duplicate node id; the last definition wins");
            }
        }

        let total = connections.len();
        let connections: Vec<Connection> = connections
            .into_iter()
            .filter(|c| index.contains_key(&c.source_node) && index.contains_key(&c.target_node))
            .collect();
        if connections.len() < total {
            tracing::debug!(dropped = total - connections.len(), "dangling connections ignored");
        }

        let mut upstream: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, conn) in connections.iter().enumerate() {
            upstream
                .entry(conn.target_node.clone())
                .or_default()
                .insert(conn.source_node.clone());
            outgoing.entry(conn.source_node.clone()).or_default().push(pos);
        }

        let mut executors = HashMap::new();
        for node in nodes.iter().filter(|n| !n.is_ui()) {
            match registry.resolve(node) {
                Some(executor) => {
                    if !executor.validate(node) {
                        tracing::warn!(node_id = %node.id, kind = %node.kind(), "node configuration failed validation");
                    }
                    executors.insert(node.id.clone(), executor);
                }
                None => {
                    tracing::warn!(node_id = %node.id, kind = %node.kind(), "no executor registered for node kind");
                }
            }
        }

        Self {
            nodes,
            connections,
            index,
            executors,
            upstream,
            outgoing,
            start_node: None,
            config: EngineConfig::default(),
            run_options: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Pins a single entry point.
    pub fn set_start_node(&mut self, node_id: impl Into<String>) {
        self.start_node = Some(node_id.into());
    }

    pub fn with_start_node(mut self, node_id: impl Into<String>) -> Self {
        self.set_start_node(node_id);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_run_options(mut self, options: RunOptions) -> Self {
        self.run_options = Some(options);
        self
    }

    /// Uses `token` (for example a child of an application-wide token).
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Cancelling stops dispatch after the in-flight batch; it stays cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[CanvasNode] {
        &self.nodes
    }

    /// Connections between existing nodes.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn node(&self, node_id: &str) -> Option<&CanvasNode> {
        self.index.get(node_id).map(|&pos| &self.nodes[pos])
    }

    fn required(&self, node_id: &str) -> usize {
        self.upstream.get(node_id).map(BTreeSet::len).unwrap_or(0)
    }

    fn is_ready(&self, node_id: &str, state: &RunState) -> bool {
        let required = self.required(node_id);
        if required == 0 {
            return true;
        }
        let arrived = state.arrived_count(node_id);
        let policy = self
            .node(node_id)
            .map(CanvasNode::policy)
            .unwrap_or_default();
        match policy {
            ExecutionPolicy::All => arrived == required,
            ExecutionPolicy::Any => arrived > 0,
        }
    }

    /// Marks `node` as arrived at the targets of the edges `route` fires and
    /// queues targets that became ready.
    fn propagate(&self, state: &mut RunState, node: &CanvasNode, route: &Route) {
        let Some(edges) = self.outgoing.get(&node.id) else {
            return;
        };
        for conn in edges.iter().map(|&pos| &self.connections[pos]) {
            if !route.fires(conn) {
                continue;
            }
            state
                .arrived
                .entry(conn.target_node.clone())
                .or_default()
                .insert(node.id.clone());
            if !state.executed.contains(&conn.target_node)
                && self.is_ready(&conn.target_node, state)
            {
                state.enqueue(&conn.target_node);
            }
        }
    }

    /// Every node reachable upstream of `node_id`.
    fn ancestors(&self, node_id: &str) -> BTreeSet<&str> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([node_id]);
        while let Some(id) = queue.pop_front() {
            for source in self.upstream.get(id).into_iter().flatten() {
                if source != node_id && seen.insert(source.as_str()) {
                    queue.push_back(source.as_str());
                }
            }
        }
        seen
    }

    fn namespaced_inputs(
        &self,
        node: &CanvasNode,
        state: &RunState,
    ) -> (BTreeMap<String, NodeOutput>, FlowContextBag) {
        let inputs = self
            .connections
            .iter()
            .filter(|c| c.target_node == node.id)
            .filter_map(|c| {
                let output = state.outputs.get(&c.source_node)?;
                let key = c.target_input_id.clone().unwrap_or_else(|| c.source_node.clone());
                Some((key, output.clone()))
            })
            .collect();
        let flow_context = self
            .ancestors(&node.id)
            .into_iter()
            .filter_map(|id| Some((id.to_string(), state.outputs.get(id)?.clone())))
            .collect();
        (inputs, flow_context)
    }

    async fn run_node(
        &self,
        dispatch: &Dispatch<'_>,
        outputs: &HashMap<String, NodeOutput>,
        semaphore: Option<&Semaphore>,
    ) -> Outcome {
        let _permit = match semaphore {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };
        if !self.config.pacing_delay.is_zero() {
            tokio::time::sleep(self.config.pacing_delay).await;
        }

        let node = dispatch.node;
        let mut ctx = NodeContext::new(&self.nodes, &self.connections, outputs, node)
            .with_config(&node.data)
            .with_run_options(self.run_options.as_ref())
            .with_debug(&dispatch.debug);
        if let Some((inputs, flow_context)) = &dispatch.namespaced {
            ctx = ctx
                .with_inputs(inputs)
                .with_flow_context(flow_context)
                .with_mode(FlowMode::V2);
        }

        let started_at = SystemTime::now();
        let result = match self.config.node_timeout {
            Some(limit) => match tokio::time::timeout(limit, dispatch.executor.execute(ctx)).await {
                Ok(result) => result,
                Err(_) => Err(NodeError::Timeout {
                    node_id: node.id.clone(),
                    elapsed_ms: limit.as_millis() as u64,
                }),
            },
            None => dispatch.executor.execute(ctx).await,
        };

        Outcome {
            result,
            started_at,
            ended_at: SystemTime::now(),
            debug: dispatch.debug.take(),
        }
    }

    /// Runs the graph and returns the output of every node that finished.
    pub async fn execute(&self, emit_log: EmitLog<'_>) -> HashMap<String, NodeOutput> {
        self.execute_detailed(emit_log).await.outputs
    }

    #[tracing::instrument(
        level = "info",
        skip_all,
        fields(nodes = self.nodes.len(), connections = self.connections.len())
    )]
    pub async fn execute_detailed(&self, emit_log: EmitLog<'_>) -> RunReport {
        let started = Instant::now();
        let mut run = RunContext::default();
        let mut state = RunState::default();
        let mut unexecutable: Vec<String> = Vec::new();
        let mut cancelled = false;
        // a zero limit would park every node before its timeout starts
        let semaphore = self
            .config
            .max_concurrency
            .map(|limit| Semaphore::new(limit.max(1)));
        let emit = |event: NodeEvent| {
            if let Some(emit_log) = emit_log {
                emit_log(event);
            }
        };

        tracing::info!(trace_id = %run.trace_id, "run started");

        for node in self.nodes.iter().filter(|n| n.is_ui()) {
            if state.executed.contains(&node.id) {
                continue;
            }
            state.record(&node.id, NodeOutput::text(node.ui_output()));
            self.propagate(&mut state, node, &Route::All);
        }

        match &self.start_node {
            Some(id) if self.index.contains_key(id) => {
                if !state.executed.contains(id) && self.is_ready(id, &state) {
                    state.enqueue(id);
                }
            }
            Some(id) => {
                tracing::warn!(node_id = %id, "start node not found; nothing to run");
            }
            None => {
                for node in &self.nodes {
                    if self.required(&node.id) == 0 && !state.executed.contains(&node.id) {
                        state.enqueue(&node.id);
                    }
                }
            }
        }

        while !state.pending.is_empty() {
            if self.cancel.is_cancelled() {
                tracing::warn!(trace_id = %run.trace_id, pending = state.pending.len(), "run cancelled");
                cancelled = true;
                break;
            }

            let mut batch = Vec::new();
            for node_id in state.take_batch() {
                if state.executed.contains(&node_id) {
                    continue;
                }
                let Some(node) = self.node(&node_id) else {
                    continue;
                };

                if !state.begin_visit(&node_id) {
                    let now = SystemTime::now();
                    let output = NodeOutput::error(LOOP_DETECTED);
                    run.start_node(&node_id, node.kind());
                    run.end_node_failed(&node_id, LOOP_DETECTED);
                    state.record(&node_id, output.clone());
                    emit(NodeEvent {
                        node_id: node_id.clone(),
                        description: format!("{} Loop detected: {}", node.tag(), node.title()),
                        status: NodeEventStatus::LoopDetected,
                        output,
                        error: Some(LOOP_DETECTED.to_string()),
                        started_at: now,
                        ended_at: now,
                        debug: None,
                    });
                    continue;
                }

                let Some(executor) = self.executors.get(&node_id) else {
                    run.end_node_skipped(&node_id, node.kind(), "no executor registered");
                    if !unexecutable.contains(&node_id) {
                        unexecutable.push(node_id.clone());
                    }
                    continue;
                };

                run.start_node(&node_id, node.kind());
                let namespaced = match self.config.input_mode {
                    InputMode::Namespaced => Some(self.namespaced_inputs(node, &state)),
                    InputMode::Connections => None,
                };
                batch.push(Dispatch {
                    node,
                    executor: executor.clone(),
                    namespaced,
                    debug: DebugSlot::default(),
                });
            }

            if batch.is_empty() {
                continue;
            }
            tracing::debug!(trace_id = %run.trace_id, size = batch.len(), "dispatching batch");

            let outcomes = join_all(
                batch
                    .iter()
                    .map(|dispatch| self.run_node(dispatch, &state.outputs, semaphore.as_ref())),
            )
            .await;

            for (dispatch, outcome) in batch.iter().zip(outcomes) {
                let node = dispatch.node;
                let (output, error, status) = match outcome.result {
                    Ok(output) => {
                        run.end_node_success(&node.id);
                        (output, None, NodeEventStatus::Completed)
                    }
                    Err(err @ NodeError::Timeout { .. }) => {
                        run.end_node_timeout(&node.id);
                        let message = err.to_string();
                        (NodeOutput::error(&message), Some(message), NodeEventStatus::TimedOut)
                    }
                    Err(err) => {
                        let message = err.to_string();
                        run.end_node_failed(&node.id, &message);
                        (NodeOutput::error(&message), Some(message), NodeEventStatus::Failed)
                    }
                };

                let route = Route::for_node(node, &output);
                state.record(&node.id, output.clone());
                emit(NodeEvent {
                    node_id: node.id.clone(),
                    description: format!("{} Executed node: {}", node.tag(), node.title()),
                    status,
                    output,
                    error,
                    started_at: outcome.started_at,
                    ended_at: outcome.ended_at,
                    debug: outcome.debug,
                });
                self.propagate(&mut state, node, &route);
            }
        }

        let stalled: Vec<String> = self
            .nodes
            .iter()
            .map(|n| n.id.clone())
            .filter(|id| {
                !state.executed.contains(id)
                    && state.arrived_count(id) > 0
                    && !self.is_ready(id, &state)
            })
            .collect();
        if !stalled.is_empty() {
            tracing::warn!(trace_id = %run.trace_id, stalled = ?stalled, "nodes received inputs but never became ready");
        }

        let duration = started.elapsed();
        tracing::info!(
            trace_id = %run.trace_id,
            executed = state.executed.len(),
            duration_ms = duration.as_millis() as u64,
            "run finished"
        );

        RunReport {
            trace_id: run.trace_id.clone(),
            outputs: state.outputs,
            context: run,
            stalled,
            unexecutable,
            cancelled,
            duration,
        }
    }
}

impl std::fmt::Debug for FlowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEngine")
            .field("nodes", &self.nodes.len())
            .field("connections", &self.connections.len())
            .field("start_node", &self.start_node)
            .field("config", &self.config)
            .finish()
    }
}
