use crate::context::NodeContext;
use crate::error::NodeError;
use crate::model::{CanvasNode, NodeOutput};
use futures::future::BoxFuture;

pub type NodeResult = Result<NodeOutput, NodeError>;

/// Future returned by [`NodeExecutor::execute`], borrowing the context.
pub type NodeFuture<'a> = BoxFuture<'a, NodeResult>;

/// Executes one kind of node.
///
/// Executors are shared by every node of their kind and across runs, so any
/// per-node state must live in an injected store keyed by node id.
pub trait NodeExecutor: Send + Sync {
    /// Dispatch key this executor was registered under.
    fn kind(&self) -> &str;

    fn execute<'a>(&'a self, ctx: NodeContext<'a>) -> NodeFuture<'a>;

    /// Static check of a node's configuration.
    fn validate(&self, _node: &CanvasNode) -> bool {
        true
    }
}
