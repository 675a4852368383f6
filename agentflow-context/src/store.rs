use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// State kept per node id across engine runs.
///
/// Clones share the same underlying map, so one store can be handed to the
/// executors of many engines. Nothing is evicted implicitly: entries live
/// until [`reset`](Self::reset) or [`clear`](Self::clear).
#[derive(Debug)]
pub struct NodeStateStore<V> {
    inner: Arc<RwLock<HashMap<String, V>>>,
}

/// Rolling conversation history per conversation-flow node.
pub type ConversationStore = NodeStateStore<Vec<String>>;

/// Current state per state-machine node.
pub type MachineStateStore = NodeStateStore<String>;

impl<V> Clone for NodeStateStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> Default for NodeStateStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> NodeStateStore<V> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Applies `f` to the entry for `node_id` (created with `V::default()` when
    /// absent) under a single write lock and returns its result.
    pub async fn update<R, F>(&self, node_id: &str, f: F) -> R
    where
        V: Default,
        F: FnOnce(&mut V) -> R,
    {
        let mut guard = self.inner.write().await;
        let entry = guard.entry(node_id.to_string()).or_default();
        f(entry)
    }

    pub async fn set(&self, node_id: &str, value: V) {
        self.inner.write().await.insert(node_id.to_string(), value);
    }

    /// Forgets the state of one node; returns whether anything was stored.
    pub async fn reset(&self, node_id: &str) -> bool {
        let removed = self.inner.write().await.remove(node_id).is_some();
        if removed {
            tracing::debug!(node_id = %node_id, "node state reset");
        }
        removed
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl<V: Clone> NodeStateStore<V> {
    pub async fn get(&self, node_id: &str) -> Option<V> {
        self.inner.read().await.get(node_id).cloned()
    }
}
