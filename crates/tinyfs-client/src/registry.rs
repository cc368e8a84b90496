use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{mpsc, RwLock};

use tinyfs_common::transport::{TcpTransport, TransportConfig};
use tinyfs_common::{Result, TinyfsError};

use crate::node::NodeHandle;
use crate::supervisor::{Control, Supervisor, SupervisorConfig};

/// Registry configuration: transport knobs plus supervisor cadence.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    pub transport: TransportConfig,
    pub supervisor: SupervisorConfig,
}

/// Indexed arena of node handles.
///
/// One structure, one lock: a dense array of handles (order is only used
/// for uniform random pick) plus a tag→position map maintained together.
/// `handles.len() == index.len()` holds at every observable point by
/// construction; removal is swap_remove with an index fix-up for the moved
/// element.
#[derive(Default)]
pub(crate) struct Arena {
    handles: Vec<Arc<NodeHandle>>,
    index: HashMap<String, usize>,
}

impl Arena {
    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub(crate) fn get(&self, tag: &str) -> Option<Arc<NodeHandle>> {
        self.index.get(tag).map(|&i| self.handles[i].clone())
    }

    pub(crate) fn nth(&self, i: usize) -> Arc<NodeHandle> {
        self.handles[i].clone()
    }

    pub(crate) fn by_address(&self, address: &str) -> Option<Arc<NodeHandle>> {
        self.handles
            .iter()
            .find(|h| h.address() == address)
            .cloned()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<NodeHandle>> {
        self.handles.clone()
    }

    fn insert(&mut self, handle: Arc<NodeHandle>) {
        self.index.insert(handle.tag().to_string(), self.handles.len());
        self.handles.push(handle);
    }

    fn remove(&mut self, tag: &str) -> Option<Arc<NodeHandle>> {
        let i = self.index.remove(tag)?;
        let handle = self.handles.swap_remove(i);
        if i < self.handles.len() {
            self.index.insert(self.handles[i].tag().to_string(), i);
        }
        Some(handle)
    }
}

/// The connection pool: an addressable set of master-node handles with a
/// background health supervisor.
///
/// The supervisor task starts at construction and runs until
/// [`shutdown`](Self::shutdown). Handles are created by
/// [`add_node`](Self::add_node) and destroyed only by
/// [`del_node`](Self::del_node); a failed connection keeps its handle and
/// is repaired in place.
///
/// # Selection policy
///
/// [`pick_node`](Self::pick_node) draws uniformly at random over all
/// registered handles, healthy or not. A disconnected node can be picked;
/// the caller discovers the failure when the send fails. This is the sole
/// load-distribution policy.
pub struct NodeRegistry {
    arena: Arc<RwLock<Arena>>,
    transport: TcpTransport,
    ctrl_tx: mpsc::UnboundedSender<Control>,
    /// Kept to document ownership of the spawned supervisor task
    _supervisor_handle: tokio::task::JoinHandle<()>,
}

impl NodeRegistry {
    /// Creates a registry with default configuration and starts its
    /// supervisor. Must be called within a tokio runtime.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates a registry with the given configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        let (down_tx, down_rx) = mpsc::unbounded_channel();
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();

        let transport = TcpTransport::new(config.transport, down_tx);
        let arena = Arc::new(RwLock::new(Arena::default()));

        let supervisor = Supervisor::new(
            arena.clone(),
            transport.clone(),
            config.supervisor,
            ctrl_tx.clone(),
        );
        let handle = supervisor.spawn(down_rx, ctrl_rx);

        Self {
            arena,
            transport,
            ctrl_tx,
            _supervisor_handle: handle,
        }
    }

    /// Registers a master node and attempts its first connection.
    ///
    /// - Empty tag or address: `InvalidParameter`.
    /// - Tag already present: success without side effect.
    /// - Otherwise the connect attempt runs synchronously and the handle is
    ///   registered whatever the outcome ("always poolable"): on failure
    ///   the caller gets `ConnectFailure` but the handle stays in the pool
    ///   as disconnected, so the supervisor's sweep can repair it later.
    pub async fn add_node(
        &self,
        tag: &str,
        address: &str,
        max_payload_size: Option<usize>,
    ) -> Result<()> {
        if tag.is_empty() || address.is_empty() {
            return Err(TinyfsError::InvalidParameter(
                "tag and address must be non-empty".to_string(),
            ));
        }
        if self.arena.read().await.get(tag).is_some() {
            return Ok(());
        }

        let limit = max_payload_size.unwrap_or_else(|| self.transport.default_payload_limit());
        let attempt = self.transport.connect(address, limit).await;

        let mut arena = self.arena.write().await;
        if arena.get(tag).is_some() {
            // Lost a race with a concurrent add of the same tag.
            drop(arena);
            if let Ok(conn) = attempt {
                conn.close().await;
            }
            return Ok(());
        }

        match attempt {
            Ok(conn) => {
                arena.insert(Arc::new(NodeHandle::new(tag, address, limit, Some(conn))));
                tracing::info!(tag, address, "node added");
                Ok(())
            }
            Err(e) => {
                arena.insert(Arc::new(NodeHandle::new(tag, address, limit, None)));
                tracing::warn!(tag, address, error = %e, "node added but initial connect failed");
                Err(TinyfsError::ConnectFailure {
                    address: address.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Removes a node, closing its connection and cancelling any in-flight
    /// reconnect for it. Removing an absent tag is a no-op success.
    pub async fn del_node(&self, tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Err(TinyfsError::InvalidParameter(
                "tag must be non-empty".to_string(),
            ));
        }

        let removed = self.arena.write().await.remove(tag);
        let Some(handle) = removed else {
            return Ok(());
        };

        if let Some(conn) = handle.take_conn().await {
            conn.close().await;
        }
        let _ = self.ctrl_tx.send(Control::NodeRemoved {
            tag: tag.to_string(),
        });
        tracing::info!(tag, address = handle.address(), "node removed");
        Ok(())
    }

    /// O(1) lookup by tag.
    pub async fn get_node(&self, tag: &str) -> Option<Arc<NodeHandle>> {
        self.arena.read().await.get(tag)
    }

    /// Linear scan by address; first exact match. Used by the reconnect
    /// path, where only the address is known.
    pub async fn get_node_by_address(&self, address: &str) -> Option<Arc<NodeHandle>> {
        self.arena.read().await.by_address(address)
    }

    /// Snapshot of all handles, safe to iterate without the registry lock.
    pub async fn get_all_nodes(&self) -> HashMap<String, Arc<NodeHandle>> {
        let arena = self.arena.read().await;
        arena
            .snapshot()
            .into_iter()
            .map(|h| (h.tag().to_string(), h))
            .collect()
    }

    /// Number of registered nodes.
    pub async fn len(&self) -> usize {
        self.arena.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.arena.read().await.is_empty()
    }

    /// Picks a node uniformly at random, healthy or not.
    pub async fn pick_node(&self) -> Result<Arc<NodeHandle>> {
        let arena = self.arena.read().await;
        if arena.is_empty() {
            return Err(TinyfsError::NoNodeAvailable);
        }
        let i = rand::rng().random_range(0..arena.len());
        Ok(arena.nth(i))
    }

    /// Signals the supervisor to stop: the sweep loop exits and in-flight
    /// reconnect tasks are aborted. Individual connections are NOT closed;
    /// callers `del_node` each node first or accept abandoning them.
    pub fn shutdown(&self) {
        let _ = self.ctrl_tx.send(Control::Shutdown);
    }
}
