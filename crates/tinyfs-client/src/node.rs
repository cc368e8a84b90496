use tokio::sync::RwLock;

use tinyfs_common::transport::NodeConn;
use tinyfs_common::{Packet, Result, TinyfsError};

/// One master endpoint known to the registry.
///
/// A handle owns its transport connection exclusively; other components see
/// it only transiently while a request is in flight. The `conn`/`connected`
/// pair lives behind one lock so that replacement (by the health
/// supervisor) is atomic with respect to request senders: a reader either
/// gets the old connection or the new one, never a half-swapped state.
///
/// Handle identity (tag, address, payload limit) is fixed for its whole
/// life; reconnection only replaces the connection state.
pub struct NodeHandle {
    tag: String,
    address: String,
    max_payload_size: usize,
    state: RwLock<ConnState>,
}

struct ConnState {
    conn: Option<NodeConn>,
    connected: bool,
}

impl NodeHandle {
    pub(crate) fn new(
        tag: impl Into<String>,
        address: impl Into<String>,
        max_payload_size: usize,
        conn: Option<NodeConn>,
    ) -> Self {
        let connected = conn.is_some();
        Self {
            tag: tag.into(),
            address: address.into(),
            max_payload_size,
            state: RwLock::new(ConnState { conn, connected }),
        }
    }

    /// Caller-assigned unique identifier.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// `host:port` of the master endpoint.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Payload limit applied to this node's connections, preserved across
    /// reconnects.
    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// Whether the connection is currently believed usable.
    pub async fn is_connected(&self) -> bool {
        self.state.read().await.connected
    }

    /// Sends a request through this node's connection.
    ///
    /// Fails immediately when the node is disconnected; recovery is the
    /// supervisor's job, not the sender's.
    pub async fn send(&self, packet: &Packet) -> Result<Packet> {
        let conn = {
            let state = self.state.read().await;
            match &state.conn {
                Some(conn) if state.connected => conn.clone(),
                _ => {
                    return Err(TinyfsError::Transport(format!(
                        "node {} ({}) is not connected",
                        self.tag, self.address
                    )))
                }
            }
        };
        conn.request(packet).await
    }

    /// Installs a fresh connection and marks the handle connected.
    pub(crate) async fn install_conn(&self, conn: NodeConn) {
        let mut state = self.state.write().await;
        if let Some(stale) = state.conn.take() {
            stale.close().await;
        }
        state.conn = Some(conn);
        state.connected = true;
    }

    /// Marks the handle disconnected and takes the connection out, if any.
    pub(crate) async fn take_conn(&self) -> Option<NodeConn> {
        let mut state = self.state.write().await;
        state.connected = false;
        state.conn.take()
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("tag", &self.tag)
            .field("address", &self.address)
            .finish()
    }
}
