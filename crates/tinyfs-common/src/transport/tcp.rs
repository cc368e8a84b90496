use std::net::ToSocketAddrs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

use crate::protocol::error::{Result, TinyfsError};
use crate::protocol::Packet;
use crate::transport::codec::JsonCodec;

/// Default per-connection payload limit (10 MB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Default timeout for establishing a connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for a full request/reply cycle.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Bound on a single connect attempt
    pub connect_timeout: Duration,
    /// Bound on a full request/reply cycle
    pub request_timeout: Duration,
    /// Payload limit applied when a node has no per-node override
    pub max_payload_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

/// Async TCP transport for the tinyfs packet protocol.
///
/// # Wire Protocol
///
/// Packets are sent with a 4-byte length prefix (big-endian u32) followed
/// by the JSON-encoded envelope:
///
/// ```text
/// [4-byte length] [JSON data]
/// ```
///
/// The transport is configured at construction with a down-event sender.
/// Every [`NodeConn`] it produces carries a clone of that sender and
/// publishes its address on it when a request fails with a
/// connection-class error, at most once per connection instance. Consumers
/// (the node registry's health supervisor) react by reconnecting.
#[derive(Clone)]
pub struct TcpTransport {
    config: TransportConfig,
    down_tx: mpsc::UnboundedSender<String>,
}

impl TcpTransport {
    /// Creates a transport that reports downed connections on `down_tx`.
    pub fn new(config: TransportConfig, down_tx: mpsc::UnboundedSender<String>) -> Self {
        Self { config, down_tx }
    }

    /// Payload limit used when the caller does not override it per node.
    pub fn default_payload_limit(&self) -> usize {
        self.config.max_payload_size
    }

    /// Connects to a master node.
    ///
    /// Resolves the address (which may yield several socket addresses) and
    /// tries each until one connects, each attempt bounded by the configured
    /// connect timeout.
    pub async fn connect(&self, addr: &str, max_payload_size: usize) -> Result<NodeConn> {
        let socket_addrs = addr
            .to_socket_addrs()
            .map_err(|e| TinyfsError::Transport(format!("invalid address '{}': {}", addr, e)))?;

        let mut last_err = None;
        for socket_addr in socket_addrs {
            match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&socket_addr))
                .await
            {
                Ok(Ok(stream)) => {
                    return Ok(NodeConn::new(
                        addr.to_string(),
                        stream,
                        max_payload_size,
                        self.config.request_timeout,
                        self.down_tx.clone(),
                    ));
                }
                Ok(Err(e)) => {
                    last_err = Some(e.to_string());
                }
                Err(_) => {
                    last_err = Some(format!(
                        "connect timed out after {}ms",
                        self.config.connect_timeout.as_millis()
                    ));
                }
            }
        }

        Err(TinyfsError::Transport(format!(
            "failed to connect to {}: {}",
            addr,
            last_err.unwrap_or_else(|| "unknown error".to_string())
        )))
    }
}

/// One established connection to a master node.
///
/// The stream is wrapped in an async mutex so the connection can be shared
/// across tasks; a request holds the lock for its full write/read cycle,
/// which also serializes request/reply pairs on the wire.
#[derive(Clone)]
pub struct NodeConn {
    address: String,
    stream: Arc<Mutex<TcpStream>>,
    max_payload_size: usize,
    request_timeout: Duration,
    down_tx: mpsc::UnboundedSender<String>,
    down_reported: Arc<AtomicBool>,
}

impl NodeConn {
    fn new(
        address: String,
        stream: TcpStream,
        max_payload_size: usize,
        request_timeout: Duration,
        down_tx: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            address,
            stream: Arc::new(Mutex::new(stream)),
            max_payload_size,
            request_timeout,
            down_tx,
            down_reported: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Address this connection is to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sends a request packet and waits for the reply.
    ///
    /// On a connection-class failure the connection reports itself down
    /// (once) before surfacing the error; the caller still sees the failure
    /// and is expected to retry via a fresh pick.
    pub async fn request(&self, packet: &Packet) -> Result<Packet> {
        let encoded = JsonCodec::encode(packet)?;

        let cycle = async {
            let mut stream = self.stream.lock().await;
            Self::send_message(&mut stream, &encoded).await?;
            Self::receive_message(&mut stream, self.max_payload_size).await
        };
        let reply_data = match tokio::time::timeout(self.request_timeout, cycle).await {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => return Err(self.observe(e)),
            Err(_) => {
                return Err(TinyfsError::Timeout(self.request_timeout.as_millis() as u64))
            }
        };

        JsonCodec::decode(&reply_data)
    }

    /// Best-effort shutdown of the underlying stream. If a request holds
    /// the stream, it keeps it until it finishes or times out; the socket
    /// then closes when the last clone drops.
    pub async fn close(&self) {
        if let Ok(mut stream) = self.stream.try_lock() {
            let _ = stream.shutdown().await;
        }
    }

    /// Sends a message with length prefix.
    async fn send_message(stream: &mut TcpStream, data: &[u8]) -> Result<()> {
        let len = data.len() as u32;

        stream
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| map_io_error(e, "writing length prefix"))?;
        stream
            .write_all(data)
            .await
            .map_err(|e| map_io_error(e, "writing data"))?;
        stream
            .flush()
            .await
            .map_err(|e| map_io_error(e, "flushing stream"))?;

        Ok(())
    }

    /// Receives a message with length prefix, enforcing the payload limit.
    async fn receive_message(stream: &mut TcpStream, max_payload_size: usize) -> Result<Vec<u8>> {
        let mut len_buf = [0u8; 4];
        stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| map_io_error(e, "reading length prefix"))?;

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > max_payload_size {
            return Err(TinyfsError::InvalidParameter(format!(
                "reply too large: {} bytes (max {} bytes)",
                len, max_payload_size
            )));
        }

        let mut buf = vec![0u8; len];
        stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| map_io_error(e, "reading data"))?;

        Ok(buf)
    }

    fn observe(&self, err: TinyfsError) -> TinyfsError {
        if err.is_connection_loss() {
            self.report_down();
        }
        err
    }

    /// Publishes a down event for this connection's address, at most once
    /// per connection instance. A replacement connection starts with a
    /// fresh latch, so each failure episode produces exactly one event.
    fn report_down(&self) {
        if !self.down_reported.swap(true, Ordering::SeqCst) {
            tracing::debug!(address = %self.address, "reporting connection down");
            let _ = self.down_tx.send(self.address.clone());
        }
    }
}

/// Map IO errors to transport error variants.
///
/// Timeouts map to `Timeout`, connection-loss kinds map to `Transport`
/// (which is what triggers down reporting), everything else stays `Io`.
fn map_io_error(err: std::io::Error, context: &str) -> TinyfsError {
    match err.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
            TinyfsError::Timeout(DEFAULT_CONNECT_TIMEOUT.as_millis() as u64)
        }
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::UnexpectedEof => {
            TinyfsError::Transport(format!("{}: connection lost", context))
        }
        _ => TinyfsError::Io(err),
    }
}
