use std::sync::atomic::{AtomicU32, Ordering};

use serde::de::DeserializeOwned;
use serde::Serialize;

use tinyfs_common::{
    DeleteFilesReq, ListFilesReq, ListFilesResp, MessageId, Packet, ReadFileReq, ReadFileResp,
    ReadMultiFilesReq, ReadMultiFilesResp, RemoveFilesReq, Result, TinyfsError, WriteFileReq,
    WriteFileResp,
};

use crate::registry::{NodeRegistry, RegistryConfig};

/// Client for the tinyfs master service.
///
/// An explicit instance: construct it, add master nodes, issue file
/// operations, and call [`shutdown`](Self::shutdown) when done. Each
/// operation picks a node at random from the registry; there is no
/// failover inside an operation: a failed send surfaces to the caller,
/// who may simply retry while the supervisor repairs the connection in
/// the background.
pub struct FsClient {
    registry: NodeRegistry,
    node_seq: AtomicU32,
}

impl FsClient {
    /// Creates a client with default configuration. Must be called within
    /// a tokio runtime.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            registry: NodeRegistry::with_config(config),
            node_seq: AtomicU32::new(0),
        }
    }

    /// The underlying node registry.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Stops the background health supervisor.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }

    /// Registers a master node by address (`host:port`). The node tag is
    /// derived from an internal counter. Re-adding a known address is an
    /// error; remove it first.
    pub async fn add_node(&self, address: &str) -> Result<()> {
        self.add_node_with_limit(address, None).await
    }

    /// Like [`add_node`](Self::add_node) with a per-node payload limit.
    pub async fn add_node_with_limit(
        &self,
        address: &str,
        max_payload_size: Option<usize>,
    ) -> Result<()> {
        if address.is_empty() {
            return Err(TinyfsError::InvalidParameter(
                "address must be non-empty".to_string(),
            ));
        }
        if self.registry.get_node_by_address(address).await.is_some() {
            return Err(TinyfsError::InvalidParameter(format!(
                "address {} already registered",
                address
            )));
        }
        let tag = self.node_seq.fetch_add(1, Ordering::SeqCst).to_string();
        self.registry.add_node(&tag, address, max_payload_size).await
    }

    /// Unregisters the master node with the given address.
    pub async fn remove_node(&self, address: &str) -> Result<()> {
        if address.is_empty() {
            return Err(TinyfsError::InvalidParameter(
                "address must be non-empty".to_string(),
            ));
        }
        match self.registry.get_node_by_address(address).await {
            Some(handle) => self.registry.del_node(handle.tag()).await,
            None => Err(TinyfsError::InvalidParameter(format!(
                "address {} not registered",
                address
            ))),
        }
    }

    /// Lists a page of stored files.
    pub async fn list_files(&self, page: u32, page_size: u32) -> Result<ListFilesResp> {
        let req = ListFilesReq { page, page_size };
        self.call(MessageId::ListFiles, &req).await
    }

    /// Reads one file (optionally a byte range).
    pub async fn read_file(&self, req: &ReadFileReq) -> Result<ReadFileResp> {
        if req.short_url.is_empty() {
            return Err(TinyfsError::InvalidParameter(
                "short url must be non-empty".to_string(),
            ));
        }
        self.call(MessageId::ReadFile, req).await
    }

    /// Reads several files in one round trip.
    pub async fn read_multi_files(&self, req: &ReadMultiFilesReq) -> Result<ReadMultiFilesResp> {
        if req.short_urls.is_empty() {
            return Err(TinyfsError::InvalidParameter(
                "short urls must be non-empty".to_string(),
            ));
        }
        self.call(MessageId::ReadMultiFiles, req).await
    }

    /// Stores a file; the reply carries the assigned short url.
    pub async fn write_file(&self, req: &WriteFileReq) -> Result<WriteFileResp> {
        if req.name.is_empty() || req.data.is_empty() {
            return Err(TinyfsError::InvalidParameter(
                "name and data must be non-empty".to_string(),
            ));
        }
        self.call(MessageId::WriteFile, req).await
    }

    /// Deletes file data for the given short urls.
    pub async fn delete_files(&self, short_urls: &[String]) -> Result<()> {
        if short_urls.is_empty() {
            return Err(TinyfsError::InvalidParameter(
                "short urls must be non-empty".to_string(),
            ));
        }
        let req = DeleteFilesReq {
            short_urls: short_urls.to_vec(),
        };
        self.call_no_reply(MessageId::DeleteFiles, &req).await
    }

    /// Removes file records (metadata only) for the given short urls.
    pub async fn remove_files(&self, short_urls: &[String]) -> Result<()> {
        if short_urls.is_empty() {
            return Err(TinyfsError::InvalidParameter(
                "short urls must be non-empty".to_string(),
            ));
        }
        let req = RemoveFilesReq {
            short_urls: short_urls.to_vec(),
        };
        self.call_no_reply(MessageId::RemoveFiles, &req).await
    }

    /// One request/reply cycle: pick a node, encode, send, check the reply
    /// status, decode the typed payload.
    async fn call<Q, R>(&self, id: MessageId, payload: &Q) -> Result<R>
    where
        Q: Serialize,
        R: DeserializeOwned,
    {
        let reply = self.exchange(id, payload).await?;
        Ok(serde_json::from_slice(&reply.data)?)
    }

    /// As [`call`](Self::call) for operations whose reply carries no body.
    async fn call_no_reply<Q: Serialize>(&self, id: MessageId, payload: &Q) -> Result<()> {
        self.exchange(id, payload).await.map(|_| ())
    }

    async fn exchange<Q: Serialize>(&self, id: MessageId, payload: &Q) -> Result<Packet> {
        let node = self.registry.pick_node().await?;
        let data = serde_json::to_vec(payload)?;
        let reply = node.send(&Packet::request(id, data)).await?;
        if !reply.is_ok() {
            return Err(TinyfsError::Server {
                code: reply.err_code,
                message: reply.err_msg,
            });
        }
        Ok(reply)
    }
}
