//! Tinyfs Client
//!
//! Client for the tinyfs distributed file-storage service. A client holds a
//! dynamic set of master-node connections, picks one uniformly at random
//! for each request, and repairs failed connections in the background
//! without blocking callers.
//!
//! # Components
//!
//! - [`NodeHandle`]: one master endpoint with its address, transport
//!   connection, and liveness flag.
//! - [`NodeRegistry`]: the connection pool (add/remove/lookup/pick) plus
//!   the background health supervisor it spawns at construction.
//! - [`FsClient`]: the request façade with the typed file operations
//!   (list/read/write/delete/remove) on top of the registry.
//!
//! # Example
//!
//! ```no_run
//! use tinyfs_client::FsClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FsClient::new();
//! client.add_node("127.0.0.1:7100").await?;
//!
//! let files = client.list_files(1, 10).await?;
//! for info in &files.list {
//!     println!("{} {} {}", info.short_url, info.name, info.size);
//! }
//!
//! client.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! # Failure model
//!
//! A pick does not filter on health: a disconnected node can be returned
//! and the send fails immediately rather than waiting for recovery.
//! Callers wanting resilience retry pick+send themselves; reconnection is
//! the supervisor's job and happens out of band.

pub mod client;
pub mod node;
pub mod registry;
pub mod supervisor;

pub use client::FsClient;
pub use node::NodeHandle;
pub use registry::{NodeRegistry, RegistryConfig};
pub use supervisor::SupervisorConfig;
