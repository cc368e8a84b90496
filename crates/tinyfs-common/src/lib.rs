//! Tinyfs Common Types and Transport
//!
//! This crate provides the protocol definitions and TCP transport layer for
//! the tinyfs client. The tinyfs master service stores file data across a
//! set of backend nodes; clients talk to any master node over a simple
//! packet protocol.
//!
//! # Architecture
//!
//! - **Protocol layer**: the packet envelope, the typed file-operation
//!   payloads, and the error taxonomy.
//! - **Transport layer**: async TCP with JSON serialization and a 4-byte
//!   big-endian length prefix:
//!
//! ```text
//! [4-byte length] [JSON data]
//! ```
//!
//! The transport also owns connection-down detection: when a request fails
//! with a connection-class error, the connection publishes its address on
//! the down-event channel exactly once, so a supervisor can repair it.
//!
//! # Example
//!
//! ```
//! use tinyfs_common::{MessageId, Packet};
//!
//! let request = Packet::request(MessageId::ListFiles, b"{}".to_vec());
//! let reply = Packet::reply(MessageId::ListFiles, b"{}".to_vec());
//! assert!(reply.is_ok());
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
