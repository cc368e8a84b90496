use serde::{Deserialize, Serialize};

/// Reply status codes used by the master service.
pub mod status {
    /// The operation succeeded.
    pub const OK: i32 = 0;
}

/// Operation identifier carried by every packet.
///
/// Each file operation maps to exactly one message id; the master dispatches
/// on it and echoes it back in the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageId {
    ListFiles,
    ReadFile,
    ReadMultiFiles,
    WriteFile,
    DeleteFiles,
    RemoveFiles,
}

/// Request/reply envelope exchanged with a master node.
///
/// An envelope carries the operation identifier, a status code (meaningful
/// on replies, `status::OK` on requests), a human-readable message for
/// failures, and the opaque payload bytes (a JSON-encoded operation
/// payload).
///
/// # Example
///
/// ```
/// use tinyfs_common::{MessageId, Packet, status};
///
/// let request = Packet::request(MessageId::WriteFile, b"{}".to_vec());
/// assert_eq!(request.err_code, status::OK);
///
/// let failed = Packet::reply_error(MessageId::WriteFile, 5, "disk full");
/// assert!(!failed.is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Packet {
    /// Operation this packet belongs to
    pub message_id: MessageId,
    /// Status code; `status::OK` means success
    pub err_code: i32,
    /// Human-readable failure description, empty on success
    pub err_msg: String,
    /// Opaque payload bytes (JSON-encoded operation payload)
    pub data: Vec<u8>,
}

impl Packet {
    /// Creates a request packet for the given operation.
    pub fn request(message_id: MessageId, data: Vec<u8>) -> Self {
        Packet {
            message_id,
            err_code: status::OK,
            err_msg: String::new(),
            data,
        }
    }

    /// Creates a successful reply carrying a payload.
    pub fn reply(message_id: MessageId, data: Vec<u8>) -> Self {
        Packet {
            message_id,
            err_code: status::OK,
            err_msg: String::new(),
            data,
        }
    }

    /// Creates a failed reply with a status code and message.
    pub fn reply_error(message_id: MessageId, err_code: i32, err_msg: impl Into<String>) -> Self {
        Packet {
            message_id,
            err_code,
            err_msg: err_msg.into(),
            data: Vec::new(),
        }
    }

    /// Whether this packet reports success.
    pub fn is_ok(&self) -> bool {
        self.err_code == status::OK
    }
}
