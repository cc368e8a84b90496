use crate::protocol::error::Result;
use crate::protocol::Packet;

/// JSON codec for the packet envelope.
///
/// # Example
///
/// ```
/// use tinyfs_common::transport::JsonCodec;
/// use tinyfs_common::{MessageId, Packet};
///
/// let packet = Packet::request(MessageId::ListFiles, b"{}".to_vec());
/// let encoded = JsonCodec::encode(&packet).unwrap();
/// let decoded = JsonCodec::decode(&encoded).unwrap();
/// assert_eq!(packet, decoded);
/// ```
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a packet to bytes.
    pub fn encode(packet: &Packet) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(packet)?)
    }

    /// Decode a packet from bytes.
    pub fn decode(data: &[u8]) -> Result<Packet> {
        Ok(serde_json::from_slice(data)?)
    }
}
