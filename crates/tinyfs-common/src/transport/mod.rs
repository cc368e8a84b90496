pub mod codec;
pub mod tcp;

pub use codec::JsonCodec;
pub use tcp::{NodeConn, TcpTransport, TransportConfig, DEFAULT_MAX_PAYLOAD_SIZE};
