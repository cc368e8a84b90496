pub mod error;
pub mod packet;
pub mod payloads;

pub use error::{Result, TinyfsError};
pub use packet::{status, MessageId, Packet};
pub use payloads::{
    DeleteFilesReq, FileInfo, ListFilesReq, ListFilesResp, ReadFileReq, ReadFileResp,
    ReadMultiFilesReq, ReadMultiFilesResp, RemoveFilesReq, WriteFileReq, WriteFileResp,
};
