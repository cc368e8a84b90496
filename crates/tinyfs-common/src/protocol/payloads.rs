//! Typed payloads for the file operations.
//!
//! These are the JSON bodies carried inside a [`Packet`](super::Packet)'s
//! `data` field. Field names follow the master service's wire format
//! (camelCase keys).

use serde::{Deserialize, Serialize};

/// Metadata record for one stored file, as kept by the master side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Unique key assigned by the master at write time
    pub short_url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: i64,
    pub md5: String,
    /// Tag of the chunk node that holds the data
    pub chunk_node: String,
    pub create_at: i64,
}

/// List a page of stored files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesReq {
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResp {
    pub list: Vec<FileInfo>,
    pub total: i64,
}

/// Read one file, optionally a byte range (`size == -1` means to the end).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileReq {
    pub short_url: String,
    pub start: i64,
    pub size: i64,
}

impl ReadFileReq {
    /// Request for the whole file.
    pub fn whole(short_url: impl Into<String>) -> Self {
        ReadFileReq {
            short_url: short_url.into(),
            start: 0,
            size: -1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileResp {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: i64,
    pub data: Vec<u8>,
}

/// Read several files in one round trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadMultiFilesReq {
    pub short_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReadMultiFilesResp {
    pub list: Vec<ReadFileResp>,
}

/// Store a new file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileReq {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: i64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileResp {
    pub short_url: String,
}

/// Delete file data for the given keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFilesReq {
    pub short_urls: Vec<String>,
}

/// Remove file records (metadata only) for the given keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFilesReq {
    pub short_urls: Vec<String>,
}
