//! Shared test helpers: an in-process master node speaking the framed
//! packet protocol.
#![allow(dead_code)]

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};

use tinyfs_common::{
    FileInfo, ListFilesResp, MessageId, Packet, ReadFileReq, ReadFileResp, ReadMultiFilesReq,
    ReadMultiFilesResp, WriteFileReq, WriteFileResp,
};

/// A mock master node. Accepts connections and answers every operation
/// with canned-but-consistent data until stopped.
pub struct MockMaster {
    addr: String,
    accept_task: JoinHandle<()>,
}

impl MockMaster {
    /// Binds on an ephemeral port and starts serving.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::serve(listener).await
    }

    /// Binds on a specific address. Used to resurrect a master on the port
    /// a client already knows.
    pub async fn spawn_at(addr: &str) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        Self::serve(listener).await
    }

    async fn serve(listener: TcpListener) -> Self {
        let addr = listener.local_addr().unwrap().to_string();
        let accept_task = tokio::spawn(async move {
            // Connection tasks live in a JoinSet so that aborting the
            // accept task tears every open connection down with it.
            let mut conns = JoinSet::new();
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                conns.spawn(handle_conn(stream));
            }
        });
        Self { addr, accept_task }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Kills the master: stops accepting and drops every open connection,
    /// so a client's next send on an established stream fails.
    pub fn stop(self) -> String {
        self.accept_task.abort();
        self.addr
    }
}

async fn handle_conn(mut stream: TcpStream) {
    loop {
        let Ok(request) = read_packet(&mut stream).await else {
            return;
        };
        let reply = respond(&request);
        if write_packet(&mut stream, &reply).await.is_err() {
            return;
        }
    }
}

pub async fn read_packet(stream: &mut TcpStream) -> std::io::Result<Packet> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(serde_json::from_slice(&buf).expect("malformed packet in test"))
}

pub async fn write_packet(stream: &mut TcpStream, packet: &Packet) -> std::io::Result<()> {
    let data = serde_json::to_vec(packet).unwrap();
    stream.write_all(&(data.len() as u32).to_be_bytes()).await?;
    stream.write_all(&data).await?;
    stream.flush().await
}

fn respond(request: &Packet) -> Packet {
    match request.message_id {
        MessageId::ListFiles => {
            let resp = ListFilesResp {
                list: vec![FileInfo {
                    short_url: "sIxFt4".to_string(),
                    name: "test.txt".to_string(),
                    content_type: "text/plain".to_string(),
                    size: 11,
                    md5: "5eb63bbbe01eeed093cb22bb8f5acdc3".to_string(),
                    chunk_node: "chunk-1".to_string(),
                    create_at: 1700000000,
                }],
                total: 1,
            };
            Packet::reply(request.message_id, serde_json::to_vec(&resp).unwrap())
        }
        MessageId::ReadFile => {
            let req: ReadFileReq = serde_json::from_slice(&request.data).unwrap();
            if req.short_url == "missing" {
                return Packet::reply_error(request.message_id, 404, "file not found");
            }
            let resp = ReadFileResp {
                name: "test.txt".to_string(),
                content_type: "text/plain".to_string(),
                size: 11,
                data: b"hello world".to_vec(),
            };
            Packet::reply(request.message_id, serde_json::to_vec(&resp).unwrap())
        }
        MessageId::ReadMultiFiles => {
            let req: ReadMultiFilesReq = serde_json::from_slice(&request.data).unwrap();
            let resp = ReadMultiFilesResp {
                list: req
                    .short_urls
                    .iter()
                    .map(|url| ReadFileResp {
                        name: format!("{}.txt", url),
                        content_type: "text/plain".to_string(),
                        size: 11,
                        data: b"hello world".to_vec(),
                    })
                    .collect(),
            };
            Packet::reply(request.message_id, serde_json::to_vec(&resp).unwrap())
        }
        MessageId::WriteFile => {
            let req: WriteFileReq = serde_json::from_slice(&request.data).unwrap();
            if req.data.is_empty() {
                return Packet::reply_error(request.message_id, 400, "empty payload");
            }
            let resp = WriteFileResp {
                short_url: "sIxFt4".to_string(),
            };
            Packet::reply(request.message_id, serde_json::to_vec(&resp).unwrap())
        }
        MessageId::DeleteFiles | MessageId::RemoveFiles => {
            Packet::reply(request.message_id, Vec::new())
        }
    }
}
