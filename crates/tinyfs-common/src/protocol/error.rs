use thiserror::Error;

#[derive(Error, Debug)]
pub enum TinyfsError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no node available")]
    NoNodeAvailable,

    #[error("connect to {address} failed: {reason}")]
    ConnectFailure { address: String, reason: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request timeout after {0}ms")]
    Timeout(u64),

    #[error("master replied with code {code}: {message}")]
    Server { code: i32, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TinyfsError {
    /// True for failures that mean the underlying connection is unusable,
    /// as opposed to a bad request or a server-side refusal.
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, TinyfsError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, TinyfsError>;
