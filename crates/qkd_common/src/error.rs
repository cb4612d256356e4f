//! Error types for the bridge workspace.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// Invalid or missing configuration. Fatal before the loop starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// A transport channel could not be established. Fatal, never retried.
    #[error("connection error: {0}")]
    Connection(String),

    /// A programming-contract violation, e.g. applying a plan with no session.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A remote call failed at the transport or decoding layer.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// An input to the channel-physics library failed its validation guard.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
