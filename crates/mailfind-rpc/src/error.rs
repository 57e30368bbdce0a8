//! Error types for mailfind-rpc

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Invalid filter at position {index}: {reason}")]
    InvalidFilter { index: usize, reason: String },

    #[error("Requested {requested} results, the server allows at most {max}")]
    LimitExceeded { requested: usize, max: usize },
}

impl RpcError {
    /// JSON-RPC error code; both are invalid params
    pub fn code(&self) -> i32 {
        match self {
            RpcError::InvalidFilter { .. } | RpcError::LimitExceeded { .. } => -32602,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
