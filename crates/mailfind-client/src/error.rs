//! Error types for mailfind-client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid server URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Could not build HTTP transport: {0}")]
    Transport(String),

    #[error("Server rejected search: {0}")]
    Rpc(String),

    #[error("Search timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, ClientError>;
