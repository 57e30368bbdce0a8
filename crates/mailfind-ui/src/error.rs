//! Error types for mailfind-ui

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UiError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Item height must be a positive number, got {0}")]
    InvalidItemHeight(f64),

    #[error("Search interface is not running")]
    NotRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UiError>;
