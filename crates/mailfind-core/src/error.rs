//! Error types for mailfind-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),

    #[error("Invalid filter expression: {0}")]
    InvalidFilter(String),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
