//! Mailfind RPC - JSON-RPC protocol definitions
//!
//! This crate defines:
//! - Request/response types for the remote search index
//! - Server and client traits

pub mod error;
pub mod methods;
pub mod types;

pub use error::*;
pub use methods::*;
pub use types::*;
