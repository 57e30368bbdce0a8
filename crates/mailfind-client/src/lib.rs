//! Mailfind Client - Client library for the remote search index
//!
//! This crate provides:
//! - JSON-RPC client for the search service
//! - A `SearchService` implementation the search interface can await

pub mod client;
pub mod error;

pub use client::*;
pub use error::*;
