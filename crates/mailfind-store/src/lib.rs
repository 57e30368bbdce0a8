//! Mailfind Store - Client-side persistence for search history and analytics
//!
//! This crate provides:
//! - A storage port with in-memory and file-backed implementations
//! - The bounded, newest-first search history
//! - The analytics event log and its derived aggregate stats

pub mod analytics;
pub mod error;
pub mod history;
pub mod storage;

pub use analytics::*;
pub use error::*;
pub use history::*;
pub use storage::*;
