//! Mailfind Core - Core types for the mail search experience
//!
//! This crate defines the data structures shared by every other crate:
//! - `Filter`: one structured predicate over a result field
//! - `SearchParams`: the immutable snapshot submitted to the search service
//! - `SearchResult`: what the search service returns
//! - `SearchService`: the asynchronous interface to the remote index

pub mod error;
pub mod filter;
pub mod ids;
pub mod params;
pub mod service;

pub use error::*;
pub use filter::*;
pub use ids::*;
pub use params::*;
pub use service::*;
