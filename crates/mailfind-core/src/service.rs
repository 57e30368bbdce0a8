//! The search service the interface calls and awaits

use async_trait::async_trait;
use thiserror::Error;

use crate::params::{SearchParams, SearchResult};

/// Why a search call failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The service answered with an error message
    #[error("{0}")]
    Backend(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Search timed out")]
    Timeout,
}

/// Remote search index
///
/// Implementations execute one query; superseding and retry policy belong
/// to the caller.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, params: SearchParams) -> Result<Vec<SearchResult>, SearchError>;
}
