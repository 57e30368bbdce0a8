//! RPC client implementation

use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::core::ClientError as JsonRpcError;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use mailfind_core::{SearchError, SearchParams, SearchResult, SearchService};
use mailfind_rpc::{MailfindApiClient, SearchRequest, SearchResponse};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};

/// Client for a remote Mailfind search index
pub struct RpcSearchClient {
    client: HttpClient,
    base_url: Url,
    limit: Option<usize>,
}

impl RpcSearchClient {
    /// Default request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connect to a search server
    pub fn connect(url: impl AsRef<str>) -> Result<Self> {
        Self::connect_with_timeout(url, Self::DEFAULT_TIMEOUT)
    }

    pub fn connect_with_timeout(url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let base_url: Url = url.as_ref().parse().map_err(|e: url::ParseError| ClientError::InvalidUrl {
            url: url.as_ref().to_string(),
            reason: e.to_string(),
        })?;

        let client = HttpClientBuilder::default()
            .request_timeout(timeout)
            .build(base_url.as_str())
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        debug!("Search client targeting {}", base_url);

        Ok(Self {
            client,
            base_url,
            limit: None,
        })
    }

    /// Cap the number of results requested per search
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Get the server URL
    pub fn url(&self) -> &Url {
        &self.base_url
    }

    /// Run one search and return the raw wire response
    pub async fn search_raw(&self, params: SearchParams) -> Result<SearchResponse> {
        let request = SearchRequest {
            params,
            limit: self.limit,
        };

        self.client.search(request).await.map_err(|e| match e {
            JsonRpcError::RequestTimeout => ClientError::Timeout,
            other => ClientError::Rpc(other.to_string()),
        })
    }
}

#[async_trait]
impl SearchService for RpcSearchClient {
    async fn search(&self, params: SearchParams) -> std::result::Result<Vec<SearchResult>, SearchError> {
        let response = self.search_raw(params).await.map_err(|e| match e {
            ClientError::Timeout => SearchError::Timeout,
            other => SearchError::Transport(other.to_string()),
        })?;

        match response.error {
            Some(message) => Err(SearchError::Backend(message)),
            None => Ok(response.results),
        }
    }
}
