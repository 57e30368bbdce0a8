//! Request and response types for RPC calls

use mailfind_core::{SearchParams, SearchResult};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RpcError};

// ============================================================================
// Search Operations
// ============================================================================

/// Request to search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(flatten)]
    pub params: SearchParams,

    /// Maximum number of results (server default when absent)
    pub limit: Option<usize>,
}

impl SearchRequest {
    /// Server-side checks before a request reaches the index
    ///
    /// Filters with an empty field name are rejected; a mismatched value
    /// shape is left for the index to interpret.
    pub fn validate(&self, max_limit: usize) -> Result<()> {
        if let Some(requested) = self.limit {
            if requested > max_limit {
                return Err(RpcError::LimitExceeded {
                    requested,
                    max: max_limit,
                });
            }
        }
        for (index, filter) in self.params.filters.iter().enumerate() {
            if filter.field.trim().is_empty() {
                return Err(RpcError::InvalidFilter {
                    index,
                    reason: "field is empty".into(),
                });
            }
        }
        Ok(())
    }
}

impl From<SearchParams> for SearchRequest {
    fn from(params: SearchParams) -> Self {
        Self { params, limit: None }
    }
}

/// Response with search results
///
/// A present `error` means the search failed even if `results` is non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_flattens_params() {
        let request = SearchRequest::from(SearchParams::new("travel"));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["query"], "travel");
        assert_eq!(json["semantic"], true);
        assert!(json.get("params").is_none());
    }

    #[test]
    fn test_validate_rejects_blank_fields_and_large_limits() {
        use mailfind_core::Filter;

        let request = SearchRequest::from(SearchParams::new("x").with_filters(vec![Filter::blank()]));
        let err = request.validate(100).unwrap_err();
        assert!(matches!(err, RpcError::InvalidFilter { index: 0, .. }));
        assert_eq!(err.code(), -32602);

        let request = SearchRequest {
            params: SearchParams::new("x"),
            limit: Some(500),
        };
        assert!(matches!(request.validate(100), Err(RpcError::LimitExceeded { max: 100, .. })));
        assert!(SearchRequest::from(SearchParams::new("x")).validate(100).is_ok());
    }

    #[test]
    fn test_response_error_field_is_optional() {
        let response: SearchResponse = serde_json::from_str(r#"{"results":[]}"#).unwrap();
        assert!(response.error.is_none());

        let failed: SearchResponse = serde_json::from_str(r#"{"error":"index offline"}"#).unwrap();
        assert_eq!(failed.error.as_deref(), Some("index offline"));
        assert!(failed.results.is_empty());
    }
}
