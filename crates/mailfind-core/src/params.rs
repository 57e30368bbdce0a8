//! Search parameters and result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::Filter;

/// The snapshot submitted to the search service
///
/// Built fresh for every debounced trigger and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchParams {
    /// Free-text query
    pub query: String,

    /// Structured filters, in editor order
    pub filters: Vec<Filter>,

    /// Whether to use semantic (vector) search
    pub semantic: bool,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: Vec::new(),
            semantic: true,
        }
    }

    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_semantic(mut self, semantic: bool) -> Self {
        self.semantic = semantic;
        self
    }

    /// True when there is nothing to search for
    pub fn is_blank(&self) -> bool {
        self.query.trim().is_empty() && self.filters.is_empty()
    }

    /// `"field operator"` strings for every filter
    pub fn filter_descriptions(&self) -> Vec<String> {
        self.filters.iter().map(Filter::describe).collect()
    }
}

/// Metadata attached to a result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub date: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One matched span inside a highlighted field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightMatch {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub highlighted: bool,
}

/// Highlight spans for one field of a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub field: String,
    pub matches: Vec<HighlightMatch>,
}

/// A single search result, read-only to the interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,

    /// Relevance score
    pub score: f32,

    pub title: String,
    pub snippet: String,
    pub content: String,

    #[serde(default)]
    pub metadata: ResultMetadata,

    #[serde(default)]
    pub highlights: Vec<Highlight>,
}

impl SearchResult {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score: 0.0,
            title: title.into(),
            snippet: String::new(),
            content: String::new(),
            metadata: ResultMetadata::default(),
            highlights: Vec::new(),
        }
    }

    /// Highlight spans for `field`, if the service returned any
    pub fn highlights_for(&self, field: &str) -> Option<&[HighlightMatch]> {
        self.highlights
            .iter()
            .find(|h| h.field == field)
            .map(|h| h.matches.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterOperator, FilterValue};

    #[test]
    fn test_blank_params() {
        assert!(SearchParams::new("  ").is_blank());
        let with_filter = SearchParams::new("").with_filters(vec![Filter::new(
            "from",
            FilterOperator::Equals,
            FilterValue::Scalar("a".into()),
        )]);
        assert!(!with_filter.is_blank());
        assert_eq!(with_filter.filter_descriptions(), vec!["from equals".to_string()]);
    }

    #[test]
    fn test_result_deserializes_without_optional_parts() {
        let json = r#"{"id":"m1","score":0.5,"title":"Hello","snippet":"s","content":"c"}"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.id, "m1");
        assert!(result.highlights.is_empty());
        assert!(result.metadata.tags.is_empty());
    }

    #[test]
    fn test_highlights_for_field() {
        let mut result = SearchResult::new("m1", "Quarterly invoice");
        result.highlights.push(Highlight {
            field: "title".into(),
            matches: vec![HighlightMatch {
                start: 10,
                end: 17,
                text: "invoice".into(),
                highlighted: true,
            }],
        });

        let spans = result.highlights_for("title").unwrap();
        assert_eq!(spans[0].text, "invoice");
        assert!(result.highlights_for("snippet").is_none());
    }
}
