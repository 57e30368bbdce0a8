//! Interface state - query, filters, results and selection

use mailfind_core::{Filter, SearchParams, SearchResult};

/// Page controls shown under the result list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Zero-based current page
    pub page: usize,
    pub page_count: usize,
}

/// Everything the search interface renders from
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceState {
    pub query: String,
    pub filters: Vec<Filter>,
    pub show_filters: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub results: Vec<SearchResult>,
    /// Zero-based page into `results`
    pub page: usize,
    pub page_size: usize,
    /// Selected row, indexed within the current page
    pub selected: Option<usize>,
}

impl InterfaceState {
    pub fn new(page_size: usize) -> Self {
        Self {
            query: String::new(),
            filters: Vec::new(),
            show_filters: false,
            loading: false,
            error: None,
            results: Vec::new(),
            page: 0,
            page_size: page_size.max(1),
            selected: None,
        }
    }

    /// Snapshot the current query and filters for submission
    pub fn params(&self, semantic: bool) -> SearchParams {
        SearchParams::new(self.query.clone())
            .with_filters(self.filters.clone())
            .with_semantic(semantic)
    }

    /// Replace the results, back on the first page with nothing selected
    pub fn set_results(&mut self, results: Vec<SearchResult>) {
        self.results = results;
        self.error = None;
        self.page = 0;
        self.selected = None;
    }

    /// Replace the results with a failure message
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.results.clear();
        self.error = Some(message.into());
        self.page = 0;
        self.selected = None;
    }

    /// Reset query, filters, results and selection
    pub fn clear(&mut self) {
        self.query.clear();
        self.filters.clear();
        self.loading = false;
        self.error = None;
        self.results.clear();
        self.page = 0;
        self.selected = None;
    }

    pub fn page_count(&self) -> usize {
        self.results.len().div_ceil(self.page_size)
    }

    /// `None` when everything fits on one page
    pub fn pagination(&self) -> Option<Pagination> {
        let page_count = self.page_count();
        (page_count > 1).then_some(Pagination {
            page: self.page,
            page_count,
        })
    }

    /// The slice of results on the current page
    pub fn page_results(&self) -> &[SearchResult] {
        let start = (self.page * self.page_size).min(self.results.len());
        let end = (start + self.page_size).min(self.results.len());
        &self.results[start..end]
    }

    /// Returns whether the page changed
    pub fn set_page(&mut self, page: usize) -> bool {
        if page >= self.page_count() || page == self.page {
            return false;
        }
        self.page = page;
        self.selected = None;
        true
    }

    pub fn selected_result(&self) -> Option<&SearchResult> {
        self.selected.and_then(|i| self.page_results().get(i))
    }

    /// Move the selection down, stopping at the last row
    pub fn select_next(&mut self) -> Option<usize> {
        let len = self.page_results().len();
        if len == 0 {
            return None;
        }
        let next = match self.selected {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.selected = Some(next);
        self.selected
    }

    /// Move the selection up, stopping at the first row
    pub fn select_previous(&mut self) -> Option<usize> {
        let len = self.page_results().len();
        if len == 0 {
            return None;
        }
        let previous = match self.selected {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.selected = Some(previous);
        self.selected
    }

    /// Returns the selected result when `index` is on the page
    pub fn select(&mut self, index: usize) -> Option<&SearchResult> {
        if index >= self.page_results().len() {
            return None;
        }
        self.selected = Some(index);
        self.selected_result()
    }
}
