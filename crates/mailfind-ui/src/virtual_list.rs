//! Windowed rendering of the result list
//!
//! Rows have a fixed height, so the window is pure arithmetic over the
//! scroll offset: only rows intersecting the viewport (plus `overscan`
//! rows on either side) are materialized, and two spacers stand in for
//! everything else so the scroll extent matches the full list.

use std::ops::Range;

use mailfind_core::SearchResult;

use crate::error::{Result, UiError};

/// One materialized row
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRow<'a> {
    /// Index into the rendered slice
    pub index: usize,
    /// Offset of the row's top edge from the top of the list
    pub top: f64,
    pub hovered: bool,
    pub selected: bool,
    pub result: &'a SearchResult,
}

/// The rows to mount for the current scroll position
#[derive(Debug, Clone, PartialEq)]
pub struct ListWindow<'a> {
    pub rows: Vec<VisibleRow<'a>>,
    /// Height of the spacer above the first row
    pub spacer_before: f64,
    /// Height of the spacer below the last row
    pub spacer_after: f64,
    /// Scroll extent of the whole list
    pub total_height: f64,
}

impl ListWindow<'_> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Scroll and hover state of a fixed-row-height list
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualList {
    item_height: f64,
    viewport_height: f64,
    scroll_offset: f64,
    overscan: usize,
    hover_index: Option<usize>,
}

impl VirtualList {
    pub fn new(item_height: f64, viewport_height: f64) -> Result<Self> {
        if !(item_height.is_finite() && item_height > 0.0) {
            return Err(UiError::InvalidItemHeight(item_height));
        }
        Ok(Self {
            item_height,
            viewport_height: viewport_height.max(0.0),
            scroll_offset: 0.0,
            overscan: 0,
            hover_index: None,
        })
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn item_height(&self) -> f64 {
        self.item_height
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn hover_index(&self) -> Option<usize> {
        self.hover_index
    }

    pub fn total_height(&self, total: usize) -> f64 {
        total as f64 * self.item_height
    }

    pub fn max_scroll(&self, total: usize) -> f64 {
        (self.total_height(total) - self.viewport_height).max(0.0)
    }

    /// Move the viewport, clamped to the list's scroll extent
    pub fn set_scroll_offset(&mut self, offset: f64, total: usize) {
        let offset = if offset.is_finite() { offset } else { 0.0 };
        self.scroll_offset = offset.clamp(0.0, self.max_scroll(total));
    }

    pub fn set_viewport_height(&mut self, height: f64, total: usize) {
        self.viewport_height = height.max(0.0);
        self.set_scroll_offset(self.scroll_offset, total);
    }

    /// Back to the top, with no hovered row
    pub fn reset(&mut self) {
        self.scroll_offset = 0.0;
        self.hover_index = None;
    }

    /// Rows that intersect the viewport
    pub fn viewport_range(&self, total: usize) -> Range<usize> {
        if total == 0 || self.viewport_height == 0.0 {
            return 0..0;
        }
        let first = (self.scroll_offset / self.item_height).floor() as usize;
        let end = ((self.scroll_offset + self.viewport_height) / self.item_height).ceil() as usize;
        first.min(total)..end.min(total)
    }

    /// Rows to mount: the viewport range widened by `overscan`
    pub fn visible_range(&self, total: usize) -> Range<usize> {
        let range = self.viewport_range(total);
        if range.is_empty() {
            return range;
        }
        range.start.saturating_sub(self.overscan)..(range.end + self.overscan).min(total)
    }

    /// Index of the `n`th row on screen, counting from 1
    pub fn nth_visible(&self, n: usize, total: usize) -> Option<usize> {
        if n == 0 {
            return None;
        }
        let range = self.viewport_range(total);
        let index = range.start + n - 1;
        range.contains(&index).then_some(index)
    }

    /// Row under a viewport-relative `y` coordinate
    pub fn row_at(&self, y: f64, total: usize) -> Option<usize> {
        if !(y.is_finite() && y >= 0.0 && y < self.viewport_height) {
            return None;
        }
        let index = ((self.scroll_offset + y) / self.item_height).floor() as usize;
        (index < total).then_some(index)
    }

    /// Scroll the minimum distance that brings row `index` fully into view
    pub fn scroll_to_index(&mut self, index: usize, total: usize) {
        if index >= total {
            return;
        }
        let top = index as f64 * self.item_height;
        let bottom = top + self.item_height;
        if top < self.scroll_offset {
            self.set_scroll_offset(top, total);
        } else if bottom > self.scroll_offset + self.viewport_height {
            self.set_scroll_offset(bottom - self.viewport_height, total);
        }
    }

    pub fn set_hover_index(&mut self, index: Option<usize>) {
        self.hover_index = index;
    }

    /// Track the pointer; `None` means it left the list
    pub fn hover_at(&mut self, y: Option<f64>, total: usize) {
        self.hover_index = y.and_then(|y| self.row_at(y, total));
    }

    /// Materialize the window over `results`
    pub fn render<'a>(&self, results: &'a [SearchResult], selected: Option<usize>) -> ListWindow<'a> {
        let total = results.len();
        let total_height = self.total_height(total);
        let range = self.visible_range(total);

        let rows: Vec<VisibleRow<'a>> = results[range.clone()]
            .iter()
            .enumerate()
            .map(|(offset, result)| {
                let index = range.start + offset;
                VisibleRow {
                    index,
                    top: index as f64 * self.item_height,
                    hovered: self.hover_index == Some(index),
                    selected: selected == Some(index),
                    result,
                }
            })
            .collect();

        let spacer_before = range.start as f64 * self.item_height;
        let spacer_after = (total - range.end) as f64 * self.item_height;
        ListWindow {
            rows,
            spacer_before,
            spacer_after,
            total_height,
        }
    }

    /// Hand row `index` to `on_select`; returns whether it existed
    pub fn select_row(&self, index: usize, results: &[SearchResult], on_select: impl FnOnce(usize, &SearchResult)) -> bool {
        match results.get(index) {
            Some(result) => {
                on_select(index, result);
                true
            }
            None => false,
        }
    }

    /// Resolve a click at viewport-relative `y` and select that row
    pub fn click_at(&self, y: f64, results: &[SearchResult], on_select: impl FnOnce(usize, &SearchResult)) -> bool {
        match self.row_at(y, results.len()) {
            Some(index) => self.select_row(index, results, on_select),
            None => false,
        }
    }
}
