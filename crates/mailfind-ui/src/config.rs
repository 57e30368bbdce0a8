//! Search interface configuration

use std::path::Path;
use std::time::Duration;

use mailfind_store::{AnalyticsSettings, HistoryStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, UiError};

/// Tunables for the search interface
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period before a query or filter change fires a search
    pub debounce_ms: u64,

    /// Results per page
    pub page_size: usize,

    /// Row height of the result list, in pixels
    pub item_height: f64,

    /// Initial height of the result viewport, in pixels
    pub viewport_height: f64,

    /// Extra rows mounted above and below the viewport
    pub overscan: usize,

    /// Maximum number of history entries kept
    pub history_max_items: usize,

    /// Trailing window of analytics aggregates
    pub analytics_window_days: u32,

    /// Analytics events older than this are purged; `null` keeps them all
    pub analytics_retention_days: Option<u32>,

    /// Value of `semantic` in every submitted search
    pub semantic: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            page_size: 50,
            item_height: 72.0,
            viewport_height: 600.0,
            overscan: 3,
            history_max_items: HistoryStore::DEFAULT_MAX_ITEMS,
            analytics_window_days: 30,
            analytics_retention_days: Some(90),
            semantic: true,
        }
    }
}

impl SearchConfig {
    /// Load a JSON config file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the interface cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.item_height.is_finite() && self.item_height > 0.0) {
            return Err(UiError::InvalidItemHeight(self.item_height));
        }
        if !(self.viewport_height.is_finite() && self.viewport_height >= 0.0) {
            return Err(UiError::Config(format!(
                "viewport_height must be non-negative, got {}",
                self.viewport_height
            )));
        }
        if self.page_size == 0 {
            return Err(UiError::Config("page_size must be at least 1".into()));
        }
        if self.history_max_items == 0 {
            return Err(UiError::Config("history_max_items must be at least 1".into()));
        }
        if let Some(retention) = self.analytics_retention_days {
            if retention < self.analytics_window_days {
                return Err(UiError::Config(format!(
                    "analytics_retention_days ({}) is shorter than analytics_window_days ({})",
                    retention, self.analytics_window_days
                )));
            }
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn analytics_settings(&self) -> AnalyticsSettings {
        AnalyticsSettings {
            window_days: self.analytics_window_days,
            retention_days: self.analytics_retention_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = SearchConfig::load(dir.path().join("none.json")).unwrap();
        assert_eq!(config, SearchConfig::default());
        assert_eq!(config.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_file_overrides_some_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"page_size": 25, "analytics_retention_days": null}"#).unwrap();

        let config = SearchConfig::load(&path).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.analytics_retention_days, None);
        assert_eq!(config.history_max_items, 10);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = SearchConfig {
            item_height: 0.0,
            ..SearchConfig::default()
        };
        assert!(matches!(config.validate(), Err(UiError::InvalidItemHeight(_))));

        let config = SearchConfig {
            analytics_retention_days: Some(7),
            ..SearchConfig::default()
        };
        assert!(matches!(config.validate(), Err(UiError::Config(_))));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ page_size: ").unwrap();
        assert!(matches!(SearchConfig::load(&path), Err(UiError::Serialization(_))));
    }
}
