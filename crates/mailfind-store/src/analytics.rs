//! Search analytics - event log and derived aggregate stats
//!
//! One event is appended per completed search. Aggregates are a pure
//! function of the events inside a trailing window and are recomputed on
//! load and after every new event. Events older than the retention period
//! are purged from storage.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use mailfind_core::EventId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage::{load_records, save_records, StoragePort, ANALYTICS_KEY};

/// Number of entries kept in each popularity list
pub const POPULAR_LIMIT: usize = 5;

/// One completed search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub query: String,

    /// `"field operator"` strings
    pub filters: Vec<String>,

    pub result_count: usize,

    /// Milliseconds between invocation and completion
    pub time_spent: u64,

    pub success: bool,
}

/// A string and how often it occurred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularItem {
    pub value: String,
    pub count: usize,
}

/// Aggregates over the trailing window
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_searches: usize,

    /// Mean time spent in milliseconds
    pub average_time_spent: f64,

    /// Percentage of successful searches (0-100)
    pub success_rate: f64,

    pub popular_queries: Vec<PopularItem>,
    pub popular_filters: Vec<PopularItem>,
}

impl AggregateStats {
    /// Average time in seconds with one decimal, e.g. `"1.5"`
    pub fn average_seconds_display(&self) -> String {
        format!("{:.1}", self.average_time_spent / 1000.0)
    }

    /// Success rate with one decimal and a percent sign, e.g. `"100.0%"`
    pub fn success_rate_display(&self) -> String {
        format!("{:.1}%", self.success_rate)
    }
}

/// Window and retention for the analytics log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsSettings {
    /// Trailing window that feeds aggregates
    pub window_days: u32,

    /// Events older than this are purged; `None` keeps everything
    pub retention_days: Option<u32>,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            window_days: 30,
            retention_days: Some(90),
        }
    }
}

/// Compute aggregates over the events at or after `now - window`
pub fn compute_stats(events: &[AnalyticsEvent], now: DateTime<Utc>, window: Duration) -> AggregateStats {
    let cutoff = now - window;
    let recent: Vec<&AnalyticsEvent> = events.iter().filter(|e| e.timestamp >= cutoff).collect();

    if recent.is_empty() {
        return AggregateStats::default();
    }

    let total = recent.len();
    let time_sum: u64 = recent.iter().map(|e| e.time_spent).sum();
    let successes = recent.iter().filter(|e| e.success).count();

    let queries = recent
        .iter()
        .map(|e| e.query.trim())
        .filter(|q| !q.is_empty());
    let filters = recent.iter().flat_map(|e| e.filters.iter().map(String::as_str));

    AggregateStats {
        total_searches: total,
        average_time_spent: time_sum as f64 / total as f64,
        success_rate: successes as f64 / total as f64 * 100.0,
        popular_queries: top_by_frequency(queries, POPULAR_LIMIT),
        popular_filters: top_by_frequency(filters, POPULAR_LIMIT),
    }
}

/// Count occurrences and keep the `limit` most frequent, ties in first-seen order
fn top_by_frequency<'a>(values: impl Iterator<Item = &'a str>, limit: usize) -> Vec<PopularItem> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut items: Vec<PopularItem> = counts
        .into_iter()
        .map(|(value, count)| PopularItem {
            value: value.to_string(),
            count,
        })
        .collect();
    // stable sort keeps first-seen order among equal counts
    items.sort_by(|a, b| b.count.cmp(&a.count));
    items.truncate(limit);
    items
}

/// Persisted analytics log with cached aggregates
pub struct AnalyticsStore {
    storage: Arc<dyn StoragePort>,
    settings: AnalyticsSettings,
    events: Vec<AnalyticsEvent>,
    stats: AggregateStats,
}

impl AnalyticsStore {
    /// Load the log, purge expired events and compute aggregates
    pub fn load(storage: Arc<dyn StoragePort>, settings: AnalyticsSettings) -> Self {
        Self::load_at(storage, settings, Utc::now())
    }

    pub fn load_at(storage: Arc<dyn StoragePort>, settings: AnalyticsSettings, now: DateTime<Utc>) -> Self {
        let events: Vec<AnalyticsEvent> = load_records(storage.as_ref(), ANALYTICS_KEY);
        debug!("Loaded {} analytics events", events.len());

        let mut store = Self {
            storage,
            settings,
            events,
            stats: AggregateStats::default(),
        };
        if store.purge_expired(now) > 0 {
            if let Err(e) = store.persist() {
                warn!("Failed to persist analytics purge: {}", e);
            }
        }
        store.refresh_at(now);
        store
    }

    pub fn settings(&self) -> AnalyticsSettings {
        self.settings
    }

    /// Every stored event, oldest first
    pub fn events(&self) -> &[AnalyticsEvent] {
        &self.events
    }

    /// Aggregates as of the last load or event
    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    /// Append one event and recompute aggregates
    pub fn track_search(
        &mut self,
        query: &str,
        filters: Vec<String>,
        result_count: usize,
        time_spent: u64,
        success: bool,
    ) -> Result<EventId> {
        self.track_search_at(query, filters, result_count, time_spent, success, Utc::now())
    }

    pub fn track_search_at(
        &mut self,
        query: &str,
        filters: Vec<String>,
        result_count: usize,
        time_spent: u64,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<EventId> {
        let id = EventId::new();
        self.events.push(AnalyticsEvent {
            id,
            timestamp: now,
            query: query.to_string(),
            filters,
            result_count,
            time_spent,
            success,
        });
        self.purge_expired(now);
        self.refresh_at(now);
        self.persist()?;
        Ok(id)
    }

    /// Recompute aggregates against the current time
    pub fn compute_stats(&mut self) -> &AggregateStats {
        self.refresh_at(Utc::now());
        &self.stats
    }

    /// Events inside the window as of `now`
    pub fn recent_events_at(&self, now: DateTime<Utc>) -> Vec<AnalyticsEvent> {
        let cutoff = now - self.window();
        self.events
            .iter()
            .filter(|e| e.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// Hand the windowed raw log to `on_export`
    pub fn export_data(&self, on_export: impl FnOnce(Vec<AnalyticsEvent>)) {
        on_export(self.recent_events_at(Utc::now()));
    }

    fn window(&self) -> Duration {
        Duration::days(i64::from(self.settings.window_days))
    }

    fn refresh_at(&mut self, now: DateTime<Utc>) {
        self.stats = compute_stats(&self.events, now, self.window());
    }

    /// Drop events beyond retention; returns how many were removed
    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let Some(days) = self.settings.retention_days else {
            return 0;
        };
        let cutoff = now - Duration::days(i64::from(days));
        let before = self.events.len();
        self.events.retain(|e| e.timestamp >= cutoff);
        let purged = before - self.events.len();
        if purged > 0 {
            info!("Purged {} analytics events older than {} days", purged, days);
        }
        purged
    }

    fn persist(&self) -> Result<()> {
        save_records(self.storage.as_ref(), ANALYTICS_KEY, &self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn event(query: &str, filters: &[&str], time_spent: u64, success: bool, at: DateTime<Utc>) -> AnalyticsEvent {
        AnalyticsEvent {
            id: EventId::new(),
            timestamp: at,
            query: query.to_string(),
            filters: filters.iter().map(|f| f.to_string()).collect(),
            result_count: 3,
            time_spent,
            success,
        }
    }

    fn window() -> Duration {
        Duration::days(30)
    }

    #[test]
    fn test_empty_log_reports_zero() {
        let stats = compute_stats(&[], Utc::now(), window());
        assert_eq!(stats.total_searches, 0);
        assert_eq!(stats.average_seconds_display(), "0.0");
        assert_eq!(stats.success_rate_display(), "0.0%");
        assert!(stats.popular_queries.is_empty());
    }

    #[test]
    fn test_single_event() {
        let now = Utc::now();
        let stats = compute_stats(&[event("budget", &[], 1000, true, now)], now, window());
        assert_eq!(stats.total_searches, 1);
        assert_eq!(stats.average_time_spent, 1000.0);
        assert_eq!(stats.average_seconds_display(), "1.0");
        assert_eq!(stats.success_rate_display(), "100.0%");
    }

    #[test]
    fn test_average_is_mean() {
        let now = Utc::now();
        let events = vec![
            event("a", &[], 1000, true, now),
            event("b", &[], 2000, false, now),
        ];
        let stats = compute_stats(&events, now, window());
        assert_eq!(stats.average_time_spent, 1500.0);
        assert_eq!(stats.average_seconds_display(), "1.5");
        assert_eq!(stats.success_rate_display(), "50.0%");
    }

    #[test]
    fn test_events_outside_window_are_excluded() {
        let now = Utc::now();
        let events = vec![
            event("stale", &["from equals"], 500, true, now - Duration::days(31)),
            event("fresh", &[], 700, true, now),
        ];
        let stats = compute_stats(&events, now, window());
        assert_eq!(stats.total_searches, 1);
        assert_eq!(stats.popular_queries.len(), 1);
        assert_eq!(stats.popular_queries[0].value, "fresh");
        assert!(stats.popular_filters.is_empty());
    }

    #[test]
    fn test_popular_lists_are_capped() {
        let now = Utc::now();
        let events: Vec<AnalyticsEvent> = (0..10)
            .map(|i| {
                let filter = format!("field{} equals", i);
                event(&format!("query {}", i), &[filter.as_str()], 100, true, now)
            })
            .collect();
        let stats = compute_stats(&events, now, window());
        assert_eq!(stats.popular_queries.len(), 5);
        assert_eq!(stats.popular_filters.len(), 5);
    }

    #[test]
    fn test_popular_order_breaks_ties_by_first_seen() {
        let now = Utc::now();
        let events = vec![
            event("alpha", &[], 1, true, now),
            event("beta", &[], 1, true, now),
            event("gamma", &[], 1, true, now),
            event("beta", &[], 1, true, now),
            event("", &[], 1, true, now),
        ];
        let stats = compute_stats(&events, now, window());
        let order: Vec<(&str, usize)> = stats
            .popular_queries
            .iter()
            .map(|p| (p.value.as_str(), p.count))
            .collect();
        assert_eq!(order, vec![("beta", 2), ("alpha", 1), ("gamma", 1)]);
    }

    #[test]
    fn test_track_recomputes_and_persists() {
        let storage: Arc<dyn StoragePort> = Arc::new(MemoryStorage::new());
        let mut store = AnalyticsStore::load(Arc::clone(&storage), AnalyticsSettings::default());
        assert_eq!(store.stats().total_searches, 0);

        store
            .track_search("invoice", vec!["from equals".into()], 4, 1200, true)
            .unwrap();
        assert_eq!(store.stats().total_searches, 1);
        assert_eq!(store.stats().popular_filters[0].value, "from equals");

        let remounted = AnalyticsStore::load(storage, AnalyticsSettings::default());
        assert_eq!(remounted.events().len(), 1);
        assert_eq!(remounted.stats().total_searches, 1);
    }

    #[test]
    fn test_retention_purges_on_load() {
        let storage: Arc<dyn StoragePort> = Arc::new(MemoryStorage::new());
        let now = Utc::now();
        let stored = vec![
            event("ancient", &[], 1, true, now - Duration::days(120)),
            event("old", &[], 1, true, now - Duration::days(45)),
            event("new", &[], 1, true, now),
        ];
        save_records(storage.as_ref(), ANALYTICS_KEY, &stored).unwrap();

        let store = AnalyticsStore::load_at(Arc::clone(&storage), AnalyticsSettings::default(), now);
        assert_eq!(store.events().len(), 2);
        // the 45-day-old event is retained but outside the stats window
        assert_eq!(store.stats().total_searches, 1);

        let persisted: Vec<AnalyticsEvent> = load_records(storage.as_ref(), ANALYTICS_KEY);
        assert_eq!(persisted.len(), 2);
    }

    #[test]
    fn test_keep_all_retention() {
        let storage: Arc<dyn StoragePort> = Arc::new(MemoryStorage::new());
        let now = Utc::now();
        save_records(
            storage.as_ref(),
            ANALYTICS_KEY,
            &[event("ancient", &[], 1, true, now - Duration::days(400))],
        )
        .unwrap();

        let settings = AnalyticsSettings {
            window_days: 30,
            retention_days: None,
        };
        let store = AnalyticsStore::load_at(storage, settings, now);
        assert_eq!(store.events().len(), 1);
        assert_eq!(store.stats().total_searches, 0);
    }

    #[test]
    fn test_export_hands_windowed_events() {
        let storage: Arc<dyn StoragePort> = Arc::new(MemoryStorage::new());
        let now = Utc::now();
        save_records(
            storage.as_ref(),
            ANALYTICS_KEY,
            &[
                event("old", &[], 1, true, now - Duration::days(40)),
                event("recent", &[], 1, true, now - Duration::days(1)),
            ],
        )
        .unwrap();
        let store = AnalyticsStore::load(storage, AnalyticsSettings::default());

        let mut exported = Vec::new();
        store.export_data(|events| exported = events);
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].query, "recent");
    }

    #[test]
    fn test_event_wire_shape() {
        let json = serde_json::to_value(event("q", &["a equals"], 10, false, Utc::now())).unwrap();
        assert!(json.get("resultCount").is_some());
        assert!(json.get("timeSpent").is_some());
        assert_eq!(json["success"], serde_json::Value::Bool(false));
    }
}
