use std::sync::{Arc, RwLock};

use dashboard_metrics::unix_timestamp;
use sink::DashboardView;

pub mod config;
pub mod endpoints;
pub mod error;
pub mod poller;
pub mod render;
pub mod sink;
pub mod web;

/// Latest successfully rendered dashboard.
///
/// Only the refresh cycle writes here, replacing the whole view at once;
/// HTTP handlers read a shared handle to it.
pub struct DashboardStore {
    view: Arc<RwLock<Option<Arc<DashboardView>>>>,
}

impl DashboardStore {
    pub fn new() -> Self {
        Self {
            view: Arc::new(RwLock::new(None)),
        }
    }

    pub fn publish(&self, view: DashboardView) {
        if let Ok(mut guard) = self.view.write() {
            *guard = Some(Arc::new(view));
        }
    }

    pub fn get(&self) -> Option<Arc<DashboardView>> {
        self.view.read().ok().and_then(|guard| guard.clone())
    }

    pub fn is_stale(&self, threshold_secs: u64) -> bool {
        match self.get() {
            Some(view) => {
                let now = unix_timestamp() as u64;
                now.saturating_sub(view.refreshed_at) > threshold_secs
            }
            None => true,
        }
    }
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_metrics::HistoryLog;
    use sink::{Field, MetricsSink};

    #[test]
    fn test_store_returns_none_initially() {
        let store = DashboardStore::new();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_publish_replaces_view() {
        let store = DashboardStore::new();

        let mut first = DashboardView::new(HistoryLog::default(), 100);
        first.render_scalar(Field::Price, "€1.00");
        first.render_scalar(Field::PoolShare, "1.0000%");
        store.publish(first);

        let mut second = DashboardView::new(HistoryLog::default(), 200);
        second.render_scalar(Field::Price, "€2.00");
        store.publish(second);

        let view = store.get().unwrap();
        assert_eq!(view.refreshed_at, 200);
        assert_eq!(view.scalar(Field::Price), Some("€2.00"));
        // nothing carried over from the previous cycle
        assert_eq!(view.scalar(Field::PoolShare), None);
    }

    #[test]
    fn test_staleness_detection() {
        let store = DashboardStore::new();

        // No data = stale
        assert!(store.is_stale(15));

        let now = unix_timestamp() as u64;
        store.publish(DashboardView::new(HistoryLog::default(), now));
        assert!(!store.is_stale(15));

        // Old data (30 seconds ago)
        store.publish(DashboardView::new(HistoryLog::default(), now - 30));
        assert!(store.is_stale(15));
    }
}
