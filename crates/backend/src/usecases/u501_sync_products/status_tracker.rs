use contracts::usecases::u501_sync_products::SyncReport;
use std::sync::{Arc, RwLock};

/// Отчет последнего прогона (in-memory, для GET /sync/status)
#[derive(Clone, Default)]
pub struct StatusTracker {
    last_run: Arc<RwLock<Option<SyncReport>>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Сохранить отчет; отчет текущего прогона перезаписывает предыдущий
    pub fn record(&self, report: SyncReport) {
        let mut last_run = self
            .last_run
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last_run = Some(report);
    }

    pub fn last_run(&self) -> Option<SyncReport> {
        self.last_run
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::usecases::u501_sync_products::SyncTrigger;

    #[test]
    fn test_keeps_latest_report() {
        let tracker = StatusTracker::new();
        assert!(tracker.last_run().is_none());

        tracker.record(SyncReport::new("first", SyncTrigger::Startup));
        tracker.record(SyncReport::new("second", SyncTrigger::Manual));

        let last = tracker.last_run().unwrap();
        assert_eq!(last.session_id, "second");
        assert_eq!(last.trigger, SyncTrigger::Manual);
    }

    #[test]
    fn test_clones_share_state() {
        let tracker = StatusTracker::new();
        let clone = tracker.clone();
        clone.record(SyncReport::new("s", SyncTrigger::Scheduled));
        assert!(tracker.last_run().is_some());
    }
}
