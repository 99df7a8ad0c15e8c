use chrono::Utc;
use contracts::usecases::u501_sync_products::SyncTrigger;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::usecases::u501_sync_products::SyncExecutor;

/// Фоновый запуск синхронизации: по cron и один раз после старта.
pub struct SyncScheduler {
    executor: Arc<SyncExecutor>,
    expression: String,
    schedule: Schedule,
    startup_delay_secs: u64,
}

impl SyncScheduler {
    /// Ошибка в cron-выражении останавливает запуск процесса
    pub fn new(
        executor: Arc<SyncExecutor>,
        cron_expr: &str,
        startup_delay_secs: u64,
    ) -> anyhow::Result<Self> {
        let schedule = parse_cron(cron_expr)
            .map_err(|e| anyhow::anyhow!("Invalid sync schedule '{}': {}", cron_expr, e))?;
        Ok(Self {
            executor,
            expression: cron_expr.trim().to_string(),
            schedule,
            startup_delay_secs,
        })
    }

    /// Цикл по расписанию (время UTC). Ошибки прогонов только логируются.
    pub async fn run_loop(&self) {
        info!("Sync scheduler started with schedule '{}'", self.expression);

        loop {
            let now = Utc::now();
            let Some(next) = self.schedule.after(&now).next() else {
                warn!("Sync schedule has no upcoming fire times, scheduler stopped");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            self.executor.run_logged(SyncTrigger::Scheduled).await;
        }
    }

    /// Однократный прогон через `startup_delay_secs` после старта,
    /// чтобы HTTP-сервер успел занять порт.
    pub async fn run_startup(&self) {
        tokio::time::sleep(std::time::Duration::from_secs(self.startup_delay_secs)).await;
        self.executor.run_logged(SyncTrigger::Startup).await;
    }

    /// Запускает оба триггера фоновыми задачами
    pub fn start(self) -> (JoinHandle<()>, JoinHandle<()>) {
        let scheduler = Arc::new(self);
        let startup = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run_startup().await }
        });
        let recurring = tokio::spawn(async move { scheduler.run_loop().await });
        (startup, recurring)
    }
}

/// 6 полей (с секундами) как есть; к 5 полям добавляется "0" секунд.
/// Расписание считается в UTC: "0 9 * * *" срабатывает в 09:00 UTC.
pub fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    let expr = expr.trim();
    if expr.split_whitespace().count() == 5 {
        Schedule::from_str(&format!("0 {}", expr))
    } else {
        Schedule::from_str(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a001_product::ProductStore;
    use crate::shared::config::LocaleMode;
    use crate::shared::data::db::memory_database;
    use crate::usecases::u501_sync_products::{RawRow, SourceReader, SyncError, SyncSettings};
    use async_trait::async_trait;
    use chrono::Timelike;
    use contracts::usecases::u501_sync_products::SyncStatus;
    use std::time::Duration;

    struct OfflineSource;

    #[async_trait]
    impl SourceReader for OfflineSource {
        async fn read_rows(&self) -> Result<Vec<RawRow>, SyncError> {
            Err(SyncError::SourceUnavailable("network is unreachable".to_string()))
        }
    }

    async fn offline_executor() -> Arc<SyncExecutor> {
        let store = ProductStore::new(memory_database().await, "products", LocaleMode::Bilingual);
        Arc::new(SyncExecutor::new(
            Arc::new(OfflineSource),
            store,
            SyncSettings::default(),
        ))
    }

    #[tokio::test]
    async fn test_startup_run_logs_failure_and_returns() {
        let executor = offline_executor().await;
        let scheduler = SyncScheduler::new(Arc::clone(&executor), "0 0 0 1 1 *", 0).unwrap();

        scheduler.run_startup().await;

        let last = executor.last_run().unwrap();
        assert_eq!(last.trigger, SyncTrigger::Startup);
        assert_eq!(last.status, SyncStatus::Failed);
        assert!(last.error.unwrap().contains("network is unreachable"));
    }

    #[tokio::test]
    async fn test_loop_keeps_firing_after_failed_runs() {
        let executor = offline_executor().await;
        let scheduler = Arc::new(SyncScheduler::new(Arc::clone(&executor), "* * * * * *", 0).unwrap());
        let handle = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run_loop().await }
        });

        // два прогона подряд: первый упал, цикл продолжил работу
        let mut sessions = Vec::new();
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while sessions.len() < 2 {
                if let Some(last) = executor.last_run() {
                    if !sessions.contains(&last.session_id) {
                        sessions.push(last.session_id.clone());
                    }
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        handle.abort();

        assert!(waited.is_ok(), "scheduled runs did not fire");
        let last = executor.last_run().unwrap();
        assert_eq!(last.trigger, SyncTrigger::Scheduled);
        assert_eq!(last.status, SyncStatus::Failed);
    }

    #[test]
    fn test_five_field_schedule_is_utc() {
        let schedule = parse_cron("0 9 * * *").unwrap();
        let next = schedule.upcoming(Utc).next().unwrap();
        assert_eq!((next.hour(), next.minute(), next.second()), (9, 0, 0));
    }

    #[test]
    fn test_parse_cron_six_field() {
        let schedule = parse_cron("0 */5 * * * *").unwrap();
        let next = schedule.upcoming(Utc).next().unwrap();
        assert_eq!(next.second(), 0);
        assert_eq!(next.minute() % 5, 0);
    }

    #[test]
    fn test_parse_cron_five_field_gets_seconds() {
        let schedule = parse_cron("*/10 * * * *").unwrap();
        let next = schedule.upcoming(Utc).next().unwrap();
        assert_eq!(next.second(), 0);
        assert_eq!(next.minute() % 10, 0);
    }

    #[test]
    fn test_parse_cron_rejects_garbage() {
        assert!(parse_cron("every five minutes").is_err());
        assert!(parse_cron("").is_err());
    }
}
