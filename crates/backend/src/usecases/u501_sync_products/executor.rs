use chrono::Utc;
use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u501_sync_products::{
    SyncProductsFromSheet, SyncReport, SyncState, SyncStatus, SyncTrigger,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::error::SyncError;
use super::row_mapper::{ColumnLayout, RowMapper};
use super::sheets_api_client::SourceReader;
use super::status_tracker::StatusTracker;
use crate::domain::a001_product::ProductStore;
use crate::shared::config::{ColumnLayoutMode, Config, LocaleMode, PricePolicy};
use crate::shared::format::{format_duration_ms, format_number};

/// Параметры разбора листа
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    /// Сколько первых строк листа считать заголовком
    pub header_rows: usize,
    pub layout: ColumnLayoutMode,
    pub locale_mode: LocaleMode,
    pub price_policy: PricePolicy,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            header_rows: config.source.header_rows,
            layout: config.source.layout,
            locale_mode: config.sync.locale_mode,
            price_policy: config.sync.price_policy,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            header_rows: 1,
            layout: ColumnLayoutMode::default(),
            locale_mode: LocaleMode::default(),
            price_policy: PricePolicy::default(),
        }
    }
}

/// Чем закончился вызов `SyncExecutor::run`, если не ошибкой
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Таблица заменена
    Completed(SyncReport),
    /// Валидных строк нет, таблица не тронута
    NothingToLoad(SyncReport),
    /// Другой прогон еще идет, этот запуск отброшен
    SkippedAlreadyRunning,
}

/// Флаг "идет прогон"; снимается в Drop на любом пути выхода
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Единственный на процесс движок синхронизации.
/// Все триггеры (cron, старт, GET /sync) вызывают `run` у одного экземпляра.
pub struct SyncExecutor {
    source: Arc<dyn SourceReader>,
    store: ProductStore,
    settings: SyncSettings,
    running: AtomicBool,
    status: StatusTracker,
}

impl SyncExecutor {
    pub fn new(source: Arc<dyn SourceReader>, store: ProductStore, settings: SyncSettings) -> Self {
        Self {
            source,
            store,
            settings,
            running: AtomicBool::new(false),
            status: StatusTracker::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        if self.running.load(Ordering::Acquire) {
            SyncState::Running
        } else {
            SyncState::Idle
        }
    }

    pub fn last_run(&self) -> Option<SyncReport> {
        self.status.last_run()
    }

    /// Один прогон: чтение листа, разбор, полная замена таблицы.
    /// Ошибка возвращается вызывающему; решать, логировать ли ее, ему.
    pub async fn run(&self, trigger: SyncTrigger) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = RunGuard::try_acquire(&self.running) else {
            tracing::info!(
                "{}: {} trigger skipped, another run is in progress",
                SyncProductsFromSheet::full_name(),
                trigger
            );
            return Ok(SyncOutcome::SkippedAlreadyRunning);
        };

        let mut report = SyncReport::new(Uuid::new_v4().to_string(), trigger);
        tracing::info!(
            "{}: session {} started ({})",
            SyncProductsFromSheet::full_name(),
            report.session_id,
            trigger
        );

        let result = self.execute(&mut report).await;

        report.finished_at = Some(Utc::now());
        match &result {
            Ok(status) => report.status = *status,
            Err(e) => {
                report.status = SyncStatus::Failed;
                report.error = Some(e.to_string());
            }
        }
        self.status.record(report.clone());

        let status = result?;
        tracing::info!(
            "{}: session {} finished ({:?}) in {}: read {}, valid {}, rejected {}, duplicates {}, written {}",
            SyncProductsFromSheet::full_name(),
            report.session_id,
            status,
            format_duration_ms(report.duration_ms().unwrap_or_default()),
            format_number(report.rows_read),
            format_number(report.valid_records),
            format_number(report.rejected.total()),
            report.duplicates,
            format_number(report.rows_written)
        );

        Ok(match status {
            SyncStatus::NothingToLoad => SyncOutcome::NothingToLoad(report),
            _ => SyncOutcome::Completed(report),
        })
    }

    /// Для cron и стартового запуска: ошибка только пишется в лог
    pub async fn run_logged(&self, trigger: SyncTrigger) {
        if let Err(e) = self.run(trigger).await {
            tracing::error!(
                "{}: {} run failed: {}",
                SyncProductsFromSheet::full_name(),
                trigger,
                e
            );
        }
    }

    async fn execute(&self, report: &mut SyncReport) -> Result<SyncStatus, SyncError> {
        self.source.check_config()?;
        let rows = self.source.read_rows().await?;

        let header_rows = self.settings.header_rows.min(rows.len());
        let (header, data) = rows.split_at(header_rows);
        report.rows_read = data.len();

        if data.iter().all(|row| row.is_blank()) {
            report.blank_rows = data.len();
            tracing::warn!("Sheet has no data rows, product table left untouched");
            return Ok(SyncStatus::NothingToLoad);
        }

        let layout = match self.settings.layout {
            ColumnLayoutMode::Positional => ColumnLayout::positional(),
            ColumnLayoutMode::Header => {
                // при нескольких строках заголовка имена колонок берутся из последней
                let header_row = header.last().ok_or_else(|| {
                    SyncError::SourceConfigInvalid(
                        "Header layout requires at least one header row".to_string(),
                    )
                })?;
                ColumnLayout::from_header(header_row)?
            }
        };

        let mapper = RowMapper::new(layout, self.settings.locale_mode, self.settings.price_policy);
        let summary = mapper.collect_records(data);
        report.blank_rows = summary.blank_rows;
        report.valid_records = summary.records.len();
        report.rejected = summary.rejected;
        report.duplicates = summary.duplicates;
        report.unparsed_prices = summary.unparsed_prices;

        if summary.records.is_empty() {
            tracing::warn!(
                "No valid records among {} rows, product table left untouched",
                report.rows_read
            );
            return Ok(SyncStatus::NothingToLoad);
        }

        report.rows_written = self.store.replace_all(&summary.records).await?;
        Ok(SyncStatus::Succeeded)
    }
}
