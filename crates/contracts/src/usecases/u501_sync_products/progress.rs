use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Кто запустил синхронизацию
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// По расписанию (cron)
    Scheduled,
    /// Однократно после старта процесса
    Startup,
    /// Вручную через GET /sync
    Manual,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncTrigger::Scheduled => "scheduled",
            SyncTrigger::Startup => "startup",
            SyncTrigger::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// Состояние движка синхронизации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Running,
}

/// Итог завершенного прогона
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Succeeded,
    /// Ни одной валидной строки, таблица не тронута
    NothingToLoad,
    Failed,
}

/// Количество отброшенных строк по причинам
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionCounts {
    pub missing_or_invalid_id: usize,
    pub missing_name: usize,
    pub invalid_price: usize,
}

impl RejectionCounts {
    pub fn total(&self) -> usize {
        self.missing_or_invalid_id + self.missing_name + self.invalid_price
    }
}

/// Отчет об одном прогоне синхронизации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub session_id: String,
    pub trigger: SyncTrigger,
    pub status: SyncStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Строк данных прочитано из листа (без заголовка)
    pub rows_read: usize,
    /// Полностью пустые строки, пропущены молча
    pub blank_rows: usize,
    pub valid_records: usize,
    pub rejected: RejectionCounts,
    /// Строки с повторным id, перекрытые более поздней строкой
    pub duplicates: usize,
    /// Цены, которые не удалось разобрать и которые сохранены как NULL
    pub unparsed_prices: usize,
    pub rows_written: usize,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl SyncReport {
    pub fn new(session_id: impl Into<String>, trigger: SyncTrigger) -> Self {
        Self {
            session_id: session_id.into(),
            trigger,
            status: SyncStatus::Failed,
            started_at: Utc::now(),
            finished_at: None,
            rows_read: 0,
            blank_rows: 0,
            valid_records: 0,
            rejected: RejectionCounts::default(),
            duplicates: 0,
            unparsed_prices: 0,
            rows_written: 0,
            error: None,
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_milliseconds())
    }
}
