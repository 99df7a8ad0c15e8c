use thiserror::Error;

/// Ошибки прогона синхронизации
#[derive(Debug, Error)]
pub enum SyncError {
    /// Не заданы идентификатор таблицы или учетные данные, битый ключ, нет нужных колонок
    #[error("Source configuration invalid: {0}")]
    SourceConfigInvalid(String),

    /// Авторизация, сеть, отсутствующий лист, неожиданный ответ API
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// После разбора не осталось ни одной валидной записи
    #[error("No valid records to load, store left untouched")]
    EmptyResultSet,

    /// Транзакция откатана, прежнее содержимое таблицы сохранено
    #[error("Write failed: {0}")]
    WriteFailed(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::SourceUnavailable(e.to_string())
    }
}

impl From<sea_orm::DbErr> for SyncError {
    fn from(e: sea_orm::DbErr) -> Self {
        SyncError::WriteFailed(e.to_string())
    }
}

/// Причина, по которой строка листа не стала записью
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RejectionReason {
    #[error("missing or invalid id")]
    MissingOrInvalidId,

    #[error("missing name")]
    MissingName,

    #[error("invalid price")]
    InvalidPrice,
}
