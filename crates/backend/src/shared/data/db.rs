use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;

use crate::shared::config::{self, Config};

pub(crate) fn build_sqlite_url(path: &Path) -> String {
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    format!("sqlite://{}{}?mode=rwc", prefix, normalized)
}

/// URL подключения: явный `database.url` или файл SQLite из `database.path`
pub fn resolve_database_url(cfg: &Config) -> anyhow::Result<String> {
    if let Some(url) = cfg.database.url.as_deref() {
        return Ok(url.to_string());
    }

    let db_file = config::get_database_path(cfg)?;
    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_file.is_absolute() {
        db_file
    } else {
        std::env::current_dir()?.join(db_file)
    };
    Ok(build_sqlite_url(&absolute_path))
}

/// Открывает пул соединений. Таблица товаров создается позже, при первой записи.
pub async fn initialize_database(cfg: &Config) -> anyhow::Result<DatabaseConnection> {
    let db_url = resolve_database_url(cfg)?;

    let mut options = ConnectOptions::new(db_url);
    options
        .max_connections(5)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let conn = Database::connect(options).await?;
    tracing::info!(
        "Database connected ({:?} backend)",
        conn.get_database_backend()
    );
    Ok(conn)
}

/// Пул из одного соединения с SQLite в памяти, для тестов
#[cfg(test)]
pub(crate) async fn memory_database() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    Database::connect(options).await.unwrap()
}
