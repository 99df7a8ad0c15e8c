use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    /// Файл, из которого прочитан конфиг; `None` для встроенного
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Путь к файлу SQLite
    pub path: String,
    /// Полный URL подключения (postgres://.. или sqlite://..), имеет приоритет над `path`
    #[serde(default)]
    pub url: Option<String>,
}

/// Координаты таблицы-источника и учетные данные сервисного аккаунта
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default)]
    pub spreadsheet_id: String,
    /// Лист; если не задан, берется первый лист документа
    #[serde(default)]
    pub sheet_name: Option<String>,
    #[serde(default)]
    pub service_account_email: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default = "default_header_rows")]
    pub header_rows: usize,
    #[serde(default)]
    pub layout: ColumnLayoutMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// cron: 6 полей (с секундами) или 5 полей, время UTC
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub locale_mode: LocaleMode,
    #[serde(default)]
    pub price_policy: PricePolicy,
    /// Значение status, при котором товар показывается на витрине
    #[serde(default = "default_published_status")]
    pub published_status: String,
}

/// Схема таблицы товаров: только язык по умолчанию или колонки `_zh`/`_en`
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocaleMode {
    DefaultOnly,
    #[default]
    Bilingual,
}

/// Что делать со строкой, у которой цена не число
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PricePolicy {
    /// Принять строку, цена сохраняется как NULL
    #[default]
    Lenient,
    /// Отбросить строку
    Strict,
}

/// Как находить колонки в строке листа
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnLayoutMode {
    /// Фиксированные позиции колонок
    #[default]
    Positional,
    /// Позиции по именам из строки заголовка
    Header,
}

impl FromStr for LocaleMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default_only" | "zh" => Ok(LocaleMode::DefaultOnly),
            "bilingual" | "zh_en" => Ok(LocaleMode::Bilingual),
            other => anyhow::bail!("Unknown locale mode: {}", other),
        }
    }
}

impl FromStr for PricePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(PricePolicy::Lenient),
            "strict" => Ok(PricePolicy::Strict),
            other => anyhow::bail!("Unknown price policy: {}", other),
        }
    }
}

impl FromStr for ColumnLayoutMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(ColumnLayoutMode::Positional),
            "header" => Ok(ColumnLayoutMode::Header),
            other => anyhow::bail!("Unknown column layout: {}", other),
        }
    }
}

fn default_service_name() -> String {
    "product-sync".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_header_rows() -> usize {
    1
}

fn default_schedule() -> String {
    "0 */5 * * * *".to_string()
}

fn default_startup_delay_secs() -> u64 {
    5
}

fn default_table() -> String {
    "products".to_string()
}

fn default_published_status() -> String {
    "published".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: None,
            service_account_email: String::new(),
            private_key: String::new(),
            header_rows: default_header_rows(),
            layout: ColumnLayoutMode::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            startup_delay_secs: default_startup_delay_secs(),
            table: default_table(),
            locale_mode: LocaleMode::default(),
            price_policy: PricePolicy::default(),
            published_status: default_published_status(),
        }
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[server]
service_name = "product-sync"
host = "0.0.0.0"
port = 3000

[database]
path = "data/products.db"

[source]
header_rows = 1
layout = "positional"

[sync]
schedule = "0 */5 * * * *"
startup_delay_secs = 5
table = "products"
locale_mode = "bilingual"
price_policy = "lenient"
published_status = "published"
"#;

impl Config {
    /// Переопределения из переменных окружения.
    /// `lookup` возвращает значение переменной (пустые значения игнорируются).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SERVICE_NAME") {
            self.server.service_name = v;
        }
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = v
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT '{}': {}", v, e))?;
        }
        if let Some(v) = get("DATABASE_PATH") {
            self.database.path = v;
        }
        if let Some(v) = get("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = get("GOOGLE_SHEET_ID") {
            self.source.spreadsheet_id = v;
        }
        if let Some(v) = get("GOOGLE_SHEET_NAME") {
            self.source.sheet_name = Some(v);
        }
        if let Some(v) = get("GOOGLE_SERVICE_ACCOUNT_EMAIL") {
            self.source.service_account_email = v;
        }
        if let Some(v) = get("GOOGLE_PRIVATE_KEY") {
            self.source.private_key = v;
        }
        if let Some(v) = get("SYNC_CRON") {
            self.sync.schedule = v;
        }
        if let Some(v) = get("SYNC_STARTUP_DELAY_SECS") {
            self.sync.startup_delay_secs = v
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid SYNC_STARTUP_DELAY_SECS '{}': {}", v, e))?;
        }
        if let Some(v) = get("SYNC_LOCALE_MODE") {
            self.sync.locale_mode = v.parse()?;
        }
        if let Some(v) = get("SYNC_PRICE_POLICY") {
            self.sync.price_policy = v.parse()?;
        }
        if let Some(v) = get("SYNC_TABLE") {
            self.sync.table = v;
        }
        if let Some(v) = get("PUBLISHED_STATUS") {
            self.sync.published_status = v;
        }
        Ok(())
    }

    /// Проверка того, без чего процесс не может стартовать.
    /// Учетные данные источника здесь не проверяются: их отсутствие
    /// делает неуспешным каждый прогон, но не останавливает сервис.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !is_sql_identifier(&self.sync.table) {
            anyhow::bail!("Invalid table name: '{}'", self.sync.table);
        }
        if self.sync.schedule.trim().is_empty() {
            anyhow::bail!("Sync schedule must not be empty");
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, не длиннее 63 символов
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn candidate_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("config.toml"));
        }
    }

    paths.push(PathBuf::from("config.toml"));
    paths
}

/// Load configuration from config.toml file and environment
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Current directory (development)
/// 3. Falls back to embedded default config
///
/// Environment variables are applied on top.
pub fn load_config() -> anyhow::Result<Config> {
    let mut config = match candidate_config_paths().into_iter().find(|p| p.exists()) {
        Some(config_path) => {
            let contents = std::fs::read_to_string(&config_path)?;
            let mut config = toml::from_str::<Config>(&contents)?;
            config.loaded_from = Some(config_path);
            config
        }
        None => toml::from_str::<Config>(DEFAULT_CONFIG)?,
    };

    config.apply_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    // If absolute path, use as is
    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    // If relative path, resolve it relative to the executable directory
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    // Fallback: use relative to current directory
    Ok(PathBuf::from(db_path_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn default_config() -> Config {
        toml::from_str(DEFAULT_CONFIG).unwrap()
    }

    #[test]
    fn test_default_config_loads() {
        let config = default_config();
        assert_eq!(config.database.path, "data/products.db");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.sync.schedule, "0 */5 * * * *");
        assert_eq!(config.sync.startup_delay_secs, 5);
        assert_eq!(config.sync.locale_mode, LocaleMode::Bilingual);
        assert_eq!(config.sync.price_policy, PricePolicy::Lenient);
        assert_eq!(config.source.header_rows, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_config_matches_embedded_default() {
        let shipped: Config = toml::from_str(include_str!("../../../../config.toml")).unwrap();
        let embedded = default_config();
        assert_eq!(shipped.database.path, embedded.database.path);
        assert_eq!(shipped.server.service_name, embedded.server.service_name);
        assert_eq!(shipped.sync.schedule, embedded.sync.schedule);
    }

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config: Config = toml::from_str("[database]\npath = \"x.db\"\n").unwrap();
        assert_eq!(config.sync.table, "products");
        assert_eq!(config.sync.published_status, "published");
        assert_eq!(config.source.layout, ColumnLayoutMode::Positional);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GOOGLE_SHEET_ID", "sheet-1"),
            ("GOOGLE_SERVICE_ACCOUNT_EMAIL", "bot@example.iam.gserviceaccount.com"),
            ("PORT", "8080"),
            ("SYNC_CRON", "*/10 * * * *"),
            ("SYNC_PRICE_POLICY", "strict"),
            ("SYNC_LOCALE_MODE", "default_only"),
            ("DATABASE_URL", ""),
            ("SERVICE_NAME", "shop-sync"),
        ]);
        let mut config = default_config();
        config
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.source.spreadsheet_id, "sheet-1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.sync.schedule, "*/10 * * * *");
        assert_eq!(config.sync.price_policy, PricePolicy::Strict);
        assert_eq!(config.sync.locale_mode, LocaleMode::DefaultOnly);
        assert_eq!(config.server.service_name, "shop-sync");
        // пустое значение не переопределяет
        assert_eq!(config.database.url, None);
    }

    #[test]
    fn test_env_override_rejects_bad_port() {
        let mut config = default_config();
        let result = config.apply_overrides(|name| (name == "PORT").then(|| "abc".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_sql_identifier() {
        assert!(is_sql_identifier("products"));
        assert!(is_sql_identifier("_shop_items2"));
        assert!(!is_sql_identifier("2products"));
        assert!(!is_sql_identifier("products; DROP TABLE x"));
        assert!(!is_sql_identifier(""));
    }
}
