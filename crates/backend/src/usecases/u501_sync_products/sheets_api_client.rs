use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::error::SyncError;
use super::raw_row::{CellValue, RawRow};
use crate::shared::config::SourceConfig;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Источник строк для синхронизации
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Проверка, что координаты и учетные данные вообще заданы
    fn check_config(&self) -> Result<(), SyncError> {
        Ok(())
    }

    /// Все строки листа по порядку, включая строки заголовка
    async fn read_rows(&self) -> Result<Vec<RawRow>, SyncError>;
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

impl CachedToken {
    fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at - TOKEN_REFRESH_MARGIN_SECS
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// HTTP-клиент Google Sheets API v4 (сервисный аккаунт, только чтение)
pub struct SheetsApiClient {
    client: reqwest::Client,
    config: SourceConfig,
    token: Mutex<Option<CachedToken>>,
}

impl SheetsApiClient {
    pub fn new(config: SourceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            config,
            token: Mutex::new(None),
        })
    }

    /// Подписанный JWT для обмена на access token
    fn build_assertion(&self, now: i64) -> Result<String, SyncError> {
        let pem = normalize_private_key(&self.config.private_key);
        let key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            SyncError::SourceConfigInvalid(format!("Private key is not a valid RSA PEM: {}", e))
        })?;
        let claims = AssertionClaims {
            iss: self.config.service_account_email.trim(),
            scope: READONLY_SCOPE,
            aud: TOKEN_URL,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SyncError::SourceConfigInvalid(format!("Cannot sign assertion: {}", e)))
    }

    /// Access token из кэша или новый через oauth2
    async fn access_token(&self) -> Result<String, SyncError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now().timestamp();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let assertion = self.build_assertion(now)?;
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Google token exchange failed: {} {}", status, body);
            return Err(SyncError::SourceUnavailable(format!(
                "Token exchange failed with status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!("Google access token refreshed, expires in {}s", token.expires_in);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        token: &str,
    ) -> Result<T, SyncError> {
        let response = self.client.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Google Sheets request failed: {} {}", status, body);
            return Err(SyncError::SourceUnavailable(format!(
                "Sheets API request failed with status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| {
            let preview: String = body.chars().take(500).collect();
            SyncError::SourceUnavailable(format!(
                "Failed to parse Sheets API JSON: {}. Response: {}",
                e, preview
            ))
        })
    }

    /// Настроенный лист или первый лист документа
    async fn resolve_sheet_title(&self, token: &str) -> Result<String, SyncError> {
        if let Some(title) = self
            .config
            .sheet_name
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            return Ok(title.to_string());
        }

        let url = format!(
            "{}/{}?fields=sheets.properties.title",
            SHEETS_API_URL,
            urlencoding::encode(self.config.spreadsheet_id.trim())
        );
        let meta: SpreadsheetMeta = self.get_json(&url, token).await?;
        meta.sheets
            .into_iter()
            .next()
            .map(|sheet| sheet.properties.title)
            .ok_or_else(|| SyncError::SourceUnavailable("Spreadsheet has no sheets".to_string()))
    }

    async fn fetch_values(&self, token: &str, title: &str) -> Result<ValueRange, SyncError> {
        let url = format!(
            "{}/{}/values/{}",
            SHEETS_API_URL,
            urlencoding::encode(self.config.spreadsheet_id.trim()),
            urlencoding::encode(&quote_sheet_range(title))
        );
        self.get_json(&url, token).await
    }
}

#[async_trait]
impl SourceReader for SheetsApiClient {
    fn check_config(&self) -> Result<(), SyncError> {
        let mut missing = Vec::new();
        if self.config.spreadsheet_id.trim().is_empty() {
            missing.push("spreadsheet id");
        }
        if self.config.service_account_email.trim().is_empty() {
            missing.push("service account email");
        }
        if self.config.private_key.trim().is_empty() {
            missing.push("private key");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SyncError::SourceConfigInvalid(format!(
                "Missing source setting(s): {}",
                missing.join(", ")
            )))
        }
    }

    async fn read_rows(&self) -> Result<Vec<RawRow>, SyncError> {
        self.check_config()?;
        let token = self.access_token().await?;
        let title = self.resolve_sheet_title(&token).await?;
        let range = self.fetch_values(&token, &title).await?;
        tracing::info!("Sheet '{}': {} rows received", title, range.values.len());
        Ok(rows_from_values(&range.values))
    }
}

/// Ключ из переменной окружения: литералы `\n` и внешние кавычки
pub(crate) fn normalize_private_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.replace("\\n", "\n")
}

/// Имя листа как диапазон A1: `'Sheet 1'`, одинарные кавычки удваиваются
pub(crate) fn quote_sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

pub(crate) fn rows_from_values(values: &[Vec<serde_json::Value>]) -> Vec<RawRow> {
    values
        .iter()
        .enumerate()
        .map(|(index, cells)| RawRow::new(index + 1, cells.iter().map(CellValue::from).collect()))
        .collect()
}
