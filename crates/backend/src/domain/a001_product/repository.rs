use contracts::domain::a001_product::{Locale, LocalizedField, LocalizedFields, ProductRecord};
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction, QueryResult,
    Statement, TransactionTrait, Value,
};
use std::collections::BTreeMap;

use crate::shared::config::LocaleMode;
use crate::usecases::u501_sync_products::SyncError;

/// Строк в одном INSERT
const INSERT_BATCH_ROWS: usize = 50;
/// Ограничение на число bind-параметров в одном запросе (SQLite)
const MAX_BIND_PARAMS: usize = 900;

/// Колонка таблицы товаров и поле записи, из которого она заполняется
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoredField {
    Id,
    Category,
    Price,
    ImageUrl,
    Stock,
    Status,
    Localized(Locale, LocalizedField),
}

#[derive(Debug, Clone)]
struct StoredColumn {
    name: String,
    field: StoredField,
}

/// Таблица товаров витрины. Содержимое целиком заменяется каждым прогоном.
#[derive(Debug, Clone)]
pub struct ProductStore {
    db: DatabaseConnection,
    table: String,
    locale_mode: LocaleMode,
}

impl ProductStore {
    /// `table` должен быть проверен как SQL-идентификатор (см. `Config::validate`)
    pub fn new(db: DatabaseConnection, table: impl Into<String>, locale_mode: LocaleMode) -> Self {
        Self {
            db,
            table: table.into(),
            locale_mode,
        }
    }

    fn backend(&self) -> DatabaseBackend {
        self.db.get_database_backend()
    }

    fn columns(&self) -> Vec<StoredColumn> {
        let locales: &[Locale] = match self.locale_mode {
            LocaleMode::DefaultOnly => &[Locale::DEFAULT],
            LocaleMode::Bilingual => &[Locale::Zh, Locale::En],
        };
        let localized = |field: LocalizedField| {
            locales.iter().map(move |locale| StoredColumn {
                name: match self.locale_mode {
                    LocaleMode::DefaultOnly => field.column().to_string(),
                    LocaleMode::Bilingual => format!("{}{}", field.column(), locale.column_suffix()),
                },
                field: StoredField::Localized(*locale, field),
            })
        };
        let plain = |name: &str, field: StoredField| StoredColumn {
            name: name.to_string(),
            field,
        };

        let mut columns = vec![plain("id", StoredField::Id), plain("category", StoredField::Category)];
        columns.extend(localized(LocalizedField::Name));
        columns.push(plain("price", StoredField::Price));
        columns.push(plain("image_url", StoredField::ImageUrl));
        columns.push(plain("stock", StoredField::Stock));
        columns.push(plain("status", StoredField::Status));
        for field in &LocalizedField::ALL[1..] {
            columns.extend(localized(*field));
        }
        columns
    }

    fn column_type(&self, field: StoredField) -> &'static str {
        let postgres = self.backend() == DatabaseBackend::Postgres;
        match field {
            StoredField::Id if postgres => "BIGINT PRIMARY KEY",
            StoredField::Id => "INTEGER PRIMARY KEY",
            StoredField::Localized(Locale::Zh, LocalizedField::Name) => "TEXT NOT NULL",
            StoredField::Price if postgres => "DOUBLE PRECISION",
            StoredField::Price => "REAL",
            StoredField::Stock if postgres => "BIGINT NOT NULL DEFAULT 0",
            StoredField::Stock => "INTEGER NOT NULL DEFAULT 0",
            _ => "TEXT",
        }
    }

    fn create_table_sql(&self) -> String {
        let definitions: Vec<String> = self
            .columns()
            .iter()
            .map(|c| format!("    {} {}", c.name, self.column_type(c.field)))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.table,
            definitions.join(",\n")
        )
    }

    fn insert_sql(&self, columns: &[StoredColumn], rows: usize) -> String {
        let postgres = self.backend() == DatabaseBackend::Postgres;
        let mut next = 0;
        let groups: Vec<String> = (0..rows)
            .map(|_| {
                let placeholders: Vec<String> = columns
                    .iter()
                    .map(|_| {
                        next += 1;
                        if postgres {
                            format!("${}", next)
                        } else {
                            "?".to_string()
                        }
                    })
                    .collect();
                format!("({})", placeholders.join(", "))
            })
            .collect();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            names.join(", "),
            groups.join(", ")
        )
    }

    fn batch_rows(&self, column_count: usize) -> usize {
        INSERT_BATCH_ROWS.min(MAX_BIND_PARAMS / column_count.max(1)).max(1)
    }

    async fn create_table<C: ConnectionTrait>(&self, conn: &C) -> Result<(), sea_orm::DbErr> {
        conn.execute(Statement::from_string(self.backend(), self.create_table_sql()))
            .await?;
        Ok(())
    }

    /// Создать таблицу, если ее нет. Существующие колонки не меняются.
    pub async fn ensure_table(&self) -> anyhow::Result<()> {
        self.create_table(&self.db).await?;
        tracing::info!("Product table '{}' ready ({:?})", self.table, self.locale_mode);
        Ok(())
    }

    /// Полная замена содержимого таблицы в одной транзакции.
    /// При любой ошибке транзакция откатывается и прежние строки остаются.
    pub async fn replace_all(&self, records: &[ProductRecord]) -> Result<usize, SyncError> {
        if records.is_empty() {
            return Err(SyncError::EmptyResultSet);
        }

        let txn = self.db.begin().await?;
        match self.replace_in_txn(&txn, records).await {
            Ok(written) => {
                txn.commit().await?;
                Ok(written)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Rollback of '{}' failed: {}", self.table, rollback_err);
                }
                Err(SyncError::WriteFailed(e.to_string()))
            }
        }
    }

    async fn replace_in_txn(
        &self,
        txn: &DatabaseTransaction,
        records: &[ProductRecord],
    ) -> Result<usize, sea_orm::DbErr> {
        let backend = self.backend();
        self.create_table(txn).await?;

        let deleted = txn
            .execute(Statement::from_string(
                backend,
                format!("DELETE FROM {}", self.table),
            ))
            .await?
            .rows_affected();
        tracing::debug!("'{}': {} old rows removed", self.table, deleted);

        let columns = self.columns();
        let mut written = 0usize;

        for chunk in records.chunks(self.batch_rows(columns.len())) {
            let values: Vec<Value> = chunk
                .iter()
                .flat_map(|record| {
                    columns
                        .iter()
                        .map(|c| column_value(record, c.field))
                        .collect::<Vec<_>>()
                })
                .collect();
            let sql = self.insert_sql(&columns, chunk.len());
            let result = txn
                .execute(Statement::from_sql_and_values(backend, &sql, values))
                .await?;
            written += result.rows_affected() as usize;
        }

        Ok(written)
    }

    fn select_sql(&self, where_clause: &str) -> String {
        let names: Vec<String> = self.columns().into_iter().map(|c| c.name).collect();
        format!(
            "SELECT {} FROM {}{} ORDER BY id",
            names.join(", "),
            self.table,
            where_clause
        )
    }

    async fn query_records(&self, stmt: Statement) -> anyhow::Result<Vec<ProductRecord>> {
        let rows = self.db.query_all(stmt).await?;
        let columns = self.columns();
        rows.iter()
            .map(|row| record_from_row(row, &columns))
            .collect()
    }

    /// Товары с указанным статусом, по возрастанию id
    pub async fn list_by_status(&self, status: &str) -> anyhow::Result<Vec<ProductRecord>> {
        let placeholder = match self.backend() {
            DatabaseBackend::Postgres => "$1",
            _ => "?",
        };
        let sql = self.select_sql(&format!(" WHERE status = {}", placeholder));
        let stmt = Statement::from_sql_and_values(self.backend(), &sql, vec![status.into()]);
        self.query_records(stmt).await
    }

    pub async fn list_all(&self) -> anyhow::Result<Vec<ProductRecord>> {
        let stmt = Statement::from_string(self.backend(), self.select_sql(""));
        self.query_records(stmt).await
    }

    pub async fn count(&self) -> anyhow::Result<i64> {
        let stmt = Statement::from_string(
            self.backend(),
            format!("SELECT COUNT(*) AS cnt FROM {}", self.table),
        );
        let row = self
            .db
            .query_one(stmt)
            .await?
            .ok_or_else(|| anyhow::anyhow!("COUNT returned no rows"))?;
        Ok(row.try_get::<i64>("", "cnt")?)
    }
}

fn column_value(record: &ProductRecord, field: StoredField) -> Value {
    match field {
        StoredField::Id => record.id.into(),
        StoredField::Category => record.category.clone().into(),
        StoredField::Price => record.price.into(),
        StoredField::ImageUrl => record.image_url.clone().into(),
        StoredField::Stock => record.stock.into(),
        StoredField::Status => record.status.clone().into(),
        StoredField::Localized(locale, localized) => record
            .localized
            .get(&locale)
            .and_then(|fields| fields.get(localized))
            .map(str::to_string)
            .into(),
    }
}

fn record_from_row(row: &QueryResult, columns: &[StoredColumn]) -> anyhow::Result<ProductRecord> {
    let mut record = ProductRecord {
        id: row.try_get::<i64>("", "id")?,
        category: None,
        price: None,
        image_url: None,
        stock: 0,
        status: None,
        localized: BTreeMap::new(),
    };

    for column in columns {
        let name = column.name.as_str();
        match column.field {
            StoredField::Id => {}
            StoredField::Category => record.category = row.try_get("", name)?,
            StoredField::Price => record.price = row.try_get("", name)?,
            StoredField::ImageUrl => record.image_url = row.try_get("", name)?,
            StoredField::Stock => record.stock = row.try_get("", name)?,
            StoredField::Status => record.status = row.try_get("", name)?,
            StoredField::Localized(locale, field) => {
                let value: Option<String> = row.try_get("", name)?;
                if value.is_some() {
                    record
                        .localized
                        .entry(locale)
                        .or_insert_with(LocalizedFields::default)
                        .set(field, value);
                }
            }
        }
    }

    Ok(record)
}
