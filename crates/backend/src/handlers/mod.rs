pub mod health;
pub mod products;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use std::sync::Arc;

    use crate::domain::a001_product::ProductStore;
    use crate::shared::config::LocaleMode;
    use crate::shared::data::db::memory_database;
    use crate::state::AppState;
    use crate::usecases::u501_sync_products::{
        CellValue, RawRow, SourceReader, SyncError, SyncExecutor, SyncSettings,
    };

    pub(crate) struct FixedSource(pub Result<Vec<Vec<&'static str>>, &'static str>);

    #[async_trait]
    impl SourceReader for FixedSource {
        async fn read_rows(&self) -> Result<Vec<RawRow>, SyncError> {
            match &self.0 {
                Ok(rows) => Ok(rows
                    .iter()
                    .enumerate()
                    .map(|(i, cells)| {
                        RawRow::new(
                            i + 1,
                            cells.iter().map(|c| CellValue::Text(c.to_string())).collect(),
                        )
                    })
                    .collect()),
                Err(msg) => Err(SyncError::SourceUnavailable(msg.to_string())),
            }
        }
    }

    pub(crate) async fn app_state(source: FixedSource) -> AppState {
        let store = ProductStore::new(memory_database().await, "products", LocaleMode::Bilingual);
        store.ensure_table().await.unwrap();
        AppState {
            service_name: "product-sync".to_string(),
            published_status: "published".to_string(),
            executor: Arc::new(SyncExecutor::new(
                Arc::new(source),
                store.clone(),
                SyncSettings::default(),
            )),
            store,
        }
    }
}
