use std::sync::Arc;

use crate::domain::a001_product::ProductStore;
use crate::usecases::u501_sync_products::SyncExecutor;

/// Общее состояние HTTP-обработчиков
#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    /// Значение status, при котором товар виден на витрине
    pub published_status: String,
    pub executor: Arc<SyncExecutor>,
    pub store: ProductStore,
}
