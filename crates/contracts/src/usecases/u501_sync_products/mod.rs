pub mod progress;
pub mod response;

pub use progress::{RejectionCounts, SyncReport, SyncState, SyncStatus, SyncTrigger};
pub use response::{SyncResponse, SyncStatusResponse};

use crate::usecases::common::UseCaseMetadata;

pub struct SyncProductsFromSheet;

impl UseCaseMetadata for SyncProductsFromSheet {
    fn usecase_index() -> &'static str {
        "u501"
    }

    fn usecase_name() -> &'static str {
        "sync_products"
    }

    fn display_name() -> &'static str {
        "Синхронизация товаров из таблицы"
    }

    fn description() -> &'static str {
        "Полная перезагрузка таблицы товаров из Google Sheets"
    }
}
